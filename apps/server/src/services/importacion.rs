//! Import of history records from Word documents.

use crate::{
    auth::Principal,
    db::{pacientes::PacienteImportado, HistoricoRepository, PacienteRepository},
    models::{Historico, NuevoHistorico, Paciente},
    Error, Result,
};
use chrono::{DateTime, NaiveDate, Utc};
use clinica_core::{OrigenHistorico, Rol};
use clinica_import::{normalizar_cedula, parse_docx, RegistroImportado};
use serde::Serialize;
use sqlx::PgPool;

/// Largest accepted upload.
pub const MAX_DOCX_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize)]
pub struct ResultadoImportacion {
    pub paciente: Paciente,
    pub paciente_creado: bool,
    pub historico: Historico,
    pub advertencias: Vec<String>,
}

pub struct ImportacionService {
    pool: PgPool,
}

impl ImportacionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn importar_historico(
        &self,
        principal: &Principal,
        archivo: Option<String>,
        bytes: Vec<u8>,
    ) -> Result<ResultadoImportacion> {
        principal.require_roles(&[Rol::Admin, Rol::Recepcion, Rol::Medico])?;
        if bytes.is_empty() {
            return Err(Error::Validation("archivo is empty".to_string()));
        }
        if bytes.len() > MAX_DOCX_BYTES {
            return Err(Error::Validation(format!(
                "archivo exceeds {MAX_DOCX_BYTES} bytes"
            )));
        }

        let registro = tokio::task::spawn_blocking(move || parse_docx(&bytes))
            .await
            .map_err(|e| Error::Internal(format!("import task failed: {e}")))??;
        registro.validate()?;

        let cedula = normalizar_cedula(requerido(&registro.cedula, "cedula")?);
        let importado = paciente_importado(&registro, &cedula)?;

        let medico_id = match principal.rol {
            Rol::Medico => Some(principal.medico_propio()?),
            _ => None,
        };

        let mut tx = self.pool.begin().await?;
        let result: Result<(Paciente, bool, Historico)> = async {
            let (paciente, creado) = PacienteRepository::upsert_importado(
                &mut tx,
                &principal.clinica,
                &importado,
            )
            .await?;

            let nuevo = NuevoHistorico {
                paciente_id: paciente.id,
                consulta_id: None,
                medico_id,
                fecha: registro.fecha.map(inicio_del_dia).unwrap_or_else(Utc::now),
                motivo: registro.motivo.clone(),
                antecedentes: registro.antecedentes.clone(),
                diagnostico: registro.diagnostico.clone(),
                tratamiento: registro.tratamiento.clone(),
                observaciones: registro.observaciones.clone(),
                origen: OrigenHistorico::Importado,
                archivo_origen: archivo.clone(),
                created_by: Some(principal.user_id),
            };
            let historico = HistoricoRepository::insert(&mut tx, &principal.clinica, &nuevo).await?;
            Ok((paciente, creado, historico))
        }
        .await;

        let (paciente, paciente_creado, historico) = match result {
            Ok(v) => {
                tx.commit().await?;
                v
            }
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(e);
            }
        };

        tracing::info!(
            clinica = %principal.clinica,
            paciente_id = %paciente.id,
            paciente_creado,
            historico_id = %historico.id,
            archivo = archivo.as_deref().unwrap_or(""),
            advertencias = registro.advertencias.len(),
            "History record imported"
        );

        Ok(ResultadoImportacion {
            paciente,
            paciente_creado,
            historico,
            advertencias: registro.advertencias,
        })
    }
}

fn requerido<'a>(valor: &'a Option<String>, campo: &str) -> Result<&'a str> {
    valor
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Validation(format!("'{campo}' is missing from the document")))
}

fn paciente_importado<'a>(
    registro: &'a RegistroImportado,
    cedula: &'a str,
) -> Result<PacienteImportado<'a>> {
    Ok(PacienteImportado {
        cedula,
        nombres: requerido(&registro.nombres, "nombres")?,
        apellidos: requerido(&registro.apellidos, "apellidos")?,
        fecha_nacimiento: registro.fecha_nacimiento,
        sexo: registro.sexo.as_deref(),
        telefono: registro.telefono.as_deref(),
        email: registro.email.as_deref(),
    })
}

fn inicio_del_dia(fecha: NaiveDate) -> DateTime<Utc> {
    fecha.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registro() -> RegistroImportado {
        RegistroImportado {
            cedula: Some(" v-12.345.678 ".to_string()),
            nombres: Some("María José".to_string()),
            apellidos: Some("Pérez".to_string()),
            telefono: Some("0414-5550000".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn imported_patient_borrows_record_fields() {
        let r = registro();
        let cedula = normalizar_cedula(requerido(&r.cedula, "cedula").unwrap());
        let p = paciente_importado(&r, &cedula).unwrap();
        assert_eq!(p.cedula, "V-12345678");
        assert_eq!(p.nombres, "María José");
        assert_eq!(p.apellidos, "Pérez");
        assert_eq!(p.telefono, Some("0414-5550000"));
        assert_eq!(p.email, None);
    }

    #[test]
    fn blank_names_are_rejected() {
        let r = RegistroImportado {
            apellidos: Some("   ".to_string()),
            ..registro()
        };
        assert!(matches!(
            paciente_importado(&r, "V1"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn document_date_becomes_midnight_utc() {
        let fecha = NaiveDate::from_ymd_opt(2023, 5, 17).unwrap();
        assert_eq!(inicio_del_dia(fecha).to_rfc3339(), "2023-05-17T00:00:00+00:00");
    }
}
