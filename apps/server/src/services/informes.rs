//! Medical reports: authoring, signing, PDF rendering and delivery.

use crate::{
    auth::Principal,
    db::{
        ClinicaRepository, ConsultaRepository, InformeRepository, MedicoRepository,
        PacienteRepository,
    },
    models::{
        validar, EnviarInformeInput, InformeFiltro, InformeInput, InformeMedico, InformeUpdate,
        Medico, Paciente,
    },
    services::{
        notifications::{DatosInforme, Plantillas, SharedNotifier},
        pdf::{escape_html, SharedPdfRenderer},
    },
    Error, Result,
};
use chrono::{DateTime, SecondsFormat, Utc};
use clinica_core::Rol;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Roles allowed to read clinical content.
const LECTURA: &[Rol] = &[Rol::Admin, Rol::Medico, Rol::Recepcion];

pub struct InformeService {
    pool: PgPool,
    informes: InformeRepository,
    pacientes: PacienteRepository,
    medicos: MedicoRepository,
    consultas: ConsultaRepository,
    clinicas: ClinicaRepository,
    pdf: SharedPdfRenderer,
    notifier: SharedNotifier,
    plantillas: Arc<Plantillas>,
}

impl InformeService {
    pub fn new(
        pool: PgPool,
        pdf: SharedPdfRenderer,
        notifier: SharedNotifier,
        plantillas: Arc<Plantillas>,
    ) -> Self {
        Self {
            informes: InformeRepository::new(pool.clone()),
            pacientes: PacienteRepository::new(pool.clone()),
            medicos: MedicoRepository::new(pool.clone()),
            consultas: ConsultaRepository::new(pool.clone()),
            clinicas: ClinicaRepository::new(pool.clone()),
            pool,
            pdf,
            notifier,
            plantillas,
        }
    }

    /// Doctors only see the reports they authored.
    pub async fn list(
        &self,
        principal: &Principal,
        mut filtro: InformeFiltro,
    ) -> Result<Vec<InformeMedico>> {
        principal.require_roles(LECTURA)?;
        if principal.rol == Rol::Medico {
            filtro.medico_id = Some(principal.medico_propio()?);
        }
        self.informes.list(&principal.clinica, &filtro).await
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<InformeMedico> {
        principal.require_roles(LECTURA)?;
        self.informes
            .get(&principal.clinica, id)
            .await?
            .filter(|i| visible_para(principal, i))
            .ok_or_else(|| Error::NotFound(format!("informe {id}")))
    }

    pub async fn create(
        &self,
        principal: &Principal,
        input: InformeInput,
    ) -> Result<InformeMedico> {
        principal.require_roles(&[Rol::Admin, Rol::Medico])?;
        validar(&input)?;
        let clinica = principal.clinica.as_str();

        let medico_id = match principal.rol {
            Rol::Medico => principal.medico_propio()?,
            _ => input
                .medico_id
                .ok_or_else(|| Error::Validation("medico_id is required".to_string()))?,
        };
        if self.medicos.get(clinica, medico_id).await?.is_none() {
            return Err(Error::Validation(format!("medico {medico_id} does not exist")));
        }
        if self.pacientes.get(clinica, input.paciente_id).await?.is_none() {
            return Err(Error::Validation(format!(
                "paciente {} does not exist",
                input.paciente_id
            )));
        }
        if let Some(consulta_id) = input.consulta_id {
            let consulta = self
                .consultas
                .get(clinica, consulta_id)
                .await?
                .ok_or_else(|| {
                    Error::Validation(format!("consulta {consulta_id} does not exist"))
                })?;
            if consulta.paciente_id != input.paciente_id {
                return Err(Error::Validation(
                    "consulta belongs to a different paciente".to_string(),
                ));
            }
        }

        let informe = self
            .informes
            .create(
                clinica,
                input.paciente_id,
                medico_id,
                input.consulta_id,
                input.titulo.trim(),
                &input.contenido,
            )
            .await?;
        tracing::info!(clinica = %clinica, informe_id = %informe.id, "Informe created");
        Ok(informe)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        input: InformeUpdate,
    ) -> Result<InformeMedico> {
        principal.require_roles(&[Rol::Admin, Rol::Medico])?;
        validar(&input)?;

        let mut tx = self.pool.begin().await?;
        let result: Result<InformeMedico> = async {
            let actual = InformeRepository::lock(&mut tx, &principal.clinica, id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("informe {id}")))?;
            puede_editar(principal, &actual)?;
            InformeRepository::update_contenido(
                &mut tx,
                &principal.clinica,
                id,
                input.titulo.trim(),
                &input.contenido,
            )
            .await
        }
        .await;

        match result {
            Ok(informe) => {
                tx.commit().await?;
                Ok(informe)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }

    /// Signs the report as its author. The content can no longer change.
    pub async fn firmar(&self, principal: &Principal, id: Uuid) -> Result<InformeMedico> {
        principal.require_roles(&[Rol::Admin, Rol::Medico])?;

        let mut tx = self.pool.begin().await?;
        let result: Result<InformeMedico> = async {
            let actual = InformeRepository::lock(&mut tx, &principal.clinica, id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("informe {id}")))?;
            puede_editar(principal, &actual)?;

            let firmado_en = instante_db(Utc::now());
            let hash = firma_hash(&actual.titulo, &actual.contenido, actual.medico_id, firmado_en);
            InformeRepository::firmar(
                &mut tx,
                &principal.clinica,
                id,
                principal.user_id,
                firmado_en,
                &hash,
            )
            .await
        }
        .await;

        match result {
            Ok(informe) => {
                tx.commit().await?;
                tracing::info!(
                    clinica = %principal.clinica,
                    informe_id = %id,
                    firma_hash = ?informe.firma_hash,
                    "Informe signed"
                );
                Ok(informe)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }

    pub async fn pdf(&self, principal: &Principal, id: Uuid) -> Result<(InformeMedico, Vec<u8>)> {
        let informe = self.get(principal, id).await?;
        let (paciente, medico, clinica) = self.contexto(principal, &informe).await?;
        let html = informe_html(&clinica, &paciente, &medico, &informe);
        let bytes = self.pdf.render_html(html).await?;
        Ok((informe, bytes))
    }

    /// Emails the signed report as a PDF attachment.
    pub async fn enviar(
        &self,
        principal: &Principal,
        id: Uuid,
        input: EnviarInformeInput,
    ) -> Result<InformeMedico> {
        principal.require_roles(&[Rol::Admin, Rol::Medico, Rol::Recepcion])?;
        validar(&input)?;

        let informe = self.get(principal, id).await?;
        if !informe.firmado {
            return Err(Error::Conflict(
                "only signed informes can be sent".to_string(),
            ));
        }
        let (paciente, medico, clinica) = self.contexto(principal, &informe).await?;
        let destinatario = input
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .or_else(|| paciente.email.clone())
            .ok_or_else(|| {
                Error::Validation("the paciente has no email and none was given".to_string())
            })?;

        let html = informe_html(&clinica, &paciente, &medico, &informe);
        let pdf = self.pdf.render_html(html).await?;
        let datos = DatosInforme {
            clinica,
            paciente: paciente.nombre_completo(),
            medico: medico.nombre_completo(),
            titulo: informe.titulo.clone(),
        };
        let correo = self.plantillas.informe(&destinatario, &datos, pdf)?;
        self.notifier.enviar(correo).await?;

        let informe = self
            .informes
            .marcar_enviado(&principal.clinica, id, &destinatario)
            .await?;
        tracing::info!(
            clinica = %principal.clinica,
            informe_id = %id,
            to = %destinatario,
            "Informe sent"
        );
        Ok(informe)
    }

    async fn contexto(
        &self,
        principal: &Principal,
        informe: &InformeMedico,
    ) -> Result<(Paciente, Medico, String)> {
        let clinica = principal.clinica.as_str();
        let paciente = self
            .pacientes
            .get(clinica, informe.paciente_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("paciente {}", informe.paciente_id)))?;
        let medico = self
            .medicos
            .get(clinica, informe.medico_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("medico {}", informe.medico_id)))?;
        let nombre = self
            .clinicas
            .find_activa(clinica)
            .await?
            .map(|c| c.nombre)
            .unwrap_or_else(|| clinica.to_string());
        Ok((paciente, medico, nombre))
    }
}

fn visible_para(principal: &Principal, informe: &InformeMedico) -> bool {
    principal.rol != Rol::Medico || principal.medico_id == Some(informe.medico_id)
}

fn puede_editar(principal: &Principal, informe: &InformeMedico) -> Result<()> {
    if !visible_para(principal, informe) {
        return Err(Error::NotFound(format!("informe {}", informe.id)));
    }
    if informe.firmado {
        return Err(Error::Conflict("informe is already signed".to_string()));
    }
    Ok(())
}

/// Postgres keeps microseconds; the hash must use the stored instant.
fn instante_db(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(t.timestamp_micros()).unwrap_or(t)
}

/// Hex SHA-256 over title, content, author and signing time, one per line.
pub fn firma_hash(
    titulo: &str,
    contenido: &str,
    medico_id: Uuid,
    firmado_en: DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(titulo.as_bytes());
    hasher.update(b"\n");
    hasher.update(contenido.as_bytes());
    hasher.update(b"\n");
    hasher.update(medico_id.to_string().as_bytes());
    hasher.update(b"\n");
    hasher.update(
        firmado_en
            .to_rfc3339_opts(SecondsFormat::Micros, true)
            .as_bytes(),
    );
    format!("{:x}", hasher.finalize())
}

fn informe_html(
    clinica: &str,
    paciente: &Paciente,
    medico: &Medico,
    informe: &InformeMedico,
) -> String {
    let parrafos: String = informe
        .contenido
        .lines()
        .map(|l| format!("<p>{}</p>", escape_html(l)))
        .collect();
    let firma = match (&informe.firmado_en, &informe.firma_hash) {
        (Some(en), Some(hash)) => format!(
            "<div class=\"firma\"><p>Firmado electrónicamente el {}</p><p class=\"hash\">{}</p></div>",
            en.format("%d/%m/%Y %H:%M UTC"),
            escape_html(hash)
        ),
        _ => "<div class=\"firma\"><p>Borrador sin firmar</p></div>".to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<title>{titulo}</title>
<style>
body {{ font-family: sans-serif; font-size: 12pt; margin: 2cm; }}
header {{ border-bottom: 1px solid #444; margin-bottom: 1em; }}
.hash {{ font-family: monospace; font-size: 8pt; word-break: break-all; }}
</style>
</head>
<body>
<header>
<h2>{clinica}</h2>
<p>Paciente: {paciente} &middot; C.I. {cedula}</p>
<p>Médico: {medico}</p>
<p>Fecha: {fecha}</p>
</header>
<h1>{titulo}</h1>
{parrafos}
{firma}
</body>
</html>"#,
        titulo = escape_html(&informe.titulo),
        clinica = escape_html(clinica),
        paciente = escape_html(&paciente.nombre_completo()),
        cedula = escape_html(&paciente.cedula),
        medico = escape_html(&medico.nombre_completo()),
        fecha = informe.created_at.format("%d/%m/%Y"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn informe(medico_id: Uuid, firmado: bool) -> InformeMedico {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();
        InformeMedico {
            id: Uuid::new_v4(),
            clinica_alias: "central".to_string(),
            paciente_id: Uuid::new_v4(),
            medico_id,
            consulta_id: None,
            titulo: "Informe <cardiológico>".to_string(),
            contenido: "Línea uno\nLínea dos".to_string(),
            firmado,
            firmado_por: None,
            firmado_en: firmado.then_some(now),
            firma_hash: firmado.then(|| "abc123".to_string()),
            enviado_en: None,
            enviado_a: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn principal(rol: Rol, medico_id: Option<Uuid>) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            rol,
            clinica: "central".to_string(),
            medico_id,
        }
    }

    #[test]
    fn hash_is_stable_hex_and_depends_on_every_field() {
        let medico = Uuid::parse_str("7c9e6679-7425-40de-944b-e07fc1f90ae7").unwrap();
        let en = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();
        let a = firma_hash("T", "C", medico, en);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, firma_hash("T", "C", medico, en));
        assert_ne!(a, firma_hash("T2", "C", medico, en));
        assert_ne!(a, firma_hash("T", "C2", medico, en));
        assert_ne!(a, firma_hash("T", "C", Uuid::new_v4(), en));
        assert_ne!(a, firma_hash("T", "C", medico, en + chrono::Duration::seconds(1)));
    }

    #[test]
    fn signing_time_is_truncated_to_microseconds() {
        let t = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        assert_eq!(instante_db(t).timestamp_subsec_nanos(), 123_456_000);
    }

    #[test]
    fn signed_reports_are_frozen() {
        let medico = Uuid::new_v4();
        let autor = principal(Rol::Medico, Some(medico));
        assert!(puede_editar(&autor, &informe(medico, false)).is_ok());
        assert!(matches!(
            puede_editar(&autor, &informe(medico, true)),
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            puede_editar(&principal(Rol::Medico, Some(Uuid::new_v4())), &informe(medico, false)),
            Err(Error::NotFound(_))
        ));
        assert!(puede_editar(&principal(Rol::Admin, None), &informe(medico, false)).is_ok());
    }

    #[test]
    fn doctors_only_see_their_own_reports() {
        let medico = Uuid::new_v4();
        let propio = informe(medico, true);
        assert!(visible_para(&principal(Rol::Medico, Some(medico)), &propio));
        assert!(!visible_para(&principal(Rol::Medico, Some(Uuid::new_v4())), &propio));
        assert!(!visible_para(&principal(Rol::Medico, None), &propio));
        assert!(visible_para(&principal(Rol::Admin, None), &propio));
        assert!(visible_para(&principal(Rol::Recepcion, None), &propio));
    }

    #[test]
    fn html_escapes_content_and_shows_signature() {
        let now = Utc::now();
        let medico_id = Uuid::new_v4();
        let paciente = Paciente {
            id: Uuid::new_v4(),
            clinica_alias: "central".to_string(),
            cedula: "V12345678".to_string(),
            nombres: "Ana".to_string(),
            apellidos: "Pérez".to_string(),
            fecha_nacimiento: None,
            sexo: None,
            telefono: None,
            email: None,
            direccion: None,
            created_at: now,
            updated_at: now,
        };
        let medico = Medico {
            id: medico_id,
            clinica_alias: "central".to_string(),
            especialidad_id: None,
            cedula: "V9999999".to_string(),
            nombres: "Luis".to_string(),
            apellidos: "Gómez".to_string(),
            email: None,
            telefono: None,
            activo: true,
            created_at: now,
            updated_at: now,
        };

        let html = informe_html("Central", &paciente, &medico, &informe(medico_id, true));
        assert!(html.contains("Informe &lt;cardiológico&gt;"));
        assert!(html.contains("<p>Línea dos</p>"));
        assert!(html.contains("abc123"));
        assert!(html.contains("C.I. V12345678"));

        let borrador = informe_html("Central", &paciente, &medico, &informe(medico_id, false));
        assert!(borrador.contains("Borrador sin firmar"));
    }
}
