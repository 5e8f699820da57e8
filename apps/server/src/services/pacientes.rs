//! Patient records and their medical history.

use crate::{
    auth::Principal,
    db::{HistoricoRepository, PacienteRepository},
    models::{
        texto, validar, Historico, HistoricoInput, NuevoHistorico, Paciente, PacienteBusqueda,
        PacienteInput, Pagina, Paginacion,
    },
    Error, Result,
};
use clinica_core::{OrigenHistorico, Rol};
use uuid::Uuid;

const ESCRITURA: &[Rol] = &[Rol::Admin, Rol::Recepcion, Rol::Medico];

pub struct PacienteService {
    pacientes: PacienteRepository,
    historicos: HistoricoRepository,
}

impl PacienteService {
    pub fn new(pacientes: PacienteRepository, historicos: HistoricoRepository) -> Self {
        Self {
            pacientes,
            historicos,
        }
    }

    pub async fn buscar(
        &self,
        principal: &Principal,
        busqueda: PacienteBusqueda,
    ) -> Result<Pagina<Paciente>> {
        let paginacion = Paginacion {
            limit: busqueda.limit,
            offset: busqueda.offset,
        };
        let q = texto(busqueda.q);
        let (items, total) = self
            .pacientes
            .search(
                &principal.clinica,
                q.as_deref(),
                paginacion.limit(),
                paginacion.offset(),
            )
            .await?;
        Ok(Pagina {
            items,
            total,
            limit: paginacion.limit(),
            offset: paginacion.offset(),
        })
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<Paciente> {
        self.pacientes
            .get(&principal.clinica, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("paciente {id}")))
    }

    pub async fn create(&self, principal: &Principal, input: PacienteInput) -> Result<Paciente> {
        principal.require_roles(ESCRITURA)?;
        let input = normalizar(input);
        validar(&input)?;
        let paciente = self.pacientes.create(&principal.clinica, &input).await?;
        tracing::info!(
            clinica = %principal.clinica,
            paciente_id = %paciente.id,
            "Paciente created"
        );
        Ok(paciente)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        input: PacienteInput,
    ) -> Result<Paciente> {
        principal.require_roles(ESCRITURA)?;
        let input = normalizar(input);
        validar(&input)?;
        self.pacientes
            .update(&principal.clinica, id, &input)
            .await?
            .ok_or_else(|| Error::NotFound(format!("paciente {id}")))
    }

    /// The patient's full chart. Clinical content, so finance users are kept out.
    pub async fn historico(
        &self,
        principal: &Principal,
        paciente_id: Uuid,
    ) -> Result<Vec<Historico>> {
        principal.require_roles(ESCRITURA)?;
        self.get(principal, paciente_id).await?;
        self.historicos
            .list_por_paciente(&principal.clinica, paciente_id)
            .await
    }

    /// Manual history entry written by a doctor or an admin.
    pub async fn agregar_historico(
        &self,
        principal: &Principal,
        paciente_id: Uuid,
        input: HistoricoInput,
    ) -> Result<Historico> {
        principal.require_roles(&[Rol::Admin, Rol::Medico])?;
        validar(&input)?;
        self.get(principal, paciente_id).await?;

        let medico_id = match principal.rol {
            Rol::Medico => Some(principal.medico_propio()?),
            _ => None,
        };
        let nuevo = NuevoHistorico {
            paciente_id,
            consulta_id: None,
            medico_id,
            fecha: input.fecha.unwrap_or_else(chrono::Utc::now),
            motivo: texto(input.motivo),
            antecedentes: texto(input.antecedentes),
            diagnostico: texto(input.diagnostico),
            tratamiento: texto(input.tratamiento),
            observaciones: texto(input.observaciones),
            origen: OrigenHistorico::Manual,
            archivo_origen: None,
            created_by: Some(principal.user_id),
        };
        self.historicos.create(&principal.clinica, &nuevo).await
    }
}

fn normalizar(input: PacienteInput) -> PacienteInput {
    PacienteInput {
        cedula: clinica_import::normalizar_cedula(&input.cedula),
        nombres: input.nombres.trim().to_string(),
        apellidos: input.apellidos.trim().to_string(),
        fecha_nacimiento: input.fecha_nacimiento,
        sexo: texto(input.sexo),
        telefono: texto(input.telefono),
        email: texto(input.email),
        direccion: texto(input.direccion),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_is_trimmed_and_cedula_normalized() {
        let input = PacienteInput {
            cedula: " v-12.345.678 ".to_string(),
            nombres: " Ana ".to_string(),
            apellidos: "Pérez ".to_string(),
            fecha_nacimiento: None,
            sexo: Some("".to_string()),
            telefono: Some(" 0414-1234567 ".to_string()),
            email: None,
            direccion: None,
        };
        let n = normalizar(input);
        assert_eq!(n.cedula, clinica_import::normalizar_cedula("V-12345678"));
        assert_eq!(n.nombres, "Ana");
        assert_eq!(n.apellidos, "Pérez");
        assert_eq!(n.sexo, None);
        assert_eq!(n.telefono.as_deref(), Some("0414-1234567"));
    }
}
