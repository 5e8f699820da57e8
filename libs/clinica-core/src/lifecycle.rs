//! Consulta lifecycle: which state changes are legal and who may perform them.

use crate::enums::{EstadoConsulta, Rol};
use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A requested state change on a consulta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transicion {
    Iniciar,
    Completar,
    Finalizar,
    Cancelar,
    Reagendar,
}

impl Transicion {
    pub fn destino(&self) -> EstadoConsulta {
        match self {
            Transicion::Iniciar => EstadoConsulta::EnProgreso,
            Transicion::Completar => EstadoConsulta::Completada,
            Transicion::Finalizar => EstadoConsulta::Finalizada,
            Transicion::Cancelar => EstadoConsulta::Cancelada,
            Transicion::Reagendar => EstadoConsulta::Reagendada,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Transicion::Iniciar => "iniciar",
            Transicion::Completar => "completar",
            Transicion::Finalizar => "finalizar",
            Transicion::Cancelar => "cancelar",
            Transicion::Reagendar => "reagendar",
        }
    }
}

/// The caller as seen by permission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub rol: Rol,
    pub medico_id: Option<Uuid>,
}

impl Actor {
    pub fn new(rol: Rol, medico_id: Option<Uuid>) -> Self {
        Self { rol, medico_id }
    }

    /// True when the caller is the doctor assigned to the record.
    pub fn es_medico_asignado(&self, medico_asignado: Uuid) -> bool {
        self.rol == Rol::Medico && self.medico_id == Some(medico_asignado)
    }
}

impl EstadoConsulta {
    pub fn can_transition_to(&self, next: EstadoConsulta) -> bool {
        use EstadoConsulta::*;

        match (*self, next) {
            (Agendada | Reagendada, EnProgreso | Completada | Finalizada | Cancelada) => true,
            (Agendada | Reagendada, Reagendada) => true,
            (EnProgreso, Completada | Finalizada | Cancelada) => true,
            (Completada, Finalizada) => true,
            _ => false,
        }
    }
}

/// Returns the target state when `transicion` is legal from `actual`.
pub fn validar_transicion(
    actual: EstadoConsulta,
    transicion: Transicion,
) -> Result<EstadoConsulta> {
    let destino = transicion.destino();
    if actual.can_transition_to(destino) {
        Ok(destino)
    } else {
        Err(DomainError::InvalidTransition {
            from: actual,
            to: destino,
        })
    }
}

/// Checks whether `actor` may apply `transicion` to a consulta owned by
/// `medico_asignado`.
pub fn autorizar(actor: &Actor, transicion: Transicion, medico_asignado: Uuid) -> Result<()> {
    let permitido = match (actor.rol, transicion) {
        (Rol::Admin, _) => true,
        (Rol::Finanzas, _) => false,
        (Rol::Recepcion, Transicion::Cancelar | Transicion::Reagendar) => true,
        (Rol::Recepcion, _) => false,
        (Rol::Medico, Transicion::Reagendar) => false,
        (Rol::Medico, _) => actor.es_medico_asignado(medico_asignado),
    };

    if permitido {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!(
            "role '{}' may not {} this consulta",
            actor.rol,
            transicion.as_str()
        )))
    }
}

/// Validation plus permission in the order the API reports them.
pub fn aplicar(
    actor: &Actor,
    actual: EstadoConsulta,
    transicion: Transicion,
    medico_asignado: Uuid,
) -> Result<EstadoConsulta> {
    autorizar(actor, transicion, medico_asignado)?;
    validar_transicion(actual, transicion)
}
