use chrono::{DateTime, NaiveDate, Utc};
use clinica_core::OrigenHistorico;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Paciente {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub clinica_alias: String,
    pub cedula: String,
    pub nombres: String,
    pub apellidos: String,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub sexo: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub direccion: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Paciente {
    pub fn nombre_completo(&self) -> String {
        format!("{} {}", self.nombres, self.apellidos)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PacienteInput {
    #[validate(length(min = 3, max = 20))]
    pub cedula: String,
    #[validate(length(min = 1, max = 120))]
    pub nombres: String,
    #[validate(length(min = 1, max = 120))]
    pub apellidos: String,
    pub fecha_nacimiento: Option<NaiveDate>,
    #[validate(length(max = 10))]
    pub sexo: Option<String>,
    #[validate(length(max = 40))]
    pub telefono: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 300))]
    pub direccion: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PacienteBusqueda {
    /// Matches cedula prefix or any part of the name.
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Historico {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub clinica_alias: String,
    pub paciente_id: Uuid,
    pub consulta_id: Option<Uuid>,
    pub medico_id: Option<Uuid>,
    pub fecha: DateTime<Utc>,
    pub motivo: Option<String>,
    pub antecedentes: Option<String>,
    pub diagnostico: Option<String>,
    pub tratamiento: Option<String>,
    pub observaciones: Option<String>,
    pub origen: OrigenHistorico,
    pub archivo_origen: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct HistoricoInput {
    pub fecha: Option<DateTime<Utc>>,
    #[validate(length(max = 2000))]
    pub motivo: Option<String>,
    #[validate(length(max = 10000))]
    pub antecedentes: Option<String>,
    #[validate(length(max = 10000))]
    pub diagnostico: Option<String>,
    #[validate(length(max = 10000))]
    pub tratamiento: Option<String>,
    #[validate(length(max = 10000))]
    pub observaciones: Option<String>,
}

/// Values for a new history row, whatever its origin.
#[derive(Debug, Clone)]
pub struct NuevoHistorico {
    pub paciente_id: Uuid,
    pub consulta_id: Option<Uuid>,
    pub medico_id: Option<Uuid>,
    pub fecha: DateTime<Utc>,
    pub motivo: Option<String>,
    pub antecedentes: Option<String>,
    pub diagnostico: Option<String>,
    pub tratamiento: Option<String>,
    pub observaciones: Option<String>,
    pub origen: OrigenHistorico,
    pub archivo_origen: Option<String>,
    pub created_by: Option<Uuid>,
}
