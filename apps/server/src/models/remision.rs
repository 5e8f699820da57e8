use chrono::{DateTime, Utc};
use clinica_core::EstadoRemision;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Remision {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub clinica_alias: String,
    pub paciente_id: Uuid,
    pub medico_remitente_id: Uuid,
    pub medico_destino_id: Uuid,
    pub especialidad_destino_id: Option<Uuid>,
    pub consulta_origen_id: Option<Uuid>,
    /// Follow-up consulta scheduled with the destination doctor.
    pub consulta_id: Option<Uuid>,
    pub motivo: String,
    pub observaciones: Option<String>,
    pub estado: EstadoRemision,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RemisionInput {
    pub paciente_id: Uuid,
    /// Required for admins; doctors always refer as themselves.
    pub medico_remitente_id: Option<Uuid>,
    pub medico_destino_id: Uuid,
    pub consulta_origen_id: Option<Uuid>,
    #[validate(length(min = 1, max = 2000))]
    pub motivo: String,
    #[validate(length(max = 4000))]
    pub observaciones: Option<String>,
    pub fecha_propuesta: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemisionFiltro {
    pub estado: Option<EstadoRemision>,
    /// Matches either the referring or the destination doctor.
    pub medico_id: Option<Uuid>,
    pub paciente_id: Option<Uuid>,
}
