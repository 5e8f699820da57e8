use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InformeMedico {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub clinica_alias: String,
    pub paciente_id: Uuid,
    pub medico_id: Uuid,
    pub consulta_id: Option<Uuid>,
    pub titulo: String,
    pub contenido: String,
    pub firmado: bool,
    pub firmado_por: Option<Uuid>,
    pub firmado_en: Option<DateTime<Utc>>,
    pub firma_hash: Option<String>,
    pub enviado_en: Option<DateTime<Utc>>,
    pub enviado_a: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InformeInput {
    pub paciente_id: Uuid,
    pub consulta_id: Option<Uuid>,
    /// Only admins may author on behalf of a doctor.
    pub medico_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub titulo: String,
    #[validate(length(min = 1, max = 50000))]
    pub contenido: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InformeUpdate {
    #[validate(length(min = 1, max = 200))]
    pub titulo: String,
    #[validate(length(min = 1, max = 50000))]
    pub contenido: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InformeFiltro {
    pub paciente_id: Option<Uuid>,
    pub medico_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct EnviarInformeInput {
    /// Overrides the patient's email address.
    #[validate(email)]
    pub email: Option<String>,
}
