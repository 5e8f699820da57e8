use chrono::{DateTime, NaiveDate, Utc};
use clinica_core::Moneda;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Clinica {
    pub alias: String,
    pub nombre: String,
    pub email_contacto: Option<String>,
    pub activa: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Especialidad {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub clinica_alias: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub activa: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EspecialidadInput {
    #[validate(length(min = 1, max = 120))]
    pub nombre: String,
    #[validate(length(max = 1000))]
    pub descripcion: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Medico {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub clinica_alias: String,
    pub especialidad_id: Option<Uuid>,
    pub cedula: String,
    pub nombres: String,
    pub apellidos: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medico {
    pub fn nombre_completo(&self) -> String {
        format!("{} {}", self.nombres, self.apellidos)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MedicoInput {
    pub especialidad_id: Option<Uuid>,
    #[validate(length(min = 3, max = 20))]
    pub cedula: String,
    #[validate(length(min = 1, max = 120))]
    pub nombres: String,
    #[validate(length(min = 1, max = 120))]
    pub apellidos: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 40))]
    pub telefono: Option<String>,
    #[serde(default = "default_true")]
    pub activo: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicoFiltro {
    pub especialidad_id: Option<Uuid>,
    pub activo: Option<bool>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Servicio {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub clinica_alias: String,
    pub especialidad_id: Option<Uuid>,
    pub nombre: String,
    pub precio_usd: Decimal,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ServicioInput {
    pub especialidad_id: Option<Uuid>,
    #[validate(length(min = 1, max = 160))]
    pub nombre: String,
    pub precio_usd: Decimal,
    #[serde(default = "default_true")]
    pub activo: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TasaCambio {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub clinica_alias: String,
    pub moneda_origen: Moneda,
    pub moneda_destino: Moneda,
    pub valor: Decimal,
    pub fecha: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TasaInput {
    pub valor: Decimal,
    pub fecha: Option<NaiveDate>,
}

fn default_true() -> bool {
    true
}
