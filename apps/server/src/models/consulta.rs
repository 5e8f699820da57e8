use chrono::{DateTime, NaiveDate, Utc};
use clinica_core::{EstadoConsulta, EstadoPago, MetodoPago, Moneda};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Consulta {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub clinica_alias: String,
    pub paciente_id: Uuid,
    pub medico_id: Uuid,
    pub especialidad_id: Option<Uuid>,
    pub fecha: DateTime<Utc>,
    pub motivo: Option<String>,
    pub estado: EstadoConsulta,
    pub fecha_anterior: Option<DateTime<Utc>>,
    pub reagendamientos: i32,
    pub motivo_reagenda: Option<String>,
    pub diagnostico: Option<String>,
    pub tratamiento: Option<String>,
    pub observaciones: Option<String>,
    pub moneda: Option<Moneda>,
    pub metodo_pago: Option<MetodoPago>,
    pub estado_pago: EstadoPago,
    pub tasa_cambio: Option<Decimal>,
    pub total_usd: Option<Decimal>,
    pub total_bs: Option<Decimal>,
    pub motivo_cancelacion: Option<String>,
    pub cancelada_por: Option<Uuid>,
    pub cancelada_en: Option<DateTime<Utc>>,
    pub finalizada_por: Option<Uuid>,
    pub finalizada_en: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A settled line as persisted in `consulta_servicios`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ConsultaServicio {
    pub id: Uuid,
    pub consulta_id: Uuid,
    pub servicio_id: Uuid,
    pub nombre: String,
    pub cantidad: i32,
    pub precio_unitario_usd: Decimal,
    pub subtotal_usd: Decimal,
    pub subtotal_bs: Option<Decimal>,
    pub tasa_cambio: Option<Decimal>,
    pub moneda: Moneda,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsultaDetalle {
    #[serde(flatten)]
    pub consulta: Consulta,
    pub servicios: Vec<ConsultaServicio>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ConsultaInput {
    pub paciente_id: Uuid,
    pub medico_id: Uuid,
    /// Defaults to the doctor's specialty.
    pub especialidad_id: Option<Uuid>,
    pub fecha: DateTime<Utc>,
    #[validate(length(max = 2000))]
    pub motivo: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsultaFiltro {
    pub estado: Option<EstadoConsulta>,
    pub medico_id: Option<Uuid>,
    pub paciente_id: Option<Uuid>,
    pub desde: Option<NaiveDate>,
    pub hasta: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReagendarInput {
    pub fecha: DateTime<Utc>,
    #[validate(length(max = 2000))]
    pub motivo: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CancelarInput {
    #[validate(length(min = 1, max = 2000))]
    pub motivo: String,
}

/// One requested billable line. Either `servicio_id` or `nombre` identifies
/// the service; `precio_usd` lets an unknown name be created on the fly.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LineaSolicitada {
    pub servicio_id: Option<Uuid>,
    #[validate(length(min = 1, max = 160))]
    pub nombre: Option<String>,
    pub precio_usd: Option<Decimal>,
    #[serde(default = "default_cantidad")]
    #[validate(range(min = 1, max = 1000))]
    pub cantidad: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FinalizarInput {
    #[validate(length(min = 1, max = 100), nested)]
    pub servicios: Vec<LineaSolicitada>,
    pub moneda: Moneda,
    pub metodo_pago: Option<MetodoPago>,
    #[serde(default = "default_estado_pago")]
    pub estado_pago: EstadoPago,
    /// Overrides the clinic's latest stored rate.
    pub tasa_cambio: Option<Decimal>,
    #[validate(length(max = 10000))]
    pub diagnostico: Option<String>,
    #[validate(length(max = 10000))]
    pub tratamiento: Option<String>,
    #[validate(length(max = 10000))]
    pub observaciones: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagoInput {
    pub estado_pago: EstadoPago,
    pub metodo_pago: Option<MetodoPago>,
}

fn default_cantidad() -> i32 {
    1
}

fn default_estado_pago() -> EstadoPago {
    EstadoPago::Pendiente
}
