use crate::models::TasaCambio;
use crate::Result;
use chrono::NaiveDate;
use clinica_core::Moneda;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const COLUMNS: &str =
    "id, clinica_alias, moneda_origen, moneda_destino, valor, fecha, created_at";

const LATEST: &str = "SELECT id, clinica_alias, moneda_origen, moneda_destino, valor, fecha, created_at
     FROM tasas_cambio
     WHERE clinica_alias = $1 AND moneda_origen = $2 AND moneda_destino = $3
     ORDER BY fecha DESC, created_at DESC
     LIMIT 1";

#[derive(Clone)]
pub struct TasaRepository {
    pool: PgPool,
}

impl TasaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, clinica: &str, limit: i64) -> Result<Vec<TasaCambio>> {
        let rows = sqlx::query_as::<_, TasaCambio>(&format!(
            "SELECT {COLUMNS} FROM tasas_cambio
             WHERE clinica_alias = $1
             ORDER BY fecha DESC, created_at DESC
             LIMIT $2"
        ))
        .bind(clinica)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn latest(&self, clinica: &str) -> Result<Option<TasaCambio>> {
        let mut conn = self.pool.acquire().await?;
        Self::latest_in(&mut conn, clinica).await
    }

    /// Most recent USD -> VES rate for the clinic.
    pub async fn latest_in(conn: &mut PgConnection, clinica: &str) -> Result<Option<TasaCambio>> {
        let row = sqlx::query_as::<_, TasaCambio>(LATEST)
            .bind(clinica)
            .bind(Moneda::Usd)
            .bind(Moneda::Ves)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    pub async fn create(
        &self,
        clinica: &str,
        valor: Decimal,
        fecha: NaiveDate,
    ) -> Result<TasaCambio> {
        let row = sqlx::query_as::<_, TasaCambio>(&format!(
            "INSERT INTO tasas_cambio (id, clinica_alias, moneda_origen, moneda_destino, valor, fecha)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(clinica)
        .bind(Moneda::Usd)
        .bind(Moneda::Ves)
        .bind(valor)
        .bind(fecha)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
