//! Tenant registry.

use crate::models::Clinica;
use crate::Result;
use sqlx::PgPool;

#[derive(Clone)]
pub struct ClinicaRepository {
    pool: PgPool,
}

impl ClinicaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_activa(&self, alias: &str) -> Result<Option<Clinica>> {
        let clinica = sqlx::query_as::<_, Clinica>(
            "SELECT alias, nombre, email_contacto, activa, created_at
             FROM clinicas WHERE alias = $1 AND activa = TRUE",
        )
        .bind(alias)
        .fetch_optional(&self.pool)
        .await?;
        Ok(clinica)
    }

    pub async fn create(
        &self,
        alias: &str,
        nombre: &str,
        email_contacto: Option<&str>,
    ) -> Result<Clinica> {
        let clinica = sqlx::query_as::<_, Clinica>(
            "INSERT INTO clinicas (alias, nombre, email_contacto)
             VALUES ($1, $2, $3)
             RETURNING alias, nombre, email_contacto, activa, created_at",
        )
        .bind(alias)
        .bind(nombre)
        .bind(email_contacto)
        .fetch_one(&self.pool)
        .await?;
        Ok(clinica)
    }
}
