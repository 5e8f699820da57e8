//! Database layer
//!
//! Repositories own the SQL. Reads go through the pool; the steps of a
//! multi-table write are associated functions taking `&mut PgConnection`
//! so services can run them inside one transaction.

pub mod clinicas;
pub mod consultas;
pub mod especialidades;
pub mod finanzas;
pub mod historicos;
pub mod informes;
pub mod medicos;
pub mod pacientes;
pub mod remisiones;
pub mod servicios;
pub mod tasas;

pub use clinicas::ClinicaRepository;
pub use consultas::ConsultaRepository;
pub use especialidades::EspecialidadRepository;
pub use finanzas::FinanzasRepository;
pub use historicos::HistoricoRepository;
pub use informes::InformeRepository;
pub use medicos::MedicoRepository;
pub use pacientes::PacienteRepository;
pub use remisiones::RemisionRepository;
pub use servicios::ServicioRepository;
pub use tasas::TasaRepository;

use crate::{config::Config, Result};
use sqlx::PgPool;

pub async fn create_db_pool(config: &Config) -> Result<PgPool> {
    tracing::info!("Creating database connection pool...");

    let statement_timeout = config.database.statement_timeout_seconds;
    let lock_timeout = config.database.lock_timeout_seconds;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .min_connections(config.database.pool_min_size)
        .max_connections(config.database.pool_max_size)
        .acquire_timeout(std::time::Duration::from_secs(
            config.database.pool_timeout_seconds,
        ))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query(&format!("SET statement_timeout = '{}s'", statement_timeout))
                    .execute(&mut *conn)
                    .await?;

                // Bounds how long a status change waits on a locked consulta.
                sqlx::query(&format!("SET lock_timeout = '{}s'", lock_timeout))
                    .execute(&mut *conn)
                    .await?;

                Ok(())
            })
        })
        .connect(&config.database.url)
        .await
        .map_err(crate::Error::Database)?;

    tracing::info!(
        "Database pool created (min: {}, max: {})",
        config.database.pool_min_size,
        config.database.pool_max_size
    );

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| crate::Error::Internal(format!("Migration failed: {}", e)))
}

/// Escapes LIKE wildcards in user search input.
pub(crate) fn like_pattern(q: &str) -> String {
    let escaped = q
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" Pé%rez_ "), "%pé\\%rez\\_%");
    }
}
