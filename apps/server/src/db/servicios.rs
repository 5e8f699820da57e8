use crate::models::{Servicio, ServicioInput};
use crate::Result;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const COLUMNS: &str =
    "id, clinica_alias, especialidad_id, nombre, precio_usd, activo, created_at, updated_at";

#[derive(Clone)]
pub struct ServicioRepository {
    pool: PgPool,
}

impl ServicioRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, clinica: &str, incluir_inactivos: bool) -> Result<Vec<Servicio>> {
        let rows = sqlx::query_as::<_, Servicio>(&format!(
            "SELECT {COLUMNS} FROM servicios
             WHERE clinica_alias = $1 AND ($2 OR activo)
             ORDER BY nombre"
        ))
        .bind(clinica)
        .bind(incluir_inactivos)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create(&self, clinica: &str, input: &ServicioInput) -> Result<Servicio> {
        let row = sqlx::query_as::<_, Servicio>(&format!(
            "INSERT INTO servicios (id, clinica_alias, especialidad_id, nombre, precio_usd, activo)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(clinica)
        .bind(input.especialidad_id)
        .bind(input.nombre.trim())
        .bind(input.precio_usd)
        .bind(input.activo)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update(
        &self,
        clinica: &str,
        id: Uuid,
        input: &ServicioInput,
    ) -> Result<Option<Servicio>> {
        let row = sqlx::query_as::<_, Servicio>(&format!(
            "UPDATE servicios
             SET especialidad_id = $3, nombre = $4, precio_usd = $5, activo = $6, updated_at = NOW()
             WHERE clinica_alias = $1 AND id = $2
             RETURNING {COLUMNS}"
        ))
        .bind(clinica)
        .bind(id)
        .bind(input.especialidad_id)
        .bind(input.nombre.trim())
        .bind(input.precio_usd)
        .bind(input.activo)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_by_id(
        conn: &mut PgConnection,
        clinica: &str,
        id: Uuid,
    ) -> Result<Option<Servicio>> {
        let row = sqlx::query_as::<_, Servicio>(&format!(
            "SELECT {COLUMNS} FROM servicios WHERE clinica_alias = $1 AND id = $2"
        ))
        .bind(clinica)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row)
    }

    /// Case-insensitive lookup by name.
    pub async fn find_by_nombre(
        conn: &mut PgConnection,
        clinica: &str,
        nombre: &str,
    ) -> Result<Option<Servicio>> {
        let row = sqlx::query_as::<_, Servicio>(&format!(
            "SELECT {COLUMNS} FROM servicios
             WHERE clinica_alias = $1 AND LOWER(nombre) = LOWER($2)"
        ))
        .bind(clinica)
        .bind(nombre.trim())
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn insert(
        conn: &mut PgConnection,
        clinica: &str,
        nombre: &str,
        precio_usd: Decimal,
        especialidad_id: Option<Uuid>,
    ) -> Result<Servicio> {
        let row = sqlx::query_as::<_, Servicio>(&format!(
            "INSERT INTO servicios (id, clinica_alias, especialidad_id, nombre, precio_usd)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(clinica)
        .bind(especialidad_id)
        .bind(nombre)
        .bind(precio_usd)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }
}
