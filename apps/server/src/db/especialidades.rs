use crate::models::{Especialidad, EspecialidadInput};
use crate::Result;
use sqlx::PgPool;
use uuid::Uuid;

const COLUMNS: &str =
    "id, clinica_alias, nombre, descripcion, activa, created_at, updated_at";

#[derive(Clone)]
pub struct EspecialidadRepository {
    pool: PgPool,
}

impl EspecialidadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, clinica: &str, incluir_inactivas: bool) -> Result<Vec<Especialidad>> {
        let rows = sqlx::query_as::<_, Especialidad>(&format!(
            "SELECT {COLUMNS} FROM especialidades
             WHERE clinica_alias = $1 AND ($2 OR activa)
             ORDER BY nombre"
        ))
        .bind(clinica)
        .bind(incluir_inactivas)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, clinica: &str, id: Uuid) -> Result<Option<Especialidad>> {
        let row = sqlx::query_as::<_, Especialidad>(&format!(
            "SELECT {COLUMNS} FROM especialidades WHERE clinica_alias = $1 AND id = $2"
        ))
        .bind(clinica)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn create(&self, clinica: &str, input: &EspecialidadInput) -> Result<Especialidad> {
        let row = sqlx::query_as::<_, Especialidad>(&format!(
            "INSERT INTO especialidades (id, clinica_alias, nombre, descripcion)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(clinica)
        .bind(input.nombre.trim())
        .bind(input.descripcion.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update(
        &self,
        clinica: &str,
        id: Uuid,
        input: &EspecialidadInput,
    ) -> Result<Option<Especialidad>> {
        let row = sqlx::query_as::<_, Especialidad>(&format!(
            "UPDATE especialidades
             SET nombre = $3, descripcion = $4, updated_at = NOW()
             WHERE clinica_alias = $1 AND id = $2
             RETURNING {COLUMNS}"
        ))
        .bind(clinica)
        .bind(id)
        .bind(input.nombre.trim())
        .bind(input.descripcion.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Soft delete: consultas and doctors keep their reference.
    pub async fn desactivar(&self, clinica: &str, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE especialidades SET activa = FALSE, updated_at = NOW()
             WHERE clinica_alias = $1 AND id = $2",
        )
        .bind(clinica)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
