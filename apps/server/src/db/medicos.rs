use crate::models::{Medico, MedicoFiltro, MedicoInput};
use crate::Result;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const COLUMNS: &str = "id, clinica_alias, especialidad_id, cedula, nombres, apellidos, \
                       email, telefono, activo, created_at, updated_at";

#[derive(Clone)]
pub struct MedicoRepository {
    pool: PgPool,
}

impl MedicoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, clinica: &str, filtro: &MedicoFiltro) -> Result<Vec<Medico>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM medicos WHERE clinica_alias = "));
        qb.push_bind(clinica);
        if let Some(especialidad_id) = filtro.especialidad_id {
            qb.push(" AND especialidad_id = ").push_bind(especialidad_id);
        }
        if let Some(activo) = filtro.activo {
            qb.push(" AND activo = ").push_bind(activo);
        }
        qb.push(" ORDER BY apellidos, nombres");

        let rows = qb.build_query_as::<Medico>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn get(&self, clinica: &str, id: Uuid) -> Result<Option<Medico>> {
        let row = sqlx::query_as::<_, Medico>(&format!(
            "SELECT {COLUMNS} FROM medicos WHERE clinica_alias = $1 AND id = $2"
        ))
        .bind(clinica)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn create(&self, clinica: &str, input: &MedicoInput) -> Result<Medico> {
        let row = sqlx::query_as::<_, Medico>(&format!(
            "INSERT INTO medicos
                (id, clinica_alias, especialidad_id, cedula, nombres, apellidos, email, telefono, activo)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(clinica)
        .bind(input.especialidad_id)
        .bind(input.cedula.trim())
        .bind(input.nombres.trim())
        .bind(input.apellidos.trim())
        .bind(input.email.as_deref())
        .bind(input.telefono.as_deref())
        .bind(input.activo)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update(
        &self,
        clinica: &str,
        id: Uuid,
        input: &MedicoInput,
    ) -> Result<Option<Medico>> {
        let row = sqlx::query_as::<_, Medico>(&format!(
            "UPDATE medicos
             SET especialidad_id = $3, cedula = $4, nombres = $5, apellidos = $6,
                 email = $7, telefono = $8, activo = $9, updated_at = NOW()
             WHERE clinica_alias = $1 AND id = $2
             RETURNING {COLUMNS}"
        ))
        .bind(clinica)
        .bind(id)
        .bind(input.especialidad_id)
        .bind(input.cedula.trim())
        .bind(input.nombres.trim())
        .bind(input.apellidos.trim())
        .bind(input.email.as_deref())
        .bind(input.telefono.as_deref())
        .bind(input.activo)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
