use crate::models::{Remision, RemisionFiltro};
use crate::Result;
use clinica_core::EstadoRemision;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const COLUMNS: &str = "id, clinica_alias, paciente_id, medico_remitente_id, medico_destino_id, \
                       especialidad_destino_id, consulta_origen_id, consulta_id, motivo, \
                       observaciones, estado, created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NuevaRemision<'a> {
    pub paciente_id: Uuid,
    pub medico_remitente_id: Uuid,
    pub medico_destino_id: Uuid,
    pub especialidad_destino_id: Option<Uuid>,
    pub consulta_origen_id: Option<Uuid>,
    pub consulta_id: Uuid,
    pub motivo: &'a str,
    pub observaciones: Option<&'a str>,
    pub created_by: Uuid,
}

#[derive(Clone)]
pub struct RemisionRepository {
    pool: PgPool,
}

impl RemisionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, clinica: &str, filtro: &RemisionFiltro) -> Result<Vec<Remision>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {COLUMNS} FROM remisiones WHERE clinica_alias = "
        ));
        qb.push_bind(clinica);
        if let Some(estado) = filtro.estado {
            qb.push(" AND estado = ").push_bind(estado);
        }
        if let Some(medico_id) = filtro.medico_id {
            qb.push(" AND (medico_remitente_id = ")
                .push_bind(medico_id)
                .push(" OR medico_destino_id = ")
                .push_bind(medico_id)
                .push(")");
        }
        if let Some(paciente_id) = filtro.paciente_id {
            qb.push(" AND paciente_id = ").push_bind(paciente_id);
        }
        qb.push(" ORDER BY created_at DESC");

        let rows = qb.build_query_as::<Remision>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn get(&self, clinica: &str, id: Uuid) -> Result<Option<Remision>> {
        let row = sqlx::query_as::<_, Remision>(&format!(
            "SELECT {COLUMNS} FROM remisiones WHERE clinica_alias = $1 AND id = $2"
        ))
        .bind(clinica)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn insert(
        conn: &mut PgConnection,
        clinica: &str,
        nueva: &NuevaRemision<'_>,
    ) -> Result<Remision> {
        let row = sqlx::query_as::<_, Remision>(&format!(
            "INSERT INTO remisiones
                (id, clinica_alias, paciente_id, medico_remitente_id, medico_destino_id,
                 especialidad_destino_id, consulta_origen_id, consulta_id, motivo, observaciones,
                 estado, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(clinica)
        .bind(nueva.paciente_id)
        .bind(nueva.medico_remitente_id)
        .bind(nueva.medico_destino_id)
        .bind(nueva.especialidad_destino_id)
        .bind(nueva.consulta_origen_id)
        .bind(nueva.consulta_id)
        .bind(nueva.motivo)
        .bind(nueva.observaciones)
        .bind(EstadoRemision::Pendiente)
        .bind(nueva.created_by)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn lock(
        conn: &mut PgConnection,
        clinica: &str,
        id: Uuid,
    ) -> Result<Option<Remision>> {
        let row = sqlx::query_as::<_, Remision>(&format!(
            "SELECT {COLUMNS} FROM remisiones
             WHERE clinica_alias = $1 AND id = $2
             FOR UPDATE"
        ))
        .bind(clinica)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn set_estado(
        conn: &mut PgConnection,
        clinica: &str,
        id: Uuid,
        estado: EstadoRemision,
    ) -> Result<Remision> {
        let row = sqlx::query_as::<_, Remision>(&format!(
            "UPDATE remisiones SET estado = $3, updated_at = NOW()
             WHERE clinica_alias = $1 AND id = $2
             RETURNING {COLUMNS}"
        ))
        .bind(clinica)
        .bind(id)
        .bind(estado)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    /// Cancels referrals still waiting on the given follow-up consulta.
    pub async fn cancelar_pendientes_de_consulta(
        conn: &mut PgConnection,
        clinica: &str,
        consulta_id: Uuid,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE remisiones SET estado = $3, updated_at = NOW()
             WHERE clinica_alias = $1 AND consulta_id = $2 AND estado IN ($4, $5)",
        )
        .bind(clinica)
        .bind(consulta_id)
        .bind(EstadoRemision::Cancelada)
        .bind(EstadoRemision::Pendiente)
        .bind(EstadoRemision::Aceptada)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Marks the referral behind a follow-up consulta as completed.
    pub async fn completar_de_consulta(
        conn: &mut PgConnection,
        clinica: &str,
        consulta_id: Uuid,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE remisiones SET estado = $3, updated_at = NOW()
             WHERE clinica_alias = $1 AND consulta_id = $2 AND estado IN ($4, $5)",
        )
        .bind(clinica)
        .bind(consulta_id)
        .bind(EstadoRemision::Completada)
        .bind(EstadoRemision::Pendiente)
        .bind(EstadoRemision::Aceptada)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
