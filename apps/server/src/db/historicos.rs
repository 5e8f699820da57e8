use crate::models::{Historico, NuevoHistorico};
use crate::Result;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const COLUMNS: &str = "id, clinica_alias, paciente_id, consulta_id, medico_id, fecha, motivo, \
                       antecedentes, diagnostico, tratamiento, observaciones, origen, \
                       archivo_origen, created_by, created_at";

#[derive(Clone)]
pub struct HistoricoRepository {
    pool: PgPool,
}

impl HistoricoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_por_paciente(
        &self,
        clinica: &str,
        paciente_id: Uuid,
    ) -> Result<Vec<Historico>> {
        let rows = sqlx::query_as::<_, Historico>(&format!(
            "SELECT {COLUMNS} FROM historicos
             WHERE clinica_alias = $1 AND paciente_id = $2
             ORDER BY fecha DESC, created_at DESC"
        ))
        .bind(clinica)
        .bind(paciente_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create(&self, clinica: &str, nuevo: &NuevoHistorico) -> Result<Historico> {
        let mut conn = self.pool.acquire().await?;
        Self::insert(&mut conn, clinica, nuevo).await
    }

    pub async fn insert(
        conn: &mut PgConnection,
        clinica: &str,
        nuevo: &NuevoHistorico,
    ) -> Result<Historico> {
        let row = sqlx::query_as::<_, Historico>(&format!(
            "INSERT INTO historicos
                (id, clinica_alias, paciente_id, consulta_id, medico_id, fecha, motivo, antecedentes,
                 diagnostico, tratamiento, observaciones, origen, archivo_origen, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(clinica)
        .bind(nuevo.paciente_id)
        .bind(nuevo.consulta_id)
        .bind(nuevo.medico_id)
        .bind(nuevo.fecha)
        .bind(nuevo.motivo.as_deref())
        .bind(nuevo.antecedentes.as_deref())
        .bind(nuevo.diagnostico.as_deref())
        .bind(nuevo.tratamiento.as_deref())
        .bind(nuevo.observaciones.as_deref())
        .bind(nuevo.origen)
        .bind(nuevo.archivo_origen.as_deref())
        .bind(nuevo.created_by)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }
}
