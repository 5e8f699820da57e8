use crate::models::{InformeFiltro, InformeMedico};
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const COLUMNS: &str = "id, clinica_alias, paciente_id, medico_id, consulta_id, titulo, contenido, \
                       firmado, firmado_por, firmado_en, firma_hash, enviado_en, enviado_a, \
                       created_at, updated_at";

#[derive(Clone)]
pub struct InformeRepository {
    pool: PgPool,
}

impl InformeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, clinica: &str, filtro: &InformeFiltro) -> Result<Vec<InformeMedico>> {
        let rows = sqlx::query_as::<_, InformeMedico>(&format!(
            "SELECT {COLUMNS} FROM informes_medicos
             WHERE clinica_alias = $1
               AND ($2::uuid IS NULL OR paciente_id = $2)
               AND ($3::uuid IS NULL OR medico_id = $3)
             ORDER BY created_at DESC"
        ))
        .bind(clinica)
        .bind(filtro.paciente_id)
        .bind(filtro.medico_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, clinica: &str, id: Uuid) -> Result<Option<InformeMedico>> {
        let row = sqlx::query_as::<_, InformeMedico>(&format!(
            "SELECT {COLUMNS} FROM informes_medicos WHERE clinica_alias = $1 AND id = $2"
        ))
        .bind(clinica)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn create(
        &self,
        clinica: &str,
        paciente_id: Uuid,
        medico_id: Uuid,
        consulta_id: Option<Uuid>,
        titulo: &str,
        contenido: &str,
    ) -> Result<InformeMedico> {
        let row = sqlx::query_as::<_, InformeMedico>(&format!(
            "INSERT INTO informes_medicos
                (id, clinica_alias, paciente_id, medico_id, consulta_id, titulo, contenido)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(clinica)
        .bind(paciente_id)
        .bind(medico_id)
        .bind(consulta_id)
        .bind(titulo)
        .bind(contenido)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn lock(
        conn: &mut PgConnection,
        clinica: &str,
        id: Uuid,
    ) -> Result<Option<InformeMedico>> {
        let row = sqlx::query_as::<_, InformeMedico>(&format!(
            "SELECT {COLUMNS} FROM informes_medicos
             WHERE clinica_alias = $1 AND id = $2
             FOR UPDATE"
        ))
        .bind(clinica)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn update_contenido(
        conn: &mut PgConnection,
        clinica: &str,
        id: Uuid,
        titulo: &str,
        contenido: &str,
    ) -> Result<InformeMedico> {
        let row = sqlx::query_as::<_, InformeMedico>(&format!(
            "UPDATE informes_medicos SET titulo = $3, contenido = $4, updated_at = NOW()
             WHERE clinica_alias = $1 AND id = $2
             RETURNING {COLUMNS}"
        ))
        .bind(clinica)
        .bind(id)
        .bind(titulo)
        .bind(contenido)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn firmar(
        conn: &mut PgConnection,
        clinica: &str,
        id: Uuid,
        firmado_por: Uuid,
        firmado_en: DateTime<Utc>,
        firma_hash: &str,
    ) -> Result<InformeMedico> {
        let row = sqlx::query_as::<_, InformeMedico>(&format!(
            "UPDATE informes_medicos
             SET firmado = TRUE, firmado_por = $3, firmado_en = $4, firma_hash = $5, updated_at = NOW()
             WHERE clinica_alias = $1 AND id = $2
             RETURNING {COLUMNS}"
        ))
        .bind(clinica)
        .bind(id)
        .bind(firmado_por)
        .bind(firmado_en)
        .bind(firma_hash)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn marcar_enviado(
        &self,
        clinica: &str,
        id: Uuid,
        enviado_a: &str,
    ) -> Result<InformeMedico> {
        let row = sqlx::query_as::<_, InformeMedico>(&format!(
            "UPDATE informes_medicos SET enviado_en = NOW(), enviado_a = $3, updated_at = NOW()
             WHERE clinica_alias = $1 AND id = $2
             RETURNING {COLUMNS}"
        ))
        .bind(clinica)
        .bind(id)
        .bind(enviado_a)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
