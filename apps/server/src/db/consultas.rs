use crate::models::{Consulta, ConsultaFiltro, ConsultaServicio};
use crate::Result;
use chrono::{DateTime, Utc};
use clinica_core::{EstadoConsulta, EstadoPago, LineaLiquidada, MetodoPago, Moneda};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const COLUMNS: &str = "id, clinica_alias, paciente_id, medico_id, especialidad_id, fecha, motivo, \
                       estado, fecha_anterior, reagendamientos, motivo_reagenda, diagnostico, \
                       tratamiento, observaciones, moneda, metodo_pago, estado_pago, tasa_cambio, \
                       total_usd, total_bs, motivo_cancelacion, cancelada_por, cancelada_en, \
                       finalizada_por, finalizada_en, created_by, created_at, updated_at";

const LINEA_COLUMNS: &str = "id, consulta_id, servicio_id, nombre, cantidad, precio_unitario_usd, \
                             subtotal_usd, subtotal_bs, tasa_cambio, moneda, created_at";

#[derive(Debug, Clone)]
pub struct NuevaConsulta<'a> {
    pub paciente_id: Uuid,
    pub medico_id: Uuid,
    pub especialidad_id: Option<Uuid>,
    pub fecha: DateTime<Utc>,
    pub motivo: Option<&'a str>,
    pub created_by: Option<Uuid>,
}

/// Everything written onto the consulta row when it is finalized.
#[derive(Debug, Clone)]
pub struct Cierre<'a> {
    pub moneda: Moneda,
    pub metodo_pago: Option<MetodoPago>,
    pub estado_pago: EstadoPago,
    pub tasa_cambio: Option<Decimal>,
    pub total_usd: Decimal,
    pub total_bs: Option<Decimal>,
    pub diagnostico: Option<&'a str>,
    pub tratamiento: Option<&'a str>,
    pub observaciones: Option<&'a str>,
    pub finalizada_por: Uuid,
}

/// Tenant scope plus the optional list filters. Shared by the page and count queries.
fn push_filtro<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    clinica: &'a str,
    filtro: &ConsultaFiltro,
) {
    qb.push("clinica_alias = ").push_bind(clinica);
    if let Some(estado) = filtro.estado {
        qb.push(" AND estado = ").push_bind(estado);
    }
    if let Some(medico_id) = filtro.medico_id {
        qb.push(" AND medico_id = ").push_bind(medico_id);
    }
    if let Some(paciente_id) = filtro.paciente_id {
        qb.push(" AND paciente_id = ").push_bind(paciente_id);
    }
    if let Some(desde) = filtro.desde {
        qb.push(" AND (fecha AT TIME ZONE 'UTC')::date >= ")
            .push_bind(desde);
    }
    if let Some(hasta) = filtro.hasta {
        qb.push(" AND (fecha AT TIME ZONE 'UTC')::date <= ")
            .push_bind(hasta);
    }
}

#[derive(Clone)]
pub struct ConsultaRepository {
    pool: PgPool,
}

impl ConsultaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        clinica: &str,
        filtro: &ConsultaFiltro,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Consulta>, i64)> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM consultas WHERE ");
        push_filtro(&mut count, clinica, filtro);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM consultas WHERE "));
        push_filtro(&mut qb, clinica, filtro);
        qb.push(" ORDER BY fecha ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let consultas = qb
            .build_query_as::<Consulta>()
            .fetch_all(&self.pool)
            .await?;
        Ok((consultas, total))
    }

    pub async fn get(&self, clinica: &str, id: Uuid) -> Result<Option<Consulta>> {
        let row = sqlx::query_as::<_, Consulta>(&format!(
            "SELECT {COLUMNS} FROM consultas WHERE clinica_alias = $1 AND id = $2"
        ))
        .bind(clinica)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn lineas(&self, clinica: &str, consulta_id: Uuid) -> Result<Vec<ConsultaServicio>> {
        let rows = sqlx::query_as::<_, ConsultaServicio>(&format!(
            "SELECT {LINEA_COLUMNS} FROM consulta_servicios
             WHERE clinica_alias = $1 AND consulta_id = $2
             ORDER BY created_at, nombre"
        ))
        .bind(clinica)
        .bind(consulta_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create(&self, clinica: &str, nueva: &NuevaConsulta<'_>) -> Result<Consulta> {
        let mut conn = self.pool.acquire().await?;
        Self::insert(&mut conn, clinica, nueva).await
    }

    pub async fn insert(
        conn: &mut PgConnection,
        clinica: &str,
        nueva: &NuevaConsulta<'_>,
    ) -> Result<Consulta> {
        let row = sqlx::query_as::<_, Consulta>(&format!(
            "INSERT INTO consultas
                (id, clinica_alias, paciente_id, medico_id, especialidad_id, fecha, motivo, estado, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(clinica)
        .bind(nueva.paciente_id)
        .bind(nueva.medico_id)
        .bind(nueva.especialidad_id)
        .bind(nueva.fecha)
        .bind(nueva.motivo)
        .bind(EstadoConsulta::Agendada)
        .bind(nueva.created_by)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    /// Reads the consulta and holds its row lock until the transaction ends.
    pub async fn lock(
        conn: &mut PgConnection,
        clinica: &str,
        id: Uuid,
    ) -> Result<Option<Consulta>> {
        let row = sqlx::query_as::<_, Consulta>(&format!(
            "SELECT {COLUMNS} FROM consultas
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
        estado: EstadoConsulta,
    ) -> Result<Consulta> {
        let row = sqlx::query_as::<_, Consulta>(&format!(
            "UPDATE consultas SET estado = $3, updated_at = NOW()
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

    pub async fn reagendar(
        conn: &mut PgConnection,
        clinica: &str,
        id: Uuid,
        fecha: DateTime<Utc>,
        motivo: Option<&str>,
    ) -> Result<Consulta> {
        let row = sqlx::query_as::<_, Consulta>(&format!(
            "UPDATE consultas
             SET estado = $3, fecha_anterior = fecha, fecha = $4, motivo_reagenda = $5,
                 reagendamientos = reagendamientos + 1, updated_at = NOW()
             WHERE clinica_alias = $1 AND id = $2
             RETURNING {COLUMNS}"
        ))
        .bind(clinica)
        .bind(id)
        .bind(EstadoConsulta::Reagendada)
        .bind(fecha)
        .bind(motivo)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn cancelar(
        conn: &mut PgConnection,
        clinica: &str,
        id: Uuid,
        motivo: &str,
        cancelada_por: Uuid,
    ) -> Result<Consulta> {
        let row = sqlx::query_as::<_, Consulta>(&format!(
            "UPDATE consultas
             SET estado = $3, motivo_cancelacion = $4, cancelada_por = $5,
                 cancelada_en = NOW(), updated_at = NOW()
             WHERE clinica_alias = $1 AND id = $2
             RETURNING {COLUMNS}"
        ))
        .bind(clinica)
        .bind(id)
        .bind(EstadoConsulta::Cancelada)
        .bind(motivo)
        .bind(cancelada_por)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn finalizar(
        conn: &mut PgConnection,
        clinica: &str,
        id: Uuid,
        cierre: &Cierre<'_>,
    ) -> Result<Consulta> {
        let row = sqlx::query_as::<_, Consulta>(&format!(
            "UPDATE consultas
             SET estado = $3, moneda = $4, metodo_pago = $5, estado_pago = $6, tasa_cambio = $7,
                 total_usd = $8, total_bs = $9,
                 diagnostico = COALESCE($10, diagnostico),
                 tratamiento = COALESCE($11, tratamiento),
                 observaciones = COALESCE($12, observaciones),
                 finalizada_por = $13, finalizada_en = NOW(), updated_at = NOW()
             WHERE clinica_alias = $1 AND id = $2
             RETURNING {COLUMNS}"
        ))
        .bind(clinica)
        .bind(id)
        .bind(EstadoConsulta::Finalizada)
        .bind(cierre.moneda)
        .bind(cierre.metodo_pago)
        .bind(cierre.estado_pago)
        .bind(cierre.tasa_cambio)
        .bind(cierre.total_usd)
        .bind(cierre.total_bs)
        .bind(cierre.diagnostico)
        .bind(cierre.tratamiento)
        .bind(cierre.observaciones)
        .bind(cierre.finalizada_por)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn insert_linea(
        conn: &mut PgConnection,
        clinica: &str,
        consulta_id: Uuid,
        linea: &LineaLiquidada,
        tasa_cambio: Option<Decimal>,
        moneda: Moneda,
    ) -> Result<ConsultaServicio> {
        let row = sqlx::query_as::<_, ConsultaServicio>(&format!(
            "INSERT INTO consulta_servicios
                (id, clinica_alias, consulta_id, servicio_id, nombre, cantidad, precio_unitario_usd,
                 subtotal_usd, subtotal_bs, tasa_cambio, moneda)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {LINEA_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(clinica)
        .bind(consulta_id)
        .bind(linea.servicio_id)
        .bind(&linea.nombre)
        .bind(linea.cantidad)
        .bind(linea.precio_unitario_usd)
        .bind(linea.subtotal_usd)
        .bind(linea.subtotal_bs)
        .bind(tasa_cambio)
        .bind(moneda)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn update_pago(
        conn: &mut PgConnection,
        clinica: &str,
        id: Uuid,
        estado_pago: EstadoPago,
        metodo_pago: Option<MetodoPago>,
    ) -> Result<Consulta> {
        let row = sqlx::query_as::<_, Consulta>(&format!(
            "UPDATE consultas
             SET estado_pago = $3, metodo_pago = COALESCE($4, metodo_pago), updated_at = NOW()
             WHERE clinica_alias = $1 AND id = $2
             RETURNING {COLUMNS}"
        ))
        .bind(clinica)
        .bind(id)
        .bind(estado_pago)
        .bind(metodo_pago)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }
}
