//! Row source for the finance report.

use crate::Result;
use clinica_core::{EstadoConsulta, FilaFinanzas, FiltroFinanzas};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

#[derive(Clone)]
pub struct FinanzasRepository {
    pool: PgPool,
}

impl FinanzasRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finalized consultas matching `filtro`, dated by finalization time.
    pub async fn filas(&self, clinica: &str, filtro: &FiltroFinanzas) -> Result<Vec<FilaFinanzas>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT
                c.id AS consulta_id,
                c.finalizada_en AS fecha,
                p.nombres || ' ' || p.apellidos AS paciente,
                p.cedula AS paciente_cedula,
                m.id AS medico_id,
                m.nombres || ' ' || m.apellidos AS medico,
                e.id AS especialidad_id,
                e.nombre AS especialidad,
                c.moneda,
                c.metodo_pago,
                c.estado_pago,
                c.tasa_cambio,
                c.total_usd,
                c.total_bs
            FROM consultas c
            JOIN pacientes p ON p.id = c.paciente_id
            JOIN medicos m ON m.id = c.medico_id
            LEFT JOIN especialidades e ON e.id = c.especialidad_id
            WHERE c.finalizada_en IS NOT NULL AND c.clinica_alias = "#,
        );
        qb.push_bind(clinica);
        qb.push(" AND c.estado = ").push_bind(EstadoConsulta::Finalizada);

        if let Some(desde) = filtro.desde {
            qb.push(" AND (c.finalizada_en AT TIME ZONE 'UTC')::date >= ")
                .push_bind(desde);
        }
        if let Some(hasta) = filtro.hasta {
            qb.push(" AND (c.finalizada_en AT TIME ZONE 'UTC')::date <= ")
                .push_bind(hasta);
        }
        if let Some(moneda) = filtro.moneda {
            qb.push(" AND c.moneda = ").push_bind(moneda);
        }
        if let Some(medico_id) = filtro.medico_id {
            qb.push(" AND c.medico_id = ").push_bind(medico_id);
        }
        if let Some(especialidad_id) = filtro.especialidad_id {
            qb.push(" AND c.especialidad_id = ").push_bind(especialidad_id);
        }
        if let Some(estado_pago) = filtro.estado_pago {
            qb.push(" AND c.estado_pago = ").push_bind(estado_pago);
        }
        qb.push(" ORDER BY c.finalizada_en, c.id");

        let rows = qb.build().fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|row| {
                Ok(FilaFinanzas {
                    consulta_id: row.try_get("consulta_id")?,
                    fecha: row.try_get("fecha")?,
                    paciente: row.try_get("paciente")?,
                    paciente_cedula: row.try_get("paciente_cedula")?,
                    medico_id: row.try_get("medico_id")?,
                    medico: row.try_get("medico")?,
                    especialidad_id: row.try_get("especialidad_id")?,
                    especialidad: row.try_get("especialidad")?,
                    moneda: row.try_get("moneda")?,
                    metodo_pago: row.try_get("metodo_pago")?,
                    estado_pago: row.try_get("estado_pago")?,
                    tasa_cambio: row.try_get("tasa_cambio")?,
                    total_usd: row
                        .try_get::<Option<rust_decimal::Decimal>, _>("total_usd")?
                        .unwrap_or_default(),
                    total_bs: row.try_get("total_bs")?,
                })
            })
            .collect()
    }
}
