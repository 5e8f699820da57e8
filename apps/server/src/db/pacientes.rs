use crate::models::{Paciente, PacienteInput};
use crate::Result;
use chrono::NaiveDate;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

const COLUMNS: &str = "id, clinica_alias, cedula, nombres, apellidos, fecha_nacimiento, sexo, \
                       telefono, email, direccion, created_at, updated_at";

/// Patient identity as read from an imported document.
#[derive(Debug, Clone)]
pub struct PacienteImportado<'a> {
    pub cedula: &'a str,
    pub nombres: &'a str,
    pub apellidos: &'a str,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub sexo: Option<&'a str>,
    pub telefono: Option<&'a str>,
    pub email: Option<&'a str>,
}

fn push_busqueda<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    clinica: &'a str,
    pattern: Option<&str>,
) {
    qb.push("clinica_alias = ").push_bind(clinica);
    if let Some(pattern) = pattern {
        qb.push(" AND (LOWER(cedula) LIKE ")
            .push_bind(pattern.to_string())
            .push(" OR LOWER(nombres || ' ' || apellidos) LIKE ")
            .push_bind(pattern.to_string())
            .push(")");
    }
}

#[derive(Clone)]
pub struct PacienteRepository {
    pool: PgPool,
}

impl PacienteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Name or cedula search ordered by surname. `total` counts every match.
    pub async fn search(
        &self,
        clinica: &str,
        q: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Paciente>, i64)> {
        let pattern = q
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(super::like_pattern);

        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM pacientes WHERE ");
        push_busqueda(&mut count, clinica, pattern.as_deref());
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM pacientes WHERE "));
        push_busqueda(&mut qb, clinica, pattern.as_deref());
        qb.push(" ORDER BY apellidos, nombres LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let pacientes = qb
            .build_query_as::<Paciente>()
            .fetch_all(&self.pool)
            .await?;
        Ok((pacientes, total))
    }

    pub async fn get(&self, clinica: &str, id: Uuid) -> Result<Option<Paciente>> {
        let row = sqlx::query_as::<_, Paciente>(&format!(
            "SELECT {COLUMNS} FROM pacientes WHERE clinica_alias = $1 AND id = $2"
        ))
        .bind(clinica)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn create(&self, clinica: &str, input: &PacienteInput) -> Result<Paciente> {
        let row = sqlx::query_as::<_, Paciente>(&format!(
            "INSERT INTO pacientes
                (id, clinica_alias, cedula, nombres, apellidos, fecha_nacimiento, sexo, telefono, email, direccion)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(clinica)
        .bind(input.cedula.trim())
        .bind(input.nombres.trim())
        .bind(input.apellidos.trim())
        .bind(input.fecha_nacimiento)
        .bind(input.sexo.as_deref())
        .bind(input.telefono.as_deref())
        .bind(input.email.as_deref())
        .bind(input.direccion.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update(
        &self,
        clinica: &str,
        id: Uuid,
        input: &PacienteInput,
    ) -> Result<Option<Paciente>> {
        let row = sqlx::query_as::<_, Paciente>(&format!(
            "UPDATE pacientes
             SET cedula = $3, nombres = $4, apellidos = $5, fecha_nacimiento = $6, sexo = $7,
                 telefono = $8, email = $9, direccion = $10, updated_at = NOW()
             WHERE clinica_alias = $1 AND id = $2
             RETURNING {COLUMNS}"
        ))
        .bind(clinica)
        .bind(id)
        .bind(input.cedula.trim())
        .bind(input.nombres.trim())
        .bind(input.apellidos.trim())
        .bind(input.fecha_nacimiento)
        .bind(input.sexo.as_deref())
        .bind(input.telefono.as_deref())
        .bind(input.email.as_deref())
        .bind(input.direccion.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Creates the patient or fills the blanks of an existing one with the
    /// same cedula. Returns the row and whether it was created.
    pub async fn upsert_importado(
        conn: &mut PgConnection,
        clinica: &str,
        paciente: &PacienteImportado<'_>,
    ) -> Result<(Paciente, bool)> {
        let row = sqlx::query(&format!(
            "INSERT INTO pacientes
                (id, clinica_alias, cedula, nombres, apellidos, fecha_nacimiento, sexo, telefono, email)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (clinica_alias, cedula) DO UPDATE SET
                fecha_nacimiento = COALESCE(pacientes.fecha_nacimiento, EXCLUDED.fecha_nacimiento),
                sexo = COALESCE(pacientes.sexo, EXCLUDED.sexo),
                telefono = COALESCE(pacientes.telefono, EXCLUDED.telefono),
                email = COALESCE(pacientes.email, EXCLUDED.email),
                updated_at = NOW()
             RETURNING {COLUMNS}, (xmax = 0) AS creado"
        ))
        .bind(Uuid::new_v4())
        .bind(clinica)
        .bind(paciente.cedula)
        .bind(paciente.nombres)
        .bind(paciente.apellidos)
        .bind(paciente.fecha_nacimiento)
        .bind(paciente.sexo)
        .bind(paciente.telefono)
        .bind(paciente.email)
        .fetch_one(&mut *conn)
        .await?;

        let creado: bool = row.get("creado");
        Ok((Paciente::from_row(&row)?, creado))
    }
}
