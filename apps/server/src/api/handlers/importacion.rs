//! Word document import

use crate::{auth::Principal, state::AppState, Error, Result};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

const CAMPO_ARCHIVO: &str = "archivo";

/// Accepts a multipart upload with the `.docx` in the `archivo` field.
pub async fn importar_historico(
    State(state): State<AppState>,
    principal: Principal,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut archivo = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some(CAMPO_ARCHIVO) {
            continue;
        }
        let nombre = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::Validation(format!("failed to read '{CAMPO_ARCHIVO}': {e}")))?;
        archivo = Some((nombre, bytes.to_vec()));
        break;
    }

    let (nombre, bytes) = archivo
        .ok_or_else(|| {
            Error::Validation(format!("multipart field '{CAMPO_ARCHIVO}' is required"))
        })?;
    let resultado = state
        .importacion
        .importar_historico(&principal, nombre, bytes)
        .await?;

    let status = if resultado.paciente_creado {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(resultado)).into_response())
}
