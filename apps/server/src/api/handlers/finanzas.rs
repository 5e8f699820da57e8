//! Finance report, export and payment follow-up

use crate::{
    auth::Principal, models::PagoInput, services::export::ExportQuery, state::AppState, Error,
    Result,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use clinica_core::FiltroFinanzas;
use uuid::Uuid;

pub async fn reporte(
    State(state): State<AppState>,
    principal: Principal,
    Query(filtro): Query<FiltroFinanzas>,
) -> Result<Response> {
    let reporte = state.finanzas.reporte(&principal, &filtro).await?;
    Ok((StatusCode::OK, Json(reporte)).into_response())
}

/// Downloads the report as an `.xlsx` workbook or a PDF.
pub async fn exportar(
    State(state): State<AppState>,
    principal: Principal,
    Query(filtro): Query<FiltroFinanzas>,
    Query(export): Query<ExportQuery>,
) -> Result<Response> {
    let archivo = state
        .finanzas
        .exportar(&principal, &filtro, export.formato)
        .await?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        archivo.nombre
    ))
    .map_err(|e| Error::Export(format!("invalid file name: {e}")))?;

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(archivo.content_type),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archivo.contenido,
    )
        .into_response())
}

pub async fn actualizar_pago(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(input): Json<PagoInput>,
) -> Result<Response> {
    let consulta = state.finanzas.actualizar_pago(&principal, id, input).await?;
    Ok((StatusCode::OK, Json(consulta)).into_response())
}
