//! Medical report handlers

use crate::{
    auth::Principal,
    models::{EnviarInformeInput, InformeFiltro, InformeInput, InformeUpdate},
    state::AppState,
    Error, Result,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

pub async fn list_informes(
    State(state): State<AppState>,
    principal: Principal,
    Query(filtro): Query<InformeFiltro>,
) -> Result<Response> {
    let informes = state.informes.list(&principal, filtro).await?;
    Ok((StatusCode::OK, Json(informes)).into_response())
}

pub async fn get_informe(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let informe = state.informes.get(&principal, id).await?;
    Ok((StatusCode::OK, Json(informe)).into_response())
}

pub async fn create_informe(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<InformeInput>,
) -> Result<Response> {
    let informe = state.informes.create(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(informe)).into_response())
}

pub async fn update_informe(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(input): Json<InformeUpdate>,
) -> Result<Response> {
    let informe = state.informes.update(&principal, id, input).await?;
    Ok((StatusCode::OK, Json(informe)).into_response())
}

pub async fn firmar_informe(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let informe = state.informes.firmar(&principal, id).await?;
    Ok((StatusCode::OK, Json(informe)).into_response())
}

pub async fn informe_pdf(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let (informe, pdf) = state.informes.pdf(&principal, id).await?;
    let disposition =
        HeaderValue::from_str(&format!("inline; filename=\"informe-{}.pdf\"", informe.id))
            .map_err(|e| Error::Internal(format!("invalid header: {e}")))?;

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/pdf"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}

pub async fn enviar_informe(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    input: Option<Json<EnviarInformeInput>>,
) -> Result<Response> {
    let input = input.map(|Json(i)| i).unwrap_or_default();
    let informe = state.informes.enviar(&principal, id, input).await?;
    Ok((StatusCode::OK, Json(informe)).into_response())
}
