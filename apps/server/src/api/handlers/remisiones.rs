//! Referral handlers

use crate::{
    auth::Principal,
    models::{RemisionFiltro, RemisionInput},
    state::AppState,
    Result,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

pub async fn list_remisiones(
    State(state): State<AppState>,
    principal: Principal,
    Query(filtro): Query<RemisionFiltro>,
) -> Result<Response> {
    let remisiones = state.remisiones.list(&principal, filtro).await?;
    Ok((StatusCode::OK, Json(remisiones)).into_response())
}

pub async fn get_remision(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let remision = state.remisiones.get(&principal, id).await?;
    Ok((StatusCode::OK, Json(remision)).into_response())
}

pub async fn create_remision(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<RemisionInput>,
) -> Result<Response> {
    let remision = state.remisiones.create(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(remision)).into_response())
}

pub async fn aceptar_remision(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let remision = state.remisiones.aceptar(&principal, id).await?;
    Ok((StatusCode::OK, Json(remision)).into_response())
}

pub async fn completar_remision(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let remision = state.remisiones.completar(&principal, id).await?;
    Ok((StatusCode::OK, Json(remision)).into_response())
}
