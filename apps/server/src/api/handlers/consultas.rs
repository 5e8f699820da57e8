//! Consulta lifecycle handlers

use crate::{
    auth::Principal,
    models::{CancelarInput, ConsultaFiltro, ConsultaInput, FinalizarInput, ReagendarInput},
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

pub async fn list_consultas(
    State(state): State<AppState>,
    principal: Principal,
    Query(filtro): Query<ConsultaFiltro>,
) -> Result<Response> {
    let pagina = state.consultas.list(&principal, filtro).await?;
    Ok((StatusCode::OK, Json(pagina)).into_response())
}

pub async fn get_consulta(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let detalle = state.consultas.get(&principal, id).await?;
    Ok((StatusCode::OK, Json(detalle)).into_response())
}

pub async fn create_consulta(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<ConsultaInput>,
) -> Result<Response> {
    let consulta = state.consultas.create(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(consulta)).into_response())
}

pub async fn iniciar_consulta(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let consulta = state.consultas.iniciar(&principal, id).await?;
    Ok((StatusCode::OK, Json(consulta)).into_response())
}

pub async fn completar_consulta(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let consulta = state.consultas.completar(&principal, id).await?;
    Ok((StatusCode::OK, Json(consulta)).into_response())
}

pub async fn reagendar_consulta(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(input): Json<ReagendarInput>,
) -> Result<Response> {
    let consulta = state.consultas.reagendar(&principal, id, input).await?;
    Ok((StatusCode::OK, Json(consulta)).into_response())
}

pub async fn cancelar_consulta(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(input): Json<CancelarInput>,
) -> Result<Response> {
    let consulta = state.consultas.cancelar(&principal, id, input).await?;
    Ok((StatusCode::OK, Json(consulta)).into_response())
}

/// Settles the consulta and returns it with its priced lines.
pub async fn finalizar_consulta(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(input): Json<FinalizarInput>,
) -> Result<Response> {
    let detalle = state.consultas.finalizar(&principal, id, input).await?;
    Ok((StatusCode::OK, Json(detalle)).into_response())
}
