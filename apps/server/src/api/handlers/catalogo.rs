//! Especialidades, médicos, servicios and exchange rates

use crate::{
    auth::Principal,
    models::{EspecialidadInput, MedicoFiltro, MedicoInput, ServicioInput, TasaInput},
    state::AppState,
    Result,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct InactivosQuery {
    #[serde(default)]
    pub incluir_inactivos: bool,
}

pub async fn list_especialidades(
    State(state): State<AppState>,
    principal: Principal,
    Query(q): Query<InactivosQuery>,
) -> Result<Response> {
    let items = state
        .catalogo
        .list_especialidades(&principal, q.incluir_inactivos)
        .await?;
    Ok((StatusCode::OK, Json(items)).into_response())
}

pub async fn get_especialidad(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let especialidad = state.catalogo.get_especialidad(&principal, id).await?;
    Ok((StatusCode::OK, Json(especialidad)).into_response())
}

pub async fn create_especialidad(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<EspecialidadInput>,
) -> Result<Response> {
    let especialidad = state.catalogo.create_especialidad(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(especialidad)).into_response())
}

pub async fn update_especialidad(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(input): Json<EspecialidadInput>,
) -> Result<Response> {
    let especialidad = state
        .catalogo
        .update_especialidad(&principal, id, input)
        .await?;
    Ok((StatusCode::OK, Json(especialidad)).into_response())
}

/// Deactivates; specialties are never removed.
pub async fn delete_especialidad(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    state.catalogo.desactivar_especialidad(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn list_medicos(
    State(state): State<AppState>,
    principal: Principal,
    Query(filtro): Query<MedicoFiltro>,
) -> Result<Response> {
    let medicos = state.catalogo.list_medicos(&principal, &filtro).await?;
    Ok((StatusCode::OK, Json(medicos)).into_response())
}

pub async fn get_medico(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let medico = state.catalogo.get_medico(&principal, id).await?;
    Ok((StatusCode::OK, Json(medico)).into_response())
}

pub async fn create_medico(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<MedicoInput>,
) -> Result<Response> {
    let medico = state.catalogo.create_medico(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(medico)).into_response())
}

pub async fn update_medico(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(input): Json<MedicoInput>,
) -> Result<Response> {
    let medico = state.catalogo.update_medico(&principal, id, input).await?;
    Ok((StatusCode::OK, Json(medico)).into_response())
}

pub async fn list_servicios(
    State(state): State<AppState>,
    principal: Principal,
    Query(q): Query<InactivosQuery>,
) -> Result<Response> {
    let servicios = state
        .catalogo
        .list_servicios(&principal, q.incluir_inactivos)
        .await?;
    Ok((StatusCode::OK, Json(servicios)).into_response())
}

pub async fn create_servicio(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<ServicioInput>,
) -> Result<Response> {
    let servicio = state.catalogo.create_servicio(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(servicio)).into_response())
}

pub async fn update_servicio(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(input): Json<ServicioInput>,
) -> Result<Response> {
    let servicio = state.catalogo.update_servicio(&principal, id, input).await?;
    Ok((StatusCode::OK, Json(servicio)).into_response())
}

pub async fn list_tasas(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Response> {
    let tasas = state.catalogo.list_tasas(&principal).await?;
    Ok((StatusCode::OK, Json(tasas)).into_response())
}

pub async fn tasa_actual(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Response> {
    let tasa = state.catalogo.tasa_actual(&principal).await?;
    Ok((StatusCode::OK, Json(tasa)).into_response())
}

pub async fn create_tasa(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<TasaInput>,
) -> Result<Response> {
    let tasa = state.catalogo.create_tasa(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(tasa)).into_response())
}
