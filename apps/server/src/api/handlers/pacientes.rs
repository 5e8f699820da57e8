//! Patients and their medical history

use crate::{
    auth::Principal,
    models::{HistoricoInput, PacienteBusqueda, PacienteInput},
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

/// Search by name or cédula, paginated.
pub async fn list_pacientes(
    State(state): State<AppState>,
    principal: Principal,
    Query(busqueda): Query<PacienteBusqueda>,
) -> Result<Response> {
    let pagina = state.pacientes.buscar(&principal, busqueda).await?;
    Ok((StatusCode::OK, Json(pagina)).into_response())
}

pub async fn get_paciente(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let paciente = state.pacientes.get(&principal, id).await?;
    Ok((StatusCode::OK, Json(paciente)).into_response())
}

pub async fn create_paciente(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<PacienteInput>,
) -> Result<Response> {
    let paciente = state.pacientes.create(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(paciente)).into_response())
}

pub async fn update_paciente(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(input): Json<PacienteInput>,
) -> Result<Response> {
    let paciente = state.pacientes.update(&principal, id, input).await?;
    Ok((StatusCode::OK, Json(paciente)).into_response())
}

pub async fn list_historico(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let entradas = state.pacientes.historico(&principal, id).await?;
    Ok((StatusCode::OK, Json(entradas)).into_response())
}

pub async fn create_historico(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(input): Json<HistoricoInput>,
) -> Result<Response> {
    let entrada = state
        .pacientes
        .agregar_historico(&principal, id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(entrada)).into_response())
}
