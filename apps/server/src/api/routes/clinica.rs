use crate::api::handlers::{
    catalogo, consultas, finanzas, importacion, informes, pacientes, remisiones,
};
use crate::state::AppState;
use axum::{
    routing::{get, patch, post, put},
    Router,
};

/// Routes mounted under `/api/v1`. All of them require a principal.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route(
            "/especialidades",
            get(catalogo::list_especialidades).post(catalogo::create_especialidad),
        )
        .route(
            "/especialidades/:id",
            get(catalogo::get_especialidad)
                .put(catalogo::update_especialidad)
                .delete(catalogo::delete_especialidad),
        )
        .route(
            "/medicos",
            get(catalogo::list_medicos).post(catalogo::create_medico),
        )
        .route(
            "/medicos/:id",
            get(catalogo::get_medico).put(catalogo::update_medico),
        )
        .route(
            "/servicios",
            get(catalogo::list_servicios).post(catalogo::create_servicio),
        )
        .route("/servicios/:id", put(catalogo::update_servicio))
        .route("/tasas", get(catalogo::list_tasas).post(catalogo::create_tasa))
        .route("/tasas/actual", get(catalogo::tasa_actual))
        // Patients
        .route(
            "/pacientes",
            get(pacientes::list_pacientes).post(pacientes::create_paciente),
        )
        .route(
            "/pacientes/:id",
            get(pacientes::get_paciente).put(pacientes::update_paciente),
        )
        .route(
            "/pacientes/:id/historico",
            get(pacientes::list_historico).post(pacientes::create_historico),
        )
        // Consultas
        .route(
            "/consultas",
            get(consultas::list_consultas).post(consultas::create_consulta),
        )
        .route("/consultas/:id", get(consultas::get_consulta))
        .route("/consultas/:id/iniciar", post(consultas::iniciar_consulta))
        .route("/consultas/:id/completar", post(consultas::completar_consulta))
        .route("/consultas/:id/reagendar", post(consultas::reagendar_consulta))
        .route("/consultas/:id/cancelar", post(consultas::cancelar_consulta))
        .route("/consultas/:id/finalizar", post(consultas::finalizar_consulta))
        // Finance
        .route("/finanzas", get(finanzas::reporte))
        .route("/finanzas/export", get(finanzas::exportar))
        .route(
            "/finanzas/consultas/:id/pago",
            patch(finanzas::actualizar_pago),
        )
        // Referrals
        .route(
            "/remisiones",
            get(remisiones::list_remisiones).post(remisiones::create_remision),
        )
        .route("/remisiones/:id", get(remisiones::get_remision))
        .route("/remisiones/:id/aceptar", post(remisiones::aceptar_remision))
        .route(
            "/remisiones/:id/completar",
            post(remisiones::completar_remision),
        )
        // Medical reports
        .route(
            "/informes",
            get(informes::list_informes).post(informes::create_informe),
        )
        .route(
            "/informes/:id",
            get(informes::get_informe).put(informes::update_informe),
        )
        .route("/informes/:id/firmar", post(informes::firmar_informe))
        .route("/informes/:id/pdf", get(informes::informe_pdf))
        .route("/informes/:id/enviar", post(informes::enviar_informe))
        // Import
        .route(
            "/importar/historico",
            post(importacion::importar_historico),
        )
}
