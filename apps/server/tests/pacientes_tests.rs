//! Patient search, pagination and chart access against PostgreSQL.
//!
//! Skipped unless `CLINICA_TEST_DATABASE_URL` is set.

#[allow(unused)]
mod support;

use axum::http::{Method, StatusCode};
use clinica_core::Rol;
use serde_json::json;
use support::*;

async fn registrar(
    app: &TestApp,
    cedula: &str,
    nombres: &str,
    apellidos: &str,
) -> anyhow::Result<String> {
    let recepcion = app.as_rol(Rol::Recepcion, None)?;
    let (status, _h, body) = recepcion
        .request(
            Method::POST,
            "/api/v1/pacientes",
            Some(to_json_body(&json!({
                "cedula": cedula,
                "nombres": nombres,
                "apellidos": apellidos
            }))?),
        )
        .await?;
    assert_status(status, StatusCode::CREATED, "create paciente");
    Ok(str_field(&parse_json(&body)?, "id").to_string())
}

#[tokio::test]
async fn search_matches_name_or_cedula_and_pages() -> anyhow::Result<()> {
    with_db_app(|app| {
        Box::pin(async move {
            registrar(&app, "V-11000001", "Ana", "Torres").await?;
            registrar(&app, "V-11000002", "Bruno", "Torres").await?;
            registrar(&app, "V-22000003", "Carla", "Mendez").await?;
            let recepcion = app.as_rol(Rol::Recepcion, None)?;

            let (status, _h, body) = recepcion
                .request(Method::GET, "/api/v1/pacientes?q=torres", None)
                .await?;
            assert_status(status, StatusCode::OK, "search by name");
            let pagina = parse_json(&body)?;
            assert_eq!(pagina["total"], 2);
            let nombres: Vec<&str> = pagina["items"]
                .as_array()
                .expect("items")
                .iter()
                .filter_map(|p| p["nombres"].as_str())
                .collect();
            assert_eq!(nombres, vec!["Ana", "Bruno"]);

            let (_s, _h, body) = recepcion
                .request(Method::GET, "/api/v1/pacientes?q=22000", None)
                .await?;
            let pagina = parse_json(&body)?;
            assert_eq!(pagina["total"], 1);
            assert_eq!(pagina["items"][0]["apellidos"], "Mendez");

            let (_s, _h, body) = recepcion
                .request(Method::GET, "/api/v1/pacientes?limit=2&offset=2", None)
                .await?;
            let pagina = parse_json(&body)?;
            assert_eq!(pagina["total"], 3);
            assert_eq!(pagina["items"].as_array().map(Vec::len), Some(1));

            let (_s, _h, body) = recepcion
                .request(Method::GET, "/api/v1/pacientes?limit=2&offset=100", None)
                .await?;
            let pagina = parse_json(&body)?;
            assert_eq!(pagina["total"], 3);
            assert_eq!(pagina["items"].as_array().map(Vec::len), Some(0));
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn finance_users_cannot_read_the_chart() -> anyhow::Result<()> {
    with_db_app(|app| {
        Box::pin(async move {
            let id = registrar(&app, "V-33000004", "Diego", "Lara").await?;

            let (status, _h, _b) = app
                .as_rol(Rol::Finanzas, None)?
                .request(Method::GET, &format!("/api/v1/pacientes/{id}/historico"), None)
                .await?;
            assert_status(status, StatusCode::FORBIDDEN, "finanzas historico");

            let (status, _h, body) = app
                .as_rol(Rol::Recepcion, None)?
                .request(Method::GET, &format!("/api/v1/pacientes/{id}/historico"), None)
                .await?;
            assert_status(status, StatusCode::OK, "recepcion historico");
            assert_eq!(parse_json(&body)?.as_array().map(Vec::len), Some(0));
            Ok(())
        })
    })
    .await
}
