#[allow(unused)]
mod support;

use axum::http::{Method, StatusCode};
use support::*;

#[tokio::test]
async fn health_reports_version() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let (status, _headers, body) = app.request(Method::GET, "/health", None).await?;
            assert_status(status, StatusCode::OK, "health");
            let json = parse_json(&body)?;
            assert_eq!(json["status"], "ok");
            assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn readiness_pings_database() -> anyhow::Result<()> {
    with_db_app(|app| {
        Box::pin(async move {
            let (status, _headers, body) =
                app.request(Method::GET, "/health/ready", None).await?;
            assert_status(status, StatusCode::OK, "ready");
            assert_eq!(parse_json(&body)?["status"], "ready");
            Ok(())
        })
    })
    .await
}
