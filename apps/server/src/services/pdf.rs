//! HTML to PDF conversion through a headless-browser service.

use crate::{config::PdfConfig, Error, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const CONVERT_PATH: &str = "forms/chromium/convert/html";

#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render_html(&self, html: String) -> Result<Vec<u8>>;
}

pub type SharedPdfRenderer = Arc<dyn PdfRenderer>;

pub fn renderer_from_config(config: &PdfConfig) -> Result<SharedPdfRenderer> {
    if config.enabled {
        Ok(Arc::new(HttpPdfRenderer::new(config)?))
    } else {
        Ok(Arc::new(DisabledPdfRenderer))
    }
}

/// Posts `index.html` to a Gotenberg-compatible endpoint.
pub struct HttpPdfRenderer {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpPdfRenderer {
    pub fn new(config: &PdfConfig) -> Result<Self> {
        let endpoint = convert_endpoint(&config.renderer_url)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("failed to build pdf client: {e}")))?;
        Ok(Self { client, endpoint })
    }
}

fn convert_endpoint(base: &str) -> Result<Url> {
    let mut base = Url::parse(base)
        .map_err(|e| Error::Config(format!("invalid pdf.renderer_url '{base}': {e}")))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(CONVERT_PATH)
        .map_err(|e| Error::Config(format!("invalid pdf.renderer_url: {e}")))
}

#[async_trait]
impl PdfRenderer for HttpPdfRenderer {
    async fn render_html(&self, html: String) -> Result<Vec<u8>> {
        let part = Part::bytes(html.into_bytes())
            .file_name("index.html")
            .mime_str("text/html")
            .map_err(|e| Error::Pdf(e.to_string()))?;
        let form = Form::new().part("files", part);

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Pdf(format!("renderer unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "PDF renderer rejected document");
            return Err(Error::Pdf(format!("renderer returned {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Pdf(format!("failed to read renderer response: {e}")))?;
        Ok(bytes.to_vec())
    }
}

pub struct DisabledPdfRenderer;

#[async_trait]
impl PdfRenderer for DisabledPdfRenderer {
    async fn render_html(&self, _html: String) -> Result<Vec<u8>> {
        Err(Error::Pdf("PDF rendering is disabled".to_string()))
    }
}

/// Escapes text for interpolation into generated HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_path() {
        let url = convert_endpoint("http://gotenberg:3000").unwrap();
        assert_eq!(url.as_str(), "http://gotenberg:3000/forms/chromium/convert/html");

        let url = convert_endpoint("https://pdf.internal/render").unwrap();
        assert_eq!(
            url.as_str(),
            "https://pdf.internal/render/forms/chromium/convert/html"
        );
    }

    #[test]
    fn bad_renderer_url_is_a_config_error() {
        assert!(matches!(convert_endpoint("not a url"), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn disabled_renderer_reports_pdf_error() {
        let err = DisabledPdfRenderer
            .render_html("<p>x</p>".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Pdf(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(escape_html("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }
}
