//! Outgoing email.
//!
//! Services build a [`Correo`] from one of the embedded templates and hand it
//! to a [`Notifier`]. Delivery is always best-effort from the caller's point
//! of view except for explicit "send this report" requests.

use crate::{config::EmailConfig, Error, Result};
use async_trait::async_trait;
use handlebars::Handlebars;
use mail_builder::MessageBuilder;
use mail_send::SmtpClientBuilder;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

const RECIBO_CONSULTA: &str = r#"<p>Estimado(a) {{paciente}},</p>
<p>Su consulta del {{fecha}} con {{medico}} ha sido registrada en {{clinica}}.</p>
<table>
  <thead><tr><th>Servicio</th><th>Cant.</th><th>Subtotal USD</th>{{#if con_bs}}<th>Subtotal Bs</th>{{/if}}</tr></thead>
  <tbody>
  {{#each lineas}}
    <tr><td>{{nombre}}</td><td>{{cantidad}}</td><td>{{subtotal_usd}}</td>{{#if ../con_bs}}<td>{{subtotal_bs}}</td>{{/if}}</tr>
  {{/each}}
  </tbody>
</table>
<p><strong>Total USD:</strong> {{total_usd}}</p>
{{#if con_bs}}<p><strong>Total Bs:</strong> {{total_bs}} (tasa {{tasa_cambio}})</p>{{/if}}
<p>Estado del pago: {{estado_pago}}</p>"#;

const REMISION: &str = r#"<p>Dr(a). {{medico_destino}},</p>
<p>{{medico_remitente}} le ha remitido al paciente {{paciente}}.</p>
<p><strong>Motivo:</strong> {{motivo}}</p>
<p>Se agendó una consulta para el {{fecha}}.</p>"#;

const INFORME: &str = r#"<p>Estimado(a) {{paciente}},</p>
<p>Adjuntamos su informe médico "{{titulo}}" emitido por {{medico}} en {{clinica}}.</p>"#;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correo {
    pub para: String,
    pub asunto: String,
    pub html: String,
    pub adjuntos: Vec<Adjunto>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjunto {
    pub nombre: String,
    pub content_type: String,
    pub contenido: Vec<u8>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn enviar(&self, correo: Correo) -> Result<()>;
}

pub type SharedNotifier = Arc<dyn Notifier>;

/// Builds the notifier described by `config`.
pub fn notifier_from_config(config: &EmailConfig) -> SharedNotifier {
    if config.enabled {
        Arc::new(SmtpNotifier::new(config.clone()))
    } else {
        Arc::new(LogNotifier)
    }
}

pub struct SmtpNotifier {
    config: EmailConfig,
}

impl SmtpNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn enviar(&self, correo: Correo) -> Result<()> {
        let mut message = MessageBuilder::new()
            .from((
                self.config.from_name.as_str(),
                self.config.from_email.as_str(),
            ))
            .to(correo.para.as_str())
            .subject(correo.asunto.as_str())
            .html_body(correo.html.as_str());

        for adjunto in &correo.adjuntos {
            message = message.attachment(
                adjunto.content_type.as_str(),
                adjunto.nombre.as_str(),
                adjunto.contenido.as_slice(),
            );
        }

        let mut smtp_client =
            SmtpClientBuilder::new(self.config.smtp_host.as_str(), self.config.smtp_port)
                .implicit_tls(self.config.smtp_tls);
        if let (Some(user), Some(pass)) = (&self.config.smtp_username, &self.config.smtp_password)
        {
            smtp_client = smtp_client.credentials((user.as_str(), pass.as_str()));
        }

        let mut client = smtp_client
            .connect()
            .await
            .map_err(|e| Error::Email(format!("SMTP connection failed: {e}")))?;
        client
            .send(message)
            .await
            .map_err(|e| Error::Email(format!("failed to send email: {e}")))?;

        info!(to = %correo.para, subject = %correo.asunto, "Email sent");
        Ok(())
    }
}

/// Used when email is disabled: the message is logged and dropped.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn enviar(&self, correo: Correo) -> Result<()> {
        debug!(
            to = %correo.para,
            subject = %correo.asunto,
            attachments = correo.adjuntos.len(),
            "Email disabled, skipping send"
        );
        Ok(())
    }
}

/// The embedded message templates.
pub struct Plantillas {
    registry: Handlebars<'static>,
}

#[derive(Debug, Serialize)]
pub struct LineaRecibo {
    pub nombre: String,
    pub cantidad: i32,
    pub subtotal_usd: String,
    pub subtotal_bs: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DatosRecibo {
    pub clinica: String,
    pub paciente: String,
    pub medico: String,
    pub fecha: String,
    pub lineas: Vec<LineaRecibo>,
    pub total_usd: String,
    pub total_bs: Option<String>,
    pub tasa_cambio: Option<String>,
    pub con_bs: bool,
    pub estado_pago: String,
}

#[derive(Debug, Serialize)]
pub struct DatosRemision {
    pub paciente: String,
    pub medico_remitente: String,
    pub medico_destino: String,
    pub motivo: String,
    pub fecha: String,
}

#[derive(Debug, Serialize)]
pub struct DatosInforme {
    pub clinica: String,
    pub paciente: String,
    pub medico: String,
    pub titulo: String,
}

impl Plantillas {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        for (name, body) in [
            ("recibo_consulta", RECIBO_CONSULTA),
            ("remision", REMISION),
            ("informe", INFORME),
        ] {
            registry
                .register_template_string(name, body)
                .map_err(|e| Error::Internal(format!("invalid email template '{name}': {e}")))?;
        }
        Ok(Self { registry })
    }

    fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String> {
        self.registry
            .render(name, data)
            .map_err(|e| Error::Email(format!("failed to render '{name}': {e}")))
    }

    pub fn recibo_consulta(&self, para: &str, datos: &DatosRecibo) -> Result<Correo> {
        Ok(Correo {
            para: para.to_string(),
            asunto: format!("{}: recibo de su consulta", datos.clinica),
            html: self.render("recibo_consulta", datos)?,
            adjuntos: Vec::new(),
        })
    }

    pub fn remision(&self, para: &str, datos: &DatosRemision) -> Result<Correo> {
        Ok(Correo {
            para: para.to_string(),
            asunto: format!("Nueva remisión: {}", datos.paciente),
            html: self.render("remision", datos)?,
            adjuntos: Vec::new(),
        })
    }

    pub fn informe(&self, para: &str, datos: &DatosInforme, pdf: Vec<u8>) -> Result<Correo> {
        Ok(Correo {
            para: para.to_string(),
            asunto: format!("{}: {}", datos.clinica, datos.titulo),
            html: self.render("informe", datos)?,
            adjuntos: vec![Adjunto {
                nombre: "informe.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                contenido: pdf,
            }],
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::sync::Mutex;

    /// Collects messages instead of sending them.
    #[derive(Default)]
    pub struct Buzon {
        pub enviados: Mutex<Vec<Correo>>,
    }

    #[async_trait]
    impl Notifier for Buzon {
        async fn enviar(&self, correo: Correo) -> Result<()> {
            self.enviados.lock().await.push(correo);
            Ok(())
        }
    }

    fn recibo(con_bs: bool) -> DatosRecibo {
        DatosRecibo {
            clinica: "Clínica Central".to_string(),
            paciente: "Ana <Pérez>".to_string(),
            medico: "Dr. Luis Gómez".to_string(),
            fecha: "2024-03-01".to_string(),
            lineas: vec![LineaRecibo {
                nombre: "Consulta general".to_string(),
                cantidad: 1,
                subtotal_usd: "40.00".to_string(),
                subtotal_bs: con_bs.then(|| "1460.00".to_string()),
            }],
            total_usd: "40.00".to_string(),
            total_bs: con_bs.then(|| "1460.00".to_string()),
            tasa_cambio: con_bs.then(|| "36.50".to_string()),
            con_bs,
            estado_pago: "pagado".to_string(),
        }
    }

    #[test]
    fn receipt_escapes_names_and_shows_local_totals() {
        let plantillas = Plantillas::new().unwrap();
        let correo = plantillas
            .recibo_consulta("ana@example.com", &recibo(true))
            .unwrap();
        assert_eq!(correo.para, "ana@example.com");
        assert!(correo.html.contains("Ana &lt;Pérez&gt;"));
        assert!(correo.html.contains("1460.00"));
        assert!(correo.html.contains("tasa 36.50"));
    }

    #[test]
    fn receipt_without_rate_omits_bolivares() {
        let plantillas = Plantillas::new().unwrap();
        let correo = plantillas
            .recibo_consulta("ana@example.com", &recibo(false))
            .unwrap();
        assert!(!correo.html.contains("Total Bs"));
        assert!(correo.html.contains("Total USD"));
    }

    #[test]
    fn report_mail_carries_pdf_attachment() {
        let plantillas = Plantillas::new().unwrap();
        let datos = DatosInforme {
            clinica: "Clínica Central".to_string(),
            paciente: "Ana Pérez".to_string(),
            medico: "Dr. Luis Gómez".to_string(),
            titulo: "Informe cardiológico".to_string(),
        };
        let correo = plantillas
            .informe("ana@example.com", &datos, b"%PDF-1.7".to_vec())
            .unwrap();
        assert_eq!(correo.adjuntos.len(), 1);
        assert_eq!(correo.adjuntos[0].content_type, "application/pdf");
        assert!(correo.asunto.contains("Informe cardiológico"));
    }

    #[tokio::test]
    async fn log_notifier_accepts_everything() {
        let correo = Correo {
            para: "x@example.com".to_string(),
            asunto: "hola".to_string(),
            html: "<p>hola</p>".to_string(),
            adjuntos: Vec::new(),
        };
        assert!(LogNotifier.enviar(correo).await.is_ok());
    }
}
