//! Business logic layer
//!
//! Services enforce roles and tenant scoping, then drive the repositories.
//! Every call takes the request [`Principal`](crate::auth::Principal).

pub mod catalogo;
pub mod consultas;
pub mod export;
pub mod finanzas;
pub mod importacion;
pub mod informes;
pub mod notifications;
pub mod pacientes;
pub mod pdf;
pub mod remisiones;

pub use catalogo::CatalogoService;
pub use consultas::ConsultaService;
pub use finanzas::FinanzasService;
pub use importacion::ImportacionService;
pub use informes::InformeService;
pub use notifications::{notifier_from_config, Notifier, Plantillas, SharedNotifier};
pub use pacientes::PacienteService;
pub use pdf::{renderer_from_config, PdfRenderer, SharedPdfRenderer};
pub use remisiones::RemisionService;
