//! Import of medical-history records from Word (`.docx`) documents.
//!
//! The document is read as a ZIP container, paragraphs are extracted from
//! `word/document.xml`, and `Etiqueta: valor` lines are mapped onto a
//! [`RegistroImportado`].

pub mod docx;
pub mod error;
pub mod record;

pub use docx::extract_paragraphs;
pub use error::{ImportError, Result};
pub use record::{normalizar_cedula, parse_registro, RegistroImportado};

/// Extracts and parses a `.docx` payload. The result is not validated.
pub fn parse_docx(bytes: &[u8]) -> Result<RegistroImportado> {
    let paragraphs = extract_paragraphs(bytes)?;
    Ok(parse_registro(&paragraphs))
}
