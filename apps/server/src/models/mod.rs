//! Row types and request payloads.

pub mod catalogo;
pub mod consulta;
pub mod informe;
pub mod paciente;
pub mod remision;

pub use catalogo::*;
pub use consulta::*;
pub use informe::*;
pub use paciente::*;
pub use remision::*;

use serde::{Deserialize, Serialize};

/// A page of results plus the unpaginated total.
#[derive(Debug, Clone, Serialize)]
pub struct Pagina<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paginacion {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Paginacion {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Converts `validator` failures into the API's validation error.
pub fn validar<T: validator::Validate>(payload: &T) -> crate::Result<()> {
    payload
        .validate()
        .map_err(|e| crate::Error::Validation(e.to_string().replace('\n', "; ")))
}

/// Trims and drops empty optional text.
pub fn texto(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let p = Paginacion {
            limit: Some(10_000),
            offset: Some(-3),
        };
        assert_eq!(p.limit(), MAX_LIMIT);
        assert_eq!(p.offset(), 0);
        assert_eq!(Paginacion::default().limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn blank_text_is_dropped() {
        assert_eq!(texto(Some("  ".to_string())), None);
        assert_eq!(texto(Some(" hola ".to_string())), Some("hola".to_string()));
    }
}
