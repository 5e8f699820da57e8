use crate::enums::EstadoConsulta;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("unknown {kind} value '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    #[error("cannot move consulta from '{from}' to '{to}'")]
    InvalidTransition {
        from: EstadoConsulta,
        to: EstadoConsulta,
    },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("no exchange rate available for payment in {0}")]
    MissingExchangeRate(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
