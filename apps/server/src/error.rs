//! Server error type and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clinica_core::{DomainError, EstadoConsulta};
use clinica_import::ImportError;
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("cannot move consulta from '{from}' to '{to}'")]
    InvalidTransition {
        from: EstadoConsulta,
        to: EstadoConsulta,
    },

    #[error("email delivery failed: {0}")]
    Email(String),

    #[error("pdf rendering failed: {0}")]
    Pdf(String),

    #[error("import failed: {0}")]
    Import(#[from] ImportError),

    #[error("export failed: {0}")]
    Export(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for Error {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidTransition { from, to } => Error::InvalidTransition { from, to },
            DomainError::Forbidden(msg) => Error::Forbidden(msg),
            DomainError::UnknownValue { .. }
            | DomainError::Validation(_)
            | DomainError::MissingExchangeRate(_) => Error::Validation(err.to_string()),
        }
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            Error::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                StatusCode::CONFLICT
            }
            Error::Database(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) | Error::Import(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Conflict(_) | Error::InvalidTransition { .. } => StatusCode::CONFLICT,
            Error::Email(_) => StatusCode::BAD_GATEWAY,
            Error::Pdf(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Export(_) | Error::Config(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::Database(sqlx::Error::RowNotFound) => "not_found",
            Error::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => "conflict",
            Error::Database(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                "validation_error"
            }
            Error::Database(_) => "database_error",
            Error::NotFound(_) => "not_found",
            Error::Validation(_) => "validation_error",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::Conflict(_) => "conflict",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::Email(_) => "email_error",
            Error::Pdf(_) => "pdf_error",
            Error::Import(_) => "import_error",
            Error::Export(_) => "export_error",
            Error::Config(_) => "config_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Message shown to clients. Server-side failures are reported generically
    /// and logged in full.
    fn public_message(&self) -> String {
        match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => "internal server error".to_string(),
            _ => match self {
                Error::Database(sqlx::Error::RowNotFound) => "record not found".to_string(),
                Error::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    "a record with the same unique value already exists".to_string()
                }
                Error::Database(sqlx::Error::Database(_)) => {
                    "referenced record does not exist".to_string()
                }
                other => other.to_string(),
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        } else {
            tracing::debug!(error = %self, code = self.code(), "Request rejected");
        }

        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.public_message(),
            }
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_http() {
        let err: Error = DomainError::InvalidTransition {
            from: EstadoConsulta::Finalizada,
            to: EstadoConsulta::Cancelada,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "invalid_transition");

        let err: Error = DomainError::Forbidden("no".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err: Error = DomainError::MissingExchangeRate("VES".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn server_errors_hide_details() {
        let err = Error::Internal("secret connection string".to_string());
        assert_eq!(err.public_message(), "internal server error");
        assert_eq!(
            Error::Database(sqlx::Error::PoolTimedOut).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn row_not_found_is_404() {
        let err = Error::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn import_errors_are_unprocessable() {
        let err = Error::Import(ImportError::MissingField("cedula"));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
