//! Bearer-token authentication and the request principal.
//!
//! Tokens are HS256 JWTs signed with `auth.jwt_secret`. The tenant alias is
//! taken from the token only, never from request parameters.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use clinica_core::{Actor, Rol};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::{config::AuthConfig, state::AppState, Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub rol: Rol,
    pub clinica: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medico_id: Option<Uuid>,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub rol: Rol,
    pub clinica: String,
    pub medico_id: Option<Uuid>,
}

impl Principal {
    pub fn actor(&self) -> Actor {
        Actor::new(self.rol, self.medico_id)
    }

    pub fn is_admin(&self) -> bool {
        self.rol == Rol::Admin
    }

    /// Rejects the request unless the caller has one of `roles`.
    pub fn require_roles(&self, roles: &[Rol]) -> Result<()> {
        if roles.contains(&self.rol) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "role '{}' is not allowed to perform this action",
                self.rol
            )))
        }
    }

    /// The doctor id a `medico` principal acts as.
    pub fn medico_propio(&self) -> Result<Uuid> {
        self.medico_id
            .ok_or_else(|| Error::Forbidden("token carries no medico_id".to_string()))
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            rol: claims.rol,
            clinica: claims.clinica,
            medico_id: claims.medico_id,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| Error::Unauthorized("authentication required".to_string()))
    }
}

#[derive(Clone)]
pub struct AuthManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl_seconds: u64,
}

impl AuthManager {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            ttl_seconds: config.token_ttl_seconds,
        }
    }

    pub fn issue_token(
        &self,
        sub: Uuid,
        rol: Rol,
        clinica: &str,
        medico_id: Option<Uuid>,
    ) -> Result<String> {
        if rol == Rol::Medico && medico_id.is_none() {
            return Err(Error::Validation(
                "tokens for role 'medico' need a medico_id".to_string(),
            ));
        }
        let now = now_epoch_seconds();
        let claims = Claims {
            sub,
            rol,
            clinica: clinica.to_string(),
            medico_id,
            iat: now,
            exp: now.saturating_add(self.ttl_seconds as usize),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("failed to sign token: {e}")))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| Error::Unauthorized(format!("invalid token: {e}")))
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Principal> {
        let token = bearer_token(headers)
            .ok_or_else(|| Error::Unauthorized("missing bearer token".to_string()))?;
        Ok(self.validate_token(token)?.into())
    }
}

/// Authentication middleware for `/api/v1/*`.
///
/// Resolves the principal, then checks that its clinic exists and is active.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let principal = match state.auth.authenticate(req.headers()) {
        Ok(p) => p,
        Err(e) => return e.into_response(),
    };

    match state.clinicas.find_activa(&principal.clinica).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::warn!(clinica = %principal.clinica, "Token for unknown or inactive clinica");
            return Error::Forbidden(format!(
                "clinica '{}' is not active",
                principal.clinica
            ))
            .into_response();
        }
        Err(e) => return e.into_response(),
    }

    req.extensions_mut().insert(principal);
    next.run(req).await
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn now_epoch_seconds() -> usize {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as usize
}
