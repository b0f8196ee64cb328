use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::{axum_http::error_responses::ErrorResponse, config::config_model::AdminSecret};

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// Identity of the admin behind a request, placed in request extensions.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub subject: String,
}

#[derive(Debug)]
pub struct AuthError(anyhow::Error);

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError(err)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = StatusCode::UNAUTHORIZED;
        (
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                message: format!("Unauthorized: {}", self.0),
            }),
        )
            .into_response()
    }
}

pub fn validate_admin_jwt(token: &str, secret: &str) -> Result<AdminClaims, AuthError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    let token_data = decode::<AdminClaims>(token, &decoding_key, &validation)
        .map_err(|e| anyhow::anyhow!("JWT validation failed: {}", e))?;

    if token_data.claims.role != ADMIN_ROLE {
        return Err(anyhow::anyhow!("admin role required").into());
    }

    Ok(token_data.claims)
}

fn bearer_token(request: &Request) -> Result<&str, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| anyhow::anyhow!("Missing Authorization header"))?;

    let value = header
        .to_str()
        .map_err(|_| anyhow::anyhow!("Invalid Authorization header"))?;

    value
        .strip_prefix("Bearer ")
        .ok_or_else(|| anyhow::anyhow!("Invalid Authorization header format").into())
}

/// Route layer guarding the admin surface.
pub async fn require_admin(
    State(admin_secret): State<Arc<AdminSecret>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = bearer_token(&request)
        .and_then(|token| validate_admin_jwt(token, &admin_secret.secret))
        .inspect_err(|err| warn!(error = %err.0, path = %request.uri().path(), "admin auth rejected"))?;

    request
        .extensions_mut()
        .insert(AdminUser { subject: claims.sub });

    Ok(next.run(request).await)
}
