//! Auth - JWT issuance/verification, authentication middleware and role checks

use crate::core::{AppError, AppState, ErrorDetails, ErrorKind};
use crate::entities::{Role, User};
use crate::repositories::Projection;
use axum::extract::State;
use axum::{body::Body, extract::Request, http, http::Response, middleware::Next};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub const TOKEN_COOKIE: &str = "token";

// contenuto del token jwt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

#[instrument(skip(user, secret), fields(user_id = %user.id))]
pub fn encode_jwt(user: &User, secret: &str, expiry_hours: i64) -> Result<String, AppError> {
    debug!("Encoding JWT token for user");
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(expiry_hours)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map(|token| {
        debug!("JWT token encoded successfully");
        token
    })
    .map_err(|e| {
        error!("Failed to encode JWT token: {:?}", e);
        AppError::internal(e)
    })
}

#[instrument(skip(token, secret))]
pub fn decode_jwt(token: &str, secret: &str) -> Result<TokenData<Claims>, AppError> {
    decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!("Failed to decode JWT token: {}", e);
        AppError::unauthorized("Invalid or expired token")
    })
}

/// Cookie that replaces the session cookie and expires immediately.
pub fn expired_cookie() -> String {
    format!("{TOKEN_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

pub fn session_cookie(token: &str, expiry_hours: i64) -> String {
    format!(
        "{TOKEN_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        expiry_hours * 3600
    )
}

/// Bearer token first, `token` cookie second.
fn extract_token(req: &Request) -> Option<String> {
    let headers = req.headers();
    if let Some(value) = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        let mut parts = value.split_whitespace();
        if let (Some(scheme), Some(token)) = (parts.next(), parts.next()) {
            if scheme.eq_ignore_ascii_case("bearer") {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let Some(token) = extract_token(&req) else {
        warn!("Missing authentication token");
        return Err(AppError::unauthorized("Authentication required"));
    };
    let token_data = decode_jwt(&token, &state.config.jwt_secret)?;

    // l'utente potrebbe essere stato cancellato dopo l'emissione del token
    let hide = Projection::hide(&["password"]);
    let current_user = match state
        .users
        .find_by_id(&token_data.claims.sub, Some(&hide))
        .await
    {
        Ok(user) => user,
        // subject cancellato o malformato; i guasti dello storage proseguono come 500
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::BadRequest) => {
            warn!(sub = %token_data.claims.sub, "Token subject rejected: {}", err);
            return Err(AppError::unauthorized("You are not an authorized user"));
        }
        Err(err) => return Err(err),
    };
    debug!(user_id = %current_user.id, "User authenticated");
    req.extensions_mut().insert(current_user);
    Ok(next.run(req).await)
}

/// Checks that `user` holds `role`.
pub fn require_role(user: &User, role: Role) -> Result<(), AppError> {
    if user.role == role {
        return Ok(());
    }
    warn!(user_id = %user.id, role = %user.role, required = %role, "Insufficient role");
    Err(AppError::forbidden("Access denied").with_details(ErrorDetails::text(format!(
        "{} role required for this operation",
        role.label()
    ))))
}
