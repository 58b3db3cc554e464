//! Auth services - Registration, login and logout

use crate::core::auth::{expired_cookie, session_cookie};
use crate::core::{AppError, AppState, Reply, ValidJson, encode_jwt};
use crate::dtos::{AuthResponseDTO, LoginDTO, RegisterDTO, UserDTO};
use crate::entities::{NewUser, Role, User};
use crate::repositories::Filter;
use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

fn invalid_credentials() -> AppError {
    AppError::unauthorized("Invalid credentials").with_code("INVALID_CREDENTIALS")
}

#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    ValidJson(body): ValidJson<RegisterDTO>,
) -> Result<Reply<UserDTO>, AppError> {
    let password = User::hash_password(&body.password, state.config.bcrypt_cost)?;
    let user = state
        .users
        .create(NewUser {
            email: body.email,
            name: body.name,
            password,
            role: Role::User,
        })
        .await?;

    info!(user_id = %user.id, "User registered");
    Ok(Reply::created(
        "User registered successfully",
        UserDTO::from(user),
    ))
}

#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn login_user(
    State(state): State<Arc<AppState>>,
    ValidJson(body): ValidJson<LoginDTO>,
) -> Result<impl IntoResponse, AppError> {
    let filter = Filter::new().eq("email", User::normalize_email(&body.email));
    let Some(user) = state.users.find_one(&filter, None).await? else {
        warn!("Login for unknown email");
        return Err(invalid_credentials());
    };

    if !user.verify_password(&body.password) {
        warn!(user_id = %user.id, "Login with wrong password");
        return Err(invalid_credentials());
    }

    let token = encode_jwt(&user, &state.config.jwt_secret, state.config.jwt_expiry_hours)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&session_cookie(&token, state.config.jwt_expiry_hours))
            .map_err(AppError::internal)?,
    );
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).map_err(AppError::internal)?,
    );

    info!(user_id = %user.id, "User logged in");
    Ok((
        headers,
        Reply::message(
            "Login successful",
            AuthResponseDTO {
                token,
                user: UserDTO::from(user),
            },
        ),
    ))
}

pub async fn logout_user() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, expired_cookie())],
        Reply::message("Logout successful", ()),
    )
}
