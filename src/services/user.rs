//! User services - Profile and user administration handlers

use crate::core::{AppError, AppState, IdParam, QueryParams, Reply, ValidJson, require_role};
use crate::dtos::{
    CreateUserDTO, ListQuery, UpdatePasswordDTO, UpdateProfileDTO, UpdateUserDTO, UserDTO,
    UserFilters,
};
use crate::entities::{NewUser, Role, User};
use crate::repositories::{Changes, Filter, Projection};
use axum::{Extension, extract::State};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const SEARCH_FIELDS: &[&str] = &["name", "email"];

fn without_password() -> Projection {
    Projection::hide(&["password"])
}

#[instrument(skip(state, current_user, query, filters), fields(user_id = %current_user.id))]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>, // ottenuto dall'autenticazione tramite token jwt
    QueryParams(query): QueryParams<ListQuery>,
    QueryParams(filters): QueryParams<UserFilters>,
) -> Result<Reply<Vec<UserDTO>>, AppError> {
    require_role(&current_user, Role::Admin)?;
    let spec = filters.apply(query.to_spec(SEARCH_FIELDS));
    debug!(page = spec.page(), limit = spec.limit(), "Listing users");

    let listing = state
        .users
        .list(Filter::new(), Some(&without_password()), Some(&spec))
        .await?;
    Ok(listing.map(UserDTO::from).into())
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    ValidJson(body): ValidJson<CreateUserDTO>,
) -> Result<Reply<UserDTO>, AppError> {
    require_role(&current_user, Role::Admin)?;
    let password = User::hash_password(&body.password, state.config.bcrypt_cost)?;
    let user = state
        .users
        .create(NewUser {
            email: body.email,
            name: body.name,
            password,
            role: body.role.unwrap_or(Role::User),
        })
        .await?;

    info!(created = %user.id, role = %user.role, "User created by admin");
    Ok(Reply::created("User created successfully", UserDTO::from(user)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Reply<UserDTO>, AppError> {
    let user = state
        .users
        .find_by_id(&current_user.id, Some(&without_password()))
        .await?;
    Ok(Reply::message("User retrieved successfully", UserDTO::from(user)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    ValidJson(body): ValidJson<UpdateProfileDTO>,
) -> Result<Reply<UserDTO>, AppError> {
    let user = state
        .users
        .update(&current_user.id, body.changes(), Some(&without_password()))
        .await?;
    info!("Profile updated");
    Ok(Reply::message("User updated successfully", UserDTO::from(user)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    ValidJson(body): ValidJson<UpdatePasswordDTO>,
) -> Result<Reply<UserDTO>, AppError> {
    // l'utente nell'Extension non ha l'hash della password
    let stored = state.users.find_by_id(&current_user.id, None).await?;
    if !stored.verify_password(&body.old_password) {
        warn!("Password change with wrong current password");
        return Err(AppError::unauthorized("Invalid credentials").with_code("INVALID_CREDENTIALS"));
    }
    if body.password != body.confirm_password {
        return Err(AppError::bad_request("Passwords do not match").with_code("PASSWORD_DO_NOT_MATCH"));
    }

    let hash = User::hash_password(&body.password, state.config.bcrypt_cost)?;
    let user = state
        .users
        .update(
            &current_user.id,
            Changes::new().set("password", hash),
            Some(&without_password()),
        )
        .await?;
    info!("Password updated");
    Ok(Reply::message("Password updated successfully", UserDTO::from(user)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id, target = %id))]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    IdParam(id): IdParam,
) -> Result<Reply<UserDTO>, AppError> {
    require_role(&current_user, Role::Admin)?;
    let user = state.users.find_by_id(&id, Some(&without_password())).await?;
    Ok(Reply::message("User retrieved successfully", UserDTO::from(user)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id, target = %id))]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    IdParam(id): IdParam,
    ValidJson(body): ValidJson<UpdateUserDTO>,
) -> Result<Reply<UserDTO>, AppError> {
    require_role(&current_user, Role::Admin)?;
    let mut changes = body.changes();
    if let Some(password) = &body.password {
        changes = changes.set(
            "password",
            User::hash_password(password, state.config.bcrypt_cost)?,
        );
    }

    let user = state
        .users
        .update(&id, changes, Some(&without_password()))
        .await?;
    info!("User updated by admin");
    Ok(Reply::message("User updated successfully", UserDTO::from(user)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id, target = %id))]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    IdParam(id): IdParam,
) -> Result<Reply<()>, AppError> {
    require_role(&current_user, Role::Admin)?;
    state.users.remove(&id).await?;
    info!("User deleted by admin");
    Ok(Reply::message("User deleted successfully", ()))
}
