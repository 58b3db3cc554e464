//! Admin services - Bootstrap dell'account amministratore all'avvio

use crate::core::{AppError, AppState};
use crate::entities::{NewUser, Role, User};
use crate::repositories::Filter;
use tracing::{info, instrument, warn};

/// Makes sure an admin account exists for `ADMIN_EMAIL`.
///
/// Running it again with the same configuration changes nothing. Returns the
/// admin, or `None` when the credentials are not configured.
#[instrument(skip(state))]
pub async fn ensure_admin(state: &AppState) -> Result<Option<User>, AppError> {
    let (Some(email), Some(password)) = (
        state.config.admin_email.as_deref(),
        state.config.admin_password.as_deref(),
    ) else {
        warn!("ADMIN_EMAIL or ADMIN_PASSWORD not set, skipping admin bootstrap");
        return Ok(None);
    };

    let email = User::normalize_email(email);
    let filter = Filter::new()
        .eq("email", email.as_str())
        .eq("role", Role::Admin.as_str());
    if let Some(admin) = state.users.find_one(&filter, None).await? {
        info!(user_id = %admin.id, "Admin account already present");
        return Ok(Some(admin));
    }

    let admin = state
        .users
        .create(NewUser {
            email,
            name: "Administrator".to_string(),
            password: User::hash_password(password, state.config.bcrypt_cost)?,
            role: Role::Admin,
        })
        .await?;
    info!(user_id = %admin.id, "Admin account created");
    Ok(Some(admin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;

    fn state(email: Option<&str>, password: Option<&str>) -> AppState {
        AppState::in_memory(Config {
            admin_email: email.map(String::from),
            admin_password: password.map(String::from),
            bcrypt_cost: 4,
            ..Config::default()
        })
    }

    #[tokio::test]
    async fn creates_the_admin_once() {
        let state = state(Some(" Root@Example.com "), Some("supersecret"));

        let first = ensure_admin(&state).await.unwrap().unwrap();
        let second = ensure_admin(&state).await.unwrap().unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.email, "root@example.com");
        assert_eq!(first.role, Role::Admin);
        assert!(first.verify_password("supersecret"));
        assert_eq!(state.users.count(&Filter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn skipped_without_credentials() {
        let state = state(Some("root@example.com"), None);
        assert!(ensure_admin(&state).await.unwrap().is_none());
        assert_eq!(state.users.count(&Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn existing_plain_user_with_the_admin_email_is_a_conflict() {
        let state = state(Some("root@example.com"), Some("supersecret"));
        state
            .users
            .create(NewUser {
                email: "root@example.com".to_string(),
                name: "Squatter".to_string(),
                password: User::hash_password("whatever1", 4).unwrap(),
                role: Role::User,
            })
            .await
            .unwrap();

        let err = ensure_admin(&state).await.unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_EMAIL");
    }
}
