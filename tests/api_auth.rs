//! Integration tests per gli endpoints di autenticazione
//!
//! Test per:
//! - POST /api/v1/auth/register
//! - POST /api/v1/auth/login
//! - POST /api/v1/auth/logout
//! - middleware di autenticazione

mod common;

#[cfg(test)]
mod auth_tests {
    use super::common::*;
    use axum::http::HeaderName;
    use serde_json::{Value, json};

    // ============================================================
    // Test per POST /auth/register - register_user
    // ============================================================

    #[tokio::test]
    async fn test_register_success() {
        let state = create_test_state();
        let server = create_test_server(state.clone());

        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "email": "  New.User@Example.com ",
                "name": "New User",
                "password": "Password123"
            }))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "User registered successfully");
        assert_eq!(body["data"]["email"], "new.user@example.com");
        assert_eq!(body["data"]["role"], "user");
        assert_eq!(body["data"]["credits"], 0);
        assert!(body["data"].get("password").is_none(), "La password non deve uscire");
        assert!(body.get("pagination").is_none());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let state = create_test_state();
        let server = create_test_server(state.clone());
        seed_user(&state, "alice@example.com").await;

        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "email": "ALICE@example.com",
                "name": "Alice Again",
                "password": "Password123"
            }))
            .await;

        response.assert_status_conflict();
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "User with this email already exists");
        assert_eq!(error_code(&body), "DUPLICATE_EMAIL");
        assert_eq!(body["error"]["details"]["field"], "email");
    }

    #[tokio::test]
    async fn test_register_invalid_fields() {
        let state = create_test_state();
        let server = create_test_server(state.clone());

        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "email": "not-an-email",
                "name": "Al",
                "password": "short"
            }))
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(error_code(&body), "VALIDATION_ERROR");
        let details = body["error"]["details"].as_array().unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0]["field"], "email");
        assert_eq!(details[1]["field"], "password");
    }

    #[tokio::test]
    async fn test_register_missing_field() {
        let state = create_test_state();
        let server = create_test_server(state.clone());

        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({ "email": "bob@example.com" }))
            .await;

        // 422 quando il JSON non rispetta la forma del DTO
        response.assert_status_unprocessable_entity();
        let body: Value = response.json();
        assert_eq!(error_code(&body), "HTTP_EXCEPTION");
        assert_eq!(body["success"], false);
    }

    // ============================================================
    // Test per POST /auth/login - login_user
    // ============================================================

    #[tokio::test]
    async fn test_login_success() {
        let state = create_test_state();
        let server = create_test_server(state.clone());
        let alice = seed_user(&state, "alice@example.com").await;

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({
                "email": "alice@example.com",
                "password": TEST_PASSWORD
            }))
            .await;

        response.assert_status_ok();

        let headers = response.headers();
        let cookie = headers.get("set-cookie").unwrap().to_str().unwrap();
        assert!(cookie.starts_with("token="), "Set-Cookie deve contenere il token");
        assert!(cookie.contains("HttpOnly"));

        let auth_header = headers.get("authorization").unwrap().to_str().unwrap();
        assert!(auth_header.starts_with("Bearer "));

        let body: Value = response.json();
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["data"]["user"]["id"], alice.id.to_string());
        assert_eq!(
            format!("Bearer {}", body["data"]["token"].as_str().unwrap()),
            auth_header
        );
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let state = create_test_state();
        let server = create_test_server(state.clone());
        seed_user(&state, "alice@example.com").await;

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({
                "email": "alice@example.com",
                "password": "wrongpassword"
            }))
            .await;

        response.assert_status_unauthorized();
        let body: Value = response.json();
        assert_eq!(error_code(&body), "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_login_nonexistent_user() {
        let state = create_test_state();
        let server = create_test_server(state.clone());

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({
                "email": "ghost@example.com",
                "password": "password123"
            }))
            .await;

        response.assert_status_unauthorized();
        let body: Value = response.json();
        assert_eq!(error_code(&body), "INVALID_CREDENTIALS");
    }

    // ============================================================
    // Test per POST /auth/logout - logout_user
    // ============================================================

    #[tokio::test]
    async fn test_logout_expires_cookie() {
        let state = create_test_state();
        let server = create_test_server(state.clone());

        let response = server.post("/api/v1/auth/logout").await;

        response.assert_status_ok();
        let cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
        let body: Value = response.json();
        assert_eq!(body["message"], "Logout successful");
        assert_eq!(body["data"], Value::Null);
    }

    // ============================================================
    // Test per il middleware di autenticazione
    // ============================================================

    #[tokio::test]
    async fn test_protected_route_without_token() {
        let state = create_test_state();
        let server = create_test_server(state.clone());

        let response = server.get("/api/v1/users/me").await;

        response.assert_status_unauthorized();
        let body: Value = response.json();
        assert_eq!(error_code(&body), "UNAUTHORIZED");
        assert_eq!(body["message"], "Authentication required");
    }

    #[tokio::test]
    async fn test_protected_route_with_invalid_token() {
        let state = create_test_state();
        let server = create_test_server(state.clone());

        let response = bearer(server.get("/api/v1/users/me"), "not.a.token").await;

        response.assert_status_unauthorized();
        let body: Value = response.json();
        assert_eq!(error_code(&body), "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_token_of_deleted_user_is_rejected() {
        let state = create_test_state();
        let server = create_test_server(state.clone());
        let alice = seed_user(&state, "alice@example.com").await;
        let token = create_test_jwt(&alice);
        state.users.remove(&alice.id).await.unwrap();

        let response = bearer(server.get("/api/v1/users/me"), &token).await;

        response.assert_status_unauthorized();
        let body: Value = response.json();
        assert_eq!(body["message"], "You are not an authorized user");
    }

    #[tokio::test]
    async fn test_storage_fault_during_authentication_is_internal() {
        let state = create_unavailable_users_state();
        let server = create_test_server(state);
        let admin = {
            let seeded = create_test_state();
            seed_admin(&seeded, "admin@example.com").await
        };
        let token = create_test_jwt(&admin);

        let response = bearer(server.get("/api/v1/products"), &token).await;

        response.assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(
            body,
            json!({
                "success": false,
                "message": "Internal server error",
                "error": {
                    "code": "INTERNAL_SERVER_ERROR",
                    "details": "An unexpected error occurred"
                }
            })
        );
    }

    #[tokio::test]
    async fn test_token_from_cookie() {
        let state = create_test_state();
        let server = create_test_server(state.clone());
        let alice = seed_user(&state, "alice@example.com").await;
        let token = create_test_jwt(&alice);

        let response = server
            .get("/api/v1/users/me")
            .add_header(HeaderName::from_static("cookie"), format!("token={}", token))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["email"], "alice@example.com");
    }
}
