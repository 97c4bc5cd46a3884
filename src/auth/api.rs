//! Authentication API Endpoints
//! Registration and login

use crate::auth::{
    jwt::JwtHandler,
    models::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, User},
    password::{hash_password, placeholder_hash, verify_password},
    user_store::UserStore,
};
use crate::error::{ApiError, StoreError};
use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const USER_EXISTS: &str = "User already exists";
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const REGISTER_FAILED: &str = "Error registering user";
const LOGIN_FAILED: &str = "Error logging in";

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub user_store: UserStore,
    pub jwt_handler: Arc<JwtHandler>,
    pub bcrypt_cost: u32,
    /// Verified against when the email is unknown
    placeholder_hash: Arc<str>,
}

impl AuthState {
    pub fn new(user_store: UserStore, jwt_handler: Arc<JwtHandler>, bcrypt_cost: u32) -> Self {
        Self {
            user_store,
            jwt_handler,
            bcrypt_cost,
            placeholder_hash: placeholder_hash(bcrypt_cost).into(),
        }
    }
}

/// Register endpoint - POST /api/auth/register
pub async fn register(
    State(state): State<AuthState>,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let existing = state
        .user_store
        .find_by_email(&payload.email)
        .await
        .map_err(|e| ApiError::internal(REGISTER_FAILED, e))?;

    if existing.is_some() {
        warn!("Registration rejected, email already registered: {}", payload.email);
        return Err(ApiError::Conflict(USER_EXISTS));
    }

    let password_hash = hash_password(&payload.password, state.bcrypt_cost)
        .await
        .map_err(|e| ApiError::internal(REGISTER_FAILED, e))?;

    let user = User {
        id: Uuid::new_v4(),
        username: payload.username,
        email: payload.email,
        password_hash,
        created_at: Utc::now().to_rfc3339(),
    };

    // A concurrent registration may have taken the email since the lookup
    state.user_store.insert(&user).await.map_err(|e| match e {
        StoreError::DuplicateEmail => {
            warn!("Registration lost race for email: {}", user.email);
            ApiError::Conflict(USER_EXISTS)
        }
        other => ApiError::internal(REGISTER_FAILED, other),
    })?;

    info!("User registered: {} ({})", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
        }),
    ))
}

/// Login endpoint - POST /api/auth/login
pub async fn login(
    State(state): State<AuthState>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<Json<LoginResponse>, ApiError> {
    info!("Login attempt: {}", payload.email);

    let user = state
        .user_store
        .find_by_email(&payload.email)
        .await
        .map_err(|e| ApiError::internal(LOGIN_FAILED, e))?;

    // Unknown email and wrong password must be indistinguishable to the
    // caller, in body and in time spent
    let stored_hash = user
        .as_ref()
        .map_or(&*state.placeholder_hash, |u| u.password_hash.as_str());

    let valid = verify_password(&payload.password, stored_hash)
        .await
        .map_err(|e| ApiError::internal(LOGIN_FAILED, e))?;

    let Some(user) = user else {
        warn!("Failed login attempt (unknown email): {}", payload.email);
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
    };

    if !valid {
        warn!("Failed login attempt (bad password): {}", payload.email);
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
    }

    let (token, expires_in) = state
        .jwt_handler
        .issue(&user.id.to_string())
        .map_err(|e| ApiError::internal(LOGIN_FAILED, e))?;

    info!("Login successful: {} ({})", user.username, user.id);

    Ok(Json(LoginResponse { token, expires_in }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use std::marker::PhantomData;

    fn test_state() -> AuthState {
        let db = Database::in_memory().unwrap();
        let jwt = Arc::new(JwtHandler::new("test-secret").unwrap());
        AuthState::new(UserStore::new(db), jwt, 4)
    }

    fn register_request(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn json_body<T>(payload: T) -> WithRejection<Json<T>, ApiError> {
        WithRejection(Json(payload), PhantomData)
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_stores_hashed_password() {
        let state = test_state();

        let (status, Json(body)) = register(
            State(state.clone()),
            json_body(register_request("testuser", "test@example.com", "password123")),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.message, "User registered successfully");

        let stored = state
            .user_store
            .find_by_email("test@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.password_hash, "password123");
        assert!(stored.password_hash.starts_with("$2"));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let state = test_state();

        register(
            State(state.clone()),
            json_body(register_request("testuser", "test@example.com", "password123")),
        )
        .await
        .unwrap();

        let err = register(
            State(state.clone()),
            json_body(register_request("testuser2", "test@example.com", "password123")),
        )
        .await
        .unwrap_err();

        assert_eq!(err, ApiError::Conflict("User already exists"));
        assert_eq!(state.user_store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_login_issues_token_for_user() {
        let state = test_state();
        register(
            State(state.clone()),
            json_body(register_request("testuser", "test@example.com", "password123")),
        )
        .await
        .unwrap();

        let Json(body) = login(
            State(state.clone()),
            json_body(login_request("test@example.com", "password123")),
        )
        .await
        .unwrap();

        assert_eq!(body.expires_in, 3600);

        let user = state
            .user_store
            .find_by_email("test@example.com")
            .await
            .unwrap()
            .unwrap();
        let claims = state.jwt_handler.verify(&body.token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let state = test_state();
        register(
            State(state.clone()),
            json_body(register_request("testuser", "test@example.com", "password123")),
        )
        .await
        .unwrap();

        let wrong_password = login(
            State(state.clone()),
            json_body(login_request("test@example.com", "wrongpassword")),
        )
        .await
        .unwrap_err();

        let unknown_email = login(
            State(state.clone()),
            json_body(login_request("nobody@example.com", "password123")),
        )
        .await
        .unwrap_err();

        assert_eq!(wrong_password, ApiError::Unauthorized("Invalid credentials"));
        assert_eq!(wrong_password, unknown_email);
    }

    #[tokio::test]
    async fn test_unknown_email_pays_for_a_hash_check() {
        let state = test_state();
        assert!(state.placeholder_hash.starts_with("$2b$04$"));

        // A placeholder bcrypt can't parse would surface as a 500 here
        let err = login(
            State(state),
            json_body(login_request("nobody@example.com", "password123")),
        )
        .await
        .unwrap_err();
        assert_eq!(err, ApiError::Unauthorized("Invalid credentials"));
    }
}
