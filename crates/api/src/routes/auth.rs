//! Authentication endpoint handlers: register, login and token refresh.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::UserAuth;
use domain::models::user::{User, UserResponse};
use persistence::repositories::UserRepository;
use shared::jwt::{extract_user_id, TokenPair};
use shared::password::{hash_password, verify_password};

/// Request body for account registration.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct RegisterRequest {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,

    #[validate(custom(function = "shared::validation::validate_password_strength"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "first_name must be 1-100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "last_name must be 1-100 characters"))]
    pub last_name: String,
}

/// Request body for login.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for refreshing an access token.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response carrying the account and its token pair.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub tokens: TokenPair,
}

/// Register a new account.
///
/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    request.validate()?;

    let repo = UserRepository::new(state.pool.clone());

    if repo.find_by_email(&request.email).await?.is_some() {
        return Err(ApiError::Conflict("Email is already registered".to_string()));
    }

    let password_hash =
        hash_password(&request.password).map_err(|e| ApiError::Internal(e.to_string()))?;

    // The unique index on email still catches concurrent registrations.
    let entity = repo
        .create_user(
            &request.email,
            &password_hash,
            &request.first_name,
            &request.last_name,
            false,
        )
        .await?;

    let user = User::from(entity);
    let tokens = issue_token_pair(&state, &user)?;

    info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            tokens,
        }),
    ))
}

/// Log in with email and password.
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let repo = UserRepository::new(state.pool.clone());

    // Same error for unknown email and wrong password.
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let entity = repo
        .find_by_email(&request.email)
        .await?
        .ok_or_else(invalid)?;

    let verified = verify_password(&request.password, &entity.password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !verified {
        return Err(invalid());
    }

    let user = User::from(entity);
    let tokens = issue_token_pair(&state, &user)?;

    info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        user: user.into(),
        tokens,
    }))
}

/// Exchange a refresh token for a fresh token pair.
///
/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let jwt_config = UserAuth::create_jwt_config(&state.config.jwt).map_err(ApiError::Internal)?;

    let claims = jwt_config
        .validate_refresh_token(&request.refresh_token)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired refresh token".to_string()))?;
    let user_id = extract_user_id(&claims)
        .map_err(|_| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    let repo = UserRepository::new(state.pool.clone());
    let entity = repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    let user = User::from(entity);
    let tokens = issue_token_pair(&state, &user)?;

    Ok(Json(AuthResponse {
        user: user.into(),
        tokens,
    }))
}

fn issue_token_pair(state: &AppState, user: &User) -> Result<TokenPair, ApiError> {
    let jwt_config = UserAuth::create_jwt_config(&state.config.jwt).map_err(ApiError::Internal)?;
    jwt_config
        .generate_token_pair(user.id)
        .map_err(|e| ApiError::Internal(format!("Failed to issue tokens: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterRequest {
            email: "ana@example.com".to_string(),
            password: "sup3rsecret".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Silva".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            ..ok.clone()
        };
        assert!(bad_email.validate().is_err());

        let weak_password = RegisterRequest {
            password: "short".to_string(),
            ..ok.clone()
        };
        assert!(weak_password.validate().is_err());

        let blank_name = RegisterRequest {
            first_name: String::new(),
            ..ok
        };
        assert!(blank_name.validate().is_err());
    }

    #[test]
    fn test_login_request_deserialization() {
        let json = r#"{"email": "ana@example.com", "password": "sup3rsecret"}"#;
        let request: LoginRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.email, "ana@example.com");
    }

    #[test]
    fn test_refresh_request_deserialization() {
        let json = r#"{"refresh_token": "abc.def.ghi"}"#;
        let request: RefreshRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.refresh_token, "abc.def.ghi");
    }
}
