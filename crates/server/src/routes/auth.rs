//! Auth routes: signup, login, profile.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::user::{User, UserPatch};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Request to create an account.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Login credentials.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Bearer token response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// POST /auth/signup
///
/// # Errors
///
/// 400 for an invalid email or weak password, 409 for a duplicate email.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.pool(), state.jwt())
        .register(&req.email, &req.name, &req.password)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /auth/login
///
/// # Errors
///
/// 401 for a wrong email/password combination.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let (_, token) = AuthService::new(state.pool(), state.jwt())
        .login(&req.email, &req.password)
        .await?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer",
    }))
}

/// GET /auth/user
pub async fn profile(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// PUT /auth/user
///
/// Applies an explicit patch: only `name` and `password` may change, and
/// only when present in the body.
///
/// # Errors
///
/// 400 for an empty patch or a weak password.
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(patch): Json<UserPatch>,
) -> Result<Json<User>> {
    if patch.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_owned()));
    }

    let updated = AuthService::new(state.pool(), state.jwt())
        .update_profile(user.id, &patch)
        .await?;

    Ok(Json(updated))
}
