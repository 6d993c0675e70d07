use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::auth::{token, RequireAuth, Role};
use crate::domain::users::{LoginRequest, LoginResponse, User};
use crate::error::{ApiError, ApiResult};

/// Exchange username/password for an access token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(&req.username)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;

    let verified = bcrypt::verify(&req.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?;
    if !verified {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    let role = Role::from_str(&user.role)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("user has unknown role")))?;

    let token = token::issue_token(
        user.id,
        role,
        &state.settings.jwt_secret,
        state.settings.jwt_ttl_seconds,
    )?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse { token, user }))
}

/// Profile of the authenticated user
pub async fn get_me(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> ApiResult<DataResponse<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth.user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    Ok(DataResponse::new(user))
}
