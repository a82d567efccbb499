//! Staff authentication route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::extract::AppJson;
use crate::middleware::{RequireAdminAuth, clear_current_admin, set_current_admin};
use crate::models::{AdminUser, CurrentAdmin};
use crate::services::AdminAuthService;
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for a successful login.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub admin: AdminUser,
}

/// Log in with email and password.
#[instrument(skip(state, session, body))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    AppJson(body): AppJson<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let admin = AdminAuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await
        .inspect_err(|_| tracing::warn!("Failed admin login attempt"))?;

    set_current_admin(&session, &CurrentAdmin::from(&admin))
        .await
        .map_err(|e| AppError::Internal(format!("Failed to start session: {e}")))?;
    set_sentry_user(admin.id.as_i32(), Some(admin.email.as_str()));

    tracing::info!(admin_id = %admin.id, role = %admin.role, "Admin logged in");
    Ok(Json(SessionResponse { admin }))
}

/// End the session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_admin(&session)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to end session: {e}")))?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in staff member, re-read so role changes show up.
#[instrument(skip(state, current), fields(admin_id = %current.id))]
pub async fn me(
    State(state): State<AppState>,
    RequireAdminAuth(current): RequireAdminAuth,
) -> Result<Json<AdminUser>> {
    let admin = AdminAuthService::new(state.pool())
        .get_admin(current.id)
        .await?;
    Ok(Json(admin))
}
