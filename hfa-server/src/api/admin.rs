//! Admin account handlers

use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use hfa_common::db::admins;

use crate::api::auth::SessionContext;
use crate::{ApiError, ApiResult, AppState};

/// GET /api/admin/profile
pub async fn profile(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<admins::Admin>> {
    let admin = admins::admin_by_id(state.store.pool(), session.admin.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("admin".to_string()))?;
    Ok(Json(admin))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// POST /api/admin/change-password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let new_password = request
        .new_password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("new_password required".to_string()))?;

    let pool = state.store.pool();
    let (hash, salt) = admins::credentials_by_id(pool, session.admin.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("admin".to_string()))?;

    let current = request.current_password.unwrap_or_default();
    if !admins::verify_password(&current, &salt, &hash) {
        return Err(ApiError::BadRequest(
            "Current password incorrect".to_string(),
        ));
    }

    admins::set_password(pool, session.admin.id, &new_password).await?;
    info!("admin '{}' changed password", session.admin.username);

    Ok(Json(json!({ "ok": true })))
}
