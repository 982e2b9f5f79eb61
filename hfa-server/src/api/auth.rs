//! Session authentication: login/logout/me plus the middleware guarding
//! the protected router.
//!
//! The session token travels in an HttpOnly cookie for browsers; a bearer
//! Authorization header is accepted for non-browser clients.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use hfa_common::db::{admins, settings};

use crate::{ApiError, ApiResult, AppState};

/// Session cookie name
pub const SESSION_COOKIE: &str = "hfa_session";

/// Authenticated caller, inserted into request extensions by
/// [`require_session`]
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub admin: admins::Admin,
    pub token: String,
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(cookies) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
        for part in cookies.split(';') {
            if let Some(value) = part.trim().strip_prefix("hfa_session=") {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Authentication middleware for the protected router.
///
/// Resolves the session token to an admin account; expired or unknown
/// tokens get 401 with no further detail.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers()).ok_or(ApiError::Unauthorized)?;

    let admin = admins::session_admin(state.store.pool(), &token)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    request
        .extensions_mut()
        .insert(SessionContext { admin, token });

    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub ok: bool,
    pub username: String,
    /// Session token, also set as an HttpOnly cookie
    pub token: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Response> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password required".to_string(),
        ));
    }

    let pool = state.store.pool();
    let (admin_id, hash, salt) = admins::credentials_by_username(pool, &payload.username)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !admins::verify_password(&payload.password, &salt, &hash) {
        return Err(ApiError::Unauthorized);
    }

    let ttl = settings::get_session_timeout_seconds(pool).await?;
    let token = admins::create_session(pool, admin_id, ttl).await?;
    info!("admin '{}' logged in", payload.username);

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, ttl
    );
    let mut response = Json(LoginResponse {
        ok: true,
        username: payload.username,
        token,
    })
    .into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::Internal(format!("session cookie: {}", e)))?,
    );

    Ok(response)
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Response> {
    admins::delete_session(state.store.pool(), &session.token).await?;

    let cookie = format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE);
    let mut response = Json(json!({ "ok": true })).into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::Internal(format!("session cookie: {}", e)))?,
    );

    Ok(response)
}

/// GET /api/auth/me
pub async fn me(Extension(session): Extension<SessionContext>) -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "user": {
            "id": session.admin.id,
            "username": session.admin.username,
        }
    }))
}
