//! Member record handlers
//!
//! CRUD on /api/members plus the public card lookup by academy code.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use tracing::info;

use hfa_common::member::{self, Member, MemberCard, MemberPatch, NewMember};
use hfa_common::time;
use hfa_common::Store;

use crate::{ApiError, ApiResult, AppState};

/// GET /api/members
pub async fn list_members(State(state): State<AppState>) -> ApiResult<Json<Vec<Member>>> {
    Ok(Json(state.store.list_members().await?))
}

/// GET /api/members/:id
pub async fn get_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Member>> {
    let member = state
        .store
        .member(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("member {}", id)))?;
    Ok(Json(member))
}

/// POST /api/members
///
/// Validates and normalizes the payload, then creates the record with its
/// identity, academy code and seeded dues ledger in one store operation.
pub async fn create_member(
    State(state): State<AppState>,
    Json(input): Json<NewMember>,
) -> ApiResult<(StatusCode, Json<Member>)> {
    let draft = member::admit(input, time::today())?;
    let created = state
        .store
        .create_member(draft, time::current_year())
        .await?;
    info!(
        "member {} created with academy code {}",
        created.id, created.academy_code
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/members/:id
///
/// Partial update: fields left out of the body keep their stored value.
pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<MemberPatch>,
) -> ApiResult<Json<Member>> {
    member::validate_id_type(patch.id_type.as_deref())?;

    let existing = state
        .store
        .member(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("member {}", id)))?;

    let merged = member::apply_patch(&existing, patch);
    let updated = state.store.update_member(&merged).await?;
    Ok(Json(updated))
}

/// DELETE /api/members/:id
pub async fn delete_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    if !state.store.delete_member(id).await? {
        return Err(ApiError::NotFound(format!("member {}", id)));
    }
    info!("member {} deleted", id);
    Ok(Json(json!({ "ok": true })))
}

/// GET /api/members/card/:academy_code
///
/// Public lookup. Returns the reduced card projection only; guardian
/// identifiers, medical notes and contact details stay private.
pub async fn member_card(
    State(state): State<AppState>,
    Path(academy_code): Path<String>,
) -> ApiResult<Json<MemberCard>> {
    let academy_code = academy_code.trim();
    if academy_code.is_empty() {
        return Err(ApiError::BadRequest("Invalid academy code".to_string()));
    }

    let member = state
        .store
        .member_by_code(academy_code)
        .await?
        .ok_or_else(|| ApiError::NotFound("member card".to_string()))?;

    Ok(Json(MemberCard::from_member(&member, time::today())))
}
