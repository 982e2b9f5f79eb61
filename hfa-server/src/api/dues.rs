//! Dues ledger handlers
//!
//! Monthly tracker, cell upserts, registration fee and per-year stats.
//! Reads go through the reconciliation engine, never straight at the
//! stored rows.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use hfa_common::ledger::{self, DuesStatus, DuesUpdate, MonthlyReport, RegistrationStatus, YearStats};
use hfa_common::time;
use hfa_common::{Error, Store};

use crate::{ApiError, ApiResult, AppState};

/// Query parameters selecting a dues year; defaults to the current year
#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

/// GET /api/dues/monthly?year=
pub async fn monthly_report(
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Json<MonthlyReport>> {
    let year = query.year.unwrap_or_else(time::current_year);
    let report = ledger::monthly_report(state.store.as_ref(), year).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct MonthlyUpdateRequest {
    pub member_id: Option<i64>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub status: Option<String>,
    pub amount: Option<f64>,
    pub paid_at: Option<String>,
}

/// PATCH /api/dues/monthly
///
/// Idempotent upsert of one monthly cell. Absent amount/paid_at clear the
/// stored values.
pub async fn update_monthly(
    State(state): State<AppState>,
    Json(request): Json<MonthlyUpdateRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let member_id = request.member_id.ok_or_else(|| Error::required("member_id"))?;
    let year = request.year.ok_or_else(|| Error::required("year"))?;
    let month = request.month.ok_or_else(|| Error::required("month"))?;
    let status: DuesStatus = request
        .status
        .ok_or_else(|| Error::required("status"))?
        .parse()?;

    if !(1..=ledger::MONTHS_PER_YEAR).contains(&month) {
        return Err(Error::validation("month", "must be between 1 and 12").into());
    }

    if state.store.member(member_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("member {}", member_id)));
    }

    state
        .store
        .upsert_monthly(
            member_id,
            year,
            month,
            DuesUpdate {
                status,
                amount: request.amount,
                paid_at: request.paid_at,
            },
        )
        .await?;

    Ok(Json(json!({ "ok": true })))
}

/// GET /api/dues/registration/:member_id
///
/// Direct passthrough of the stored registration row.
pub async fn registration_status(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
) -> ApiResult<Json<RegistrationStatus>> {
    let status = ledger::registration_status(state.store.as_ref(), member_id).await?;
    Ok(Json(status))
}

#[derive(Debug, Deserialize)]
pub struct RegistrationUpdateRequest {
    pub status: Option<String>,
    pub amount: Option<f64>,
    pub paid_at: Option<String>,
}

/// PATCH /api/dues/registration/:member_id
pub async fn update_registration(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
    Json(request): Json<RegistrationUpdateRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let status: DuesStatus = request
        .status
        .ok_or_else(|| Error::required("status"))?
        .parse()?;

    if state.store.member(member_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("member {}", member_id)));
    }

    state
        .store
        .upsert_registration(
            member_id,
            DuesUpdate {
                status,
                amount: request.amount,
                paid_at: request.paid_at,
            },
        )
        .await?;

    Ok(Json(json!({ "ok": true })))
}

/// GET /api/dues/stats?year=
///
/// Per-year totals over the stored monthly rows.
pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Json<YearStats>> {
    let year = query.year.unwrap_or_else(time::current_year);
    let stats = ledger::year_stats(state.store.as_ref(), year).await?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
pub struct SeedRequest {
    pub year: Option<i32>,
}

/// POST /api/dues/seed
///
/// Annual rollover: insert-if-absent seeding of the given year for every
/// member, honoring each member's current exemption flag. Re-running is a
/// no-op on already-present rows.
pub async fn seed_year(
    State(state): State<AppState>,
    Json(request): Json<SeedRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let year = request.year.ok_or_else(|| Error::required("year"))?;

    let members = state.store.list_members().await?;
    let seeded = members.len();
    for member in members {
        state
            .store
            .seed_year(member.id, year, member.poor_family)
            .await?;
    }

    info!("seeded dues year {} for {} members", year, seeded);
    Ok(Json(json!({ "ok": true, "year": year, "members": seeded })))
}
