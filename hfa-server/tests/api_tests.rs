//! Integration tests for hfa-server API endpoints
//!
//! Tests cover:
//! - Health endpoint (no auth required)
//! - Session authentication and the public/protected split
//! - Member creation/validation, partial update, delete cascade
//! - Public member card projection (and its redactions)
//! - Dues ledger upserts, reconciliation report, year stats

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method

use hfa_common::db::{admins, init};
use hfa_common::time;
use hfa_server::{build_router, AppState};

/// Test helper: in-memory database with the full schema and one admin.
/// A single connection keeps every query on the same in-memory database.
async fn setup_test_db() -> (SqlitePool, i64) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should create in-memory database");

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();
    init::create_schema(&pool).await.unwrap();
    init::init_default_settings(&pool).await.unwrap();

    let admin_id = admins::create_admin(&pool, "admin", None, "secret")
        .await
        .unwrap();

    (pool, admin_id)
}

/// Test helper: app router over the given pool
fn setup_app(pool: SqlitePool) -> axum::Router {
    build_router(AppState::new(pool))
}

/// Test helper: live session token for the test admin
async fn session_token(pool: &SqlitePool, admin_id: i64) -> String {
    admins::create_session(pool, admin_id, 3600).await.unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Create an adult member through the API and return its JSON
async fn create_member(app: &axum::Router, token: &str, extra: Value) -> Value {
    let mut body = json!({
        "first_name_latin": "ali",
        "last_name_latin": "ben",
        "date_of_birth": "1990-05-20",
    });
    if let (Some(obj), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            obj.insert(k.clone(), v.clone());
        }
    }

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/members", Some(token), &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    extract_json(response.into_body()).await
}

// =============================================================================
// Health Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let (pool, _) = setup_test_db().await;
    let app = setup_app(pool);

    let response = app.oneshot(get_request("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "hfa-server");
    assert!(body["version"].is_string());
}

// =============================================================================
// Authentication Tests
// =============================================================================

#[tokio::test]
async fn test_protected_routes_require_session() {
    let (pool, _) = setup_test_db().await;
    let app = setup_app(pool);

    for uri in [
        "/api/members",
        "/api/dues/monthly",
        "/api/dues/stats",
        "/api/auth/me",
        "/api/admin/profile",
    ] {
        let response = app.clone().oneshot(get_request(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "uri: {}", uri);
    }
}

#[tokio::test]
async fn test_login_and_me_round_trip() {
    let (pool, _) = setup_test_db().await;
    let app = setup_app(pool);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({"username": "admin", "password": "secret"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::SET_COOKIE));

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["username"], "admin");
    let token = body["token"].as_str().unwrap().to_string();

    let response = app
        .oneshot(get_request("/api/auth/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["user"]["username"], "admin");
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let (pool, _) = setup_test_db().await;
    let app = setup_app(pool);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({"username": "admin", "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({"username": "ghost", "password": "secret"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let (pool, admin_id) = setup_test_db().await;
    let token = session_token(&pool, admin_id).await;
    let app = setup_app(pool);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/logout",
            Some(&token),
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request("/api/auth/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password() {
    let (pool, admin_id) = setup_test_db().await;
    let token = session_token(&pool, admin_id).await;
    let app = setup_app(pool);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/admin/change-password",
            Some(&token),
            &json!({"current_password": "wrong", "new_password": "next"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/admin/change-password",
            Some(&token),
            &json!({"current_password": "secret", "new_password": "next"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Old password no longer works, new one does
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({"username": "admin", "password": "secret"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({"username": "admin", "password": "next"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Member Tests
// =============================================================================

#[tokio::test]
async fn test_create_member_assigns_identity_and_code() {
    let (pool, admin_id) = setup_test_db().await;
    let token = session_token(&pool, admin_id).await;
    let app = setup_app(pool);

    let member = create_member(&app, &token, json!({})).await;
    let id = member["id"].as_i64().unwrap();
    assert_eq!(
        member["academy_code"].as_str().unwrap(),
        format!("HFA{:04}", id)
    );
    // Latin names are upper-cased on input
    assert_eq!(member["first_name_latin"], "ALI");
    assert_eq!(member["full_name_latin"], "ALI BEN");

    let second = create_member(&app, &token, json!({"first_name_latin": "sara"})).await;
    assert_ne!(second["id"], member["id"]);
    assert_ne!(second["academy_code"], member["academy_code"]);
}

#[tokio::test]
async fn test_create_member_requires_name_and_birth_date() {
    let (pool, admin_id) = setup_test_db().await;
    let token = session_token(&pool, admin_id).await;
    let app = setup_app(pool);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/members",
            Some(&token),
            &json!({"date_of_birth": "1990-05-20"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["field"], "full_name_latin");

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/members",
            Some(&token),
            &json!({"first_name_latin": "ali", "last_name_latin": "ben"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["field"], "date_of_birth");
}

#[tokio::test]
async fn test_create_minor_requires_guardian_data() {
    let (pool, admin_id) = setup_test_db().await;
    let token = session_token(&pool, admin_id).await;
    let app = setup_app(pool);

    // Born ~10 years ago: a minor in any test year
    let dob = format!("{}-01-01", time::current_year() - 10);
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/members",
            Some(&token),
            &json!({
                "first_name_latin": "Ali",
                "last_name_latin": "Ben",
                "date_of_birth": dob,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["field"], "guardian_first_name_latin");

    // Same minor with full guardian data is accepted
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/members",
            Some(&token),
            &json!({
                "first_name_latin": "Ali",
                "last_name_latin": "Ben",
                "date_of_birth": dob,
                "guardian_first_name_latin": "omar",
                "guardian_last_name_latin": "ben",
                "guardian_id_number": "AB1234",
                "guardian_phone": "+212600000000",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["guardian_full_name"], "OMAR BEN");
}

#[tokio::test]
async fn test_update_member_merges_partially() {
    let (pool, admin_id) = setup_test_db().await;
    let token = session_token(&pool, admin_id).await;
    let app = setup_app(pool);

    let member = create_member(&app, &token, json!({})).await;
    let id = member["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/members/{}", id),
            Some(&token),
            &json!({"school_name": "Lycee X", "medical_notes": "asthma"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = extract_json(response.into_body()).await;

    assert_eq!(updated["school_name"], "Lycee X");
    assert_eq!(updated["medical_notes"], "asthma");
    // Untouched fields survive the merge
    assert_eq!(updated["full_name_latin"], "ALI BEN");
    assert_eq!(updated["poor_family"], false);
    assert_eq!(updated["date_of_birth"], "1990-05-20");
}

#[tokio::test]
async fn test_delete_member_then_not_found() {
    let (pool, admin_id) = setup_test_db().await;
    let token = session_token(&pool, admin_id).await;
    let app = setup_app(pool);

    let member = create_member(&app, &token, json!({})).await;
    let id = member["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/members/{}", id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/members/{}", id), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Ledger rows cascaded with the record
    let response = app
        .oneshot(get_request(
            &format!("/api/dues/registration/{}", id),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Public Member Card Tests
// =============================================================================

#[tokio::test]
async fn test_member_card_is_public_and_redacted() {
    let (pool, admin_id) = setup_test_db().await;
    let token = session_token(&pool, admin_id).await;
    let app = setup_app(pool);

    let dob = format!("{}-01-01", time::current_year() - 10);
    let member = create_member(
        &app,
        &token,
        json!({
            "date_of_birth": dob,
            "guardian_first_name_latin": "omar",
            "guardian_last_name_latin": "ben",
            "guardian_id_number": "AB1234",
            "guardian_phone": "+212600000000",
        }),
    )
    .await;
    let code = member["academy_code"].as_str().unwrap();

    // Attach medical data through an update
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/members/{}", member["id"].as_i64().unwrap()),
            Some(&token),
            &json!({"medical_notes": "asthma"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // No session on the card lookup
    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/members/card/{}", code), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let card = extract_json(response.into_body()).await;
    assert_eq!(card["academy_code"], *code);
    assert_eq!(card["full_name_latin"], "ALI BEN");
    assert_eq!(card["age"].as_i64().unwrap(), 10);
    assert_eq!(card["age_category"], "U11");
    // Sensitive fields are absent from the projection
    assert!(card.get("guardian_id_number").is_none());
    assert!(card.get("guardian_phone").is_none());
    assert!(card.get("medical_notes").is_none());

    let response = app
        .oneshot(get_request("/api/members/card/HFA9999", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Dues Ledger Tests
// =============================================================================

#[tokio::test]
async fn test_registration_upsert_round_trip() {
    let (pool, admin_id) = setup_test_db().await;
    let token = session_token(&pool, admin_id).await;
    let app = setup_app(pool);

    let member = create_member(&app, &token, json!({})).await;
    let id = member["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/dues/registration/{}", id),
            Some(&token),
            &json!({"status": "paid", "amount": 300, "paid_at": "2026-01-15"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request(
            &format!("/api/dues/registration/{}", id),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "paid");
    assert_eq!(body["amount"].as_f64().unwrap(), 300.0);
    assert_eq!(body["paid_at"], "2026-01-15");
}

#[tokio::test]
async fn test_monthly_upsert_validates_input() {
    let (pool, admin_id) = setup_test_db().await;
    let token = session_token(&pool, admin_id).await;
    let app = setup_app(pool);

    let member = create_member(&app, &token, json!({})).await;
    let id = member["id"].as_i64().unwrap();
    let year = time::current_year();

    // Unknown status value
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/api/dues/monthly",
            Some(&token),
            &json!({"member_id": id, "year": year, "month": 3, "status": "waived"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["field"], "status");

    // Missing month
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/api/dues/monthly",
            Some(&token),
            &json!({"member_id": id, "year": year, "status": "paid"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Month out of range
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/api/dues/monthly",
            Some(&token),
            &json!({"member_id": id, "year": year, "month": 13, "status": "paid"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown member
    let response = app
        .oneshot(json_request(
            "PATCH",
            "/api/dues/monthly",
            Some(&token),
            &json!({"member_id": 9999, "year": year, "month": 3, "status": "paid"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_monthly_upsert_overwrites_and_reports_latest() {
    let (pool, admin_id) = setup_test_db().await;
    let token = session_token(&pool, admin_id).await;
    let app = setup_app(pool);

    let member = create_member(&app, &token, json!({})).await;
    let id = member["id"].as_i64().unwrap();
    let year = time::current_year();

    for body in [
        json!({"member_id": id, "year": year, "month": 4, "status": "paid", "amount": 100, "paid_at": "2026-04-01"}),
        json!({"member_id": id, "year": year, "month": 4, "status": "pending"}),
    ] {
        let response = app
            .clone()
            .oneshot(json_request("PATCH", "/api/dues/monthly", Some(&token), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(get_request(
            &format!("/api/dues/monthly?year={}", year),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = extract_json(response.into_body()).await;

    let months = report["members"][0]["months"].as_array().unwrap();
    assert_eq!(months.len(), 12);
    // Latest write wins; amount and paid timestamp were cleared
    assert_eq!(months[3]["status"], "pending");
    assert!(months[3]["amount"].is_null());
    assert!(months[3]["paid_at"].is_null());
}

#[tokio::test]
async fn test_report_applies_exemption_override() {
    let (pool, admin_id) = setup_test_db().await;
    let token = session_token(&pool, admin_id).await;
    let app = setup_app(pool);

    let member = create_member(&app, &token, json!({"poor_family": true})).await;
    let id = member["id"].as_i64().unwrap();
    let year = time::current_year();

    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/dues/monthly?year={}", year),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = extract_json(response.into_body()).await;

    assert_eq!(report["members"][0]["member_id"], id);
    assert_eq!(report["members"][0]["poor"], true);
    for totals in report["totals"].as_array().unwrap() {
        assert_eq!(totals["exempt"], 1, "month {}", totals["month"]);
        assert_eq!(totals["pending"], 0, "month {}", totals["month"]);
    }
}

#[tokio::test]
async fn test_report_never_pends_flagged_member_with_stale_rows() {
    let (pool, admin_id) = setup_test_db().await;
    let token = session_token(&pool, admin_id).await;
    let app = setup_app(pool);

    // Seeded as pending, flagged afterwards
    let member = create_member(&app, &token, json!({})).await;
    let id = member["id"].as_i64().unwrap();
    let year = time::current_year();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/members/{}", id),
            Some(&token),
            &json!({"poor_family": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/dues/monthly?year={}", year),
            Some(&token),
        ))
        .await
        .unwrap();
    let report = extract_json(response.into_body()).await;
    for totals in report["totals"].as_array().unwrap() {
        assert_eq!(totals["pending"], 0);
        assert_eq!(totals["exempt"], 1);
    }

    // The stats endpoint aggregates stored statuses and still counts
    // the stale pending rows
    let response = app
        .oneshot(get_request(
            &format!("/api/dues/stats?year={}", year),
            Some(&token),
        ))
        .await
        .unwrap();
    let stats = extract_json(response.into_body()).await;
    assert_eq!(stats["total_pending"], 12);
    assert_eq!(stats["total_exempt"], 0);
}

#[tokio::test]
async fn test_year_stats_sums_paid_amounts() {
    let (pool, admin_id) = setup_test_db().await;
    let token = session_token(&pool, admin_id).await;
    let app = setup_app(pool);

    let member = create_member(&app, &token, json!({})).await;
    let id = member["id"].as_i64().unwrap();
    let year = time::current_year();

    for (month, amount) in [(1, 100.0), (2, 150.0)] {
        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                "/api/dues/monthly",
                Some(&token),
                &json!({"member_id": id, "year": year, "month": month, "status": "paid", "amount": amount, "paid_at": "2026-02-01"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(get_request(
            &format!("/api/dues/stats?year={}", year),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stats = extract_json(response.into_body()).await;
    assert_eq!(stats["total_paid"].as_f64().unwrap(), 250.0);
    assert_eq!(stats["total_pending"], 10);
}

#[tokio::test]
async fn test_seed_endpoint_rolls_over_a_year_idempotently() {
    let (pool, admin_id) = setup_test_db().await;
    let token = session_token(&pool, admin_id).await;
    let app = setup_app(pool.clone());

    create_member(&app, &token, json!({})).await;
    let next_year = time::current_year() + 1;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/dues/seed",
                Some(&token),
                &json!({"year": next_year}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM dues WHERE kind = 'monthly' AND year = ?")
            .bind(next_year)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 12);

    let response = app
        .oneshot(get_request(
            &format!("/api/dues/monthly?year={}", next_year),
            Some(&token),
        ))
        .await
        .unwrap();
    let report = extract_json(response.into_body()).await;
    for totals in report["totals"].as_array().unwrap() {
        assert_eq!(totals["pending"], 1);
    }
}
