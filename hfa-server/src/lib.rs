//! hfa-server library - HTTP surface for the membership and dues service

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;

use hfa_common::db::SqliteStore;

pub mod api;
pub mod error;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Store adapter; handlers and the reconciliation engine go through
    /// the [`hfa_common::Store`] trait, credential/session code uses the
    /// underlying pool.
    pub store: Arc<SqliteStore>,
}

impl AppState {
    /// Create new application state
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            store: Arc::new(SqliteStore::new(pool)),
        }
    }
}

/// Build application router
///
/// Everything under the protected router requires a live session; the
/// health endpoint, login and the academy-code card lookup are public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    // Protected routes (require a session)
    let protected = Router::new()
        .route(
            "/api/members",
            get(api::members::list_members).post(api::members::create_member),
        )
        .route(
            "/api/members/:id",
            get(api::members::get_member)
                .put(api::members::update_member)
                .delete(api::members::delete_member),
        )
        .route(
            "/api/dues/monthly",
            get(api::dues::monthly_report).patch(api::dues::update_monthly),
        )
        .route(
            "/api/dues/registration/:member_id",
            get(api::dues::registration_status).patch(api::dues::update_registration),
        )
        .route("/api/dues/stats", get(api::dues::stats))
        .route("/api/dues/seed", post(api::dues::seed_year))
        .route("/api/auth/me", get(api::auth::me))
        .route("/api/auth/logout", post(api::auth::logout))
        .route("/api/admin/profile", get(api::admin::profile))
        .route("/api/admin/change-password", post(api::admin::change_password))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::require_session,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/api/auth/login", post(api::auth::login))
        .route("/api/members/card/:academy_code", get(api::members::member_card))
        .merge(api::health::health_routes());

    // Combine routers
    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
