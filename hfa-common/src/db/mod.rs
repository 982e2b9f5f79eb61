//! SQLite store adapter
//!
//! Pool initialization plus the [`Store`] implementation. Identity
//! allocation rides on the members table's `INTEGER PRIMARY KEY
//! AUTOINCREMENT`, so two concurrent creations can never share an id or an
//! academy code.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

pub mod admins;
pub mod init;
pub mod ledger;
pub mod members;
pub mod settings;

use crate::ledger::{DuesUpdate, MonthlyCell, RegistrationStatus};
use crate::member::{Member, MemberDraft};
use crate::store::Store;
use crate::Result;

/// Initialize the database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys (member deletion cascades to dues rows)
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init::create_schema(&pool).await?;
    init::init_default_settings(&pool).await?;
    init::bootstrap_admin(&pool).await?;

    Ok(pool)
}

/// SQLite-backed [`Store`] adapter
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Raw pool access for concerns outside the store contract
    /// (credentials, sessions, settings)
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_member(&self, draft: MemberDraft, seed_year: i32) -> Result<Member> {
        members::create(&self.pool, draft, seed_year).await
    }

    async fn member(&self, id: i64) -> Result<Option<Member>> {
        members::select_by_id(&self.pool, id).await
    }

    async fn member_by_code(&self, academy_code: &str) -> Result<Option<Member>> {
        members::select_by_code(&self.pool, academy_code).await
    }

    async fn list_members(&self) -> Result<Vec<Member>> {
        members::select_all(&self.pool).await
    }

    async fn update_member(&self, member: &Member) -> Result<Member> {
        members::update(&self.pool, member).await
    }

    async fn delete_member(&self, id: i64) -> Result<bool> {
        members::delete(&self.pool, id).await
    }

    async fn backfill_academy_codes(&self) -> Result<u64> {
        members::backfill_academy_codes(&self.pool).await
    }

    async fn seed_year(&self, member_id: i64, year: i32, exempt: bool) -> Result<()> {
        ledger::seed_year(&self.pool, member_id, year, exempt).await
    }

    async fn upsert_monthly(
        &self,
        member_id: i64,
        year: i32,
        month: u32,
        update: DuesUpdate,
    ) -> Result<()> {
        ledger::upsert_monthly(&self.pool, member_id, year, month, &update).await
    }

    async fn upsert_registration(&self, member_id: i64, update: DuesUpdate) -> Result<()> {
        ledger::upsert_registration(&self.pool, member_id, &update).await
    }

    async fn monthly_rows(&self, year: i32) -> Result<Vec<MonthlyCell>> {
        ledger::monthly_rows(&self.pool, year).await
    }

    async fn registration(&self, member_id: i64) -> Result<Option<RegistrationStatus>> {
        ledger::registration(&self.pool, member_id).await
    }
}

/// In-memory pool with the full schema, for tests. A single connection
/// keeps every query on the same in-memory database.
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();
    init::create_schema(&pool).await.unwrap();
    pool
}
