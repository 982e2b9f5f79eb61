//! Database schema creation
//!
//! Idempotent `CREATE TABLE IF NOT EXISTS` migrations, default settings and
//! first-run admin bootstrap. Safe to call on every startup.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::admins;
use crate::Result;

/// Create all tables and indexes if needed
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_members_table(pool).await?;
    create_dues_table(pool).await?;
    create_admins_table(pool).await?;
    create_sessions_table(pool).await?;
    create_settings_table(pool).await?;
    Ok(())
}

async fn create_members_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            academy_code TEXT UNIQUE,
            first_name_latin TEXT,
            last_name_latin TEXT,
            first_name_local TEXT,
            last_name_local TEXT,
            full_name_latin TEXT NOT NULL,
            full_name_local TEXT,
            date_of_birth TEXT NOT NULL,
            gender TEXT,
            place_of_birth TEXT,
            id_type TEXT CHECK(id_type IN ('birth_cert','national_id')),
            id_number TEXT,
            poor_family INTEGER NOT NULL DEFAULT 0,
            photo_url TEXT,
            guardian_full_name TEXT,
            guardian_first_name_latin TEXT,
            guardian_last_name_latin TEXT,
            guardian_first_name_local TEXT,
            guardian_last_name_local TEXT,
            guardian_id_number TEXT,
            guardian_phone TEXT,
            guardian_kinship TEXT,
            guardian_date_of_birth TEXT,
            guardian_place_of_birth TEXT,
            guardian_address TEXT,
            height_cm REAL,
            weight_kg REAL,
            scholar_level TEXT,
            school_name TEXT,
            blood_type TEXT,
            allergies TEXT,
            medical_notes TEXT,
            emergency_contact_name TEXT,
            emergency_contact_phone TEXT,
            jersey_number INTEGER,
            preferred_position TEXT,
            dominant_foot TEXT,
            address_current TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_dues_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dues (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            member_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
            kind TEXT NOT NULL CHECK(kind IN ('registration','monthly')),
            year INTEGER,
            month INTEGER,
            status TEXT NOT NULL CHECK(status IN ('paid','pending','exempt')),
            amount REAL,
            paid_at TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Uniqueness per period. Registration rows carry NULL year/month, and
    // NULLs compare distinct in a plain UNIQUE constraint, so each kind
    // gets its own partial unique index; upserts target these indexes.
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS dues_monthly_idx
        ON dues(member_id, year, month) WHERE kind = 'monthly'
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS dues_registration_idx
        ON dues(member_id) WHERE kind = 'registration'
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_admins_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            admin_id INTEGER NOT NULL REFERENCES admins(id) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            expires_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize default settings, leaving existing values untouched
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    crate::db::settings::ensure_setting(pool, "session_timeout_seconds", "604800").await?; // 7 days
    Ok(())
}

/// Create the first admin account when none exists.
///
/// Username and password come from `HFA_ADMIN_USERNAME` /
/// `HFA_ADMIN_PASSWORD`; the fallback credentials are logged with a
/// warning so operators change them.
pub async fn bootstrap_admin(pool: &SqlitePool) -> Result<()> {
    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM admins LIMIT 1")
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let username = std::env::var("HFA_ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let password = match std::env::var("HFA_ADMIN_PASSWORD") {
        Ok(p) if !p.is_empty() => p,
        _ => {
            warn!("HFA_ADMIN_PASSWORD not set; bootstrapping admin '{}' with the default password", username);
            "admin123".to_string()
        }
    };

    let email = std::env::var("HFA_ADMIN_EMAIL").ok();
    admins::create_admin(pool, &username, email.as_deref(), &password).await?;
    info!("Admin account bootstrapped. Username: {}", username);

    Ok(())
}
