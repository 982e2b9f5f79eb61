//! Settings database operations
//!
//! Get/set accessors for the settings key-value table.

use sqlx::SqlitePool;

use crate::{Error, Result};

/// Session lifetime for the credential layer
///
/// **Default:** 604800 seconds (7 days)
pub async fn get_session_timeout_seconds(pool: &SqlitePool) -> Result<i64> {
    get_setting(pool, "session_timeout_seconds")
        .await
        .map(|opt| opt.unwrap_or(604_800))
}

/// Insert a setting only when the key is absent
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO NOTHING",
    )
    .bind(key)
    .bind(default)
    .execute(pool)
    .await?;

    Ok(())
}

/// Generic setting getter
pub async fn get_setting<T>(pool: &SqlitePool, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (upsert)
pub async fn set_setting<T>(pool: &SqlitePool, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(pool)
    .await
    .map_err(Error::Database)?;

    Ok(())
}
