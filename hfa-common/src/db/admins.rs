//! Admin accounts and sessions
//!
//! Passwords are stored as salted SHA-256 hashes; sessions are opaque
//! tokens with an absolute expiry.

use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{Error, Result};

/// Admin account projection without credential material
#[derive(Debug, Clone, serde::Serialize)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub created_at: String,
}

/// Generate a random salt as 32 hex characters
pub fn generate_salt() -> String {
    let salt: u128 = rand::thread_rng().gen();
    format!("{:032x}", salt)
}

/// Salted password hash as 64 hex characters
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check a candidate password against the stored salt and hash
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    hash_password(password, salt) == expected_hash
}

/// Create an admin account with a freshly salted hash
pub async fn create_admin(
    pool: &SqlitePool,
    username: &str,
    email: Option<&str>,
    password: &str,
) -> Result<i64> {
    let salt = generate_salt();
    let hash = hash_password(password, &salt);

    let result = sqlx::query(
        "INSERT INTO admins (username, email, password_hash, password_salt) VALUES (?, ?, ?, ?)",
    )
    .bind(username)
    .bind(email)
    .bind(&hash)
    .bind(&salt)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return Error::Conflict(format!("admin username '{}' already exists", username));
            }
        }
        Error::Database(e)
    })?;

    Ok(result.last_insert_rowid())
}

/// Load credential material for a login attempt
pub async fn credentials_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<(i64, String, String)>> {
    let row: Option<(i64, String, String)> = sqlx::query_as(
        "SELECT id, password_hash, password_salt FROM admins WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Load credential material for a password change
pub async fn credentials_by_id(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<(String, String)>> {
    let row: Option<(String, String)> =
        sqlx::query_as("SELECT password_hash, password_salt FROM admins WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(row)
}

/// Admin profile by id
pub async fn admin_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Admin>> {
    let row: Option<(i64, String, Option<String>, String)> =
        sqlx::query_as("SELECT id, username, email, created_at FROM admins WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(row.map(|(id, username, email, created_at)| Admin {
        id,
        username,
        email,
        created_at,
    }))
}

/// Replace an admin's password with a freshly salted hash
pub async fn set_password(pool: &SqlitePool, id: i64, password: &str) -> Result<()> {
    let salt = generate_salt();
    let hash = hash_password(password, &salt);

    sqlx::query(
        "UPDATE admins SET password_hash = ?, password_salt = ?, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?",
    )
    .bind(&hash)
    .bind(&salt)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Create a session and return its token
pub async fn create_session(pool: &SqlitePool, admin_id: i64, ttl_seconds: i64) -> Result<String> {
    let token = Uuid::new_v4().to_string();
    let expires_at = crate::time::now().timestamp() + ttl_seconds;

    sqlx::query("INSERT INTO sessions (token, admin_id, expires_at) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(admin_id)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(token)
}

/// Resolve a live session token to its admin; expired or unknown tokens
/// resolve to None
pub async fn session_admin(pool: &SqlitePool, token: &str) -> Result<Option<Admin>> {
    let row: Option<(i64, String, Option<String>, String)> = sqlx::query_as(
        r#"
        SELECT a.id, a.username, a.email, a.created_at
        FROM sessions s
        JOIN admins a ON a.id = s.admin_id
        WHERE s.token = ? AND s.expires_at > ?
        "#,
    )
    .bind(token)
    .bind(crate::time::now().timestamp())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, username, email, created_at)| Admin {
        id,
        username,
        email,
        created_at,
    }))
}

/// Remove one session (logout)
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Drop expired sessions; returns how many were removed
pub async fn purge_expired_sessions(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(crate::time::now().timestamp())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[test]
    fn test_hash_is_deterministic_and_salted() {
        let salt = generate_salt();
        assert_eq!(salt.len(), 32);
        let h1 = hash_password("secret", &salt);
        let h2 = hash_password("secret", &salt);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);

        let other_salt = generate_salt();
        assert_ne!(hash_password("secret", &other_salt), h1);
    }

    #[test]
    fn test_verify_password() {
        let salt = generate_salt();
        let hash = hash_password("secret", &salt);
        assert!(verify_password("secret", &salt, &hash));
        assert!(!verify_password("wrong", &salt, &hash));
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let pool = test_pool().await;
        let admin_id = create_admin(&pool, "admin", None, "secret").await.unwrap();

        let token = create_session(&pool, admin_id, 3600).await.unwrap();
        let admin = session_admin(&pool, &token).await.unwrap().unwrap();
        assert_eq!(admin.username, "admin");

        delete_session(&pool, &token).await.unwrap();
        assert!(session_admin(&pool, &token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let pool = test_pool().await;
        let admin_id = create_admin(&pool, "admin", None, "secret").await.unwrap();

        let token = create_session(&pool, admin_id, -1).await.unwrap();
        assert!(session_admin(&pool, &token).await.unwrap().is_none());
        assert_eq!(purge_expired_sessions(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let pool = test_pool().await;
        create_admin(&pool, "admin", None, "secret").await.unwrap();
        match create_admin(&pool, "admin", None, "other").await {
            Err(crate::Error::Conflict(_)) => {}
            other => panic!("expected conflict, got {:?}", other),
        }
    }
}
