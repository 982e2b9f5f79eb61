//! Dues ledger database operations
//!
//! Seeding is insert-if-absent; cell writes are single-statement upserts
//! keyed by the period's unique index, so concurrent edits of the same
//! cell can never produce duplicate rows.

use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::ledger::{DuesStatus, DuesUpdate, MonthlyCell, RegistrationStatus, MONTHS_PER_YEAR};
use crate::{Error, Result};

fn status_from_db(raw: &str) -> Result<DuesStatus> {
    raw.parse()
        .map_err(|_| Error::Internal(format!("invalid stored dues status '{}'", raw)))
}

/// Seed a member's dues year on an open connection or transaction:
/// twelve monthly rows plus the singleton registration row, never
/// overwriting rows that already exist.
pub async fn seed_year_conn(
    conn: &mut SqliteConnection,
    member_id: i64,
    year: i32,
    exempt: bool,
) -> Result<()> {
    let status = if exempt {
        DuesStatus::Exempt
    } else {
        DuesStatus::Pending
    };

    for month in 1..=MONTHS_PER_YEAR {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO dues (member_id, kind, year, month, status, amount, paid_at)
            VALUES (?, 'monthly', ?, ?, ?, NULL, NULL)
            "#,
        )
        .bind(member_id)
        .bind(year)
        .bind(month)
        .bind(status.as_str())
        .execute(&mut *conn)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO dues (member_id, kind, year, month, status, amount, paid_at)
        VALUES (?, 'registration', NULL, NULL, ?, NULL, NULL)
        "#,
    )
    .bind(member_id)
    .bind(status.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Seed a member's dues year
pub async fn seed_year(pool: &SqlitePool, member_id: i64, year: i32, exempt: bool) -> Result<()> {
    let mut tx = pool.begin().await?;
    seed_year_conn(&mut *tx, member_id, year, exempt).await?;
    tx.commit().await?;
    Ok(())
}

/// Insert-or-update one monthly cell
pub async fn upsert_monthly(
    pool: &SqlitePool,
    member_id: i64,
    year: i32,
    month: u32,
    update: &DuesUpdate,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO dues (member_id, kind, year, month, status, amount, paid_at)
        VALUES (?, 'monthly', ?, ?, ?, ?, ?)
        ON CONFLICT(member_id, year, month) WHERE kind = 'monthly'
        DO UPDATE SET
            status = excluded.status,
            amount = excluded.amount,
            paid_at = excluded.paid_at,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(member_id)
    .bind(year)
    .bind(month)
    .bind(update.status.as_str())
    .bind(update.amount)
    .bind(&update.paid_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert-or-update the registration row
pub async fn upsert_registration(
    pool: &SqlitePool,
    member_id: i64,
    update: &DuesUpdate,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO dues (member_id, kind, year, month, status, amount, paid_at)
        VALUES (?, 'registration', NULL, NULL, ?, ?, ?)
        ON CONFLICT(member_id) WHERE kind = 'registration'
        DO UPDATE SET
            status = excluded.status,
            amount = excluded.amount,
            paid_at = excluded.paid_at,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(member_id)
    .bind(update.status.as_str())
    .bind(update.amount)
    .bind(&update.paid_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// All stored monthly cells for a year
pub async fn monthly_rows(pool: &SqlitePool, year: i32) -> Result<Vec<MonthlyCell>> {
    let rows = sqlx::query(
        r#"
        SELECT member_id, month, status, amount, paid_at
        FROM dues
        WHERE kind = 'monthly' AND year = ?
        "#,
    )
    .bind(year)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(MonthlyCell {
                member_id: row.try_get("member_id")?,
                month: row.try_get::<i64, _>("month")? as u32,
                status: status_from_db(row.try_get::<String, _>("status")?.as_str())?,
                amount: row.try_get("amount")?,
                paid_at: row.try_get("paid_at")?,
            })
        })
        .collect()
}

/// The registration row for a member, if present
pub async fn registration(pool: &SqlitePool, member_id: i64) -> Result<Option<RegistrationStatus>> {
    let row = sqlx::query(
        r#"
        SELECT status, amount, paid_at
        FROM dues
        WHERE member_id = ? AND kind = 'registration'
        "#,
    )
    .bind(member_id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        Ok(RegistrationStatus {
            status: status_from_db(row.try_get::<String, _>("status")?.as_str())?,
            amount: row.try_get("amount")?,
            paid_at: row.try_get("paid_at")?,
        })
    })
    .transpose()
}
