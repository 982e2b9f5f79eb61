//! Member database operations
//!
//! Creation allocates the identity from the serial primary key, derives the
//! academy code and seeds the dues ledger inside one transaction; updates
//! persist an already-merged record and re-derive the registration row
//! status from the exemption flag.

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::db::ledger;
use crate::ledger::DuesStatus;
use crate::member::{academy_code, Member, MemberDraft};
use crate::{Error, Result};

const MEMBER_COLUMNS: &str = "id, academy_code, first_name_latin, last_name_latin, \
     first_name_local, last_name_local, full_name_latin, full_name_local, date_of_birth, \
     gender, place_of_birth, id_type, id_number, poor_family, photo_url, \
     guardian_full_name, guardian_first_name_latin, guardian_last_name_latin, \
     guardian_first_name_local, guardian_last_name_local, guardian_id_number, \
     guardian_phone, guardian_kinship, guardian_date_of_birth, guardian_place_of_birth, \
     guardian_address, height_cm, weight_kg, scholar_level, school_name, blood_type, \
     allergies, medical_notes, emergency_contact_name, emergency_contact_phone, \
     jersey_number, preferred_position, dominant_foot, address_current, created_at, updated_at";

fn member_from_row(row: &SqliteRow) -> Result<Member> {
    Ok(Member {
        id: row.try_get("id")?,
        academy_code: row
            .try_get::<Option<String>, _>("academy_code")?
            .unwrap_or_default(),
        first_name_latin: row.try_get("first_name_latin")?,
        last_name_latin: row.try_get("last_name_latin")?,
        first_name_local: row.try_get("first_name_local")?,
        last_name_local: row.try_get("last_name_local")?,
        full_name_latin: row.try_get("full_name_latin")?,
        full_name_local: row.try_get("full_name_local")?,
        date_of_birth: row.try_get::<NaiveDate, _>("date_of_birth")?,
        gender: row.try_get("gender")?,
        place_of_birth: row.try_get("place_of_birth")?,
        id_type: row.try_get("id_type")?,
        id_number: row.try_get("id_number")?,
        poor_family: row.try_get::<i64, _>("poor_family")? != 0,
        photo_url: row.try_get("photo_url")?,
        guardian_full_name: row.try_get("guardian_full_name")?,
        guardian_first_name_latin: row.try_get("guardian_first_name_latin")?,
        guardian_last_name_latin: row.try_get("guardian_last_name_latin")?,
        guardian_first_name_local: row.try_get("guardian_first_name_local")?,
        guardian_last_name_local: row.try_get("guardian_last_name_local")?,
        guardian_id_number: row.try_get("guardian_id_number")?,
        guardian_phone: row.try_get("guardian_phone")?,
        guardian_kinship: row.try_get("guardian_kinship")?,
        guardian_date_of_birth: row.try_get::<Option<NaiveDate>, _>("guardian_date_of_birth")?,
        guardian_place_of_birth: row.try_get("guardian_place_of_birth")?,
        guardian_address: row.try_get("guardian_address")?,
        height_cm: row.try_get("height_cm")?,
        weight_kg: row.try_get("weight_kg")?,
        scholar_level: row.try_get("scholar_level")?,
        school_name: row.try_get("school_name")?,
        blood_type: row.try_get("blood_type")?,
        allergies: row.try_get("allergies")?,
        medical_notes: row.try_get("medical_notes")?,
        emergency_contact_name: row.try_get("emergency_contact_name")?,
        emergency_contact_phone: row.try_get("emergency_contact_phone")?,
        jersey_number: row.try_get("jersey_number")?,
        preferred_position: row.try_get("preferred_position")?,
        dominant_foot: row.try_get("dominant_foot")?,
        address_current: row.try_get("address_current")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Map uniqueness violations to the conflict taxonomy
fn map_write_err(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return Error::Conflict(db.message().to_string());
        }
    }
    Error::Database(err)
}

/// Insert a member, derive its academy code and seed the current dues year
/// in one transaction
pub async fn create(pool: &SqlitePool, draft: MemberDraft, seed_year: i32) -> Result<Member> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO members (
            first_name_latin, last_name_latin, first_name_local, last_name_local,
            full_name_latin, full_name_local, date_of_birth, gender, place_of_birth,
            id_type, id_number, poor_family, photo_url,
            guardian_full_name, guardian_first_name_latin, guardian_last_name_latin,
            guardian_first_name_local, guardian_last_name_local,
            guardian_id_number, guardian_phone, guardian_kinship,
            guardian_date_of_birth, guardian_place_of_birth, guardian_address
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&draft.first_name_latin)
    .bind(&draft.last_name_latin)
    .bind(&draft.first_name_local)
    .bind(&draft.last_name_local)
    .bind(&draft.full_name_latin)
    .bind(&draft.full_name_local)
    .bind(draft.date_of_birth)
    .bind(&draft.gender)
    .bind(&draft.place_of_birth)
    .bind(&draft.id_type)
    .bind(&draft.id_number)
    .bind(draft.poor_family as i64)
    .bind(&draft.photo_url)
    .bind(&draft.guardian_full_name)
    .bind(&draft.guardian_first_name_latin)
    .bind(&draft.guardian_last_name_latin)
    .bind(&draft.guardian_first_name_local)
    .bind(&draft.guardian_last_name_local)
    .bind(&draft.guardian_id_number)
    .bind(&draft.guardian_phone)
    .bind(&draft.guardian_kinship)
    .bind(draft.guardian_date_of_birth)
    .bind(&draft.guardian_place_of_birth)
    .bind(&draft.guardian_address)
    .execute(&mut *tx)
    .await
    .map_err(map_write_err)?;

    let id = result.last_insert_rowid();
    let code = academy_code(id);
    sqlx::query("UPDATE members SET academy_code = ? WHERE id = ?")
        .bind(&code)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_write_err)?;

    ledger::seed_year_conn(&mut *tx, id, seed_year, draft.poor_family).await?;

    let member = select_by_id_conn(&mut *tx, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("member {} vanished during creation", id)))?;

    tx.commit().await?;
    Ok(member)
}

async fn select_by_id_conn(conn: &mut SqliteConnection, id: i64) -> Result<Option<Member>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM members WHERE id = ?",
        MEMBER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(member_from_row).transpose()
}

/// Load member by identity
pub async fn select_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Member>> {
    let mut conn = pool.acquire().await?;
    select_by_id_conn(&mut *conn, id).await
}

/// Load member by academy code
pub async fn select_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Member>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM members WHERE academy_code = ?",
        MEMBER_COLUMNS
    ))
    .bind(code)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(member_from_row).transpose()
}

/// All members, newest first
pub async fn select_all(pool: &SqlitePool) -> Result<Vec<Member>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM members ORDER BY created_at DESC, id DESC",
        MEMBER_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(member_from_row).collect()
}

/// Persist a merged record and re-derive the registration row status from
/// the exemption flag
pub async fn update(pool: &SqlitePool, member: &Member) -> Result<Member> {
    let mut tx = pool.begin().await?;

    // Legacy rows may predate code derivation
    let code = if member.academy_code.is_empty() {
        academy_code(member.id)
    } else {
        member.academy_code.clone()
    };

    sqlx::query(
        r#"
        UPDATE members SET
            academy_code = ?,
            first_name_latin = ?,
            last_name_latin = ?,
            first_name_local = ?,
            last_name_local = ?,
            full_name_latin = ?,
            full_name_local = ?,
            date_of_birth = ?,
            gender = ?,
            place_of_birth = ?,
            id_type = ?,
            id_number = ?,
            poor_family = ?,
            photo_url = ?,
            guardian_full_name = ?,
            guardian_first_name_latin = ?,
            guardian_last_name_latin = ?,
            guardian_first_name_local = ?,
            guardian_last_name_local = ?,
            guardian_id_number = ?,
            guardian_phone = ?,
            guardian_kinship = ?,
            guardian_date_of_birth = ?,
            guardian_place_of_birth = ?,
            guardian_address = ?,
            height_cm = ?,
            weight_kg = ?,
            scholar_level = ?,
            school_name = ?,
            blood_type = ?,
            allergies = ?,
            medical_notes = ?,
            emergency_contact_name = ?,
            emergency_contact_phone = ?,
            jersey_number = ?,
            preferred_position = ?,
            dominant_foot = ?,
            address_current = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&code)
    .bind(&member.first_name_latin)
    .bind(&member.last_name_latin)
    .bind(&member.first_name_local)
    .bind(&member.last_name_local)
    .bind(&member.full_name_latin)
    .bind(&member.full_name_local)
    .bind(member.date_of_birth)
    .bind(&member.gender)
    .bind(&member.place_of_birth)
    .bind(&member.id_type)
    .bind(&member.id_number)
    .bind(member.poor_family as i64)
    .bind(&member.photo_url)
    .bind(&member.guardian_full_name)
    .bind(&member.guardian_first_name_latin)
    .bind(&member.guardian_last_name_latin)
    .bind(&member.guardian_first_name_local)
    .bind(&member.guardian_last_name_local)
    .bind(&member.guardian_id_number)
    .bind(&member.guardian_phone)
    .bind(&member.guardian_kinship)
    .bind(member.guardian_date_of_birth)
    .bind(&member.guardian_place_of_birth)
    .bind(&member.guardian_address)
    .bind(member.height_cm)
    .bind(member.weight_kg)
    .bind(&member.scholar_level)
    .bind(&member.school_name)
    .bind(&member.blood_type)
    .bind(&member.allergies)
    .bind(&member.medical_notes)
    .bind(&member.emergency_contact_name)
    .bind(&member.emergency_contact_phone)
    .bind(member.jersey_number)
    .bind(&member.preferred_position)
    .bind(&member.dominant_foot)
    .bind(&member.address_current)
    .bind(member.id)
    .execute(&mut *tx)
    .await
    .map_err(map_write_err)?;

    // The registration row tracks the current exemption flag; amount and
    // paid timestamp are left alone.
    let status = if member.poor_family {
        DuesStatus::Exempt
    } else {
        DuesStatus::Pending
    };
    sqlx::query(
        "UPDATE dues SET status = ?, updated_at = CURRENT_TIMESTAMP
         WHERE member_id = ? AND kind = 'registration'",
    )
    .bind(status.as_str())
    .bind(member.id)
    .execute(&mut *tx)
    .await?;

    let updated = select_by_id_conn(&mut *tx, member.id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("member {}", member.id)))?;

    tx.commit().await?;
    Ok(updated)
}

/// Delete a member; dues rows cascade. Returns false for an unknown id.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM members WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Assign derived academy codes to rows missing one. Idempotent.
pub async fn backfill_academy_codes(pool: &SqlitePool) -> Result<u64> {
    let missing: Vec<(i64,)> =
        sqlx::query_as("SELECT id FROM members WHERE academy_code IS NULL OR academy_code = ''")
            .fetch_all(pool)
            .await?;

    let mut fixed = 0u64;
    for (id,) in missing {
        sqlx::query("UPDATE members SET academy_code = ? WHERE id = ?")
            .bind(academy_code(id))
            .bind(id)
            .execute(pool)
            .await
            .map_err(map_write_err)?;
        fixed += 1;
    }

    Ok(fixed)
}
