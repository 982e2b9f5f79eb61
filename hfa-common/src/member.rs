//! Member domain model
//!
//! Identity and academy-code derivation, age gating for guardian data,
//! input normalization for creation, and null-coalescing merge semantics
//! for partial updates. Everything here is pure; persistence lives in the
//! store adapters.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Fixed prefix of every academy code (e.g. identity 7 -> "HFA0007")
pub const ACADEMY_CODE_PREFIX: &str = "HFA";

/// Age at which a member stops being a minor
pub const ADULT_AGE_YEARS: i32 = 18;

/// Derive the academy code for an identity.
///
/// Pure function of the identity: prefix + zero-padded decimal id. The
/// backfill path recomputes missing codes for existing identities with
/// this same derivation, so it must never depend on external state.
pub fn academy_code(identity: i64) -> String {
    format!("{}{:04}", ACADEMY_CODE_PREFIX, identity)
}

/// Age in whole years at `today`.
///
/// The year difference is decremented by one when today's (month, day)
/// is earlier than the birth (month, day): a member born 2010-06-15 is
/// 17 on 2028-06-14 and 18 on 2028-06-15.
pub fn age_in_years(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

/// Whether a member is a minor at `today`
pub fn is_minor(date_of_birth: NaiveDate, today: NaiveDate) -> bool {
    age_in_years(date_of_birth, today) < ADULT_AGE_YEARS
}

/// Competition age band shown on the public member card
pub fn age_category(age: i32) -> &'static str {
    match age {
        i32::MIN..=7 => "U7",
        8..=9 => "U9",
        10..=11 => "U11",
        12..=13 => "U13",
        14..=15 => "U15",
        16..=17 => "U17",
        18..=19 => "U19",
        _ => "Senior",
    }
}

/// A stored member record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub academy_code: String,
    pub first_name_latin: Option<String>,
    pub last_name_latin: Option<String>,
    pub first_name_local: Option<String>,
    pub last_name_local: Option<String>,
    pub full_name_latin: String,
    pub full_name_local: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: Option<String>,
    pub place_of_birth: Option<String>,
    pub id_type: Option<String>,
    pub id_number: Option<String>,
    pub poor_family: bool,
    pub photo_url: Option<String>,
    pub guardian_full_name: Option<String>,
    pub guardian_first_name_latin: Option<String>,
    pub guardian_last_name_latin: Option<String>,
    pub guardian_first_name_local: Option<String>,
    pub guardian_last_name_local: Option<String>,
    pub guardian_id_number: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_kinship: Option<String>,
    pub guardian_date_of_birth: Option<NaiveDate>,
    pub guardian_place_of_birth: Option<String>,
    pub guardian_address: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub scholar_level: Option<String>,
    pub school_name: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub medical_notes: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub jersey_number: Option<i64>,
    pub preferred_position: Option<String>,
    pub dominant_foot: Option<String>,
    pub address_current: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Creation request for a member
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMember {
    pub first_name_latin: Option<String>,
    pub last_name_latin: Option<String>,
    pub first_name_local: Option<String>,
    pub last_name_local: Option<String>,
    pub full_name_latin: Option<String>,
    pub full_name_local: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub place_of_birth: Option<String>,
    pub id_type: Option<String>,
    pub id_number: Option<String>,
    #[serde(default)]
    pub poor_family: bool,
    pub photo_url: Option<String>,
    pub guardian_full_name: Option<String>,
    pub guardian_first_name_latin: Option<String>,
    pub guardian_last_name_latin: Option<String>,
    pub guardian_first_name_local: Option<String>,
    pub guardian_last_name_local: Option<String>,
    pub guardian_id_number: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_kinship: Option<String>,
    pub guardian_date_of_birth: Option<NaiveDate>,
    pub guardian_place_of_birth: Option<String>,
    pub guardian_address: Option<String>,
}

/// Normalized, validated member data ready for insertion.
///
/// Produced only by [`admit`]; identity, academy code and timestamps are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct MemberDraft {
    pub first_name_latin: Option<String>,
    pub last_name_latin: Option<String>,
    pub first_name_local: Option<String>,
    pub last_name_local: Option<String>,
    pub full_name_latin: String,
    pub full_name_local: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: Option<String>,
    pub place_of_birth: Option<String>,
    pub id_type: Option<String>,
    pub id_number: Option<String>,
    pub poor_family: bool,
    pub photo_url: Option<String>,
    pub guardian_full_name: Option<String>,
    pub guardian_first_name_latin: Option<String>,
    pub guardian_last_name_latin: Option<String>,
    pub guardian_first_name_local: Option<String>,
    pub guardian_last_name_local: Option<String>,
    pub guardian_id_number: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_kinship: Option<String>,
    pub guardian_date_of_birth: Option<NaiveDate>,
    pub guardian_place_of_birth: Option<String>,
    pub guardian_address: Option<String>,
}

/// Partial update for a member. Fields left out of the request body (or
/// sent as null) retain their previous value; this is a merge, not a
/// replace.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberPatch {
    pub first_name_latin: Option<String>,
    pub last_name_latin: Option<String>,
    pub first_name_local: Option<String>,
    pub last_name_local: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub place_of_birth: Option<String>,
    pub id_type: Option<String>,
    pub id_number: Option<String>,
    pub poor_family: Option<bool>,
    pub photo_url: Option<String>,
    pub guardian_full_name: Option<String>,
    pub guardian_first_name_latin: Option<String>,
    pub guardian_last_name_latin: Option<String>,
    pub guardian_first_name_local: Option<String>,
    pub guardian_last_name_local: Option<String>,
    pub guardian_id_number: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_kinship: Option<String>,
    pub guardian_date_of_birth: Option<NaiveDate>,
    pub guardian_place_of_birth: Option<String>,
    pub guardian_address: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub scholar_level: Option<String>,
    pub school_name: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub medical_notes: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub jersey_number: Option<i64>,
    pub preferred_position: Option<String>,
    pub dominant_foot: Option<String>,
    pub address_current: Option<String>,
}

/// Reduced, non-sensitive projection served on the public lookup path.
/// No guardian identifiers, no medical notes, no contact details.
#[derive(Debug, Serialize)]
pub struct MemberCard {
    pub academy_code: String,
    pub first_name_latin: Option<String>,
    pub last_name_latin: Option<String>,
    pub first_name_local: Option<String>,
    pub last_name_local: Option<String>,
    pub full_name_latin: String,
    pub full_name_local: Option<String>,
    pub date_of_birth: NaiveDate,
    pub age: i32,
    pub age_category: String,
    pub photo_url: Option<String>,
}

impl MemberCard {
    pub fn from_member(member: &Member, today: NaiveDate) -> Self {
        let age = age_in_years(member.date_of_birth, today);
        MemberCard {
            academy_code: member.academy_code.clone(),
            first_name_latin: member.first_name_latin.clone(),
            last_name_latin: member.last_name_latin.clone(),
            first_name_local: member.first_name_local.clone(),
            last_name_local: member.last_name_local.clone(),
            full_name_latin: member.full_name_latin.clone(),
            full_name_local: member.full_name_local.clone(),
            date_of_birth: member.date_of_birth,
            age,
            age_category: age_category(age).to_string(),
            photo_url: member.photo_url.clone(),
        }
    }
}

/// Upper-case a latin name field, treating blank input as absent
fn normalize_latin(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
}

/// Pass a free-text field through, treating blank input as absent
fn normalize_text(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Join first and last name parts; None when both are absent
fn join_names(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let joined = format!("{} {}", first.unwrap_or(""), last.unwrap_or(""))
        .trim()
        .to_string();
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Accepted identity-document kinds
pub const ID_TYPES: [&str; 2] = ["birth_cert", "national_id"];

/// Check an optional id_type against the accepted document kinds
pub fn validate_id_type(id_type: Option<&str>) -> Result<()> {
    match id_type {
        Some(t) if !ID_TYPES.contains(&t) => Err(Error::validation(
            "id_type",
            format!("unknown id type '{}' (expected birth_cert or national_id)", t),
        )),
        _ => Ok(()),
    }
}

/// Validate and normalize a creation request.
///
/// Requires data from which the latin full name is derivable, plus a date
/// of birth. Minors (per [`is_minor`] at `today`) must come with guardian
/// latin names, id number and phone. Latin name fields, for the member and
/// the guardian alike, are upper-cased.
pub fn admit(input: NewMember, today: NaiveDate) -> Result<MemberDraft> {
    let first_name_latin = normalize_latin(input.first_name_latin);
    let last_name_latin = normalize_latin(input.last_name_latin);
    let guardian_first_name_latin = normalize_latin(input.guardian_first_name_latin);
    let guardian_last_name_latin = normalize_latin(input.guardian_last_name_latin);

    let full_name_latin = join_names(first_name_latin.as_deref(), last_name_latin.as_deref())
        .or_else(|| normalize_text(input.full_name_latin))
        .ok_or_else(|| {
            Error::validation(
                "full_name_latin",
                "first/last latin names or an explicit full name are required",
            )
        })?;

    let full_name_local = join_names(
        input.first_name_local.as_deref(),
        input.last_name_local.as_deref(),
    )
    .or_else(|| normalize_text(input.full_name_local.clone()));

    let date_of_birth = input
        .date_of_birth
        .ok_or_else(|| Error::required("date_of_birth"))?;

    let id_type = normalize_text(input.id_type);
    validate_id_type(id_type.as_deref())?;

    if is_minor(date_of_birth, today) {
        if guardian_first_name_latin.is_none() {
            return Err(minor_requires("guardian_first_name_latin"));
        }
        if guardian_last_name_latin.is_none() {
            return Err(minor_requires("guardian_last_name_latin"));
        }
        if normalize_text(input.guardian_id_number.clone()).is_none() {
            return Err(minor_requires("guardian_id_number"));
        }
        if normalize_text(input.guardian_phone.clone()).is_none() {
            return Err(minor_requires("guardian_phone"));
        }
    }

    let guardian_full_name = normalize_text(input.guardian_full_name).or_else(|| {
        join_names(
            guardian_first_name_latin.as_deref(),
            guardian_last_name_latin.as_deref(),
        )
    });

    Ok(MemberDraft {
        first_name_latin,
        last_name_latin,
        first_name_local: normalize_text(input.first_name_local),
        last_name_local: normalize_text(input.last_name_local),
        full_name_latin,
        full_name_local,
        date_of_birth,
        gender: normalize_text(input.gender).map(|g| g.to_lowercase()),
        place_of_birth: normalize_text(input.place_of_birth),
        id_type,
        id_number: normalize_text(input.id_number),
        poor_family: input.poor_family,
        photo_url: normalize_text(input.photo_url),
        guardian_full_name,
        guardian_first_name_latin,
        guardian_last_name_latin,
        guardian_first_name_local: normalize_text(input.guardian_first_name_local),
        guardian_last_name_local: normalize_text(input.guardian_last_name_local),
        guardian_id_number: normalize_text(input.guardian_id_number),
        guardian_phone: normalize_text(input.guardian_phone),
        guardian_kinship: normalize_text(input.guardian_kinship),
        guardian_date_of_birth: input.guardian_date_of_birth,
        guardian_place_of_birth: normalize_text(input.guardian_place_of_birth),
        guardian_address: normalize_text(input.guardian_address),
    })
}

fn minor_requires(field: &str) -> Error {
    Error::validation(field, "required for minors")
}

/// Merge a partial update into an existing record.
///
/// Only supplied fields change. Latin name fields are re-upper-cased when
/// (and only when) supplied. Derived full names are recomputed only when
/// one of their constituent parts changed, keeping the previous value when
/// the recomputed join would be empty. Minor/guardian completeness is
/// deliberately not re-checked here; see DESIGN.md.
pub fn apply_patch(existing: &Member, patch: MemberPatch) -> Member {
    let mut m = existing.clone();

    let latin_changed = patch.first_name_latin.is_some() || patch.last_name_latin.is_some();
    if let Some(v) = patch.first_name_latin {
        m.first_name_latin = normalize_latin(Some(v));
    }
    if let Some(v) = patch.last_name_latin {
        m.last_name_latin = normalize_latin(Some(v));
    }
    if latin_changed {
        if let Some(full) = join_names(m.first_name_latin.as_deref(), m.last_name_latin.as_deref())
        {
            m.full_name_latin = full;
        }
    }

    let local_changed = patch.first_name_local.is_some() || patch.last_name_local.is_some();
    if let Some(v) = patch.first_name_local {
        m.first_name_local = normalize_text(Some(v));
    }
    if let Some(v) = patch.last_name_local {
        m.last_name_local = normalize_text(Some(v));
    }
    if local_changed {
        m.full_name_local =
            join_names(m.first_name_local.as_deref(), m.last_name_local.as_deref())
                .or(m.full_name_local);
    }

    if let Some(v) = patch.date_of_birth {
        m.date_of_birth = v;
    }
    if let Some(v) = patch.gender {
        m.gender = normalize_text(Some(v)).map(|g| g.to_lowercase());
    }
    if let Some(v) = patch.place_of_birth {
        m.place_of_birth = normalize_text(Some(v));
    }
    if let Some(v) = patch.id_type {
        m.id_type = normalize_text(Some(v));
    }
    if let Some(v) = patch.id_number {
        m.id_number = normalize_text(Some(v));
    }
    if let Some(v) = patch.poor_family {
        m.poor_family = v;
    }
    if let Some(v) = patch.photo_url {
        m.photo_url = normalize_text(Some(v));
    }

    let guardian_latin_changed =
        patch.guardian_first_name_latin.is_some() || patch.guardian_last_name_latin.is_some();
    if let Some(v) = patch.guardian_first_name_latin {
        m.guardian_first_name_latin = normalize_latin(Some(v));
    }
    if let Some(v) = patch.guardian_last_name_latin {
        m.guardian_last_name_latin = normalize_latin(Some(v));
    }
    if let Some(v) = patch.guardian_full_name {
        m.guardian_full_name = normalize_text(Some(v));
    } else if guardian_latin_changed {
        m.guardian_full_name = join_names(
            m.guardian_first_name_latin.as_deref(),
            m.guardian_last_name_latin.as_deref(),
        )
        .or(m.guardian_full_name);
    }

    if let Some(v) = patch.guardian_first_name_local {
        m.guardian_first_name_local = normalize_text(Some(v));
    }
    if let Some(v) = patch.guardian_last_name_local {
        m.guardian_last_name_local = normalize_text(Some(v));
    }
    if let Some(v) = patch.guardian_id_number {
        m.guardian_id_number = normalize_text(Some(v));
    }
    if let Some(v) = patch.guardian_phone {
        m.guardian_phone = normalize_text(Some(v));
    }
    if let Some(v) = patch.guardian_kinship {
        m.guardian_kinship = normalize_text(Some(v));
    }
    if let Some(v) = patch.guardian_date_of_birth {
        m.guardian_date_of_birth = Some(v);
    }
    if let Some(v) = patch.guardian_place_of_birth {
        m.guardian_place_of_birth = normalize_text(Some(v));
    }
    if let Some(v) = patch.guardian_address {
        m.guardian_address = normalize_text(Some(v));
    }

    if let Some(v) = patch.height_cm {
        m.height_cm = Some(v);
    }
    if let Some(v) = patch.weight_kg {
        m.weight_kg = Some(v);
    }
    if let Some(v) = patch.scholar_level {
        m.scholar_level = normalize_text(Some(v));
    }
    if let Some(v) = patch.school_name {
        m.school_name = normalize_text(Some(v));
    }
    if let Some(v) = patch.blood_type {
        m.blood_type = normalize_text(Some(v));
    }
    if let Some(v) = patch.allergies {
        m.allergies = normalize_text(Some(v));
    }
    if let Some(v) = patch.medical_notes {
        m.medical_notes = normalize_text(Some(v));
    }
    if let Some(v) = patch.emergency_contact_name {
        m.emergency_contact_name = normalize_text(Some(v));
    }
    if let Some(v) = patch.emergency_contact_phone {
        m.emergency_contact_phone = normalize_text(Some(v));
    }
    if let Some(v) = patch.jersey_number {
        m.jersey_number = Some(v);
    }
    if let Some(v) = patch.preferred_position {
        m.preferred_position = normalize_text(Some(v));
    }
    if let Some(v) = patch.dominant_foot {
        m.dominant_foot = normalize_text(Some(v));
    }
    if let Some(v) = patch.address_current {
        m.address_current = normalize_text(Some(v));
    }

    m
}
