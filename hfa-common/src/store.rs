//! Abstract store interface
//!
//! All persistence behind one trait so the reconciliation engine and the
//! HTTP handlers are written once, with concrete backends as swappable
//! adapters ([`SqliteStore`](crate::db::SqliteStore) being the shipped
//! one). Infrastructure only: validation and merge rules live in the
//! domain modules.

use async_trait::async_trait;

use crate::ledger::{DuesUpdate, MonthlyCell, RegistrationStatus};
use crate::member::{Member, MemberDraft};
use crate::Result;

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new member. Allocates the identity from the store's serial
    /// key, derives the academy code from it, and seeds the dues ledger for
    /// `seed_year` — all atomically with the record insertion. Two
    /// concurrent creations must never observe the same identity or code.
    async fn create_member(&self, draft: MemberDraft, seed_year: i32) -> Result<Member>;

    /// Fetch a member by identity
    async fn member(&self, id: i64) -> Result<Option<Member>>;

    /// Fetch a member by academy code (the public lookup path)
    async fn member_by_code(&self, academy_code: &str) -> Result<Option<Member>>;

    /// All members, newest first
    async fn list_members(&self) -> Result<Vec<Member>>;

    /// Persist an already-merged record, and re-derive the registration
    /// row's status from the record's exemption flag (status only; amount
    /// and paid timestamp are untouched).
    async fn update_member(&self, member: &Member) -> Result<Member>;

    /// Delete a member; ledger rows cascade. Returns false when the
    /// identity is unknown.
    async fn delete_member(&self, id: i64) -> Result<bool>;

    /// Assign the deterministic academy code to any member missing one.
    /// Idempotent; safe to run repeatedly. Returns the number of rows
    /// fixed.
    async fn backfill_academy_codes(&self) -> Result<u64>;

    /// Insert-if-absent seeding for a member's year: twelve monthly rows
    /// plus the singleton registration row, status exempt when the member
    /// is flagged, else pending. Existing rows are never overwritten.
    async fn seed_year(&self, member_id: i64, year: i32, exempt: bool) -> Result<()>;

    /// Atomic insert-or-update of one monthly cell, keyed by
    /// (member, year, month)
    async fn upsert_monthly(
        &self,
        member_id: i64,
        year: i32,
        month: u32,
        update: DuesUpdate,
    ) -> Result<()>;

    /// Atomic insert-or-update of the registration row, keyed by member
    async fn upsert_registration(&self, member_id: i64, update: DuesUpdate) -> Result<()>;

    /// All stored monthly cells for a year
    async fn monthly_rows(&self, year: i32) -> Result<Vec<MonthlyCell>>;

    /// The registration row for a member, if present
    async fn registration(&self, member_id: i64) -> Result<Option<RegistrationStatus>>;
}
