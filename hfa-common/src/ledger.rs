//! Dues ledger domain model and reconciliation engine
//!
//! The ledger holds one row per (member, period), where a period is either
//! the one-time registration fee or a (year, month) pair. Reconciliation is
//! written once against the [`Store`](crate::Store) trait: reads never
//! return the raw stored status of a monthly cell without first applying
//! the poor-family exemption override.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::member::Member;
use crate::store::Store;
use crate::{Error, Result};

/// Months in a dues year
pub const MONTHS_PER_YEAR: u32 = 12;

/// Payment status of a ledger cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuesStatus {
    Paid,
    Pending,
    Exempt,
}

impl DuesStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuesStatus::Paid => "paid",
            DuesStatus::Pending => "pending",
            DuesStatus::Exempt => "exempt",
        }
    }
}

impl fmt::Display for DuesStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuesStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "paid" => Ok(DuesStatus::Paid),
            "pending" => Ok(DuesStatus::Pending),
            "exempt" => Ok(DuesStatus::Exempt),
            other => Err(Error::validation(
                "status",
                format!("unknown status '{}' (expected paid, pending or exempt)", other),
            )),
        }
    }
}

/// Idempotent write payload for a ledger cell. `amount` and `paid_at`
/// overwrite the stored values, including clearing them to null.
#[derive(Debug, Clone)]
pub struct DuesUpdate {
    pub status: DuesStatus,
    pub amount: Option<f64>,
    pub paid_at: Option<String>,
}

/// One stored monthly cell as read back from the store
#[derive(Debug, Clone)]
pub struct MonthlyCell {
    pub member_id: i64,
    pub month: u32,
    pub status: DuesStatus,
    pub amount: Option<f64>,
    pub paid_at: Option<String>,
}

/// Registration row projection (status passthrough, no override)
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationStatus {
    pub status: DuesStatus,
    pub amount: Option<f64>,
    pub paid_at: Option<String>,
}

/// One month cell in the report, carrying the stored status
#[derive(Debug, Clone, Serialize)]
pub struct MonthCell {
    pub month: u32,
    pub status: DuesStatus,
    pub amount: Option<f64>,
    pub paid_at: Option<String>,
}

/// Twelve months of one member's dues
#[derive(Debug, Clone, Serialize)]
pub struct MemberMonths {
    pub member_id: i64,
    pub name: String,
    pub poor: bool,
    pub months: Vec<MonthCell>,
}

/// Per-month aggregate over effective statuses
#[derive(Debug, Clone, Serialize)]
pub struct MonthTotals {
    pub month: u32,
    pub paid: u32,
    pub pending: u32,
    pub exempt: u32,
    pub amount: f64,
}

/// Full monthly tracker for a year
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub members: Vec<MemberMonths>,
    pub totals: Vec<MonthTotals>,
}

/// Per-year totals over stored statuses
#[derive(Debug, Clone, Serialize)]
pub struct YearStats {
    pub year: i32,
    pub total_paid: f64,
    pub total_pending: u32,
    pub total_exempt: u32,
}

/// Apply the poor-family override to a stored status.
///
/// A flagged member's cell reads as exempt unless it was actually paid;
/// the flag can be toggled after rows were seeded, so the stored status
/// may be stale and must never surface as pending for a flagged member.
pub fn effective_status(poor_family: bool, stored: DuesStatus) -> DuesStatus {
    if poor_family && stored != DuesStatus::Paid {
        DuesStatus::Exempt
    } else {
        stored
    }
}

/// Monthly tracker for a year: every member appears with twelve cells
/// (missing rows default to pending), and per-month totals aggregate the
/// effective status of each cell.
pub async fn monthly_report<S: Store + ?Sized>(store: &S, year: i32) -> Result<MonthlyReport> {
    let members = store.list_members().await?;
    let rows = store.monthly_rows(year).await?;
    Ok(build_report(year, &members, rows))
}

/// Pure report assembly; separated from the store round trips for testing
pub fn build_report(year: i32, members: &[Member], rows: Vec<MonthlyCell>) -> MonthlyReport {
    let mut by_member: HashMap<i64, Vec<MonthlyCell>> = HashMap::new();
    for row in rows {
        by_member.entry(row.member_id).or_default().push(row);
    }

    let mut report_members = Vec::with_capacity(members.len());
    for member in members {
        let mut months: Vec<MonthCell> = (1..=MONTHS_PER_YEAR)
            .map(|month| MonthCell {
                month,
                status: DuesStatus::Pending,
                amount: None,
                paid_at: None,
            })
            .collect();
        if let Some(cells) = by_member.get(&member.id) {
            for cell in cells {
                if (1..=MONTHS_PER_YEAR).contains(&cell.month) {
                    months[(cell.month - 1) as usize] = MonthCell {
                        month: cell.month,
                        status: cell.status,
                        amount: cell.amount,
                        paid_at: cell.paid_at.clone(),
                    };
                }
            }
        }
        report_members.push(MemberMonths {
            member_id: member.id,
            name: member.full_name_latin.clone(),
            poor: member.poor_family,
            months,
        });
    }

    let mut totals: Vec<MonthTotals> = (1..=MONTHS_PER_YEAR)
        .map(|month| MonthTotals {
            month,
            paid: 0,
            pending: 0,
            exempt: 0,
            amount: 0.0,
        })
        .collect();
    for member in &report_members {
        for cell in &member.months {
            let totals = &mut totals[(cell.month - 1) as usize];
            match effective_status(member.poor, cell.status) {
                DuesStatus::Paid => {
                    totals.paid += 1;
                    if let Some(amount) = cell.amount {
                        totals.amount += amount;
                    }
                }
                DuesStatus::Pending => totals.pending += 1,
                DuesStatus::Exempt => totals.exempt += 1,
            }
        }
    }

    MonthlyReport {
        year,
        members: report_members,
        totals,
    }
}

/// Registration fee status for one member: a direct passthrough of the
/// stored row. No override is applied here; the registration status is
/// re-derived from the exemption flag at member-update time instead.
pub async fn registration_status<S: Store + ?Sized>(
    store: &S,
    member_id: i64,
) -> Result<RegistrationStatus> {
    store
        .registration(member_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("registration row for member {}", member_id)))
}

/// Per-year totals over the monthly rows.
///
/// Aggregates the stored status, while [`monthly_report`] aggregates the
/// effective status; the two can disagree for flagged members with stale
/// pending rows. Kept divergent; see DESIGN.md.
pub async fn year_stats<S: Store + ?Sized>(store: &S, year: i32) -> Result<YearStats> {
    let rows = store.monthly_rows(year).await?;
    let mut stats = YearStats {
        year,
        total_paid: 0.0,
        total_pending: 0,
        total_exempt: 0,
    };
    for row in &rows {
        match row.status {
            DuesStatus::Paid => stats.total_paid += row.amount.unwrap_or(0.0),
            DuesStatus::Pending => stats.total_pending += 1,
            DuesStatus::Exempt => stats.total_exempt += 1,
        }
    }
    Ok(stats)
}
