//! Ticket model and per-ticket timing arithmetic.
//!
//! A ticket is one customer's queue entry. Its stored status is only ever
//! `Pending`, `Served`, or `Skipped`; "currently serving" is defined by the
//! queue cursor pointing at the ticket, never by a stored field, so there is
//! exactly one source of truth for who is being served.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Ticket identifier. Strictly increasing with creation order, never reused.
pub type TicketId = u64;

/// Maximum length of the visit reason captured at issuance.
pub const MAX_REASON_LENGTH: usize = 200;

static PHONE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-]{5,18}[0-9]$").expect("valid phone regex"));

/// Returns `true` if `value` looks like a contact phone number.
///
/// Accepts 7-20 characters: digits with optional leading `+` and `-`, `()`,
/// or space separators.
#[must_use]
pub fn is_valid_phone_number(value: &str) -> bool {
    PHONE_NUMBER.is_match(value)
}

/// Stored lifecycle status of a ticket.
///
/// There is deliberately no `Serving` value: the currently served ticket is
/// the one the [`QueueCursor`](crate::store::QueueCursor) points at, while
/// its stored status remains `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    /// Waiting to be served (including while current).
    Pending,
    /// Finalized. Terminal except for an explicit revert.
    Served,
    /// Bypassed by staff; still selectable by recovery and serve-specific.
    Skipped,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Served => "SERVED",
            Self::Skipped => "SKIPPED",
        };
        f.write_str(s)
    }
}

/// One customer's queue entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique, strictly increasing id. All next/previous comparisons use
    /// this, not `created_at`, to avoid clock-skew ambiguity.
    pub id: TicketId,

    /// Human-facing ticket number (e.g. "T007").
    pub label: String,

    /// Why the customer is visiting.
    pub visit_reason: String,

    /// Customer name, if given at the desk.
    pub customer_name: Option<String>,

    /// Contact phone number, if given.
    pub phone_number: Option<String>,

    /// Stored lifecycle status.
    pub status: TicketStatus,

    /// When the ticket was issued.
    pub created_at: DateTime<Utc>,

    /// When the ticket was finalized as served.
    pub served_at: Option<DateTime<Utc>>,

    /// When service completed. Stamped together with `served_at`.
    pub completed_at: Option<DateTime<Utc>>,

    /// Times staff re-announced this ticket while current.
    pub recall_count: u32,

    /// Most recent re-announcement.
    pub last_recalled_at: Option<DateTime<Utc>>,

    /// Times this ticket was bypassed.
    pub skip_count: u32,

    /// Most recent bypass.
    pub last_skipped_at: Option<DateTime<Utc>>,

    /// Status held immediately before the most recent skip.
    pub previous_status: Option<TicketStatus>,

    /// Seconds between the most recent skip and the ticket next being
    /// served or explicitly recovered. Clamped at zero.
    pub recovery_time_secs: Option<i64>,

    /// Seconds between `created_at` and `served_at`. Clamped at zero.
    pub service_duration_secs: Option<i64>,

    /// Staff member who most recently served this ticket.
    pub assigned_staff_id: Option<String>,
}

impl Ticket {
    /// Create a fresh `Pending` ticket.
    #[must_use]
    pub fn new(
        id: TicketId,
        label: String,
        visit_reason: String,
        customer_name: Option<String>,
        phone_number: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            label,
            visit_reason,
            customer_name,
            phone_number,
            status: TicketStatus::Pending,
            created_at,
            served_at: None,
            completed_at: None,
            recall_count: 0,
            last_recalled_at: None,
            skip_count: 0,
            last_skipped_at: None,
            previous_status: None,
            recovery_time_secs: None,
            service_duration_secs: None,
            assigned_staff_id: None,
        }
    }

    /// Derived waiting time in whole minutes:
    /// `(served_at - created_at) - recovery_time_secs`, floored at zero.
    ///
    /// Time spent parked in `Skipped` is excluded from waiting metrics.
    /// `None` if the ticket was never served.
    #[must_use]
    pub fn waiting_time_minutes(&self) -> Option<i64> {
        let served_at = self.served_at?;
        let waited = (served_at - self.created_at).num_seconds()
            - self.recovery_time_secs.unwrap_or(0);
        Some(waited.max(0) / 60)
    }
}

/// Audit entry recording one status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    /// Ticket that transitioned.
    pub ticket_id: TicketId,

    /// Status before the transition.
    pub from: TicketStatus,

    /// Status after the transition.
    pub to: TicketStatus,

    /// When the transition happened.
    pub at: DateTime<Utc>,

    /// Staff member who performed the operation, when identified.
    pub staff_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ticket_at(created: DateTime<Utc>) -> Ticket {
        Ticket::new(1, "T001".into(), "renewal".into(), None, None, created)
    }

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_new_ticket_defaults() {
        let t = ticket_at(instant());
        assert_eq!(t.status, TicketStatus::Pending);
        assert_eq!(t.recall_count, 0);
        assert_eq!(t.skip_count, 0);
        assert!(t.served_at.is_none());
        assert!(t.waiting_time_minutes().is_none());
    }

    #[test]
    fn test_waiting_time_subtracts_recovery() {
        let mut t = ticket_at(instant());
        t.served_at = Some(instant() + Duration::minutes(10));
        t.recovery_time_secs = Some(4 * 60);
        assert_eq!(t.waiting_time_minutes(), Some(6));
    }

    #[test]
    fn test_waiting_time_floors_at_zero() {
        let mut t = ticket_at(instant());
        t.served_at = Some(instant() + Duration::minutes(2));
        t.recovery_time_secs = Some(10 * 60); // parked longer than total wait
        assert_eq!(t.waiting_time_minutes(), Some(0));
    }

    #[test]
    fn test_waiting_time_without_recovery() {
        let mut t = ticket_at(instant());
        t.served_at = Some(instant() + Duration::seconds(125));
        assert_eq!(t.waiting_time_minutes(), Some(2));
    }

    #[test]
    fn test_status_serde_uses_screaming_case() {
        let json = serde_json::to_string(&TicketStatus::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
        let parsed: TicketStatus = serde_json::from_str("\"SKIPPED\"").unwrap();
        assert_eq!(parsed, TicketStatus::Skipped);
    }

    #[test]
    fn test_phone_number_validation() {
        assert!(is_valid_phone_number("5551234567"));
        assert!(is_valid_phone_number("+1 (555) 123-4567"));
        assert!(is_valid_phone_number("020 7946 0958"));

        assert!(!is_valid_phone_number(""));
        assert!(!is_valid_phone_number("12345"));
        assert!(!is_valid_phone_number("not-a-number"));
        assert!(!is_valid_phone_number("+"));
    }
}
