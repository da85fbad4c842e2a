//! Shared types used across the queue core and its transports.

use serde::{Deserialize, Serialize};

use crate::ticket::Ticket;

/// Point-in-time view of the queue.
///
/// This is the exact payload the change notifier publishes after every
/// mutating operation, and what `GET /api/queue` returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Ticket currently being served, if any.
    pub current: Option<Ticket>,

    /// Ticket the resolver would pick next, if any.
    pub next: Option<Ticket>,

    /// Recently skipped tickets, most recent first.
    pub recently_skipped: Vec<Ticket>,

    /// Whether new tickets may be issued.
    pub queue_active: bool,
}

/// Identity and capability of the caller invoking an operation.
///
/// Authentication and role checks happen in an external collaborator; the
/// core only receives the outcome as a capability flag plus an identity for
/// staff attribution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    /// Identity of the staff member, when authenticated.
    pub staff_id: Option<String>,

    /// Whether the caller holds the admin capability.
    pub is_admin: bool,
}

impl Caller {
    /// An unauthenticated caller (customer-facing kiosk).
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            staff_id: None,
            is_admin: false,
        }
    }

    /// An authenticated staff member without admin capability.
    #[must_use]
    pub fn staff(staff_id: impl Into<String>) -> Self {
        Self {
            staff_id: Some(staff_id.into()),
            is_admin: false,
        }
    }

    /// An authenticated staff member with admin capability.
    #[must_use]
    pub fn admin(staff_id: impl Into<String>) -> Self {
        Self {
            staff_id: Some(staff_id.into()),
            is_admin: true,
        }
    }

    /// Whether the caller is an identified staff member (admins included).
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        self.staff_id.is_some() || self.is_admin
    }
}
