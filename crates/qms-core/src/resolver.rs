//! Queue-position resolution.
//!
//! Pure read-only functions computing "current ticket" and "next pending
//! ticket" from store state. The next-pending rule: with a current ticket,
//! take the smallest pending id greater than it; when none remains, wrap
//! back to the largest pending id less than it. The wrap keeps tickets
//! recovered from a skip reachable by original position instead of
//! stranding them behind every newer ticket.

use crate::store::TicketStore;
use crate::ticket::{Ticket, TicketId};

/// The ticket the cursor points at, if any.
#[must_use]
pub fn current_ticket(store: &TicketStore) -> Option<&Ticket> {
    store
        .cursor()
        .current_ticket_id
        .and_then(|id| store.get(id))
}

/// The ticket the queue should serve next, resolved against the cursor.
#[must_use]
pub fn next_pending(store: &TicketStore) -> Option<&Ticket> {
    next_pending_after(store, store.cursor().current_ticket_id)
}

/// The ticket the queue should serve next, resolved against an explicit
/// prior position. `skip` uses this with the just-skipped ticket's id,
/// which is no longer pending but still anchors the ordering.
///
/// Only `Pending` tickets are ever returned.
#[must_use]
pub fn next_pending_after(store: &TicketStore, prior: Option<TicketId>) -> Option<&Ticket> {
    prior.map_or_else(
        || store.scan_pending().next(),
        |prior_id| {
            store
                .scan_pending()
                .find(|t| t.id > prior_id)
                .or_else(|| store.scan_pending().filter(|t| t.id < prior_id).last())
        },
    )
}
