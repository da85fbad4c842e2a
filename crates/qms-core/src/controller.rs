//! Lifecycle orchestration for the ticket queue.
//!
//! The controller owns the store, sequence generator, clock, and change
//! notifier, and is the only component that mutates queue state. Every
//! operation runs its reads and writes against the in-memory state and
//! commits once; the snapshot is published to observers only after the
//! commit succeeds, so observers never see state that failed to persist.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::clock::{elapsed_seconds, Clock};
use crate::config::QueueConfig;
use crate::error::{QmsError, Result};
use crate::notifier::{ChangeNotifier, SubscriberId};
use crate::resolver;
use crate::sequence::SequenceGenerator;
use crate::store::TicketStore;
use crate::ticket::{
    is_valid_phone_number, StatusChange, Ticket, TicketId, TicketStatus, MAX_REASON_LENGTH,
};
use crate::types::{Caller, QueueSnapshot};

/// Default cap applied to ticket listings when the caller gives none.
const DEFAULT_LIST_LIMIT: usize = 50;

/// Intake fields captured when a customer takes a number.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    /// Why the customer is visiting. Required.
    pub visit_reason: String,

    /// Customer name, if offered.
    pub customer_name: Option<String>,

    /// Contact phone number, if offered.
    pub phone_number: Option<String>,
}

/// Result of an operation that moves the queue forward.
#[derive(Debug, Clone)]
pub struct AdvanceOutcome {
    /// The ticket that stopped being current (finalized or skipped), if any.
    pub previous: Option<Ticket>,

    /// The new current ticket. `None` means the queue drained.
    pub current: Option<Ticket>,
}

/// Orchestrates all ticket state transitions.
pub struct QueueController {
    store: TicketStore,
    sequence: SequenceGenerator,
    clock: Clock,
    notifier: ChangeNotifier,
    skipped_display_limit: usize,
}

impl QueueController {
    /// Build a controller over an opened store.
    #[must_use]
    pub fn new(store: TicketStore, clock: Clock, queue_config: &QueueConfig) -> Self {
        Self {
            store,
            sequence: SequenceGenerator::new(queue_config),
            clock,
            notifier: ChangeNotifier::new(),
            skipped_display_limit: queue_config.skipped_display_limit,
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Point-in-time view of the queue. Also the notifier payload.
    #[must_use]
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            current: resolver::current_ticket(&self.store).cloned(),
            next: resolver::next_pending(&self.store).cloned(),
            recently_skipped: self
                .store
                .scan_recent_by_status(TicketStatus::Skipped, self.skipped_display_limit)
                .into_iter()
                .cloned()
                .collect(),
            queue_active: self.store.cursor().queue_active,
        }
    }

    /// Fetch one ticket.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub fn get_ticket(&self, id: TicketId) -> Result<Ticket> {
        self.store
            .get(id)
            .cloned()
            .ok_or(QmsError::NotFound(id))
    }

    /// List tickets for export/report collaborators.
    ///
    /// With a status filter, tickets come back ordered by that status's
    /// relevant timestamp, newest first; without one, newest ids first.
    #[must_use]
    pub fn list_tickets(
        &self,
        status: Option<TicketStatus>,
        limit: Option<usize>,
    ) -> Vec<Ticket> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        match status {
            Some(status) => self
                .store
                .scan_recent_by_status(status, limit)
                .into_iter()
                .cloned()
                .collect(),
            None => {
                let mut all: Vec<Ticket> = self.store.scan_all().cloned().collect();
                all.reverse();
                all.truncate(limit);
                all
            }
        }
    }

    /// Recent status transitions, newest first.
    #[must_use]
    pub fn recent_status_changes(&self, limit: usize) -> Vec<StatusChange> {
        self.store
            .recent_status_changes(limit)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Register a queue observer. The returned channel is primed with the
    /// current snapshot.
    pub fn subscribe(&mut self) -> (SubscriberId, mpsc::Receiver<QueueSnapshot>) {
        let initial = self.snapshot();
        self.notifier.subscribe(initial)
    }

    /// Remove a queue observer.
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.notifier.unsubscribe(id);
    }

    // =========================================================================
    // LIFECYCLE OPERATIONS
    // =========================================================================

    /// Issue a new ticket at the back of the queue.
    ///
    /// # Errors
    ///
    /// Returns `QueuePaused` while issuance is gated off, or a validation
    /// error for unusable intake fields.
    pub fn issue_ticket(&mut self, request: IssueRequest) -> Result<Ticket> {
        if !self.store.cursor().queue_active {
            return Err(QmsError::QueuePaused);
        }
        let visit_reason = request.visit_reason.trim().to_string();
        if visit_reason.is_empty() {
            return Err(QmsError::EmptyReason);
        }
        if visit_reason.len() > MAX_REASON_LENGTH {
            return Err(QmsError::ReasonTooLong {
                max: MAX_REASON_LENGTH,
                actual: visit_reason.len(),
            });
        }
        if let Some(phone) = request.phone_number.as_deref() {
            if !is_valid_phone_number(phone) {
                return Err(QmsError::InvalidPhoneNumber(phone.to_string()));
            }
        }

        let now = self.clock.now_utc();
        let id = self.store.next_id();
        let label = self.sequence.next_label(self.store.cursor_mut());
        let ticket = Ticket::new(
            id,
            label,
            visit_reason,
            request.customer_name,
            request.phone_number,
            now,
        );
        self.store.create(ticket.clone());
        self.commit_and_publish()?;

        tracing::info!(id, label = %ticket.label, "ticket issued");
        Ok(ticket)
    }

    /// Finalize the current ticket (if any) and advance to the next
    /// pending one.
    ///
    /// A drained queue after finalization is a success with
    /// `current: None`, surfaced as a notice by transports.
    ///
    /// # Errors
    ///
    /// Returns `NoPendingTickets` when there is neither a current nor a
    /// pending ticket, so the call had nothing to do.
    pub fn call_next(&mut self, caller: &Caller) -> Result<AdvanceOutcome> {
        require_staff(caller)?;
        let next = resolver::next_pending(&self.store).cloned();
        if next.is_none() && resolver::current_ticket(&self.store).is_none() {
            return Err(QmsError::NoPendingTickets);
        }

        let now = self.clock.now_utc();
        let previous = self.finalize_current(now, caller)?;
        self.store.cursor_mut().current_ticket_id = next.as_ref().map(|t| t.id);
        self.commit_and_publish()?;

        match &next {
            Some(t) => tracing::info!(id = t.id, label = %t.label, "queue advanced"),
            None => tracing::info!("queue drained"),
        }
        Ok(AdvanceOutcome {
            previous,
            current: next,
        })
    }

    /// Re-announce the current ticket.
    ///
    /// # Errors
    ///
    /// Returns `NoCurrentTicket` when nobody is being served.
    pub fn recall(&mut self, caller: &Caller) -> Result<Ticket> {
        require_staff(caller)?;
        let mut ticket = resolver::current_ticket(&self.store)
            .cloned()
            .ok_or(QmsError::NoCurrentTicket)?;

        ticket.recall_count += 1;
        ticket.last_recalled_at = Some(self.clock.now_utc());
        self.store.update(ticket.clone())?;
        self.commit_and_publish()?;

        tracing::info!(id = ticket.id, label = %ticket.label, count = ticket.recall_count, "ticket recalled");
        Ok(ticket)
    }

    /// Bypass the current ticket and advance.
    ///
    /// The next ticket is resolved against the skipped ticket as the prior
    /// current, so the ordering anchor survives the status change.
    ///
    /// # Errors
    ///
    /// Returns `NoCurrentTicket` when nobody is being served.
    pub fn skip(&mut self, caller: &Caller) -> Result<AdvanceOutcome> {
        require_staff(caller)?;
        let mut ticket = resolver::current_ticket(&self.store)
            .cloned()
            .ok_or(QmsError::NoCurrentTicket)?;

        let now = self.clock.now_utc();
        let from = ticket.status;
        ticket.previous_status = Some(from);
        ticket.status = TicketStatus::Skipped;
        ticket.skip_count += 1;
        ticket.last_skipped_at = Some(now);
        self.store.update(ticket.clone())?;
        self.record_transition(&ticket, from, TicketStatus::Skipped, caller);

        let next = resolver::next_pending_after(&self.store, Some(ticket.id)).cloned();
        self.store.cursor_mut().current_ticket_id = next.as_ref().map(|t| t.id);
        self.commit_and_publish()?;

        tracing::info!(id = ticket.id, label = %ticket.label, "ticket skipped");
        Ok(AdvanceOutcome {
            previous: Some(ticket),
            current: next,
        })
    }

    /// Serve a specific ticket out of order, finalizing any current one.
    ///
    /// Serving a skipped ticket records its recovery time and an audit
    /// entry. Serving the ticket that is already current is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id or `InvalidStatus` if the
    /// ticket was already served.
    pub fn serve_specific(&mut self, caller: &Caller, id: TicketId) -> Result<Ticket> {
        require_staff(caller)?;
        let mut ticket = self.store.get(id).cloned().ok_or(QmsError::NotFound(id))?;
        if self.store.cursor().current_ticket_id == Some(id) {
            return Ok(ticket);
        }
        if ticket.status == TicketStatus::Served {
            return Err(QmsError::InvalidStatus {
                id,
                status: ticket.status,
            });
        }

        let now = self.clock.now_utc();
        if ticket.status == TicketStatus::Skipped {
            let skipped_at = ticket.last_skipped_at.unwrap_or(ticket.created_at);
            ticket.recovery_time_secs = Some(elapsed_seconds(skipped_at, now));
            ticket.status = TicketStatus::Pending;
            self.store.update(ticket.clone())?;
            self.record_transition(&ticket, TicketStatus::Skipped, TicketStatus::Pending, caller);
        }

        self.finalize_current(now, caller)?;
        self.store.cursor_mut().current_ticket_id = Some(id);
        self.commit_and_publish()?;

        tracing::info!(id, label = %ticket.label, "serving specific ticket");
        Ok(ticket)
    }

    /// Finalize the current ticket without advancing the queue.
    ///
    /// # Errors
    ///
    /// Returns `NoCurrentTicket` when nobody is being served.
    pub fn mark_current_served(&mut self, caller: &Caller) -> Result<Ticket> {
        require_staff(caller)?;
        let now = self.clock.now_utc();
        let served = self
            .finalize_current(now, caller)?
            .ok_or(QmsError::NoCurrentTicket)?;
        self.store.cursor_mut().current_ticket_id = None;
        self.commit_and_publish()?;

        tracing::info!(id = served.id, label = %served.label, "ticket served");
        Ok(served)
    }

    /// Force a ticket back to `Pending` (admin override).
    ///
    /// Service stamps are cleared so a re-served ticket gets fresh timings.
    /// Reverting the current ticket clears the cursor and re-resolves.
    /// Already-pending, non-current tickets are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub fn revert(&mut self, caller: &Caller, id: TicketId) -> Result<Ticket> {
        require_admin(caller)?;
        let ticket = self.store.get(id).cloned().ok_or(QmsError::NotFound(id))?;
        let was_current = self.store.cursor().current_ticket_id == Some(id);
        if ticket.status == TicketStatus::Pending && !was_current {
            return Ok(ticket);
        }

        if ticket.status != TicketStatus::Pending {
            let mut t = ticket;
            let from = t.status;
            t.status = TicketStatus::Pending;
            t.served_at = None;
            t.completed_at = None;
            t.service_duration_secs = None;
            t.assigned_staff_id = None;
            self.store.update(t.clone())?;
            self.record_transition(&t, from, TicketStatus::Pending, caller);
        }
        if was_current {
            self.store.cursor_mut().current_ticket_id = None;
            let next = resolver::next_pending(&self.store).map(|t| t.id);
            self.store.cursor_mut().current_ticket_id = next;
        }
        self.commit_and_publish()?;

        let reverted = self.get_ticket(id)?;
        tracing::info!(id, label = %reverted.label, "ticket reverted to pending");
        Ok(reverted)
    }

    /// Return a skipped ticket to the pending pool, recording how long it
    /// sat parked.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id or `InvalidStatus` unless the
    /// ticket is `Skipped`.
    pub fn recover(&mut self, caller: &Caller, id: TicketId) -> Result<Ticket> {
        require_staff(caller)?;
        let mut ticket = self.store.get(id).cloned().ok_or(QmsError::NotFound(id))?;
        if ticket.status != TicketStatus::Skipped {
            return Err(QmsError::InvalidStatus {
                id,
                status: ticket.status,
            });
        }

        let now = self.clock.now_utc();
        let skipped_at = ticket.last_skipped_at.unwrap_or(ticket.created_at);
        ticket.recovery_time_secs = Some(elapsed_seconds(skipped_at, now));
        ticket.status = TicketStatus::Pending;
        self.store.update(ticket.clone())?;
        self.record_transition(&ticket, TicketStatus::Skipped, TicketStatus::Pending, caller);
        self.commit_and_publish()?;

        tracing::info!(id, label = %ticket.label, recovery_secs = ticket.recovery_time_secs, "ticket recovered");
        Ok(ticket)
    }

    /// Delete a pending, non-current ticket.
    ///
    /// The "next pending" position is derived by the resolver, so removal
    /// needs no cursor fixup.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id or `InvalidStatus` for a
    /// non-pending or currently served ticket.
    pub fn delete_ticket(&mut self, caller: &Caller, id: TicketId) -> Result<()> {
        require_admin(caller)?;
        let ticket = self.store.get(id).cloned().ok_or(QmsError::NotFound(id))?;
        if ticket.status != TicketStatus::Pending
            || self.store.cursor().current_ticket_id == Some(id)
        {
            return Err(QmsError::InvalidStatus {
                id,
                status: ticket.status,
            });
        }

        self.store.remove(id);
        self.commit_and_publish()?;

        tracing::info!(id, label = %ticket.label, "ticket deleted");
        Ok(())
    }

    /// Flip the issuance gate. Returns the new state.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` without the admin capability.
    pub fn toggle_queue_active(&mut self, caller: &Caller) -> Result<bool> {
        require_admin(caller)?;
        let cursor = self.store.cursor_mut();
        cursor.queue_active = !cursor.queue_active;
        let active = cursor.queue_active;
        self.commit_and_publish()?;

        tracing::info!(active, "queue issuance toggled");
        Ok(active)
    }

    /// Restart ticket labels at 1. Existing tickets are unaffected.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` without the admin capability.
    pub fn reset_sequence(&mut self, caller: &Caller) -> Result<()> {
        require_admin(caller)?;
        self.sequence.reset(self.store.cursor_mut());
        self.commit_and_publish()?;

        tracing::info!("label sequence reset");
        Ok(())
    }

    /// Delete every ticket and reset the sequence generator and cursor in
    /// one durable unit. Returns how many tickets were removed.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` without the admin capability.
    pub fn purge(&mut self, caller: &Caller) -> Result<usize> {
        require_admin(caller)?;
        let removed = self.store.purge();
        self.commit_and_publish()?;

        tracing::warn!(removed, "queue purged");
        Ok(removed)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Mark the current ticket `Served`, stamping `served_at`,
    /// `completed_at`, and `service_duration_secs`, and attributing the
    /// staff member. Returns the finalized ticket, or `None` if nobody was
    /// being served.
    fn finalize_current(&mut self, now: DateTime<Utc>, caller: &Caller) -> Result<Option<Ticket>> {
        let Some(mut ticket) = resolver::current_ticket(&self.store).cloned() else {
            return Ok(None);
        };

        let from = ticket.status;
        ticket.status = TicketStatus::Served;
        ticket.served_at = Some(now);
        ticket.completed_at = Some(now);
        ticket.service_duration_secs = Some(elapsed_seconds(ticket.created_at, now));
        if let Some(staff_id) = caller.staff_id.as_deref() {
            ticket.assigned_staff_id = Some(staff_id.to_string());
        }
        self.store.update(ticket.clone())?;
        self.record_transition(&ticket, from, TicketStatus::Served, caller);
        Ok(Some(ticket))
    }

    fn record_transition(
        &mut self,
        ticket: &Ticket,
        from: TicketStatus,
        to: TicketStatus,
        caller: &Caller,
    ) {
        self.store.record_status_change(StatusChange {
            ticket_id: ticket.id,
            from,
            to,
            at: self.clock.now_utc(),
            staff_id: caller.staff_id.clone(),
        });
    }

    fn commit_and_publish(&mut self) -> Result<()> {
        self.store.commit()?;
        let snapshot = self.snapshot();
        self.notifier.publish(&snapshot);
        Ok(())
    }
}

fn require_staff(caller: &Caller) -> Result<()> {
    if caller.is_staff() {
        Ok(())
    } else {
        Err(QmsError::Unauthorized { required: "staff" })
    }
}

fn require_admin(caller: &Caller) -> Result<()> {
    if caller.is_admin {
        Ok(())
    } else {
        Err(QmsError::Unauthorized { required: "admin" })
    }
}
