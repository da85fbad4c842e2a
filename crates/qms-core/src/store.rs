//! Persistent storage for queue state.
//!
//! The whole queue (tickets, cursor, audit window) lives in one JSON state
//! file, written atomically via a temp file and rename. The lifecycle
//! controller performs each operation's reads and writes in memory and then
//! calls [`TicketStore::commit`] once, so a crash can never persist half of
//! a multi-step transition; a revision counter detects another process
//! racing the same file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{QmsError, Result};
use crate::ticket::{StatusChange, Ticket, TicketId, TicketStatus};

/// Singleton queue cursor record.
///
/// "Currently serving" is defined solely by `current_ticket_id`; tickets
/// carry no serving status of their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueCursor {
    /// Ticket currently being served. `None` = nobody is being served.
    pub current_ticket_id: Option<TicketId>,

    /// Last label number issued by the sequence generator.
    pub last_sequence_value: u64,

    /// Gate on new ticket issuance.
    pub queue_active: bool,
}

impl Default for QueueCursor {
    fn default() -> Self {
        Self {
            current_ticket_id: None,
            last_sequence_value: 0,
            queue_active: true,
        }
    }
}

/// The complete persisted queue state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueState {
    /// All tickets keyed by id. BTreeMap keeps id-ascending iteration.
    pub tickets: BTreeMap<TicketId, Ticket>,

    /// The cursor singleton.
    pub cursor: QueueCursor,

    /// Next ticket id to assign. Survives deletion; ids are never reused.
    pub next_ticket_id: TicketId,

    /// Recent status transitions, oldest first, bounded by config.
    pub audit: Vec<StatusChange>,

    /// Bumped on every commit; guards against concurrent writers.
    pub revision: u64,
}

impl Default for QueueState {
    fn default() -> Self {
        Self {
            tickets: BTreeMap::new(),
            cursor: QueueCursor::default(),
            next_ticket_id: 1,
            audit: Vec::new(),
            revision: 0,
        }
    }
}

/// File backend for queue state.
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    /// Create a storage instance rooted at `data_dir`.
    #[must_use]
    pub const fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Get the default storage location.
    ///
    /// On Linux deployments: `/var/lib/qms/`.
    /// Elsewhere: the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no data directory can be determined.
    pub fn default_location() -> Result<Self> {
        #[cfg(target_os = "linux")]
        {
            Ok(Self::new(PathBuf::from("/var/lib/qms")))
        }
        #[cfg(not(target_os = "linux"))]
        {
            let dirs = directories::ProjectDirs::from("", "", "qms")
                .ok_or_else(|| QmsError::Storage("Cannot determine data directory".into()))?;
            Ok(Self::new(dirs.data_dir().to_path_buf()))
        }
    }

    /// Load the persisted state, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file exists but cannot be read or
    /// parsed.
    pub fn load(&self) -> Result<Option<QueueState>> {
        let path = self.state_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let state: QueueState = serde_json::from_str(&content)?;
            Ok(Some(state))
        } else {
            Ok(None)
        }
    }

    /// Persist `state` atomically: write a temp file, then rename over the
    /// state file so readers never observe a partial write.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized or written.
    pub fn save(&self, state: &QueueState) -> Result<()> {
        let path = self.state_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(state)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn state_path(&self) -> PathBuf {
        self.data_dir.join("queue.json")
    }
}

/// Durable collection of tickets plus the queue cursor.
///
/// All reads operate on the in-memory state; mutations become durable only
/// at [`TicketStore::commit`]. A failed commit reloads from disk so no
/// partial mutation survives.
#[derive(Debug)]
pub struct TicketStore {
    storage: Storage,
    state: QueueState,
    audit_retention: usize,
}

impl TicketStore {
    /// Open the store, loading persisted state or starting fresh.
    ///
    /// # Errors
    ///
    /// Returns an error if existing state cannot be read.
    pub fn open(storage: Storage, audit_retention: usize) -> Result<Self> {
        let state = storage.load()?.unwrap_or_default();
        Ok(Self {
            storage,
            state,
            audit_retention,
        })
    }

    /// Insert a new ticket and return its id.
    ///
    /// The caller builds the ticket with [`TicketStore::next_id`]; ids are
    /// assigned strictly increasing and never reused.
    pub fn create(&mut self, ticket: Ticket) -> TicketId {
        let id = ticket.id;
        self.state.tickets.insert(id, ticket);
        id
    }

    /// Reserve the next ticket id.
    pub fn next_id(&mut self) -> TicketId {
        let id = self.state.next_ticket_id;
        self.state.next_ticket_id += 1;
        id
    }

    /// Fetch a ticket by id.
    #[must_use]
    pub fn get(&self, id: TicketId) -> Option<&Ticket> {
        self.state.tickets.get(&id)
    }

    /// Replace a ticket record wholesale (last write wins).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no ticket with that id exists.
    pub fn update(&mut self, ticket: Ticket) -> Result<()> {
        match self.state.tickets.get_mut(&ticket.id) {
            Some(slot) => {
                *slot = ticket;
                Ok(())
            }
            None => Err(QmsError::NotFound(ticket.id)),
        }
    }

    /// Remove a ticket, returning it if present.
    pub fn remove(&mut self, id: TicketId) -> Option<Ticket> {
        self.state.tickets.remove(&id)
    }

    /// All pending tickets, id ascending.
    pub fn scan_pending(&self) -> impl Iterator<Item = &Ticket> {
        self.state
            .tickets
            .values()
            .filter(|t| t.status == TicketStatus::Pending)
    }

    /// Most recent tickets with `status`, ordered by the status's relevant
    /// timestamp descending (skipped: last skip; served: served-at;
    /// pending: creation).
    #[must_use]
    pub fn scan_recent_by_status(&self, status: TicketStatus, limit: usize) -> Vec<&Ticket> {
        let mut matches: Vec<&Ticket> = self
            .state
            .tickets
            .values()
            .filter(|t| t.status == status)
            .collect();
        matches.sort_by_key(|t| {
            let ts = match status {
                TicketStatus::Skipped => t.last_skipped_at,
                TicketStatus::Served => t.served_at,
                TicketStatus::Pending => Some(t.created_at),
            };
            std::cmp::Reverse((ts.unwrap_or(t.created_at), t.id))
        });
        matches.truncate(limit);
        matches
    }

    /// All tickets, id ascending.
    pub fn scan_all(&self) -> impl Iterator<Item = &Ticket> {
        self.state.tickets.values()
    }

    /// Read access to the cursor singleton.
    #[must_use]
    pub const fn cursor(&self) -> &QueueCursor {
        &self.state.cursor
    }

    /// Write access to the cursor singleton.
    pub fn cursor_mut(&mut self) -> &mut QueueCursor {
        &mut self.state.cursor
    }

    /// Append a status-change audit entry, dropping the oldest entries
    /// beyond the retention window.
    pub fn record_status_change(&mut self, change: StatusChange) {
        self.state.audit.push(change);
        if self.state.audit.len() > self.audit_retention {
            let excess = self.state.audit.len() - self.audit_retention;
            self.state.audit.drain(..excess);
        }
    }

    /// Most recent status changes, newest first.
    #[must_use]
    pub fn recent_status_changes(&self, limit: usize) -> Vec<&StatusChange> {
        self.state.audit.iter().rev().take(limit).collect()
    }

    /// Delete all tickets and reset the cursor, sequence counter, id
    /// counter, and audit window. Durable only after the next commit.
    pub fn purge(&mut self) -> usize {
        let removed = self.state.tickets.len();
        let revision = self.state.revision;
        self.state = QueueState {
            revision,
            ..QueueState::default()
        };
        removed
    }

    /// Commit the in-memory state as one durable unit.
    ///
    /// Verifies the on-disk revision still matches the revision this store
    /// loaded, bumps it, and atomically replaces the state file. On any
    /// failure the in-memory state is reloaded from disk, so a failed
    /// operation leaves nothing behind.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrentModification` if another writer committed since
    /// this store last loaded, or the underlying storage error.
    pub fn commit(&mut self) -> Result<()> {
        match self.storage.load() {
            Ok(Some(on_disk)) if on_disk.revision != self.state.revision => {
                let found = on_disk.revision;
                let expected = self.state.revision;
                self.state = on_disk;
                return Err(QmsError::ConcurrentModification { expected, found });
            }
            Ok(_) => {}
            Err(err) => {
                tracing::error!(error = %err, "failed to verify queue state revision");
                return Err(err);
            }
        }

        self.state.revision += 1;
        if let Err(err) = self.storage.save(&self.state) {
            tracing::error!(error = %err, "commit failed, reloading persisted state");
            self.state = self.storage.load()?.unwrap_or_default();
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ticket(id: TicketId, status: TicketStatus) -> Ticket {
        let created = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap()
            + chrono::Duration::minutes(id as i64);
        let mut t = Ticket::new(
            id,
            format!("T{id:03}"),
            "visit".into(),
            None,
            None,
            created,
        );
        t.status = status;
        t
    }

    fn open_store(dir: &tempfile::TempDir) -> TicketStore {
        TicketStore::open(Storage::new(dir.path().to_path_buf()), 10).unwrap()
    }

    #[test]
    fn test_ids_are_strictly_increasing_and_survive_deletion() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);

        let a = store.next_id();
        let b = store.next_id();
        assert!(b > a);

        store.create(ticket(a, TicketStatus::Pending));
        store.remove(a);
        let c = store.next_id();
        assert!(c > b, "deleted ids must never be reassigned");
    }

    #[test]
    fn test_scan_pending_is_id_ascending() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        for id in [3, 1, 2] {
            store.create(ticket(id, TicketStatus::Pending));
        }
        store.create(ticket(4, TicketStatus::Served));

        let ids: Vec<TicketId> = store.scan_pending().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_scan_recent_by_status_orders_by_timestamp_desc() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);

        let base = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
        for (id, minutes) in [(1, 5), (2, 20), (3, 10)] {
            let mut t = ticket(id, TicketStatus::Skipped);
            t.last_skipped_at = Some(base + chrono::Duration::minutes(minutes));
            store.create(t);
        }

        let ids: Vec<TicketId> = store
            .scan_recent_by_status(TicketStatus::Skipped, 2)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_update_missing_ticket_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        let err = store.update(ticket(99, TicketStatus::Pending)).unwrap_err();
        assert!(matches!(err, QmsError::NotFound(99)));
    }

    #[test]
    fn test_commit_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = open_store(&dir);
            let id = store.next_id();
            store.create(ticket(id, TicketStatus::Pending));
            store.cursor_mut().last_sequence_value = 7;
            store.commit().unwrap();
        }

        let store = open_store(&dir);
        assert_eq!(store.scan_all().count(), 1);
        assert_eq!(store.cursor().last_sequence_value, 7);
        assert_eq!(store.get(1).unwrap().label, "T001");
    }

    #[test]
    fn test_commit_detects_concurrent_writer() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = open_store(&dir);
        let next_id = first.next_id();
        first.create(ticket(next_id, TicketStatus::Pending));
        first.commit().unwrap();

        let mut second = open_store(&dir);

        // first commits again; second is now stale
        let next_id = first.next_id();
        first.create(ticket(next_id, TicketStatus::Pending));
        first.commit().unwrap();

        second.create(ticket(77, TicketStatus::Pending));
        let err = second.commit().unwrap_err();
        assert!(matches!(err, QmsError::ConcurrentModification { .. }));
        // stale mutation was discarded in favor of the persisted state
        assert!(second.get(77).is_none());
        assert_eq!(second.scan_all().count(), 2);
    }

    #[test]
    fn test_purge_resets_everything_but_keeps_revision() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        for _ in 0..3 {
            let id = store.next_id();
            store.create(ticket(id, TicketStatus::Pending));
        }
        store.cursor_mut().current_ticket_id = Some(1);
        store.cursor_mut().last_sequence_value = 3;
        store.commit().unwrap();

        assert_eq!(store.purge(), 3);
        store.commit().unwrap();

        assert_eq!(store.scan_all().count(), 0);
        assert_eq!(store.cursor().current_ticket_id, None);
        assert_eq!(store.cursor().last_sequence_value, 0);
        assert_eq!(store.next_id(), 1);
    }

    #[test]
    fn test_audit_window_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();
        for i in 0..15 {
            store.record_status_change(StatusChange {
                ticket_id: i,
                from: TicketStatus::Pending,
                to: TicketStatus::Served,
                at,
                staff_id: None,
            });
        }
        assert_eq!(store.recent_status_changes(100).len(), 10);
        // newest first
        assert_eq!(store.recent_status_changes(1)[0].ticket_id, 14);
    }
}
