//! # qms-core
//!
//! Core business logic for QMS, a single-queue ticket dispatch system for
//! walk-in customer service desks.
//!
//! This crate provides:
//! - The ticket lifecycle state machine (issue, call, recall, skip,
//!   recover, revert, serve)
//! - Queue-position resolution, including the wrap-back rule for recovered
//!   tickets
//! - Durable queue state with an atomic commit boundary
//! - Change notification for queue observers
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`clock`] - Configured-offset time source and elapsed-time arithmetic
//! - [`config`] - Application configuration loading, saving, and validation
//! - [`controller`] - Lifecycle orchestration; the only writer of queue state
//! - [`error`] - Unified error types for the crate
//! - [`notifier`] - Snapshot publication to interested observers
//! - [`resolver`] - Pure current/next ticket resolution
//! - [`sequence`] - Display-facing label generation
//! - [`store`] - Persistent ticket store and queue cursor
//! - [`ticket`] - Ticket model and timing derivations
//! - [`types`] - Shared types (queue snapshot, caller identity)

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod notifier;
pub mod resolver;
pub mod sequence;
pub mod store;
pub mod ticket;
pub mod types;

// Re-export primary types for convenience
pub use clock::{elapsed_seconds, Clock};
pub use config::{is_valid_label_prefix, ClockConfig, QmsConfig, QueueConfig, ServerConfig};
pub use controller::{AdvanceOutcome, IssueRequest, QueueController};
pub use error::{QmsError, Result};
pub use notifier::{ChangeNotifier, SubscriberId};
pub use sequence::SequenceGenerator;
pub use store::{QueueCursor, QueueState, Storage, TicketStore};
pub use ticket::{
    is_valid_phone_number, StatusChange, Ticket, TicketId, TicketStatus, MAX_REASON_LENGTH,
};
pub use types::{Caller, QueueSnapshot};
