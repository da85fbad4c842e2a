//! Unified error types for the QMS core library.
//!
//! This module provides a unified error type [`QmsError`] that covers all
//! failure modes across the queue system: lifecycle preconditions, intake
//! validation, configuration, and persistence.
//!
//! # Design Principles
//!
//! - **Specific variants**: Each error variant captures exactly one failure mode
//! - **Actionable messages**: Error messages guide callers toward resolution
//! - **HTTP-ready**: Error types include HTTP status codes and error codes
//!
//! Two variants (`NoPendingTickets`, `NoCurrentTicket`) describe expected
//! operational states rather than faults; transports surface them as notices.

use std::path::PathBuf;

use thiserror::Error;

use crate::ticket::{TicketId, TicketStatus};

/// The unified error type for all QMS operations.
#[derive(Debug, Error)]
pub enum QmsError {
    // =========================================================================
    // QUEUE LIFECYCLE ERRORS
    // =========================================================================
    /// Ticket issuance is blocked because the queue is paused.
    #[error("Queue is currently paused. Cannot issue new tickets.")]
    QueuePaused,

    /// There is no pending ticket anywhere in the queue.
    #[error("No more pending tickets in queue.")]
    NoPendingTickets,

    /// The operation requires a ticket to be currently called.
    #[error("No ticket is currently being served.")]
    NoCurrentTicket,

    /// The operation was attempted against a ticket in an incompatible state.
    #[error("Ticket {id} is {status} and cannot be modified by this operation")]
    InvalidStatus {
        /// Id of the offending ticket.
        id: TicketId,
        /// Status the ticket held when the operation was attempted.
        status: TicketStatus,
    },

    /// No ticket exists with the given id.
    #[error("Ticket {0} not found")]
    NotFound(TicketId),

    /// The storage serialization guarantee was violated: the persisted state
    /// changed underneath this writer. Fatal for the current operation and
    /// safe to retry from fresh state.
    #[error("Queue state changed concurrently (expected revision {expected}, found {found}); retry the operation")]
    ConcurrentModification {
        /// Revision this writer loaded.
        expected: u64,
        /// Revision found on disk at commit time.
        found: u64,
    },

    /// The caller lacks the capability required by the operation.
    #[error("This operation requires {required} access")]
    Unauthorized {
        /// Capability the operation requires ("staff" or "admin").
        required: &'static str,
    },

    // =========================================================================
    // INTAKE VALIDATION ERRORS
    // =========================================================================
    /// The visit reason supplied at issuance was empty.
    #[error("Visit reason cannot be empty")]
    EmptyReason,

    /// The visit reason exceeds the maximum allowed length.
    #[error("Visit reason exceeds maximum length of {max} characters (got {actual})")]
    ReasonTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length provided.
        actual: usize,
    },

    /// The contact phone number does not look like a phone number.
    #[error("Invalid phone number: '{0}'. Expected 7-20 digits, optionally with +, -, (), or spaces.")]
    InvalidPhoneNumber(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    // =========================================================================
    // PERSISTENCE & I/O ERRORS
    // =========================================================================
    /// An error occurred while persisting or reading queue state.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for QMS operations.
pub type Result<T> = std::result::Result<T, QmsError>;

impl QmsError {
    /// Returns `true` if this error represents an expected operational state
    /// rather than a fault. Transports surface these as notices, not errors.
    #[inline]
    #[must_use]
    pub const fn is_notice(&self) -> bool {
        matches!(self, Self::NoPendingTickets | Self::NoCurrentTicket)
    }

    /// Returns `true` if this error was caused by invalid caller input.
    #[inline]
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::QueuePaused
                | Self::InvalidStatus { .. }
                | Self::NotFound(_)
                | Self::Unauthorized { .. }
                | Self::EmptyReason
                | Self::ReasonTooLong { .. }
                | Self::InvalidPhoneNumber(_)
        )
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParse(_) | Self::ConfigValidation(_)
        )
    }

    /// Returns `true` if this error is related to I/O or persistence.
    #[inline]
    #[must_use]
    pub const fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_))
    }

    /// Returns `true` if retrying the failed operation from fresh state is
    /// expected to succeed.
    #[inline]
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::EmptyReason | Self::ReasonTooLong { .. } | Self::InvalidPhoneNumber(_) => 400,

            // 403 Forbidden - understood but refused
            Self::Unauthorized { .. } => 403,

            // 404 Not Found
            Self::NotFound(_) | Self::ConfigNotFound(_) => 404,

            // 409 Conflict - queue state does not permit the operation
            Self::QueuePaused
            | Self::NoPendingTickets
            | Self::NoCurrentTicket
            | Self::InvalidStatus { .. }
            | Self::ConcurrentModification { .. } => 409,

            // 422 Unprocessable Entity - semantic configuration errors
            Self::ConfigParse(_) | Self::ConfigValidation(_) => 422,

            // 500 Internal Server Error
            Self::Storage(_) | Self::Io(_) => 500,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::QueuePaused => "QUEUE_PAUSED",
            Self::NoPendingTickets => "NO_PENDING_TICKETS",
            Self::NoCurrentTicket => "NO_CURRENT_TICKET",
            Self::InvalidStatus { .. } => "INVALID_STATUS",
            Self::NotFound(_) => "TICKET_NOT_FOUND",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::EmptyReason => "EMPTY_REASON",
            Self::ReasonTooLong { .. } => "REASON_TOO_LONG",
            Self::InvalidPhoneNumber(_) => "INVALID_PHONE_NUMBER",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParse(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidation(_) => "CONFIG_VALIDATION_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }
}

impl From<serde_json::Error> for QmsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
