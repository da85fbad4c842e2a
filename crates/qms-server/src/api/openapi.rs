//! OpenAPI specification generation for the QMS API.
//!
//! This module generates an OpenAPI 3.0 specification consumed by the
//! kiosk/display frontends and by the `gen-openapi` binary for client
//! generation.

use axum::Json;
use utoipa::OpenApi;

// Import all the handler modules to reference their types
use super::admin::{AuditResponse, PurgeResponse, StatusChangeView};
use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::queue::{
    AdvanceResponse, QueueSnapshotResponse, ResetSequenceResponse, ToggleQueueResponse,
};
use super::tickets::{
    DeleteTicketResponse, IssueTicketRequest, TicketListResponse, TicketView,
};

/// Serve the OpenAPI specification as JSON.
///
/// This endpoint is available at `/api/openapi.json` and returns the
/// complete OpenAPI 3.0 specification for the QMS API.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as a string (for writing to file).
/// Used by the gen-openapi binary.
#[allow(dead_code)]
pub fn get_openapi_json() -> String {
    ApiDoc::openapi()
        .to_pretty_json()
        .expect("Failed to serialize OpenAPI spec")
}

/// Main OpenAPI document structure for QMS.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "QMS API",
        version = "0.1.0",
        description = r#"
# QMS API

Single-queue ticket dispatch for walk-in customer service desks.

## Overview

1. **Tickets**: Customers take a number; staff serve, skip, recover, and
   revert individual tickets.
2. **Queue**: The staff station advances the queue, re-announces the
   current ticket, and gates issuance.
3. **Events**: Displays subscribe to a server-sent-events stream carrying
   the queue snapshot after every change.

## Caller identity

Authentication happens upstream. Handlers read the caller from two
headers supplied by the auth proxy:

- `x-staff-id`: staff identity, required for queue operations
- `x-staff-role`: `admin` unlocks destructive operations

## Design notes

- "Currently serving" is tracked by the queue cursor, not by a ticket
  status, so exactly one ticket is current system-wide.
- Skipped tickets rejoin by original position via the wrap-back rule.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local QMS server")
    ),
    tags(
        (
            name = "system",
            description = "Health checks and system status"
        ),
        (
            name = "tickets",
            description = "Ticket issuance, lookup, and per-ticket lifecycle operations"
        ),
        (
            name = "queue",
            description = "Staff-station queue control and snapshot streaming"
        ),
        (
            name = "admin",
            description = "Destructive resets and the status-change audit window"
        )
    ),
    paths(
        // Health endpoints
        super::health::health_check,
        // Ticket endpoints
        super::tickets::issue_ticket,
        super::tickets::list_tickets,
        super::tickets::get_ticket,
        super::tickets::serve_ticket,
        super::tickets::revert_ticket,
        super::tickets::recover_ticket,
        super::tickets::delete_ticket,
        // Queue endpoints
        super::queue::get_snapshot,
        super::queue::call_next,
        super::queue::recall,
        super::queue::skip,
        super::queue::complete,
        super::queue::toggle_queue,
        super::queue::reset_sequence,
        super::events::queue_events,
        // Admin endpoints
        super::admin::purge,
        super::admin::get_audit,
    ),
    components(
        schemas(
            // Error types
            ErrorResponse,
            // Health types
            HealthResponse,
            // Ticket types
            TicketView,
            IssueTicketRequest,
            TicketListResponse,
            DeleteTicketResponse,
            // Queue types
            QueueSnapshotResponse,
            AdvanceResponse,
            ToggleQueueResponse,
            ResetSequenceResponse,
            // Admin types
            PurgeResponse,
            AuditResponse,
            StatusChangeView,
        )
    )
)]
pub struct ApiDoc;
