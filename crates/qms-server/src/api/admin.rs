//! Administrative API endpoints.
//!
//! Destructive or audit-oriented operations gated on the admin capability:
//! purging the queue and reading the status-change audit window.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use qms_core::{QmsError, StatusChange, TicketId};

use crate::api::caller_from_headers;
use crate::api::error::{ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the admin router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/purge", post(purge))
        .route("/audit", get(get_audit))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response after purging the queue.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "success": true,
    "removed": 42
}))]
pub struct PurgeResponse {
    /// Whether the purge happened.
    pub success: bool,

    /// How many tickets were removed.
    #[schema(example = 42)]
    pub removed: usize,
}

/// Query parameters for the audit endpoint.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct AuditQuery {
    /// Maximum entries to return. Defaults to 50.
    #[param(example = 20)]
    pub limit: Option<usize>,
}

/// One status transition in the audit window.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "ticket_id": 7,
    "from": "PENDING",
    "to": "SKIPPED",
    "at": "2025-06-02T09:12:00Z",
    "staff_id": "emp-3"
}))]
pub struct StatusChangeView {
    /// Ticket that transitioned.
    pub ticket_id: TicketId,

    /// Status before the transition.
    #[schema(example = "PENDING")]
    pub from: String,

    /// Status after the transition.
    #[schema(example = "SKIPPED")]
    pub to: String,

    /// When the transition happened (UTC).
    pub at: DateTime<Utc>,

    /// Staff member who performed the operation, when identified.
    pub staff_id: Option<String>,
}

impl From<&StatusChange> for StatusChangeView {
    fn from(change: &StatusChange) -> Self {
        Self {
            ticket_id: change.ticket_id,
            from: change.from.to_string(),
            to: change.to.to_string(),
            at: change.at,
            staff_id: change.staff_id.clone(),
        }
    }
}

/// Audit listing response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditResponse {
    /// Status transitions, newest first.
    pub entries: Vec<StatusChangeView>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Purge the queue.
///
/// Deletes every ticket and resets the sequence generator and cursor in
/// one durable unit.
#[utoipa::path(
    post,
    path = "/admin/purge",
    tag = "admin",
    operation_id = "purgeQueue",
    summary = "Purge the queue",
    description = "Deletes all tickets and resets the label sequence and \
        cursor together. Intended for end-of-day or fresh-start resets.",
    responses(
        (status = 200, description = "Queue purged", body = PurgeResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    )
)]
pub async fn purge(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ApiResult<Json<PurgeResponse>> {
    let caller = caller_from_headers(&headers);
    let mut state_guard = state.write().await;
    let removed = state_guard.controller.purge(&caller)?;
    Ok(Json(PurgeResponse {
        success: true,
        removed,
    }))
}

/// Read the status-change audit window.
#[utoipa::path(
    get,
    path = "/admin/audit",
    tag = "admin",
    operation_id = "getAudit",
    summary = "List recent status changes",
    params(AuditQuery),
    responses(
        (status = 200, description = "Audit entries listed", body = AuditResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    )
)]
pub async fn get_audit(
    State(state): State<SharedState>,
    Query(query): Query<AuditQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<AuditResponse>> {
    let caller = caller_from_headers(&headers);
    if !caller.is_admin {
        return Err(QmsError::Unauthorized { required: "admin" }.into());
    }

    let state_guard = state.read().await;
    let entries = state_guard
        .controller
        .recent_status_changes(query.limit.unwrap_or(50))
        .iter()
        .map(StatusChangeView::from)
        .collect();
    Ok(Json(AuditResponse { entries }))
}
