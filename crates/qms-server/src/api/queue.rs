//! Queue desk API endpoints.
//!
//! The staff station drives the queue from here: advance to the next
//! ticket, re-announce, skip, complete, pause issuance, and restart the
//! label sequence. `GET /queue` returns the same snapshot the change
//! notifier publishes.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use qms_core::{AdvanceOutcome, QueueSnapshot};

use crate::api::caller_from_headers;
use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::events;
use crate::api::tickets::TicketView;
use crate::state::SharedState;

/// Creates the queue router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(get_snapshot))
        .route("/events", get(events::queue_events))
        .route("/next", post(call_next))
        .route("/recall", post(recall))
        .route("/skip", post(skip))
        .route("/complete", post(complete))
        .route("/toggle", post(toggle_queue))
        .route("/sequence/reset", post(reset_sequence))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "current": null,
    "next": null,
    "recently_skipped": [],
    "queue_active": true
}))]
pub struct QueueSnapshotResponse {
    /// Ticket currently being served.
    pub current: Option<TicketView>,

    /// Ticket the resolver would pick next.
    pub next: Option<TicketView>,

    /// Recently skipped tickets, most recent first.
    pub recently_skipped: Vec<TicketView>,

    /// Whether new tickets may be issued.
    pub queue_active: bool,
}

impl From<&QueueSnapshot> for QueueSnapshotResponse {
    fn from(snapshot: &QueueSnapshot) -> Self {
        let current_id = snapshot.current.as_ref().map(|t| t.id);
        Self {
            current: snapshot
                .current
                .as_ref()
                .map(|t| TicketView::from_ticket(t, current_id)),
            next: snapshot
                .next
                .as_ref()
                .map(|t| TicketView::from_ticket(t, current_id)),
            recently_skipped: snapshot
                .recently_skipped
                .iter()
                .map(|t| TicketView::from_ticket(t, current_id))
                .collect(),
            queue_active: snapshot.queue_active,
        }
    }
}

/// Response after an operation that moves the queue forward.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdvanceResponse {
    /// The ticket that stopped being current (served or skipped), if any.
    pub previous: Option<TicketView>,

    /// The new current ticket. Absent when the queue drained.
    pub current: Option<TicketView>,

    /// Operator-facing notice, set when the queue drained.
    #[schema(example = "No more pending tickets in queue.")]
    pub message: Option<String>,
}

impl AdvanceResponse {
    fn from_outcome(outcome: &AdvanceOutcome) -> Self {
        let current_id = outcome.current.as_ref().map(|t| t.id);
        Self {
            previous: outcome
                .previous
                .as_ref()
                .map(|t| TicketView::from_ticket(t, current_id)),
            current: outcome
                .current
                .as_ref()
                .map(|t| TicketView::from_ticket(t, current_id)),
            message: outcome
                .current
                .is_none()
                .then(|| "No more pending tickets in queue.".to_string()),
        }
    }
}

/// Response after toggling the issuance gate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToggleQueueResponse {
    /// New state of the gate.
    #[schema(example = false)]
    pub queue_active: bool,
}

/// Response after resetting the label sequence.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResetSequenceResponse {
    /// Whether the reset happened.
    pub success: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Get the queue snapshot.
#[utoipa::path(
    get,
    path = "/queue",
    tag = "queue",
    operation_id = "getQueueSnapshot",
    summary = "Get the queue snapshot",
    description = "Returns the current ticket, the resolved next ticket, \
        recently skipped tickets, and the issuance gate. The exact payload \
        the change notifier publishes to subscribers.",
    responses(
        (status = 200, description = "Snapshot retrieved", body = QueueSnapshotResponse)
    )
)]
pub async fn get_snapshot(State(state): State<SharedState>) -> Json<QueueSnapshotResponse> {
    let state_guard = state.read().await;
    let snapshot = state_guard.controller.snapshot();
    Json(QueueSnapshotResponse::from(&snapshot))
}

/// Finalize the current ticket and advance to the next pending one.
#[utoipa::path(
    post,
    path = "/queue/next",
    tag = "queue",
    operation_id = "callNext",
    summary = "Call the next ticket",
    description = "Finalizes the current ticket as served and moves the \
        cursor to the next pending ticket. When no pending ticket remains \
        above the current id, the wrap-back rule reaches the largest pending \
        id below it. A drained queue is reported in the response message.",
    responses(
        (status = 200, description = "Queue advanced", body = AdvanceResponse),
        (status = 403, description = "Staff access required", body = ErrorResponse),
        (status = 409, description = "Nothing to call", body = ErrorResponse)
    )
)]
pub async fn call_next(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ApiResult<Json<AdvanceResponse>> {
    let caller = caller_from_headers(&headers);
    let mut state_guard = state.write().await;
    let outcome = state_guard.controller.call_next(&caller)?;
    Ok(Json(AdvanceResponse::from_outcome(&outcome)))
}

/// Re-announce the current ticket.
#[utoipa::path(
    post,
    path = "/queue/recall",
    tag = "queue",
    operation_id = "recallCurrent",
    summary = "Recall the current ticket",
    responses(
        (status = 200, description = "Ticket recalled", body = TicketView),
        (status = 403, description = "Staff access required", body = ErrorResponse),
        (status = 409, description = "No current ticket", body = ErrorResponse)
    )
)]
pub async fn recall(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ApiResult<Json<TicketView>> {
    let caller = caller_from_headers(&headers);
    let mut state_guard = state.write().await;
    let ticket = state_guard.controller.recall(&caller)?;
    Ok(Json(TicketView::from_ticket(&ticket, Some(ticket.id))))
}

/// Bypass the current ticket and advance.
#[utoipa::path(
    post,
    path = "/queue/skip",
    tag = "queue",
    operation_id = "skipCurrent",
    summary = "Skip the current ticket",
    description = "Marks the current ticket as skipped and advances. Skipped \
        tickets stay recoverable and rejoin by original position.",
    responses(
        (status = 200, description = "Ticket skipped", body = AdvanceResponse),
        (status = 403, description = "Staff access required", body = ErrorResponse),
        (status = 409, description = "No current ticket", body = ErrorResponse)
    )
)]
pub async fn skip(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ApiResult<Json<AdvanceResponse>> {
    let caller = caller_from_headers(&headers);
    let mut state_guard = state.write().await;
    let outcome = state_guard.controller.skip(&caller)?;
    Ok(Json(AdvanceResponse::from_outcome(&outcome)))
}

/// Finalize the current ticket without advancing.
#[utoipa::path(
    post,
    path = "/queue/complete",
    tag = "queue",
    operation_id = "completeCurrent",
    summary = "Mark the current ticket served",
    responses(
        (status = 200, description = "Ticket served", body = TicketView),
        (status = 403, description = "Staff access required", body = ErrorResponse),
        (status = 409, description = "No current ticket", body = ErrorResponse)
    )
)]
pub async fn complete(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ApiResult<Json<TicketView>> {
    let caller = caller_from_headers(&headers);
    let mut state_guard = state.write().await;
    let ticket = state_guard.controller.mark_current_served(&caller)?;
    Ok(Json(TicketView::from_ticket(&ticket, None)))
}

/// Flip the issuance gate.
#[utoipa::path(
    post,
    path = "/queue/toggle",
    tag = "queue",
    operation_id = "toggleQueue",
    summary = "Pause or resume ticket issuance",
    responses(
        (status = 200, description = "Gate toggled", body = ToggleQueueResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    )
)]
pub async fn toggle_queue(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ApiResult<Json<ToggleQueueResponse>> {
    let caller = caller_from_headers(&headers);
    let mut state_guard = state.write().await;
    let queue_active = state_guard.controller.toggle_queue_active(&caller)?;
    Ok(Json(ToggleQueueResponse { queue_active }))
}

/// Restart ticket labels at 1.
#[utoipa::path(
    post,
    path = "/queue/sequence/reset",
    tag = "queue",
    operation_id = "resetSequence",
    summary = "Reset the label sequence",
    description = "Restarts labels at 1. Existing tickets keep the labels \
        they have; ids keep increasing regardless.",
    responses(
        (status = 200, description = "Sequence reset", body = ResetSequenceResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    )
)]
pub async fn reset_sequence(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ApiResult<Json<ResetSequenceResponse>> {
    let caller = caller_from_headers(&headers);
    let mut state_guard = state.write().await;
    state_guard.controller.reset_sequence(&caller)?;
    Ok(Json(ResetSequenceResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use qms_core::Ticket;

    #[test]
    fn test_snapshot_response_marks_current() {
        let created = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        let current = Ticket::new(1, "T001".into(), "a".into(), None, None, created);
        let next = Ticket::new(2, "T002".into(), "b".into(), None, None, created);

        let snapshot = QueueSnapshot {
            current: Some(current),
            next: Some(next),
            recently_skipped: Vec::new(),
            queue_active: true,
        };
        let response = QueueSnapshotResponse::from(&snapshot);
        assert!(response.current.unwrap().is_current);
        assert!(!response.next.unwrap().is_current);
    }

    #[test]
    fn test_advance_response_sets_drained_message() {
        let outcome = AdvanceOutcome {
            previous: None,
            current: None,
        };
        let response = AdvanceResponse::from_outcome(&outcome);
        assert!(response.message.unwrap().contains("No more pending"));

        let created = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        let outcome = AdvanceOutcome {
            previous: None,
            current: Some(Ticket::new(1, "T001".into(), "a".into(), None, None, created)),
        };
        let response = AdvanceResponse::from_outcome(&outcome);
        assert!(response.message.is_none());
    }

    #[test]
    fn test_snapshot_response_serialization() {
        let snapshot = QueueSnapshot {
            current: None,
            next: None,
            recently_skipped: Vec::new(),
            queue_active: false,
        };
        let json = serde_json::to_string(&QueueSnapshotResponse::from(&snapshot)).unwrap();
        assert!(json.contains("\"queue_active\":false"));
    }
}
