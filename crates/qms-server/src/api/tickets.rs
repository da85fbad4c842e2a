//! Ticket API endpoints.
//!
//! Customers take a number through `POST /tickets`; staff act on individual
//! tickets (serve out of order, recover from a skip, revert, delete) and
//! export collaborators read them back with status filters.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use qms_core::{IssueRequest, Ticket, TicketId, TicketStatus};

use crate::api::caller_from_headers;
use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the tickets router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(issue_ticket).get(list_tickets))
        .route("/{id}", get(get_ticket).delete(delete_ticket))
        .route("/{id}/serve", post(serve_ticket))
        .route("/{id}/revert", post(revert_ticket))
        .route("/{id}/recover", post(recover_ticket))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// API view of a ticket, including derived fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 7,
    "label": "T007",
    "visit_reason": "License renewal",
    "customer_name": "Dana",
    "phone_number": "+1 555 123 4567",
    "status": "PENDING",
    "created_at": "2025-06-02T09:12:00Z",
    "recall_count": 0,
    "skip_count": 0,
    "is_current": false
}))]
pub struct TicketView {
    /// Ticket id. Strictly increasing with creation order.
    #[schema(example = 7)]
    pub id: TicketId,

    /// Human-facing ticket number.
    #[schema(example = "T007")]
    pub label: String,

    /// Why the customer is visiting.
    #[schema(example = "License renewal")]
    pub visit_reason: String,

    /// Customer name, if given.
    pub customer_name: Option<String>,

    /// Contact phone number, if given.
    pub phone_number: Option<String>,

    /// Stored status: PENDING, SERVED, or SKIPPED.
    #[schema(example = "PENDING")]
    pub status: String,

    /// When the ticket was issued (UTC).
    pub created_at: DateTime<Utc>,

    /// When the ticket was finalized as served (UTC).
    pub served_at: Option<DateTime<Utc>>,

    /// When service completed (UTC).
    pub completed_at: Option<DateTime<Utc>>,

    /// Times staff re-announced this ticket.
    pub recall_count: u32,

    /// Most recent re-announcement (UTC).
    pub last_recalled_at: Option<DateTime<Utc>>,

    /// Times this ticket was bypassed.
    pub skip_count: u32,

    /// Most recent bypass (UTC).
    pub last_skipped_at: Option<DateTime<Utc>>,

    /// Seconds spent parked after the most recent skip.
    pub recovery_time_secs: Option<i64>,

    /// Seconds from issuance to being served.
    pub service_duration_secs: Option<i64>,

    /// Derived waiting time in whole minutes, excluding parked time.
    pub waiting_time_minutes: Option<i64>,

    /// Staff member who most recently served this ticket.
    pub assigned_staff_id: Option<String>,

    /// Whether the queue cursor currently points at this ticket.
    pub is_current: bool,
}

impl TicketView {
    /// Build the API view, deriving `waiting_time_minutes` and
    /// `is_current` from the cursor position.
    pub fn from_ticket(ticket: &Ticket, current_id: Option<TicketId>) -> Self {
        Self {
            id: ticket.id,
            label: ticket.label.clone(),
            visit_reason: ticket.visit_reason.clone(),
            customer_name: ticket.customer_name.clone(),
            phone_number: ticket.phone_number.clone(),
            status: ticket.status.to_string(),
            created_at: ticket.created_at,
            served_at: ticket.served_at,
            completed_at: ticket.completed_at,
            recall_count: ticket.recall_count,
            last_recalled_at: ticket.last_recalled_at,
            skip_count: ticket.skip_count,
            last_skipped_at: ticket.last_skipped_at,
            recovery_time_secs: ticket.recovery_time_secs,
            service_duration_secs: ticket.service_duration_secs,
            waiting_time_minutes: ticket.waiting_time_minutes(),
            assigned_staff_id: ticket.assigned_staff_id.clone(),
            is_current: current_id == Some(ticket.id),
        }
    }
}

/// Request body for issuing a ticket.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "visit_reason": "License renewal",
    "customer_name": "Dana",
    "phone_number": "+1 555 123 4567"
}))]
pub struct IssueTicketRequest {
    /// Why the customer is visiting. Required, max 200 characters.
    #[schema(example = "License renewal", min_length = 1, max_length = 200)]
    pub visit_reason: String,

    /// Customer name. Optional.
    pub customer_name: Option<String>,

    /// Contact phone number. Optional, validated when present.
    pub phone_number: Option<String>,
}

/// Query parameters for listing tickets.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListTicketsQuery {
    /// Filter by status: PENDING, SERVED, or SKIPPED.
    #[param(example = "PENDING")]
    pub status: Option<String>,

    /// Maximum tickets to return. Defaults to 50.
    #[param(example = 20)]
    pub limit: Option<usize>,
}

/// Ticket listing response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketListResponse {
    /// Matching tickets.
    pub tickets: Vec<TicketView>,

    /// Number of tickets returned.
    pub total: usize,
}

/// Response after deleting a ticket.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteTicketResponse {
    /// Whether the delete happened.
    pub success: bool,

    /// Id of the removed ticket.
    pub id: TicketId,
}

fn parse_status(value: &str) -> ApiResult<TicketStatus> {
    match value.to_ascii_uppercase().as_str() {
        "PENDING" => Ok(TicketStatus::Pending),
        "SERVED" => Ok(TicketStatus::Served),
        "SKIPPED" => Ok(TicketStatus::Skipped),
        other => Err(ApiError::BadRequest {
            error_code: "INVALID_STATUS_FILTER".to_string(),
            message: format!("Unknown status '{other}'. Expected PENDING, SERVED, or SKIPPED."),
        }),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Issue a new ticket.
///
/// Creates a pending ticket at the back of the queue with the next label.
#[utoipa::path(
    post,
    path = "/tickets",
    tag = "tickets",
    operation_id = "issueTicket",
    summary = "Take a number",
    description = "Creates a pending ticket with the next sequence label. \
        Fails while the queue is paused.",
    request_body = IssueTicketRequest,
    responses(
        (status = 200, description = "Ticket issued", body = TicketView),
        (status = 400, description = "Invalid intake fields", body = ErrorResponse),
        (status = 409, description = "Queue is paused", body = ErrorResponse)
    )
)]
pub async fn issue_ticket(
    State(state): State<SharedState>,
    Json(request): Json<IssueTicketRequest>,
) -> ApiResult<Json<TicketView>> {
    let mut state_guard = state.write().await;

    let ticket = state_guard.controller.issue_ticket(IssueRequest {
        visit_reason: request.visit_reason,
        customer_name: request.customer_name,
        phone_number: request.phone_number,
    })?;

    Ok(Json(TicketView::from_ticket(&ticket, None)))
}

/// List tickets, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/tickets",
    tag = "tickets",
    operation_id = "listTickets",
    summary = "List tickets",
    description = "Returns tickets for export and reporting collaborators. \
        With a status filter, ordered by that status's relevant timestamp, \
        newest first.",
    params(ListTicketsQuery),
    responses(
        (status = 200, description = "Tickets listed", body = TicketListResponse),
        (status = 400, description = "Invalid status filter", body = ErrorResponse)
    )
)]
pub async fn list_tickets(
    State(state): State<SharedState>,
    Query(query): Query<ListTicketsQuery>,
) -> ApiResult<Json<TicketListResponse>> {
    let status = query.status.as_deref().map(parse_status).transpose()?;

    let state_guard = state.read().await;
    let current_id = state_guard.controller.snapshot().current.map(|t| t.id);
    let tickets: Vec<TicketView> = state_guard
        .controller
        .list_tickets(status, query.limit)
        .iter()
        .map(|t| TicketView::from_ticket(t, current_id))
        .collect();

    let total = tickets.len();
    Ok(Json(TicketListResponse { tickets, total }))
}

/// Fetch one ticket by id.
#[utoipa::path(
    get,
    path = "/tickets/{id}",
    tag = "tickets",
    operation_id = "getTicket",
    summary = "Get a ticket",
    params(("id" = u64, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Ticket found", body = TicketView),
        (status = 404, description = "Unknown ticket", body = ErrorResponse)
    )
)]
pub async fn get_ticket(
    State(state): State<SharedState>,
    Path(id): Path<TicketId>,
) -> ApiResult<Json<TicketView>> {
    let state_guard = state.read().await;
    let ticket = state_guard.controller.get_ticket(id)?;
    let current_id = state_guard.controller.snapshot().current.map(|t| t.id);
    Ok(Json(TicketView::from_ticket(&ticket, current_id)))
}

/// Serve a specific ticket out of order.
///
/// Finalizes any current ticket first. Serving a skipped ticket records
/// its recovery time.
#[utoipa::path(
    post,
    path = "/tickets/{id}/serve",
    tag = "tickets",
    operation_id = "serveTicket",
    summary = "Serve a specific ticket",
    params(("id" = u64, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Ticket is now current", body = TicketView),
        (status = 403, description = "Staff access required", body = ErrorResponse),
        (status = 404, description = "Unknown ticket", body = ErrorResponse),
        (status = 409, description = "Ticket already served", body = ErrorResponse)
    )
)]
pub async fn serve_ticket(
    State(state): State<SharedState>,
    Path(id): Path<TicketId>,
    headers: HeaderMap,
) -> ApiResult<Json<TicketView>> {
    let caller = caller_from_headers(&headers);
    let mut state_guard = state.write().await;
    let ticket = state_guard.controller.serve_specific(&caller, id)?;
    Ok(Json(TicketView::from_ticket(&ticket, Some(ticket.id))))
}

/// Revert a ticket to pending (admin override).
#[utoipa::path(
    post,
    path = "/tickets/{id}/revert",
    tag = "tickets",
    operation_id = "revertTicket",
    summary = "Revert a ticket to pending",
    description = "Admin override returning a ticket to the pending pool. \
        Clears service stamps; reverting the current ticket re-resolves the \
        cursor. A no-op on tickets that are already pending.",
    params(("id" = u64, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Ticket reverted", body = TicketView),
        (status = 403, description = "Admin access required", body = ErrorResponse),
        (status = 404, description = "Unknown ticket", body = ErrorResponse)
    )
)]
pub async fn revert_ticket(
    State(state): State<SharedState>,
    Path(id): Path<TicketId>,
    headers: HeaderMap,
) -> ApiResult<Json<TicketView>> {
    let caller = caller_from_headers(&headers);
    let mut state_guard = state.write().await;
    let ticket = state_guard.controller.revert(&caller, id)?;
    let current_id = state_guard.controller.snapshot().current.map(|t| t.id);
    Ok(Json(TicketView::from_ticket(&ticket, current_id)))
}

/// Return a skipped ticket to the pending pool.
#[utoipa::path(
    post,
    path = "/tickets/{id}/recover",
    tag = "tickets",
    operation_id = "recoverTicket",
    summary = "Recover a skipped ticket",
    description = "Returns a skipped ticket to the pending pool, recording \
        how long it sat parked. The wrap-back rule lets it rejoin by its \
        original position.",
    params(("id" = u64, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Ticket recovered", body = TicketView),
        (status = 403, description = "Staff access required", body = ErrorResponse),
        (status = 404, description = "Unknown ticket", body = ErrorResponse),
        (status = 409, description = "Ticket is not skipped", body = ErrorResponse)
    )
)]
pub async fn recover_ticket(
    State(state): State<SharedState>,
    Path(id): Path<TicketId>,
    headers: HeaderMap,
) -> ApiResult<Json<TicketView>> {
    let caller = caller_from_headers(&headers);
    let mut state_guard = state.write().await;
    let ticket = state_guard.controller.recover(&caller, id)?;
    let current_id = state_guard.controller.snapshot().current.map(|t| t.id);
    Ok(Json(TicketView::from_ticket(&ticket, current_id)))
}

/// Delete a pending ticket.
#[utoipa::path(
    delete,
    path = "/tickets/{id}",
    tag = "tickets",
    operation_id = "deleteTicket",
    summary = "Delete a pending ticket",
    params(("id" = u64, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Ticket deleted", body = DeleteTicketResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse),
        (status = 404, description = "Unknown ticket", body = ErrorResponse),
        (status = 409, description = "Ticket is not pending", body = ErrorResponse)
    )
)]
pub async fn delete_ticket(
    State(state): State<SharedState>,
    Path(id): Path<TicketId>,
    headers: HeaderMap,
) -> ApiResult<Json<DeleteTicketResponse>> {
    let caller = caller_from_headers(&headers);
    let mut state_guard = state.write().await;
    state_guard.controller.delete_ticket(&caller, id)?;
    Ok(Json(DeleteTicketResponse { success: true, id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ticket_view_derives_fields() {
        let created = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        let mut ticket = Ticket::new(
            3,
            "T003".into(),
            "renewal".into(),
            Some("Dana".into()),
            None,
            created,
        );
        ticket.served_at = Some(created + chrono::Duration::minutes(5));

        let view = TicketView::from_ticket(&ticket, Some(3));
        assert!(view.is_current);
        assert_eq!(view.status, "PENDING");
        assert_eq!(view.waiting_time_minutes, Some(5));

        let view = TicketView::from_ticket(&ticket, Some(9));
        assert!(!view.is_current);
    }

    #[test]
    fn test_parse_status_accepts_any_case() {
        assert_eq!(parse_status("pending").unwrap(), TicketStatus::Pending);
        assert_eq!(parse_status("SERVED").unwrap(), TicketStatus::Served);
        assert!(parse_status("DONE").is_err());
    }

    #[test]
    fn test_issue_request_deserialization() {
        let json = r#"{"visit_reason": "Pickup"}"#;
        let request: IssueTicketRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.visit_reason, "Pickup");
        assert!(request.customer_name.is_none());
    }

    #[test]
    fn test_ticket_view_serialization() {
        let created = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        let ticket = Ticket::new(1, "T001".into(), "visit".into(), None, None, created);
        let view = TicketView::from_ticket(&ticket, None);
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("\"label\":\"T001\""));
        assert!(json.contains("\"status\":\"PENDING\""));
    }
}
