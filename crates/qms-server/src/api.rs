//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `tickets` - Ticket issuance, lookup, and per-ticket lifecycle operations
//! - `queue` - Staff-station queue control and the snapshot endpoint
//! - `events` - Server-sent-events stream of queue snapshots
//! - `admin` - Destructive resets and the audit window
//! - `health` - Service health checks
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::http::HeaderMap;
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use qms_core::Caller;

use crate::state::SharedState;

pub mod admin;
pub mod error;
pub mod events;
pub mod health;
pub mod openapi;
pub mod queue;
pub mod tickets;

// Re-export commonly used types
#[allow(unused_imports)]
pub use error::{ApiError, ApiResult, ErrorResponse};

// Re-export OpenAPI utilities for the gen-openapi binary
#[allow(unused_imports)]
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                - Health check
/// /docs                  - Swagger UI
/// /api
/// ├── /tickets           - Issuance, lookup, serve/revert/recover/delete
/// ├── /queue             - Snapshot, events stream, next/recall/skip/...
/// ├── /admin             - Purge and audit
/// └── /openapi.json      - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .route("/openapi.json", get(openapi::get_openapi_spec))
                .nest("/tickets", tickets::router())
                .nest("/queue", queue::router())
                .nest("/admin", admin::router()),
        )
        .merge(SwaggerUi::new("/docs").url("/docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

/// Read the caller identity from the headers the auth collaborator sets.
///
/// `x-staff-id` carries the staff identity; `x-staff-role: admin` grants
/// the admin capability. Absent headers mean an anonymous (kiosk) caller.
pub(crate) fn caller_from_headers(headers: &HeaderMap) -> Caller {
    let staff_id = headers
        .get("x-staff-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let is_admin = headers
        .get("x-staff-role")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|role| role.eq_ignore_ascii_case("admin"));

    Caller { staff_id, is_admin }
}
