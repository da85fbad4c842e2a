//! End-to-end queue scenarios over HTTP.
//!
//! Drives the full router against tempdir-backed storage: issuing,
//! advancing, skipping, recovering, and the admin guardrails.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use qms_core::{QmsConfig, Storage};
use qms_server::{api, state};

fn server() -> (tempfile::TempDir, TestServer) {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::new(dir.path().to_path_buf());
    let shared = state::build_state(QmsConfig::default(), storage).unwrap();
    let server = TestServer::new(api::create_router(shared)).unwrap();
    (dir, server)
}

fn staff_id() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-staff-id"),
        HeaderValue::from_static("emp-1"),
    )
}

fn admin_role() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-staff-role"),
        HeaderValue::from_static("admin"),
    )
}

async fn issue(server: &TestServer, reason: &str) -> Value {
    let response = server
        .post("/api/tickets")
        .json(&json!({ "visit_reason": reason }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()
}

async fn call_next(server: &TestServer) -> Value {
    let (name, value) = staff_id();
    let response = server.post("/api/queue/next").add_header(name, value).await;
    response.assert_status_ok();
    response.json::<Value>()
}

#[tokio::test]
async fn health_reports_queue_gate() {
    let (_dir, server) = server();
    let response = server.get("/health").await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["queue_active"], true);
}

#[tokio::test]
async fn issue_call_skip_recover_wrap_back() {
    let (_dir, server) = server();

    let a = issue(&server, "a").await;
    let b = issue(&server, "b").await;
    let c = issue(&server, "c").await;
    assert_eq!(a["label"], "T001");
    assert_eq!(c["label"], "T003");

    // call -> A current
    let out = call_next(&server).await;
    assert_eq!(out["current"]["id"], a["id"]);

    // skip -> A skipped, B current
    let (name, value) = staff_id();
    let out = server.post("/api/queue/skip").add_header(name, value).await;
    out.assert_status_ok();
    let out = out.json::<Value>();
    assert_eq!(out["previous"]["status"], "SKIPPED");
    assert_eq!(out["current"]["id"], b["id"]);

    // recover A back into the pending pool
    let (name, value) = staff_id();
    let recovered = server
        .post(&format!("/api/tickets/{}/recover", a["id"]))
        .add_header(name, value)
        .await;
    recovered.assert_status_ok();
    let recovered = recovered.json::<Value>();
    assert_eq!(recovered["status"], "PENDING");
    assert!(recovered["recovery_time_secs"].as_i64().unwrap() >= 0);

    // B served; C comes before recovered A
    let out = call_next(&server).await;
    assert_eq!(out["previous"]["id"], b["id"]);
    assert_eq!(out["previous"]["status"], "SERVED");
    assert_eq!(out["current"]["id"], c["id"]);

    // wrap-back finally reaches A
    let out = call_next(&server).await;
    assert_eq!(out["current"]["id"], a["id"]);
}

#[tokio::test]
async fn single_ticket_drains_with_notice() {
    let (_dir, server) = server();
    let t = issue(&server, "only").await;

    let out = call_next(&server).await;
    assert_eq!(out["current"]["id"], t["id"]);

    let out = call_next(&server).await;
    assert_eq!(out["previous"]["status"], "SERVED");
    assert!(out["current"].is_null());
    assert!(out["message"]
        .as_str()
        .unwrap()
        .contains("No more pending"));

    // queue is empty now: a further call has nothing to do
    let (name, value) = staff_id();
    let response = server.post("/api/queue/next").add_header(name, value).await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["error"], "NO_PENDING_TICKETS");
}

#[tokio::test]
async fn queue_operations_require_staff_identity() {
    let (_dir, server) = server();
    issue(&server, "a").await;

    let response = server.post("/api/queue/next").await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn paused_queue_rejects_issuance() {
    let (_dir, server) = server();

    let (name, value) = admin_role();
    let response = server
        .post("/api/queue/toggle")
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["queue_active"], false);

    let response = server
        .post("/api/tickets")
        .json(&json!({ "visit_reason": "late" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["error"], "QUEUE_PAUSED");
}

#[tokio::test]
async fn delete_guards_and_not_found() {
    let (_dir, server) = server();
    let a = issue(&server, "a").await;
    issue(&server, "b").await;
    call_next(&server).await;
    let (name, value) = staff_id();
    server
        .post("/api/queue/complete")
        .add_header(name, value)
        .await
        .assert_status_ok();

    // served tickets cannot be deleted and remain readable
    let (name, value) = admin_role();
    let response = server
        .delete(&format!("/api/tickets/{}", a["id"]))
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["error"], "INVALID_STATUS");

    let still_there = server.get(&format!("/api/tickets/{}", a["id"])).await;
    still_there.assert_status_ok();
    assert_eq!(still_there.json::<Value>()["status"], "SERVED");

    // deletes need the admin capability
    let (name, value) = staff_id();
    let response = server
        .delete("/api/tickets/2")
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let (name, value) = admin_role();
    let response = server
        .delete("/api/tickets/2")
        .add_header(name, value)
        .await;
    response.assert_status_ok();

    let (name, value) = admin_role();
    let response = server
        .delete("/api/tickets/999")
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn snapshot_tracks_cursor_and_skips() {
    let (_dir, server) = server();
    issue(&server, "a").await;
    issue(&server, "b").await;
    call_next(&server).await;

    let (name, value) = staff_id();
    server
        .post("/api/queue/skip")
        .add_header(name, value)
        .await
        .assert_status_ok();

    let snapshot = server.get("/api/queue").await.json::<Value>();
    assert_eq!(snapshot["current"]["id"], 2);
    assert_eq!(snapshot["current"]["is_current"], true);
    assert_eq!(snapshot["recently_skipped"][0]["id"], 1);
    assert_eq!(snapshot["queue_active"], true);
}

#[tokio::test]
async fn serve_specific_recovers_skipped_ticket() {
    let (_dir, server) = server();
    let a = issue(&server, "a").await;
    let b = issue(&server, "b").await;
    call_next(&server).await;

    let (name, value) = staff_id();
    server
        .post("/api/queue/skip")
        .add_header(name, value)
        .await
        .assert_status_ok();

    let (name, value) = staff_id();
    let response = server
        .post(&format!("/api/tickets/{}/serve", a["id"]))
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    let served = response.json::<Value>();
    assert_eq!(served["is_current"], true);
    assert!(served["recovery_time_secs"].as_i64().unwrap() >= 0);

    // B was finalized on the way
    let b_now = server
        .get(&format!("/api/tickets/{}", b["id"]))
        .await
        .json::<Value>();
    assert_eq!(b_now["status"], "SERVED");
    assert_eq!(b_now["assigned_staff_id"], "emp-1");
}

#[tokio::test]
async fn purge_resets_labels_and_requires_admin() {
    let (_dir, server) = server();
    issue(&server, "a").await;
    issue(&server, "b").await;

    let response = server.post("/api/admin/purge").await;
    response.assert_status(StatusCode::FORBIDDEN);

    let (name, value) = admin_role();
    let response = server
        .post("/api/admin/purge")
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["removed"], 2);

    let fresh = issue(&server, "fresh").await;
    assert_eq!(fresh["label"], "T001");
    assert_eq!(fresh["id"], 1);
}

#[tokio::test]
async fn audit_lists_transitions_newest_first() {
    let (_dir, server) = server();
    let a = issue(&server, "a").await;
    call_next(&server).await;

    let (name, value) = staff_id();
    server
        .post("/api/queue/skip")
        .add_header(name, value)
        .await
        .assert_status_ok();

    let (name, value) = staff_id();
    server
        .post(&format!("/api/tickets/{}/recover", a["id"]))
        .add_header(name, value)
        .await
        .assert_status_ok();

    let (name, value) = admin_role();
    let response = server
        .get("/api/admin/audit")
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    let entries = response.json::<Value>();
    assert_eq!(entries["entries"][0]["to"], "PENDING");
    assert_eq!(entries["entries"][1]["to"], "SKIPPED");
}

#[tokio::test]
async fn invalid_intake_fields_are_rejected() {
    let (_dir, server) = server();

    let response = server
        .post("/api/tickets")
        .json(&json!({ "visit_reason": "   " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "EMPTY_REASON");

    let response = server
        .post("/api/tickets")
        .json(&json!({ "visit_reason": "ok", "phone_number": "nope" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "INVALID_PHONE_NUMBER");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (_dir, server) = server();
    let response = server.get("/api/openapi.json").await;
    response.assert_status_ok();
    let spec = response.json::<Value>();
    assert_eq!(spec["info"]["title"], "QMS API");
}
