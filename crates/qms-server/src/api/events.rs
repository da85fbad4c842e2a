//! Server-sent events stream of queue snapshots.
//!
//! Each subscriber gets the snapshot stream the change notifier publishes
//! after every mutating operation, primed with the current state. The
//! notifier prunes the subscription when the client disconnects and its
//! channel closes.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

use crate::api::queue::QueueSnapshotResponse;
use crate::state::SharedState;

/// Subscribe to queue snapshots over SSE.
///
/// Emits a `snapshot` event immediately and then after every queue
/// mutation. Slow consumers miss intermediate snapshots rather than
/// stalling the queue.
#[utoipa::path(
    get,
    path = "/queue/events",
    tag = "queue",
    operation_id = "queueEvents",
    summary = "Stream queue snapshots",
    description = "Server-sent events stream. Each `snapshot` event carries \
        the same payload as `GET /queue`, published after every mutating \
        operation.",
    responses(
        (status = 200, description = "SSE stream of snapshot events",
         content_type = "text/event-stream")
    )
)]
pub async fn queue_events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (subscriber_id, rx) = state.write().await.controller.subscribe();
    tracing::debug!(subscriber = %subscriber_id, "sse observer connected");

    let stream = ReceiverStream::new(rx).map(|snapshot| {
        let payload = QueueSnapshotResponse::from(&snapshot);
        let event = Event::default().event("snapshot");
        Ok(match event.json_data(&payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize queue snapshot");
                Event::default().event("error").data("serialization failure")
            }
        })
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
