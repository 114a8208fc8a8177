//! Server-Sent Events (SSE) endpoint for task lifecycle updates

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use tokio_stream::StreamExt;

use crate::sequencer::TaskEvent;
use crate::server::state::AppState;

/// GET /api/events - SSE stream of every task's events
pub async fn task_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.sequencer.subscribe();

    let stream = tokio_stream::wrappers::BroadcastStream::new(rx)
        .filter_map(|result| match result {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::debug!("SSE subscriber lagged: {}", e);
                None
            }
        })
        .map(|event: TaskEvent| {
            let json = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            Ok::<_, Infallible>(Event::default().event(event.name()).data(json))
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
