//! Server-Sent Events (SSE) utilities
//!
//! Turns the receiving half of a progress channel into an SSE response.

use crate::events::ProgressEvent;
use axum::http::{header, HeaderName, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Header that tells nginx-style proxies not to buffer the response
pub const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Convert one progress event into an SSE frame (`data: {json}`)
pub fn progress_frame(event: &ProgressEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().data(json)),
        Err(e) => {
            warn!("SSE: Failed to serialize event {}: {}", event.event_type(), e);
            None
        }
    }
}

/// Stream of SSE frames drained from a progress channel
///
/// Ends after the first terminal event or when every sender is gone.
pub fn progress_stream(
    mut rx: mpsc::Receiver<ProgressEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            debug!("SSE: Forwarding {} event", event.event_type());
            if let Some(frame) = progress_frame(&event) {
                yield Ok(frame);
            }
            if terminal {
                break;
            }
        }
    }
}

/// Build the full SSE response for an import session
///
/// Buffering is disabled for intermediaries so each event is flushed as soon
/// as it is written.
pub fn progress_response(rx: mpsc::Receiver<ProgressEvent>) -> Response {
    let sse = Sse::new(progress_stream(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    );

    (
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (X_ACCEL_BUFFERING, HeaderValue::from_static("no")),
        ],
        sse,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_stream_stops_after_terminal_event() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(ProgressEvent::info("one")).await.unwrap();
        tx.send(ProgressEvent::error("fatal")).await.unwrap();
        tx.send(ProgressEvent::info("never forwarded")).await.unwrap();

        let frames: Vec<_> = progress_stream(rx).collect().await;
        assert_eq!(frames.len(), 2);
    }

    #[tokio::test]
    async fn test_stream_ends_when_senders_drop() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(ProgressEvent::info("one")).await.unwrap();
        drop(tx);

        let frames: Vec<_> = progress_stream(rx).collect().await;
        assert_eq!(frames.len(), 1);
    }

    #[tokio::test]
    async fn test_response_disables_buffering() {
        let (_tx, rx) = mpsc::channel(1);
        let response = progress_response(rx);
        assert_eq!(response.headers().get("x-accel-buffering").unwrap(), "no");
        assert_eq!(response.headers().get("cache-control").unwrap(), "no-cache");
    }
}
