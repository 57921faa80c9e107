//! Progress emitter
//!
//! Writing half of an import session's event channel. The transport drains
//! the receiving half into an SSE response (`sonic_common::sse`).
//!
//! The emitter guards the stream contract:
//! - `total` at most once, before any per-item event
//! - nothing after the terminal `done`/`error`
//!
//! A send fails only when the client has gone away; the resolver treats that
//! as cancellation.

use sonic_common::ProgressEvent;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Default channel capacity between resolver and transport
pub const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// The receiving side has been dropped (client disconnected)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("progress receiver closed")]
pub struct ReceiverClosed;

/// Sender side of an import session's progress stream
#[derive(Debug)]
pub struct ProgressEmitter {
    tx: mpsc::Sender<ProgressEvent>,
    total_sent: bool,
    terminated: bool,
}

impl ProgressEmitter {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self {
            tx,
            total_sent: false,
            terminated: false,
        }
    }

    /// Create an emitter and the receiver the transport drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// True once the client has dropped the stream
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Send one event, enforcing the stream contract
    ///
    /// Out-of-contract events are dropped with a warning rather than sent.
    pub async fn emit(&mut self, event: ProgressEvent) -> Result<(), ReceiverClosed> {
        if self.terminated {
            warn!("Dropping {} event emitted after terminal event", event.event_type());
            return Ok(());
        }

        match &event {
            ProgressEvent::Total { .. } if self.total_sent => {
                warn!("Dropping duplicate total event");
                return Ok(());
            }
            ProgressEvent::Total { .. } => self.total_sent = true,
            e if e.is_item_event() && !self.total_sent => {
                warn!("Dropping {} event emitted before total", e.event_type());
                return Ok(());
            }
            _ => {}
        }

        if event.is_terminal() {
            self.terminated = true;
        }

        debug!(event_type = event.event_type(), "Emitting progress event");
        self.tx.send(event).await.map_err(|_| ReceiverClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(mut rx: mpsc::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_total_is_sent_once() {
        let (mut emitter, rx) = ProgressEmitter::channel(8);
        emitter.emit(ProgressEvent::Total { count: 2 }).await.unwrap();
        emitter.emit(ProgressEvent::Total { count: 3 }).await.unwrap();

        assert_eq!(drain(rx), vec![ProgressEvent::Total { count: 2 }]);
    }

    #[tokio::test]
    async fn test_item_before_total_is_dropped() {
        let (mut emitter, rx) = ProgressEmitter::channel(8);
        let skip = ProgressEvent::Skip {
            index: 1,
            total: 1,
            reason: "x".to_string(),
        };
        emitter.emit(skip.clone()).await.unwrap();
        emitter.emit(ProgressEvent::Total { count: 1 }).await.unwrap();
        emitter.emit(skip.clone()).await.unwrap();

        assert_eq!(drain(rx), vec![ProgressEvent::Total { count: 1 }, skip]);
    }

    #[tokio::test]
    async fn test_nothing_after_terminal() {
        let (mut emitter, rx) = ProgressEmitter::channel(8);
        emitter.emit(ProgressEvent::error("fatal")).await.unwrap();
        emitter.emit(ProgressEvent::info("late")).await.unwrap();
        emitter.emit(ProgressEvent::Done { songs: vec![] }).await.unwrap();

        assert_eq!(drain(rx), vec![ProgressEvent::error("fatal")]);
    }

    #[tokio::test]
    async fn test_closed_receiver_is_reported() {
        let (mut emitter, rx) = ProgressEmitter::channel(8);
        drop(rx);
        assert_eq!(emitter.emit(ProgressEvent::info("x")).await, Err(ReceiverClosed));
    }
}
