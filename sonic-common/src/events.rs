//! Import progress protocol
//!
//! One `ProgressEvent` per SSE `data:` frame. A session emits any number of
//! `info` events, at most one `total`, then per-item `searching`/`progress`/
//! `skip` events in input order, and ends with exactly one `done` or `error`.

use crate::models::StoredSong;
use serde::{Deserialize, Serialize};

/// Import session status event
///
/// Serialized with a `type` tag. Indices are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Free-form status line ("Fetching playlist info...")
    Info { message: String },

    /// Number of items the session will process
    Total {
        #[serde(rename = "total")]
        count: usize,
    },

    /// About to look up a playable match for item `index`
    Searching {
        #[serde(rename = "current")]
        index: usize,
        total: usize,
        #[serde(rename = "track")]
        label: String,
    },

    /// Item `index` was persisted
    Progress {
        #[serde(rename = "current")]
        index: usize,
        total: usize,
        song: StoredSong,
    },

    /// Item `index` was not persisted (duplicate, no match, lookup failure)
    Skip {
        #[serde(rename = "current")]
        index: usize,
        total: usize,
        reason: String,
    },

    /// Session ended without completing
    Error { message: String },

    /// Session completed; `songs` holds the newly persisted tracks only
    Done { songs: Vec<StoredSong> },
}

impl ProgressEvent {
    pub fn info(message: impl Into<String>) -> Self {
        ProgressEvent::Info {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ProgressEvent::Error {
            message: message.into(),
        }
    }

    /// Wire name of the event (matches the `type` tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            ProgressEvent::Info { .. } => "info",
            ProgressEvent::Total { .. } => "total",
            ProgressEvent::Searching { .. } => "searching",
            ProgressEvent::Progress { .. } => "progress",
            ProgressEvent::Skip { .. } => "skip",
            ProgressEvent::Error { .. } => "error",
            ProgressEvent::Done { .. } => "done",
        }
    }

    /// True for `done` and `error`
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Done { .. } | ProgressEvent::Error { .. })
    }

    /// True for events that must follow `total`
    pub fn is_item_event(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Searching { .. } | ProgressEvent::Progress { .. } | ProgressEvent::Skip { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let event = ProgressEvent::Skip {
            index: 3,
            total: 10,
            reason: "Duplicate".to_string(),
        };
        let value = serde_json::to_value(&event).expect("Event serialization should succeed");
        assert_eq!(
            value,
            json!({"type": "skip", "current": 3, "total": 10, "reason": "Duplicate"})
        );

        let total = serde_json::to_value(ProgressEvent::Total { count: 7 }).unwrap();
        assert_eq!(total, json!({"type": "total", "total": 7}));

        let searching = serde_json::to_value(ProgressEvent::Searching {
            index: 1,
            total: 2,
            label: "A - B".to_string(),
        })
        .unwrap();
        assert_eq!(searching["track"], "A - B");
    }

    #[test]
    fn test_event_type_matches_tag() {
        let events = vec![
            ProgressEvent::info("x"),
            ProgressEvent::Total { count: 1 },
            ProgressEvent::error("boom"),
            ProgressEvent::Done { songs: vec![] },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.event_type());
        }
    }

    #[test]
    fn test_terminal_classification() {
        assert!(ProgressEvent::error("x").is_terminal());
        assert!(ProgressEvent::Done { songs: vec![] }.is_terminal());
        assert!(!ProgressEvent::info("x").is_terminal());
        assert!(!ProgressEvent::Total { count: 0 }.is_item_event());
    }
}
