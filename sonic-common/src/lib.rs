//! # SonicStream Common Library
//!
//! Shared code for the SonicStream services:
//! - Error type
//! - Configuration loading (TOML + environment)
//! - Import progress protocol (`ProgressEvent`)
//! - Song and track models
//! - SSE response helpers

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod sse;

pub use error::{Error, Result};
pub use events::ProgressEvent;
pub use models::{StoredSong, TrackDescriptor};
