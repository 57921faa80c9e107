//! HTTP API handlers for sonic-ingest
//!
//! Import endpoints answer with an SSE progress stream; everything else is
//! plain JSON or raw audio.

pub mod health;
pub mod import;
pub mod info;
pub mod songs;
pub mod stream;

pub use health::health_routes;
pub use import::import_routes;
pub use info::info_routes;
pub use songs::song_routes;
pub use stream::stream_routes;
