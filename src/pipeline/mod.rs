//! Conversion pipeline.
//!
//! Sits between the HTTP layer and the codecs/cache:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              ImageService               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  CacheStore  │  │  sniff → decode │  │
//! │  │ SingleFlight │  │  → WebpEncoder  │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────┘
//! ```

mod service;

pub use service::{
    resolve_request_path, ImageResponse, ImageService, ImageSource, ARTIFACT_CONTENT_TYPE,
};
