//! HTTP server layer for nimage.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │            GET /{path}      GET /clearcache?key=                │
//! │                                                                 │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌──────────────┐  │
//! │  │  handlers  │ │   serve    │ │    auth    │ │    routes    │  │
//! │  │ (requests) │ │ (streaming)│ │ (clear key)│ │(router conf.)│  │
//! │  └────────────┘ └────────────┘ └────────────┘ └──────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod serve;

pub use auth::ClearKey;
pub use handlers::{
    clear_cache_handler, health_handler, image_handler, AppState, ClearCacheParams,
    ErrorResponse, HealthResponse, CACHE_CLEARED_MESSAGE,
};
pub use routes::{create_router, RouterConfig};
pub use serve::{serve_file, CACHE_HIT_HEADER};
