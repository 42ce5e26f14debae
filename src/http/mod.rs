//! HTTP boundary.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, decode and validate body)
//!     → SyncManager::dispatch
//!     → response.rs (status code mapping, JSON bodies)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, SendMessageRequest, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
