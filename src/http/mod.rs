//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, global layers)
//!     → request.rs (request ID, tracing span)
//!     → middleware/rate_limit.rs (client identity, per-route quota)
//!     → handlers/ (decode, sanitize, relay lead)
//!     → response.rs (JSON body, quota headers)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{ClientIdentity, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
