//! Rate-limited lead intake service.

pub mod admin;
pub mod config;
pub mod http;
pub mod leads;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::IntakeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
