//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → IntakeConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps rate limit policies and notification settings
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Only policies and notification targets are hot-reloaded; listeners are fixed at startup

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, IntakeConfig, ListenerConfig, LogFormat, NotificationConfig, ObservabilityConfig,
    RateLimitConfig, RecipientConfig, RoutePolicy, SecurityConfig,
};
