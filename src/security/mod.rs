//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming submission:
//!     → identifier.rs (derive client key from proxy headers)
//!     → rate_limit.rs (fixed-window check per route + client)
//!     → sanitize.rs (validate, trim, HTML-escape fields)
//!     → Pass to lead relay
//! ```
//!
//! # Design Decisions
//! - Denial is an outcome, not a fault: it is logged at warn, never error
//! - Limiter state is per process; the cap is advisory across replicas
//! - No trust in client input: every relayed field is escaped

pub mod identifier;
pub mod rate_limit;
pub mod sanitize;

pub use identifier::extract_identifier;
pub use rate_limit::{Decision, FixedWindowLimiter, RateLimitError};
