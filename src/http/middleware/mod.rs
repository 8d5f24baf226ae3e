pub mod rate_limit;

pub use rate_limit::{denial_message, rate_limit_middleware, RouteGuard};
