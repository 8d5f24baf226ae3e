//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Route names that accept rate limit policies.
pub const ROUTE_SUBSCRIBE: &str = "subscribe";
pub const ROUTE_ARTIST_SIGNUP: &str = "artist_signup";
pub const ROUTE_LISTENER_SIGNUP: &str = "listener_signup";
pub const ROUTE_INVESTOR_INVESTMENT: &str = "investor_investment";

pub const KNOWN_ROUTES: [&str; 4] = [
    ROUTE_SUBSCRIBE,
    ROUTE_ARTIST_SIGNUP,
    ROUTE_LISTENER_SIGNUP,
    ROUTE_INVESTOR_INVESTMENT,
];

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct IntakeConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Per-route rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Where accepted leads are relayed.
    pub notifications: NotificationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// How often expired entries are purged, in seconds (0 disables the sweep).
    pub sweep_interval_secs: u64,

    /// Policies keyed by route name. Missing routes fall back to built-in defaults.
    pub routes: BTreeMap<String, RoutePolicy>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_secs: 300,
            routes: BTreeMap::new(),
        }
    }
}

impl RateLimitConfig {
    /// Effective policy for a route: configured value, else the built-in default.
    pub fn policy(&self, route: &str) -> RoutePolicy {
        self.routes
            .get(route)
            .copied()
            .unwrap_or_else(|| RoutePolicy::default_for(route))
    }

    /// Effective policies for every known route.
    pub fn effective_policies(&self) -> BTreeMap<String, RoutePolicy> {
        KNOWN_ROUTES
            .iter()
            .map(|route| (route.to_string(), self.policy(route)))
            .collect()
    }
}

/// Requests allowed per window for one route.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct RoutePolicy {
    /// Maximum approved requests per window.
    pub limit: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl RoutePolicy {
    pub fn default_for(route: &str) -> Self {
        match route {
            ROUTE_INVESTOR_INVESTMENT => Self { limit: 2, window_secs: 24 * 60 * 60 },
            ROUTE_SUBSCRIBE => Self { limit: 10, window_secs: 60 * 60 },
            _ => Self { limit: 5, window_secs: 60 * 60 },
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Lead relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Optional webhook receiving a JSON envelope per lead.
    pub webhook_url: Option<String>,

    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,

    /// Total delivery attempts (first try included).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// How long shutdown waits for deliveries still in flight, in seconds.
    pub shutdown_grace_secs: u64,

    pub recipients: RecipientConfig,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 10,
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5000,
            shutdown_grace_secs: 5,
            recipients: RecipientConfig::default(),
        }
    }
}

/// Recipient address per lead category. Unset categories use `general`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecipientConfig {
    pub general: String,
    pub investor: Option<String>,
    pub artist: Option<String>,
    pub listener: Option<String>,
}

impl Default for RecipientConfig {
    fn default() -> Self {
        Self {
            general: "leads@localhost".to_string(),
            investor: None,
            artist: None,
            listener: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Request hardening.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 64 * 1024,
            request_timeout_secs: 30,
        }
    }
}
