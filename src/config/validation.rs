//! Configuration validation.
//!
//! Semantic checks only; serde handles syntax. Every problem is reported,
//! not just the first.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{IntakeConfig, KNOWN_ROUTES};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("rate_limit.routes.{route}: {reason}")]
    InvalidPolicy { route: String, reason: &'static str },
    #[error("rate_limit.routes.{0}: unknown route")]
    UnknownRoute(String),
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },
    #[error("notifications.webhook_url: {0}")]
    InvalidWebhook(String),
    #[error("notifications.max_attempts must be at least 1")]
    NoDeliveryAttempts,
    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingAdminKey,
}

pub fn validate_config(config: &IntakeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (route, policy) in &config.rate_limit.routes {
        if !KNOWN_ROUTES.contains(&route.as_str()) {
            errors.push(ValidationError::UnknownRoute(route.clone()));
            continue;
        }
        if policy.limit == 0 {
            errors.push(ValidationError::InvalidPolicy {
                route: route.clone(),
                reason: "limit must be positive",
            });
        }
        if policy.window_secs == 0 {
            errors.push(ValidationError::InvalidPolicy {
                route: route.clone(),
                reason: "window_secs must be positive",
            });
        }
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::MissingAdminKey);
        }
    }

    if let Some(raw) = &config.notifications.webhook_url {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::InvalidWebhook(format!(
                "unsupported scheme '{}'",
                url.scheme()
            ))),
            Err(e) => errors.push(ValidationError::InvalidWebhook(e.to_string())),
        }
    }
    if config.notifications.max_attempts == 0 {
        errors.push(ValidationError::NoDeliveryAttempts);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RoutePolicy;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&IntakeConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_all_errors() {
        let mut config = IntakeConfig::default();
        config
            .rate_limit
            .routes
            .insert("subscribe".into(), RoutePolicy { limit: 0, window_secs: 0 });
        config
            .rate_limit
            .routes
            .insert("pulse_chat".into(), RoutePolicy { limit: 1, window_secs: 1 });
        config.listener.bind_address = "nowhere".into();
        config.notifications.webhook_url = Some("ftp://hooks.example".into());
        config.notifications.max_attempts = 0;
        config.admin.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 7, "{errors:?}");
        assert!(errors.contains(&ValidationError::UnknownRoute("pulse_chat".into())));
        assert!(errors.contains(&ValidationError::MissingAdminKey));
        assert!(errors.contains(&ValidationError::NoDeliveryAttempts));
    }
}
