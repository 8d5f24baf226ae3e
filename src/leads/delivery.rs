//! Webhook delivery with exponential backoff.

use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::config::NotificationConfig;
use crate::leads::Lead;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook responded with status {0}")]
    Status(u16),
}

impl DeliveryError {
    /// Client errors other than 408/429 will not improve on retry.
    fn is_retryable(&self) -> bool {
        match self {
            DeliveryError::Request(_) => true,
            DeliveryError::Status(code) => *code >= 500 || *code == 408 || *code == 429,
        }
    }
}

/// Body POSTed to the webhook.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub recipient: &'a str,
    pub subject: String,
    pub lead: &'a Lead,
}

/// Exponential backoff delay with up to 10% jitter.
pub fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u64.saturating_pow(attempt - 1);
    let capped = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

/// POST the envelope, retrying transient failures. Returns the attempts used.
pub async fn deliver(
    client: &reqwest::Client,
    url: &str,
    envelope: &Envelope<'_>,
    config: &NotificationConfig,
) -> Result<u32, DeliveryError> {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let result = client
            .post(url)
            .timeout(Duration::from_secs(config.timeout_secs))
            .json(envelope)
            .send()
            .await;

        let err = match result {
            Ok(res) if res.status().is_success() => return Ok(attempt),
            Ok(res) => DeliveryError::Status(res.status().as_u16()),
            Err(e) => DeliveryError::Request(e),
        };

        if attempt >= max_attempts || !err.is_retryable() {
            return Err(err);
        }

        let delay = backoff_delay(attempt, config.base_delay_ms, config.max_delay_ms);
        tracing::info!(attempt, delay = ?delay, error = %err, "Retrying lead delivery");
        tokio::time::sleep(delay).await;
    }
}
