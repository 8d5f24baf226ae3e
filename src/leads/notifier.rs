//! Recipient routing and background relay of accepted leads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::Notify;

use crate::config::{NotificationConfig, RecipientConfig};
use crate::leads::delivery::{deliver, Envelope};
use crate::leads::{Lead, LeadCategory};
use crate::observability::metrics;

/// Resolve the recipient for a category, falling back to the general inbox.
pub fn recipient_for(recipients: &RecipientConfig, category: LeadCategory) -> &str {
    let specific = match category {
        LeadCategory::Investor => recipients.investor.as_deref(),
        LeadCategory::Artist => recipients.artist.as_deref(),
        LeadCategory::Listener => recipients.listener.as_deref(),
        LeadCategory::General => None,
    };
    specific.unwrap_or(&recipients.general)
}

/// Count of deliveries still running, with a wakeup when it reaches zero.
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Held by a delivery task for its whole lifetime, including cancellation.
struct InFlightGuard(Arc<InFlight>);

impl InFlightGuard {
    fn new(in_flight: &Arc<InFlight>) -> Self {
        in_flight.count.fetch_add(1, Ordering::SeqCst);
        Self(in_flight.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Relays leads to the configured sink.
///
/// Every lead is logged for manual follow-up. When a webhook is configured the
/// lead is also POSTed there in a background task, so a slow or failing sink
/// never holds up the client. [`Notifier::drain`] waits for those tasks at
/// shutdown.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    config: Arc<ArcSwap<NotificationConfig>>,
    in_flight: Arc<InFlight>,
}

impl Notifier {
    pub fn new(config: Arc<ArcSwap<NotificationConfig>>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Deliveries that have not finished yet.
    pub fn pending(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Wait up to `grace` for pending deliveries. Returns how many were
    /// still running when the grace period ran out.
    pub async fn drain(&self, grace: Duration) -> usize {
        let wait_idle = async {
            loop {
                let idle = self.in_flight.idle.notified();
                if self.pending() == 0 {
                    return;
                }
                idle.await;
            }
        };

        if tokio::time::timeout(grace, wait_idle).await.is_ok() {
            return 0;
        }

        let pending = self.pending();
        tracing::warn!(pending, grace = ?grace, "Abandoning lead deliveries still in flight");
        pending
    }

    pub fn dispatch(&self, lead: Lead) -> Option<tokio::task::JoinHandle<()>> {
        let config = self.config.load_full();
        let recipient = recipient_for(&config.recipients, lead.kind.category()).to_string();

        metrics::record_lead(lead.kind.as_str());
        tracing::info!(
            kind = lead.kind.as_str(),
            email = %lead.email,
            client = %lead.client,
            recipient = %recipient,
            fields = ?lead.fields,
            "New lead received"
        );

        let url = config.webhook_url.clone()?;
        let client = self.client.clone();
        let guard = InFlightGuard::new(&self.in_flight);

        Some(tokio::spawn(async move {
            let _guard = guard;
            let envelope = Envelope {
                recipient: &recipient,
                subject: lead.subject(),
                lead: &lead,
            };
            match deliver(&client, &url, &envelope, &config).await {
                Ok(attempts) => {
                    tracing::debug!(attempts, recipient = %recipient, "Lead delivered");
                }
                Err(e) => {
                    metrics::record_delivery_failure();
                    tracing::error!(error = %e, email = %lead.email, "Lead delivery failed");
                }
            }
        }))
    }
}
