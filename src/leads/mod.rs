//! Lead model and relay.
//!
//! # Data Flow
//! ```text
//! handler (sanitized fields)
//!     → Lead { kind, email, fields, client, received_at }
//!     → notifier.rs (pick recipient, log, spawn delivery)
//!     → delivery.rs (webhook POST with backoff)
//! ```

pub mod delivery;
pub mod notifier;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::security::sanitize::unescape_html;

pub use notifier::Notifier;

/// Audience a lead is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadCategory {
    Investor,
    Artist,
    Listener,
    General,
}

impl LeadCategory {
    /// Map a free-form page source (e.g. "artists-hero") onto a category.
    pub fn from_source(source: &str) -> Self {
        let source = source.to_ascii_lowercase();
        if source.contains("investor") {
            Self::Investor
        } else if source.contains("artist") {
            Self::Artist
        } else if source.contains("listener") {
            Self::Listener
        } else {
            Self::General
        }
    }
}

/// Human-readable origin of a newsletter subscription.
pub fn source_label(source: &str) -> &'static str {
    let source = source.to_ascii_lowercase();
    if source.contains("investor") {
        "Investor"
    } else if source.contains("artist") {
        "Artist"
    } else if source.contains("listener") {
        "Listener"
    } else if source.contains("home") {
        "Home Page"
    } else if source.contains("exit-intent") {
        "Exit Intent"
    } else {
        "General"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "category", rename_all = "snake_case")]
pub enum LeadKind {
    Subscribe(LeadCategory),
    Artist,
    Listener,
    Investor,
}

impl LeadKind {
    pub fn category(&self) -> LeadCategory {
        match self {
            LeadKind::Subscribe(category) => *category,
            LeadKind::Artist => LeadCategory::Artist,
            LeadKind::Listener => LeadCategory::Listener,
            LeadKind::Investor => LeadCategory::Investor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadKind::Subscribe(_) => "subscribe",
            LeadKind::Artist => "artist",
            LeadKind::Listener => "listener",
            LeadKind::Investor => "investor",
        }
    }
}

/// A validated, sanitized submission.
#[derive(Debug, Clone, Serialize)]
pub struct Lead {
    pub kind: LeadKind,
    pub email: String,
    /// Remaining form fields, already escaped.
    pub fields: BTreeMap<String, String>,
    /// Client identifier the submission came from.
    pub client: String,
    pub received_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(kind: LeadKind, email: String, client: String) -> Self {
        Self {
            kind,
            email,
            fields: BTreeMap::new(),
            client,
            received_at: Utc::now(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn with_optional(self, name: &str, value: Option<String>) -> Self {
        match value {
            Some(v) => self.with_field(name, v),
            None => self,
        }
    }

    /// One-line plain-text subject for notification envelopes.
    pub fn subject(&self) -> String {
        let field = |name: &str| self.fields.get(name).map(|v| unescape_html(v));
        match self.kind {
            LeadKind::Subscribe(_) => {
                let source = field("source").unwrap_or_else(|| "general".to_string());
                format!("New {} Lead: {}", source_label(&source), self.email)
            }
            LeadKind::Artist => format!(
                "New Artist Signup: {}",
                field("artistName").unwrap_or_else(|| self.email.clone())
            ),
            LeadKind::Listener => format!("New Listener Signup: {}", self.email),
            LeadKind::Investor => format!(
                "New Investor Investment Application: {}",
                field("fullName").unwrap_or_else(|| self.email.clone())
            ),
        }
    }
}
