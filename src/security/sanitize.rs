//! Input sanitization for lead submissions.
//!
//! Everything accepted from a client passes through here before it is logged
//! or relayed. Text comes out HTML-escaped so downstream templates can embed
//! it verbatim.

use thiserror::Error;
use url::Url;

/// RFC 5321 path limit.
pub const MAX_EMAIL_LEN: usize = 254;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Email address too long")]
    EmailTooLong,
    #[error("Input exceeds maximum length of {max} characters")]
    TooLong { max: usize },
    #[error("Invalid URL format")]
    InvalidUrl,
    #[error("Invalid URL protocol")]
    UnsupportedScheme,
    #[error("{field} is required")]
    Missing { field: &'static str },
}

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse [`escape_html`], for plain-text contexts such as subject lines.
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}

/// Validate an address of the form `local@domain.tld` and normalize it.
pub fn sanitize_email(email: &str) -> Result<String, SanitizeError> {
    let email = email.trim();
    if !is_email_shaped(email) {
        return Err(SanitizeError::InvalidEmail);
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(SanitizeError::EmailTooLong);
    }
    Ok(email.to_lowercase())
}

fn is_email_shaped(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    // Some dot must split the domain into two non-empty halves.
    domain
        .char_indices()
        .filter(|(_, c)| *c == '.')
        .any(|(i, _)| i > 0 && i + 1 < domain.len())
}

/// Trim, enforce a length cap in characters, and HTML-escape.
pub fn sanitize_text(text: &str, max_len: usize) -> Result<String, SanitizeError> {
    let trimmed = text.trim();
    if trimmed.chars().count() > max_len {
        return Err(SanitizeError::TooLong { max: max_len });
    }
    Ok(escape_html(trimmed))
}

/// Like [`sanitize_text`] but an empty value is an error.
pub fn require_text(
    field: &'static str,
    text: Option<&str>,
    max_len: usize,
) -> Result<String, SanitizeError> {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => sanitize_text(t, max_len),
        _ => Err(SanitizeError::Missing { field }),
    }
}

/// Optional text: `None` or blank input yields `None`.
pub fn optional_text(text: Option<&str>, max_len: usize) -> Result<Option<String>, SanitizeError> {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => sanitize_text(t, max_len).map(Some),
        _ => Ok(None),
    }
}

/// Accept only absolute http(s) URLs.
pub fn sanitize_url(raw: &str) -> Result<String, SanitizeError> {
    let parsed = Url::parse(raw.trim()).map_err(|_| SanitizeError::InvalidUrl)?;
    match parsed.scheme() {
        "http" | "https" => Ok(escape_html(parsed.as_str())),
        _ => Err(SanitizeError::UnsupportedScheme),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#039;s&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_unescape_html() {
        let raw = r#"<a href="x">Tom & Jerry's</a>"#;
        assert_eq!(unescape_html(&escape_html(raw)), raw);
        // Input that already looked like an entity round-trips.
        assert_eq!(unescape_html(&escape_html("&lt;")), "&lt;");
    }

    #[test]
    fn test_sanitize_email() {
        assert_eq!(sanitize_email("  Fan@Example.COM ").unwrap(), "fan@example.com");
        assert_eq!(sanitize_email("a@b.co").unwrap(), "a@b.co");

        for bad in ["", "no-at.example.com", "@example.com", "a@example", "a@.com", "a@com.", "a b@c.com", "a@b@c.com"] {
            assert_eq!(sanitize_email(bad), Err(SanitizeError::InvalidEmail), "{bad}");
        }
    }

    #[test]
    fn test_sanitize_email_length() {
        let local = "a".repeat(250);
        let email = format!("{local}@b.co");
        assert_eq!(sanitize_email(&email), Err(SanitizeError::EmailTooLong));
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("  <b>hi</b> ", 20).unwrap(), "&lt;b&gt;hi&lt;/b&gt;");
        assert_eq!(sanitize_text("abcdef", 5), Err(SanitizeError::TooLong { max: 5 }));
        // Escaping happens after the length check.
        assert!(sanitize_text("<<<<<", 5).is_ok());
    }

    #[test]
    fn test_required_and_optional_text() {
        assert_eq!(
            require_text("Artist name", Some("   "), 10),
            Err(SanitizeError::Missing { field: "Artist name" })
        );
        assert_eq!(require_text("x", None, 10), Err(SanitizeError::Missing { field: "x" }));
        assert_eq!(optional_text(Some(""), 10).unwrap(), None);
        assert_eq!(optional_text(Some(" ok "), 10).unwrap(), Some("ok".to_string()));
    }

    #[test]
    fn test_sanitize_url() {
        assert_eq!(
            sanitize_url("https://band.example/track?a=1&b=2").unwrap(),
            "https://band.example/track?a=1&amp;b=2"
        );
        assert_eq!(sanitize_url("javascript:alert(1)"), Err(SanitizeError::UnsupportedScheme));
        assert_eq!(sanitize_url("not a url"), Err(SanitizeError::InvalidUrl));
    }
}
