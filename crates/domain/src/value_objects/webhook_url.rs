//! Webhook URL value object with validation

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::DomainError;

/// A validated absolute webhook URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Validate)]
pub struct WebhookUrl {
    #[validate(url)]
    value: String,
}

impl WebhookUrl {
    /// Create a new webhook URL, validating the format
    pub fn new(url: impl Into<String>) -> Result<Self, DomainError> {
        let value = url.into().trim().to_string();
        if value.is_empty() {
            return Err(DomainError::InvalidUrl("empty URL".to_string()));
        }

        let candidate = Self { value };
        candidate
            .validate()
            .map_err(|_| DomainError::InvalidUrl(candidate.value.clone()))?;

        Ok(candidate)
    }

    /// Get the URL as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Consume into the underlying string
    #[must_use]
    pub fn into_string(self) -> String {
        self.value
    }
}

impl fmt::Display for WebhookUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl TryFrom<&str> for WebhookUrl {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(WebhookUrl::new("http://example.com/hook").is_ok());
        assert!(WebhookUrl::new("https://example.com:8443/a/b?c=d").is_ok());
    }

    #[test]
    fn trims_whitespace() {
        let url = WebhookUrl::new("  http://example.com/hook  ").unwrap();
        assert_eq!(url.as_str(), "http://example.com/hook");
    }

    #[test]
    fn rejects_empty() {
        assert!(WebhookUrl::new("").is_err());
        assert!(WebhookUrl::new("   ").is_err());
    }

    #[test]
    fn rejects_non_urls() {
        assert!(WebhookUrl::new("not a url").is_err());
        assert!(WebhookUrl::new("example.com/no-scheme").is_err());
    }

    #[test]
    fn display_matches_value() {
        let url = WebhookUrl::new("http://example.com/hook").unwrap();
        assert_eq!(url.to_string(), "http://example.com/hook");
    }
}
