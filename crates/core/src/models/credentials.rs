use serde::{Deserialize, Serialize};

use super::provider::{AuthKind, ProviderId};
use crate::error::{PathwayError, Result};

/// Provider credentials as submitted by the user.
///
/// `primary_secret` is the access token or OAuth client id depending on the
/// provider's [`AuthKind`]. `secondary_secret` is only used by providers with
/// two-part credentials (the client secret, or a pasted authorization code).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub base_url: String,
    pub primary_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_secret: Option<String>,
}

impl Credentials {
    pub fn new(base_url: impl Into<String>, primary_secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            primary_secret: primary_secret.into(),
            secondary_secret: None,
        }
    }

    pub fn with_secondary(mut self, secondary_secret: impl Into<String>) -> Self {
        self.secondary_secret = Some(secondary_secret.into());
        self
    }

    /// Names of required fields that are empty for the given auth kind.
    pub fn missing_fields(&self, kind: AuthKind) -> Vec<&'static str> {
        let secondary = self.secondary_secret.as_deref().unwrap_or("");
        kind.required_fields()
            .iter()
            .copied()
            .filter(|field| {
                let value = match *field {
                    "base_url" => self.base_url.as_str(),
                    "client_secret" => secondary,
                    _ => self.primary_secret.as_str(),
                };
                value.trim().is_empty()
            })
            .collect()
    }

    /// Check completeness and return a copy with trimmed secrets and a normalized base URL.
    pub fn validated(&self, provider: ProviderId, kind: AuthKind) -> Result<Credentials> {
        let missing = self.missing_fields(kind);
        if !missing.is_empty() {
            return Err(PathwayError::CredentialIncomplete { provider, missing });
        }

        Ok(Credentials {
            base_url: normalize_base_url(&self.base_url),
            primary_secret: self.primary_secret.trim().to_string(),
            secondary_secret: self
                .secondary_secret
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }
}

/// Give a URL an explicit scheme (https unless one is present) and strip trailing slashes.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}
