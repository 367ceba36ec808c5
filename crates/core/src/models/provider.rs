use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PathwayError, Result};

/// The external platforms Pathway integrates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Canvas LMS, authenticated with a personal access token.
    Canvas,
    /// PowerSchool SIS, authenticated with OAuth client credentials.
    #[serde(rename = "powerschool")]
    PowerSchool,
    /// Google Classroom, authenticated through the demo OAuth flow.
    GoogleClassroom,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [
        ProviderId::Canvas,
        ProviderId::PowerSchool,
        ProviderId::GoogleClassroom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Canvas => "canvas",
            ProviderId::PowerSchool => "powerschool",
            ProviderId::GoogleClassroom => "google_classroom",
        }
    }

    /// Human-readable product name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::Canvas => "Canvas",
            ProviderId::PowerSchool => "PowerSchool",
            ProviderId::GoogleClassroom => "Google Classroom",
        }
    }

    pub fn auth_kind(&self) -> AuthKind {
        match self {
            ProviderId::Canvas => AuthKind::BearerToken,
            ProviderId::PowerSchool => AuthKind::ClientCredentials,
            ProviderId::GoogleClassroom => AuthKind::DemoOAuth,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = PathwayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "canvas" => Ok(ProviderId::Canvas),
            "powerschool" => Ok(ProviderId::PowerSchool),
            "google_classroom" | "classroom" => Ok(ProviderId::GoogleClassroom),
            other => Err(PathwayError::Config(format!(
                "unknown provider: {other}. Supported: canvas, powerschool, google_classroom"
            ))),
        }
    }
}

/// How a provider proves the caller's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    /// A single bearer token (`primary_secret`).
    BearerToken,
    /// OAuth client id (`primary_secret`) and client secret (`secondary_secret`).
    ClientCredentials,
    /// Start/complete OAuth flow keyed by a client id (`primary_secret`).
    DemoOAuth,
}

impl AuthKind {
    /// Field names that must be non-empty, in the order they are reported.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            AuthKind::BearerToken => &["base_url", "access_token"],
            AuthKind::ClientCredentials => &["base_url", "client_id", "client_secret"],
            AuthKind::DemoOAuth => &["base_url", "client_id"],
        }
    }
}
