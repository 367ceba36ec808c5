//! TOML-based configuration system for Pathway.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PathwayError, Result};
use crate::models::credentials::Credentials;
use crate::models::provider::ProviderId;

/// Top-level Pathway configuration, deserialized from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathwayConfig {
    pub pathway: PathwaySection,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub powerschool: PowerSchoolConfig,
    #[serde(default)]
    pub google_classroom: ClassroomConfig,
}

/// Core instance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathwaySection {
    pub instance_name: String,
    pub data_dir: String,
}

/// The analytics backend every provider call goes through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,
    /// Bearer token identifying this instance to the backend.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_backend_url() -> String {
    "http://localhost:5000".into()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delay between simulated progress steps while a sync is in flight.
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: default_progress_interval_ms(),
        }
    }
}

impl SyncConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

fn default_progress_interval_ms() -> u64 {
    800
}

/// Common view over the per-provider sections.
pub trait ProviderConfig {
    fn provider(&self) -> ProviderId;

    fn enabled(&self) -> bool;

    fn base_url(&self) -> &str;

    /// Credentials from the config file, or `None` when no secret is configured.
    fn credentials(&self) -> Option<Credentials>;
}

/// Canvas LMS settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CanvasConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl ProviderConfig for CanvasConfig {
    fn provider(&self) -> ProviderId {
        ProviderId::Canvas
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn credentials(&self) -> Option<Credentials> {
        let token = self.access_token.as_ref()?;
        Some(Credentials::new(&self.base_url, token))
    }
}

/// PowerSchool SIS settings (OAuth client credentials).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PowerSchoolConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl ProviderConfig for PowerSchoolConfig {
    fn provider(&self) -> ProviderId {
        ProviderId::PowerSchool
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn credentials(&self) -> Option<Credentials> {
        let client_id = self.client_id.as_ref()?;
        let credentials = Credentials::new(&self.base_url, client_id);
        Some(match &self.client_secret {
            Some(secret) => credentials.with_secondary(secret),
            None => credentials,
        })
    }
}

/// Google Classroom settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassroomConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_classroom_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub client_id: Option<String>,
    /// A pasted authorization code; the backend's demo code is used otherwise.
    #[serde(default)]
    pub authorization_code: Option<String>,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

impl Default for ClassroomConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_classroom_base_url(),
            client_id: None,
            authorization_code: None,
            redirect_uri: default_redirect_uri(),
        }
    }
}

fn default_classroom_base_url() -> String {
    "https://classroom.googleapis.com".into()
}

fn default_redirect_uri() -> String {
    "http://localhost:8080/oauth/callback".into()
}

impl ProviderConfig for ClassroomConfig {
    fn provider(&self) -> ProviderId {
        ProviderId::GoogleClassroom
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn credentials(&self) -> Option<Credentials> {
        let client_id = self.client_id.as_ref()?;
        let credentials = Credentials::new(&self.base_url, client_id);
        Some(match &self.authorization_code {
            Some(code) => credentials.with_secondary(code),
            None => credentials,
        })
    }
}

impl PathwayConfig {
    /// Load configuration from a TOML file at the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| PathwayError::Config(format!("failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Validate the configuration, returning an error for invalid combinations.
    pub fn validate(&self) -> Result<()> {
        if self.pathway.instance_name.is_empty() {
            return Err(PathwayError::Config(
                "pathway.instance_name must not be empty".into(),
            ));
        }

        if self.pathway.data_dir.is_empty() {
            return Err(PathwayError::Config(
                "pathway.data_dir must not be empty".into(),
            ));
        }

        if !(self.backend.url.starts_with("http://") || self.backend.url.starts_with("https://"))
        {
            return Err(PathwayError::Config(format!(
                "backend.url must be an http(s) URL, got {:?}",
                self.backend.url
            )));
        }

        if self.backend.timeout_secs == 0 {
            return Err(PathwayError::Config(
                "backend.timeout_secs must be greater than zero".into(),
            ));
        }

        if self.sync.progress_interval_ms == 0 {
            return Err(PathwayError::Config(
                "sync.progress_interval_ms must be greater than zero".into(),
            ));
        }

        for section in self.providers() {
            if section.enabled() && section.base_url().trim().is_empty() {
                return Err(PathwayError::Config(format!(
                    "{}.base_url is required when {} is enabled",
                    section.provider(),
                    section.provider().display_name()
                )));
            }
        }

        if self.google_classroom.enabled && self.google_classroom.redirect_uri.is_empty() {
            return Err(PathwayError::Config(
                "google_classroom.redirect_uri is required when Google Classroom is enabled"
                    .into(),
            ));
        }

        Ok(())
    }

    /// All provider sections, enabled or not.
    pub fn providers(&self) -> [&dyn ProviderConfig; 3] {
        [&self.canvas, &self.powerschool, &self.google_classroom]
    }

    pub fn provider(&self, id: ProviderId) -> &dyn ProviderConfig {
        match id {
            ProviderId::Canvas => &self.canvas,
            ProviderId::PowerSchool => &self.powerschool,
            ProviderId::GoogleClassroom => &self.google_classroom,
        }
    }

    pub fn enabled_providers(&self) -> Vec<ProviderId> {
        self.providers()
            .into_iter()
            .filter(|p| p.enabled())
            .map(|p| p.provider())
            .collect()
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.pathway.data_dir)
    }

    /// Generate a sensible default configuration.
    pub fn generate_default() -> Self {
        Self {
            pathway: PathwaySection {
                instance_name: "My School District".into(),
                data_dir: "/var/lib/pathway".into(),
            },
            backend: BackendConfig::default(),
            sync: SyncConfig::default(),
            canvas: CanvasConfig {
                enabled: true,
                base_url: "https://canvas.instructure.com".into(),
                access_token: None,
            },
            powerschool: PowerSchoolConfig {
                enabled: true,
                base_url: "https://powerschool.example.org".into(),
                client_id: None,
                client_secret: None,
            },
            google_classroom: ClassroomConfig {
                enabled: true,
                ..ClassroomConfig::default()
            },
        }
    }
}
