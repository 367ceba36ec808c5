pub mod backend;
pub mod canvas;
pub mod classroom;
pub mod powerschool;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::PathwayConfig;
use crate::error::{PathwayError, Result};
use crate::models::connection::{AccountInfo, HealthStatus};
use crate::models::container::Container;
use crate::models::credentials::Credentials;
use crate::models::provider::{AuthKind, ProviderId};
use crate::models::sync::{ProgressStep, SyncOptions};

use self::backend::BackendClient;
use self::canvas::models::CanvasSyncResponse;
use self::canvas::CanvasClient;
use self::classroom::models::ClassroomSyncResponse;
use self::classroom::ClassroomClient;
use self::powerschool::models::PowerSchoolSyncResponse;
use self::powerschool::PowerSchoolClient;

/// Capability set every provider integration implements.
///
/// The orchestration layer only talks to providers through this trait.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn provider(&self) -> ProviderId;

    fn auth_kind(&self) -> AuthKind;

    /// Ordered progress steps shown while a sync is in flight. The last step is
    /// the completion step at 100%.
    fn progress_plan(&self) -> &'static [ProgressStep];

    async fn check_health(&self) -> HealthStatus;

    /// Run the provider's handshake with already-validated credentials.
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccountInfo>;

    async fn list_containers(&self) -> Result<Vec<Container>>;

    async fn sync_container(
        &self,
        container_id: &str,
        options: &SyncOptions,
    ) -> Result<RawSyncResponse>;
}

/// Provider-specific sync payloads, before normalization.
#[derive(Debug, Clone)]
pub enum RawSyncResponse {
    Canvas(CanvasSyncResponse),
    PowerSchool(PowerSchoolSyncResponse),
    GoogleClassroom(ClassroomSyncResponse),
}

impl RawSyncResponse {
    pub fn provider(&self) -> ProviderId {
        match self {
            RawSyncResponse::Canvas(_) => ProviderId::Canvas,
            RawSyncResponse::PowerSchool(_) => ProviderId::PowerSchool,
            RawSyncResponse::GoogleClassroom(_) => ProviderId::GoogleClassroom,
        }
    }
}

/// Fields every provider's sync payload shares.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawSyncEnvelope {
    pub status: Option<String>,
    pub predictions: Option<Vec<RawPrediction>>,
    pub students: Option<Vec<RawPrediction>>,
    #[serde(alias = "students_processed")]
    pub students_processed: Option<u32>,
    /// The backend's own summary block; kept only as source metadata.
    pub summary: Option<Value>,
}

impl RawSyncEnvelope {
    /// The students array, preferring `predictions` over `students`.
    pub fn rows(&self) -> Option<&[RawPrediction]> {
        self.predictions.as_deref().or(self.students.as_deref())
    }

    pub fn take_rows(&mut self) -> Option<Vec<RawPrediction>> {
        let predictions = self.predictions.take();
        let students = self.students.take();
        predictions.or(students)
    }
}

/// A student prediction as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPrediction {
    #[serde(default, alias = "student_id", deserialize_with = "deserialize_opt_id")]
    pub student_id: Option<String>,
    /// Row id; stands in for the student id only when that is absent.
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
    #[serde(alias = "risk_score")]
    pub risk_score: f64,
    #[serde(default, alias = "risk_factors")]
    pub risk_factors: Vec<RawFactor>,
    #[serde(default, alias = "protective_factors")]
    pub protective_factors: Vec<RawFactor>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RawPrediction {
    /// The student id, falling back to the row id.
    pub fn student_key(&self) -> Option<&str> {
        [self.student_id.as_deref(), self.id.as_deref()]
            .into_iter()
            .flatten()
            .find(|id| !id.is_empty())
    }
}

/// Factors arrive either as bare names or as detailed objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawFactor {
    Name(String),
    Detailed {
        #[serde(alias = "factor")]
        name: String,
        #[serde(default)]
        weight: Option<f64>,
        #[serde(default, alias = "description")]
        detail: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Unsigned(u64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s.trim().to_string(),
            RawId::Int(n) => n.to_string(),
            RawId::Unsigned(n) => n.to_string(),
        }
    }
}

/// Accept identifiers encoded as JSON strings or integers.
pub fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(RawId::into_string)
}

/// Like [`deserialize_id`], but also accepts `null`.
pub fn deserialize_opt_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(RawId::into_string))
}

/// Decode a provider payload, reporting shape problems as a malformed response.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    provider: ProviderId,
    what: &str,
    value: Value,
) -> Result<T> {
    serde_json::from_value(value).map_err(|e| PathwayError::MalformedResponse {
        provider,
        reason: format!("invalid {what} payload: {e}"),
    })
}

/// Map a backend failure during a handshake to `AuthFailed`, keeping the upstream message.
pub(crate) fn auth_error(err: PathwayError) -> PathwayError {
    match err {
        PathwayError::AuthFailed(_) => err,
        PathwayError::Upstream { message, .. } => PathwayError::AuthFailed(message),
        PathwayError::Http(e) => PathwayError::AuthFailed(format!("connection failed: {e}")),
        other => PathwayError::AuthFailed(other.to_string()),
    }
}

pub(crate) async fn probe_health(backend: &BackendClient, path: &str) -> HealthStatus {
    match backend.get(path).await {
        Ok(value) => HealthStatus {
            reachable: true,
            authenticated: value
                .get("authenticated")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        },
        Err(PathwayError::Upstream { .. }) => HealthStatus {
            reachable: true,
            authenticated: false,
        },
        Err(_) => HealthStatus::unreachable(),
    }
}

/// Build one client per enabled provider section of the configuration.
pub fn build_clients(config: &PathwayConfig) -> Result<Vec<Arc<dyn ProviderClient>>> {
    let backend = BackendClient::with_timeout(
        &config.backend.url,
        &config.backend.token,
        config.backend.timeout(),
    )?;

    let mut clients: Vec<Arc<dyn ProviderClient>> = Vec::new();
    if config.canvas.enabled {
        clients.push(Arc::new(CanvasClient::new(backend.clone())));
    }
    if config.powerschool.enabled {
        clients.push(Arc::new(PowerSchoolClient::new(backend.clone())));
    }
    if config.google_classroom.enabled {
        clients.push(Arc::new(ClassroomClient::new(
            backend.clone(),
            &config.google_classroom.redirect_uri,
        )));
    }
    Ok(clients)
}
