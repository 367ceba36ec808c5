pub mod mapper;
pub mod models;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{PathwayError, Result};
use crate::models::connection::{AccountInfo, HealthStatus};
use crate::models::container::Container;
use crate::models::credentials::Credentials;
use crate::models::provider::{AuthKind, ProviderId};
use crate::models::sync::{ProgressStep, SyncOptions};
use crate::providers::backend::BackendClient;
use crate::providers::{auth_error, decode, probe_health, ProviderClient, RawSyncResponse};

use self::mapper::CanvasMapper;
use self::models::{CanvasSyncResponse, ConnectResponse, CoursesResponse};

const PROVIDER: ProviderId = ProviderId::Canvas;

const PROGRESS_PLAN: &[ProgressStep] = &[
    ProgressStep::new(10, "Connecting to Canvas"),
    ProgressStep::new(25, "Fetching course roster"),
    ProgressStep::new(45, "Fetching assignments and submissions"),
    ProgressStep::new(65, "Running risk predictions"),
    ProgressStep::new(85, "Generating insights"),
    ProgressStep::new(100, "Complete"),
];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    base_url: &'a str,
    access_token: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncRequest<'a> {
    base_url: &'a str,
    access_token: &'a str,
    course_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<&'a SyncOptions>,
}

/// Canvas LMS integration using a personal access token.
pub struct CanvasClient {
    backend: BackendClient,
    session: RwLock<Option<Credentials>>,
}

impl CanvasClient {
    pub fn new(backend: BackendClient) -> Self {
        Self {
            backend,
            session: RwLock::new(None),
        }
    }

    async fn session(&self) -> Result<Credentials> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(PathwayError::NotConnected { provider: PROVIDER })
    }
}

#[async_trait]
impl ProviderClient for CanvasClient {
    fn provider(&self) -> ProviderId {
        PROVIDER
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::BearerToken
    }

    fn progress_plan(&self) -> &'static [ProgressStep] {
        PROGRESS_PLAN
    }

    async fn check_health(&self) -> HealthStatus {
        probe_health(&self.backend, "/api/canvas/health").await
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<AccountInfo> {
        debug!(base_url = %credentials.base_url, "Authenticating with Canvas");

        let body = TokenRequest {
            base_url: &credentials.base_url,
            access_token: &credentials.primary_secret,
        };
        let value = self
            .backend
            .post("/api/canvas/connect", &body)
            .await
            .map_err(auth_error)?;

        let response: ConnectResponse = decode(PROVIDER, "connect", value).map_err(auth_error)?;
        let account = response
            .account_info
            .ok_or_else(|| PathwayError::AuthFailed("Canvas returned no account info".into()))?;

        *self.session.write().await = Some(credentials.clone());

        let account = CanvasMapper::account(account);
        info!(account = %account.name, courses = account.resource_count, "Canvas connected");
        Ok(account)
    }

    async fn list_containers(&self) -> Result<Vec<Container>> {
        let session = self.session().await?;
        let body = TokenRequest {
            base_url: &session.base_url,
            access_token: &session.primary_secret,
        };
        let value = self.backend.post("/api/canvas/courses", &body).await?;

        let response: CoursesResponse = decode(PROVIDER, "courses", value)?;
        let courses = response
            .into_courses()
            .ok_or_else(|| PathwayError::MalformedResponse {
                provider: PROVIDER,
                reason: "courses list missing".into(),
            })?;

        let containers = CanvasMapper::containers(courses);
        info!(count = containers.len(), "Fetched Canvas courses");
        Ok(containers)
    }

    async fn sync_container(
        &self,
        container_id: &str,
        options: &SyncOptions,
    ) -> Result<RawSyncResponse> {
        let session = self.session().await?;
        let body = SyncRequest {
            base_url: &session.base_url,
            access_token: &session.primary_secret,
            course_id: container_id,
            filters: (!options.is_empty()).then_some(options),
        };
        let value = self.backend.post("/api/canvas/sync", &body).await?;

        let response: CanvasSyncResponse = decode(PROVIDER, "sync", value)?;
        Ok(RawSyncResponse::Canvas(response))
    }
}
