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

use self::mapper::ClassroomMapper;
use self::models::{AuthCompleteResponse, AuthStartResponse, ClassroomSyncResponse, CoursesResponse};

const PROVIDER: ProviderId = ProviderId::GoogleClassroom;

const PROGRESS_PLAN: &[ProgressStep] = &[
    ProgressStep::new(15, "Connecting to Google Classroom"),
    ProgressStep::new(35, "Fetching class roster"),
    ProgressStep::new(55, "Fetching coursework"),
    ProgressStep::new(75, "Analyzing submissions"),
    ProgressStep::new(90, "Running risk predictions"),
    ProgressStep::new(100, "Complete"),
];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthStartRequest<'a> {
    base_url: &'a str,
    client_id: &'a str,
    redirect_uri: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthCompleteRequest<'a> {
    authorization_code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest<'a> {
    base_url: &'a str,
    client_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncRequest<'a> {
    base_url: &'a str,
    client_id: &'a str,
    course_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<&'a SyncOptions>,
}

/// Google Classroom integration using the backend's start/complete OAuth flow.
///
/// The authorization code is taken from the credentials when the user pasted
/// one, otherwise from the demo code the backend issues in step one.
pub struct ClassroomClient {
    backend: BackendClient,
    redirect_uri: String,
    session: RwLock<Option<Credentials>>,
}

impl ClassroomClient {
    pub fn new(backend: BackendClient, redirect_uri: &str) -> Self {
        Self {
            backend,
            redirect_uri: redirect_uri.to_string(),
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
impl ProviderClient for ClassroomClient {
    fn provider(&self) -> ProviderId {
        PROVIDER
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::DemoOAuth
    }

    fn progress_plan(&self) -> &'static [ProgressStep] {
        PROGRESS_PLAN
    }

    async fn check_health(&self) -> HealthStatus {
        probe_health(&self.backend, "/api/google-classroom/health").await
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<AccountInfo> {
        debug!(redirect_uri = %self.redirect_uri, "Starting Google Classroom OAuth flow");

        let start = AuthStartRequest {
            base_url: &credentials.base_url,
            client_id: &credentials.primary_secret,
            redirect_uri: &self.redirect_uri,
        };
        let value = self
            .backend
            .post("/api/google-classroom/auth/start", &start)
            .await
            .map_err(auth_error)?;
        let started: AuthStartResponse =
            decode(PROVIDER, "auth start", value).map_err(auth_error)?;

        let code = credentials
            .secondary_secret
            .clone()
            .or(started.authorization_code)
            .ok_or_else(|| {
                PathwayError::AuthFailed(match started.authorization_url {
                    Some(url) => format!("authorization required: visit {url}"),
                    None => "no authorization code available".to_string(),
                })
            })?;

        let value = self
            .backend
            .post(
                "/api/google-classroom/auth/complete",
                &AuthCompleteRequest {
                    authorization_code: &code,
                },
            )
            .await
            .map_err(auth_error)?;
        let completed: AuthCompleteResponse =
            decode(PROVIDER, "auth complete", value).map_err(auth_error)?;

        if !completed.authenticated {
            return Err(PathwayError::AuthFailed(
                "Google Classroom did not confirm authentication".into(),
            ));
        }

        *self.session.write().await = Some(credentials.clone());

        let account = ClassroomMapper::account(completed.into_profile());
        info!(account = %account.name, "Google Classroom connected");
        Ok(account)
    }

    async fn list_containers(&self) -> Result<Vec<Container>> {
        let session = self.session().await?;
        let body = SessionRequest {
            base_url: &session.base_url,
            client_id: &session.primary_secret,
        };
        let value = self
            .backend
            .post("/api/google-classroom/courses", &body)
            .await?;

        let response: CoursesResponse = decode(PROVIDER, "courses", value)?;
        let courses = response
            .into_courses()
            .ok_or_else(|| PathwayError::MalformedResponse {
                provider: PROVIDER,
                reason: "courses list missing".into(),
            })?;

        let containers = ClassroomMapper::containers(courses);
        info!(count = containers.len(), "Fetched Google Classroom courses");
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
            client_id: &session.primary_secret,
            course_id: container_id,
            filters: (!options.is_empty()).then_some(options),
        };
        let value = self
            .backend
            .post("/api/google-classroom/sync", &body)
            .await?;

        let response: ClassroomSyncResponse = decode(PROVIDER, "sync", value)?;
        Ok(RawSyncResponse::GoogleClassroom(response))
    }
}
