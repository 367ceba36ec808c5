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

use self::mapper::PowerSchoolMapper;
use self::models::{ConnectResponse, PowerSchoolSyncResponse, SchoolsResponse, TokenResponse};

const PROVIDER: ProviderId = ProviderId::PowerSchool;

const PROGRESS_PLAN: &[ProgressStep] = &[
    ProgressStep::new(10, "Authenticating with PowerSchool"),
    ProgressStep::new(25, "Fetching school enrollment"),
    ProgressStep::new(40, "Fetching attendance records"),
    ProgressStep::new(55, "Fetching discipline records"),
    ProgressStep::new(70, "Fetching grades"),
    ProgressStep::new(85, "Running risk predictions"),
    ProgressStep::new(100, "Complete"),
];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    base_url: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest<'a> {
    base_url: &'a str,
    access_token: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncRequest<'a> {
    base_url: &'a str,
    access_token: &'a str,
    school_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<&'a SyncOptions>,
}

#[derive(Debug, Clone)]
struct Session {
    base_url: String,
    access_token: String,
}

/// PowerSchool SIS integration using OAuth 2.0 client credentials.
///
/// The handshake exchanges the client id/secret for an access token, then
/// confirms the token against the district endpoint.
pub struct PowerSchoolClient {
    backend: BackendClient,
    session: RwLock<Option<Session>>,
}

impl PowerSchoolClient {
    pub fn new(backend: BackendClient) -> Self {
        Self {
            backend,
            session: RwLock::new(None),
        }
    }

    async fn session(&self) -> Result<Session> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(PathwayError::NotConnected { provider: PROVIDER })
    }

    async fn request_token(&self, credentials: &Credentials) -> Result<TokenResponse> {
        let client_secret = credentials.secondary_secret.as_deref().ok_or_else(|| {
            PathwayError::CredentialIncomplete {
                provider: PROVIDER,
                missing: vec!["client_secret"],
            }
        })?;

        let body = TokenRequest {
            base_url: &credentials.base_url,
            client_id: &credentials.primary_secret,
            client_secret,
        };
        let value = self.backend.post("/api/powerschool/oauth/token", &body).await?;
        decode(PROVIDER, "token", value)
    }
}

#[async_trait]
impl ProviderClient for PowerSchoolClient {
    fn provider(&self) -> ProviderId {
        PROVIDER
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::ClientCredentials
    }

    fn progress_plan(&self) -> &'static [ProgressStep] {
        PROGRESS_PLAN
    }

    async fn check_health(&self) -> HealthStatus {
        probe_health(&self.backend, "/api/powerschool/health").await
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<AccountInfo> {
        debug!(base_url = %credentials.base_url, "Requesting PowerSchool access token");
        let token = self.request_token(credentials).await.map_err(auth_error)?;

        let body = SessionRequest {
            base_url: &credentials.base_url,
            access_token: &token.access_token,
        };
        let value = self
            .backend
            .post("/api/powerschool/connect", &body)
            .await
            .map_err(auth_error)?;
        let response: ConnectResponse = decode(PROVIDER, "connect", value).map_err(auth_error)?;
        let district = response.into_district().ok_or_else(|| {
            PathwayError::AuthFailed("PowerSchool returned no district info".into())
        })?;

        *self.session.write().await = Some(Session {
            base_url: credentials.base_url.clone(),
            access_token: token.access_token,
        });

        let account = PowerSchoolMapper::account(district);
        info!(district = %account.name, schools = account.resource_count, "PowerSchool connected");
        Ok(account)
    }

    async fn list_containers(&self) -> Result<Vec<Container>> {
        let session = self.session().await?;
        let body = SessionRequest {
            base_url: &session.base_url,
            access_token: &session.access_token,
        };
        let value = self.backend.post("/api/powerschool/schools", &body).await?;

        let response: SchoolsResponse = decode(PROVIDER, "schools", value)?;
        let schools = response
            .into_schools()
            .ok_or_else(|| PathwayError::MalformedResponse {
                provider: PROVIDER,
                reason: "schools list missing".into(),
            })?;

        let containers = PowerSchoolMapper::containers(schools);
        info!(count = containers.len(), "Fetched PowerSchool schools");
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
            access_token: &session.access_token,
            school_id: container_id,
            filters: (!options.is_empty()).then_some(options),
        };
        let value = self.backend.post("/api/powerschool/sync", &body).await?;

        let response: PowerSchoolSyncResponse = decode(PROVIDER, "sync", value)?;
        Ok(RawSyncResponse::PowerSchool(response))
    }
}
