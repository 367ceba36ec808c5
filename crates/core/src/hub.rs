//! The integration hub: one session per provider, a credential store and an
//! event channel for display layers.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::PathwayConfig;
use crate::error::{PathwayError, Result};
use crate::events::HubEvent;
use crate::models::connection::{AccountInfo, ConnectionState, HealthStatus};
use crate::models::container::{Container, Selection};
use crate::models::credentials::Credentials;
use crate::models::provider::ProviderId;
use crate::models::sync::{SyncOptions, SyncProgress, SyncResult};
use crate::providers::{build_clients, ProviderClient};
use crate::session::ProviderSession;
use crate::store::{CredentialStore, MemoryCredentialStore};
use crate::sync::{SyncOrchestrator, DEFAULT_PROGRESS_INTERVAL};

const DEFAULT_EVENT_CAPACITY: usize = 256;

pub struct HubBuilder {
    clients: Vec<Arc<dyn ProviderClient>>,
    store: Option<Arc<dyn CredentialStore>>,
    progress_interval: Duration,
    event_capacity: usize,
}

impl HubBuilder {
    pub fn client(mut self, client: Arc<dyn ProviderClient>) -> Self {
        self.clients.push(client);
        self
    }

    pub fn clients(mut self, clients: impl IntoIterator<Item = Arc<dyn ProviderClient>>) -> Self {
        self.clients.extend(clients);
        self
    }

    pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> IntegrationHub {
        let (events, _) = broadcast::channel(self.event_capacity);
        let orchestrator = SyncOrchestrator::new(self.progress_interval);

        // A later client for the same provider replaces an earlier one.
        let sessions = self
            .clients
            .into_iter()
            .map(|client| {
                let provider = client.provider();
                let session = ProviderSession::new(client, orchestrator.clone(), events.clone());
                (provider, session)
            })
            .collect();

        IntegrationHub {
            sessions,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new())),
            events,
        }
    }
}

/// Entry point for display layers. Every operation is scoped to one provider;
/// providers never share state.
pub struct IntegrationHub {
    sessions: BTreeMap<ProviderId, ProviderSession>,
    store: Arc<dyn CredentialStore>,
    events: broadcast::Sender<HubEvent>,
}

impl IntegrationHub {
    pub fn builder() -> HubBuilder {
        HubBuilder {
            clients: Vec::new(),
            store: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Build a hub with one backend-backed client per enabled provider.
    pub fn from_config(config: &PathwayConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let clients = build_clients(config)?;
        info!(
            instance = %config.pathway.instance_name,
            providers = clients.len(),
            "Integration hub ready"
        );
        Ok(Self::builder()
            .clients(clients)
            .store(store)
            .progress_interval(config.sync.progress_interval())
            .build())
    }

    pub fn providers(&self) -> Vec<ProviderId> {
        self.sessions.keys().copied().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.events.subscribe()
    }

    fn session(&self, provider: ProviderId) -> Result<&ProviderSession> {
        self.sessions
            .get(&provider)
            .ok_or(PathwayError::UnknownProvider(provider))
    }

    /// Connect with the given credentials, persist them, then load the
    /// provider's containers.
    ///
    /// Persistence and the follow-up enumeration are best effort: their
    /// failures are logged and the provider stays connected.
    pub async fn connect(
        &self,
        provider: ProviderId,
        credentials: &Credentials,
    ) -> Result<ConnectionState> {
        let session = self.session(provider)?;
        let account = session.connect(credentials).await?;

        let stored = credentials.validated(provider, provider.auth_kind())?;
        if let Err(e) = self.store.save(provider, &stored).await {
            warn!(%provider, error = %e, "Failed to persist credentials");
        }

        match session.enumerate().await {
            Ok(containers) => {
                info!(%provider, account = %account.name, count = containers.len(), "Containers loaded");
            }
            Err(e) => warn!(%provider, error = %e, "Container enumeration after connect failed"),
        }

        Ok(session.connection_state().await)
    }

    /// Connect using the stored credentials, if there are any.
    pub async fn reconnect(&self, provider: ProviderId) -> Result<Option<ConnectionState>> {
        match self.restore_credentials(provider).await? {
            Some(credentials) => self.connect(provider, &credentials).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn restore_credentials(&self, provider: ProviderId) -> Result<Option<Credentials>> {
        self.session(provider)?;
        self.store.load(provider).await
    }

    /// Disconnect and forget the stored credentials.
    pub async fn disconnect(&self, provider: ProviderId) -> Result<()> {
        self.session(provider)?.disconnect().await;
        if let Err(e) = self.store.remove(provider).await {
            warn!(%provider, error = %e, "Failed to remove stored credentials");
        }
        Ok(())
    }

    pub async fn enumerate(&self, provider: ProviderId) -> Result<Vec<Container>> {
        self.session(provider)?.enumerate().await
    }

    pub async fn select(&self, provider: ProviderId, container_id: &str) -> Result<Selection> {
        self.session(provider)?.select(container_id).await
    }

    pub async fn synchronize(
        &self,
        provider: ProviderId,
        options: &SyncOptions,
    ) -> Result<Arc<SyncResult>> {
        self.session(provider)?.synchronize(options).await
    }

    pub async fn check_health(&self, provider: ProviderId) -> Result<HealthStatus> {
        Ok(self.session(provider)?.check_health().await)
    }

    pub async fn connection_state(&self, provider: ProviderId) -> Result<ConnectionState> {
        Ok(self.session(provider)?.connection_state().await)
    }

    pub async fn account_info(&self, provider: ProviderId) -> Result<Option<AccountInfo>> {
        Ok(self.session(provider)?.account_info().await)
    }

    pub async fn containers(&self, provider: ProviderId) -> Result<Vec<Container>> {
        Ok(self.session(provider)?.containers().await)
    }

    pub async fn selection(&self, provider: ProviderId) -> Result<Option<Selection>> {
        Ok(self.session(provider)?.selection().await)
    }

    pub async fn sync_result(&self, provider: ProviderId) -> Result<Option<Arc<SyncResult>>> {
        Ok(self.session(provider)?.sync_result().await)
    }

    pub async fn last_progress(&self, provider: ProviderId) -> Result<Option<SyncProgress>> {
        Ok(self.session(provider)?.last_progress().await)
    }
}
