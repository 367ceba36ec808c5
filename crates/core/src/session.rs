//! One provider's connection, containers, selection and sync result.
//!
//! All state sits behind one lock that is never held across a network call.
//! Connect, enumerate and sync are mutually exclusive per provider; overlapping
//! calls fail fast. Select and disconnect are always accepted and cancel an
//! in-flight operation they invalidate, whose late result is then discarded.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::{failure_reason, ConnectionController};
use crate::error::{PathwayError, Result};
use crate::events::HubEvent;
use crate::models::connection::{AccountInfo, ConnectionState, HealthStatus};
use crate::models::container::{Container, Selection};
use crate::models::credentials::Credentials;
use crate::models::provider::ProviderId;
use crate::models::sync::{SyncOptions, SyncProgress, SyncResult};
use crate::providers::ProviderClient;
use crate::selection::{ContainerSelector, SelectOutcome};
use crate::sync::SyncOrchestrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Connect,
    Enumerate,
    Sync,
}

impl Operation {
    fn as_str(&self) -> &'static str {
        match self {
            Operation::Connect => "connect",
            Operation::Enumerate => "container enumeration",
            Operation::Sync => "sync",
        }
    }
}

struct InFlight {
    operation: Operation,
    ticket: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct SessionState {
    connection: ConnectionController,
    selector: ContainerSelector,
    in_flight: Option<InFlight>,
    next_ticket: u64,
    result: Option<Arc<SyncResult>>,
    last_progress: Option<SyncProgress>,
}

impl SessionState {
    fn operation(&self) -> Option<Operation> {
        self.in_flight.as_ref().map(|f| f.operation)
    }

    /// Fail fast when another suspending operation holds the provider.
    fn ensure_idle(&self, provider: ProviderId, requested: Operation) -> Result<()> {
        match (self.operation(), requested) {
            (None, _) => Ok(()),
            (Some(Operation::Connect), Operation::Connect) => {
                Err(PathwayError::ConcurrentConnect { provider })
            }
            (Some(Operation::Sync), Operation::Sync) => {
                Err(PathwayError::SyncInProgress { provider })
            }
            (Some(op), _) => Err(PathwayError::ProviderBusy {
                provider,
                operation: op.as_str(),
            }),
        }
    }

    fn begin(&mut self, operation: Operation) -> (u64, CancellationToken) {
        self.next_ticket += 1;
        let cancel = CancellationToken::new();
        self.in_flight = Some(InFlight {
            operation,
            ticket: self.next_ticket,
            cancel: cancel.clone(),
        });
        (self.next_ticket, cancel)
    }

    /// Release the in-flight slot. False when the operation was abandoned.
    fn finish(&mut self, ticket: u64) -> bool {
        match &self.in_flight {
            Some(f) if f.ticket == ticket => {
                self.in_flight = None;
                true
            }
            _ => false,
        }
    }

    fn abort_in_flight(&mut self) {
        if let Some(f) = self.in_flight.take() {
            debug!(operation = f.operation.as_str(), "Abandoning in-flight operation");
            f.cancel.cancel();
        }
    }

    fn clear_result(&mut self) {
        self.result = None;
        self.last_progress = None;
    }
}

pub struct ProviderSession {
    client: Arc<dyn ProviderClient>,
    orchestrator: SyncOrchestrator,
    events: broadcast::Sender<HubEvent>,
    state: Mutex<SessionState>,
}

impl ProviderSession {
    pub fn new(
        client: Arc<dyn ProviderClient>,
        orchestrator: SyncOrchestrator,
        events: broadcast::Sender<HubEvent>,
    ) -> Self {
        Self {
            client,
            orchestrator,
            events,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn provider(&self) -> ProviderId {
        self.client.provider()
    }

    fn publish(&self, event: HubEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn publish_state(&self, state: &ConnectionState) {
        self.publish(HubEvent::ConnectionChanged {
            provider: self.provider(),
            state: state.clone(),
        });
    }

    /// Validate credentials and run the provider handshake.
    ///
    /// Incomplete credentials are rejected before any state change or network call.
    pub async fn connect(&self, credentials: &Credentials) -> Result<AccountInfo> {
        let provider = self.provider();
        let credentials = credentials.validated(provider, self.client.auth_kind())?;

        let (ticket, cancel) = {
            let mut state = self.state.lock().await;
            state.ensure_idle(provider, Operation::Connect)?;
            state.connection.begin(provider)?;
            self.publish_state(state.connection.state());
            state.begin(Operation::Connect)
        };

        debug!(%provider, base_url = %credentials.base_url, "Connecting");
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PathwayError::Abandoned { provider }),
            res = self.client.authenticate(&credentials) => res,
        };

        let mut state = self.state.lock().await;
        if !state.finish(ticket) {
            return Err(PathwayError::Abandoned { provider });
        }

        match outcome {
            Ok(account) => {
                state.connection.succeed(account.clone());
                self.publish_state(state.connection.state());
                info!(%provider, account = %account.name, "Connected");
                Ok(account)
            }
            Err(err) => {
                state.connection.fail(failure_reason(&err));
                self.publish_state(state.connection.state());
                warn!(%provider, error = %err, "Connection failed");
                Err(err)
            }
        }
    }

    /// Drop the connection and everything derived from it. Cancels any
    /// in-flight operation.
    pub async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        state.abort_in_flight();
        state.connection.reset();
        state.selector.clear();
        state.clear_result();
        self.publish_state(state.connection.state());
        info!(provider = %self.provider(), "Disconnected");
    }

    /// Fetch the provider's containers, replacing the current set on success.
    pub async fn enumerate(&self) -> Result<Vec<Container>> {
        let provider = self.provider();
        let (ticket, cancel) = {
            let mut state = self.state.lock().await;
            state.connection.require_connected(provider)?;
            state.ensure_idle(provider, Operation::Enumerate)?;
            state.begin(Operation::Enumerate)
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PathwayError::Abandoned { provider }),
            res = self.client.list_containers() => res,
        };

        let mut state = self.state.lock().await;
        if !state.finish(ticket) {
            return Err(PathwayError::Abandoned { provider });
        }
        let containers = outcome?;

        if state.selector.replace(containers.clone()) {
            debug!(%provider, "Selected container no longer listed");
            state.clear_result();
        }
        self.publish(HubEvent::ContainersLoaded {
            provider,
            count: containers.len(),
        });
        Ok(containers)
    }

    /// Select a container. Reselecting the current one changes nothing; a
    /// different one clears the result and abandons an in-flight sync.
    pub async fn select(&self, container_id: &str) -> Result<Selection> {
        let provider = self.provider();
        let mut state = self.state.lock().await;
        state.connection.require_connected(provider)?;
        if let Some(op @ (Operation::Connect | Operation::Enumerate)) = state.operation() {
            return Err(PathwayError::ProviderBusy {
                provider,
                operation: op.as_str(),
            });
        }

        let outcome = state.selector.select(provider, container_id)?;
        if let SelectOutcome::Changed(selection) = &outcome {
            if state.operation() == Some(Operation::Sync) {
                state.abort_in_flight();
            }
            state.clear_result();
            info!(%provider, container = %selection.container.display_name, "Container selected");
        }

        let selection = outcome.into_selection();
        self.publish(HubEvent::ContainerSelected(selection.clone()));
        Ok(selection)
    }

    /// Sync the selected container.
    pub async fn synchronize(&self, options: &SyncOptions) -> Result<Arc<SyncResult>> {
        let provider = self.provider();
        let (ticket, cancel, container_id) = {
            let mut state = self.state.lock().await;
            state.connection.require_connected(provider)?;
            state.ensure_idle(provider, Operation::Sync)?;
            let container_id = state
                .selector
                .selected()
                .map(|s| s.container_id().to_string())
                .ok_or(PathwayError::NothingSelected { provider })?;
            let (ticket, cancel) = state.begin(Operation::Sync);
            (ticket, cancel, container_id)
        };

        let mut last = None;
        let outcome = self
            .orchestrator
            .run(
                self.client.as_ref(),
                &container_id,
                options,
                &cancel,
                |progress| {
                    if cancel.is_cancelled() {
                        return;
                    }
                    self.publish(HubEvent::SyncProgress {
                        provider,
                        progress: progress.clone(),
                    });
                    last = Some(progress);
                },
            )
            .await;

        let mut state = self.state.lock().await;
        if !state.finish(ticket) {
            return Err(PathwayError::Abandoned { provider });
        }
        state.last_progress = last;

        match outcome {
            Ok(result) => {
                let result = Arc::new(result);
                state.result = Some(result.clone());
                self.publish(HubEvent::SyncCompleted(result.clone()));
                Ok(result)
            }
            Err(err) => {
                self.publish(HubEvent::SyncFailed {
                    provider,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub async fn check_health(&self) -> HealthStatus {
        self.client.check_health().await
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.state.lock().await.connection.state().clone()
    }

    pub async fn account_info(&self) -> Option<AccountInfo> {
        self.state.lock().await.connection.account().cloned()
    }

    pub async fn containers(&self) -> Vec<Container> {
        self.state.lock().await.selector.containers().to_vec()
    }

    pub async fn selection(&self) -> Option<Selection> {
        self.state.lock().await.selector.selected().cloned()
    }

    pub async fn sync_result(&self) -> Option<Arc<SyncResult>> {
        self.state.lock().await.result.clone()
    }

    /// The final progress step of the most recent finished sync.
    pub async fn last_progress(&self) -> Option<SyncProgress> {
        self.state.lock().await.last_progress.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::models::sync::SYNC_FAILED_LABEL;
    use crate::testing::{containers, credentials_for, sync_body, FakeProvider};

    fn session(fake: &Arc<FakeProvider>) -> Arc<ProviderSession> {
        let (events, _) = broadcast::channel(64);
        Arc::new(ProviderSession::new(
            fake.clone(),
            SyncOrchestrator::new(Duration::from_millis(100)),
            events,
        ))
    }

    async fn connected(provider: ProviderId) -> (Arc<FakeProvider>, Arc<ProviderSession>) {
        let fake = Arc::new(FakeProvider::new(provider));
        let session = session(&fake);
        session.connect(&credentials_for(provider)).await.unwrap();
        session.enumerate().await.unwrap();
        (fake, session)
    }

    async fn wait_for(counter: &std::sync::atomic::AtomicUsize, value: usize) {
        while counter.load(Ordering::SeqCst) < value {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn incomplete_credentials_never_reach_the_network() {
        let fake = Arc::new(FakeProvider::new(ProviderId::PowerSchool));
        let session = session(&fake);

        let err = session
            .connect(&Credentials::new("ps.example.org", "client-id"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PathwayError::CredentialIncomplete { ref missing, .. } if missing == &vec!["client_secret"]
        ));
        assert_eq!(fake.auth_calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.connection_state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn blank_credentials_are_rejected_for_every_provider() {
        for provider in ProviderId::ALL {
            let fake = Arc::new(FakeProvider::new(provider));
            let session = session(&fake);

            let err = session
                .connect(&Credentials::new(" ", "").with_secondary(""))
                .await
                .unwrap_err();
            match err {
                PathwayError::CredentialIncomplete { missing, .. } => {
                    assert_eq!(missing, provider.auth_kind().required_fields());
                }
                other => panic!("{provider}: expected CredentialIncomplete, got {other:?}"),
            }
            assert_eq!(fake.auth_calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn failed_handshake_records_reason() {
        let fake = Arc::new(FakeProvider::new(ProviderId::Canvas));
        fake.fail_auth("Invalid access token");
        let session = session(&fake);

        let err = session
            .connect(&credentials_for(ProviderId::Canvas))
            .await
            .unwrap_err();
        assert!(matches!(err, PathwayError::AuthFailed(_)));
        assert_eq!(
            session.connection_state().await,
            ConnectionState::Failed("Invalid access token".into())
        );
        assert!(session.account_info().await.is_none());
    }

    #[tokio::test]
    async fn second_connect_while_connecting_is_rejected() {
        let fake = Arc::new(FakeProvider::new(ProviderId::Canvas));
        let gate = fake.hold_auth();
        let session = session(&fake);

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.connect(&credentials_for(ProviderId::Canvas)).await }
        });
        wait_for(&fake.auth_calls, 1).await;
        assert_eq!(session.connection_state().await, ConnectionState::Connecting);

        let err = session
            .connect(&credentials_for(ProviderId::Canvas))
            .await
            .unwrap_err();
        assert!(matches!(err, PathwayError::ConcurrentConnect { .. }));

        gate.notify_one();
        let account = first.await.unwrap().unwrap();
        assert_eq!(account.name, "Demo U");
        assert_eq!(fake.auth_calls.load(Ordering::SeqCst), 1);
        assert!(session.connection_state().await.is_connected());
    }

    #[tokio::test]
    async fn operations_require_a_connection() {
        let fake = Arc::new(FakeProvider::new(ProviderId::Canvas));
        let session = session(&fake);

        assert!(matches!(
            session.enumerate().await.unwrap_err(),
            PathwayError::NotConnected { .. }
        ));
        assert!(matches!(
            session.select("1").await.unwrap_err(),
            PathwayError::NotConnected { .. }
        ));
        assert!(matches!(
            session.synchronize(&SyncOptions::default()).await.unwrap_err(),
            PathwayError::NotConnected { .. }
        ));
        assert_eq!(fake.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sync_without_selection_fails() {
        let (fake, session) = connected(ProviderId::Canvas).await;
        let err = session
            .synchronize(&SyncOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PathwayError::NothingSelected { .. }));
        assert_eq!(fake.sync_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_enumeration_keeps_previous_containers() {
        let (fake, session) = connected(ProviderId::Canvas).await;
        fake.fail_containers("rate limited");

        let err = session.enumerate().await.unwrap_err();
        assert_eq!(err.upstream_message(), Some("rate limited"));
        assert_eq!(session.containers().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_operations_fail_fast_during_sync() {
        let (fake, session) = connected(ProviderId::Canvas).await;
        session.select("1").await.unwrap();
        let gate = fake.hold_sync();

        let running = tokio::spawn({
            let session = session.clone();
            async move { session.synchronize(&SyncOptions::default()).await }
        });
        wait_for(&fake.sync_calls, 1).await;

        assert!(matches!(
            session
                .synchronize(&SyncOptions::default())
                .await
                .unwrap_err(),
            PathwayError::SyncInProgress { .. }
        ));
        assert!(matches!(
            session.enumerate().await.unwrap_err(),
            PathwayError::ProviderBusy {
                operation: "sync",
                ..
            }
        ));
        assert!(matches!(
            session
                .connect(&credentials_for(ProviderId::Canvas))
                .await
                .unwrap_err(),
            PathwayError::ProviderBusy { .. }
        ));

        // Reselecting the same container does not disturb the sync.
        session.select("1").await.unwrap();

        gate.notify_one();
        let result = running.await.unwrap().unwrap();
        assert_eq!(result.summary.total_students, 3);
        assert_eq!(fake.sync_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.last_progress().await.unwrap().percent, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_another_container_abandons_the_sync() {
        let (fake, session) = connected(ProviderId::Canvas).await;
        session.select("1").await.unwrap();
        let _gate = fake.hold_sync();

        let stale = tokio::spawn({
            let session = session.clone();
            async move { session.synchronize(&SyncOptions::default()).await }
        });
        wait_for(&fake.sync_calls, 1).await;

        session.select("2").await.unwrap();
        assert!(matches!(
            stale.await.unwrap().unwrap_err(),
            PathwayError::Abandoned { .. }
        ));
        assert!(session.sync_result().await.is_none());
        assert!(session.last_progress().await.is_none());

        fake.release_sync();
        let fresh = session.synchronize(&SyncOptions::default()).await.unwrap();
        assert_eq!(fresh.container_id, "2");
        assert_eq!(
            session.sync_result().await.unwrap().run_id,
            fresh.run_id
        );
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_during_sync_discards_everything() {
        let (fake, session) = connected(ProviderId::PowerSchool).await;
        session.select("2").await.unwrap();
        let _gate = fake.hold_sync();

        let running = tokio::spawn({
            let session = session.clone();
            async move { session.synchronize(&SyncOptions::default()).await }
        });
        wait_for(&fake.sync_calls, 1).await;

        session.disconnect().await;
        assert!(matches!(
            running.await.unwrap().unwrap_err(),
            PathwayError::Abandoned { .. }
        ));
        assert_eq!(session.connection_state().await, ConnectionState::Disconnected);
        assert!(session.containers().await.is_empty());
        assert!(session.selection().await.is_none());
        assert!(session.sync_result().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_sync_keeps_previous_result() {
        let (fake, session) = connected(ProviderId::Canvas).await;
        session.select("1").await.unwrap();
        let first = session.synchronize(&SyncOptions::default()).await.unwrap();

        fake.fail_sync("backend unavailable");
        let err = session
            .synchronize(&SyncOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PathwayError::Sync { .. }));
        assert_eq!(session.sync_result().await.unwrap().run_id, first.run_id);
        assert_eq!(
            session.last_progress().await.unwrap().label,
            SYNC_FAILED_LABEL
        );
    }

    #[tokio::test(start_paused = true)]
    async fn enumeration_dropping_the_selected_container_clears_the_result() {
        let (fake, session) = connected(ProviderId::Canvas).await;
        session.select("2").await.unwrap();
        fake.set_sync_body(sync_body(&[0.2]));
        session.synchronize(&SyncOptions::default()).await.unwrap();

        fake.set_containers(containers(1));
        session.enumerate().await.unwrap();
        assert!(session.selection().await.is_none());
        assert!(session.sync_result().await.is_none());
    }
}
