//! Scriptable provider client shared by the unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::{PathwayError, Result};
use crate::models::connection::{AccountInfo, HealthStatus};
use crate::models::container::Container;
use crate::models::credentials::Credentials;
use crate::models::provider::{AuthKind, ProviderId};
use crate::models::sync::{ProgressStep, SyncOptions};
use crate::providers::{decode, ProviderClient, RawSyncResponse};

pub(crate) const TEST_PLAN: &[ProgressStep] = &[
    ProgressStep::new(10, "Connecting"),
    ProgressStep::new(40, "Fetching roster"),
    ProgressStep::new(70, "Running risk predictions"),
    ProgressStep::new(100, "Complete"),
];

pub(crate) struct FakeProvider {
    provider: ProviderId,
    pub auth_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub sync_calls: AtomicUsize,
    auth: Mutex<std::result::Result<String, String>>,
    containers: Mutex<std::result::Result<Vec<Container>, String>>,
    sync: Mutex<std::result::Result<Value, String>>,
    sync_delay: Mutex<Duration>,
    auth_gate: Mutex<Option<Arc<Notify>>>,
    sync_gate: Mutex<Option<Arc<Notify>>>,
    cancel_on_response: Mutex<Option<CancellationToken>>,
}

impl FakeProvider {
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            auth_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            sync_calls: AtomicUsize::new(0),
            auth: Mutex::new(Ok("Demo U".into())),
            containers: Mutex::new(Ok(containers(2))),
            sync: Mutex::new(Ok(sync_body(&[0.9, 0.5, 0.1]))),
            sync_delay: Mutex::new(Duration::ZERO),
            auth_gate: Mutex::new(None),
            sync_gate: Mutex::new(None),
            cancel_on_response: Mutex::new(None),
        }
    }

    pub fn fail_auth(&self, message: &str) {
        *self.auth.lock().unwrap() = Err(message.into());
    }

    pub fn fail_containers(&self, message: &str) {
        *self.containers.lock().unwrap() = Err(message.into());
    }

    pub fn set_containers(&self, containers: Vec<Container>) {
        *self.containers.lock().unwrap() = Ok(containers);
    }

    pub fn set_sync_body(&self, body: Value) {
        *self.sync.lock().unwrap() = Ok(body);
    }

    pub fn fail_sync(&self, message: &str) {
        *self.sync.lock().unwrap() = Err(message.into());
    }

    pub fn set_sync_delay(&self, delay: Duration) {
        *self.sync_delay.lock().unwrap() = delay;
    }

    /// Hold every subsequent handshake until the returned handle is notified.
    pub fn hold_auth(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.auth_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Hold every subsequent sync call until the returned handle is notified.
    pub fn hold_sync(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.sync_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Cancel `token` just as the next sync response resolves.
    pub fn cancel_on_response(&self, token: CancellationToken) {
        *self.cancel_on_response.lock().unwrap() = Some(token);
    }

    pub fn release_sync(&self) {
        *self.sync_gate.lock().unwrap() = None;
    }

    fn raw(&self, body: Value) -> Result<RawSyncResponse> {
        Ok(match self.provider {
            ProviderId::Canvas => RawSyncResponse::Canvas(decode(self.provider, "sync", body)?),
            ProviderId::PowerSchool => {
                RawSyncResponse::PowerSchool(decode(self.provider, "sync", body)?)
            }
            ProviderId::GoogleClassroom => {
                RawSyncResponse::GoogleClassroom(decode(self.provider, "sync", body)?)
            }
        })
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    fn auth_kind(&self) -> AuthKind {
        self.provider.auth_kind()
    }

    fn progress_plan(&self) -> &'static [ProgressStep] {
        TEST_PLAN
    }

    async fn check_health(&self) -> HealthStatus {
        HealthStatus {
            reachable: true,
            authenticated: true,
        }
    }

    async fn authenticate(&self, _credentials: &Credentials) -> Result<AccountInfo> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.auth_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let outcome = self.auth.lock().unwrap().clone();
        outcome
            .map(|name| AccountInfo {
                name,
                resource_count: 2,
                rate_limit_remaining: None,
            })
            .map_err(PathwayError::AuthFailed)
    }

    async fn list_containers(&self) -> Result<Vec<Container>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.containers.lock().unwrap().clone();
        outcome.map_err(|message| PathwayError::Upstream {
            status: Some(500),
            message,
        })
    }

    async fn sync_container(
        &self,
        _container_id: &str,
        _options: &SyncOptions,
    ) -> Result<RawSyncResponse> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.sync_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let gate = self.sync_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(token) = self.cancel_on_response.lock().unwrap().take() {
            token.cancel();
        }
        let outcome = self.sync.lock().unwrap().clone();
        match outcome {
            Ok(body) => self.raw(body),
            Err(message) => Err(PathwayError::Upstream {
                status: Some(502),
                message,
            }),
        }
    }
}

pub(crate) fn containers(count: usize) -> Vec<Container> {
    (1..=count)
        .map(|i| Container {
            id: i.to_string(),
            display_name: format!("Course {i}"),
            member_count: 20 + i as u32,
            metadata: BTreeMap::new(),
        })
        .collect()
}

pub(crate) fn sync_body(scores: &[f64]) -> Value {
    let students: Vec<Value> = scores
        .iter()
        .enumerate()
        .map(|(i, score)| json!({"studentId": format!("s{i}"), "riskScore": score}))
        .collect();
    json!({"status": "success", "studentsProcessed": scores.len(), "predictions": students})
}

pub(crate) fn credentials_for(provider: ProviderId) -> Credentials {
    match provider.auth_kind() {
        AuthKind::BearerToken => Credentials::new("canvas.example.edu", "abc"),
        AuthKind::ClientCredentials => {
            Credentials::new("ps.example.org", "client-id").with_secondary("client-secret")
        }
        AuthKind::DemoOAuth => Credentials::new("classroom.googleapis.com", "client-id"),
    }
}
