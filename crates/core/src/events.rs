use std::sync::Arc;

use crate::models::connection::ConnectionState;
use crate::models::container::Selection;
use crate::models::provider::ProviderId;
use crate::models::sync::{SyncProgress, SyncResult};

/// State changes published to display layers.
#[derive(Debug, Clone)]
pub enum HubEvent {
    ConnectionChanged {
        provider: ProviderId,
        state: ConnectionState,
    },
    ContainersLoaded {
        provider: ProviderId,
        count: usize,
    },
    ContainerSelected(Selection),
    SyncProgress {
        provider: ProviderId,
        progress: SyncProgress,
    },
    SyncFailed {
        provider: ProviderId,
        message: String,
    },
    SyncCompleted(Arc<SyncResult>),
}

impl HubEvent {
    pub fn provider(&self) -> ProviderId {
        match self {
            HubEvent::ConnectionChanged { provider, .. }
            | HubEvent::ContainersLoaded { provider, .. }
            | HubEvent::SyncProgress { provider, .. }
            | HubEvent::SyncFailed { provider, .. } => *provider,
            HubEvent::ContainerSelected(selection) => selection.provider,
            HubEvent::SyncCompleted(result) => result.provider,
        }
    }
}
