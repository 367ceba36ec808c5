//! Per-provider connection state machine.

use crate::error::{PathwayError, Result};
use crate::models::connection::{AccountInfo, ConnectionState};
use crate::models::provider::ProviderId;

/// Reason recorded when the upstream failure carries no message of its own.
pub const GENERIC_CONNECT_FAILURE: &str = "connection failed";

/// Tracks `Disconnected -> Connecting -> Connected | Failed` for one provider.
#[derive(Debug, Default)]
pub struct ConnectionController {
    state: ConnectionState,
    account: Option<AccountInfo>,
}

impl ConnectionController {
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn account(&self) -> Option<&AccountInfo> {
        self.account.as_ref()
    }

    /// Enter `Connecting`. Rejected while a handshake is already running.
    pub fn begin(&mut self, provider: ProviderId) -> Result<()> {
        if self.state == ConnectionState::Connecting {
            return Err(PathwayError::ConcurrentConnect { provider });
        }
        self.state = ConnectionState::Connecting;
        self.account = None;
        Ok(())
    }

    pub fn succeed(&mut self, account: AccountInfo) {
        self.state = ConnectionState::Connected;
        self.account = Some(account);
    }

    pub fn fail(&mut self, reason: String) {
        self.state = ConnectionState::Failed(reason);
        self.account = None;
    }

    pub fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.account = None;
    }

    pub fn require_connected(&self, provider: ProviderId) -> Result<()> {
        if self.state.is_connected() {
            Ok(())
        } else {
            Err(PathwayError::NotConnected { provider })
        }
    }
}

/// The reason stored in `Failed(..)`: the upstream message, or a generic one.
pub fn failure_reason(err: &PathwayError) -> String {
    err.upstream_message()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| GENERIC_CONNECT_FAILURE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> AccountInfo {
        AccountInfo {
            name: "Demo U".into(),
            resource_count: 2,
            rate_limit_remaining: None,
        }
    }

    #[test]
    fn happy_path_transitions() {
        let mut controller = ConnectionController::default();
        assert_eq!(controller.state(), &ConnectionState::Disconnected);

        controller.begin(ProviderId::Canvas).unwrap();
        assert_eq!(controller.state(), &ConnectionState::Connecting);

        controller.succeed(account());
        assert!(controller.state().is_connected());
        assert_eq!(controller.account().unwrap().name, "Demo U");
        controller.require_connected(ProviderId::Canvas).unwrap();
    }

    #[test]
    fn begin_while_connecting_is_rejected() {
        let mut controller = ConnectionController::default();
        controller.begin(ProviderId::Canvas).unwrap();
        let err = controller.begin(ProviderId::Canvas).unwrap_err();
        assert!(matches!(
            err,
            PathwayError::ConcurrentConnect {
                provider: ProviderId::Canvas
            }
        ));
        assert_eq!(controller.state(), &ConnectionState::Connecting);
    }

    #[test]
    fn reconnect_from_connected_goes_back_to_connecting() {
        let mut controller = ConnectionController::default();
        controller.begin(ProviderId::Canvas).unwrap();
        controller.succeed(account());

        controller.begin(ProviderId::Canvas).unwrap();
        assert_eq!(controller.state(), &ConnectionState::Connecting);
        assert!(controller.account().is_none());
    }

    #[test]
    fn failure_records_reason() {
        let mut controller = ConnectionController::default();
        controller.begin(ProviderId::PowerSchool).unwrap();
        controller.fail("invalid_client".into());
        assert_eq!(
            controller.state(),
            &ConnectionState::Failed("invalid_client".into())
        );
        assert!(controller
            .require_connected(ProviderId::PowerSchool)
            .is_err());
    }

    #[test]
    fn reset_returns_to_disconnected() {
        let mut controller = ConnectionController::default();
        controller.begin(ProviderId::Canvas).unwrap();
        controller.succeed(account());
        controller.reset();
        assert_eq!(controller.state(), &ConnectionState::Disconnected);
        assert!(controller.account().is_none());
    }

    #[test]
    fn failure_reason_prefers_upstream_message() {
        let err = PathwayError::AuthFailed("Invalid access token".into());
        assert_eq!(failure_reason(&err), "Invalid access token");

        let err = PathwayError::Upstream {
            status: Some(500),
            message: "  ".into(),
        };
        assert_eq!(failure_reason(&err), GENERIC_CONNECT_FAILURE);

        let err = PathwayError::Serialization("bad json".into());
        assert_eq!(failure_reason(&err), GENERIC_CONNECT_FAILURE);
    }
}
