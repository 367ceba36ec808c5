//! Error types for the Pathway core crate.

use thiserror::Error;

use crate::models::provider::ProviderId;

/// Top-level error type for all Pathway core operations.
#[derive(Debug, Error)]
pub enum PathwayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered, but with a non-2xx status or a `status: "error"` envelope.
    #[error("upstream error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("{provider} credentials are incomplete: missing {}", .missing.join(", "))]
    CredentialIncomplete {
        provider: ProviderId,
        missing: Vec<&'static str>,
    },

    #[error("{provider} is already connecting")]
    ConcurrentConnect { provider: ProviderId },

    #[error("{provider} already has a sync in progress")]
    SyncInProgress { provider: ProviderId },

    #[error("{provider} is busy with {operation}")]
    ProviderBusy {
        provider: ProviderId,
        operation: &'static str,
    },

    #[error("{provider} is not connected")]
    NotConnected { provider: ProviderId },

    #[error("{provider} has no container with id {container_id}")]
    UnknownContainer {
        provider: ProviderId,
        container_id: String,
    },

    #[error("{provider} has no container selected")]
    NothingSelected { provider: ProviderId },

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("sync failed during {stage}: {cause}")]
    Sync {
        stage: String,
        #[source]
        cause: Box<PathwayError>,
    },

    #[error("malformed response from {provider}: {reason}")]
    MalformedResponse {
        provider: ProviderId,
        reason: String,
    },

    /// The provider was disconnected or reselected while the operation was in flight.
    #[error("{provider} operation was abandoned")]
    Abandoned { provider: ProviderId },

    #[error("provider {0} is not registered")]
    UnknownProvider(ProviderId),
}

impl PathwayError {
    /// The message to surface for an upstream failure, without the variant prefix.
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            PathwayError::Upstream { message, .. } => Some(message),
            PathwayError::AuthFailed(message) => Some(message),
            _ => None,
        }
    }
}

/// A convenience Result alias that defaults to [`PathwayError`].
pub type Result<T> = std::result::Result<T, PathwayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = PathwayError::Config("missing field".into());
        assert_eq!(err.to_string(), "configuration error: missing field");
    }

    #[test]
    fn io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = PathwayError::from(io_err);
        assert!(matches!(err, PathwayError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn credential_incomplete_lists_missing_fields() {
        let err = PathwayError::CredentialIncomplete {
            provider: ProviderId::PowerSchool,
            missing: vec!["client_id", "client_secret"],
        };
        assert_eq!(
            err.to_string(),
            "powerschool credentials are incomplete: missing client_id, client_secret"
        );
    }

    #[test]
    fn sync_error_keeps_cause_as_source() {
        let err = PathwayError::Sync {
            stage: "Fetching course roster".into(),
            cause: Box::new(PathwayError::Upstream {
                status: Some(502),
                message: "bad gateway".into(),
            }),
        };
        assert_eq!(
            err.to_string(),
            "sync failed during Fetching course roster: upstream error: bad gateway"
        );
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "upstream error: bad gateway");
    }

    #[test]
    fn upstream_message_strips_prefix() {
        let err = PathwayError::Upstream {
            status: None,
            message: "Invalid access token".into(),
        };
        assert_eq!(err.upstream_message(), Some("Invalid access token"));
        assert_eq!(PathwayError::Config("x".into()).upstream_message(), None);
    }

    #[test]
    fn result_alias_works() {
        let ok: Result<i32> = Ok(42);
        assert!(ok.is_ok());

        let err: Result<i32> = Err(PathwayError::NotConnected {
            provider: ProviderId::Canvas,
        });
        assert_eq!(err.unwrap_err().to_string(), "canvas is not connected");
    }
}
