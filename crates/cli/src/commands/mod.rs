pub mod containers;
pub mod credentials;
pub mod init;
pub mod status;
pub mod sync;

use std::path::Path;
use std::sync::Arc;

use pathway_core::config::PathwayConfig;
use pathway_core::models::provider::ProviderId;
use pathway_core::store::FileCredentialStore;
use pathway_core::IntegrationHub;
use tracing::info;

pub(crate) fn load_config(config_path: &str) -> anyhow::Result<PathwayConfig> {
    let config = PathwayConfig::load(Path::new(config_path))?;
    config.validate()?;
    info!("Loaded configuration from {}", config_path);
    Ok(config)
}

pub(crate) fn credential_store(config: &PathwayConfig) -> FileCredentialStore {
    FileCredentialStore::in_dir(config.data_dir())
}

pub(crate) fn open_hub(config: &PathwayConfig) -> anyhow::Result<IntegrationHub> {
    Ok(IntegrationHub::from_config(
        config,
        Arc::new(credential_store(config)),
    )?)
}

pub(crate) fn parse_provider(raw: &str) -> anyhow::Result<ProviderId> {
    Ok(raw.parse()?)
}

/// Connect with stored credentials, falling back to the ones in the config file.
pub(crate) async fn connect(
    hub: &IntegrationHub,
    config: &PathwayConfig,
    provider: ProviderId,
) -> anyhow::Result<()> {
    let credentials = match hub.restore_credentials(provider).await? {
        Some(stored) => stored,
        None => config.provider(provider).credentials().ok_or_else(|| {
            anyhow::anyhow!(
                "No credentials for {provider}. Run `pathway credentials set --provider {provider}` \
                 or add them to the [{provider}] section of the config"
            )
        })?,
    };

    hub.connect(provider, &credentials).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_provider_accepts_aliases() {
        assert_eq!(parse_provider("canvas").unwrap(), ProviderId::Canvas);
        assert_eq!(
            parse_provider("google-classroom").unwrap(),
            ProviderId::GoogleClassroom
        );
        assert!(parse_provider("blackboard").is_err());
    }
}
