use pathway_core::models::credentials::Credentials;
use pathway_core::store::{CredentialStore, FileCredentialStore};
use tracing::info;

use super::{credential_store, load_config, parse_provider};

/// Run `credentials set`: validate and store credentials for a provider.
pub async fn set(
    config_path: &str,
    provider: &str,
    base_url: &str,
    secret: &str,
    secondary: Option<&str>,
) -> anyhow::Result<()> {
    let provider = parse_provider(provider)?;
    let config = load_config(config_path)?;
    let store = credential_store(&config);

    save(&store, provider, base_url, secret, secondary).await?;
    println!(
        "Stored {} credentials in {}",
        provider.display_name(),
        store.path().display()
    );
    Ok(())
}

/// Run `credentials clear`: forget stored credentials for a provider.
pub async fn clear(config_path: &str, provider: &str) -> anyhow::Result<()> {
    let provider = parse_provider(provider)?;
    let config = load_config(config_path)?;
    credential_store(&config).remove(provider).await?;
    info!(%provider, "Cleared stored credentials");
    println!("Cleared {} credentials", provider.display_name());
    Ok(())
}

async fn save(
    store: &FileCredentialStore,
    provider: pathway_core::models::provider::ProviderId,
    base_url: &str,
    secret: &str,
    secondary: Option<&str>,
) -> anyhow::Result<()> {
    let mut credentials = Credentials::new(base_url, secret);
    if let Some(secondary) = secondary {
        credentials = credentials.with_secondary(secondary);
    }
    let credentials = credentials.validated(provider, provider.auth_kind())?;
    store.save(provider, &credentials).await?;
    Ok(())
}
