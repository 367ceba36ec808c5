use pathway_core::store::CredentialStore;

use super::{credential_store, load_config, open_hub};

/// Run the `status` command: show health and credential state per provider.
pub async fn run(config_path: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let hub = open_hub(&config)?;
    let store = credential_store(&config);

    println!("Pathway Status");
    println!("==============");
    println!("Instance: {}", config.pathway.instance_name);
    println!("Backend:  {}", config.backend.url);
    println!();

    let providers = hub.providers();
    if providers.is_empty() {
        println!("No providers enabled.");
        return Ok(());
    }

    println!("{:<18} {:<10} {:<14} Credentials", "Provider", "Reachable", "Authenticated");
    for provider in providers {
        let health = hub.check_health(provider).await?;
        let credentials = if store.load(provider).await?.is_some() {
            "stored"
        } else if config.provider(provider).credentials().is_some() {
            "config"
        } else {
            "none"
        };
        println!(
            "{:<18} {:<10} {:<14} {}",
            provider.display_name(),
            yes_no(health.reachable),
            yes_no(health.authenticated),
            credentials
        );
    }

    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
