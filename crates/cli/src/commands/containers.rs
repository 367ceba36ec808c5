use pathway_core::models::container::Container;

use super::{connect, load_config, open_hub, parse_provider};

/// Run the `containers` command: connect and list courses or schools.
pub async fn run(config_path: &str, provider: &str) -> anyhow::Result<()> {
    let provider = parse_provider(provider)?;
    let config = load_config(config_path)?;
    let hub = open_hub(&config)?;

    connect(&hub, &config, provider).await?;

    if let Some(account) = hub.account_info(provider).await? {
        println!("Connected to {} as {}", provider.display_name(), account.name);
    }

    let containers = hub.containers(provider).await?;
    if containers.is_empty() {
        println!("No containers found.");
        return Ok(());
    }

    println!();
    println!("{:<12} {:<40} Members", "Id", "Name");
    for container in &containers {
        println!("{}", format_row(container));
    }

    Ok(())
}

fn format_row(container: &Container) -> String {
    format!(
        "{:<12} {:<40} {}",
        container.id, container.display_name, container.member_count
    )
}
