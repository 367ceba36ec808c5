use std::path::Path;

use pathway_core::config::PathwayConfig;
use pathway_core::store::CREDENTIALS_FILE;
use tracing::info;

/// Run the `init` command: create the data directory and write a default config.
pub async fn run(data_dir: &str, backend_url: &str) -> anyhow::Result<()> {
    let data_path = Path::new(data_dir);

    if !data_path.exists() {
        std::fs::create_dir_all(data_path)?;
        info!("Created data directory: {}", data_dir);
    }

    let mut config = PathwayConfig::generate_default();
    config.pathway.data_dir = data_dir.to_string();
    config.backend.url = backend_url.trim_end_matches('/').to_string();
    config.validate()?;

    let config_path = data_path.join("pathway.toml");
    if config_path.exists() {
        anyhow::bail!(
            "{} already exists; remove it first to re-initialize",
            config_path.display()
        );
    }

    let toml_str = toml::to_string_pretty(&config)?;
    std::fs::write(&config_path, &toml_str)?;
    info!("Wrote configuration to {}", config_path.display());

    println!("Pathway initialized successfully!");
    println!("  Data directory: {}", data_dir);
    println!("  Configuration:  {}", config_path.display());
    println!("  Backend:        {}", config.backend.url);
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit {} to set backend.token and disable unused providers",
        config_path.display()
    );
    println!(
        "  2. Run `pathway credentials set --provider canvas ...` (stored in {})",
        data_path.join(CREDENTIALS_FILE).display()
    );
    println!("  3. Run `pathway containers --provider canvas` to test the connection");

    Ok(())
}
