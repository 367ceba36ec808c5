use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "pathway",
    about = "Student risk insights from LMS and SIS providers",
    version
)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "pathway.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Initialize the Pathway data directory and configuration
    Init {
        /// Data directory path
        #[arg(long, default_value = "/var/lib/pathway")]
        data_dir: String,
        /// Analytics backend URL
        #[arg(long, default_value = "http://localhost:5000")]
        backend_url: String,
    },
    /// Show provider health and stored credentials
    Status,
    /// Connect to a provider and list its courses or schools
    Containers {
        /// Provider: canvas, powerschool or google_classroom
        #[arg(long)]
        provider: String,
    },
    /// Sync one course or school and print the risk summary
    Sync {
        #[arg(long)]
        provider: String,
        /// Course or school id
        #[arg(long)]
        container: String,
        /// Restrict to these grade levels (repeatable)
        #[arg(long = "grade-level")]
        grade_levels: Vec<String>,
        #[arg(long)]
        max_students: Option<u32>,
    },
    /// Manage stored provider credentials
    Credentials {
        #[command(subcommand)]
        action: CredentialsAction,
    },
}

#[derive(clap::Subcommand)]
enum CredentialsAction {
    /// Store credentials for a provider
    Set {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        base_url: String,
        /// Access token or OAuth client id
        #[arg(long)]
        secret: String,
        /// Client secret or authorization code
        #[arg(long)]
        secondary: Option<String>,
    },
    /// Forget stored credentials for a provider
    Clear {
        #[arg(long)]
        provider: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            data_dir,
            backend_url,
        } => {
            commands::init::run(&data_dir, &backend_url).await?;
        }
        Commands::Status => {
            commands::status::run(&cli.config).await?;
        }
        Commands::Containers { provider } => {
            commands::containers::run(&cli.config, &provider).await?;
        }
        Commands::Sync {
            provider,
            container,
            grade_levels,
            max_students,
        } => {
            let options = pathway_core::models::sync::SyncOptions {
                grade_levels,
                max_students,
            };
            commands::sync::run(&cli.config, &provider, &container, options).await?;
        }
        Commands::Credentials { action } => match action {
            CredentialsAction::Set {
                provider,
                base_url,
                secret,
                secondary,
            } => {
                commands::credentials::set(
                    &cli.config,
                    &provider,
                    &base_url,
                    &secret,
                    secondary.as_deref(),
                )
                .await?;
            }
            CredentialsAction::Clear { provider } => {
                commands::credentials::clear(&cli.config, &provider).await?;
            }
        },
    }

    Ok(())
}
