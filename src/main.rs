use anyhow::Result;
use clap::{Parser, Subcommand};
use prochost::{Application, ApplicationConfiguration, ServiceCatalog};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "prochost")]
#[command(about = "Application framework hosting pluggable services behind uniform HTTP endpoints")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, short, global = true, env = "PROCHOST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the application (default)
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,
        /// Override the bind port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Generate a sample configuration file
    InitConfig {
        /// Output path
        #[arg(long, default_value = "prochost.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::InitConfig { output }) => {
            ApplicationConfiguration::write_sample(&output)?;
            info!(path = %output.display(), "Sample configuration written");
            Ok(())
        }
        Some(Commands::Serve { host, port }) => serve(cli.config, host, port).await,
        None => serve(cli.config, None, None).await,
    }
}

async fn serve(
    config_file: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let mut config = ApplicationConfiguration::load(config_file.as_deref())?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    let catalog = ServiceCatalog::builtin();
    let app = Application::new(config.clone());

    // Register every catalog service; ones with a matching configuration
    // section come back configured, the rest stay available for on-demand
    // configure_and_start over HTTP.
    for (_, blueprint) in catalog.iter() {
        app.register_service(blueprint, None).await?;
    }
    for name in config.services.keys() {
        if !catalog.contains(name) {
            warn!(service = %name, "Configuration section has no matching service");
        }
    }

    app.serve().await
}
