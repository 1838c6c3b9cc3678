use anyhow::Result;
use clap::Parser;
use lio_exporter::{config::Config, server};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// sysfs mount point (overrides config)
    #[arg(long, env = "LIO_SYSFS_PATH")]
    sysfs_path: Option<String>,

    /// configfs mount point (overrides config)
    #[arg(long, env = "LIO_CONFIGFS_PATH")]
    configfs_path: Option<String>,

    /// Port to listen on for metrics
    #[arg(short, long, env = "EXPORTER_PORT", default_value = "9638")]
    port: u16,

    /// Address to bind to
    #[arg(short, long, env = "EXPORTER_ADDR", default_value = "0.0.0.0")]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting iSCSI LIO Prometheus Exporter v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(&args.config)?;

    // Override with CLI arguments if provided
    if let Some(sysfs_path) = args.sysfs_path {
        config.lio.sysfs_path = sysfs_path;
    }
    if let Some(configfs_path) = args.configfs_path {
        config.lio.configfs_path = configfs_path;
    }
    config.server.port = args.port;
    config.server.addr = args.addr;

    info!("Configuration loaded successfully");
    info!("sysfs root: {}", config.lio.sysfs_path);
    info!("configfs root: {}", config.lio.configfs_path);
    info!(
        "Metrics endpoint: http://{}:{}/metrics",
        config.server.addr, config.server.port
    );

    // Start the metrics server
    if let Err(e) = server::start(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
