use anyhow::{Context, Result};
use clap::Parser;
use sphynx::{ServerConfig, SphynxService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sphynx")]
#[command(about = "In-memory graph compute server")]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "SPHYNX_PORT", default_value_t = 50051)]
    port: u16,

    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Directory of the ordered disk tier
    #[arg(long, env = "ORDERED_SPHYNX_DATA_DIR")]
    ordered_data_dir: PathBuf,

    /// Directory reserved for unordered on-disk data
    #[arg(long, env = "UNORDERED_SPHYNX_DATA_DIR")]
    unordered_data_dir: PathBuf,

    /// Directory of cert.pem and private-key.pem files (for encryption)
    #[arg(long)]
    keydir: Option<PathBuf>,

    /// Background persistence workers
    #[arg(long, default_value_t = 4)]
    persist_workers: usize,

    /// Committed batches that may wait for persistence before Compute blocks
    #[arg(long, default_value_t = 1024)]
    persist_queue_capacity: usize,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        let mut config = ServerConfig::new()
            .host(&self.host)
            .port(self.port)
            .ordered_data_dir(self.ordered_data_dir)
            .unordered_data_dir(self.unordered_data_dir)
            .persist_workers(self.persist_workers)
            .persist_queue_capacity(self.persist_queue_capacity);
        if let Some(keydir) = self.keydir {
            config = config.key_dir(keydir);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Cli::parse().into_config();
    let service = Arc::new(
        SphynxService::from_config(&config).context("Failed to initialize Sphynx")?,
    );

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", err);
        }
    };
    sphynx::server::serve(&config, Arc::clone(&service), shutdown)
        .await
        .context("Sphynx server stopped")?;

    info!("Draining background persistence");
    service.shutdown().await?;
    Ok(())
}
