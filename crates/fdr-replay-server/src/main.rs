//! FDR replay server binary
//!
//! Replays recorded flight data to browser viewers.

use fdr_replay_server::{ReplayNode, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "fdr_replay=info,fdr_replay_server=info,fdr_telemetry=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    ReplayNode::new(config).run().await?;

    Ok(())
}
