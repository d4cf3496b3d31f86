//! Omerta node binary. Parses bootstrap flags, loads configuration, stands
//! up the mesh transport and VM protocol actors, then drives the receive
//! loop until the socket errors out or the process is signalled to stop.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use omerta_node::{CliArgs, NodeConfig, OmertaNode};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let config = NodeConfig::load(&args)?;
    omerta_node::logging::init(config.log_level.as_deref())?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting omerta node");

    let node = Arc::new(OmertaNode::bootstrap(&config).await?);
    info!(
        peer_id = %node.identity.public_key.peer_id(),
        listen_addr = %config.mesh.listen_addr,
        provider = config.provider.enabled,
        "node bootstrapped"
    );

    tokio::select! {
        result = node.clone().run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
            if let Some(provider) = &node.provider {
                provider.shutdown("node_shutdown").await;
            }
        }
    }

    info!("omerta node shutdown complete");
    Ok(())
}
