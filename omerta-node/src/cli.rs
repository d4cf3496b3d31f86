//! Bootstrap CLI flags for the node binary (listen address, config path,
//! log level). The *protocol* CLI surface (VM request/release/etc.) is a
//! spec.md Non-goal and lives in an external collaborator, not here.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "omerta-node", version, about = "Omerta mesh node: identity, transport, VM protocol, witness consensus")]
pub struct CliArgs {
    /// Path to a TOML config file. Missing file falls back to defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the UDP listen address (e.g. "0.0.0.0:7777").
    #[arg(long)]
    pub listen_addr: Option<String>,

    /// Override the network id this node joins.
    #[arg(long)]
    pub network_id: Option<String>,

    /// Run the provider daemon (accept VM requests) in addition to the
    /// consumer-side client.
    #[arg(long)]
    pub provider: bool,

    /// Override the data directory (defaults to `~/.omerta`, honoring
    /// `SUDO_USER` per §4.7).
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Override the tracing log level (e.g. "debug", "info,omerta_mesh=debug").
    #[arg(long)]
    pub log_level: Option<String>,
}
