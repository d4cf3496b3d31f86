//! Omerta node composition: config loading, logging bootstrap, and
//! `OmertaNode`, which wires identity, mesh transport, the VM protocol's
//! consumer/provider sides, and the capability ports into one process.
//! Not itself a named component in the specification (§2 lists leaf
//! components only); this crate plays the role `zhtp` plays for the
//! teacher's package set.

pub mod cli;
pub mod config;
pub mod logging;
pub mod node;

pub use cli::CliArgs;
pub use config::NodeConfig;
pub use node::OmertaNode;
