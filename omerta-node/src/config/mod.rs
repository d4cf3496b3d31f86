//! Node configuration: loaded from an optional TOML file, environment
//! variables (`OMERTA_*`), and overridden by CLI flags, in that order,
//! mirroring the teacher's `config`/`toml` layering in `zhtp::config`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::CliArgs;

/// Bind/network settings for the mesh transport this node owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub listen_addr: String,
    pub network_id: String,
    /// Hex-encoded 32-byte `NetworkKey`, shared out-of-band (§3).
    pub network_key_hex: String,
}

impl Default for MeshConfig {
    fn default() -> Self {
        MeshConfig {
            listen_addr: "0.0.0.0:7777".to_string(),
            network_id: "default".to_string(),
            network_key_hex: "42".repeat(32),
        }
    }
}

/// Provider-daemon-specific settings: resource caps enforced by
/// [`omerta_vm::FilterManager`] before any `VMRuntime::create` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub enabled: bool,
    pub accept_trusted_only: bool,
    pub max_cpu_cores: Option<u32>,
    pub max_memory_mb: Option<u64>,
    pub max_storage_mb: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            enabled: false,
            accept_trusted_only: false,
            max_cpu_cores: None,
            max_memory_mb: None,
            max_storage_mb: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NodeConfig {
    pub mesh: MeshConfig,
    pub provider: ProviderConfig,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl NodeConfig {
    /// Load configuration from `path` if it exists, falling back to
    /// defaults, then apply CLI overrides (§9: config layering, no
    /// mandated global state besides the home-directory lookup).
    pub fn load(args: &CliArgs) -> Result<Self> {
        let defaults = NodeConfig::default();
        let mut builder = config::Config::builder()
            .set_default("mesh.listen_addr", defaults.mesh.listen_addr)?
            .set_default("mesh.network_id", defaults.mesh.network_id)?
            .set_default("mesh.network_key_hex", defaults.mesh.network_key_hex)?
            .set_default("provider.enabled", defaults.provider.enabled)?
            .set_default("provider.accept_trusted_only", defaults.provider.accept_trusted_only)?;

        if let Some(path) = &args.config {
            if path.exists() {
                builder = builder.add_source(config::File::from(path.clone()));
            }
        }

        builder = builder.add_source(config::Environment::with_prefix("OMERTA").separator("__"));

        let mut node_config: NodeConfig = builder
            .build()
            .context("failed to build node configuration")?
            .try_deserialize()
            .context("failed to deserialize node configuration")?;

        node_config.apply_cli_overrides(args);
        Ok(node_config)
    }

    fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(listen) = &args.listen_addr {
            self.mesh.listen_addr = listen.clone();
        }
        if let Some(network_id) = &args.network_id {
            self.mesh.network_id = network_id.clone();
        }
        if args.provider {
            self.provider.enabled = true;
        }
        if let Some(data_dir) = &args.data_dir {
            self.data_dir = Some(data_dir.clone());
        }
        if let Some(level) = &args.log_level {
            self.log_level = Some(level.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_args() -> CliArgs {
        CliArgs {
            config: None,
            listen_addr: None,
            network_id: None,
            provider: false,
            data_dir: None,
            log_level: None,
        }
    }

    #[test]
    fn load_with_no_file_and_no_cli_flags_yields_defaults() {
        let config = NodeConfig::load(&bare_args()).unwrap();
        assert_eq!(config.mesh.listen_addr, "0.0.0.0:7777");
        assert_eq!(config.mesh.network_id, "default");
        assert!(!config.provider.enabled);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn cli_flags_override_defaults() {
        let args = CliArgs {
            listen_addr: Some("127.0.0.1:9000".to_string()),
            network_id: Some("testnet".to_string()),
            provider: true,
            data_dir: Some(PathBuf::from("/tmp/omerta-test")),
            log_level: Some("debug".to_string()),
            ..bare_args()
        };

        let config = NodeConfig::load(&args).unwrap();
        assert_eq!(config.mesh.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.mesh.network_id, "testnet");
        assert!(config.provider.enabled);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/omerta-test")));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn file_source_is_skipped_when_path_does_not_exist() {
        let args = CliArgs { config: Some(PathBuf::from("/nonexistent/omerta.toml")), ..bare_args() };
        let config = NodeConfig::load(&args).unwrap();
        assert_eq!(config.mesh.listen_addr, "0.0.0.0:7777");
    }

    #[test]
    fn file_source_overrides_defaults_but_not_cli_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("omerta.toml");
        std::fs::write(
            &path,
            r#"
            [mesh]
            listen_addr = "10.0.0.1:7777"
            network_id = "from-file"

            [provider]
            enabled = true
            "#,
        )
        .unwrap();

        let args = CliArgs { config: Some(path), network_id: Some("from-cli".to_string()), ..bare_args() };

        let config = NodeConfig::load(&args).unwrap();
        assert_eq!(config.mesh.listen_addr, "10.0.0.1:7777");
        assert_eq!(config.mesh.network_id, "from-cli");
        assert!(config.provider.enabled);
    }
}
