//! `VMTracker`: the single owner of `~/.omerta/vms/active.json` (§4.7).
//! All mutations serialize through one `tokio::sync::Mutex`-guarded actor
//! and are written atomically (temp file + rename), so a crash never
//! leaves a corrupt snapshot (§7).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::connection::VmConnection;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSnapshot {
    version: u32,
    vms: Vec<VmConnection>,
}

/// Resolve the home directory the tracker's state lives under. `SUDO_USER`
/// is observed before `HOME` so a `sudo`-elevated process does not write
/// into root's home (§4.7, §9).
pub fn resolve_home_dir() -> anyhow::Result<PathBuf> {
    if let Ok(sudo_user) = std::env::var("SUDO_USER") {
        if !sudo_user.is_empty() {
            if let Some(home) = sudo_user_home_dir(&sudo_user) {
                return Ok(home);
            }
        }
    }
    dirs::home_dir().ok_or_else(|| anyhow::anyhow!("could not resolve a home directory"))
}

#[cfg(unix)]
fn sudo_user_home_dir(user: &str) -> Option<PathBuf> {
    // `/etc/passwd` lookup avoided here to keep this dependency-free; the
    // common layout `/home/<user>` covers the supported deployment targets.
    // A non-standard home directory for the sudo user falls back to `HOME`.
    let candidate = PathBuf::from("/home").join(user);
    if candidate.is_dir() {
        Some(candidate)
    } else {
        None
    }
}

#[cfg(not(unix))]
fn sudo_user_home_dir(_user: &str) -> Option<PathBuf> {
    None
}

pub fn default_state_path() -> anyhow::Result<PathBuf> {
    Ok(resolve_home_dir()?.join(".omerta").join("vms").join("active.json"))
}

pub struct VmTracker {
    path: PathBuf,
    state: Mutex<HashMap<Uuid, VmConnection>>,
}

impl VmTracker {
    pub fn new(path: PathBuf) -> Self {
        VmTracker { path, state: Mutex::new(HashMap::new()) }
    }

    pub async fn open_default() -> anyhow::Result<Self> {
        let tracker = VmTracker::new(default_state_path()?);
        tracker.load_persisted_vms().await?;
        Ok(tracker)
    }

    /// Repopulate the in-memory map from disk. Missing file means a fresh
    /// start, not an error.
    pub async fn load_persisted_vms(&self) -> anyhow::Result<()> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let snapshot: PersistedSnapshot = serde_json::from_slice(&bytes)?;
        let mut state = self.state.lock().await;
        state.clear();
        for vm in snapshot.vms {
            state.insert(vm.vm_id, vm);
        }
        Ok(())
    }

    /// Track (or idempotently re-track) a VM, then flush the whole map to
    /// disk atomically. `trackVM(c); trackVM(c)` is idempotent (§8).
    pub async fn track_vm(&self, connection: VmConnection) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        state.insert(connection.vm_id, connection);
        self.flush(&state).await
    }

    /// Remove a VM; idempotent and never errors if the id is unknown
    /// (§8).
    pub async fn remove_vm(&self, vm_id: &Uuid) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        state.remove(vm_id);
        self.flush(&state).await
    }

    pub async fn get(&self, vm_id: &Uuid) -> Option<VmConnection> {
        self.state.lock().await.get(vm_id).cloned()
    }

    pub async fn all(&self) -> Vec<VmConnection> {
        self.state.lock().await.values().cloned().collect()
    }

    async fn flush(&self, state: &HashMap<Uuid, VmConnection>) -> anyhow::Result<()> {
        let snapshot = PersistedSnapshot { version: SCHEMA_VERSION, vms: state.values().cloned().collect() };
        let json = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = temp_path(&self.path);
        tokio::fs::write(&tmp_path, &json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
