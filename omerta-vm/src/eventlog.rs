//! Provider-side JSONL event logs (§7): `vm_requests`, `vm_lifecycle`,
//! `resources`, `vpn`, `errors`, `heartbeats`. Each line is an opaque,
//! timestamped, component-tagged event object — these are user-visible
//! operational logs, not the `tracing` diagnostic stream.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventLogKind {
    VmRequests,
    VmLifecycle,
    Resources,
    Vpn,
    Errors,
    Heartbeats,
}

impl EventLogKind {
    fn file_name(self) -> &'static str {
        match self {
            EventLogKind::VmRequests => "vm_requests.jsonl",
            EventLogKind::VmLifecycle => "vm_lifecycle.jsonl",
            EventLogKind::Resources => "resources.jsonl",
            EventLogKind::Vpn => "vpn.jsonl",
            EventLogKind::Errors => "errors.jsonl",
            EventLogKind::Heartbeats => "heartbeats.jsonl",
        }
    }
}

#[derive(Debug, Serialize)]
struct EventLine<'a> {
    timestamp: u64,
    component: &'a str,
    #[serde(flatten)]
    fields: Value,
}

/// A single JSONL sink, append-only, one event per line. One instance per
/// `EventLogKind`; `EventLog` below owns the full set a provider daemon
/// needs.
pub struct EventLogWriter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl EventLogWriter {
    pub fn new(path: PathBuf) -> Self {
        EventLogWriter { path, lock: Mutex::new(()) }
    }

    pub async fn append(&self, component: &str, timestamp: u64, fields: Value) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let line = EventLine { timestamp, component, fields };
        let mut serialized = serde_json::to_vec(&line)?;
        serialized.push(b'\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(&serialized).await?;
        Ok(())
    }
}

/// The full set of event sinks a provider daemon writes to, rooted at one
/// directory (conventionally `~/.omerta/logs`).
pub struct EventLog {
    dir: PathBuf,
    vm_requests: EventLogWriter,
    vm_lifecycle: EventLogWriter,
    resources: EventLogWriter,
    vpn: EventLogWriter,
    errors: EventLogWriter,
    heartbeats: EventLogWriter,
}

impl EventLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        EventLog {
            vm_requests: EventLogWriter::new(dir.join(EventLogKind::VmRequests.file_name())),
            vm_lifecycle: EventLogWriter::new(dir.join(EventLogKind::VmLifecycle.file_name())),
            resources: EventLogWriter::new(dir.join(EventLogKind::Resources.file_name())),
            vpn: EventLogWriter::new(dir.join(EventLogKind::Vpn.file_name())),
            errors: EventLogWriter::new(dir.join(EventLogKind::Errors.file_name())),
            heartbeats: EventLogWriter::new(dir.join(EventLogKind::Heartbeats.file_name())),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn writer(&self, kind: EventLogKind) -> &EventLogWriter {
        match kind {
            EventLogKind::VmRequests => &self.vm_requests,
            EventLogKind::VmLifecycle => &self.vm_lifecycle,
            EventLogKind::Resources => &self.resources,
            EventLogKind::Vpn => &self.vpn,
            EventLogKind::Errors => &self.errors,
            EventLogKind::Heartbeats => &self.heartbeats,
        }
    }

    pub async fn record(&self, kind: EventLogKind, component: &str, timestamp: u64, fields: Value) -> anyhow::Result<()> {
        self.writer(kind).append(component, timestamp, fields).await
    }

    pub async fn record_filter_rejected(&self, timestamp: u64, requester_id: &str, reason: &str) -> anyhow::Result<()> {
        self.record(
            EventLogKind::Errors,
            "filter",
            timestamp,
            serde_json::json!({ "errorType": "filter_rejected", "requesterId": requester_id, "reason": reason }),
        )
        .await
    }

    pub async fn record_vm_timeout(&self, timestamp: u64, consumer_peer_id: &str, vm_ids: &[String]) -> anyhow::Result<()> {
        self.record(
            EventLogKind::VmLifecycle,
            "provider",
            timestamp,
            serde_json::json!({ "event": "recordVMTimeout", "consumerPeerId": consumer_peer_id, "vmIds": vm_ids }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appended_lines_are_newline_delimited_json() {
        let dir = tempfile::tempdir().unwrap();
        let writer = EventLogWriter::new(dir.path().join("errors.jsonl"));

        writer.append("provider", 1_000, serde_json::json!({"errorType": "filter_rejected"})).await.unwrap();
        writer.append("provider", 1_001, serde_json::json!({"errorType": "vm_creation_failed"})).await.unwrap();

        let contents = tokio::fs::read_to_string(dir.path().join("errors.jsonl")).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["timestamp"], 1000);
        assert_eq!(first["component"], "provider");
        assert_eq!(first["errorType"], "filter_rejected");
    }

    #[tokio::test]
    async fn event_log_routes_to_the_right_file_per_kind() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new(dir.path());

        log.record_filter_rejected(1_000, "XXXX", "peer is blocked").await.unwrap();
        log.record_vm_timeout(1_060, "AAAA", &["vm-1".to_string()]).await.unwrap();

        assert!(dir.path().join("errors.jsonl").exists());
        assert!(dir.path().join("vm_lifecycle.jsonl").exists());
        assert!(!dir.path().join("vpn.jsonl").exists());
    }
}
