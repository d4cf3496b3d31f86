//! Logging bootstrap, mirroring the teacher's `tracing_subscriber::fmt()`
//! setup in `zhtp/src/main.rs`. Envelope decode failures and other
//! transport-level drops must never log above `debug` (§9); this module
//! only controls the global filter, the `debug!` call sites live in
//! `omerta_wire`/`omerta_mesh`.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

pub fn init(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}
