//! VM-protocol error taxonomy (§7). Transport-level faults are
//! `omerta_wire::WireError`'s concern; these variants cover the
//! request-scoped failures this crate's continuations resolve to.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("request to self is not allowed")]
    SelfRequestNotAllowed,

    #[error("no response within timeout")]
    NoResponse,

    #[error("rejected by provider filter: {0}")]
    FilterRejected(String),

    #[error("provider has no available resources matching the request")]
    ResourceExhausted,

    #[error("VM creation failed: {0}")]
    VmCreationFailed(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] anyhow::Error),
}

pub type VmResult<T> = Result<T, VmError>;
