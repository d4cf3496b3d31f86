//! Wire-level error taxonomy.
//!
//! Every variant here corresponds to a step in the decrypt flow that failed
//! before a payload could be trusted. Per the transport error-handling
//! policy, callers log these at debug level and drop the message; they are
//! never surfaced to a remote peer (surfacing would create a decryption
//! oracle).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid envelope framing")]
    InvalidFraming,

    #[error("unknown network id: {0}")]
    UnknownNetwork(String),

    #[error("failed to decrypt payload")]
    DecryptFail,

    #[error("signature verification failed")]
    BadSignature,

    #[error("timestamp outside replay window: {0}s from local clock")]
    StaleTimestamp(i64),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] anyhow::Error),
}

pub type WireResult<T> = Result<T, WireError>;
