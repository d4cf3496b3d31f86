//! Core cryptographic type definitions

pub mod hash;
pub mod keys;
pub mod signatures;

// Re-export main types
pub use hash::Hash;
pub use keys::{PrivateKey, PublicKey};
pub use signatures::Signature;
