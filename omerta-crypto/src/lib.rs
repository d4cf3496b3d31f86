//! Omerta Cryptography Foundation
//!
//! Identity is a single Ed25519 keypair per peer; session agreement derives
//! an X25519 keypair from the same private material; transport payloads are
//! sealed with ChaCha20-Poly1305 over a session key produced by HKDF-SHA3
//! from the X25519 shared secret. BLAKE3 derives peer ids and content
//! hashes.

pub mod classical;
pub mod hashing;
pub mod kdf;
pub mod keypair;
pub mod multisig;
pub mod peer_id;
pub mod ports;
pub mod random;
pub mod symmetric;
pub mod traits;
pub mod types;
pub mod verification;

// Re-export commonly used types and functions
pub use types::{Hash, PrivateKey, PublicKey, Signature};
pub use verification::verify_signature;

pub use traits::{SecureKey, ZeroizingKey};

pub use hashing::hash_blake3;

pub use random::{generate_nonce, SecureRng};

pub use keypair::KeyPair;

pub use symmetric::{decrypt_data, encrypt_data};

pub use kdf::derive_keys;

pub use multisig::MultiSig;

pub use peer_id::{derive_peer_id, PeerId};

pub use ports::{Clock, OsRandomSource, RandomSource, SystemClock};
