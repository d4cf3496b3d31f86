//! Classical elliptic-curve cryptography: Ed25519 signing and X25519
//! key agreement.

pub mod ed25519;
pub mod x25519;

pub use ed25519::*;
