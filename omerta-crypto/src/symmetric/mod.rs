//! Symmetric cryptography: ChaCha20-Poly1305 AEAD encryption.

pub mod chacha20;

pub use chacha20::*;
