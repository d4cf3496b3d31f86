//! Omerta wire envelope and codec.
//!
//! A `MeshEnvelope` is the signed, typed message carried inside every
//! encrypted payload on the mesh. The wire codec wraps it with a plaintext
//! `networkId` length-prefix so a receiver can select the right
//! `NetworkKey` before attempting to decrypt, then seals it with
//! ChaCha20-Poly1305. See [`codec::seal`] / [`codec::open`] for the full
//! round trip and `omerta_crypto` for the underlying primitives.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod network;

pub use codec::{open, parse_frame, seal, ParsedFrame};
pub use envelope::{MeshEnvelope, REPLAY_WINDOW_SECS};
pub use error::{WireError, WireResult};
pub use network::{validate_network_id, NetworkKey, NetworkRegistry, MAX_NETWORK_ID_LEN};
