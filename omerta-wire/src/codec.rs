//! Wire codec: `[u8 networkIdLen][networkId bytes][encryptedPayload]`.
//!
//! `encryptedPayload` is ChaCha20-Poly1305 (IETF variant) over the canonical
//! JSON encoding of a [`MeshEnvelope`], nonce-prefixed as
//! `omerta_crypto::symmetric` already does. The network id is deliberately
//! plaintext so a receiver can select the decryption key before attempting
//! to decrypt, per §4.1 of the specification.

use omerta_crypto::symmetric::{decrypt_data, encrypt_data};
use omerta_crypto::PublicKey;

use crate::envelope::MeshEnvelope;
use crate::error::{WireError, WireResult};
use crate::network::{validate_network_id, NetworkKey, NetworkRegistry};

/// Encode `network_id` and seal `envelope` for the wire.
pub fn seal(network_id: &str, network_key: &NetworkKey, envelope: &MeshEnvelope) -> WireResult<Vec<u8>> {
    validate_network_id(network_id)?;

    let plaintext = serde_json::to_vec(envelope)?;
    let ciphertext = encrypt_data(&plaintext, network_key.as_bytes())
        .map_err(|_| WireError::Crypto(anyhow::anyhow!("seal failed")))?;

    let id_bytes = network_id.as_bytes();
    let mut out = Vec::with_capacity(1 + id_bytes.len() + ciphertext.len());
    out.push(id_bytes.len() as u8);
    out.extend_from_slice(id_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// A frame that has been parsed (network id recovered) but not yet
/// decrypted or signature-checked. Lets callers look up the right key by
/// `network_id` before paying for decryption.
pub struct ParsedFrame<'a> {
    pub network_id: String,
    ciphertext: &'a [u8],
}

/// Split the plaintext network-id prefix off a raw wire frame.
pub fn parse_frame(frame: &[u8]) -> WireResult<ParsedFrame<'_>> {
    if frame.is_empty() {
        return Err(WireError::InvalidFraming);
    }
    let id_len = frame[0] as usize;
    if frame.len() < 1 + id_len {
        return Err(WireError::InvalidFraming);
    }
    let network_id = std::str::from_utf8(&frame[1..1 + id_len])
        .map_err(|_| WireError::InvalidFraming)?
        .to_string();
    Ok(ParsedFrame { network_id, ciphertext: &frame[1 + id_len..] })
}

/// Full decode: parse framing, look up the key, decrypt, verify signature
/// and freshness. Any failure collapses to the caller's error taxonomy;
/// per policy the caller must drop the message silently (log at `debug!`)
/// rather than surface anything back to the sender.
pub fn open(
    frame: &[u8],
    registry: &NetworkRegistry,
    sender_public_key: impl Fn(&str) -> Option<PublicKey>,
    now_unix_secs: u64,
) -> WireResult<MeshEnvelope> {
    let parsed = parse_frame(frame)?;
    let key = registry.get(&parsed.network_id)?;

    let plaintext = decrypt_data(parsed.ciphertext, key.as_bytes()).map_err(|_| WireError::DecryptFail)?;
    let envelope: MeshEnvelope = serde_json::from_slice(&plaintext)?;

    let from_key = sender_public_key(&envelope.from_peer).ok_or(WireError::BadSignature)?;
    if !envelope.verify_signature(&from_key).map_err(WireError::Crypto)? {
        return Err(WireError::BadSignature);
    }

    if !envelope.is_fresh(now_unix_secs) {
        let delta = (now_unix_secs as i64) - (envelope.timestamp as i64);
        return Err(WireError::StaleTimestamp(delta));
    }

    Ok(envelope)
}
