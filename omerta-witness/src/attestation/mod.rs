//! Transaction 01: cabal attestation (§4.9).

pub mod cabal;
pub mod consumer;
pub mod messages;
pub mod provider;

pub use cabal::{CabalAttestationAction, CabalAttestationEvent, CabalAttestationParticipation, CabalAttestationState};
pub use consumer::{ConsumerAttestationView, ConsumerSessionEvent, ConsumerSessionState};
pub use provider::{ProviderAttestationAction, ProviderAttestationEvent, ProviderAttestationSession, ProviderAttestationState};
