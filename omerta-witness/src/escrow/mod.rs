//! Transaction 00: escrow lock (§4.8). Three pure state machines, one per
//! role, exchanging the messages defined in [`messages`].

pub mod consumer;
pub mod messages;
pub mod provider;
pub mod witness;

pub use consumer::{ConsumerAction, ConsumerEvent, ConsumerLockSession, ConsumerState};
pub use provider::{ProviderAction, ProviderEvent, ProviderLockSession, ProviderState};
pub use witness::{WitnessAction, WitnessEvent, WitnessParticipation, WitnessState};
