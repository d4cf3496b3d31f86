//! Consumer-side view of cabal attestation (§4.9): the consumer has no
//! voting role in the cabal, but it is the party whose early disconnect or
//! misuse a witness's termination report names, so it tracks its own
//! session lifecycle to report those reasons accurately.

use crate::types::{SessionId, TerminationReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerSessionState {
    Idle,
    Connected,
    Ended(TerminationReason),
}

#[derive(Debug, Clone)]
pub enum ConsumerSessionEvent {
    VmAllocationReceived,
    DoneUsingVm,
    ConnectionLost,
    MisuseDetectedByProvider,
}

pub struct ConsumerAttestationView {
    pub session_id: SessionId,
    pub state: ConsumerSessionState,
}

impl ConsumerAttestationView {
    pub fn new(session_id: SessionId) -> Self {
        ConsumerAttestationView { session_id, state: ConsumerSessionState::Idle }
    }

    pub fn handle(&mut self, event: ConsumerSessionEvent) -> anyhow::Result<Option<TerminationReason>> {
        match (self.state.clone(), event) {
            (ConsumerSessionState::Idle, ConsumerSessionEvent::VmAllocationReceived) => {
                self.state = ConsumerSessionState::Connected;
                Ok(None)
            }
            (ConsumerSessionState::Connected, ConsumerSessionEvent::DoneUsingVm) => {
                self.state = ConsumerSessionState::Ended(TerminationReason::CompletedNormal);
                Ok(Some(TerminationReason::CompletedNormal))
            }
            (ConsumerSessionState::Connected, ConsumerSessionEvent::ConnectionLost) => {
                self.state = ConsumerSessionState::Ended(TerminationReason::ConsumerTerminatedEarly);
                Ok(Some(TerminationReason::ConsumerTerminatedEarly))
            }
            (ConsumerSessionState::Connected, ConsumerSessionEvent::MisuseDetectedByProvider) => {
                self.state = ConsumerSessionState::Ended(TerminationReason::ConsumerMisuse);
                Ok(Some(TerminationReason::ConsumerMisuse))
            }
            (state, event) => anyhow::bail!("event {event:?} is not valid in state {state:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_completion_reports_completed_normal() {
        let mut view = ConsumerAttestationView::new("sess-1".to_string());
        view.handle(ConsumerSessionEvent::VmAllocationReceived).unwrap();
        let reason = view.handle(ConsumerSessionEvent::DoneUsingVm).unwrap();
        assert_eq!(reason, Some(TerminationReason::CompletedNormal));
    }

    #[test]
    fn dropped_connection_reports_consumer_terminated_early() {
        let mut view = ConsumerAttestationView::new("sess-1".to_string());
        view.handle(ConsumerSessionEvent::VmAllocationReceived).unwrap();
        let reason = view.handle(ConsumerSessionEvent::ConnectionLost).unwrap();
        assert_eq!(reason, Some(TerminationReason::ConsumerTerminatedEarly));
    }
}
