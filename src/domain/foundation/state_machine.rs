//! Checked transitions for lifecycle enums such as the chat session status
//! and the client connection phase.

use super::{DomainError, ErrorCode};

pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// States reachable in one step from `self`.
    fn valid_transitions(&self) -> Vec<Self>;

    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// `target`, or `INVALID_STATE_TRANSITION` if it is not reachable.
    fn transition_to(&self, target: Self) -> Result<Self, DomainError> {
        if !self.can_transition_to(&target) {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("{:?} cannot move to {:?}", self, target),
            ));
        }
        Ok(target)
    }

    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Ticket {
        Queued,
        Claimed,
        Resolved,
    }

    impl StateMachine for Ticket {
        fn valid_transitions(&self) -> Vec<Self> {
            match self {
                Ticket::Queued => vec![Ticket::Claimed],
                Ticket::Claimed => vec![Ticket::Queued, Ticket::Resolved],
                Ticket::Resolved => vec![],
            }
        }
    }

    #[test]
    fn reachable_targets_are_returned() {
        assert_eq!(Ticket::Queued.transition_to(Ticket::Claimed).unwrap(), Ticket::Claimed);
    }

    #[test]
    fn unreachable_targets_are_coded_errors() {
        let err = Ticket::Queued.transition_to(Ticket::Resolved).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
        assert!(err.message.contains("Queued"));
    }

    #[test]
    fn only_states_without_exits_are_terminal() {
        assert!(Ticket::Resolved.is_terminal());
        assert!(!Ticket::Claimed.is_terminal());
    }
}
