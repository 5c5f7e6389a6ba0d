//! Action status transitions

use crate::error::StateMachineError;
use opspilot_model::ActionStatus;

/// Validates an action status transition.
///
/// `Pending` is the only status with more than one exit; every terminal
/// status has none, so objected or expired items can never be re-armed.
pub fn validate_transition(from: ActionStatus, to: ActionStatus) -> Result<(), StateMachineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StateMachineError { from, to })
    }
}

/// Statuses reachable from `from` in one step
pub fn allowed_transitions(from: ActionStatus) -> &'static [ActionStatus] {
    use ActionStatus::*;
    match from {
        Pending => &[Executing, Objected, Expired],
        Executing => &[Completed],
        Completed | Objected | Expired => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ActionStatus::*;

    #[test]
    fn pending_exits() {
        assert!(validate_transition(Pending, Executing).is_ok());
        assert!(validate_transition(Pending, Objected).is_ok());
        assert!(validate_transition(Pending, Expired).is_ok());
        assert!(validate_transition(Pending, Completed).is_err());
    }

    #[test]
    fn executing_cannot_be_objected() {
        assert!(validate_transition(Executing, Objected).is_err());
        assert!(validate_transition(Executing, Completed).is_ok());
    }

    #[test]
    fn terminal_states_never_return_to_pending() {
        for from in [Completed, Objected, Expired] {
            assert!(allowed_transitions(from).is_empty());
            assert!(validate_transition(from, Pending).is_err());
        }
    }
}
