//! Processor lifecycle state.

use serde::{Deserialize, Serialize};

/// Processor state.
///
/// Transitions:
/// - Idle -> Running (`start`)
/// - Running -> Paused (`pause`), Paused -> Running (`start`)
/// - any -> Halted (`halt` / `cancel` / worker escalation), terminal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorState {
    #[default]
    Idle,
    Running,
    Paused,
    Halted,
}

impl ProcessorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessorState::Halted)
    }

    /// Callbacks may only be swapped while nothing is being drained.
    pub fn accepts_configuration(self) -> bool {
        !matches!(self, ProcessorState::Running)
    }
}

/// How a stop was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopMode {
    /// Finish everything queued so far, then exit.
    Drain,
    /// Exit at the next dequeue; pending entries are discarded.
    Abort,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::idle(ProcessorState::Idle, true)]
    #[case::running(ProcessorState::Running, false)]
    #[case::paused(ProcessorState::Paused, true)]
    #[case::halted(ProcessorState::Halted, true)]
    fn configuration_is_rejected_only_while_running(
        #[case] state: ProcessorState,
        #[case] accepts: bool,
    ) {
        assert_eq!(state.accepts_configuration(), accepts);
    }

    #[test]
    fn only_halted_is_terminal() {
        assert!(ProcessorState::Halted.is_terminal());
        assert!(!ProcessorState::Paused.is_terminal());
    }
}
