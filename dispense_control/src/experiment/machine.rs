//! Experiment state machine.
//!
//! ```text
//! Unverified ──Verified──► Idle ──Illuminate──► Illuminated ──Capture──► Capturing
//!                           ▲                                              │
//!                           │                                            Raise
//!                       Complete                                           ▼
//!                           │                                           Raising
//!                        Lowering ◄──Lower── Dwelling ◄──Dwell─────────────┘
//!
//! any ──Fault──► Faulted ──Reset──► Idle (Unverified if never verified)
//! any sequence state ──Abort──► Idle
//! ```

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExperimentState {
    /// Lines configured, self-test not yet passed. No commands accepted.
    Unverified,
    /// Ready for commands.
    Idle,
    /// Illumination on.
    Illuminated,
    /// Camera strobe in progress.
    Capturing,
    /// Stage ramping up.
    Raising,
    /// Stage held raised.
    Dwelling,
    /// Stage ramping down.
    Lowering,
    /// Hardware fault; safe state forced, waiting for reset.
    Faulted,
}

/// Result of a transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded, new state.
    Ok(ExperimentState),
    /// Transition rejected, reason.
    Rejected(&'static str),
}

/// Event that may trigger a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentEvent {
    /// Startup self-test accepted.
    Verified,
    /// Dispense started; illumination switched on.
    Illuminate,
    /// Camera strobe started.
    Capture,
    /// Raise ramp started.
    Raise,
    /// Dwell started.
    Dwell,
    /// Peripherals off, lower ramp started.
    Lower,
    /// Lower ramp finished.
    Complete,
    /// Operator abort handled.
    Abort,
    /// Hardware fault.
    Fault,
    /// Operator cleared the fault.
    Reset,
}

/// Holds the current experiment state.
#[derive(Debug, Clone)]
pub struct ExperimentStateMachine {
    state: ExperimentState,
    verified: bool,
}

impl ExperimentStateMachine {
    /// New machine in `Unverified`.
    pub const fn new() -> Self {
        Self {
            state: ExperimentState::Unverified,
            verified: false,
        }
    }

    /// Current state.
    #[inline]
    pub const fn state(&self) -> ExperimentState {
        self.state
    }

    /// Attempt a transition given an event.
    pub fn handle_event(&mut self, event: ExperimentEvent) -> TransitionResult {
        use ExperimentEvent::*;
        use ExperimentState::*;

        let next = match (self.state, event) {
            (Unverified, Verified) => {
                self.verified = true;
                Idle
            }

            (Idle, Illuminate) => Illuminated,
            (Illuminated, Capture) => Capturing,
            (Capturing, Raise) => Raising,
            (Raising, Dwell) => Dwelling,
            (Dwelling, Lower) => Lowering,
            (Lowering, Complete) => Idle,

            (_, Fault) => Faulted,
            (Faulted, Reset) if self.verified => Idle,
            (Faulted, Reset) => Unverified,

            (Idle | Illuminated | Capturing | Raising | Dwelling | Lowering, Abort) => Idle,

            _ => return TransitionResult::Rejected(invalid_transition_reason(self.state)),
        };

        self.state = next;
        TransitionResult::Ok(next)
    }

    /// True only in `Idle`.
    #[inline]
    pub const fn accepts_commands(&self) -> bool {
        matches!(self.state, ExperimentState::Idle)
    }

    /// True while a dispense sequence is in progress.
    #[inline]
    pub const fn in_sequence(&self) -> bool {
        matches!(
            self.state,
            ExperimentState::Illuminated
                | ExperimentState::Capturing
                | ExperimentState::Raising
                | ExperimentState::Dwelling
                | ExperimentState::Lowering
        )
    }
}

impl Default for ExperimentStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Reason attached to a rejected transition; also used for rejected commands.
pub const fn invalid_transition_reason(state: ExperimentState) -> &'static str {
    use ExperimentState::*;
    match state {
        Unverified => "Unverified: pin diagnostics have not passed",
        Idle => "Idle: invalid event for current state",
        Illuminated | Capturing | Raising | Dwelling | Lowering => {
            "dispense sequence in progress"
        }
        Faulted => "Faulted: only reset allowed",
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ExperimentEvent::*;
    use ExperimentState::*;

    fn at(state: ExperimentState) -> ExperimentStateMachine {
        ExperimentStateMachine {
            state,
            verified: state != Unverified,
        }
    }

    fn idle() -> ExperimentStateMachine {
        at(Idle)
    }

    #[test]
    fn initial_state_is_unverified() {
        let sm = ExperimentStateMachine::new();
        assert_eq!(sm.state(), Unverified);
        assert!(!sm.accepts_commands());
    }

    #[test]
    fn full_dispense_sequence() {
        let mut sm = ExperimentStateMachine::new();
        assert_eq!(sm.handle_event(Verified), TransitionResult::Ok(Idle));
        for (event, state) in [
            (Illuminate, Illuminated),
            (Capture, Capturing),
            (Raise, Raising),
            (Dwell, Dwelling),
            (Lower, Lowering),
            (Complete, Idle),
        ] {
            assert_eq!(sm.handle_event(event), TransitionResult::Ok(state));
        }
    }

    #[test]
    fn sequence_steps_cannot_be_skipped() {
        let mut sm = idle();
        assert!(matches!(sm.handle_event(Raise), TransitionResult::Rejected(_)));
        sm.handle_event(Illuminate);
        assert!(matches!(sm.handle_event(Dwell), TransitionResult::Rejected(_)));
        assert!(sm.in_sequence());
    }

    #[test]
    fn fault_from_any_state_until_reset() {
        for initial in [Unverified, Idle, Illuminated, Capturing, Raising, Dwelling, Lowering] {
            let mut sm = at(initial);
            assert_eq!(sm.handle_event(Fault), TransitionResult::Ok(Faulted));
        }
        let mut sm = at(Faulted);
        assert!(matches!(sm.handle_event(Abort), TransitionResult::Rejected(_)));
        assert!(matches!(sm.handle_event(Illuminate), TransitionResult::Rejected(_)));
        assert_eq!(sm.handle_event(Reset), TransitionResult::Ok(Idle));
    }

    #[test]
    fn abort_returns_sequence_to_idle() {
        for initial in [Illuminated, Capturing, Raising, Dwelling, Lowering] {
            let mut sm = at(initial);
            assert_eq!(sm.handle_event(Abort), TransitionResult::Ok(Idle));
        }
        let mut sm = ExperimentStateMachine::new();
        assert!(matches!(sm.handle_event(Abort), TransitionResult::Rejected(_)));
    }

    #[test]
    fn reset_before_verification_stays_unverified() {
        let mut sm = ExperimentStateMachine::new();
        assert_eq!(sm.handle_event(Fault), TransitionResult::Ok(Faulted));
        assert_eq!(sm.handle_event(Reset), TransitionResult::Ok(Unverified));
        assert!(!sm.accepts_commands());
        assert_eq!(sm.handle_event(Verified), TransitionResult::Ok(Idle));
    }

    #[test]
    fn reset_only_from_faulted() {
        let mut sm = idle();
        assert!(matches!(sm.handle_event(Reset), TransitionResult::Rejected(_)));
    }
}
