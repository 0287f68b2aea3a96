//! Experiment orchestrator.
//!
//! Owns every component and the experiment state machine. Runs one command
//! at a time against a borrowed [`ActuationContext`]. Any command ending in
//! a hardware fault forces the safe state and faults the machine; an abort
//! forces the safe state and returns to `Idle`.

use dispense_common::config::{
    ConfigError, DiagnosticPolicy, ExperimentConfig, PulseConfig, RigConfig,
};
use dispense_common::hal::types::Level;
use dispense_common::io::registry::LineRegistry;
use dispense_common::io::role::LineRole;
use dispense_hal::{DiagnosticReport, verify};
use tracing::{debug, error, info, warn};

use super::machine::{
    ExperimentEvent, ExperimentState, ExperimentStateMachine, TransitionResult,
    invalid_transition_reason,
};
use crate::command::Command;
use crate::context::ActuationContext;
use crate::display::{Position, PositionDisplay};
use crate::error::ControlError;
use crate::pulse;
use crate::servo::{NudgeDirection, ServoRamp};
use crate::stepper::{Direction, StepperSequencer};

/// Sequences stepper, pulse and servo operations for the rig.
pub struct Orchestrator {
    machine: ExperimentStateMachine,
    registry: LineRegistry,
    stepper: StepperSequencer,
    servo: ServoRamp,
    pulse: PulseConfig,
    experiment: ExperimentConfig,
    policy: DiagnosticPolicy,
    lines_claimed: bool,
    unit: f64,
    position: Position,
    display: Box<dyn PositionDisplay>,
}

impl Orchestrator {
    /// Build from a validated configuration.
    ///
    /// # Errors
    /// `Config` if two roles share a line.
    pub fn new(config: &RigConfig, display: Box<dyn PositionDisplay>) -> Result<Self, ControlError> {
        let registry = config.line_registry().map_err(ConfigError::from)?;
        Ok(Self {
            machine: ExperimentStateMachine::new(),
            registry,
            stepper: StepperSequencer::new(&config.axes),
            servo: ServoRamp::new(config.servo),
            pulse: config.pulse,
            experiment: config.experiment,
            policy: config.diagnostics.policy,
            lines_claimed: false,
            unit: config.display.unit,
            position: Position::default(),
            display,
        })
    }

    /// Current state.
    pub fn state(&self) -> ExperimentState {
        self.machine.state()
    }

    /// Stage position in unit counts.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Servo controller.
    pub fn servo(&self) -> &ServoRamp {
        &self.servo
    }

    /// Stepper sequencer.
    pub fn stepper(&self) -> &StepperSequencer {
        &self.stepper
    }

    /// Line registry.
    pub fn registry(&self) -> &LineRegistry {
        &self.registry
    }

    /// Claim every line, run the self-test and initialize the servo.
    ///
    /// Under the `halt` policy a failing self-test returns
    /// `DiagnosticsFailed` and the orchestrator keeps refusing commands.
    /// Under `warn` every failing line is logged and startup continues.
    /// A self-test aborted by a hardware fault forces every line LOW. Startup
    /// may be retried while `Unverified`; lines are claimed only once.
    pub fn startup(
        &mut self,
        ctx: &mut ActuationContext,
        run_diagnostics: bool,
    ) -> Result<Option<DiagnosticReport>, ControlError> {
        if self.machine.state() != ExperimentState::Unverified {
            return Err(ControlError::Rejected("startup already completed"));
        }
        if !self.lines_claimed {
            ctx.configure_lines(&self.registry)?;
            self.lines_claimed = true;
            info!("{} lines configured on '{}'", self.registry.len(), ctx.port.name());
        }

        let report = if run_diagnostics {
            let report = match verify(ctx.port.as_mut(), self.registry.bindings()) {
                Ok(report) => report,
                Err(e) => {
                    error!("Pin diagnostics aborted: {}", e);
                    self.force_safe(ctx);
                    return Err(e.into());
                }
            };
            if !report.is_pass() {
                match self.policy {
                    DiagnosticPolicy::Halt => {
                        for failure in report.failures() {
                            error!("Pin diagnostics: {}", failure);
                        }
                        return Err(ControlError::DiagnosticsFailed(report));
                    }
                    DiagnosticPolicy::Warn => {
                        for failure in report.failures() {
                            warn!("Pin diagnostics: {}", failure);
                        }
                    }
                }
            }
            Some(report)
        } else {
            warn!("Pin diagnostics skipped");
            None
        };

        self.servo.initialize(ctx)?;
        self.transition(ExperimentEvent::Verified)?;
        self.display.reset_view();
        self.render();
        info!("Rig ready");
        Ok(report)
    }

    /// Run one operator command.
    pub fn execute(
        &mut self,
        ctx: &mut ActuationContext,
        command: &Command,
    ) -> Result<(), ControlError> {
        debug!("command {:?} in {:?}", command, self.machine.state());
        match command {
            Command::Move(heading) => {
                let (axis, direction) = heading.motion();
                self.jog(ctx, axis, direction, 1)
            }
            Command::Jog {
                axis,
                direction,
                units,
            } => self.jog(ctx, axis, *direction, *units),
            Command::Fire => self.fire(ctx),
            Command::Nudge(direction) => self.nudge(ctx, *direction),
            Command::Dispense => self.begin_dispense(ctx),
            Command::Switch { role, on } => self.switch(ctx, *role, *on),
            Command::Abort => self.abort(ctx),
            Command::Reset => self.reset(ctx),
            Command::Quit => Ok(()),
        }
    }

    /// Move `axis` by `units` display units.
    ///
    /// The tracked coordinate changes only after the whole move completes.
    pub fn jog(
        &mut self,
        ctx: &mut ActuationContext,
        axis: &str,
        direction: Direction,
        units: u32,
    ) -> Result<(), ControlError> {
        self.require_idle()?;
        let config = self
            .stepper
            .axis(axis)
            .ok_or_else(|| ControlError::invalid(format!("unknown axis '{axis}'")))?;
        let phase_cycles = units
            .checked_mul(config.phase_cycles_per_unit)
            .ok_or_else(|| ControlError::invalid(format!("{units} units is too far")))?;
        let track = config.track;
        let sign = if config.invert {
            -direction.sign()
        } else {
            direction.sign()
        };

        let result = self.stepper.rotate(ctx, axis, direction, phase_cycles);
        self.settle(ctx, result)?;

        if let Some(coordinate) = track {
            self.position.shift(coordinate, sign * i64::from(units));
            self.render();
        }
        Ok(())
    }

    /// Reaction-trigger pulse on every trigger line, then the cooldown.
    pub fn fire(&mut self, ctx: &mut ActuationContext) -> Result<(), ControlError> {
        self.require_idle()?;
        let pins = self.registry.trigger_pins();
        if pins.is_empty() {
            return Err(ControlError::invalid("no trigger lines configured"));
        }
        let result = pulse::fire(ctx, &pins, self.pulse.trigger_high())
            .and_then(|()| ctx.sleep(self.pulse.cooldown()).map_err(ControlError::from));
        self.settle(ctx, result)
    }

    /// Nudge the servo one step.
    pub fn nudge(
        &mut self,
        ctx: &mut ActuationContext,
        direction: NudgeDirection,
    ) -> Result<(), ControlError> {
        self.require_idle()?;
        let result = self.servo.nudge(ctx, direction);
        self.settle(ctx, result)
    }

    /// Switch a relay, illumination or thermostat line.
    pub fn switch(
        &mut self,
        ctx: &mut ActuationContext,
        role: LineRole,
        on: bool,
    ) -> Result<(), ControlError> {
        self.require_idle()?;
        if !role.is_switchable() {
            return Err(ControlError::invalid(format!("{role} cannot be switched")));
        }
        let pin = self
            .registry
            .pin_of(role)
            .ok_or_else(|| ControlError::invalid(format!("{role} is not wired")))?;
        let result = ctx.port.write(pin, Level::from(on)).map_err(ControlError::from);
        self.settle(ctx, result)?;
        info!("{} {}", role, if on { "ON" } else { "OFF" });
        Ok(())
    }

    /// Run the dispense experiment.
    ///
    /// Illumination on, camera strobe, raise, dwell, thermostat and
    /// illumination off, lower.
    pub fn begin_dispense(&mut self, ctx: &mut ActuationContext) -> Result<(), ControlError> {
        self.require_idle()?;
        info!("Dispense started");
        let result = self.run_dispense(ctx);
        self.settle(ctx, result)?;
        info!("Dispense complete");
        Ok(())
    }

    fn run_dispense(&mut self, ctx: &mut ActuationContext) -> Result<(), ControlError> {
        self.transition(ExperimentEvent::Illuminate)?;
        self.drive_peripheral(ctx, LineRole::Illumination, Level::High)?;

        self.transition(ExperimentEvent::Capture)?;
        match self.registry.pin_of(LineRole::CameraTrigger) {
            Some(pin) => pulse::fire(ctx, &[pin], self.pulse.camera_high())?,
            None => debug!("no camera trigger wired"),
        }

        self.transition(ExperimentEvent::Raise)?;
        self.servo.raise(ctx)?;

        self.transition(ExperimentEvent::Dwell)?;
        ctx.sleep(self.experiment.dwell())?;

        self.transition(ExperimentEvent::Lower)?;
        self.drive_peripheral(ctx, LineRole::Thermostat, Level::Low)?;
        self.drive_peripheral(ctx, LineRole::Illumination, Level::Low)?;
        self.servo.lower(ctx)?;

        self.transition(ExperimentEvent::Complete)?;
        Ok(())
    }

    /// Force every line LOW and clear the pending cancellation.
    ///
    /// An in-progress dispense has already unwound by the time this runs;
    /// the state returns to `Idle` unless the machine is faulted.
    pub fn abort(&mut self, ctx: &mut ActuationContext) -> Result<(), ControlError> {
        let forced = ctx.force_low(&self.registry.pins());
        ctx.cancel.reset();
        if let Err(e) = forced {
            self.machine.handle_event(ExperimentEvent::Fault);
            return Err(e.into());
        }
        if self.machine.in_sequence() {
            self.transition(ExperimentEvent::Abort)?;
        }
        info!("Aborted; all lines LOW");
        Ok(())
    }

    /// Leave `Faulted`.
    pub fn reset(&mut self, ctx: &mut ActuationContext) -> Result<(), ControlError> {
        if self.machine.state() != ExperimentState::Faulted {
            return Err(ControlError::Rejected("reset only clears a fault"));
        }
        ctx.cancel.reset();
        let state = self.transition(ExperimentEvent::Reset)?;
        info!("Fault cleared; now {:?}", state);
        Ok(())
    }

    /// Drive every line LOW and release the port.
    pub fn shutdown(&mut self, ctx: &mut ActuationContext) -> Result<(), ControlError> {
        let forced = ctx.force_low(&self.registry.pins());
        let released = ctx.port.release();
        self.lines_claimed = false;
        forced?;
        released?;
        info!("Lines released");
        Ok(())
    }

    fn require_idle(&self) -> Result<(), ControlError> {
        if self.machine.accepts_commands() {
            Ok(())
        } else {
            Err(ControlError::Rejected(invalid_transition_reason(
                self.machine.state(),
            )))
        }
    }

    fn transition(&mut self, event: ExperimentEvent) -> Result<ExperimentState, ControlError> {
        match self.machine.handle_event(event) {
            TransitionResult::Ok(state) => {
                debug!("{:?} -> {:?}", event, state);
                Ok(state)
            }
            TransitionResult::Rejected(reason) => Err(ControlError::Rejected(reason)),
        }
    }

    fn drive_peripheral(
        &mut self,
        ctx: &mut ActuationContext,
        role: LineRole,
        level: Level,
    ) -> Result<(), ControlError> {
        match self.registry.pin_of(role) {
            Some(pin) => ctx.port.write(pin, level).map_err(ControlError::from),
            None => {
                debug!("{} not wired", role);
                Ok(())
            }
        }
    }

    fn force_safe(&mut self, ctx: &mut ActuationContext) {
        if let Err(e) = ctx.force_low(&self.registry.pins()) {
            error!("safe state incomplete: {}", e);
        }
    }

    /// Apply the outcome of a command to the machine.
    fn settle(
        &mut self,
        ctx: &mut ActuationContext,
        result: Result<(), ControlError>,
    ) -> Result<(), ControlError> {
        let err = match result {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        if err.is_hardware_fault() {
            error!("Hardware fault in {:?}: {}", self.machine.state(), err);
            self.force_safe(ctx);
            self.machine.handle_event(ExperimentEvent::Fault);
        } else if matches!(err, ControlError::Cancelled) {
            info!("Cancelled in {:?}", self.machine.state());
            self.force_safe(ctx);
            ctx.cancel.reset();
            if self.machine.in_sequence() {
                self.machine.handle_event(ExperimentEvent::Abort);
            }
        } else if self.machine.in_sequence() {
            self.force_safe(ctx);
            self.machine.handle_event(ExperimentEvent::Abort);
        }
        Err(err)
    }

    fn render(&mut self) {
        let (x, y) = self.position.scaled(self.unit);
        self.display.render_position(x, y);
    }
}
