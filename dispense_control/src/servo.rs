//! Servo ramp controller.
//!
//! Moves the reaction-stage servo through an angle range one resolution
//! step at a time. The controller remembers the last commanded angle only
//! when a move asks for it to be recorded.

use dispense_common::config::ServoConfig;
use dispense_common::hal::consts::{SERVO_MAX_ANGLE, SERVO_MIN_ANGLE};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::context::ActuationContext;
use crate::error::ControlError;

/// Direction of a manual nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NudgeDirection {
    /// Increase the angle.
    Up,
    /// Decrease the angle.
    Down,
}

impl FromStr for NudgeDirection {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "raise" => Ok(Self::Up),
            "down" | "lower" => Ok(Self::Down),
            other => Err(ControlError::invalid(format!("unknown nudge direction '{other}'"))),
        }
    }
}

impl fmt::Display for NudgeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

fn check_angle(label: &str, angle: f64) -> Result<(), ControlError> {
    if !(SERVO_MIN_ANGLE..=SERVO_MAX_ANGLE).contains(&angle) {
        return Err(ControlError::invalid(format!(
            "{label} angle {angle} outside [{SERVO_MIN_ANGLE}, {SERVO_MAX_ANGLE}]"
        )));
    }
    Ok(())
}

/// Reaction-stage servo with recorded angle.
#[derive(Debug, Clone)]
pub struct ServoRamp {
    config: ServoConfig,
    current: f64,
}

impl ServoRamp {
    /// Controller at the configured start angle. Nothing is commanded yet.
    pub fn new(config: ServoConfig) -> Self {
        Self {
            current: config.start_angle,
            config,
        }
    }

    /// Last recorded angle [deg].
    pub fn current_angle(&self) -> f64 {
        self.current
    }

    /// Servo settings in use.
    pub fn config(&self) -> &ServoConfig {
        &self.config
    }

    /// Set the PWM frequency, command the start angle and record it.
    pub fn initialize(&mut self, ctx: &mut ActuationContext) -> Result<(), ControlError> {
        ctx.actuator.set_frequency(self.config.frequency_hz)?;
        ctx.actuator
            .set_channel_angle(self.config.channel, self.config.start_angle)?;
        self.current = self.config.start_angle;
        info!(
            "Servo channel {} at {:.1} deg ({} Hz)",
            self.config.channel, self.current, self.config.frequency_hz
        );
        Ok(())
    }

    /// Step from `start` to `end` in `resolution` increments.
    ///
    /// Visits every angle `i * resolution` for `i` from `round(start / res)`
    /// to `round(end / res)` inclusive, sleeping `step_delay` after each.
    /// With `record` the current angle follows every successful step; without
    /// it the recorded angle is never touched. Returns the last angle commanded.
    pub fn ramp(
        &mut self,
        ctx: &mut ActuationContext,
        start: f64,
        end: f64,
        resolution: f64,
        step_delay: Duration,
        record: bool,
    ) -> Result<f64, ControlError> {
        check_angle("start", start)?;
        check_angle("end", end)?;
        if !(resolution > 0.0 && resolution.is_finite()) {
            return Err(ControlError::invalid(format!(
                "resolution {resolution} must be positive"
            )));
        }

        let first = (start / resolution).round() as i64;
        let last = (end / resolution).round() as i64;
        let step: i64 = if last >= first { 1 } else { -1 };
        debug!(
            "servo ramp {:.1} -> {:.1} deg ({} steps, record={})",
            start,
            end,
            (last - first).abs() + 1,
            record
        );

        let mut index = first;
        loop {
            ctx.cancel.check()?;
            let angle = (index as f64 * resolution).clamp(SERVO_MIN_ANGLE, SERVO_MAX_ANGLE);
            ctx.actuator.set_channel_angle(self.config.channel, angle)?;
            if record {
                self.current = angle;
            }
            ctx.sleep(step_delay)?;
            if index == last {
                return Ok(angle);
            }
            index += step;
        }
    }

    /// Ramp start -> final angle, recorded.
    pub fn raise(&mut self, ctx: &mut ActuationContext) -> Result<(), ControlError> {
        let c = self.config;
        self.ramp(ctx, c.start_angle, c.final_angle, c.resolution, c.step_delay(), true)?;
        Ok(())
    }

    /// Ramp final -> start angle, recorded.
    pub fn lower(&mut self, ctx: &mut ActuationContext) -> Result<(), ControlError> {
        let c = self.config;
        self.ramp(ctx, c.final_angle, c.start_angle, c.resolution, c.step_delay(), true)?;
        Ok(())
    }

    /// Move one nudge step from the current angle, clamped to the servo range.
    ///
    /// The ramp itself is not recorded; the angle it ends on, snapped to the
    /// resolution grid, is recorded only once the whole move has succeeded.
    pub fn nudge(
        &mut self,
        ctx: &mut ActuationContext,
        direction: NudgeDirection,
    ) -> Result<(), ControlError> {
        let c = self.config;
        let delta = match direction {
            NudgeDirection::Up => c.nudge_step,
            NudgeDirection::Down => -c.nudge_step,
        };
        let target = (self.current + delta).clamp(SERVO_MIN_ANGLE, SERVO_MAX_ANGLE);
        let reached = self.ramp(ctx, self.current, target, c.resolution, c.step_delay(), false)?;
        self.current = reached;
        debug!("servo nudged {} to {:.1} deg", direction, reached);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use dispense_hal::drivers::simulation::SimProbe;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use dispense_common::hal::driver::{AngleActuator, HalError};

    fn config() -> ServoConfig {
        ServoConfig {
            step_delay_ms: 0,
            ..ServoConfig::default()
        }
    }

    fn rig() -> (SimProbe, ActuationContext) {
        let probe = SimProbe::new();
        let ctx = ActuationContext::new(
            Box::new(probe.port()),
            Box::new(probe.servo()),
            CancelToken::new(),
        );
        (probe, ctx)
    }

    /// Cancels the token once a given angle has been commanded.
    struct CancelAt {
        angle: f64,
        token: CancelToken,
        calls: Arc<AtomicUsize>,
    }

    impl AngleActuator for CancelAt {
        fn name(&self) -> &'static str {
            "cancel-at"
        }

        fn set_channel_angle(&mut self, _channel: u8, angle: f64) -> Result<(), HalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if angle == self.angle {
                self.token.cancel();
            }
            Ok(())
        }

        fn set_frequency(&mut self, _hz: f64) -> Result<(), HalError> {
            Ok(())
        }
    }

    #[test]
    fn recorded_ramp_ends_at_target() {
        let (probe, mut ctx) = rig();
        let mut servo = ServoRamp::new(config());
        servo.ramp(&mut ctx, 10.0, 20.0, 1.0, Duration::ZERO, true).unwrap();
        assert_eq!(servo.current_angle(), 20.0);
        let expected: Vec<f64> = (10..=20).map(f64::from).collect();
        assert_eq!(probe.angles(0), expected);
    }

    #[test]
    fn cancelled_ramp_records_last_reached_angle() {
        let probe = SimProbe::new();
        let token = CancelToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut ctx = ActuationContext::new(
            Box::new(probe.port()),
            Box::new(CancelAt {
                angle: 15.0,
                token: token.clone(),
                calls: Arc::clone(&calls),
            }),
            token,
        );
        let mut servo = ServoRamp::new(config());

        let err = servo.ramp(&mut ctx, 10.0, 20.0, 1.0, Duration::ZERO, true).unwrap_err();
        assert!(matches!(err, ControlError::Cancelled));
        assert_eq!(servo.current_angle(), 15.0);
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn descending_ramp_with_fractional_resolution() {
        let (probe, mut ctx) = rig();
        let mut servo = ServoRamp::new(config());
        servo.ramp(&mut ctx, 2.0, 1.0, 0.5, Duration::ZERO, true).unwrap();
        assert_eq!(probe.angles(0), vec![2.0, 1.5, 1.0]);
        assert_eq!(servo.current_angle(), 1.0);
    }

    #[test]
    fn invalid_ramp_commands_nothing() {
        let (probe, mut ctx) = rig();
        let mut servo = ServoRamp::new(config());
        for (start, end, res) in [(0.0, 190.0, 1.0), (-1.0, 10.0, 1.0), (0.0, 10.0, 0.0)] {
            let err = servo.ramp(&mut ctx, start, end, res, Duration::ZERO, true).unwrap_err();
            assert!(matches!(err, ControlError::InvalidCommand(_)));
        }
        assert!(probe.angles(0).is_empty());
    }

    #[test]
    fn initialize_sets_frequency_and_start_angle() {
        let (probe, mut ctx) = rig();
        let mut servo = ServoRamp::new(ServoConfig {
            start_angle: 30.0,
            ..config()
        });
        servo.ramp(&mut ctx, 30.0, 40.0, 1.0, Duration::ZERO, true).unwrap();
        servo.initialize(&mut ctx).unwrap();
        assert_eq!(probe.frequency(), Some(50.0));
        assert_eq!(probe.angle(0), Some(30.0));
        assert_eq!(servo.current_angle(), 30.0);
    }

    #[test]
    fn nudge_records_end_angle_and_clamps() {
        let (probe, mut ctx) = rig();
        let mut servo = ServoRamp::new(ServoConfig {
            start_angle: 178.0,
            ..config()
        });
        servo.nudge(&mut ctx, NudgeDirection::Up).unwrap();
        assert_eq!(servo.current_angle(), 180.0);
        assert_eq!(probe.angles(0), vec![178.0, 179.0, 180.0]);

        servo.nudge(&mut ctx, NudgeDirection::Down).unwrap();
        assert_eq!(servo.current_angle(), 175.0);
    }

    #[test]
    fn nudge_records_angle_on_resolution_grid() {
        let (probe, mut ctx) = rig();
        let mut servo = ServoRamp::new(ServoConfig {
            start_angle: 0.0,
            resolution: 2.0,
            nudge_step: 3.0,
            ..config()
        });
        servo.nudge(&mut ctx, NudgeDirection::Up).unwrap();
        assert_eq!(probe.angles(0), vec![0.0, 2.0, 4.0]);
        assert_eq!(servo.current_angle(), 4.0);
        assert_eq!(probe.angle(0), Some(servo.current_angle()));
    }

    #[test]
    fn failed_nudge_keeps_recorded_angle() {
        let (probe, mut ctx) = rig();
        probe.fail_channel(0);
        let mut servo = ServoRamp::new(config());
        let err = servo.nudge(&mut ctx, NudgeDirection::Up).unwrap_err();
        assert!(err.is_hardware_fault());
        assert_eq!(servo.current_angle(), 0.0);
    }

    proptest! {
        #[test]
        fn unrecorded_ramp_never_moves_current_angle(
            start in 0.0f64..=180.0,
            end in 0.0f64..=180.0,
            resolution in 0.5f64..20.0,
        ) {
            let (_probe, mut ctx) = rig();
            let mut servo = ServoRamp::new(ServoConfig { start_angle: 42.0, ..config() });
            servo.ramp(&mut ctx, start, end, resolution, Duration::ZERO, false).unwrap();
            prop_assert_eq!(servo.current_angle(), 42.0);
        }
    }
}
