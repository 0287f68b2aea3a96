//! Integration test: startup gating and shutdown.

use dispense_common::config::DiagnosticPolicy;
use dispense_common::hal::types::Level;
use dispense_control::ControlError;
use dispense_control::command::Command;
use dispense_control::experiment::ExperimentState;
use dispense_hal::drivers::simulation::LineFault;

use super::common::{fast_config, rig, started};

#[test]
fn startup_claims_every_line_low_and_homes_servo() {
    let config = fast_config();
    let rig = started(&config);

    assert_eq!(rig.orch.state(), ExperimentState::Idle);
    assert_eq!(rig.probe.claimed(), rig.orch.registry().len());
    assert!(rig.probe.all_low(&rig.orch.registry().pins()));
    assert_eq!(rig.probe.frequency(), Some(50.0));
    assert_eq!(rig.probe.angle(0), Some(0.0));
    assert_eq!(*rig.display.resets.lock(), 1);
}

#[test]
fn stuck_trigger_line_halts_startup() {
    let config = fast_config();
    let mut rig = rig(&config);
    rig.probe.inject(27, LineFault::StuckLow);

    match rig.orch.startup(&mut rig.ctx, true) {
        Err(ControlError::DiagnosticsFailed(report)) => {
            let failures = report.failures();
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].pin, 27);
        }
        other => panic!("expected diagnostics failure, got {other:?}"),
    }
    assert!(matches!(
        rig.orch.execute(&mut rig.ctx, &Command::Fire),
        Err(ControlError::Rejected(_))
    ));
}

#[test]
fn warn_policy_and_skip_both_reach_idle() {
    let mut config = fast_config();
    config.diagnostics.policy = DiagnosticPolicy::Warn;
    let mut warned = rig(&config);
    warned.probe.inject(16, LineFault::StuckHigh);
    assert!(warned.orch.startup(&mut warned.ctx, true).unwrap().is_some());
    assert_eq!(warned.orch.state(), ExperimentState::Idle);

    let config = fast_config();
    let mut skipped = rig(&config);
    skipped.probe.inject(16, LineFault::StuckHigh);
    assert!(skipped.orch.startup(&mut skipped.ctx, false).unwrap().is_none());
    assert_eq!(skipped.orch.state(), ExperimentState::Idle);
}

#[test]
fn unavailable_line_is_configuration_error() {
    let config = fast_config();
    let mut rig = rig(&config);
    rig.probe.inject(4, LineFault::Unavailable);
    let err = rig.orch.startup(&mut rig.ctx, true).unwrap_err();
    assert!(matches!(err, ControlError::Hal(ref e) if e.is_configuration()));
}

#[test]
fn shutdown_leaves_nothing_energized() {
    let config = fast_config();
    let mut rig = started(&config);
    rig.orch
        .execute(&mut rig.ctx, &"on led".parse().unwrap())
        .unwrap();
    assert_eq!(rig.probe.level(24), Some(Level::High));

    rig.orch.shutdown(&mut rig.ctx).unwrap();
    assert_eq!(rig.probe.claimed(), 0);
}

#[test]
fn self_test_hardware_fault_leaves_lines_low() {
    let config = fast_config();
    let mut rig = rig(&config);
    rig.probe.inject(27, LineFault::ReadFailure);

    let err = rig.orch.startup(&mut rig.ctx, true).unwrap_err();
    assert!(err.is_hardware_fault());
    assert_eq!(rig.orch.state(), ExperimentState::Unverified);
    assert_eq!(rig.probe.line_history(27).last(), Some(&Level::Low));
    assert!(rig.probe.all_low(&rig.orch.registry().pins()));
}

#[test]
fn reset_after_failed_startup_still_requires_diagnostics() {
    let config = fast_config();
    let mut rig = rig(&config);
    rig.probe.inject(13, LineFault::Unreachable);

    let err = rig.orch.startup(&mut rig.ctx, true).unwrap_err();
    assert!(err.is_hardware_fault());
    assert!(rig.orch.execute(&mut rig.ctx, &Command::Abort).is_err());
    assert_eq!(rig.orch.state(), ExperimentState::Faulted);

    rig.probe.clear_faults();
    rig.orch.execute(&mut rig.ctx, &Command::Reset).unwrap();
    assert_eq!(rig.orch.state(), ExperimentState::Unverified);
    assert!(matches!(
        rig.orch.execute(&mut rig.ctx, &Command::Fire),
        Err(ControlError::Rejected(_))
    ));

    rig.orch.startup(&mut rig.ctx, true).unwrap();
    assert_eq!(rig.orch.state(), ExperimentState::Idle);
    rig.orch.execute(&mut rig.ctx, &Command::Fire).unwrap();
}
