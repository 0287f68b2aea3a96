//! Integration test: abort and fault handling.
//!
//! An abort from another thread interrupts the dwell, forces every line LOW
//! and returns the rig to `Idle`; a hardware fault parks it in `Faulted`.

use dispense_common::hal::types::Level;
use dispense_control::ControlError;
use dispense_control::command::Command;
use dispense_control::experiment::ExperimentState;
use dispense_hal::drivers::simulation::LineFault;
use std::thread;
use std::time::{Duration, Instant};

use super::common::{fast_config, started};

#[test]
fn abort_mid_dwell_forces_safe_state() {
    let mut config = fast_config();
    config.experiment.dwell_ms = 10_000;
    let mut rig = started(&config);
    rig.orch
        .execute(&mut rig.ctx, &"on thermostat".parse().unwrap())
        .unwrap();

    let remote = rig.ctx.cancel.clone();
    let aborter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        remote.cancel();
    });

    let start = Instant::now();
    let err = rig.orch.execute(&mut rig.ctx, &Command::Dispense).unwrap_err();
    aborter.join().unwrap();

    assert!(matches!(err, ControlError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(rig.orch.state(), ExperimentState::Idle);
    assert!(rig.probe.all_low(&rig.orch.registry().pins()));
    assert!(!rig.ctx.cancel.is_cancelled());
    // Raise ramp completed and was recorded before the dwell.
    assert_eq!(rig.orch.servo().current_angle(), 90.0);

    // Follow-up abort command from the input thread is harmless.
    rig.orch.execute(&mut rig.ctx, &Command::Abort).unwrap();
    rig.orch.execute(&mut rig.ctx, &Command::Fire).unwrap();
}

#[test]
fn abort_mid_jog_keeps_position() {
    let mut config = fast_config();
    config.axes[0].phase_cycles_per_unit = 100;
    config.axes[0].inter_phase_delay_ms = 10;
    let mut rig = started(&config);

    let remote = rig.ctx.cancel.clone();
    let aborter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        remote.cancel();
    });

    let err = rig
        .orch
        .execute(&mut rig.ctx, &"right".parse().unwrap())
        .unwrap_err();
    aborter.join().unwrap();

    assert!(matches!(err, ControlError::Cancelled));
    assert_eq!(rig.orch.position().x, 0);
    assert!(rig.probe.all_low(&[17, 22, 13, 12]));
}

#[test]
fn winding_fault_faults_rig_until_reset() {
    let config = fast_config();
    let mut rig = started(&config);
    rig.probe.inject(19, LineFault::Unreachable);

    let err = rig
        .orch
        .execute(&mut rig.ctx, &"up".parse().unwrap())
        .unwrap_err();
    assert!(err.is_hardware_fault());
    assert_eq!(rig.orch.state(), ExperimentState::Faulted);
    assert_eq!(rig.probe.level(18), Some(Level::Low));

    assert!(matches!(
        rig.orch.execute(&mut rig.ctx, &Command::Dispense),
        Err(ControlError::Rejected(_))
    ));

    rig.probe.clear_faults();
    rig.orch.execute(&mut rig.ctx, &Command::Reset).unwrap();
    rig.orch.execute(&mut rig.ctx, &"up".parse().unwrap()).unwrap();
    assert_eq!(rig.orch.position().y, 1);
}

#[test]
fn reset_rejected_when_not_faulted() {
    let config = fast_config();
    let mut rig = started(&config);
    assert!(matches!(
        rig.orch.execute(&mut rig.ctx, &Command::Reset),
        Err(ControlError::Rejected(_))
    ));
}
