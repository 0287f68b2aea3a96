//! Integration test: operator workflows on an idle rig.
//!
//! Stage jogs with position readout, trigger pulses and the full dispense
//! experiment, observed through the simulation journal.

use dispense_common::hal::types::Level;
use dispense_control::command::Command;
use dispense_control::experiment::ExperimentState;
use dispense_control::stepper::CLOCKWISE;
use dispense_hal::drivers::simulation::SimEvent;

use super::common::{fast_config, started};

fn run(rig: &mut super::common::Rig, line: &str) {
    let command: Command = line.parse().expect("command");
    rig.orch.execute(&mut rig.ctx, &command).expect(line);
}

#[test]
fn stage_jogs_update_readout_in_millimetres() {
    let config = fast_config();
    let mut rig = started(&config);

    run(&mut rig, "right");
    run(&mut rig, "right");
    run(&mut rig, "up");
    run(&mut rig, "jog left-right acw 5");
    run(&mut rig, "down");

    let positions = rig.display.positions.lock().clone();
    // Initial render plus one per tracked jog.
    assert_eq!(positions.len(), 6);
    let (x, y) = positions[positions.len() - 1];
    assert!((x - (-0.3)).abs() < 1e-9, "x = {x}");
    assert!(y.abs() < 1e-9, "y = {y}");
}

#[test]
fn transformer_moves_without_readout() {
    let config = fast_config();
    let mut rig = started(&config);

    run(&mut rig, "d");
    run(&mut rig, "s");

    assert_eq!(rig.display.positions.lock().len(), 1);
    assert_eq!(rig.orch.stepper().cursor("transformer"), Some(0));
}

#[test]
fn full_revolution_on_left_right() {
    let mut config = fast_config();
    config.axes[0].phase_cycles_per_unit = 8;
    let mut rig = started(&config);
    rig.probe.clear_journal();

    run(&mut rig, "right");

    let written = rig.probe.group_writes(&[17, 22, 13, 12]);
    assert_eq!(written.len(), 9);
    for (levels, pattern) in written.iter().zip(CLOCKWISE.iter().cycle()) {
        assert_eq!(levels, &pattern.levels().to_vec());
    }
    assert_eq!(rig.orch.stepper().cursor("left-right"), Some(0));
}

#[test]
fn fire_pulses_trigger_line() {
    let config = fast_config();
    let mut rig = started(&config);
    rig.probe.clear_journal();

    run(&mut rig, "v");

    assert_eq!(rig.probe.line_history(27), vec![Level::High, Level::Low]);
}

#[test]
fn dispense_runs_the_experiment_in_order() {
    let config = fast_config();
    let mut rig = started(&config);
    run(&mut rig, "on thermostat");
    rig.probe.clear_journal();

    run(&mut rig, "dispense");

    assert_eq!(rig.orch.state(), ExperimentState::Idle);
    let journal = rig.probe.journal();
    let index_of = |wanted: &SimEvent| {
        journal
            .iter()
            .position(|e| e == wanted)
            .unwrap_or_else(|| panic!("missing {wanted:?}"))
    };
    let write = |pin, level| SimEvent::Write {
        pins: vec![pin],
        levels: vec![level],
    };

    let led_on = index_of(&write(24, Level::High));
    let strobe = index_of(&write(25, Level::High));
    let raised = index_of(&SimEvent::Angle {
        channel: 0,
        angle: 90.0,
    });
    let thermostat_off = index_of(&write(16, Level::Low));
    let led_off = index_of(&write(24, Level::Low));
    assert!(led_on < strobe);
    assert!(strobe < raised);
    assert!(raised < thermostat_off);
    assert!(thermostat_off < led_off);

    let angles = rig.probe.angles(0);
    assert_eq!(angles.len(), 91 * 2);
    assert_eq!(angles.first(), Some(&0.0));
    assert_eq!(angles.last(), Some(&0.0));
    assert_eq!(rig.orch.servo().current_angle(), 0.0);
    assert!(rig.probe.all_low(&[16, 24, 25, 27]));
}

#[test]
fn nudges_move_recorded_angle() {
    let config = fast_config();
    let mut rig = started(&config);

    run(&mut rig, "nudge up");
    run(&mut rig, "nudge up");
    run(&mut rig, "nudge down");

    assert_eq!(rig.orch.servo().current_angle(), 5.0);
}
