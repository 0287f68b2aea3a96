//! Shared fixtures.

use dispense_common::prelude::*;
use dispense_control::display::PositionDisplay;
use dispense_control::experiment::Orchestrator;
use dispense_control::{ActuationContext, CancelToken};
use dispense_hal::drivers::simulation::SimProbe;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Shipped configuration with every delay zeroed.
pub fn fast_config() -> RigConfig {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/rig.toml");
    let mut config = RigConfig::load(&path).expect("shipped config");
    for axis in &mut config.axes {
        axis.inter_phase_delay_ms = 0;
        axis.phase_cycles_per_unit = 4;
    }
    config.pulse.trigger_high_ms = 0;
    config.pulse.camera_high_ms = 0;
    config.pulse.cooldown_ms = 0;
    config.servo.step_delay_ms = 0;
    config.experiment.dwell_ms = 0;
    config
}

/// Everything the display was asked to render.
#[derive(Clone, Default)]
pub struct Recorded {
    pub positions: Arc<Mutex<Vec<(f64, f64)>>>,
    pub resets: Arc<Mutex<usize>>,
}

impl PositionDisplay for Recorded {
    fn render_position(&mut self, x: f64, y: f64) {
        self.positions.lock().push((x, y));
    }

    fn reset_view(&mut self) {
        *self.resets.lock() += 1;
    }
}

pub struct Rig {
    pub probe: SimProbe,
    pub ctx: ActuationContext,
    pub orch: Orchestrator,
    pub display: Recorded,
}

/// Simulated rig for `config`, not yet started.
pub fn rig(config: &RigConfig) -> Rig {
    let probe = SimProbe::new();
    let ctx = ActuationContext::new(
        Box::new(probe.port()),
        Box::new(probe.servo()),
        CancelToken::new(),
    );
    let display = Recorded::default();
    let orch = Orchestrator::new(config, Box::new(display.clone())).expect("orchestrator");
    Rig {
        probe,
        ctx,
        orch,
        display,
    }
}

/// Simulated rig that has passed startup.
pub fn started(config: &RigConfig) -> Rig {
    let mut rig = rig(config);
    rig.orch.startup(&mut rig.ctx, true).expect("startup");
    rig
}
