//! GPIO output lines.

use dispense_common::hal::driver::{HalError, OutputPort, check_group};
use dispense_common::hal::types::{Level, Pin, PinMode};
use rppal::gpio::{self, Gpio, IoPin, Mode};
use std::collections::BTreeMap;
use tracing::debug;

/// Output lines claimed from the BCM GPIO bank.
pub struct RpiPort {
    gpio: Gpio,
    lines: BTreeMap<Pin, IoPin>,
}

impl RpiPort {
    /// Wrap an open GPIO handle. No line is claimed yet.
    pub fn new(gpio: Gpio) -> Self {
        Self {
            gpio,
            lines: BTreeMap::new(),
        }
    }

    fn line(&mut self, pin: Pin) -> Result<&mut IoPin, HalError> {
        self.lines.get_mut(&pin).ok_or_else(|| HalError::Configuration {
            pin,
            reason: "line not configured as output".to_string(),
        })
    }
}

fn to_rppal(level: Level) -> gpio::Level {
    match level {
        Level::Low => gpio::Level::Low,
        Level::High => gpio::Level::High,
    }
}

impl OutputPort for RpiPort {
    fn name(&self) -> &'static str {
        "rpi"
    }

    fn configure(&mut self, pin: Pin, initial: Level) -> Result<(), HalError> {
        if self.lines.contains_key(&pin) {
            return Err(HalError::Configuration {
                pin,
                reason: "line already claimed".to_string(),
            });
        }
        let raw = self.gpio.get(pin).map_err(|e| HalError::Configuration {
            pin,
            reason: e.to_string(),
        })?;
        // Bidirectional handle so read-back and mode reflect the pad itself.
        let mut output = raw.into_io(Mode::Output);
        output.write(to_rppal(initial));
        debug!("rpi: pin {} claimed as output ({})", pin, initial);
        self.lines.insert(pin, output);
        Ok(())
    }

    fn write(&mut self, pin: Pin, level: Level) -> Result<(), HalError> {
        self.line(pin)?.write(to_rppal(level));
        Ok(())
    }

    fn write_group(&mut self, pins: &[Pin], levels: &[Level]) -> Result<(), HalError> {
        check_group(pins, levels)?;
        for &pin in pins {
            self.line(pin)?;
        }
        for (&pin, &level) in pins.iter().zip(levels) {
            self.line(pin)?.write(to_rppal(level));
        }
        Ok(())
    }

    fn read(&self, pin: Pin) -> Result<Level, HalError> {
        let line = self.lines.get(&pin).ok_or_else(|| HalError::Configuration {
            pin,
            reason: "line not configured".to_string(),
        })?;
        Ok(Level::from(line.is_high()))
    }

    fn mode_of(&self, pin: Pin) -> PinMode {
        match self.lines.get(&pin) {
            None => PinMode::Unconfigured,
            Some(line) => match line.mode() {
                Mode::Output => PinMode::Output,
                Mode::Input => PinMode::Input,
                _ => PinMode::Alternate,
            },
        }
    }

    fn release(&mut self) -> Result<(), HalError> {
        for (pin, line) in self.lines.iter_mut() {
            line.set_low();
            debug!("rpi: pin {} released", pin);
        }
        self.lines.clear();
        Ok(())
    }
}
