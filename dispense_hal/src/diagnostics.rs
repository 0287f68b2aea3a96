//! Pin self-test.
//!
//! Runs once at startup before any motion. Every configured line is checked
//! for output mode and HIGH/LOW read-back. Mismatches are collected per line
//! and never stop the run; a transport fault aborts the whole verification.

use dispense_common::hal::driver::{HalError, OutputPort};
use dispense_common::hal::types::{Level, Pin, PinMode};
use dispense_common::io::registry::LineBinding;
use dispense_common::io::role::LineRole;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

/// What was wrong with one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticMismatch {
    /// Line is not configured as an output.
    Mode {
        /// Mode reported by the port.
        observed: PinMode,
    },
    /// Read-back differs from the written level.
    ReadBack {
        /// Level written.
        expected: Level,
        /// Level read back.
        observed: Level,
    },
}

impl fmt::Display for DiagnosticMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mode { observed } => write!(f, "expected mode output, observed {observed}"),
            Self::ReadBack { expected, observed } => {
                write!(f, "expected {expected}, observed {observed}")
            }
        }
    }
}

/// One failing check on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineFailure {
    /// Line number.
    pub pin: Pin,
    /// Role bound to the line, if known.
    pub role: Option<LineRole>,
    /// Failing check.
    pub mismatch: DiagnosticMismatch,
}

impl fmt::Display for LineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            Some(role) => write!(f, "pin {} ({}): {}", self.pin, role, self.mismatch),
            None => write!(f, "pin {}: {}", self.pin, self.mismatch),
        }
    }
}

/// Outcome for one line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineVerdict {
    /// Role bound to the line, if known.
    pub role: Option<LineRole>,
    /// Every failing check; empty means the line passed.
    pub mismatches: Vec<DiagnosticMismatch>,
}

impl LineVerdict {
    /// True if every check passed.
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Per-line result of a self-test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticReport {
    lines: BTreeMap<Pin, LineVerdict>,
}

impl DiagnosticReport {
    /// True if every line passed.
    pub fn is_pass(&self) -> bool {
        self.lines.values().all(LineVerdict::passed)
    }

    /// Lines that passed every check.
    pub fn passed(&self) -> Vec<Pin> {
        self.lines
            .iter()
            .filter(|(_, v)| v.passed())
            .map(|(&p, _)| p)
            .collect()
    }

    /// Every failing check, ordered by line.
    pub fn failures(&self) -> Vec<LineFailure> {
        self.lines
            .iter()
            .flat_map(|(&pin, v)| {
                v.mismatches.iter().map(move |&mismatch| LineFailure {
                    pin,
                    role: v.role,
                    mismatch,
                })
            })
            .collect()
    }

    /// Lines with at least one failing check.
    pub fn failing_pins(&self) -> Vec<Pin> {
        self.lines
            .iter()
            .filter(|(_, v)| !v.passed())
            .map(|(&p, _)| p)
            .collect()
    }

    /// Verdict for one line.
    pub fn verdict(&self, pin: Pin) -> Option<&LineVerdict> {
        self.lines.get(&pin)
    }

    /// Number of lines checked.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True if no line was checked.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failing = self.failing_pins().len();
        write!(f, "{} lines checked, {} failing", self.len(), failing)
    }
}

fn check_level(
    port: &mut dyn OutputPort,
    pin: Pin,
    level: Level,
    verdict: &mut LineVerdict,
) -> Result<(), HalError> {
    port.write(pin, level)?;
    let observed = port.read(pin)?;
    if observed != level {
        verdict.mismatches.push(DiagnosticMismatch::ReadBack {
            expected: level,
            observed,
        });
    }
    Ok(())
}

/// Self-test every line in `lines`.
///
/// Lines that are not claimed as outputs get a mode mismatch and no level
/// checks. Every checked line is left LOW.
///
/// # Errors
/// Propagates the first write/read error; the report is discarded. The
/// failing line is driven LOW on a best-effort basis first.
pub fn verify(
    port: &mut dyn OutputPort,
    lines: &[LineBinding],
) -> Result<DiagnosticReport, HalError> {
    let mut report = DiagnosticReport::default();
    for binding in lines {
        let pin = binding.pin;
        let mut verdict = LineVerdict {
            role: Some(binding.role),
            mismatches: Vec::new(),
        };

        let mode = port.mode_of(pin);
        if mode != PinMode::Output {
            verdict.mismatches.push(DiagnosticMismatch::Mode { observed: mode });
        }
        if mode != PinMode::Unconfigured {
            let checked = check_level(port, pin, Level::High, &mut verdict)
                .and_then(|()| check_level(port, pin, Level::Low, &mut verdict));
            if let Err(e) = checked {
                if let Err(low) = port.write(pin, Level::Low) {
                    warn!("diagnostics: pin {} not returned LOW: {}", pin, low);
                }
                return Err(e);
            }
        }

        debug!("diagnostics: pin {} ({}) passed={}", pin, binding.role, verdict.passed());
        report.lines.insert(pin, verdict);
    }
    info!("Pin diagnostics: {}", report);
    Ok(report)
}
