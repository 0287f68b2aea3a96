//! Operator command grammar.
//!
//! One command per input line. Words are case-insensitive; the single-key
//! forms (`d`, `s`, `v`, `esc`) are the rig's original keyboard bindings.
//!
//! ```text
//! left | right | up | down            jog the stage one display unit
//! zoom-in (d) | zoom-out (s)          jog the transformer axis one unit
//! jog <axis> <cw|acw> [units]         jog any axis by name
//! fire (v)                            reaction-trigger pulse
//! nudge up|down                       nudge the servo
//! dispense                            run the dispense experiment
//! on|off <relay|illumination|thermostat>
//! abort | reset | quit (esc)
//! ```

use dispense_common::io::role::LineRole;
use std::str::FromStr;
use std::sync::mpsc::Receiver;
use tracing::info;

use crate::error::ControlError;
use crate::servo::NudgeDirection;
use crate::stepper::Direction;

/// Axis driving the horizontal stage.
pub const LEFT_RIGHT_AXIS: &str = "left-right";
/// Axis driving the vertical stage.
pub const UP_DOWN_AXIS: &str = "up-down";
/// Transformer (reaction-stage height) axis.
pub const TRANSFORMER_AXIS: &str = "transformer";

/// Single-unit move bound to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    /// Stage left.
    Left,
    /// Stage right.
    Right,
    /// Stage up.
    Up,
    /// Stage down.
    Down,
    /// Transformer in.
    ZoomIn,
    /// Transformer out.
    ZoomOut,
}

impl Heading {
    /// Axis name and rotation direction for this heading.
    pub const fn motion(self) -> (&'static str, Direction) {
        match self {
            Self::Right => (LEFT_RIGHT_AXIS, Direction::Clockwise),
            Self::Left => (LEFT_RIGHT_AXIS, Direction::Anticlockwise),
            Self::Up => (UP_DOWN_AXIS, Direction::Anticlockwise),
            Self::Down => (UP_DOWN_AXIS, Direction::Clockwise),
            Self::ZoomIn => (TRANSFORMER_AXIS, Direction::Anticlockwise),
            Self::ZoomOut => (TRANSFORMER_AXIS, Direction::Clockwise),
        }
    }
}

/// Logical operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// One-unit move by key.
    Move(Heading),
    /// Named-axis jog.
    Jog {
        /// Axis name.
        axis: String,
        /// Rotation direction.
        direction: Direction,
        /// Display units to move.
        units: u32,
    },
    /// Reaction-trigger pulse.
    Fire,
    /// Servo nudge.
    Nudge(NudgeDirection),
    /// Full dispense experiment.
    Dispense,
    /// Switch a peripheral line.
    Switch {
        /// Peripheral role.
        role: LineRole,
        /// Target state.
        on: bool,
    },
    /// Cancel the in-flight command and force lines LOW.
    Abort,
    /// Leave the faulted state.
    Reset,
    /// Shut down.
    Quit,
}

fn expect_end<'a>(mut words: impl Iterator<Item = &'a str>) -> Result<(), ControlError> {
    match words.next() {
        None => Ok(()),
        Some(extra) => Err(ControlError::invalid(format!("unexpected argument '{extra}'"))),
    }
}

impl FromStr for Command {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let mut words = lowered.split_whitespace();
        let head = words
            .next()
            .ok_or_else(|| ControlError::invalid("empty command"))?;

        let command = match head {
            "left" => Self::Move(Heading::Left),
            "right" => Self::Move(Heading::Right),
            "up" => Self::Move(Heading::Up),
            "down" => Self::Move(Heading::Down),
            "zoom-in" | "d" => Self::Move(Heading::ZoomIn),
            "zoom-out" | "s" => Self::Move(Heading::ZoomOut),
            "fire" | "v" => Self::Fire,
            "dispense" => Self::Dispense,
            "abort" => Self::Abort,
            "reset" => Self::Reset,
            "quit" | "esc" | "exit" => Self::Quit,
            "jog" => {
                let axis = words
                    .next()
                    .ok_or_else(|| ControlError::invalid("jog needs an axis"))?
                    .to_string();
                let direction: Direction = words
                    .next()
                    .ok_or_else(|| ControlError::invalid("jog needs a direction"))?
                    .parse()?;
                let units = match words.next() {
                    None => 1,
                    Some(n) => n
                        .parse()
                        .map_err(|_| ControlError::invalid(format!("bad unit count '{n}'")))?,
                };
                Self::Jog {
                    axis,
                    direction,
                    units,
                }
            }
            "nudge" => {
                let direction = words
                    .next()
                    .ok_or_else(|| ControlError::invalid("nudge needs up or down"))?
                    .parse()?;
                Self::Nudge(direction)
            }
            "on" | "off" => {
                let name = words
                    .next()
                    .ok_or_else(|| ControlError::invalid(format!("{head} needs a peripheral")))?;
                let role: LineRole = name.parse().map_err(ControlError::InvalidCommand)?;
                if !role.is_switchable() {
                    return Err(ControlError::invalid(format!("{role} cannot be switched")));
                }
                Self::Switch {
                    role,
                    on: head == "on",
                }
            }
            other => return Err(ControlError::invalid(format!("unknown command '{other}'"))),
        };
        expect_end(words)?;
        Ok(command)
    }
}

/// Drop queued commands up to and including the next `Abort`.
///
/// Called after a command was interrupted: whatever was queued ahead of the
/// abort is cancelled with it. Stops early at `Quit`, which is returned so
/// the caller can still honour it.
pub fn discard_until_abort(rx: &Receiver<Command>) -> Option<Command> {
    while let Ok(command) = rx.try_recv() {
        match command {
            Command::Abort => return None,
            Command::Quit => return Some(Command::Quit),
            other => info!("Discarding {:?} queued before abort", other),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn parse(s: &str) -> Command {
        s.parse().unwrap()
    }

    #[test]
    fn key_aliases() {
        assert_eq!(parse("d"), Command::Move(Heading::ZoomIn));
        assert_eq!(parse("S"), Command::Move(Heading::ZoomOut));
        assert_eq!(parse("v"), Command::Fire);
        assert_eq!(parse("esc"), Command::Quit);
        assert_eq!(parse("  Left "), Command::Move(Heading::Left));
    }

    #[test]
    fn jog_with_and_without_units() {
        assert_eq!(
            parse("jog up-down acw 5"),
            Command::Jog {
                axis: "up-down".into(),
                direction: Direction::Anticlockwise,
                units: 5
            }
        );
        assert_eq!(
            parse("jog transformer cw"),
            Command::Jog {
                axis: "transformer".into(),
                direction: Direction::Clockwise,
                units: 1
            }
        );
    }

    #[test]
    fn jog_rejects_unknown_direction() {
        assert!(matches!(
            "jog left-right sideways".parse::<Command>(),
            Err(ControlError::InvalidCommand(_))
        ));
        assert!("jog left-right cw -1".parse::<Command>().is_err());
    }

    #[test]
    fn switch_only_switchable_roles() {
        assert_eq!(
            parse("on led"),
            Command::Switch {
                role: LineRole::Illumination,
                on: true
            }
        );
        assert_eq!(
            parse("off thermostat"),
            Command::Switch {
                role: LineRole::Thermostat,
                on: false
            }
        );
        assert!("on camera".parse::<Command>().is_err());
        assert!("on trigger".parse::<Command>().is_err());
    }

    #[test]
    fn nudge_and_trailing_garbage() {
        assert_eq!(parse("nudge down"), Command::Nudge(NudgeDirection::Down));
        assert!("nudge".parse::<Command>().is_err());
        assert!("fire now".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
        assert!("teleport".parse::<Command>().is_err());
    }

    #[test]
    fn headings_follow_stage_wiring() {
        assert_eq!(Heading::Right.motion(), (LEFT_RIGHT_AXIS, Direction::Clockwise));
        assert_eq!(Heading::Up.motion(), (UP_DOWN_AXIS, Direction::Anticlockwise));
        assert_eq!(Heading::ZoomIn.motion(), (TRANSFORMER_AXIS, Direction::Anticlockwise));
    }

    #[test]
    fn commands_queued_before_abort_are_dropped() {
        let (tx, rx) = mpsc::channel();
        for command in [Command::Fire, Command::Dispense, Command::Abort, Command::Fire] {
            tx.send(command).unwrap();
        }
        assert_eq!(discard_until_abort(&rx), None);
        assert_eq!(rx.try_recv(), Ok(Command::Fire));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn quit_survives_discard() {
        let (tx, rx) = mpsc::channel();
        tx.send(Command::Fire).unwrap();
        tx.send(Command::Quit).unwrap();
        assert_eq!(discard_until_abort(&rx), Some(Command::Quit));

        drop(tx);
        assert_eq!(discard_until_abort(&rx), None);
    }
}
