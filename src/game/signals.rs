//! Direction indicators and the foul buzzer

use super::{Direction, GameError};
use crate::hardware::DigitalOutput;
use tracing::debug;

/// Four direction LEDs, at most one of which the game lights at a time
pub struct IndicatorBank {
    up: Box<dyn DigitalOutput>,
    down: Box<dyn DigitalOutput>,
    left: Box<dyn DigitalOutput>,
    right: Box<dyn DigitalOutput>,
}

impl IndicatorBank {
    pub fn new(
        up: Box<dyn DigitalOutput>,
        down: Box<dyn DigitalOutput>,
        left: Box<dyn DigitalOutput>,
        right: Box<dyn DigitalOutput>,
    ) -> Self {
        Self {
            up,
            down,
            left,
            right,
        }
    }

    /// Lights the LED for `direction`.
    ///
    /// Other LEDs are left untouched; call [`IndicatorBank::reset_all`] first for a
    /// clean state. `Direction::Neutral` has no LED and is rejected.
    pub fn activate(&mut self, direction: Direction) -> Result<(), GameError> {
        let led = match direction {
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
            Direction::Neutral => {
                return Err(GameError::InvalidArgument(
                    "no indicator exists for the neutral direction".to_string(),
                ))
            }
        };
        led.set_high();
        debug!("Indicator {} on", direction);
        Ok(())
    }

    pub fn reset_all(&mut self) {
        self.up.set_low();
        self.down.set_low();
        self.left.set_low();
        self.right.set_low();
        debug!("All indicators off");
    }
}

/// Buzzer named by effect rather than by line level
pub struct AlertSignal {
    line: Box<dyn DigitalOutput>,
    active_low: bool,
}

impl AlertSignal {
    pub fn new(line: Box<dyn DigitalOutput>, active_low: bool) -> Self {
        Self { line, active_low }
    }

    /// Makes the buzzer sound
    pub fn assert(&mut self) {
        if self.active_low {
            self.line.set_low();
        } else {
            self.line.set_high();
        }
        debug!("Alert sounding");
    }

    /// Silences the buzzer
    pub fn clear(&mut self) {
        if self.active_low {
            self.line.set_high();
        } else {
            self.line.set_low();
        }
        debug!("Alert silent");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Line(Arc<Mutex<Vec<bool>>>);

    impl Line {
        fn level(&self) -> Option<bool> {
            self.0.lock().unwrap().last().copied()
        }
    }

    impl DigitalOutput for Line {
        fn set_high(&mut self) {
            self.0.lock().unwrap().push(true);
        }

        fn set_low(&mut self) {
            self.0.lock().unwrap().push(false);
        }
    }

    fn bank() -> (IndicatorBank, [Line; 4]) {
        let lines: [Line; 4] = Default::default();
        let bank = IndicatorBank::new(
            Box::new(lines[0].clone()),
            Box::new(lines[1].clone()),
            Box::new(lines[2].clone()),
            Box::new(lines[3].clone()),
        );
        (bank, lines)
    }

    #[test]
    fn activate_lights_only_the_requested_led() {
        let (mut bank, lines) = bank();
        bank.reset_all();
        bank.activate(Direction::Left).unwrap();

        let levels: Vec<Option<bool>> = lines.iter().map(Line::level).collect();
        assert_eq!(
            levels,
            vec![Some(false), Some(false), Some(true), Some(false)]
        );
    }

    #[test]
    fn activate_does_not_reset_others() {
        let (mut bank, lines) = bank();
        bank.activate(Direction::Up).unwrap();
        bank.activate(Direction::Right).unwrap();

        assert_eq!(lines[0].level(), Some(true));
        assert_eq!(lines[3].level(), Some(true));
    }

    #[test]
    fn neutral_is_invalid() {
        let (mut bank, lines) = bank();
        assert!(matches!(
            bank.activate(Direction::Neutral),
            Err(GameError::InvalidArgument(_))
        ));
        assert!(lines.iter().all(|line| line.level().is_none()));
    }

    #[test]
    fn active_low_alert_inverts_levels() {
        let line = Line::default();
        let mut alert = AlertSignal::new(Box::new(line.clone()), true);

        alert.assert();
        assert_eq!(line.level(), Some(false));
        alert.clear();
        assert_eq!(line.level(), Some(true));
    }

    #[test]
    fn active_high_alert_follows_levels() {
        let line = Line::default();
        let mut alert = AlertSignal::new(Box::new(line.clone()), false);

        alert.assert();
        assert_eq!(line.level(), Some(true));
        alert.clear();
        assert_eq!(line.level(), Some(false));
    }
}
