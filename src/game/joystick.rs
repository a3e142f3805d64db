use super::Direction;
use crate::config::JoystickThresholds;
use crate::hardware::{AnalogInput, HardwareError};
use tracing::debug;

/// One simultaneous sample of both axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisReading {
    pub x: u16,
    pub y: u16,
}

impl AxisReading {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Maps the reading onto a direction.
    ///
    /// The Y axis is checked before the X axis, so a diagonal deflection always
    /// reports Up or Down.
    pub fn classify(&self, thresholds: &JoystickThresholds) -> Direction {
        if self.y < thresholds.low {
            Direction::Up
        } else if self.y > thresholds.high {
            Direction::Down
        } else if self.x < thresholds.low {
            Direction::Left
        } else if self.x > thresholds.high {
            Direction::Right
        } else {
            Direction::Neutral
        }
    }

    /// True when both axes are strictly within the tolerance around center
    pub fn is_centered(&self, thresholds: &JoystickThresholds) -> bool {
        let near = |value: u16| value.abs_diff(thresholds.center) < thresholds.tolerance;
        near(self.x) && near(self.y)
    }
}

/// Reads one analog channel and clamps it into `[0, max_adc]`
pub struct AnalogAxisReader {
    input: Box<dyn AnalogInput>,
    max_adc: u16,
}

impl AnalogAxisReader {
    pub fn new(input: Box<dyn AnalogInput>, max_adc: u16) -> Self {
        Self { input, max_adc }
    }

    pub fn read(&mut self) -> Result<u16, HardwareError> {
        Ok(self.input.sample()?.min(self.max_adc))
    }
}

/// A two-axis joystick
pub struct JoystickSensor {
    x: AnalogAxisReader,
    y: AnalogAxisReader,
    thresholds: JoystickThresholds,
}

impl JoystickSensor {
    pub fn new(x: AnalogAxisReader, y: AnalogAxisReader, thresholds: JoystickThresholds) -> Self {
        Self { x, y, thresholds }
    }

    /// Builds a sensor straight from two raw inputs
    pub fn from_inputs(
        x: Box<dyn AnalogInput>,
        y: Box<dyn AnalogInput>,
        thresholds: JoystickThresholds,
    ) -> Self {
        Self::new(
            AnalogAxisReader::new(x, thresholds.max_adc),
            AnalogAxisReader::new(y, thresholds.max_adc),
            thresholds,
        )
    }

    pub fn snapshot(&mut self) -> Result<AxisReading, HardwareError> {
        let reading = AxisReading::new(self.x.read()?, self.y.read()?);
        debug!("Joystick sample: x={} y={}", reading.x, reading.y);
        Ok(reading)
    }

    pub fn classify(&mut self) -> Result<Direction, HardwareError> {
        Ok(self.snapshot()?.classify(&self.thresholds))
    }

    pub fn is_centered(&mut self) -> Result<bool, HardwareError> {
        Ok(self.snapshot()?.is_centered(&self.thresholds))
    }
}
