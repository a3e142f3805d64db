//! Hardware collaborators of the game
//!
//! The game logic never touches pins or buses directly. Every peripheral is reached
//! through one of the traits below and handed in at construction time:
//!
//! ```text
//! AnalogInput    ──► AnalogAxisReader ──► JoystickSensor
//! DigitalOutput  ──► IndicatorBank / AlertSignal
//! DisplaySurface ──► status screen (optional)
//! StartTrigger   ──► GameLoop
//! Clock          ──► RoundController timing
//! ```
//!
//! [`gpio`] provides the Raspberry Pi implementations (rppal), [`console`] the terminal
//! based ones and [`clock`] the monotonic system clock.

pub mod clock;
pub mod console;
pub mod gpio;

use crate::game::screen::StatusScreen;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Errors raised by peripheral drivers
///
/// The game does not try to recover from any of these. A fault aborts the running
/// round and is reported to the game loop.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("SPI error: {0}")]
    Spi(#[from] rppal::spi::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported SPI selection: {0}")]
    UnsupportedBus(String),

    #[error("ADC channel {0} does not exist")]
    ChannelOutOfRange(u8),

    #[error("ADC bus unavailable: {0}")]
    BusPoisoned(String),

    #[error("Start trigger closed")]
    TriggerClosed,
}

/// A single analog input channel returning raw converter counts
pub trait AnalogInput: Send {
    fn sample(&mut self) -> Result<u16, HardwareError>;
}

/// A digital output line
pub trait DigitalOutput: Send {
    fn set_high(&mut self);
    fn set_low(&mut self);
}

/// Text display with a fixed number of lines
pub trait DisplaySurface: Send {
    fn show(&mut self, screen: &StatusScreen) -> Result<(), HardwareError>;
}

/// External "start round" event source
pub trait StartTrigger: Send {
    /// Blocks until a start is requested.
    ///
    /// Returns `Ok(false)` once `shutdown` is cancelled instead of a start event.
    fn wait_for_start(&mut self, shutdown: &CancellationToken) -> Result<bool, HardwareError>;
}

/// Monotonic time source
pub trait Clock: Send {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;

    fn sleep(&mut self, duration: Duration);
}

impl DigitalOutput for rppal::gpio::OutputPin {
    fn set_high(&mut self) {
        rppal::gpio::OutputPin::set_high(self);
    }

    fn set_low(&mut self) {
        rppal::gpio::OutputPin::set_low(self);
    }
}
