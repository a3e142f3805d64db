//! Raspberry Pi peripheral drivers built on rppal
//!
//! - Indicator LEDs and the buzzer are plain [`OutputPin`]s
//! - Joystick axes are sampled through an MCP3208 12-bit ADC on SPI
//! - The start button is a pulled-up input watched for falling edges

use super::{AnalogInput, HardwareError, StartTrigger};
use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const MCP3208_CHANNELS: u8 = 8;

/// Interval at which a waiting button re-checks for shutdown
const BUTTON_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Claims `pin` as an output at the given initial level
pub fn output_pin(gpio: &Gpio, pin: u8, initially_high: bool) -> Result<OutputPin, HardwareError> {
    let pin_handle = gpio.get(pin)?;
    let output = if initially_high {
        pin_handle.into_output_high()
    } else {
        pin_handle.into_output_low()
    };
    debug!(
        "GPIO {} configured as output, initially {}",
        pin,
        if initially_high { "high" } else { "low" }
    );
    Ok(output)
}

/// MCP3208 analog-to-digital converter shared by all joystick axes
#[derive(Clone)]
pub struct Mcp3208 {
    spi: Arc<Mutex<Spi>>,
}

impl Mcp3208 {
    pub fn open(bus: u8, chip_select: u8, clock_hz: u32) -> Result<Self, HardwareError> {
        let spi = Spi::new(spi_bus(bus)?, slave_select(chip_select)?, clock_hz, Mode::Mode0)?;
        info!(
            "MCP3208 opened on SPI{} CE{} at {} Hz",
            bus, chip_select, clock_hz
        );
        Ok(Self {
            spi: Arc::new(Mutex::new(spi)),
        })
    }

    /// Returns an input bound to one single-ended channel
    pub fn channel(&self, channel: u8) -> Result<Mcp3208Channel, HardwareError> {
        if channel >= MCP3208_CHANNELS {
            return Err(HardwareError::ChannelOutOfRange(channel));
        }
        Ok(Mcp3208Channel {
            adc: self.clone(),
            channel,
        })
    }

    fn read(&self, channel: u8) -> Result<u16, HardwareError> {
        let request = mcp3208_request(channel);
        let mut response = [0u8; 3];
        let mut spi = self
            .spi
            .lock()
            .map_err(|e| HardwareError::BusPoisoned(e.to_string()))?;
        spi.transfer(&mut response, &request)?;
        Ok(mcp3208_decode(&response))
    }
}

pub struct Mcp3208Channel {
    adc: Mcp3208,
    channel: u8,
}

impl AnalogInput for Mcp3208Channel {
    fn sample(&mut self) -> Result<u16, HardwareError> {
        self.adc.read(self.channel)
    }
}

/// Start bit, single-ended mode and the three channel select bits
fn mcp3208_request(channel: u8) -> [u8; 3] {
    [0b0000_0110 | (channel >> 2), (channel & 0b11) << 6, 0]
}

fn mcp3208_decode(response: &[u8; 3]) -> u16 {
    (u16::from(response[1] & 0x0F) << 8) | u16::from(response[2])
}

fn spi_bus(bus: u8) -> Result<Bus, HardwareError> {
    match bus {
        0 => Ok(Bus::Spi0),
        1 => Ok(Bus::Spi1),
        2 => Ok(Bus::Spi2),
        _ => Err(HardwareError::UnsupportedBus(format!("SPI bus {}", bus))),
    }
}

fn slave_select(chip_select: u8) -> Result<SlaveSelect, HardwareError> {
    match chip_select {
        0 => Ok(SlaveSelect::Ss0),
        1 => Ok(SlaveSelect::Ss1),
        2 => Ok(SlaveSelect::Ss2),
        _ => Err(HardwareError::UnsupportedBus(format!(
            "chip select {}",
            chip_select
        ))),
    }
}

/// Push button between a GPIO and ground
pub struct ButtonTrigger {
    pin: InputPin,
}

impl ButtonTrigger {
    pub fn new(gpio: &Gpio, pin: u8, debounce: Duration) -> Result<Self, HardwareError> {
        let mut input = gpio.get(pin)?.into_input_pullup();
        input.set_interrupt(Trigger::FallingEdge, Some(debounce))?;
        info!(
            "Start button on GPIO {} (debounce {} ms)",
            pin,
            debounce.as_millis()
        );
        Ok(Self { pin: input })
    }
}

impl StartTrigger for ButtonTrigger {
    fn wait_for_start(&mut self, shutdown: &CancellationToken) -> Result<bool, HardwareError> {
        loop {
            if shutdown.is_cancelled() {
                return Ok(false);
            }
            if self
                .pin
                .poll_interrupt(true, Some(BUTTON_POLL_INTERVAL))?
                .is_some()
            {
                debug!("Start button pressed");
                return Ok(true);
            }
        }
    }
}
