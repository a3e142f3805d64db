//! Game configuration
//!
//! All tunables live in a single TOML file. Every section falls back to its defaults,
//! so a partial file (or none at all) still yields a playable setup.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CONFIG_ENV: &str = "REACTION_DUEL_CONFIG";
const CONFIG_DIR: &str = "reaction-duel";
const CONFIG_FILE: &str = "config.toml";

/// Single-ended inputs of the MCP3208
const ADC_CHANNELS: u8 = 8;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid joystick thresholds: {0}")]
    Thresholds(String),

    #[error("Invalid round timing: {0}")]
    Timing(String),

    #[error("Invalid pin layout: {0}")]
    Pins(String),
}

/// Top-level configuration file layout
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub thresholds: JoystickThresholds,
    pub timing: RoundTiming,
    pub pins: PinLayout,
    pub display: DisplaySettings,
    pub trigger: TriggerKind,
}

/// Classification thresholds in raw ADC counts
///
/// Readings below `low` or above `high` count as a deflection. A stick is centered when
/// both axes are strictly closer than `tolerance` to `center`.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct JoystickThresholds {
    pub low: u16,
    pub high: u16,
    pub center: u16,
    pub tolerance: u16,
    pub max_adc: u16,
}

impl Default for JoystickThresholds {
    fn default() -> Self {
        Self {
            low: 1000,
            high: 3000,
            center: 2048,
            tolerance: 600,
            max_adc: 4095,
        }
    }
}

/// Durations governing one round, all in milliseconds
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct RoundTiming {
    /// Lower bound of the random preparation delay
    pub min_delay_ms: u64,

    /// Upper bound of the random preparation delay (inclusive)
    pub max_delay_ms: u64,

    /// Pause between two samples of the reaction race
    pub poll_interval_ms: u64,

    /// How long the buzzer sounds after a foul
    pub foul_alert_ms: u64,

    /// Optional limit for the reaction race. `None` waits until someone matches.
    pub response_timeout_ms: Option<u64>,
}

impl Default for RoundTiming {
    fn default() -> Self {
        Self {
            min_delay_ms: 2000,
            max_delay_ms: 5000,
            poll_interval_ms: 10,
            foul_alert_ms: 1000,
            response_timeout_ms: None,
        }
    }
}

/// Wiring of the board, BCM GPIO numbering
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct PinLayout {
    pub led_up: u8,
    pub led_down: u8,
    pub led_left: u8,
    pub led_right: u8,
    pub buzzer: u8,
    /// Most piezo driver boards sound while the line is pulled low
    pub buzzer_active_low: bool,
    pub start_button: u8,
    pub start_debounce_ms: u64,
    /// SPI bus and chip select of the MCP3208 ADC
    pub spi_bus: u8,
    pub spi_chip_select: u8,
    pub spi_clock_hz: u32,
    pub player1_x_channel: u8,
    pub player1_y_channel: u8,
    pub player2_x_channel: u8,
    pub player2_y_channel: u8,
}

impl Default for PinLayout {
    fn default() -> Self {
        Self {
            led_up: 25,
            led_down: 26,
            led_left: 27,
            led_right: 4,
            buzzer: 15,
            buzzer_active_low: true,
            start_button: 17,
            start_debounce_ms: 30,
            spi_bus: 0,
            spi_chip_select: 0,
            spi_clock_hz: 1_000_000,
            player1_x_channel: 0,
            player1_y_channel: 1,
            player2_x_channel: 2,
            player2_y_channel: 3,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct DisplaySettings {
    pub enabled: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Source of the "start round" event
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Press Enter on the attached terminal
    #[default]
    Console,
    /// Debounced push button on `pins.start_button`
    Button,
}

impl GameConfig {
    /// Loads the configuration file, writing a default one if none exists yet
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        debug!("Resolved configuration path: {}", path.display());
        Self::load_from(&path)
    }

    /// Loads `path`, creating it with defaults when missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "No configuration found at {}, writing defaults",
                path.display()
            );
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses and validates configuration text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| eyre!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize config: {}", e))?;
        std::fs::write(path, content).map_err(|e| eyre!("Failed to write config file: {}", e))?;
        info!("Configuration written to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.thresholds.validate()?;
        self.timing.validate()?;
        self.pins.validate()
    }
}

impl JoystickThresholds {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(self.low < self.center && self.center < self.high && self.high <= self.max_adc) {
            return Err(ConfigError::Thresholds(format!(
                "expected low < center < high <= max_adc, got {} / {} / {} / {}",
                self.low, self.center, self.high, self.max_adc
            )));
        }
        if self.tolerance == 0 {
            return Err(ConfigError::Thresholds(
                "center tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl RoundTiming {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ConfigError::Timing(format!(
                "min_delay_ms ({}) exceeds max_delay_ms ({})",
                self.min_delay_ms, self.max_delay_ms
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Timing(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.response_timeout_ms == Some(0) {
            return Err(ConfigError::Timing(
                "response_timeout_ms must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

impl PinLayout {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let gpios = [
            self.led_up,
            self.led_down,
            self.led_left,
            self.led_right,
            self.buzzer,
            self.start_button,
        ];
        if let Some(pin) = first_duplicate(&gpios) {
            return Err(ConfigError::Pins(format!("GPIO {} assigned twice", pin)));
        }

        let channels = [
            self.player1_x_channel,
            self.player1_y_channel,
            self.player2_x_channel,
            self.player2_y_channel,
        ];
        if let Some(channel) = channels.iter().find(|c| **c >= ADC_CHANNELS) {
            return Err(ConfigError::Pins(format!(
                "ADC channel {} out of range 0..{}",
                channel, ADC_CHANNELS
            )));
        }
        if let Some(channel) = first_duplicate(&channels) {
            return Err(ConfigError::Pins(format!(
                "ADC channel {} shared by two axes",
                channel
            )));
        }
        Ok(())
    }
}

fn first_duplicate(values: &[u8]) -> Option<u8> {
    values
        .iter()
        .enumerate()
        .find(|(idx, value)| values[idx + 1..].contains(*value))
        .map(|(_, value)| *value)
}

fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    let mut path = dirs::config_dir().ok_or_else(|| eyre!("No configuration directory"))?;
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    Ok(path)
}
