pub mod config;
pub mod game;
pub mod game_loop;
pub mod hardware;

use crate::config::{GameConfig, TriggerKind};
use crate::game::joystick::JoystickSensor;
use crate::game::random::ThreadRandomness;
use crate::game::round::GameRig;
use crate::game::signals::{AlertSignal, IndicatorBank};
use crate::game_loop::{GameLoop, GameLoopHandle};
use crate::hardware::clock::MonotonicClock;
use crate::hardware::console::{ConsoleDisplay, ConsoleTrigger};
use crate::hardware::gpio::{output_pin, ButtonTrigger, Mcp3208};
use crate::hardware::{DisplaySurface, StartTrigger};
use color_eyre::{eyre::eyre, Result};
use rppal::gpio::Gpio;
use std::str::FromStr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = GameConfig::load()?;
    info!("Starting reaction duel");
    debug!("Configuration: {:?}", config);

    let gpio = Gpio::new().map_err(|e| eyre!("Failed to access GPIO: {}", e))?;
    let abort = CancellationToken::new();
    let rig = build_rig(&gpio, &config, abort.clone())?;
    let trigger = build_trigger(&gpio, &config)?;

    let shutdown = CancellationToken::new();
    let handle = GameLoopHandle::spawn(GameLoop::new(
        rig,
        trigger,
        config.timing,
        shutdown.clone(),
    ));

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping after the current round");
                shutdown.cancel();
            }
            Err(e) => {
                error!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Second Ctrl-C, aborting the current round");
            abort.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Third Ctrl-C, exiting now, LEDs and buzzer may be left driven");
            std::process::exit(130);
        }
    });

    let tally = handle
        .join()
        .await
        .map_err(|e| eyre!("Game loop failed: {}", e))?;
    info!("Final session: {}", tally);
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env(log_level(std::env::var("RUST_LOG").ok().as_deref()));
    Ok(())
}

/// Plain level names only, anything else falls back to info
fn log_level(rust_log: Option<&str>) -> Level {
    rust_log
        .and_then(|value| Level::from_str(value.trim()).ok())
        .unwrap_or(Level::INFO)
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

fn build_rig(gpio: &Gpio, config: &GameConfig, abort: CancellationToken) -> Result<GameRig> {
    let pins = &config.pins;

    let adc = Mcp3208::open(pins.spi_bus, pins.spi_chip_select, pins.spi_clock_hz)?;
    let joystick = |x: u8, y: u8| -> Result<JoystickSensor> {
        Ok(JoystickSensor::from_inputs(
            Box::new(adc.channel(x)?),
            Box::new(adc.channel(y)?),
            config.thresholds,
        ))
    };
    let player1 = joystick(pins.player1_x_channel, pins.player1_y_channel)?;
    let player2 = joystick(pins.player2_x_channel, pins.player2_y_channel)?;

    let indicators = IndicatorBank::new(
        Box::new(output_pin(gpio, pins.led_up, false)?),
        Box::new(output_pin(gpio, pins.led_down, false)?),
        Box::new(output_pin(gpio, pins.led_left, false)?),
        Box::new(output_pin(gpio, pins.led_right, false)?),
    );

    // Start silent whatever the polarity
    let buzzer = output_pin(gpio, pins.buzzer, pins.buzzer_active_low)?;
    let alert = AlertSignal::new(Box::new(buzzer), pins.buzzer_active_low);

    let display: Option<Box<dyn DisplaySurface>> = if config.display.enabled {
        Some(Box::new(ConsoleDisplay::stdout()))
    } else {
        info!("Display disabled, status is reported through the log only");
        None
    };

    Ok(GameRig {
        player1,
        player2,
        indicators,
        alert,
        display,
        clock: Box::new(MonotonicClock::new()),
        random: Box::new(ThreadRandomness::from_entropy()),
        abort,
    })
}

fn build_trigger(gpio: &Gpio, config: &GameConfig) -> Result<Box<dyn StartTrigger>> {
    let trigger: Box<dyn StartTrigger> = match config.trigger {
        TriggerKind::Console => Box::new(ConsoleTrigger::spawn()?),
        TriggerKind::Button => Box::new(ButtonTrigger::new(
            gpio,
            config.pins.start_button,
            Duration::from_millis(config.pins.start_debounce_ms),
        )?),
    };
    Ok(trigger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_selects_the_level() {
        assert_eq!(log_level(Some("debug")), Level::DEBUG);
        assert_eq!(log_level(Some("TRACE")), Level::TRACE);
        assert_eq!(log_level(Some(" warn ")), Level::WARN);
        assert_eq!(log_level(None), Level::INFO);
        assert_eq!(log_level(Some("reaction_duel=debug")), Level::INFO);
    }
}
