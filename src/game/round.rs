//! Round state machine
//!
//! A round is a one-shot typestate machine built with statum. Each phase consumes the
//! controller and hands back the next one, so a round cannot be re-entered or resumed
//! out of order:
//!
//! 1. [`Preparing`] - everything off, random blind wait, then the foul check
//! 2. [`Armed`] - target chosen and lit, reaction clock started
//! 3. [`Racing`] - both sticks polled strictly in player order until one matches
//! 4. [`Resolved`] - outputs made safe and the outcome reported
//!
//! Inputs are not sampled during the blind wait. Player 1 is always checked before
//! player 2, both for fouls and within every race tick, which makes ties deterministic.

use super::joystick::JoystickSensor;
use super::random::RoundRandomness;
use super::screen::StatusScreen;
use super::signals::{AlertSignal, IndicatorBank};
use super::{Direction, GameError, PlayerId, RoundOutcome};
use crate::config::RoundTiming;
use crate::hardware::{Clock, DisplaySurface, HardwareError};
use chrono::Local;
use statum::{machine, state};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum RoundError {
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    #[error("Hardware fault during round: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Invalid round state: {0}")]
    InvalidState(String),

    #[error("Round {0} aborted on request")]
    Aborted(u32),
}

/// Every collaborator a round talks to
pub struct GameRig {
    pub player1: JoystickSensor,
    pub player2: JoystickSensor,
    pub indicators: IndicatorBank,
    pub alert: AlertSignal,
    pub display: Option<Box<dyn DisplaySurface>>,
    pub clock: Box<dyn Clock>,
    pub random: Box<dyn RoundRandomness>,
    /// Cancelled to stop a running round at its next check
    pub abort: CancellationToken,
}

impl GameRig {
    pub fn sensor(&mut self, player: PlayerId) -> &mut JoystickSensor {
        match player {
            PlayerId::Player1 => &mut self.player1,
            PlayerId::Player2 => &mut self.player2,
        }
    }

    /// All indicators dark and the buzzer silent
    pub fn make_safe(&mut self) {
        self.indicators.reset_all();
        self.alert.clear();
    }

    /// Shows `screen` if a display is attached. Display faults are logged, not raised.
    pub fn show(&mut self, screen: StatusScreen) {
        if let Some(display) = self.display.as_mut() {
            if let Err(e) = display.show(&screen) {
                warn!("Failed to update display: {}", e);
            }
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum RoundState {
    Preparing,
    Armed,
    Racing,
    Resolved(RoundOutcome),
}

#[machine]
#[derive(Debug)]
pub struct RoundController<S: RoundState> {
    // Sequence number, for logging only
    round: u32,

    timing: RoundTiming,

    // Direction to match, Neutral until armed
    target: Direction,

    // Clock reading when the target was revealed
    armed_at: Duration,
}

/// Result of the preparation phase
#[derive(Debug)]
pub enum Preparation {
    /// Both sticks were centered, the round can be armed
    Clear(RoundController<Armed>),
    /// A player moved during the blind wait
    Foul(RoundController<Resolved>),
}

impl<S: RoundState> RoundController<S> {
    pub fn round(&self) -> u32 {
        self.round
    }

    fn check_abort(&self, rig: &GameRig) -> Result<(), RoundError> {
        if rig.abort.is_cancelled() {
            warn!("Round {}: aborted", self.round);
            return Err(RoundError::Aborted(self.round));
        }
        Ok(())
    }

    pub fn target(&self) -> Direction {
        self.target
    }
}

impl RoundController<Preparing> {
    pub fn create(round: u32, timing: RoundTiming) -> Self {
        debug!("Creating round {} with timing {:?}", round, timing);
        Self::new(round, timing, Direction::Neutral, Duration::ZERO)
    }

    /// Blind wait followed by the foul check
    pub fn prepare(self, rig: &mut GameRig) -> Result<Preparation, RoundError> {
        rig.make_safe();
        rig.show(StatusScreen::preparing());

        let wait = rig.random.wait_duration(
            Duration::from_millis(self.timing.min_delay_ms),
            Duration::from_millis(self.timing.max_delay_ms),
        );
        info!(
            "Round {}: preparing, revealing target in {} ms",
            self.round,
            wait.as_millis()
        );
        rig.clock.sleep(wait);
        self.check_abort(rig)?;

        for player in [PlayerId::Player1, PlayerId::Player2] {
            if !rig.sensor(player).is_centered()? {
                warn!("Round {}: {} moved during the wait", self.round, player);
                self.signal_foul(rig, player);
                return Ok(Preparation::Foul(
                    self.transition_with(RoundOutcome::PrematureMove(player)),
                ));
            }
        }

        debug!("Round {}: both sticks centered, arming", self.round);
        Ok(Preparation::Clear(self.transition()))
    }

    fn signal_foul(&self, rig: &mut GameRig, player: PlayerId) {
        rig.alert.assert();
        rig.show(StatusScreen::foul(player));
        rig.clock
            .sleep(Duration::from_millis(self.timing.foul_alert_ms));
        rig.alert.clear();
    }
}

impl RoundController<Armed> {
    /// Picks and reveals the target, starting the reaction clock
    pub fn arm(mut self, rig: &mut GameRig) -> Result<RoundController<Racing>, RoundError> {
        let target = rig.random.target_direction();
        rig.indicators.reset_all();
        rig.indicators.activate(target)?;
        self.target = target;
        self.armed_at = rig.clock.now();
        rig.show(StatusScreen::react(target));

        info!(
            "Round {}: target {} revealed at {}",
            self.round,
            target,
            Local::now().format("%H:%M:%S.%3f")
        );
        Ok(self.transition())
    }
}

impl RoundController<Racing> {
    /// Polls both sticks until one matches the target or the optional timeout passes
    pub fn race(self, rig: &mut GameRig) -> Result<RoundController<Resolved>, RoundError> {
        let poll_interval = Duration::from_millis(self.timing.poll_interval_ms);
        let timeout = self.timing.response_timeout_ms.map(Duration::from_millis);
        let mut ticks: u64 = 0;

        let outcome = loop {
            self.check_abort(rig)?;
            if let Some(player) = self.sample_winner(rig)? {
                let elapsed = rig.clock.now().saturating_sub(self.armed_at);
                debug!("Round {}: {} matched after {} ticks", self.round, player, ticks);
                break RoundOutcome::Win {
                    player,
                    reaction_time_ms: elapsed.as_millis() as u64,
                };
            }

            if let Some(limit) = timeout {
                if rig.clock.now().saturating_sub(self.armed_at) >= limit {
                    info!(
                        "Round {}: no match within {} ms",
                        self.round,
                        limit.as_millis()
                    );
                    break RoundOutcome::NoResponse;
                }
            }

            rig.clock.sleep(poll_interval);
            ticks += 1;
        };

        Ok(self.transition_with(outcome))
    }

    fn sample_winner(&self, rig: &mut GameRig) -> Result<Option<PlayerId>, HardwareError> {
        for player in [PlayerId::Player1, PlayerId::Player2] {
            if rig.sensor(player).classify()? == self.target {
                return Ok(Some(player));
            }
        }
        Ok(None)
    }
}

impl RoundController<Resolved> {
    /// Leaves the hardware quiet and reports the outcome
    pub fn finish(self, rig: &mut GameRig) -> Result<RoundOutcome, RoundError> {
        let outcome = self.get_state_data().copied().ok_or_else(|| {
            RoundError::InvalidState(format!("round {} resolved without outcome", self.round))
        })?;

        rig.make_safe();
        match outcome {
            RoundOutcome::Win {
                player,
                reaction_time_ms,
            } => rig.show(StatusScreen::win(player, reaction_time_ms)),
            RoundOutcome::NoResponse => rig.show(StatusScreen::no_response()),
            // The foul screen stays up
            RoundOutcome::PrematureMove(_) => {}
        }

        info!("Round {}: {}", self.round, outcome);
        Ok(outcome)
    }
}

/// Runs one complete round
pub fn play_round(
    rig: &mut GameRig,
    timing: RoundTiming,
    round: u32,
) -> Result<RoundOutcome, RoundError> {
    let resolved = match RoundController::create(round, timing).prepare(rig)? {
        Preparation::Clear(armed) => armed.arm(rig)?.race(rig)?,
        Preparation::Foul(resolved) => resolved,
    };
    resolved.finish(rig)
}
