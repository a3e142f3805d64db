//! Outer driver: wait for a start event, play a round, repeat
//!
//! The loop is fully blocking and therefore runs on tokio's blocking pool. Shutdown is
//! requested through a [`CancellationToken`] and observed while waiting for the next
//! start event, so a running round completes first. Cancelling the rig's abort token
//! stops a running round early and ends the loop.

use crate::config::RoundTiming;
use crate::game::round::{play_round, GameRig, RoundError};
use crate::game::screen::StatusScreen;
use crate::game::{PlayerId, RoundOutcome};
use crate::hardware::{HardwareError, StartTrigger};
use std::fmt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum GameLoopError {
    #[error("Start trigger failed: {0}")]
    Trigger(#[from] HardwareError),

    #[error("Game loop task failed: {0}")]
    Join(String),
}

/// In-memory results of the current session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTally {
    pub rounds: u32,
    pub wins: [u32; 2],
    pub fouls: [u32; 2],
    pub no_response: u32,
    pub aborted: u32,
    pub best_reaction_ms: Option<u64>,
}

impl SessionTally {
    pub fn record(&mut self, outcome: &RoundOutcome) {
        self.rounds += 1;
        match outcome {
            RoundOutcome::PrematureMove(player) => self.fouls[slot(*player)] += 1,
            RoundOutcome::Win {
                player,
                reaction_time_ms,
            } => {
                self.wins[slot(*player)] += 1;
                self.best_reaction_ms = Some(
                    self.best_reaction_ms
                        .map_or(*reaction_time_ms, |best| best.min(*reaction_time_ms)),
                );
            }
            RoundOutcome::NoResponse => self.no_response += 1,
        }
    }

    pub fn record_abort(&mut self) {
        self.rounds += 1;
        self.aborted += 1;
    }
}

fn slot(player: PlayerId) -> usize {
    match player {
        PlayerId::Player1 => 0,
        PlayerId::Player2 => 1,
    }
}

impl fmt::Display for SessionTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rounds, wins {}:{}, fouls {}:{}, no response {}, aborted {}",
            self.rounds,
            self.wins[0],
            self.wins[1],
            self.fouls[0],
            self.fouls[1],
            self.no_response,
            self.aborted
        )?;
        if let Some(best) = self.best_reaction_ms {
            write!(f, ", best {} ms", best)?;
        }
        Ok(())
    }
}

pub struct GameLoop {
    rig: GameRig,
    trigger: Box<dyn StartTrigger>,
    timing: RoundTiming,
    shutdown: CancellationToken,
}

impl GameLoop {
    pub fn new(
        rig: GameRig,
        trigger: Box<dyn StartTrigger>,
        timing: RoundTiming,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            rig,
            trigger,
            timing,
            shutdown,
        }
    }

    /// Plays rounds until shutdown is requested or the trigger fails
    pub fn run(&mut self) -> Result<SessionTally, GameLoopError> {
        info!("Game loop started with timing {:?}", self.timing);
        self.rig.make_safe();

        let mut tally = SessionTally::default();
        let result = self.play_until_shutdown(&mut tally);

        self.rig.make_safe();
        info!("Game loop stopped: {}", tally);
        result.map(|_| tally)
    }

    fn play_until_shutdown(&mut self, tally: &mut SessionTally) -> Result<(), GameLoopError> {
        let mut ready = StatusScreen::idle();
        loop {
            self.rig.show(ready.clone());
            if !self.trigger.wait_for_start(&self.shutdown)? {
                debug!("Shutdown requested while idle");
                return Ok(());
            }

            let round = tally.rounds + 1;
            match play_round(&mut self.rig, self.timing, round) {
                Ok(outcome) => {
                    tally.record(&outcome);
                    info!("Session: {}", tally);
                    ready = StatusScreen::outcome(&outcome).with_prompt();
                }
                Err(RoundError::Aborted(_)) => {
                    tally.record_abort();
                    self.rig.make_safe();
                    self.rig.show(StatusScreen::new(["Stopped"]));
                    info!("Round {} aborted, leaving the game loop", round);
                    return Ok(());
                }
                Err(e) => {
                    error!("Round {} aborted: {}", round, e);
                    tally.record_abort();
                    self.rig.make_safe();
                    ready = StatusScreen::aborted().with_prompt();
                }
            }
        }
    }
}

/// Game loop running on the blocking pool
pub struct GameLoopHandle {
    shutdown: CancellationToken,
    task: JoinHandle<Result<SessionTally, GameLoopError>>,
}

impl GameLoopHandle {
    pub fn spawn(mut game_loop: GameLoop) -> Self {
        let shutdown = game_loop.shutdown.clone();
        info!("Spawning game loop");
        let task = tokio::task::spawn_blocking(move || game_loop.run());
        Self { shutdown, task }
    }

    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Requesting game loop shutdown");
            self.shutdown.cancel();
        }
    }

    pub async fn join(self) -> Result<SessionTally, GameLoopError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                warn!("Game loop task did not complete: {}", e);
                Err(GameLoopError::Join(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::round::sim::{bench, Stick, WAIT_MS};
    use crate::game::Direction;

    /// Fires a fixed number of times, then behaves as if shutdown was requested
    struct CountedTrigger {
        remaining: u32,
        fail_when_done: bool,
    }

    impl StartTrigger for CountedTrigger {
        fn wait_for_start(&mut self, shutdown: &CancellationToken) -> Result<bool, HardwareError> {
            if shutdown.is_cancelled() {
                return Ok(false);
            }
            if self.remaining == 0 {
                if self.fail_when_done {
                    return Err(HardwareError::TriggerClosed);
                }
                return Ok(false);
            }
            self.remaining -= 1;
            Ok(true)
        }
    }

    fn trigger(rounds: u32) -> Box<dyn StartTrigger> {
        Box::new(CountedTrigger {
            remaining: rounds,
            fail_when_done: false,
        })
    }

    #[test]
    fn tally_tracks_outcomes() {
        let mut tally = SessionTally::default();
        tally.record(&RoundOutcome::Win {
            player: PlayerId::Player2,
            reaction_time_ms: 310,
        });
        tally.record(&RoundOutcome::Win {
            player: PlayerId::Player2,
            reaction_time_ms: 250,
        });
        tally.record(&RoundOutcome::PrematureMove(PlayerId::Player1));
        tally.record(&RoundOutcome::NoResponse);

        assert_eq!(tally.rounds, 4);
        assert_eq!(tally.wins, [0, 2]);
        assert_eq!(tally.fouls, [1, 0]);
        assert_eq!(tally.no_response, 1);
        assert_eq!(tally.best_reaction_ms, Some(250));
        assert_eq!(
            tally.to_string(),
            "4 rounds, wins 0:2, fouls 1:0, no response 1, aborted 0, best 250 ms"
        );
    }

    #[test]
    fn plays_one_round_per_start_event() {
        let (rig, bench) = bench(
            Stick::moving(&[(WAIT_MS + 40, 2048, 500)]),
            Stick::resting(),
            &[Direction::Up],
        );
        let mut game_loop = GameLoop::new(
            rig,
            trigger(3),
            RoundTiming::default(),
            CancellationToken::new(),
        );

        let tally = game_loop.run().unwrap();

        // First round wins, the stick then stays pushed and fouls the next ones
        assert_eq!(tally.rounds, 3);
        assert_eq!(tally.wins, [1, 0]);
        assert_eq!(tally.fouls, [2, 0]);
        assert_eq!(bench.leds[0].level(), Some(false));
        assert_eq!(bench.buzzer.level(), Some(true));
    }

    #[test]
    fn idle_screen_is_shown_first() {
        let (rig, bench) = bench(Stick::resting(), Stick::resting(), &[Direction::Up]);
        let mut game_loop = GameLoop::new(
            rig,
            trigger(0),
            RoundTiming::default(),
            CancellationToken::new(),
        );

        assert_eq!(game_loop.run().unwrap(), SessionTally::default());
        assert_eq!(bench.screens.last(), Some(StatusScreen::idle()));
    }

    #[test]
    fn each_wait_shows_the_previous_result() {
        let (rig, bench) = bench(
            Stick::moving(&[(WAIT_MS + 40, 2048, 500)]),
            Stick::resting(),
            &[Direction::Up],
        );
        let mut game_loop = GameLoop::new(
            rig,
            trigger(1),
            RoundTiming::default(),
            CancellationToken::new(),
        );

        game_loop.run().unwrap();

        let prompts: Vec<StatusScreen> = bench
            .screens
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|screen| screen.lines().last().is_some_and(|l| l == "Press start"))
            .cloned()
            .collect();
        assert_eq!(
            prompts,
            vec![
                StatusScreen::idle(),
                StatusScreen::win(PlayerId::Player1, 40).with_prompt(),
            ]
        );
        assert_eq!(bench.screens.last(), prompts.last().cloned());
    }

    #[test]
    fn abort_ends_the_loop_with_outputs_safe() {
        let (rig, bench) = bench(Stick::resting(), Stick::resting(), &[Direction::Up]);
        bench.abort.cancel();
        let mut game_loop = GameLoop::new(
            rig,
            trigger(3),
            RoundTiming::default(),
            CancellationToken::new(),
        );

        let tally = game_loop.run().unwrap();

        assert_eq!(tally.rounds, 1);
        assert_eq!(tally.aborted, 1);
        assert!(bench.leds.iter().all(|led| led.level() == Some(false)));
        assert_eq!(bench.buzzer.level(), Some(true));
        assert_eq!(bench.screens.last(), Some(StatusScreen::new(["Stopped"])));
    }

    #[test]
    fn failed_round_does_not_stop_the_loop() {
        let mut failing = Stick::resting();
        failing.fail_from_ms = Some(0);
        let (rig, _bench) = bench(Stick::resting(), failing, &[Direction::Up]);
        let mut game_loop = GameLoop::new(
            rig,
            trigger(2),
            RoundTiming::default(),
            CancellationToken::new(),
        );

        let tally = game_loop.run().unwrap();
        assert_eq!(tally.rounds, 2);
        assert_eq!(tally.aborted, 2);
    }

    #[test]
    fn trigger_failure_ends_the_loop() {
        let (rig, bench) = bench(Stick::resting(), Stick::resting(), &[Direction::Up]);
        let mut game_loop = GameLoop::new(
            rig,
            Box::new(CountedTrigger {
                remaining: 0,
                fail_when_done: true,
            }),
            RoundTiming::default(),
            CancellationToken::new(),
        );

        assert!(matches!(
            game_loop.run(),
            Err(GameLoopError::Trigger(HardwareError::TriggerClosed))
        ));
        assert_eq!(bench.buzzer.level(), Some(true));
    }

    #[tokio::test]
    async fn cancelled_loop_exits_without_rounds() {
        let (rig, bench) = bench(Stick::resting(), Stick::resting(), &[Direction::Up]);
        let token = CancellationToken::new();
        token.cancel();

        let handle = GameLoopHandle::spawn(GameLoop::new(
            rig,
            trigger(5),
            RoundTiming::default(),
            token,
        ));
        handle.shutdown();

        assert_eq!(handle.join().await.unwrap(), SessionTally::default());
        assert_eq!(bench.screens.last(), Some(StatusScreen::idle()));
    }
}
