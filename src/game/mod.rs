//! Reaction duel game logic
//!
//! One round runs through a typestate machine:
//!
//! ```text
//! Preparing ──► Armed ──► Racing ──► Resolved
//!     │                                  ▲
//!     └──────────── foul ────────────────┘
//! ```
//!
//! - [`joystick`] - axis sampling and direction classification
//! - [`signals`] - indicator LEDs and the buzzer
//! - [`screen`] - status text for the optional display
//! - [`random`] - preparation delay and target selection
//! - [`round`] - the round state machine and its collaborators

pub mod joystick;
pub mod random;
pub mod round;
pub mod screen;
pub mod signals;

use crate::hardware::HardwareError;
use std::fmt;

/// A joystick direction as seen by the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Neutral,
}

impl Direction {
    /// The four directions a round can ask for
    pub const TARGETS: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "UP"),
            Direction::Down => write!(f, "DOWN"),
            Direction::Left => write!(f, "LEFT"),
            Direction::Right => write!(f, "RIGHT"),
            Direction::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerId {
    Player1,
    Player2,
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerId::Player1 => write!(f, "Player 1"),
            PlayerId::Player2 => write!(f, "Player 2"),
        }
    }
}

/// Terminal result of a single round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The player left the center before the target was revealed
    PrematureMove(PlayerId),
    /// The player matched the target first
    Win {
        player: PlayerId,
        reaction_time_ms: u64,
    },
    /// Nobody matched the target before the configured response timeout
    NoResponse,
}

impl fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundOutcome::PrematureMove(player) => write!(f, "{} moved too early", player),
            RoundOutcome::Win {
                player,
                reaction_time_ms,
            } => write!(f, "{} wins in {} ms", player, reaction_time_ms),
            RoundOutcome::NoResponse => write!(f, "no response"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Programming error, such as lighting the indicator for `Direction::Neutral`
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),
}
