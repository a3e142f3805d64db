use super::Direction;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Random choices made during a round
pub trait RoundRandomness: Send {
    /// Uniform preparation delay within `[min, max]`
    fn wait_duration(&mut self, min: Duration, max: Duration) -> Duration;

    /// Uniform pick among [`Direction::TARGETS`]
    fn target_direction(&mut self) -> Direction;
}

pub struct ThreadRandomness {
    rng: SmallRng,
}

impl ThreadRandomness {
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl RoundRandomness for ThreadRandomness {
    fn wait_duration(&mut self, min: Duration, max: Duration) -> Duration {
        if min >= max {
            return min;
        }
        let millis = self
            .rng
            .gen_range(min.as_millis() as u64..=max.as_millis() as u64);
        Duration::from_millis(millis)
    }

    fn target_direction(&mut self) -> Direction {
        *Direction::TARGETS
            .choose(&mut self.rng)
            .unwrap_or(&Direction::Up)
    }
}
