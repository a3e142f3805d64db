use super::{Direction, PlayerId, RoundOutcome};

/// Rows available on the display
pub const MAX_LINES: usize = 4;

/// Characters per row
pub const LINE_WIDTH: usize = 20;

const START_PROMPT: &str = "Press start";

/// Text content for the display, one entry per row from the top
///
/// Lines beyond [`MAX_LINES`] are dropped and long lines are cut at [`LINE_WIDTH`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusScreen {
    lines: Vec<String>,
}

impl StatusScreen {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines = lines
            .into_iter()
            .take(MAX_LINES)
            .map(|line| line.into().chars().take(LINE_WIDTH).collect())
            .collect();
        Self { lines }
    }

    pub fn idle() -> Self {
        Self::new(["Reaction Duel", "Center both sticks", START_PROMPT])
    }

    pub fn preparing() -> Self {
        Self::new(["Get ready...", "Hands off!"])
    }

    pub fn react(target: Direction) -> Self {
        Self::new(["GO!".to_string(), format!("Push {}", target)])
    }

    pub fn foul(player: PlayerId) -> Self {
        Self::new(["FOUL!".to_string(), format!("{} moved early", player)])
    }

    pub fn win(player: PlayerId, reaction_time_ms: u64) -> Self {
        Self::new([
            format!("{} wins!", player),
            format!("Reaction: {} ms", reaction_time_ms),
        ])
    }

    pub fn no_response() -> Self {
        Self::new(["Time is up", "Nobody reacted"])
    }

    pub fn aborted() -> Self {
        Self::new(["Round aborted", "Check wiring"])
    }

    /// The result screen of a finished round
    pub fn outcome(outcome: &RoundOutcome) -> Self {
        match *outcome {
            RoundOutcome::PrematureMove(player) => Self::foul(player),
            RoundOutcome::Win {
                player,
                reaction_time_ms,
            } => Self::win(player, reaction_time_ms),
            RoundOutcome::NoResponse => Self::no_response(),
        }
    }

    /// Replaces the bottom row with the start prompt, keeping the rest
    pub fn with_prompt(mut self) -> Self {
        self.lines.truncate(MAX_LINES - 1);
        self.lines.push(START_PROMPT.to_string());
        self
    }

    pub fn line(&self, row: usize) -> Option<&str> {
        self.lines.get(row).map(String::as_str)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}
