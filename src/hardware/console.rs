//! Terminal stand-ins for a character display and a start button

use super::{DisplaySurface, HardwareError, StartTrigger};
use crate::game::screen::{StatusScreen, LINE_WIDTH, MAX_LINES};
use std::io::{BufRead, Write};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const CONSOLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Renders status screens as a framed block of `MAX_LINES` rows
pub struct ConsoleDisplay<W: Write + Send> {
    out: W,
}

impl ConsoleDisplay<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> DisplaySurface for ConsoleDisplay<W> {
    fn show(&mut self, screen: &StatusScreen) -> Result<(), HardwareError> {
        let border = format!("+{}+", "-".repeat(LINE_WIDTH));
        writeln!(self.out, "{}", border)?;
        for row in 0..MAX_LINES {
            let line = screen.line(row).unwrap_or("");
            writeln!(self.out, "|{:<width$}|", line, width = LINE_WIDTH)?;
        }
        writeln!(self.out, "{}", border)?;
        self.out.flush()?;
        Ok(())
    }
}

/// "Press Enter to start" on the controlling terminal
///
/// Stdin is read on a dedicated thread so that waiting can still observe shutdown.
pub struct ConsoleTrigger {
    lines: mpsc::UnboundedReceiver<String>,
}

impl ConsoleTrigger {
    pub fn spawn() -> Result<Self, HardwareError> {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("console-trigger".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                debug!("Console trigger dropped, stopping stdin reader");
                                break;
                            }
                        }
                        Err(e) => {
                            error!("Failed to read from stdin: {}", e);
                            break;
                        }
                    }
                }
                debug!("Stdin reader finished");
            })?;
        Ok(Self { lines: rx })
    }

    #[cfg(test)]
    fn from_receiver(lines: mpsc::UnboundedReceiver<String>) -> Self {
        Self { lines }
    }
}

impl StartTrigger for ConsoleTrigger {
    fn wait_for_start(&mut self, shutdown: &CancellationToken) -> Result<bool, HardwareError> {
        // Keystrokes made during the previous round do not count
        while self.lines.try_recv().is_ok() {}

        info!("Press Enter to start a round");
        loop {
            if shutdown.is_cancelled() {
                return Ok(false);
            }
            match self.lines.try_recv() {
                Ok(_) => return Ok(true),
                Err(mpsc::error::TryRecvError::Empty) => {
                    std::thread::sleep(CONSOLE_POLL_INTERVAL);
                }
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    warn!("Stdin closed, no further rounds can be started");
                    return Err(HardwareError::TriggerClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_pads_every_row() {
        let mut display = ConsoleDisplay::new(Vec::new());
        display.show(&StatusScreen::foul(crate::game::PlayerId::Player2)).unwrap();

        let text = String::from_utf8(display.out).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), MAX_LINES + 2);
        assert!(rows.iter().all(|row| row.chars().count() == LINE_WIDTH + 2));
        assert!(rows[1].starts_with("|FOUL!"));
        assert!(rows[2].contains("Player 2"));
    }

    #[test]
    fn trigger_fires_on_new_line() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut trigger = ConsoleTrigger::from_receiver(rx);
        let token = CancellationToken::new();

        let sender = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            tx.send(String::new()).unwrap();
            tx
        });
        assert!(trigger.wait_for_start(&token).unwrap());
        drop(sender.join().unwrap());
    }

    #[test]
    fn trigger_stops_on_shutdown() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut trigger = ConsoleTrigger::from_receiver(rx);
        let token = CancellationToken::new();
        token.cancel();

        assert!(!trigger.wait_for_start(&token).unwrap());
    }

    #[test]
    fn trigger_reports_closed_stdin() {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        drop(tx);
        let mut trigger = ConsoleTrigger::from_receiver(rx);

        assert!(matches!(
            trigger.wait_for_start(&CancellationToken::new()),
            Err(HardwareError::TriggerClosed)
        ));
    }
}
