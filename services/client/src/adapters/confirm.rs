//! services/client/src/adapters/confirm.rs
//!
//! Confirmation gates for destructive commands.

use coursedocs_core::ports::ConfirmationService;
use std::io::{BufRead, Write};

/// Asks on the terminal and accepts `y` / `yes`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirm;

impl ConfirmationService for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        let mut stdout = std::io::stdout();
        if write!(stdout, "{} [y/N] ", prompt).and_then(|_| stdout.flush()).is_err() {
            return false;
        }
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }
}

/// Confirms everything. Used when the user passed `--yes`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl ConfirmationService for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
