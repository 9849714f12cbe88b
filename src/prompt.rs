//! Blocking line-input collaborator for interactive flows.

use crate::errors::Result;
use crate::state::StateStore;
use std::io::{self, BufRead, Write};

/// Source of interactive user input.
///
/// Abstracted so flows that prompt (dataset selection, first login) stay
/// testable with canned input.
pub trait Prompt {
    /// Show `message` and read one trimmed line.
    fn read_line(&mut self, message: &str) -> Result<String>;
}

/// Prompts on stdout and blocks on one line from stdin.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn read_line(&mut self, message: &str) -> Result<String> {
        print!("{}", message);
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

/// Return the stored token, prompting for one (and persisting it) when
/// state is empty.
pub fn ensure_token(state: &StateStore, prompt: &mut dyn Prompt) -> Result<String> {
    let token = state.get_token();
    if !token.is_empty() {
        return Ok(token);
    }

    let token = prompt.read_line("Paste your Forefront API token: ")?;
    state.set_token(&token)?;
    Ok(state.get_token())
}
