//! User interface module - interaction (prompts) and formatting.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - This module - Prompt providers, so the workflow runs identically with a
//!   terminal, a script of answers, or no input at all

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use crate::error::Result;

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_command, display_diagnostic, display_error, display_status, display_success,
    display_title,
};

/// Source of answers to interactive questions.
pub trait Prompt {
    /// Ask `question` and return the trimmed answer.
    ///
    /// Returns `Ok(None)` when no input stream is available (non-interactive
    /// mode or end of input); callers must not loop on `None`.
    fn ask(&self, question: &str) -> Result<Option<String>>;

    /// Print a line of context for the next question.
    fn say(&self, message: &str) {
        println!("{}", message);
    }
}

/// Reads answers from standard input.
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&self, question: &str) -> Result<Option<String>> {
        print!("{}", question);
        io::stdout().flush()?;

        let mut input = String::new();
        let read = io::stdin().lock().read_line(&mut input)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim().to_string()))
    }
}

/// Non-interactive mode: every question goes unanswered.
pub struct NoInput;

impl Prompt for NoInput {
    fn ask(&self, _question: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn say(&self, _message: &str) {}
}

/// Answers questions from a fixed script, then behaves like [NoInput].
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(answers: &[&str]) -> Self {
        ScriptedPrompt {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far, in order
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Answers not consumed yet
    pub fn remaining(&self) -> usize {
        self.answers.lock().map(|a| a.len()).unwrap_or_default()
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&self, question: &str) -> Result<Option<String>> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(question.to_string());
        }
        Ok(self
            .answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front()))
    }

    fn say(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_input_never_answers() {
        assert_eq!(NoInput.ask("Version? ").unwrap(), None);
    }

    #[test]
    fn test_scripted_prompt_answers_in_order() {
        let prompt = ScriptedPrompt::new(&["", "1.4.0"]);
        assert_eq!(prompt.ask("first").unwrap(), Some(String::new()));
        assert_eq!(prompt.ask("second").unwrap(), Some("1.4.0".to_string()));
        assert_eq!(prompt.ask("third").unwrap(), None);
        assert_eq!(prompt.asked(), vec!["first", "second", "third"]);
        assert_eq!(prompt.remaining(), 0);
    }
}
