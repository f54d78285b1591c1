//! Operator prompts.
//!
//! All prompting goes through [`Prompter`], a synchronous question/answer port, so flows
//! can be driven by scripted answers in tests.

use std::{
    collections::VecDeque,
    io::{self, BufRead, Write},
};

use crate::{DeployError, units::parse_native};

/// Question/answer port.
pub trait Prompter {
    /// Show `question` and return the raw answer. End of input is an empty answer.
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

/// Prompts on stdout and reads one line from stdin.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{question} ")?;
        stdout.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Answers from a fixed script, recording every question asked.
///
/// Once the script runs out every further answer is empty.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.asked.push(question.to_string());
        Ok(self.answers.pop_front().unwrap_or_default())
    }
}

/// Yes/no confirmations and amount prompts on top of a [`Prompter`].
#[derive(Debug)]
pub struct InteractiveGate<P> {
    prompter: P,
}

impl<P: Prompter> InteractiveGate<P> {
    pub fn new(prompter: P) -> Self {
        Self { prompter }
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    /// True only for `y` or `yes`, case-insensitive. Anything else, including an empty
    /// answer, declines.
    pub fn confirm(&mut self, question: &str) -> Result<bool, DeployError> {
        let answer = self
            .prompter
            .ask(&format!("{question} (y/N)"))
            .map_err(DeployError::Prompt)?;
        Ok(is_affirmative(&answer))
    }

    /// Ask for a native amount. An empty answer takes `default`. The answer is validated
    /// once; invalid input fails instead of re-prompting.
    pub fn prompt_amount(&mut self, question: &str, default: &str) -> Result<String, DeployError> {
        let answer = self
            .prompter
            .ask(&format!("{question} [{default}]"))
            .map_err(DeployError::Prompt)?;

        let answer = answer.trim();
        let amount = if answer.is_empty() { default } else { answer };
        validate_amount(amount)?;
        Ok(amount.to_string())
    }
}

fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// A positive, finite real number that is also representable in the native unit.
pub fn validate_amount(amount: &str) -> Result<(), DeployError> {
    let invalid = || DeployError::Validation(format!("'{amount}' is not a positive amount"));

    let value: f64 = amount.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid());
    }

    let wei = parse_native(amount).map_err(DeployError::Validation)?;
    if wei.is_zero() {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(answers: &[&str]) -> InteractiveGate<ScriptedPrompter> {
        InteractiveGate::new(ScriptedPrompter::new(answers.iter().copied()))
    }

    #[test]
    fn test_confirm_accepts_only_yes() {
        for answer in ["y", "Y", "yes", "YES", " yes \n"] {
            assert!(gate(&[answer]).confirm("Proceed?").unwrap(), "{answer:?}");
        }
        for answer in ["", "n", "no", "maybe", "   ", "yess"] {
            assert!(!gate(&[answer]).confirm("Proceed?").unwrap(), "{answer:?}");
        }
    }

    #[test]
    fn test_confirm_shows_suffix() {
        let mut gate = gate(&["y"]);
        gate.confirm("Deploy now?").unwrap();
        assert_eq!(gate.prompter().asked(), ["Deploy now? (y/N)"]);
    }

    #[test]
    fn test_exhausted_script_declines() {
        assert!(!gate(&[]).confirm("Proceed?").unwrap());
    }

    #[test]
    fn test_prompt_amount() {
        assert_eq!(gate(&[""]).prompt_amount("Amount?", "10").unwrap(), "10");
        assert_eq!(gate(&["25.5"]).prompt_amount("Amount?", "10").unwrap(), "25.5");

        for bad in ["-3", "abc", "0", "NaN", "inf"] {
            let err = gate(&[bad]).prompt_amount("Amount?", "10").unwrap_err();
            assert!(matches!(err, DeployError::Validation(_)), "{bad:?}");
        }
    }
}
