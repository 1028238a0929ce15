//! Interactive input: the only places a run can block on the user.

use crate::error::{Result, ShelveError};
use console::Term;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use std::cell::RefCell;
use std::collections::VecDeque;

pub trait Interaction {
    /// Whether prompts reach a person. Conflict prompts are only shown when true.
    fn is_interactive(&self) -> bool;
    /// Single choice out of `choices`; returns the chosen index.
    fn select(&self, prompt: &str, choices: &[String], default: usize) -> Result<usize>;
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String>;
}

/// Prompts on the terminal with dialoguer.
pub struct TerminalInteraction {
    term: Term,
    theme: ColorfulTheme,
}

impl TerminalInteraction {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalInteraction {
    fn default() -> Self {
        Self::new()
    }
}

impl Interaction for TerminalInteraction {
    fn is_interactive(&self) -> bool {
        self.term.is_term()
    }

    fn select(&self, prompt: &str, choices: &[String], default: usize) -> Result<usize> {
        let index = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(choices)
            .default(default)
            .interact_on(&self.term)?;
        Ok(index)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact_on(&self.term)?;
        Ok(answer)
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme).with_prompt(prompt);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text_on(&self.term)?)
    }
}

/// Answers every question with its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

impl Interaction for NonInteractive {
    fn is_interactive(&self) -> bool {
        false
    }

    fn select(&self, _prompt: &str, _choices: &[String], default: usize) -> Result<usize> {
        Ok(default)
    }

    fn confirm(&self, _prompt: &str, default: bool) -> Result<bool> {
        Ok(default)
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        default
            .map(str::to_string)
            .ok_or_else(|| ShelveError::UserInput(format!("No answer for \"{}\"", prompt)))
    }
}

/// Replays canned answers in order, falling back to defaults once exhausted.
///
/// A select answer may be a choice's text or its index.
#[derive(Default)]
pub struct ScriptedInteraction {
    answers: RefCell<VecDeque<String>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedInteraction {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: RefCell::new(answers.into_iter().map(Into::into).collect()),
            asked: RefCell::new(Vec::new()),
        }
    }

    /// Prompts shown so far.
    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }

    fn next(&self, prompt: &str) -> Option<String> {
        self.asked.borrow_mut().push(prompt.to_string());
        self.answers.borrow_mut().pop_front()
    }
}

impl Interaction for ScriptedInteraction {
    fn is_interactive(&self) -> bool {
        true
    }

    fn select(&self, prompt: &str, choices: &[String], default: usize) -> Result<usize> {
        let Some(answer) = self.next(prompt) else {
            return Ok(default);
        };
        if let Some(index) = choices.iter().position(|c| c == &answer) {
            return Ok(index);
        }
        match answer.parse::<usize>() {
            Ok(index) if index < choices.len() => Ok(index),
            _ => Err(ShelveError::UserInput(format!(
                "\"{}\" is not one of {:?}",
                answer, choices
            ))),
        }
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        match self.next(prompt) {
            Some(answer) => Ok(matches!(
                answer.trim().to_lowercase().as_str(),
                "y" | "yes" | "true"
            )),
            None => Ok(default),
        }
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        match self.next(prompt) {
            Some(answer) => Ok(answer),
            None => NonInteractive.input(prompt, default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_select_by_text_and_index() {
        let choices = vec!["rename".to_string(), "overwrite".to_string(), "skip".to_string()];
        let scripted = ScriptedInteraction::new(["overwrite", "0"]);

        assert_eq!(scripted.select("conflict", &choices, 2).unwrap(), 1);
        assert_eq!(scripted.select("conflict", &choices, 2).unwrap(), 0);
        assert_eq!(scripted.select("conflict", &choices, 2).unwrap(), 2);
        assert_eq!(scripted.asked().len(), 3);
    }

    #[test]
    fn test_scripted_confirm_and_input() {
        let scripted = ScriptedInteraction::new(["no", "2024"]);
        assert!(!scripted.confirm("delete?", true).unwrap());
        assert_eq!(scripted.input("year?", None).unwrap(), "2024");
        assert_eq!(scripted.input("month?", Some("01")).unwrap(), "01");
        assert!(scripted.input("day?", None).is_err());
    }

    #[test]
    fn test_non_interactive_uses_defaults() {
        let ni = NonInteractive;
        assert!(!ni.is_interactive());
        assert_eq!(ni.select("pick", &["a".to_string()], 0).unwrap(), 0);
        assert!(ni.confirm("ok?", true).unwrap());
    }
}
