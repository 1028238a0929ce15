use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShelveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid regex /{pattern}/: {message}")]
    Regex { pattern: String, message: String },

    #[error("Expression `{content}`: {message}")]
    Expression { content: String, message: String },

    #[error("{rule}: {message}")]
    Rule { rule: String, message: String },

    #[error("{action}: {message}")]
    Action { action: String, message: String },

    #[error("{}", format_syntax(.file, .line, .content, .message))]
    Syntax {
        file: Option<PathBuf>,
        line: Option<usize>,
        content: String,
        message: String,
    },

    #[error("External tool error: {tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("User input error: {0}")]
    UserInput(String),
}

impl ShelveError {
    pub fn rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        ShelveError::Rule {
            rule: rule.into(),
            message: message.into(),
        }
    }

    pub fn action(action: impl Into<String>, message: impl Into<String>) -> Self {
        ShelveError::Action {
            action: action.into(),
            message: message.into(),
        }
    }

    pub fn expression(content: impl Into<String>, message: impl Into<String>) -> Self {
        ShelveError::Expression {
            content: content.into(),
            message: message.into(),
        }
    }

    pub fn syntax(message: impl Into<String>, content: impl Into<String>) -> Self {
        ShelveError::Syntax {
            file: None,
            line: None,
            content: content.into(),
            message: message.into(),
        }
    }

    /// Attaches a file (and optionally a line) to a syntax error; other errors pass through.
    pub fn in_file(self, path: impl Into<PathBuf>, line: Option<usize>) -> Self {
        match self {
            ShelveError::Syntax {
                content, message, ..
            } => ShelveError::Syntax {
                file: Some(path.into()),
                line,
                content,
                message,
            },
            other => other,
        }
    }

    /// Errors scoped to one item of one command: reported, never fatal to the block.
    pub fn is_item_scoped(&self) -> bool {
        matches!(
            self,
            ShelveError::Rule { .. }
                | ShelveError::Action { .. }
                | ShelveError::Expression { .. }
                | ShelveError::Regex { .. }
                | ShelveError::Io(_)
                | ShelveError::ExternalTool { .. }
                | ShelveError::UserInput(_)
        )
    }
}

fn format_syntax(
    file: &Option<PathBuf>,
    line: &Option<usize>,
    content: &str,
    message: &str,
) -> String {
    let mut location = String::new();
    if let Some(file) = file {
        location.push_str(&format!("File: {}, ", file.display()));
    }
    if let Some(line) = line {
        location.push_str(&format!("line: {}", line));
    }
    if content.is_empty() {
        format!("{}\nSyntaxError: {}", location, message)
    } else {
        format!("{}\n{}\n\nSyntaxError: {}", location, content, message)
    }
}

impl From<dialoguer::Error> for ShelveError {
    fn from(err: dialoguer::Error) -> Self {
        ShelveError::UserInput(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShelveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_error_display() {
        let err = ShelveError::rule("basename", "content field is empty");
        assert_eq!(err.to_string(), "basename: content field is empty");
        assert!(err.is_item_scoped());
    }

    #[test]
    fn test_syntax_error_with_location() {
        let err = ShelveError::syntax("Unknown rule", "colour: red").in_file("tidy.toml", Some(3));
        let text = err.to_string();
        assert!(text.contains("File: tidy.toml, line: 3"));
        assert!(text.contains("SyntaxError: Unknown rule"));
        assert!(!err.is_item_scoped());
    }
}
