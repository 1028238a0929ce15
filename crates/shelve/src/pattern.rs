//! Regex values produced by content resolution.
//!
//! A resolved content string shaped like `/pattern/flags` becomes a [`Pattern`]
//! instead of plain text. Rules then test it with [`Pattern::search`] rather than
//! comparing literally; actions refuse it.

use crate::error::{Result, ShelveError};
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

fn literal_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| {
        Regex::new(r"^\s*/(?P<content>.+)/(?P<flags>[a-zA-Z]*)\s*$")
            .expect("regex literal shape is valid")
    })
}

/// A compiled pattern plus the single-letter flags it was written with.
#[derive(Clone)]
pub struct Pattern {
    content: String,
    flags: Vec<char>,
    compiled: Regex,
}

/// Result of a successful [`Pattern::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    /// The whole input string that was searched.
    pub string: String,
    /// Text of the overall match.
    pub matched: String,
    /// Positional captures, excluding the overall match.
    pub groups: Vec<Option<String>>,
    /// Named captures that participated in the match.
    pub named: Vec<(String, String)>,
}

impl PatternMatch {
    pub fn groups(&self) -> &[Option<String>] {
        &self.groups
    }

    pub fn groupdict(&self) -> Map<String, Value> {
        self.named
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }
}

impl Pattern {
    /// Builds a pattern, failing on unknown flags or an invalid expression.
    ///
    /// Multiline mode is always on; flags add to it:
    /// `i` case-insensitive, `s` dot matches newline, `m` multiline,
    /// `x` ignore whitespace, `u` unicode (default), `a` ASCII-only classes.
    pub fn new(content: &str, flags: &[char]) -> Result<Self> {
        let mut builder = RegexBuilder::new(content);
        builder.multi_line(true);

        for flag in flags {
            match flag.to_ascii_lowercase() {
                'i' => {
                    builder.case_insensitive(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                'x' => {
                    builder.ignore_whitespace(true);
                }
                'u' => {
                    builder.unicode(true);
                }
                'a' => {
                    builder.unicode(false);
                }
                other => {
                    let written: String = flags.iter().collect();
                    return Err(ShelveError::Regex {
                        pattern: content.to_string(),
                        message: format!("Unknown flag \"{}\" in \"/{}/{}\"", other, content, written),
                    });
                }
            }
        }

        let compiled = builder.build().map_err(|e| ShelveError::Regex {
            pattern: content.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            content: content.to_string(),
            flags: flags.to_vec(),
            compiled,
        })
    }

    /// True iff `text` has the `/pattern/flags` shape.
    pub fn is_valid(text: &str) -> bool {
        literal_shape().is_match(text)
    }

    /// Splits a `/pattern/flags` literal and compiles it.
    pub fn parse(text: &str) -> Result<Self> {
        let caps = literal_shape().captures(text).ok_or_else(|| ShelveError::Regex {
            pattern: text.to_string(),
            message: "Invalid regex literal".to_string(),
        })?;

        let flags: Vec<char> = caps["flags"].chars().collect();
        Self::new(&caps["content"], &flags)
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn flags(&self) -> &[char] {
        &self.flags
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.compiled.is_match(haystack)
    }

    pub fn search(&self, haystack: &str) -> Option<PatternMatch> {
        let caps = self.compiled.captures(haystack)?;

        let groups = caps
            .iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();

        let named = self
            .compiled
            .capture_names()
            .flatten()
            .filter_map(|name| {
                caps.name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect();

        Some(PatternMatch {
            string: haystack.to_string(),
            matched: caps
                .get(0)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            groups,
            named,
        })
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({})", self)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags: String = self.flags.iter().collect();
        write!(f, "/{}/{}", self.content, flags)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content && self.flags == other.flags
    }
}
