//! Content: literal text interleaved with expressions, resolved per item.

use super::eval::render;
use super::Expression;
use crate::error::{Result, ShelveError};
use crate::pattern::Pattern;
use crate::pipe::PipeItem;
use crate::services::FileSystem;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Expr(Expression),
}

/// The value content resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Text(String),
    /// The composed text had the `/pattern/flags` shape.
    Pattern(Pattern),
}

impl Resolved {
    pub fn is_empty(&self) -> bool {
        matches!(self, Resolved::Text(text) if text.is_empty())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Resolved::Text(text) => Some(text),
            Resolved::Pattern(_) => None,
        }
    }
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Text(text) => f.write_str(text),
            Resolved::Pattern(pattern) => write!(f, "{}", pattern),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Content {
    segments: Vec<Segment>,
}

impl Content {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![Segment::Text(text.into())])
    }

    /// Parses `"out/{basename}"` style templates.
    ///
    /// `\{` and `\}` stay literal. A brace group holding only digits and
    /// commas (`{4}`, `{2,3}`) is a regex quantifier and also stays literal.
    pub fn template(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    text.push(c);
                    if let Some((_, next)) = chars.next() {
                        text.push(next);
                    }
                }
                '{' => {
                    let rest = &source[i + 1..];
                    let end = closing_brace(rest).ok_or_else(|| {
                        ShelveError::syntax("Unclosed '{' in content", source)
                    })?;
                    let inner = &rest[..end];

                    if is_quantifier(inner) {
                        text.push('{');
                        text.push_str(inner);
                        text.push('}');
                    } else {
                        if !text.is_empty() {
                            segments.push(Segment::Text(std::mem::take(&mut text)));
                        }
                        segments.push(Segment::Expr(Expression::new(inner)?));
                    }

                    let skip_to = i + 1 + end;
                    while chars.peek().is_some_and(|(j, _)| *j <= skip_to) {
                        chars.next();
                    }
                }
                _ => text.push(c),
            }
        }

        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Text(text) if text.trim().is_empty()))
    }

    pub fn has_expressions(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Expr(_)))
    }

    /// The text of content that holds no expressions.
    pub fn literal(&self) -> Option<String> {
        if self.has_expressions() {
            return None;
        }
        Some(
            self.segments
                .iter()
                .filter_map(|s| match s {
                    Segment::Text(text) => Some(text.as_str()),
                    Segment::Expr(_) => None,
                })
                .collect(),
        )
    }

    pub fn set_ignore_exceptions(&mut self, ignore: bool) {
        for segment in &mut self.segments {
            if let Segment::Expr(expr) = segment {
                *expr = expr.clone().ignoring_exceptions(ignore);
            }
        }
    }

    /// Compiles literal regex content now so bad flags fail at load time.
    pub fn precompile(&self) -> Result<()> {
        if let Some(text) = self.literal() {
            if Pattern::is_valid(&text) {
                Pattern::parse(&text)?;
            }
        }
        Ok(())
    }

    /// Resolves with leading whitespace trimmed.
    pub fn resolve(&self, item: &PipeItem, fs: &dyn FileSystem) -> Result<Resolved> {
        let text = self.concat(item, fs)?;
        finish(text.trim_start().to_string())
    }

    /// Resolves exactly as written.
    pub fn resolve_raw(&self, item: &PipeItem, fs: &dyn FileSystem) -> Result<Resolved> {
        finish(self.concat(item, fs)?)
    }

    fn concat(&self, item: &PipeItem, fs: &dyn FileSystem) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Expr(expr) => out.push_str(&render(&expr.eval(item, fs)?)),
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => f.write_str(text)?,
                Segment::Expr(expr) => write!(f, "{{{}}}", expr.content())?,
            }
        }
        Ok(())
    }
}

fn finish(text: String) -> Result<Resolved> {
    if Pattern::is_valid(&text) {
        return Pattern::parse(&text).map(Resolved::Pattern);
    }
    Ok(Resolved::Text(unescape(&text)))
}

pub fn unescape(text: &str) -> String {
    text.replace(r"\/", "/")
        .replace(r"\}", "}")
        .replace(r"\{", "{")
        .replace(r"\:", ":")
}

/// Offset of the `}` closing an expression, skipping quoted strings.
fn closing_brace(rest: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '}') => return Some(i),
            _ => {}
        }
    }
    None
}

fn is_quantifier(inner: &str) -> bool {
    !inner.is_empty()
        && inner.chars().any(|c| c.is_ascii_digit())
        && inner.chars().all(|c| c.is_ascii_digit() || c == ',')
}
