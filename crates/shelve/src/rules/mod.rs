//! Input rules: predicates that decide which files stay in the pipe.

mod basename;
mod conditional;
mod extension;
mod file;
mod filecontent;
mod has_property;
mod keywords;
mod path;
mod template;

pub use basename::Basename;
pub use conditional::IfExpression;
pub use extension::Extension;
pub use file::File;
pub use filecontent::{read_file_content, FileContent, ReadLimits};
pub use has_property::HasProperty;
pub use keywords::Keywords;
pub use path::PathRule;
pub use template::TemplateSimilarity;

use crate::command::{ArgumentDefaults, Args, CommandDecl};
use crate::error::{Result, ShelveError};
use crate::expr::Resolved;
use crate::pattern::PatternMatch;
use crate::pipe::PipeItem;
use crate::services::Services;
use globset::GlobBuilder;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// What a rule sees while it runs.
pub struct RuleContext<'a> {
    pub services: &'a Services,
    pub defaults: &'a ArgumentDefaults,
}

impl<'a> RuleContext<'a> {
    pub fn new(services: &'a Services, defaults: &'a ArgumentDefaults) -> Self {
        Self { services, defaults }
    }

    pub fn args<'b>(&'b self, decl: &'b CommandDecl) -> Args<'b> {
        Args::new(decl, self.defaults, self.services.fs.as_ref())
    }

    pub fn content(&self, decl: &CommandDecl, item: &PipeItem) -> Result<Resolved> {
        decl.content.resolve(item, self.services.fs.as_ref())
    }

    pub fn raw_content(&self, decl: &CommandDecl, item: &PipeItem) -> Result<Resolved> {
        decl.content.resolve_raw(item, self.services.fs.as_ref())
    }

    pub fn progress(&self, line: &str) {
        self.services.reporter.progress(line);
    }
}

pub trait Rule {
    fn decl(&self) -> &CommandDecl;

    /// Files this rule finds on its own under `root`. Most rules find none.
    fn discover(&self, _root: &Path, _ctx: &RuleContext) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    /// Whether `item` matches. May enrich the item's data on the way.
    fn matches(&self, item: &mut PipeItem, ctx: &RuleContext) -> Result<bool>;

    fn name(&self) -> &str {
        &self.decl().name
    }

    fn error(&self, message: &str) -> ShelveError {
        ShelveError::rule(&self.decl().name, message)
    }
}

type Constructor = fn(CommandDecl) -> Result<Box<dyn Rule>>;

fn boxed<R: Rule + 'static>(rule: R) -> Result<Box<dyn Rule>> {
    Ok(Box::new(rule))
}

const REGISTRY: &[(&str, Constructor)] = &[
    ("basename", |d| boxed(Basename::new(d))),
    ("extension", |d| boxed(Extension::new(d))),
    ("path", |d| boxed(PathRule::new(d))),
    ("file", |d| boxed(File::new(d))),
    ("filecontent", |d| boxed(FileContent::new(d))),
    ("hasproperty", |d| boxed(HasProperty::new(d))),
    ("keywords", |d| boxed(Keywords::new(d))),
    ("if", |d| IfExpression::new(d).map(|r| Box::new(r) as Box<dyn Rule>)),
    ("template", |d| boxed(TemplateSimilarity::new(d))),
];

/// Accepted spellings that map onto a registered name.
const ALIASES: &[(&str, &str)] = &[
    ("has_property", "hasproperty"),
    ("file_content", "filecontent"),
    ("pdf_template", "template"),
    ("template_similarity", "template"),
];

pub fn canonical(name: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, target)| *target)
        .unwrap_or(name)
}

pub fn names() -> Vec<&'static str> {
    REGISTRY.iter().map(|(name, _)| *name).collect()
}

/// Builds the rule registered under `decl.name`.
pub fn build(decl: CommandDecl) -> Result<Box<dyn Rule>> {
    let name = canonical(&decl.name).to_string();
    let (_, constructor) = REGISTRY
        .iter()
        .find(|(n, _)| *n == name)
        .ok_or_else(|| {
            ShelveError::syntax(
                format!("Unknown rule \"{}\" (valid: {})", decl.name, names().join(", ")),
                decl.to_string(),
            )
        })?;
    constructor(decl)
}

/// fnmatch-style glob: `*` and `?` cross `/`, matching is case-sensitive.
pub fn glob_match(pattern: &str, text: &str) -> Result<bool> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(false)
        .backslash_escape(true)
        .build()
        .map_err(|e| ShelveError::rule("glob", format!("invalid pattern \"{}\": {}", pattern, e)))?;
    Ok(glob.compile_matcher().is_match(text))
}

/// Copies named groups, positional groups (`groups`) and the whole match
/// (`match`) into the item's data.
pub fn merge_match(item: &mut PipeItem, found: &PatternMatch) {
    item.merge(found.groupdict());
    item.set(
        "groups",
        Value::Array(
            found
                .groups()
                .iter()
                .map(|g| g.clone().map(Value::String).unwrap_or(Value::Null))
                .collect(),
        ),
    );
    item.set("match", Value::String(found.matched.clone()));
}

/// Shared logic of the rules that compare content against one projection of
/// the file path.
///
/// Regex content is searched in the projection. Text content is glob-matched,
/// or compared exactly (as written, untrimmed) under `strict: true`.
/// `alternatives` splits text content on commas.
pub(crate) fn match_projection(
    rule: &dyn Rule,
    item: &mut PipeItem,
    ctx: &RuleContext,
    projection: &str,
    alternatives: bool,
) -> Result<bool> {
    let decl = rule.decl();
    let content = ctx.content(decl, item)?;
    if content.is_empty() {
        return Err(rule.error("content field is empty"));
    }

    match content {
        Resolved::Pattern(pattern) => match pattern.search(projection) {
            Some(found) => {
                merge_match(item, &found);
                Ok(true)
            }
            None => Ok(false),
        },
        Resolved::Text(text) => {
            if ctx.args(decl).is_true("strict", item)? {
                let raw = ctx.raw_content(decl, item)?;
                return Ok(raw.as_text() == Some(projection));
            }
            if alternatives {
                for alternative in text.split(',') {
                    let alternative = alternative.trim();
                    if !alternative.is_empty() && glob_match(alternative, projection)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            } else {
                glob_match(text.trim(), projection)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_builds_known_rules() {
        for name in names() {
            let decl = CommandDecl::new(name);
            assert!(build(decl).is_ok(), "{} should build", name);
        }
        assert!(build(CommandDecl::new("has_property")).is_ok());
        assert!(build(CommandDecl::new("pdf_template")).is_ok());
    }

    #[test]
    fn test_unknown_rule_is_syntax_error() {
        let err = build(CommandDecl::new("colour")).err().unwrap();
        assert!(matches!(err, ShelveError::Syntax { .. }));
        assert!(err.to_string().contains("Unknown rule \"colour\""));
    }

    #[test]
    fn test_glob_match_is_fnmatch_like() {
        assert!(glob_match("al*n", "alan").unwrap());
        assert!(!glob_match("al*n", "alan2").unwrap());
        assert!(glob_match("*.txt", "/a/b/c.txt").unwrap());
        assert!(glob_match("file?", "file1").unwrap());
        assert!(!glob_match("ALAN", "alan").unwrap());
        assert!(glob_match("[!a]*", "bob").unwrap());
    }
}
