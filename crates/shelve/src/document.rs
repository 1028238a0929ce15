//! Structured block scripts: TOML documents deserialized into ready-to-run
//! [`Block`]s.
//!
//! ```toml
//! [metadata]
//! root = "~/Downloads"
//!
//! [[block]]
//! name = "Invoices"
//!
//! [[block.command]]
//! rule = "extension"
//! content = "pdf"
//!
//! [[block.command]]
//! rule = "filecontent"
//! operator = "and"
//! content = '/Invoice (?P<number>\d+)/i'
//!
//! [[block.command]]
//! action = "move"
//! content = "invoices/{number}"
//! arguments = { makedirs = true }
//! ```

use crate::block::Block;
use crate::command::{Argument, CommandDecl};
use crate::error::{Result, ShelveError};
use crate::expr::{Content, Expression, Segment};
use crate::pipe::Pipe;
use crate::services::{Reporter, Services};
use crate::util::paths::expand_home;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings a document passes down to its blocks; block values win.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    pub root: Option<String>,
    pub simulate: Option<bool>,
    pub ignore_all_exceptions: Option<bool>,
    pub ignore_exceptions: Option<bool>,
}

impl Metadata {
    /// `self` with every unset field taken from `parent`.
    pub fn inherit(&self, parent: &Metadata) -> Metadata {
        Metadata {
            root: self.root.clone().or_else(|| parent.root.clone()),
            simulate: self.simulate.or(parent.simulate),
            ignore_all_exceptions: self.ignore_all_exceptions.or(parent.ignore_all_exceptions),
            ignore_exceptions: self.ignore_exceptions.or(parent.ignore_exceptions),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    #[serde(default)]
    metadata: Metadata,
    #[serde(default, rename = "block")]
    blocks: Vec<RawBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBlock {
    name: String,
    root: Option<String>,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default, rename = "command")]
    commands: Vec<RawCommand>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCommand {
    rule: Option<String>,
    action: Option<String>,
    #[serde(default)]
    operator: RawOperator,
    #[serde(default)]
    content: RawContent,
    #[serde(default)]
    arguments: BTreeMap<String, RawContent>,
    #[serde(default)]
    flags: Vec<String>,
}

/// `"not and"` or `["not", "and"]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOperator {
    Words(String),
    List(Vec<String>),
}

impl Default for RawOperator {
    fn default() -> Self {
        RawOperator::List(Vec::new())
    }
}

impl RawOperator {
    fn tokens(self) -> Vec<String> {
        match self {
            RawOperator::Words(words) => words.split_whitespace().map(str::to_string).collect(),
            RawOperator::List(list) => list,
        }
    }
}

/// A template string, an explicit segment list, or a bare scalar.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContent {
    Template(String),
    Segments(Vec<RawSegment>),
    Bool(bool),
    Integer(i64),
    Float(f64),
}

impl Default for RawContent {
    fn default() -> Self {
        RawContent::Template(String::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSegment {
    Text(String),
    Expr { expr: String },
}

impl RawContent {
    fn into_content(self) -> Result<Content> {
        match self {
            RawContent::Template(template) => Content::template(&template),
            RawContent::Segments(segments) => segments
                .into_iter()
                .map(|segment| match segment {
                    RawSegment::Text(text) => Ok(Segment::Text(text)),
                    RawSegment::Expr { expr } => Expression::new(&expr).map(Segment::Expr),
                })
                .collect::<Result<Vec<_>>>()
                .map(Content::new),
            RawContent::Bool(value) => Ok(Content::text(value.to_string())),
            RawContent::Integer(value) => Ok(Content::text(value.to_string())),
            RawContent::Float(value) => Ok(Content::text(value.to_string())),
        }
    }
}

pub struct Document {
    pub path: Option<PathBuf>,
    pub metadata: Metadata,
    pub blocks: Vec<Block>,
}

impl Document {
    /// Parses a document; relative roots resolve against `base_dir`.
    ///
    /// Any structural problem is a syntax error for the whole document.
    pub fn parse(text: &str, base_dir: Option<&Path>) -> Result<Self> {
        let raw: RawDocument = toml::from_str(text).map_err(|e| toml_syntax(text, &e))?;

        let mut blocks = Vec::with_capacity(raw.blocks.len());
        for raw_block in raw.blocks {
            blocks.push(build_block(raw_block, &raw.metadata, base_dir)?);
        }

        Ok(Self {
            path: None,
            metadata: raw.metadata,
            blocks,
        })
    }

    /// Like [`Document::parse`], but a broken document is reported and loads
    /// with zero blocks.
    pub fn from_toml_str(text: &str, base_dir: Option<&Path>, reporter: &dyn Reporter) -> Self {
        match Self::parse(text, base_dir) {
            Ok(document) => document,
            Err(e) => {
                log::error!("Document failed to load: {}", e);
                reporter.error(&e);
                Self::empty(None)
            }
        }
    }

    /// Reads and parses `path`. Syntax errors carry the file name.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| ShelveError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let mut document = Self::parse(&text, path.parent()).map_err(|e| {
            let line = line_of(&e);
            e.in_file(path, line)
        })?;
        document.path = Some(path.to_path_buf());
        Ok(document)
    }

    /// Like [`Document::load`], reporting failures and yielding zero blocks.
    pub fn from_path(path: &Path, reporter: &dyn Reporter) -> Self {
        match Self::load(path) {
            Ok(document) => document,
            Err(e) => {
                log::error!("{} failed to load: {}", path.display(), e);
                reporter.error(&e);
                Self::empty(Some(path.to_path_buf()))
            }
        }
    }

    fn empty(path: Option<PathBuf>) -> Self {
        Self {
            path,
            metadata: Metadata::default(),
            blocks: Vec::new(),
        }
    }

    pub fn set_simulate(&mut self, simulate: bool) {
        for block in &mut self.blocks {
            block.simulate = block.simulate || simulate;
        }
    }

    /// Overrides every block's root.
    pub fn set_root(&mut self, root: &Path) {
        for block in &mut self.blocks {
            block.root = root.to_path_buf();
        }
    }

    /// Evaluates every block in order, stopping early when cancelled.
    pub fn eval(&mut self, services: &Services) -> Vec<Pipe> {
        let mut pipes = Vec::with_capacity(self.blocks.len());
        for block in &mut self.blocks {
            if services.cancel.is_cancelled() {
                break;
            }
            pipes.push(block.eval(services, None));
        }
        pipes
    }
}

fn build_block(raw: RawBlock, parent: &Metadata, base_dir: Option<&Path>) -> Result<Block> {
    Block::validate_name(&raw.name)?;
    let metadata = raw.metadata.inherit(parent);

    let root = raw
        .root
        .or(metadata.root.clone())
        .ok_or_else(|| {
            ShelveError::syntax(
                format!("Block [[{}]] has no root directory", raw.name),
                format!("[[{}]]", raw.name),
            )
        })?;
    let mut root = expand_home(&root);
    if let Some(base) = base_dir {
        if root.is_relative() {
            root = base.join(root);
        }
    }

    let mut block = Block::new(raw.name, root);
    block.simulate = metadata.simulate.unwrap_or(false);
    block.ignore_all_exceptions = metadata.ignore_all_exceptions.unwrap_or(false);
    let ignore_exceptions = metadata.ignore_exceptions.unwrap_or(false);

    for raw_command in raw.commands {
        let (is_rule, name) = match (raw_command.rule, raw_command.action) {
            (Some(rule), None) => (true, rule),
            (None, Some(action)) => (false, action),
            (rule, action) => {
                return Err(ShelveError::syntax(
                    "A command names exactly one of `rule` or `action`",
                    format!("rule: {:?}, action: {:?}", rule, action),
                ))
            }
        };

        let content = raw_command.content.into_content().map_err(|e| as_syntax(e, &name))?;
        let mut decl = CommandDecl::new(name.trim())
            .with_operator(raw_command.operator.tokens())
            .with_content(content)
            .with_flags(raw_command.flags);
        for (arg_name, raw_content) in raw_command.arguments {
            let content = raw_content.into_content().map_err(|e| as_syntax(e, &name))?;
            decl.arguments.push(Argument::new(arg_name, content));
        }
        if ignore_exceptions {
            decl.set_ignore_exceptions(true);
        }

        let shown = decl.to_string();
        let pushed = if is_rule {
            block.push_rule(decl)
        } else {
            block.push_action(decl)
        };
        pushed.map_err(|e| as_syntax(e, &shown))?;
    }

    Ok(block)
}

/// Any failure while building a command fails the whole document.
fn as_syntax(err: ShelveError, content: &str) -> ShelveError {
    match err {
        ShelveError::Syntax { .. } => err,
        other => ShelveError::syntax(other.to_string(), content),
    }
}

fn toml_syntax(text: &str, err: &toml::de::Error) -> ShelveError {
    let line = err
        .span()
        .map(|span| text[..span.start.min(text.len())].matches('\n').count() + 1);
    ShelveError::Syntax {
        file: None,
        line,
        content: String::new(),
        message: err.message().to_string(),
    }
}

fn line_of(err: &ShelveError) -> Option<usize> {
    match err {
        ShelveError::Syntax { line, .. } => *line,
        _ => None,
    }
}
