use super::{merge_match, Rule, RuleContext};
use crate::command::{Args, CommandDecl};
use crate::error::{Result, ShelveError};
use crate::expr::Resolved;
use crate::pipe::PipeItem;
use crate::services::FileSystem;
use crate::util::paths;
use console::style;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Extensions whose bytes are never read as text.
const BINARY_EXTENSIONS: &[&str] = &[
    "appimage", "zip", "deb", "doc", "docx", "gif", "gz", "iso", "jpeg", "jpg", "mp3", "mp4",
    "png", "pptx", "rar", "tgz", "torrent", "xlsx", "xod", "zst", "7z", "exe", "bin",
];

/// Item data key holding extracted text, shared by every rule that reads content.
pub const CACHE_KEY: &str = "file_content";

/// Item data key holding the [`ReadLimits`] the cached text was read with.
const CACHE_LIMITS_KEY: &str = "file_content_limits";

/// How much of a file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadLimits {
    pub max_lines: usize,
    pub max_pages: usize,
    pub line_length: usize,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            max_lines: 10,
            max_pages: 10,
            line_length: 200,
        }
    }
}

impl ReadLimits {
    pub fn from_args(args: &Args, item: &PipeItem) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            max_lines: args.count("max_lines", item, defaults.max_lines)?,
            max_pages: args.count("max_pages", item, defaults.max_pages)?,
            line_length: args.count("linelength", item, defaults.line_length)?,
        })
    }
}

/// Extracted text of `path`, bounded by `limits`.
pub fn read_file_content(path: &Path, limits: ReadLimits, fs: &dyn FileSystem) -> Result<String> {
    let extension = paths::extension(path);
    let unreadable = |reason: String| {
        ShelveError::rule(
            "filecontent",
            format!("cannot fetch file contents of \"{}\": {}", path.display(), reason),
        )
    };

    if BINARY_EXTENSIONS.contains(&extension.as_str()) {
        return Err(unreadable(format!("{} files are binary", extension)));
    }
    if extension == "pdf" {
        return read_pdf(path, limits).map_err(|e| unreadable(e.to_string()));
    }

    let lines = fs
        .read_lines(path, limits.max_lines)
        .map_err(|e| unreadable(e.to_string()))?;
    Ok(lines
        .iter()
        .map(|line| truncate(line, limits.line_length))
        .collect())
}

fn truncate(line: &str, max_chars: usize) -> String {
    match line.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut short = line[..cut].to_string();
            if line.ends_with('\n') {
                short.push('\n');
            }
            short
        }
        None => line.to_string(),
    }
}

#[cfg(feature = "pdf")]
fn read_pdf(path: &Path, limits: ReadLimits) -> Result<String> {
    let pages = pdf_extract::extract_text_by_pages(path).map_err(|e| ShelveError::ExternalTool {
        tool: "pdf-extract".to_string(),
        message: e.to_string(),
    })?;
    Ok(pages.into_iter().take(limits.max_pages).collect())
}

#[cfg(not(feature = "pdf"))]
fn read_pdf(_path: &Path, _limits: ReadLimits) -> Result<String> {
    Err(ShelveError::Config(
        "PDF support is not compiled in (enable the `pdf` feature)".to_string(),
    ))
}

/// Content from the item's cache when it was read with the same `limits`,
/// otherwise read again and cached.
pub(crate) fn cached_content(
    item: &mut PipeItem,
    limits: ReadLimits,
    fs: &dyn FileSystem,
) -> Result<String> {
    let wanted = serde_json::to_value(limits)?;
    if item.get(CACHE_LIMITS_KEY) == Some(&wanted) {
        if let Some(Value::String(text)) = item.get(CACHE_KEY) {
            return Ok(text.clone());
        }
    }
    let text = read_file_content(&item.filepath, limits, fs)?;
    item.set(CACHE_KEY, Value::String(text.clone()));
    item.set(CACHE_LIMITS_KEY, wanted);
    Ok(text)
}

/// Searches the beginning of the file with regex content.
pub struct FileContent {
    decl: CommandDecl,
}

impl FileContent {
    pub fn new(decl: CommandDecl) -> Self {
        Self { decl }
    }
}

impl Rule for FileContent {
    fn decl(&self) -> &CommandDecl {
        &self.decl
    }

    fn matches(&self, item: &mut PipeItem, ctx: &RuleContext) -> Result<bool> {
        let pattern = match ctx.content(&self.decl, item)? {
            content if content.is_empty() => return Err(self.error("content field is empty")),
            Resolved::Text(_) => return Err(self.error("content must be a regexp")),
            Resolved::Pattern(pattern) => pattern,
        };

        let args = ctx.args(&self.decl);
        let limits = ReadLimits::from_args(&args, item)?;
        let text = cached_content(item, limits, ctx.services.fs.as_ref())?;

        if args.is_true("verbose", item)? {
            ctx.progress(&text);
        }

        let found = pattern.search(&text);
        let path = item.path_str();
        let status = if found.is_some() {
            style(&path).green()
        } else {
            style(&path).red()
        };
        if args.is_false("minimal", item)? || (args.is_true("minimal", item)? && found.is_some()) {
            ctx.progress(&format!(
                "{} {}  {}",
                style("Filecontent:").yellow(),
                style(pattern.content()).cyan(),
                status
            ));
        }

        match found {
            Some(found) => {
                merge_match(item, &found);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
