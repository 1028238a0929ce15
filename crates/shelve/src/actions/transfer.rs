//! `move` and `copy`: the two actions that place a file somewhere else.

use super::{Action, ActionContext};
use crate::command::CommandDecl;
use crate::error::{Result, ShelveError};
use crate::pipe::PipeItem;
use crate::util::paths::{self, expand_home, numbered_destination};
use console::style;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// What to do when the destination file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    Skip,
    Rename,
    Overwrite,
}

impl ConflictPolicy {
    pub const CHOICES: [&'static str; 3] = ["skip", "rename", "overwrite"];

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "skip" => Some(ConflictPolicy::Skip),
            "rename" => Some(ConflictPolicy::Rename),
            "overwrite" => Some(ConflictPolicy::Overwrite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Move,
    Copy,
}

impl Mode {
    fn label(self) -> &'static str {
        match self {
            Mode::Move => "Move",
            Mode::Copy => "Copy",
        }
    }
}

/// Moves each file into a destination directory and marks the item deleted.
pub struct MoveFile {
    decl: CommandDecl,
}

impl MoveFile {
    pub fn new(decl: CommandDecl) -> Self {
        Self { decl }
    }
}

impl Action for MoveFile {
    fn decl(&self) -> &CommandDecl {
        &self.decl
    }

    fn eval_item(&self, item: &mut PipeItem, ctx: &ActionContext) -> Result<()> {
        transfer(self, Mode::Move, item, ctx)
    }
}

/// Same contract as `move`, but leaves the source in place and the item live.
pub struct CopyFile {
    decl: CommandDecl,
}

impl CopyFile {
    pub fn new(decl: CommandDecl) -> Self {
        Self { decl }
    }
}

impl Action for CopyFile {
    fn decl(&self) -> &CommandDecl {
        &self.decl
    }

    fn eval_item(&self, item: &mut PipeItem, ctx: &ActionContext) -> Result<()> {
        transfer(self, Mode::Copy, item, ctx)
    }
}

/// Destination directory for `destination`. Relative destinations are taken
/// from the file's own folder.
fn destination_dir(destination: &str, source: &Path) -> PathBuf {
    let dest = expand_home(destination);
    match source.parent() {
        Some(folder) if dest.is_relative() => folder.join(dest),
        _ => dest,
    }
}

fn conflict_policy(action: &dyn Action, item: &PipeItem, target: &Path, ctx: &ActionContext) -> Result<ConflictPolicy> {
    if let Some(text) = ctx.args(action.decl()).text("on_conflict", item)? {
        return ConflictPolicy::parse(&text).ok_or_else(|| {
            action.error(&format!(
                "invalid on_conflict \"{}\" (valid: {})",
                text,
                ConflictPolicy::CHOICES.join(", ")
            ))
        });
    }

    let interaction = &ctx.services.interaction;
    if ctx.simulate || !interaction.is_interactive() {
        return Ok(ConflictPolicy::Skip);
    }
    let choices: Vec<String> = ConflictPolicy::CHOICES.iter().map(|c| c.to_string()).collect();
    let index = interaction.select(
        &format!("\"{}\" already exists", target.display()),
        &choices,
        0,
    )?;
    Ok(ConflictPolicy::parse(&choices[index]).unwrap_or(ConflictPolicy::Skip))
}

fn transfer(action: &dyn Action, mode: Mode, item: &mut PipeItem, ctx: &ActionContext) -> Result<()> {
    let destination = action.text_content(item, ctx)?;
    if destination.trim().is_empty() {
        return Err(action.error("destination path is empty"));
    }

    let fs = ctx.services.fs.as_ref();
    let source = item.filepath.clone();
    if !fs.is_file(&source) {
        return Err(action.error(&format!(
            "this action can only {} files",
            mode.label().to_lowercase()
        )));
    }

    let args = ctx.args(action.decl());
    let dir = destination_dir(destination.trim(), &source);
    let mut target = dir.join(paths::file_name(&source));

    if !fs.is_dir(&dir) {
        if !args.is_true("makedirs", item)? {
            return Err(action.error(&format!(
                "directory \"{}\" does not exist. Use the argument \"makedirs: true\" to create missing directories",
                dir.display()
            )));
        }
        if !ctx.simulate {
            fs.create_dir_all(&dir)?;
        }
    }

    if target != source && fs.exists(&target) {
        match conflict_policy(action, item, &target, ctx)? {
            ConflictPolicy::Skip => {
                if !args.is_true("silent", item)? {
                    ctx.progress(&format!(
                        "{} {} {}",
                        style("Skip:").yellow(),
                        style(source.display()).green(),
                        style("(destination exists)").dim()
                    ));
                }
                return Ok(());
            }
            ConflictPolicy::Rename => {
                let name = paths::file_name(&target);
                target = numbered_destination(&dir, &name, |p| fs.exists(p));
            }
            ConflictPolicy::Overwrite => {}
        }
    }

    if !args.is_true("silent", item)? {
        ctx.progress(&format!(
            "{} {} {} {}",
            style(format!("{}:", mode.label())).yellow(),
            style(source.display()).green(),
            style("->").cyan(),
            style(target.display()).green()
        ));
    }

    if !ctx.simulate {
        let done = match mode {
            Mode::Move => fs.move_file(&source, &target),
            Mode::Copy => fs.copy_file(&source, &target),
        };
        done.map_err(|e| ShelveError::action(action.name(), e.to_string()))?;
        ctx.services.record_file(&source, &target);
        log::info!("{} {} -> {}", mode.label(), source.display(), target.display());
    }

    let key = mode.label().to_lowercase();
    item.set(key, Value::String(target.to_string_lossy().to_string()));
    if mode == Mode::Move {
        item.deleted = true;
    }
    Ok(())
}
