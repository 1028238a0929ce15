//! Destination actions: effects applied to every live item left in the pipe.

mod echo;
mod prompt;
mod set_defaults;
mod terminal;
mod transfer;
mod trash;

pub use echo::Echo;
pub use prompt::Prompt;
pub use set_defaults::SetDefaults;
pub use terminal::Terminal;
pub use transfer::{ConflictPolicy, CopyFile, MoveFile};
pub use trash::Trash;

use crate::command::{ArgumentDefaults, Args, CommandDecl};
use crate::error::{Result, ShelveError};
use crate::expr::Resolved;
use crate::pipe::{Pipe, PipeItem};
use crate::services::Services;
use std::cell::RefCell;

/// What an action sees while it runs.
pub struct ActionContext<'a> {
    pub services: &'a Services,
    pub defaults: &'a ArgumentDefaults,
    /// Perform no filesystem or process side effects.
    pub simulate: bool,
    /// Defaults pushed by `set_defaults`, keyed by target command name.
    /// The block applies them once the action finishes.
    pending_defaults: RefCell<Vec<(String, ArgumentDefaults)>>,
}

impl<'a> ActionContext<'a> {
    pub fn new(services: &'a Services, defaults: &'a ArgumentDefaults, simulate: bool) -> Self {
        Self {
            services,
            defaults,
            simulate,
            pending_defaults: RefCell::new(Vec::new()),
        }
    }

    pub fn args<'b>(&'b self, decl: &'b CommandDecl) -> Args<'b> {
        Args::new(decl, self.defaults, self.services.fs.as_ref())
    }

    pub fn content(&self, decl: &CommandDecl, item: &PipeItem) -> Result<Resolved> {
        decl.content.resolve(item, self.services.fs.as_ref())
    }

    pub fn progress(&self, line: &str) {
        self.services.reporter.progress(line);
    }

    pub fn push_defaults(&self, target: String, values: ArgumentDefaults) {
        self.pending_defaults.borrow_mut().push((target, values));
    }

    pub fn take_pending_defaults(&self) -> Vec<(String, ArgumentDefaults)> {
        self.pending_defaults.take()
    }
}

pub trait Action {
    fn decl(&self) -> &CommandDecl;

    fn eval_item(&self, item: &mut PipeItem, ctx: &ActionContext) -> Result<()>;

    /// Applies the action to every live item.
    fn eval(&self, pipe: &mut Pipe, ctx: &ActionContext) {
        for_each_live(self, pipe, ctx);
    }

    fn name(&self) -> &str {
        &self.decl().name
    }

    fn error(&self, message: &str) -> ShelveError {
        ShelveError::action(&self.decl().name, message)
    }

    /// Resolved content as text. Actions never take a regex.
    fn text_content(&self, item: &PipeItem, ctx: &ActionContext) -> Result<String> {
        match ctx.content(self.decl(), item)? {
            Resolved::Pattern(_) => Err(self.error("cannot use Regex as argument")),
            Resolved::Text(text) => Ok(text),
        }
    }
}

/// Runs `eval_item` over the live items. Errors are reported per item and
/// never stop the loop; a cancellation request does.
pub fn for_each_live<A: Action + ?Sized>(action: &A, pipe: &mut Pipe, ctx: &ActionContext) {
    for id in pipe.live_ids() {
        if ctx.services.cancel.is_cancelled() {
            log::info!("{}: cancelled, skipping remaining items", action.name());
            break;
        }
        let Some(item) = pipe.get_mut(id) else {
            continue;
        };
        if let Err(e) = action.eval_item(item, ctx) {
            log::warn!("{} failed for {}: {}", action.name(), item.path_str(), e);
            report(pipe, ctx, &e);
        }
    }
}

pub(crate) fn report(pipe: &Pipe, ctx: &ActionContext, err: &ShelveError) {
    if !pipe.ignore_all_exceptions {
        ctx.services.reporter.error(err);
    }
}

type Constructor = fn(CommandDecl) -> Box<dyn Action>;

const REGISTRY: &[(&str, Constructor)] = &[
    ("move", |d| Box::new(MoveFile::new(d))),
    ("copy", |d| Box::new(CopyFile::new(d))),
    ("trash", |d| Box::new(Trash::new(d))),
    ("echo", |d| Box::new(Echo::new(d))),
    ("terminal", |d| Box::new(Terminal::new(d))),
    ("prompt", |d| Box::new(Prompt::new(d))),
    ("set_defaults", |d| Box::new(SetDefaults::new(d))),
];

pub fn names() -> Vec<&'static str> {
    REGISTRY.iter().map(|(name, _)| *name).collect()
}

/// Builds the action registered under `decl.name`.
pub fn build(decl: CommandDecl) -> Result<Box<dyn Action>> {
    let (_, constructor) = REGISTRY
        .iter()
        .find(|(n, _)| *n == decl.name)
        .ok_or_else(|| {
            ShelveError::syntax(
                format!("Unknown action \"{}\" (valid: {})", decl.name, names().join(", ")),
                decl.to_string(),
            )
        })?;
    Ok(constructor(decl))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::path::PathBuf;

    pub fn action(name: &str, content: &str) -> CommandDecl {
        CommandDecl::new(name).with_template(content).unwrap()
    }

    pub fn pipe_of(paths: &[PathBuf]) -> Pipe {
        let root = paths
            .first()
            .and_then(|p| p.parent())
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        Pipe::new(paths.to_vec(), root)
    }

    /// Runs `action` over `pipe` with `services`, returning pushed defaults.
    pub fn run(
        action: &dyn Action,
        pipe: &mut Pipe,
        services: &Services,
        simulate: bool,
    ) -> Vec<(String, ArgumentDefaults)> {
        let defaults = ArgumentDefaults::new();
        let ctx = ActionContext::new(services, &defaults, simulate);
        action.eval(pipe, &ctx);
        ctx.take_pending_defaults()
    }
}
