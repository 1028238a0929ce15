use super::{Action, ActionContext};
use crate::command::CommandDecl;
use crate::error::Result;
use crate::expr::eval::object;
use crate::pipe::PipeItem;
use crate::util::paths::expand_home;
use console::style;
use serde_json::Value;

/// Runs a command line per item and keeps its output under
/// `terminal.out`.
pub struct Terminal {
    decl: CommandDecl,
}

impl Terminal {
    pub fn new(decl: CommandDecl) -> Self {
        Self { decl }
    }
}

impl Action for Terminal {
    fn decl(&self) -> &CommandDecl {
        &self.decl
    }

    fn eval_item(&self, item: &mut PipeItem, ctx: &ActionContext) -> Result<()> {
        let command = self.text_content(item, ctx)?;
        if command.trim().is_empty() {
            return Err(self.error("content field is empty"));
        }

        let args = ctx.args(&self.decl);
        let cwd = match args.text("cwd", item)? {
            Some(dir) => expand_home(&dir),
            None => std::env::current_dir()?,
        };
        let verbose = args.is_true("verbose", item)?;

        if ctx.simulate {
            ctx.progress(&format!("{} {}", style("Terminal (simulated):").yellow(), command));
            item.set(
                "terminal",
                object([
                    ("out", Value::String(String::new())),
                    ("success", Value::Bool(true)),
                ]),
            );
            return Ok(());
        }

        let output = ctx.services.shell.run(&command, &cwd)?;
        if verbose {
            let line = if output.success {
                style(format!("Terminal: {}", command)).green()
            } else {
                style(format!("Terminal failed: {}", command)).red()
            };
            ctx.progress(&line.to_string());
        }
        if !output.success {
            log::warn!("{} exited unsuccessfully", command);
        }

        item.set(
            "terminal",
            object([
                ("out", Value::String(output.stdout)),
                ("success", Value::Bool(output.success)),
            ]),
        );
        Ok(())
    }
}
