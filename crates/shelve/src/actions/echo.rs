use super::{Action, ActionContext};
use crate::command::CommandDecl;
use crate::error::Result;
use crate::pipe::PipeItem;
use console::style;
use serde_json::Value;

/// Prints its content, or the file path when there is none.
pub struct Echo {
    decl: CommandDecl,
}

impl Echo {
    pub fn new(decl: CommandDecl) -> Self {
        Self { decl }
    }
}

impl Action for Echo {
    fn decl(&self) -> &CommandDecl {
        &self.decl
    }

    fn eval_item(&self, item: &mut PipeItem, ctx: &ActionContext) -> Result<()> {
        let text = self.text_content(item, ctx)?;
        if text.is_empty() {
            ctx.progress(&format!(
                "{} \"{}\"",
                style("Echo:").yellow(),
                style(item.filepath.display()).green()
            ));
        } else {
            ctx.progress(&text);
            item.set("echo", Value::String(text));
        }
        Ok(())
    }
}
