use super::{Action, ActionContext};
use crate::command::CommandDecl;
use crate::error::Result;
use crate::pipe::PipeItem;
use console::style;

/// Sends files to the trash and marks them deleted.
///
/// Asks first when a person is there to answer, unless `confirm: false`.
pub struct Trash {
    decl: CommandDecl,
}

impl Trash {
    pub fn new(decl: CommandDecl) -> Self {
        Self { decl }
    }
}

impl Action for Trash {
    fn decl(&self) -> &CommandDecl {
        &self.decl
    }

    fn eval_item(&self, item: &mut PipeItem, ctx: &ActionContext) -> Result<()> {
        if !self.decl.content.is_empty() {
            return Err(self.error("this action does not accept content"));
        }
        let fs = ctx.services.fs.as_ref();
        if !fs.is_file(&item.filepath) {
            return Err(self.error("this action can only trash files"));
        }

        let args = ctx.args(&self.decl);
        let interaction = &ctx.services.interaction;
        if !args.is_false("confirm", item)? && interaction.is_interactive() {
            let prompt = format!("delete \"{}\"?", item.filepath.display());
            if !interaction.confirm(&prompt, false)? {
                return Ok(());
            }
        }

        if !args.is_true("silent", item)? {
            ctx.progress(&format!(
                "{} {}",
                style("Trash:").red(),
                style(item.filepath.display()).green()
            ));
        }

        if !ctx.simulate {
            fs.trash(&item.filepath)?;
            log::info!("Trashed {}", item.filepath.display());
        }
        item.deleted = true;
        Ok(())
    }
}
