use super::{Action, ActionContext};
use crate::command::{ArgumentDefaults, CommandDecl};
use crate::error::Result;
use crate::pipe::PipeItem;

/// Pre-seeds the arguments of later commands named by the content.
///
/// Each argument is resolved against the item and handed to the block, which
/// stores it as a default of every matching command still ahead.
pub struct SetDefaults {
    decl: CommandDecl,
}

impl SetDefaults {
    pub fn new(decl: CommandDecl) -> Self {
        Self { decl }
    }
}

impl Action for SetDefaults {
    fn decl(&self) -> &CommandDecl {
        &self.decl
    }

    fn eval_item(&self, item: &mut PipeItem, ctx: &ActionContext) -> Result<()> {
        let target = self.text_content(item, ctx)?;
        let target = target.trim();
        if target.is_empty() {
            return Err(self.error("You must specify a command name"));
        }

        let fs = ctx.services.fs.as_ref();
        let mut values = ArgumentDefaults::new();
        for argument in &self.decl.arguments {
            values.insert(argument.name.clone(), argument.content.resolve(item, fs)?);
        }
        ctx.push_defaults(target.to_string(), values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{action, pipe_of, run};
    use crate::expr::Resolved;
    use crate::services::{CaptureReporter, Services};
    use std::path::PathBuf;
    use std::rc::Rc;

    #[test]
    fn test_pushes_resolved_arguments() {
        let services = Services::headless();
        let mut pipe = pipe_of(&[PathBuf::from("/in/a.txt")]);

        let decl = action("set_defaults", "move")
            .with_argument("makedirs", "true")
            .unwrap()
            .with_argument("on_conflict", "{'rename'}")
            .unwrap();
        let pushed = run(&SetDefaults::new(decl), &mut pipe, &services, false);

        assert_eq!(pushed.len(), 1);
        let (target, values) = &pushed[0];
        assert_eq!(target, "move");
        assert_eq!(values["makedirs"], Resolved::Text("true".to_string()));
        assert_eq!(values["on_conflict"], Resolved::Text("rename".to_string()));
    }

    #[test]
    fn test_requires_target() {
        let reporter = Rc::new(CaptureReporter::default());
        let services = Services::headless().with_reporter(reporter.clone());
        let mut pipe = pipe_of(&[PathBuf::from("/in/a.txt")]);

        run(&SetDefaults::new(action("set_defaults", "")), &mut pipe, &services, false);

        assert_eq!(reporter.errors(), vec!["set_defaults: You must specify a command name".to_string()]);
    }
}
