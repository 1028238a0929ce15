use super::{match_projection, Rule, RuleContext};
use crate::command::CommandDecl;
use crate::error::Result;
use crate::pipe::PipeItem;
use crate::util::paths;

/// Matches the file name without its extension.
pub struct Basename {
    decl: CommandDecl,
}

impl Basename {
    pub fn new(decl: CommandDecl) -> Self {
        Self { decl }
    }
}

impl Rule for Basename {
    fn decl(&self) -> &CommandDecl {
        &self.decl
    }

    fn matches(&self, item: &mut PipeItem, ctx: &RuleContext) -> Result<bool> {
        let stem = paths::stem(&item.filepath);
        match_projection(self, item, ctx, &stem, false)
    }
}
