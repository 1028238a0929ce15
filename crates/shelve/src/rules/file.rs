use super::{match_projection, Rule, RuleContext};
use crate::command::CommandDecl;
use crate::error::Result;
use crate::pipe::PipeItem;
use crate::util::paths;

/// Matches the file name including its extension.
pub struct File {
    decl: CommandDecl,
}

impl File {
    pub fn new(decl: CommandDecl) -> Self {
        Self { decl }
    }
}

impl Rule for File {
    fn decl(&self) -> &CommandDecl {
        &self.decl
    }

    fn matches(&self, item: &mut PipeItem, ctx: &RuleContext) -> Result<bool> {
        let name = paths::file_name(&item.filepath);
        match_projection(self, item, ctx, &name, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{check, item, rule};

    #[test]
    fn test_file_name_glob() {
        let rule = File::new(rule("file", "IMG_*.jpg"));
        assert!(check(&rule, &mut item("/in/IMG_0001.jpg")).unwrap());
        assert!(!check(&rule, &mut item("/in/IMG_0001.jpeg")).unwrap());
    }

    #[test]
    fn test_file_name_with_expression() {
        let rule = File::new(rule("file", "{basename}.txt"));
        assert!(check(&rule, &mut item("/in/notes.txt")).unwrap());
        assert!(!check(&rule, &mut item("/in/notes.md")).unwrap());
    }
}
