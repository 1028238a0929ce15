use super::{match_projection, Rule, RuleContext};
use crate::command::CommandDecl;
use crate::error::Result;
use crate::pipe::PipeItem;
use crate::util::paths;

/// Matches the lower-cased extension. Text content may list alternatives
/// separated by commas (`jpg, png`).
pub struct Extension {
    decl: CommandDecl,
}

impl Extension {
    pub fn new(decl: CommandDecl) -> Self {
        Self { decl }
    }
}

impl Rule for Extension {
    fn decl(&self) -> &CommandDecl {
        &self.decl
    }

    fn matches(&self, item: &mut PipeItem, ctx: &RuleContext) -> Result<bool> {
        let extension = paths::extension(&item.filepath);
        match_projection(self, item, ctx, &extension, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{check, item, rule};

    #[test]
    fn test_extension_alternatives() {
        let rule = Extension::new(rule("extension", "jpg, png"));
        assert!(check(&rule, &mut item("/in/a.PNG")).unwrap());
        assert!(check(&rule, &mut item("/in/b.jpg")).unwrap());
        assert!(!check(&rule, &mut item("/in/c.gif")).unwrap());
        assert!(!check(&rule, &mut item("/in/README")).unwrap());
    }

    #[test]
    fn test_extension_regex() {
        let rule = Extension::new(rule("extension", "/^(md|txt)$/"));
        assert!(check(&rule, &mut item("/in/notes.md")).unwrap());
        assert!(!check(&rule, &mut item("/in/notes.mdx")).unwrap());
    }

    #[test]
    fn test_extension_strict() {
        let decl = rule("extension", "txt").with_argument("strict", "true").unwrap();
        let rule = Extension::new(decl);
        assert!(check(&rule, &mut item("/in/a.TXT")).unwrap());
    }

    #[test]
    fn test_extension_strict_disables_globbing() {
        let decl = rule("extension", "t*").with_argument("strict", "true").unwrap();
        assert!(!check(&Extension::new(decl), &mut item("/in/a.txt")).unwrap());
    }
}
