use super::{match_projection, Rule, RuleContext};
use crate::command::CommandDecl;
use crate::error::Result;
use crate::pipe::PipeItem;

/// Matches the full path.
pub struct PathRule {
    decl: CommandDecl,
}

impl PathRule {
    pub fn new(decl: CommandDecl) -> Self {
        Self { decl }
    }
}

impl Rule for PathRule {
    fn decl(&self) -> &CommandDecl {
        &self.decl
    }

    fn matches(&self, item: &mut PipeItem, ctx: &RuleContext) -> Result<bool> {
        let path = item.path_str();
        match_projection(self, item, ctx, &path, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{check, item, rule};

    #[test]
    fn test_path_glob_crosses_directories() {
        let rule = PathRule::new(rule("path", "/home/*/Downloads/*.zip"));
        assert!(check(&rule, &mut item("/home/ana/Downloads/a.zip")).unwrap());
        assert!(!check(&rule, &mut item("/home/ana/Documents/a.zip")).unwrap());
    }

    #[test]
    fn test_path_regex() {
        let rule = PathRule::new(rule("path", r"/\/(?P<user>\w+)\/Downloads\//"));
        let mut it = item("/home/ana/Downloads/a.zip");
        assert!(check(&rule, &mut it).unwrap());
        assert_eq!(it.data["user"], serde_json::Value::from("ana"));
    }
}
