use super::{Rule, RuleContext};
use crate::command::CommandDecl;
use crate::error::Result;
use crate::expr::{Resolved, Scope};
use crate::pipe::PipeItem;
use crate::expr::truthy;

const PROPERTIES: [&str; 3] = ["islink", "isfile", "isdir"];

/// Tests one filesystem property: `islink`, `isfile` or `isdir`.
pub struct HasProperty {
    decl: CommandDecl,
}

impl HasProperty {
    pub fn new(decl: CommandDecl) -> Self {
        Self { decl }
    }
}

impl Rule for HasProperty {
    fn decl(&self) -> &CommandDecl {
        &self.decl
    }

    fn matches(&self, item: &mut PipeItem, ctx: &RuleContext) -> Result<bool> {
        let property = match ctx.content(&self.decl, item)? {
            content if content.is_empty() => return Err(self.error("content field is empty")),
            Resolved::Pattern(_) => {
                return Err(self.error("this does not accept regexp as content"))
            }
            Resolved::Text(text) => text.trim().to_string(),
        };

        if !PROPERTIES.contains(&property.as_str()) {
            return Err(self.error(&format!(
                "unknown property \"{}\" (valid: {})",
                property,
                PROPERTIES.join(", ")
            )));
        }

        let properties = Scope::new(item, ctx.services.fs.as_ref()).property();
        Ok(properties.get(&property).is_some_and(truthy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{check, item, rule};
    use tempfile::TempDir;

    #[test]
    fn test_isfile() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();

        assert!(check(&HasProperty::new(rule("hasproperty", "isfile")), &mut item(&file)).unwrap());
        assert!(!check(&HasProperty::new(rule("hasproperty", "isdir")), &mut item(&file)).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_islink() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("a.txt");
        let link = temp_dir.path().join("b.txt");
        std::fs::write(&target, "x").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let rule = HasProperty::new(rule("hasproperty", "islink"));
        assert!(check(&rule, &mut item(&link)).unwrap());
        assert!(!check(&rule, &mut item(&target)).unwrap());
    }

    #[test]
    fn test_rejects_unknown_property_and_regex() {
        let it = &mut item("/tmp/a.txt");
        let err = check(&HasProperty::new(rule("hasproperty", "isbig")), it).unwrap_err();
        assert!(err.to_string().starts_with("hasproperty: unknown property"));
        assert!(check(&HasProperty::new(rule("hasproperty", "/isfile/")), it).is_err());
    }
}
