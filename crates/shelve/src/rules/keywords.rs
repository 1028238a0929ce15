use super::filecontent::{cached_content, ReadLimits};
use super::{glob_match, merge_match, Rule, RuleContext};
use crate::command::CommandDecl;
use crate::error::Result;
use crate::expr::Resolved;
use crate::pattern::Pattern;
use crate::pipe::PipeItem;
use crate::util::paths;
use console::style;
use std::cell::RefCell;

/// Matches when the file name or the beginning of the file mentions any of a
/// comma-separated list of terms.
///
/// The name is checked first so files named after a term never get read.
/// Inside the content each term is searched case-insensitively as a regex.
pub struct Keywords {
    decl: CommandDecl,
    /// Compiled terms of the last resolved content.
    compiled: RefCell<Option<(String, Vec<(String, Pattern)>)>>,
}

impl Keywords {
    pub fn new(decl: CommandDecl) -> Self {
        Self {
            decl,
            compiled: RefCell::new(None),
        }
    }

    fn terms(text: &str) -> Vec<&str> {
        text.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn term_pattern(term: &str) -> Result<Pattern> {
        Pattern::new(term, &['i']).or_else(|_| Pattern::new(&regex::escape(term), &['i']))
    }

    /// Term patterns for `text`, compiled only when `text` changes.
    fn patterns(&self, text: &str) -> Result<Vec<(String, Pattern)>> {
        if let Some((source, patterns)) = self.compiled.borrow().as_ref() {
            if source == text {
                return Ok(patterns.clone());
            }
        }
        let patterns = Self::terms(text)
            .into_iter()
            .map(|term| Ok((term.to_string(), Self::term_pattern(term)?)))
            .collect::<Result<Vec<_>>>()?;
        *self.compiled.borrow_mut() = Some((text.to_string(), patterns.clone()));
        Ok(patterns)
    }
}

impl Rule for Keywords {
    fn decl(&self) -> &CommandDecl {
        &self.decl
    }

    fn matches(&self, item: &mut PipeItem, ctx: &RuleContext) -> Result<bool> {
        let text = match ctx.content(&self.decl, item)? {
            content if content.is_empty() => return Err(self.error("content field is empty")),
            Resolved::Pattern(_) => return Err(self.error("You must enter a comma separated list")),
            Resolved::Text(text) => text,
        };
        let terms = Self::terms(&text);

        let args = ctx.args(&self.decl);
        let verbose = args.is_true("verbose", item)?;
        let stem = paths::stem(&item.filepath);

        let name_match = if args.is_true("strict", item)? {
            let raw = ctx.raw_content(&self.decl, item)?.to_string();
            raw.split(',').any(|term| term == stem)
        } else {
            let mut found = false;
            for term in &terms {
                if glob_match(term, &stem)? {
                    found = true;
                    break;
                }
            }
            found
        };
        if name_match {
            if verbose {
                ctx.progress(&format!("{} {}", style("Keywords: name matches").yellow(), stem));
            }
            return Ok(true);
        }

        let limits = ReadLimits::from_args(&args, item)?;
        let content = cached_content(item, limits, ctx.services.fs.as_ref())?;
        for (term, pattern) in self.patterns(&text)? {
            if let Some(found) = pattern.search(&content) {
                if verbose {
                    ctx.progress(&format!(
                        "{} {}  {}",
                        style("Keywords:").yellow(),
                        style(&term).cyan(),
                        style(item.path_str()).green()
                    ));
                }
                merge_match(item, &found);
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::filecontent::CACHE_KEY;
    use crate::rules::testing::{check, item, rule};
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_name_match_skips_reading() {
        // Binary extension: reading would fail, so a pass proves the short-circuit.
        let rule = Keywords::new(rule("keywords", "invoice, receipt"));
        let mut it = item("/nowhere/invoice.zip");
        assert!(check(&rule, &mut it).unwrap());
        assert!(it.get(CACHE_KEY).is_none());
    }

    #[test]
    fn test_content_search_is_case_insensitive() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scan.txt");
        fs::write(&path, "Total due: 40\nINVOICE 2021\n").unwrap();

        let rule = Keywords::new(rule("keywords", "receipt, invoice"));
        let mut it = item(&path);
        assert!(check(&rule, &mut it).unwrap());
        assert_eq!(it.data["match"], Value::from("INVOICE"));
    }

    #[test]
    fn test_terms_with_regex_syntax_are_escaped_when_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "costs (net\n").unwrap();

        let rule = Keywords::new(rule("keywords", "(net"));
        assert!(check(&rule, &mut item(&path)).unwrap());
    }

    #[test]
    fn test_terms_compile_once_per_content() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("one.txt");
        let second = temp_dir.path().join("two.txt");
        fs::write(&first, "nothing\n").unwrap();
        fs::write(&second, "an Invoice\n").unwrap();

        let rule = Keywords::new(rule("keywords", "receipt, invoice"));
        assert!(!check(&rule, &mut item(&first)).unwrap());
        let cached = rule.compiled.borrow().as_ref().map(|(source, p)| (source.clone(), p.len()));
        assert_eq!(cached, Some(("receipt, invoice".to_string(), 2)));
        assert!(check(&rule, &mut item(&second)).unwrap());
    }

    #[test]
    fn test_no_match() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "nothing here\n").unwrap();

        let rule = Keywords::new(rule("keywords", "invoice"));
        assert!(!check(&rule, &mut item(&path)).unwrap());
    }

    #[test]
    fn test_regex_content_is_rejected() {
        let rule = Keywords::new(rule("keywords", "/invoice/"));
        let err = check(&rule, &mut item("/in/a.txt")).unwrap_err();
        assert_eq!(err.to_string(), "keywords: You must enter a comma separated list");
    }
}
