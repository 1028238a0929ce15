use super::{Rule, RuleContext};
use crate::command::CommandDecl;
use crate::error::Result;
use crate::expr::Resolved;
use crate::pipe::PipeItem;
use crate::util::paths::expand_home;
use console::style;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

/// Passes files that look like `base_file`, scored by the similarity
/// collaborator against a percentage threshold.
pub struct TemplateSimilarity {
    decl: CommandDecl,
    scores: RefCell<HashMap<(PathBuf, PathBuf), f64>>,
}

impl TemplateSimilarity {
    pub fn new(decl: CommandDecl) -> Self {
        Self {
            decl,
            scores: RefCell::new(HashMap::new()),
        }
    }

    fn threshold(&self, item: &PipeItem, ctx: &RuleContext) -> Result<f64> {
        let text = ctx
            .args(&self.decl)
            .text("score", item)?
            .ok_or_else(|| self.error("argument \"score\" is required"))?;
        let score: f64 = text
            .trim_end_matches('%')
            .parse()
            .map_err(|_| self.error(&format!("score must be a number, got \"{}\"", text)))?;
        if !(0.0..=100.0).contains(&score) {
            return Err(self.error("score must be between 0 and 100"));
        }
        Ok(score)
    }

    fn base_file(&self, item: &PipeItem, ctx: &RuleContext) -> Result<PathBuf> {
        match ctx.args(&self.decl).resolve("base_file", item)? {
            Some(Resolved::Pattern(_)) => Err(self.error("base_file cannot be a regexp")),
            Some(Resolved::Text(text)) if !text.trim().is_empty() => {
                Ok(expand_home(text.trim()))
            }
            _ => Err(self.error("argument \"base_file\" is required")),
        }
    }
}

impl Rule for TemplateSimilarity {
    fn decl(&self) -> &CommandDecl {
        &self.decl
    }

    fn matches(&self, item: &mut PipeItem, ctx: &RuleContext) -> Result<bool> {
        if !self.decl.content.is_empty() {
            return Err(self.error("this rule only accepts arguments as input"));
        }
        let base = self.base_file(item, ctx)?;
        let threshold = self.threshold(item, ctx)?;
        if !ctx.services.fs.is_file(&base) {
            return Err(self.error(&format!("base file \"{}\" does not exist", base.display())));
        }

        let key = (base.clone(), item.filepath.clone());
        let cached = self.scores.borrow().get(&key).copied();
        let score = match cached {
            Some(score) => score,
            None => {
                let score = ctx.services.similarity.score(&base, &item.filepath)?;
                self.scores.borrow_mut().insert(key, score);
                score
            }
        };

        let percent = score * 100.0;
        let passed = percent >= threshold;
        if ctx.args(&self.decl).is_true("verbose", item)? {
            let status = if passed {
                style(item.path_str()).green()
            } else {
                style(item.path_str()).red()
            };
            ctx.progress(&format!(
                "{} {:.1}% (need {}%)  {}",
                style("Template:").yellow(),
                percent,
                threshold,
                status
            ));
        }

        item.set("template_score", Value::from(percent));
        Ok(passed)
    }
}
