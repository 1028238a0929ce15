use super::{Rule, RuleContext};
use crate::command::CommandDecl;
use crate::error::{Result, ShelveError};
use crate::expr::{truthy, Expression, Segment};
use crate::pipe::PipeItem;

/// Evaluates its content as one boolean expression.
///
/// The content is taken as expression source, so `extension == 'pdf'` and
/// `{extension} == 'pdf'` mean the same thing.
pub struct IfExpression {
    decl: CommandDecl,
    expression: Option<Expression>,
}

impl IfExpression {
    pub fn new(decl: CommandDecl) -> Result<Self> {
        let source: String = decl
            .content
            .segments()
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.clone(),
                Segment::Expr(expr) => format!("({})", expr.content()),
            })
            .collect();

        let expression = if source.trim().is_empty() {
            None
        } else {
            let ignore = decl.content.segments().iter().any(
                |s| matches!(s, Segment::Expr(e) if e.ignores_exceptions()),
            );
            let expression = Expression::new(&source).map_err(|e| {
                ShelveError::syntax(format!("if: {}", e), decl.to_string())
            })?;
            Some(expression.ignoring_exceptions(ignore))
        };

        Ok(Self { decl, expression })
    }
}

impl Rule for IfExpression {
    fn decl(&self) -> &CommandDecl {
        &self.decl
    }

    fn matches(&self, item: &mut PipeItem, ctx: &RuleContext) -> Result<bool> {
        let expression = self
            .expression
            .as_ref()
            .ok_or_else(|| self.error("content field is empty"))?;
        let value = expression.eval(item, ctx.services.fs.as_ref())?;
        Ok(truthy(&value))
    }
}
