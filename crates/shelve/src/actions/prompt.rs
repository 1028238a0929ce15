use super::{for_each_live, report, Action, ActionContext};
use crate::command::CommandDecl;
use crate::error::Result;
use crate::pipe::{Pipe, PipeItem};
use serde_json::Value;

/// Asks the user something and stores the answer under `prompt`.
///
/// With the `all` operator the question is asked once and the answer goes to
/// every live item; otherwise it is asked per item.
pub struct Prompt {
    decl: CommandDecl,
}

impl Prompt {
    pub fn new(decl: CommandDecl) -> Self {
        Self { decl }
    }

    fn ask(&self, item: &PipeItem, ctx: &ActionContext) -> Result<String> {
        if self.decl.content.is_empty() {
            return Err(self.error("content field is empty"));
        }
        let message = self.text_content(item, ctx)?;
        let args = ctx.args(&self.decl);
        let interaction = &ctx.services.interaction;

        let choices: Vec<String> = args
            .text("choices", item)?
            .map(|text| {
                text.split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let default = args.text("default", item)?;

        if choices.is_empty() {
            return interaction.input(&message, default.as_deref());
        }
        let preselected = default
            .and_then(|d| choices.iter().position(|c| *c == d))
            .unwrap_or(0);
        let index = interaction.select(&message, &choices, preselected)?;
        Ok(choices.get(index).cloned().unwrap_or_default())
    }
}

impl Action for Prompt {
    fn decl(&self) -> &CommandDecl {
        &self.decl
    }

    fn eval_item(&self, item: &mut PipeItem, ctx: &ActionContext) -> Result<()> {
        let answer = self.ask(item, ctx)?;
        item.set("prompt", Value::String(answer));
        Ok(())
    }

    fn eval(&self, pipe: &mut Pipe, ctx: &ActionContext) {
        if !self.decl.has_operator("all") {
            for_each_live(self, pipe, ctx);
            return;
        }

        match self.ask(&PipeItem::detached(), ctx) {
            Ok(answer) => {
                for id in pipe.live_ids() {
                    if let Some(item) = pipe.get_mut(id) {
                        item.set("prompt", Value::String(answer.clone()));
                    }
                }
            }
            Err(e) => report(pipe, ctx, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{action, pipe_of, run};
    use crate::services::{ScriptedInteraction, Services};
    use std::path::PathBuf;
    use std::rc::Rc;

    fn files() -> Vec<PathBuf> {
        vec![PathBuf::from("/in/a.txt"), PathBuf::from("/in/b.txt")]
    }

    #[test]
    fn test_per_item_input() {
        let interaction = Rc::new(ScriptedInteraction::new(["first", "second"]));
        let services = Services::headless().with_interaction(interaction.clone());
        let mut pipe = pipe_of(&files());

        run(&Prompt::new(action("prompt", "Name for {filename}?")), &mut pipe, &services, false);

        assert_eq!(interaction.asked(), vec!["Name for a.txt?", "Name for b.txt?"]);
        let answers: Vec<_> = pipe.items().map(|i| i.data["prompt"].clone()).collect();
        assert_eq!(answers, vec![Value::from("first"), Value::from("second")]);
    }

    #[test]
    fn test_all_operator_asks_once() {
        let interaction = Rc::new(ScriptedInteraction::new(["taxes"]));
        let services = Services::headless().with_interaction(interaction.clone());
        let mut pipe = pipe_of(&files());

        let decl = action("prompt", "Which folder?")
            .with_operator(["all"])
            .with_argument("choices", "taxes, bills")
            .unwrap();
        run(&Prompt::new(decl), &mut pipe, &services, false);

        assert_eq!(interaction.asked().len(), 1);
        assert!(pipe.items().all(|i| i.data["prompt"] == Value::from("taxes")));
    }

    #[test]
    fn test_default_answer_without_interaction() {
        let services = Services::headless();
        let mut pipe = pipe_of(&files()[..1]);

        let decl = action("prompt", "Folder?").with_argument("default", "misc").unwrap();
        run(&Prompt::new(decl), &mut pipe, &services, false);

        assert_eq!(pipe.items().next().unwrap().data["prompt"], Value::from("misc"));
    }
}
