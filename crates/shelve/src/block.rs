//! A named root directory and the ordered rules and actions run against it.

use crate::actions::{self, Action, ActionContext};
use crate::command::{
    ArgumentDefaults, CommandDecl, CommandKind, ACTION_OPERATORS, RULE_OPERATORS,
};
use crate::error::{Result, ShelveError};
use crate::history::History;
use crate::pipe::Pipe;
use crate::rules::{self, Rule, RuleContext};
use crate::services::Services;
use std::fmt;
use std::path::{Path, PathBuf};

pub enum Command {
    Rule(Box<dyn Rule>),
    Action(Box<dyn Action>),
}

impl Command {
    pub fn decl(&self) -> &CommandDecl {
        match self {
            Command::Rule(rule) => rule.decl(),
            Command::Action(action) => action.decl(),
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Rule(_) => CommandKind::Rule,
            Command::Action(_) => CommandKind::Action,
        }
    }

    /// Whether `set_defaults` content `target` names this command.
    fn answers_to(&self, target: &str) -> bool {
        let name = &self.decl().name;
        match self {
            Command::Rule(_) => name == target || rules::canonical(name) == rules::canonical(target),
            Command::Action(_) => name == target,
        }
    }
}

pub struct Block {
    pub name: String,
    pub root: PathBuf,
    /// Actions perform no side effects.
    pub simulate: bool,
    /// Item-scoped errors are not reported.
    pub ignore_all_exceptions: bool,
    commands: Vec<Command>,
    /// Run-time argument defaults, one map per command.
    defaults: Vec<ArgumentDefaults>,
    pub history: History,
}

impl Block {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            simulate: false,
            ignore_all_exceptions: false,
            commands: Vec::new(),
            defaults: Vec::new(),
            history: History::new(),
        }
    }

    /// Block names are letters and spaces.
    pub fn validate_name(name: &str) -> Result<()> {
        let valid = !name.trim().is_empty()
            && name.chars().all(|c| c.is_alphabetic() || c == ' ');
        if valid {
            Ok(())
        } else {
            Err(ShelveError::syntax(
                format!("Invalid block name \"{}\": use letters and spaces only", name),
                format!("[[{}]]", name),
            ))
        }
    }

    pub fn push_rule(&mut self, decl: CommandDecl) -> Result<()> {
        decl.validate_operators(CommandKind::Rule, &RULE_OPERATORS)?;
        decl.precompile()?;
        let rule = rules::build(decl)?;
        self.push(Command::Rule(rule));
        Ok(())
    }

    pub fn push_action(&mut self, decl: CommandDecl) -> Result<()> {
        decl.validate_operators(CommandKind::Action, &ACTION_OPERATORS)?;
        if !decl.flags.is_empty() {
            return Err(ShelveError::syntax(
                format!("Action {} does not accept flags", decl.name),
                decl.to_string(),
            ));
        }
        decl.precompile()?;
        let action = actions::build(decl)?;
        self.push(Command::Action(action));
        Ok(())
    }

    fn push(&mut self, command: Command) {
        self.commands.push(command);
        self.defaults.push(ArgumentDefaults::new());
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn defaults(&self, position: usize) -> Option<&ArgumentDefaults> {
        self.defaults.get(position)
    }

    /// Seeds a pipe with the regular files directly under the root.
    pub fn seed(&self, services: &Services) -> Pipe {
        let paths = match services.fs.list_files(&self.root) {
            Ok(paths) => paths,
            Err(e) => {
                log::warn!("Cannot list {}: {}", self.root.display(), e);
                services.reporter.error(&e);
                Vec::new()
            }
        };
        Pipe::new(paths, &self.root)
    }

    /// Runs every command in order and returns the pipe as the last command
    /// left it. Scans the root when no pipe is given.
    pub fn eval(&mut self, services: &Services, pipe: Option<Pipe>) -> Pipe {
        let mut pipe = pipe.unwrap_or_else(|| self.seed(services));
        pipe.ignore_all_exceptions = self.ignore_all_exceptions;
        log::info!("Evaluating block [{}] over {} files", self.name, pipe.len());

        let mut seen_rule = false;
        for position in 0..self.commands.len() {
            if services.cancel.is_cancelled() {
                log::info!("Block [{}] interrupted before command {}", self.name, position);
                break;
            }
            match self.commands[position].kind() {
                CommandKind::Rule => {
                    if seen_rule {
                        pipe.mode = self.commands[position].decl().mode();
                    } else {
                        pipe.begin_union();
                        seen_rule = true;
                    }
                    self.apply_rule(position, &mut pipe, services);
                }
                CommandKind::Action => self.apply_action(position, &mut pipe, services),
            }
        }

        log::info!("Block [{}] finished with {} items", self.name, pipe.len());
        pipe
    }

    fn apply_rule(&mut self, position: usize, pipe: &mut Pipe, services: &Services) {
        let Command::Rule(rule) = &self.commands[position] else {
            return;
        };
        let decl = rule.decl();
        let history = &mut self.history;
        let ctx = RuleContext::new(services, &self.defaults[position]);
        let reporter = services.reporter.as_ref();

        log::debug!("rule {} in {} mode", decl, pipe.mode.as_str());
        pipe.commands.push(decl.name.clone());
        history.touch(position, CommandKind::Rule, decl);

        let added = pipe.add(|root| rule.discover(root, &ctx), reporter);
        for id in added {
            if let Some(item) = pipe.get(id) {
                history.record(position, CommandKind::Rule, decl, item);
            }
        }

        pipe.filter(
            |item| {
                let mut matched = rule.matches(item, &ctx)?;
                if matched {
                    history.record(position, CommandKind::Rule, decl, item);
                }
                if decl.negated() {
                    matched = !matched;
                }
                if matched {
                    item.add_flags(&decl.flags);
                }
                Ok(matched)
            },
            reporter,
        );
    }

    fn apply_action(&mut self, position: usize, pipe: &mut Pipe, services: &Services) {
        let Command::Action(action) = &self.commands[position] else {
            return;
        };
        let decl = action.decl();
        log::debug!("action {} over {} live items", decl, pipe.live_ids().len());
        pipe.commands.push(decl.name.clone());

        let ctx = ActionContext::new(services, &self.defaults[position], self.simulate);
        action.eval(pipe, &ctx);
        let pending = ctx.take_pending_defaults();

        self.history.touch(position, CommandKind::Action, decl);
        for item in pipe.items() {
            self.history.record(position, CommandKind::Action, decl, item);
        }
        if decl.has_operator("reset") {
            pipe.clear();
        }

        for (target, values) in pending {
            self.apply_defaults(position, &target, values);
        }
    }

    /// Stores `values` as defaults of every command after `position` that
    /// answers to `target`.
    fn apply_defaults(&mut self, position: usize, target: &str, values: ArgumentDefaults) {
        for later in position + 1..self.commands.len() {
            if self.commands[later].answers_to(target) {
                log::debug!("defaults for {} at {}: {:?}", target, later, values.keys());
                self.defaults[later].extend(values.clone());
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Block (root: {}) [[{}]]", self.root.display(), self.name)?;
        for command in &self.commands {
            writeln!(f, "    {} {}", command.kind().as_str(), command.decl())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Resolved;
    use crate::services::CaptureReporter;
    use std::fs;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn dir_with(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for (name, text) in files {
            fs::write(temp_dir.path().join(name), text).unwrap();
        }
        temp_dir
    }

    fn rule(name: &str, operator: &[&str], content: &str) -> CommandDecl {
        CommandDecl::new(name)
            .with_operator(operator.iter().copied())
            .with_template(content)
            .unwrap()
    }

    fn names(pipe: &Pipe) -> Vec<String> {
        pipe.items()
            .map(|i| i.filepath.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_first_rule_builds_from_empty() {
        let temp_dir = dir_with(&[("alan.txt", ""), ("bob.txt", ""), ("carl.md", "")]);
        let mut block = Block::new("Texts", temp_dir.path());
        block.push_rule(rule("extension", &["and"], "txt")).unwrap();

        let pipe = block.eval(&Services::headless(), None);
        assert_eq!(names(&pipe), vec!["alan.txt", "bob.txt"]);
    }

    #[test]
    fn test_or_then_and() {
        let temp_dir = dir_with(&[("alan.txt", ""), ("bob.md", ""), ("carl.pdf", "")]);
        let mut block = Block::new("Mixed", temp_dir.path());
        block.push_rule(rule("extension", &[], "txt")).unwrap();
        block.push_rule(rule("extension", &["or"], "md")).unwrap();
        block.push_rule(rule("basename", &["and"], "b*")).unwrap();

        let pipe = block.eval(&Services::headless(), None);
        assert_eq!(names(&pipe), vec!["bob.md"]);
    }

    #[test]
    fn test_not_and_reset() {
        let temp_dir = dir_with(&[("alan.txt", ""), ("bob.txt", ""), ("carl.md", "")]);
        let mut block = Block::new("Negated", temp_dir.path());
        block.push_rule(rule("extension", &[], "txt")).unwrap();
        block.push_rule(rule("basename", &["not", "and"], "alan")).unwrap();
        let pipe = block.eval(&Services::headless(), None);
        assert_eq!(names(&pipe), vec!["bob.txt"]);

        let mut block = Block::new("Reset", temp_dir.path());
        block.push_rule(rule("extension", &[], "txt")).unwrap();
        block.push_rule(rule("extension", &["reset"], "md")).unwrap();
        let pipe = block.eval(&Services::headless(), None);
        assert_eq!(names(&pipe), vec!["carl.md"]);
    }

    #[test]
    fn test_flags_and_history() {
        let temp_dir = dir_with(&[("alan.txt", ""), ("bob.md", "")]);
        let mut block = Block::new("Flags", temp_dir.path());
        block
            .push_rule(rule("extension", &[], "txt").with_flags(["text"]))
            .unwrap();
        block.push_action(CommandDecl::new("echo")).unwrap();

        let pipe = block.eval(&Services::headless(), None);
        let item = pipe.items().next().unwrap();
        assert_eq!(item.flags, vec!["text".to_string()]);
        assert_eq!(block.history.get(0).unwrap().items.len(), 1);
        assert_eq!(block.history.get(1).unwrap().items.len(), 1);

        block.eval(&Services::headless(), None);
        assert_eq!(block.history.entries().len(), 2);
        assert_eq!(block.history.get(0).unwrap().items.len(), 2);
    }

    #[test]
    fn test_reset_action_empties_pipe() {
        let temp_dir = dir_with(&[("alan.txt", "")]);
        let reporter = Rc::new(CaptureReporter::default());
        let services = Services::headless().with_reporter(reporter.clone());
        let mut block = Block::new("Reset", temp_dir.path());
        block.push_rule(rule("extension", &[], "txt")).unwrap();
        block
            .push_action(CommandDecl::new("echo").with_operator(["reset"]))
            .unwrap();
        block.push_action(CommandDecl::new("echo")).unwrap();

        let pipe = block.eval(&services, None);
        assert!(pipe.is_empty());
        assert_eq!(reporter.lines().len(), 1);
    }

    #[test]
    fn test_set_defaults_reaches_later_commands_only() {
        let temp_dir = dir_with(&[("alan.txt", "")]);
        let mut block = Block::new("Defaults", temp_dir.path());
        block.push_rule(rule("extension", &[], "txt")).unwrap();
        block.push_action(rule("move", &[], "early")).unwrap();
        block
            .push_action(
                rule("set_defaults", &[], "move")
                    .with_argument("makedirs", "true")
                    .unwrap(),
            )
            .unwrap();
        block.push_action(rule("move", &[], "late")).unwrap();

        block.eval(&Services::headless(), None);

        assert!(block.defaults(1).unwrap().is_empty());
        assert_eq!(
            block.defaults(3).unwrap().get("makedirs"),
            Some(&Resolved::Text("true".to_string()))
        );
        assert!(temp_dir.path().join("late/alan.txt").is_file());
        assert!(!temp_dir.path().join("early").exists());
    }

    #[test]
    fn test_load_time_validation() {
        let mut block = Block::new("Checks", "/tmp");
        assert!(block.push_rule(rule("basename", &["xor"], "a")).is_err());
        assert!(block.push_rule(rule("colour", &[], "red")).is_err());
        assert!(block.push_rule(rule("basename", &[], "/a/q")).is_err());
        assert!(block
            .push_action(CommandDecl::new("echo").with_flags(["x"]))
            .is_err());
        assert!(block.push_action(CommandDecl::new("echo").with_operator(["all"])).is_ok());
        assert!(Block::validate_name("Tax papers").is_ok());
        assert!(Block::validate_name("tax_2024").is_err());
    }

    #[test]
    fn test_missing_root_is_reported() {
        let reporter = Rc::new(CaptureReporter::default());
        let services = Services::headless().with_reporter(reporter.clone());
        let mut block = Block::new("Missing", "/definitely/not/here");
        block.push_rule(rule("extension", &[], "txt")).unwrap();

        let pipe = block.eval(&services, None);
        assert!(pipe.is_empty());
        assert_eq!(reporter.errors().len(), 1);
    }
}
