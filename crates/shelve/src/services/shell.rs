use crate::error::{Result, ShelveError};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[derive(Debug, Clone, PartialEq)]
pub struct ShellOutput {
    pub stdout: String,
    pub success: bool,
}

pub trait Shell {
    fn run(&self, command: &str, cwd: &Path) -> Result<ShellOutput>;
}

/// Splits the command line shell-style and runs it without a shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl Shell for SystemShell {
    fn run(&self, command: &str, cwd: &Path) -> Result<ShellOutput> {
        let words = shlex::split(command).ok_or_else(|| ShelveError::ExternalTool {
            tool: "terminal".to_string(),
            message: format!("Cannot split command line: {}", command),
        })?;

        let (program, args) = words.split_first().ok_or_else(|| ShelveError::ExternalTool {
            tool: "terminal".to_string(),
            message: "Empty command".to_string(),
        })?;

        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(cwd);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        log::info!("Executing: {:?}", cmd);

        let output = cmd.output().map_err(|e| ShelveError::ExternalTool {
            tool: program.clone(),
            message: format!("Failed to execute {}: {}", program, e),
        })?;

        if !output.status.success() {
            log::error!(
                "{} failed with exit code {}: {}",
                program,
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr)
            );
        }

        Ok(ShellOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            success: output.status.success(),
        })
    }
}

/// Records commands instead of running them and answers with a canned output.
#[derive(Default)]
pub struct RecordingShell {
    pub stdout: String,
    calls: RefCell<Vec<(String, PathBuf)>>,
}

impl RecordingShell {
    pub fn answering(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.borrow().clone()
    }
}

impl Shell for RecordingShell {
    fn run(&self, command: &str, cwd: &Path) -> Result<ShellOutput> {
        self.calls
            .borrow_mut()
            .push((command.to_string(), cwd.to_path_buf()));
        Ok(ShellOutput {
            stdout: self.stdout.clone(),
            success: true,
        })
    }
}
