//! Collaborators the engine talks to instead of touching the outside world
//! directly, bundled into [`Services`].

pub mod fs;
pub mod interact;
pub mod report;
pub mod shell;
pub mod similarity;

pub use fs::{FileSystem, LocalFileSystem};
pub use interact::{Interaction, NonInteractive, ScriptedInteraction, TerminalInteraction};
pub use report::{CaptureReporter, ConsoleReporter, Reporter};
pub use shell::{RecordingShell, Shell, ShellOutput, SystemShell};
pub use similarity::{FixedSimilarity, ImageSimilarity, SimilarityScorer};

use crate::history::FileHistory;
use crate::util::format;
use chrono::NaiveDateTime;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set from a signal handler; polled between commands and between items.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Services {
    pub fs: Rc<dyn FileSystem>,
    pub interaction: Rc<dyn Interaction>,
    pub shell: Rc<dyn Shell>,
    pub similarity: Rc<dyn SimilarityScorer>,
    pub reporter: Rc<dyn Reporter>,
    pub cancel: CancelFlag,
    /// Shared by every record written during this run.
    pub run_at: NaiveDateTime,
    pub file_history: RefCell<FileHistory>,
}

impl Services {
    /// Real collaborators with terminal prompts and console output.
    pub fn system(quiet: bool) -> Self {
        Self {
            fs: Rc::new(LocalFileSystem::new()),
            interaction: Rc::new(TerminalInteraction::new()),
            shell: Rc::new(SystemShell),
            similarity: Rc::new(ImageSimilarity),
            reporter: Rc::new(ConsoleReporter::new(quiet)),
            cancel: CancelFlag::new(),
            run_at: format::now(),
            file_history: RefCell::new(FileHistory::default()),
        }
    }

    /// Local filesystem, no prompts, output captured in memory.
    pub fn headless() -> Self {
        Self {
            interaction: Rc::new(NonInteractive),
            reporter: Rc::new(CaptureReporter::default()),
            ..Self::system(true)
        }
    }

    pub fn with_fs(mut self, fs: Rc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_interaction(mut self, interaction: Rc<dyn Interaction>) -> Self {
        self.interaction = interaction;
        self
    }

    pub fn with_shell(mut self, shell: Rc<dyn Shell>) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_similarity(mut self, similarity: Rc<dyn SimilarityScorer>) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn with_reporter(mut self, reporter: Rc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Starts a new run: fresh timestamp, cleared cancellation.
    pub fn begin_run(&mut self) {
        self.run_at = format::now();
        self.cancel.reset();
    }

    pub fn record_file(&self, input: &std::path::Path, output: &std::path::Path) {
        self.file_history
            .borrow_mut()
            .push(self.run_at, input.to_path_buf(), output.to_path_buf());
    }
}
