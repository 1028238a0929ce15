use crate::error::ShelveError;
use console::{style, Term};
use std::cell::RefCell;

/// Sink for progress lines and reported (non-fatal) errors.
pub trait Reporter {
    fn progress(&self, line: &str);
    fn error(&self, err: &ShelveError);
}

/// Writes progress to stdout and errors to stderr.
pub struct ConsoleReporter {
    out: Term,
    err: Term,
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            quiet,
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Reporter for ConsoleReporter {
    fn progress(&self, line: &str) {
        if self.quiet {
            return;
        }
        if let Err(e) = self.out.write_line(line) {
            log::warn!("Failed to write progress: {}", e);
        }
    }

    fn error(&self, err: &ShelveError) {
        log::debug!("reported: {:?}", err);
        if let Err(e) = self.err.write_line(&style(err.to_string()).red().to_string()) {
            log::warn!("Failed to write error: {}", e);
        }
    }
}

/// Keeps everything in memory; used by tests and headless callers.
#[derive(Default)]
pub struct CaptureReporter {
    lines: RefCell<Vec<String>>,
    errors: RefCell<Vec<String>>,
}

impl CaptureReporter {
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }
}

impl Reporter for CaptureReporter {
    fn progress(&self, line: &str) {
        self.lines.borrow_mut().push(console::strip_ansi_codes(line).to_string());
    }

    fn error(&self, err: &ShelveError) {
        self.errors.borrow_mut().push(err.to_string());
    }
}
