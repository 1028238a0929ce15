#![allow(dead_code)]

use shelve_lib::services::{CaptureReporter, LocalFileSystem};
use shelve_lib::{CommandDecl, Pipe, Services};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

/// A scratch root directory plus a capturing reporter.
pub struct Fixture {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub reporter: Rc<CaptureReporter>,
}

impl Fixture {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("inbox");
        fs::create_dir(&root).unwrap();
        for (name, text) in files {
            fs::write(root.join(name), text).unwrap();
        }
        Self {
            temp_dir,
            root,
            reporter: Rc::new(CaptureReporter::default()),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Sibling of the root, outside what blocks scan.
    pub fn outside(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    pub fn services(&self) -> Services {
        Services::headless()
            .with_fs(Rc::new(LocalFileSystem::with_trash_dir(self.outside("trash"))))
            .with_reporter(self.reporter.clone())
    }
}

pub fn command(name: &str, content: &str) -> CommandDecl {
    CommandDecl::new(name).with_template(content).unwrap()
}

pub fn command_with(name: &str, operator: &[&str], content: &str) -> CommandDecl {
    command(name, content).with_operator(operator.iter().copied())
}

/// File names of every item in the pipe, sorted.
pub fn names(pipe: &Pipe) -> Vec<String> {
    let mut names: Vec<String> = pipe.items().map(|item| file_name(&item.filepath)).collect();
    names.sort();
    names
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
