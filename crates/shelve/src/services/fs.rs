use crate::error::{Result, ShelveError};
use crate::util::paths::numbered_destination;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Filesystem operations the engine relies on.
pub trait FileSystem {
    /// Regular files directly under `root`, sorted by name.
    fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>>;
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn is_link(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    /// Moves `from` to the exact path `to`, replacing an existing file.
    fn move_file(&self, from: &Path, to: &Path) -> Result<()>;
    /// Copies `from` to the exact path `to`, replacing an existing file.
    fn copy_file(&self, from: &Path, to: &Path) -> Result<()>;
    /// Sends a file somewhere it can be recovered from.
    fn trash(&self, path: &Path) -> Result<()>;
    /// Up to `max_lines` lines from the start of a text file, line endings kept.
    fn read_lines(&self, path: &Path, max_lines: usize) -> Result<Vec<String>>;
}

/// [`FileSystem`] backed by the local disk.
///
/// Trashed files go to the OS trash unless a trash directory is configured.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem {
    trash_dir: Option<PathBuf>,
}

impl LocalFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trash_dir<P: Into<PathBuf>>(trash_dir: P) -> Self {
        Self {
            trash_dir: Some(trash_dir.into()),
        }
    }
}

impl FileSystem for LocalFileSystem {
    fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(ShelveError::Config(format!(
                "Root directory does not exist: {}",
                root.display()
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
            match entry {
                Ok(entry) => {
                    if entry.path().is_file() {
                        files.push(entry.path().to_path_buf());
                    }
                }
                Err(e) => {
                    log::warn!("Walk error: {}", e);
                }
            }
        }
        Ok(files)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_link(&self, path: &Path) -> bool {
        path.is_symlink()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if is_cross_device(&e) => {
                fs::copy(from, to)?;
                fs::remove_file(from)?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        fs::copy(from, to)?;
        Ok(())
    }

    fn trash(&self, path: &Path) -> Result<()> {
        match &self.trash_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                let name = path
                    .file_name()
                    .ok_or_else(|| ShelveError::Config(format!("Not a file: {}", path.display())))?;
                let target = numbered_destination(dir, &name.to_string_lossy(), |p| p.exists());
                self.move_file(path, &target)
            }
            None => trash::delete(path).map_err(|e| ShelveError::ExternalTool {
                tool: "trash".to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn read_lines(&self, path: &Path, max_lines: usize) -> Result<Vec<String>> {
        let mut reader = BufReader::new(fs::File::open(path)?);
        let mut lines = Vec::new();
        let mut buf = Vec::new();
        while lines.len() < max_lines {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            lines.push(String::from_utf8_lossy(&buf).to_string());
        }
        Ok(lines)
    }
}

// EXDEV
fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(18)
}
