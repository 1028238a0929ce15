//! What each command touched during a block evaluation, and the persisted
//! record of files moved or copied across runs.

use crate::command::{CommandDecl, CommandKind};
use crate::error::{Result, ShelveError};
use crate::pipe::PipeItem;
use crate::services::{FileSystem, Reporter};
use crate::util::format::{format_timestamp, parse_timestamp};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// One command and every item it touched, as the items looked at the time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    /// Position of the command in its block.
    pub position: usize,
    pub kind: &'static str,
    pub name: String,
    pub operator: Vec<String>,
    pub content: String,
    pub arguments: String,
    pub flags: Vec<String>,
    pub items: Vec<PipeItem>,
}

impl HistoryEntry {
    fn new(position: usize, kind: CommandKind, decl: &CommandDecl) -> Self {
        Self {
            position,
            kind: kind.as_str(),
            name: decl.name.clone(),
            operator: decl.operator.clone(),
            content: decl.content.to_string(),
            arguments: decl.arguments_summary(),
            flags: decl.flags.clone(),
            items: Vec::new(),
        }
    }
}

/// Append-only log of one block, one entry per command.
///
/// Entries are keyed by command position, so evaluating the same block again
/// keeps adding to the same entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_mut(&mut self, position: usize, kind: CommandKind, decl: &CommandDecl) -> &mut HistoryEntry {
        let index = match self.entries.iter().position(|e| e.position == position) {
            Some(index) => index,
            None => {
                self.entries.push(HistoryEntry::new(position, kind, decl));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index]
    }

    /// Makes sure the command has an entry even when it touched nothing.
    pub fn touch(&mut self, position: usize, kind: CommandKind, decl: &CommandDecl) {
        self.entry_mut(position, kind, decl);
    }

    /// Stores a snapshot of `item` under the command at `position`.
    pub fn record(&mut self, position: usize, kind: CommandKind, decl: &CommandDecl, item: &PipeItem) {
        self.entry_mut(position, kind, decl).items.push(item.clone());
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, position: usize) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.position == position)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Display for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            write!(f, "{} {}", entry.kind, entry.name)?;
            if !entry.operator.is_empty() {
                write!(f, " [{}]", entry.operator.join(" "))?;
            }
            if !entry.content.is_empty() {
                write!(f, ": {}", entry.content)?;
            }
            writeln!(f)?;
            for item in &entry.items {
                writeln!(f, "  {}", item.filepath.display())?;
            }
        }
        Ok(())
    }
}

/// One `[timestamp] input -> output` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub timestamp: NaiveDateTime,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl HistoryRecord {
    pub fn new(timestamp: NaiveDateTime, input: PathBuf, output: PathBuf) -> Self {
        Self {
            timestamp,
            input,
            output,
        }
    }

    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let rest = line.strip_prefix('[')?;
        let (stamp, rest) = rest.split_once("] ")?;
        // Inputs may contain an arrow; outputs are written by us and never do.
        let (input, output) = rest.rsplit_once(" -> ")?;
        Some(Self {
            timestamp: parse_timestamp(stamp)?,
            input: PathBuf::from(input),
            output: PathBuf::from(output),
        })
    }

    /// Where the file sits now: `output` itself, or the input's name inside
    /// `output` when that is a directory.
    pub fn resolved_output(&self, fs: &dyn FileSystem) -> PathBuf {
        if fs.is_dir(&self.output) {
            if let Some(name) = self.input.file_name() {
                return self.output.join(name);
            }
        }
        self.output.clone()
    }
}

impl fmt::Display for HistoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} -> {}",
            format_timestamp(&self.timestamp),
            self.input.display(),
            self.output.display()
        )
    }
}

/// The persisted move/copy log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileHistory {
    records: Vec<HistoryRecord>,
}

impl FileHistory {
    /// Parses history text. Lines that do not parse are skipped.
    pub fn parse(text: &str) -> Self {
        let records = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let record = HistoryRecord::parse_line(line);
                if record.is_none() {
                    log::debug!("Skipping history line: {}", line);
                }
                record
            })
            .collect();
        Self { records }
    }

    pub fn serialize(&self) -> String {
        self.records.iter().map(|r| format!("{}\n", r)).collect()
    }

    /// Reads `path`; a missing file is an empty history.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        fs::write(path, self.serialize())?;
        Ok(())
    }

    /// Appends these records to the file at `path`.
    pub fn append_to(&self, path: &Path) -> Result<()> {
        if self.records.is_empty() {
            return Ok(());
        }
        ensure_parent(path)?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(self.serialize().as_bytes())?;
        Ok(())
    }

    pub fn push(&mut self, timestamp: NaiveDateTime, input: PathBuf, output: PathBuf) {
        self.records.push(HistoryRecord::new(timestamp, input, output));
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Removes and returns every record.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Records of the most recent run: the trailing records sharing the last
    /// timestamp.
    pub fn last_batch(&self) -> &[HistoryRecord] {
        let Some(last) = self.records.last() else {
            return &[];
        };
        let start = self
            .records
            .iter()
            .rposition(|r| r.timestamp != last.timestamp)
            .map(|i| i + 1)
            .unwrap_or(0);
        &self.records[start..]
    }

    pub fn remove_last_batch(&mut self) -> Vec<HistoryRecord> {
        let keep = self.records.len() - self.last_batch().len();
        self.records.split_off(keep)
    }

    /// Moves every file of the last batch back to where it came from.
    ///
    /// Records that could not be undone are reported and stay in the history.
    /// Returns the records that were undone.
    pub fn undo_last_batch(&mut self, fs: &dyn FileSystem, reporter: &dyn Reporter) -> Vec<HistoryRecord> {
        let mut undone = Vec::new();
        for record in self.remove_last_batch() {
            match undo_record(&record, fs) {
                Ok(()) => {
                    reporter.progress(&format!(
                        "Undo: {} -> {}",
                        record.resolved_output(fs).display(),
                        record.input.display()
                    ));
                    undone.push(record);
                }
                Err(e) => {
                    reporter.error(&e);
                    self.records.push(record);
                }
            }
        }
        undone
    }
}

fn undo_record(record: &HistoryRecord, fs: &dyn FileSystem) -> Result<()> {
    let current = record.resolved_output(fs);
    if !fs.is_file(&current) {
        return Err(ShelveError::action(
            "undo",
            format!("\"{}\" no longer exists", current.display()),
        ));
    }
    if fs.exists(&record.input) {
        return Err(ShelveError::action(
            "undo",
            format!("\"{}\" already exists", record.input.display()),
        ));
    }
    if let Some(parent) = record.input.parent() {
        if !parent.as_os_str().is_empty() {
            fs.create_dir_all(parent)?;
        }
    }
    fs.move_file(&current, &record.input)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{CaptureReporter, LocalFileSystem};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_micro_opt(10, 0, second, 250)
            .unwrap()
    }

    #[test]
    fn test_parse_line() {
        let record = HistoryRecord::parse_line("[2024-01-02 10:00:05.000250] /in/a b.txt -> /out").unwrap();
        assert_eq!(record.timestamp, at(5));
        assert_eq!(record.input, PathBuf::from("/in/a b.txt"));
        assert_eq!(record.output, PathBuf::from("/out"));
        assert_eq!(record.to_string(), "[2024-01-02 10:00:05.000250] /in/a b.txt -> /out");
    }

    #[test]
    fn test_parse_line_with_arrow_in_input() {
        let line = "[2024-01-02 10:00:05.000250] /in/a -> b.txt -> /out";
        let record = HistoryRecord::parse_line(line).unwrap();
        assert_eq!(record.input, PathBuf::from("/in/a -> b.txt"));
        assert_eq!(record.output, PathBuf::from("/out"));
        assert_eq!(record.to_string(), line);
    }

    #[test]
    fn test_unparseable_lines_are_skipped() {
        let text = "garbage\n[2024-01-02 10:00:05.000250] /a -> /b\n[not a date] /c -> /d\n";
        let history = FileHistory::parse(text);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_last_batch() {
        let mut history = FileHistory::default();
        history.push(at(1), "/a".into(), "/x".into());
        history.push(at(2), "/b".into(), "/x".into());
        history.push(at(2), "/c".into(), "/x".into());
        assert_eq!(history.last_batch().len(), 2);

        let removed = history.remove_last_batch();
        assert_eq!(removed.len(), 2);
        assert_eq!(history.len(), 1);
        assert_eq!(history.last_batch()[0].input, PathBuf::from("/a"));
        assert!(FileHistory::default().last_batch().is_empty());
    }

    #[test]
    fn test_append_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state/history.txt");

        let mut first = FileHistory::default();
        first.push(at(1), "/a".into(), "/x".into());
        first.append_to(&path).unwrap();
        let mut second = FileHistory::default();
        second.push(at(2), "/b".into(), "/y".into());
        second.append_to(&path).unwrap();

        let loaded = FileHistory::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.records()[1].output, PathBuf::from("/y"));
        assert!(FileHistory::load(&temp_dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_undo_moves_files_back() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in/a.txt");
        let out_dir = temp_dir.path().join("out");
        fs::create_dir_all(&out_dir).unwrap();
        fs::write(out_dir.join("a.txt"), "x").unwrap();

        let mut history = FileHistory::default();
        history.push(at(1), input.clone(), out_dir.clone());
        history.push(at(1), temp_dir.path().join("in/gone.txt"), out_dir.join("gone.txt"));

        let reporter = CaptureReporter::default();
        let undone = history.undo_last_batch(&LocalFileSystem::new(), &reporter);

        assert_eq!(undone.len(), 1);
        assert!(input.is_file());
        assert_eq!(history.len(), 1);
        assert_eq!(reporter.errors().len(), 1);
    }

    #[test]
    fn test_history_keeps_snapshots() {
        use crate::pipe::Pipe;
        use serde_json::Value;

        let mut pipe = Pipe::new(vec![PathBuf::from("/in/a.txt")], "/in");
        let id = pipe.item_ids()[0];
        let decl = CommandDecl::new("basename").with_template("a").unwrap();
        let mut history = History::new();

        history.record(0, CommandKind::Rule, &decl, pipe.get(id).unwrap());
        pipe.get_mut(id).unwrap().set("later", Value::from(1));
        history.record(0, CommandKind::Rule, &decl, pipe.get(id).unwrap());

        let entry = history.get(0).unwrap();
        assert_eq!(entry.items.len(), 2);
        assert!(entry.items[0].get("later").is_none());
        assert_eq!(history.entries().len(), 1);
        assert_eq!(history.to_string(), "rule basename: a\n  /in/a.txt\n  /in/a.txt\n");
    }
}
