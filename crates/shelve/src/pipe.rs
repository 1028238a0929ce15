//! The working set of candidate files threaded through one block evaluation.
//!
//! Items live in an arena and are addressed by [`ItemId`]; the working and
//! original sets only hold ids. Two discoveries of the same path resolve to the
//! same id, so an item is never duplicated.

use crate::error::{Result, ShelveError};
use crate::services::Reporter;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ItemId(usize);

impl ItemId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One candidate file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipeItem {
    pub id: ItemId,
    pub filepath: PathBuf,
    pub flags: Vec<String>,
    pub deleted: bool,
    pub data: Map<String, Value>,
}

impl PipeItem {
    fn new(id: ItemId, filepath: PathBuf, flags: Vec<String>) -> Self {
        let mut data = Map::new();
        data.insert(
            "path".to_string(),
            Value::String(filepath.to_string_lossy().to_string()),
        );
        data.insert(
            "flags".to_string(),
            Value::Array(flags.iter().cloned().map(Value::String).collect()),
        );

        Self {
            id,
            filepath,
            flags,
            deleted: false,
            data,
        }
    }

    /// A detached item not owned by any pipe, used to evaluate content that
    /// does not depend on a particular file.
    pub fn detached() -> Self {
        Self::new(ItemId(usize::MAX), PathBuf::new(), Vec::new())
    }

    pub fn path_str(&self) -> String {
        self.filepath.to_string_lossy().to_string()
    }

    /// Appends flags, keeping the `data["flags"]` mirror in sync.
    pub fn add_flags(&mut self, flags: &[String]) {
        if flags.is_empty() {
            return;
        }
        self.flags.extend(flags.iter().cloned());
        self.data.insert(
            "flags".to_string(),
            Value::Array(self.flags.iter().cloned().map(Value::String).collect()),
        );
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Merges every key of `extra` into the item data.
    pub fn merge(&mut self, extra: Map<String, Value>) {
        for (key, value) in extra {
            self.data.insert(key, value);
        }
    }
}

impl fmt::Display for PipeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PipeItem(filepath: {}, flags: {:?}, data: {})",
            self.filepath.display(),
            self.flags,
            Value::Object(self.data.clone())
        )
    }
}

/// How a rule's predicate combines with the current working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Remove current items that do not match (intersection).
    And,
    /// Add original items that match (union).
    Or,
    /// Restore the original items, then intersect.
    Reset,
    /// Run the predicate for its side effects only.
    Pass,
}

impl Mode {
    pub const TOKENS: [&'static str; 4] = ["and", "or", "reset", "pass"];

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "and" => Some(Mode::And),
            "or" => Some(Mode::Or),
            "reset" => Some(Mode::Reset),
            "pass" => Some(Mode::Pass),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::And => "and",
            Mode::Or => "or",
            Mode::Reset => "reset",
            Mode::Pass => "pass",
        }
    }
}

pub struct Pipe {
    arena: Vec<PipeItem>,
    by_path: HashMap<PathBuf, ItemId>,
    items: BTreeSet<ItemId>,
    original_items: BTreeSet<ItemId>,
    pub mode: Mode,
    root: PathBuf,
    /// Names of the commands applied so far, for display.
    pub commands: Vec<String>,
    pub ignore_all_exceptions: bool,
}

impl Pipe {
    /// Seeds a pipe; the seed becomes the immutable original set.
    pub fn new<P: AsRef<Path>>(paths: Vec<PathBuf>, root: P) -> Self {
        let mut pipe = Self {
            arena: Vec::new(),
            by_path: HashMap::new(),
            items: BTreeSet::new(),
            original_items: BTreeSet::new(),
            mode: Mode::And,
            root: root.as_ref().to_path_buf(),
            commands: Vec::new(),
            ignore_all_exceptions: false,
        };

        for path in paths {
            let id = pipe.intern(path);
            pipe.items.insert(id);
            pipe.original_items.insert(id);
        }

        pipe
    }

    fn intern(&mut self, path: PathBuf) -> ItemId {
        if let Some(id) = self.by_path.get(&path) {
            return *id;
        }
        let id = ItemId(self.arena.len());
        self.arena.push(PipeItem::new(id, path.clone(), Vec::new()));
        self.by_path.insert(path, id);
        id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains(&id)
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.iter().copied().collect()
    }

    pub fn original_ids(&self) -> Vec<ItemId> {
        self.original_items.iter().copied().collect()
    }

    /// Ids of current items not yet consumed by an action.
    pub fn live_ids(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .copied()
            .filter(|id| !self.arena[id.0].deleted)
            .collect()
    }

    pub fn items(&self) -> impl Iterator<Item = &PipeItem> {
        self.items.iter().map(move |id| &self.arena[id.0])
    }

    pub fn get(&self, id: ItemId) -> Option<&PipeItem> {
        self.arena.get(id.0)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut PipeItem> {
        self.arena.get_mut(id.0)
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.items().map(|item| item.filepath.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Starts a union from an empty working set.
    pub fn begin_union(&mut self) {
        self.items.clear();
        self.mode = Mode::Or;
    }

    /// Unions newly discovered files into the working set.
    ///
    /// A failing discovery is reported and adds nothing.
    pub fn add<F>(&mut self, discover: F, reporter: &dyn Reporter) -> Vec<ItemId>
    where
        F: FnOnce(&Path) -> Result<Vec<PathBuf>>,
    {
        let found = match discover(&self.root) {
            Ok(found) => found,
            Err(e) => {
                self.report(&e, reporter);
                return Vec::new();
            }
        };

        let mut added = Vec::new();
        for path in found {
            let id = self.intern(path);
            if self.items.insert(id) {
                added.push(id);
            }
        }
        added
    }

    /// Applies a predicate according to the current [`Mode`].
    ///
    /// Predicate errors are reported; under `and`/`reset` the failing item is
    /// removed, under `or` it is not added.
    pub fn filter<F>(&mut self, mut predicate: F, reporter: &dyn Reporter)
    where
        F: FnMut(&mut PipeItem) -> Result<bool>,
    {
        log::debug!("pipe filter in {} mode over {} items", self.mode.as_str(), self.items.len());

        match self.mode {
            Mode::Pass => {
                for id in self.item_ids() {
                    if let Err(e) = predicate(&mut self.arena[id.0]) {
                        self.report(&e, reporter);
                    }
                }
            }
            Mode::And => self.retain_matching(&mut predicate, reporter),
            Mode::Reset => {
                self.items = self.original_items.clone();
                self.retain_matching(&mut predicate, reporter);
            }
            Mode::Or => {
                for id in self.original_ids() {
                    match predicate(&mut self.arena[id.0]) {
                        Ok(true) => {
                            self.items.insert(id);
                        }
                        Ok(false) => {}
                        Err(e) => self.report(&e, reporter),
                    }
                }
            }
        }
    }

    fn retain_matching<F>(&mut self, predicate: &mut F, reporter: &dyn Reporter)
    where
        F: FnMut(&mut PipeItem) -> Result<bool>,
    {
        for id in self.item_ids() {
            match predicate(&mut self.arena[id.0]) {
                Ok(true) => {}
                Ok(false) => {
                    self.items.remove(&id);
                }
                Err(e) => {
                    self.items.remove(&id);
                    self.report(&e, reporter);
                }
            }
        }
    }

    fn report(&self, err: &ShelveError, reporter: &dyn Reporter) {
        if !self.ignore_all_exceptions {
            reporter.error(err);
        }
    }
}

impl fmt::Debug for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe")
            .field("root", &self.root)
            .field("mode", &self.mode)
            .field("items", &self.paths())
            .finish()
    }
}
