//! Per-directory cache of extracted exports.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::extractor::ExportSet;
use crate::path_utils;

/// What one source file contributes to its directory's aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub file_path: PathBuf,
    pub file_stem: String,
    pub exports: ExportSet,
}

impl ExportRecord {
    pub fn new(file_path: impl Into<PathBuf>, exports: ExportSet) -> Self {
        let file_path = file_path.into();
        let file_stem = path_utils::file_stem(&file_path).unwrap_or_default();
        Self {
            file_path,
            file_stem,
            exports,
        }
    }
}

type DirectoryEntries = IndexMap<PathBuf, ExportRecord>;

/// A comparable copy of one directory's cache contents.
///
/// Two snapshots are equal when every file maps to an equal export set,
/// regardless of the order the files were inserted in. Export sets compare
/// without regard to name order as well, so a snapshot can equal one taken
/// before a file reordered its exports while the aggregate on disk still
/// lists the old order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
    entries: DirectoryEntries,
}

impl DirectorySnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Export records grouped by the directory that owns them.
///
/// Within a directory, records keep the order their files were first
/// inserted in; replacing a record keeps its position.
#[derive(Debug, Default)]
pub struct DirectoryCache {
    dirs: FxHashMap<PathBuf, DirectoryEntries>,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record for `record.file_path`.
    pub fn upsert(&mut self, dir: &Path, record: ExportRecord) {
        self.dirs
            .entry(dir.to_path_buf())
            .or_default()
            .insert(record.file_path.clone(), record);
    }

    /// Removes the record for `file_path`, if any.
    pub fn remove(&mut self, dir: &Path, file_path: &Path) -> Option<ExportRecord> {
        // shift_remove keeps the remaining files in insertion order.
        self.dirs
            .get_mut(dir)
            .and_then(|entries| entries.shift_remove(file_path))
    }

    pub fn get(&self, dir: &Path, file_path: &Path) -> Option<&ExportRecord> {
        self.dirs.get(dir).and_then(|entries| entries.get(file_path))
    }

    pub fn snapshot(&self, dir: &Path) -> DirectorySnapshot {
        DirectorySnapshot {
            entries: self.dirs.get(dir).cloned().unwrap_or_default(),
        }
    }

    pub fn is_empty(&self, dir: &Path) -> bool {
        self.dirs.get(dir).map_or(true, IndexMap::is_empty)
    }

    /// Records of `dir` in insertion order.
    pub fn records(&self, dir: &Path) -> impl Iterator<Item = &ExportRecord> {
        self.dirs.get(dir).into_iter().flat_map(|entries| entries.values())
    }

    /// Forgets every record of `dir`.
    pub fn clear(&mut self, dir: &Path) {
        if let Some(entries) = self.dirs.get_mut(dir) {
            entries.clear();
        }
    }

    /// Every directory touched so far, sorted.
    pub fn directories(&self) -> Vec<&Path> {
        let mut dirs: Vec<&Path> = self.dirs.keys().map(PathBuf::as_path).collect();
        dirs.sort();
        dirs
    }
}
