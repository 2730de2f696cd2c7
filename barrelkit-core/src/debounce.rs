//! Coalescing of bursts of file events.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use indexmap::IndexMap;

use crate::watcher::{FileEvent, FileEventKind};

/// Holds events back until their path has been quiet for `window`.
///
/// Only the latest kind per path is kept. Handlers re-read the file, so the
/// only requirement is that the most recent state is eventually processed.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: IndexMap<PathBuf, (FileEventKind, Instant)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: IndexMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn push(&mut self, event: FileEvent, now: Instant) {
        let kind = match self.pending.get(&event.path) {
            // A file created inside the window is still new to the orchestrator.
            Some((FileEventKind::Add, _)) if event.kind == FileEventKind::Change => {
                FileEventKind::Add
            }
            _ => event.kind,
        };
        self.pending.insert(event.path, (kind, now));
    }

    /// Removes and returns the events that have been quiet for the window,
    /// in the order their paths were first seen.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<FileEvent> {
        let window = self.window;
        let mut ready = Vec::new();
        self.pending.retain(|path, (kind, last_seen)| {
            if now.saturating_duration_since(*last_seen) >= window {
                ready.push(FileEvent::new(*kind, path.clone()));
                false
            } else {
                true
            }
        });
        ready
    }

    /// Removes and returns every pending event regardless of age.
    pub fn flush(&mut self) -> Vec<FileEvent> {
        self.pending
            .drain(..)
            .map(|(path, (kind, _))| FileEvent::new(kind, path))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Time until the oldest pending event becomes ready.
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.pending
            .values()
            .map(|(_, last_seen)| (*last_seen + self.window).saturating_duration_since(now))
            .min()
    }
}
