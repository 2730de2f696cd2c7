//! Build session hooks around the orchestrator.
//!
//! A host build drives a session through four hooks:
//!
//! 1. [`BuildSession::watch_run`] when the build starts in watch mode.
//! 2. [`BuildSession::emit`] once per build, collecting every directory.
//! 3. [`BuildSession::done`] after each build, which starts the file
//!    watcher the first time a watched build finishes without errors.
//! 4. [`BuildSession::watch_close`] when watching ends.
//!
//! Between builds, [`BuildSession::pump`] moves watcher events through the
//! debouncer into the orchestrator.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::Config;
use crate::debounce::Debouncer;
use crate::error::Result;
use crate::orchestrator::{CollectSummary, Orchestrator, Outcome};
use crate::watcher::{FileEvent, FileWatcher, WatcherConfig};
use crate::writer::{AggregateSink, FsSink};

/// The result of handling one debounced event.
#[derive(Debug)]
pub struct EventResult {
    pub event: FileEvent,
    pub outcome: Result<Outcome>,
}

pub struct BuildSession<S: AggregateSink = FsSink> {
    orchestrator: Orchestrator<S>,
    debouncer: Debouncer,
    watcher: Option<FileWatcher>,
    watching: bool,
    build_has_errors: bool,
}

impl BuildSession<FsSink> {
    pub fn new(config: Config) -> Self {
        Self::with_sink(config, FsSink)
    }
}

impl<S: AggregateSink> BuildSession<S> {
    pub fn with_sink(config: Config, sink: S) -> Self {
        let debouncer = Debouncer::new(config.debounce());
        Self {
            orchestrator: Orchestrator::with_sink(config, sink),
            debouncer,
            watcher: None,
            watching: false,
            build_has_errors: false,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator<S> {
        &self.orchestrator
    }

    pub fn is_watching(&self) -> bool {
        self.watching
    }

    pub fn watcher_started(&self) -> bool {
        self.watcher.is_some()
    }

    /// Whether file events are currently dropped because the last build failed.
    pub fn is_suspended(&self) -> bool {
        self.build_has_errors
    }

    pub fn watch_run(&mut self) {
        self.watching = true;
    }

    pub fn emit(&mut self) -> CollectSummary {
        self.orchestrator.collect()
    }

    /// Records the build result and starts watching when appropriate.
    ///
    /// Returns whether the watcher was started by this call.
    pub fn done(&mut self, has_errors: bool) -> Result<bool> {
        self.build_has_errors = has_errors;
        if has_errors {
            info!("Build has errors, ignoring file events until the next clean build");
        }

        if !self.watching || self.watcher.is_some() || has_errors {
            return Ok(false);
        }

        let watcher = FileWatcher::new(WatcherConfig::from(self.orchestrator.config()))?;
        for root in watcher.watched() {
            info!("Watching {}", root.display());
        }
        self.watcher = Some(watcher);
        Ok(true)
    }

    pub fn watch_close(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.close();
        }
        self.debouncer.flush();
        self.orchestrator.close();
        self.watching = false;
    }

    /// Queues an event for the debouncer.
    pub fn enqueue(&mut self, event: FileEvent, now: Instant) {
        self.debouncer.push(event, now);
    }

    /// Handles every queued event that has been quiet for the debounce window.
    pub fn process_ready(&mut self, now: Instant) -> Vec<EventResult> {
        self.debouncer
            .drain_ready(now)
            .into_iter()
            .map(|event| {
                let outcome = self.handle(&event);
                EventResult { event, outcome }
            })
            .collect()
    }

    fn handle(&mut self, event: &FileEvent) -> Result<Outcome> {
        if self.build_has_errors {
            debug!("Ignoring {} while the build has errors", event.path.display());
            return Ok(Outcome::Ignored);
        }
        self.orchestrator.handle_event(event)
    }

    /// Waits up to `max_wait` for watcher events, then handles whatever is
    /// ready. Without a running watcher this only drains the debouncer.
    pub fn pump(&mut self, max_wait: Duration) -> Result<Vec<EventResult>> {
        let now = Instant::now();
        let wait = self
            .debouncer
            .next_deadline(now)
            .map_or(max_wait, |deadline| deadline.min(max_wait));

        if let Some(watcher) = self.watcher.as_mut() {
            let events = watcher.wait_events(wait)?;
            let received = Instant::now();
            for event in events {
                self.debouncer.push(event, received);
            }
            // Pick up anything else that arrived meanwhile.
            loop {
                let more = watcher.next_events()?;
                if more.is_empty() {
                    break;
                }
                let received = Instant::now();
                for event in more {
                    self.debouncer.push(event, received);
                }
            }
        } else if !wait.is_zero() {
            std::thread::sleep(wait);
        }

        Ok(self.process_ready(Instant::now()))
    }
}
