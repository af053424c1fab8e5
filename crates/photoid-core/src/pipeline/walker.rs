//! Directory traversal feeding accepted paths into the pipeline.
//!
//! The walk runs on a blocking thread and hands paths to the workers through a
//! bounded channel, so a slow pool throttles the traversal. Siblings are
//! visited in file-name order. The first traversal error aborts the rest of
//! the walk and becomes the terminal error.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use walkdir::WalkDir;

use crate::error::{PipelineError, PipelineResult};

use super::cancel::CancellationSignal;
use super::filter::{FilterCriteria, FilterDecision};

/// Counters reported once the walk has finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Entries seen, directories included
    pub visited: u64,
    /// Paths handed to the workers
    pub accepted: u64,
}

/// Walks a directory tree and emits the files that pass a [`FilterCriteria`].
pub struct TreeWalker {
    root: PathBuf,
    criteria: Arc<FilterCriteria>,
    reference_time: Option<SystemTime>,
}

/// Handle to a running walk; yields the terminal status exactly once.
pub struct WalkHandle {
    handle: JoinHandle<PipelineResult<WalkStats>>,
}

impl WalkHandle {
    /// Wait for the walk to end and return its terminal status.
    ///
    /// `Err(PipelineError::Canceled)` means the walk stopped because the
    /// pipeline was cancelled, not because of a filesystem problem.
    pub async fn finish(self) -> PipelineResult<WalkStats> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(PipelineError::TaskFailed(format!("walker: {e}"))),
        }
    }
}

impl TreeWalker {
    pub fn new(root: impl Into<PathBuf>, criteria: Arc<FilterCriteria>) -> Self {
        Self {
            root: root.into(),
            criteria,
            reference_time: None,
        }
    }

    /// Pin "now" for the age check instead of reading the system clock per entry.
    pub fn with_reference_time(mut self, now: SystemTime) -> Self {
        self.reference_time = Some(now);
        self
    }

    /// Start the walk on the blocking pool.
    ///
    /// Returns the receiving end of the path channel (capacity `buffer`) and a
    /// handle for the terminal status. The channel closes when the walk ends.
    pub fn spawn(
        self,
        cancel: CancellationSignal,
        buffer: usize,
    ) -> (mpsc::Receiver<PathBuf>, WalkHandle) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handle = tokio::task::spawn_blocking(move || self.walk(&tx, &cancel));
        (rx, WalkHandle { handle })
    }

    /// Synchronous traversal; `tx` is dropped when this returns.
    fn walk(
        &self,
        tx: &mpsc::Sender<PathBuf>,
        cancel: &CancellationSignal,
    ) -> PipelineResult<WalkStats> {
        let mut stats = WalkStats::default();

        let entries = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name();
        for entry in entries {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                tracing::error!("Walk aborted at {:?}: {}", path, e);
                PipelineError::Walk {
                    path,
                    message: e.to_string(),
                }
            })?;
            stats.visited += 1;

            let name = entry.file_name().to_string_lossy();
            let is_regular = entry.file_type().is_file();
            let modified = if is_regular {
                modified_time(entry.path(), &entry)?
            } else {
                SystemTime::UNIX_EPOCH
            };
            let now = self.reference_time.unwrap_or_else(SystemTime::now);

            let decision = self.criteria.classify(&name, is_regular, modified, now);
            log_decision(entry.path(), decision, &self.criteria);
            if !decision.is_accepted() {
                continue;
            }

            if cancel.is_cancelled() {
                tracing::debug!("Walk canceled before emitting {:?}", entry.path());
                return Err(PipelineError::Canceled);
            }
            if tx.blocking_send(entry.into_path()).is_err() {
                // Every worker is gone, which only happens on cancellation.
                tracing::debug!("Path receiver closed, stopping walk");
                return Err(PipelineError::Canceled);
            }
            stats.accepted += 1;
        }

        tracing::debug!(
            "Walk of {:?} finished: {} visited, {} accepted",
            self.root,
            stats.visited,
            stats.accepted
        );
        Ok(stats)
    }
}

fn modified_time(path: &Path, entry: &walkdir::DirEntry) -> PipelineResult<SystemTime> {
    entry
        .metadata()
        .map_err(|e| e.to_string())
        .and_then(|meta| meta.modified().map_err(|e| e.to_string()))
        .map_err(|message| {
            tracing::error!("Walk aborted at {:?}: {}", path, message);
            PipelineError::Walk {
                path: path.to_path_buf(),
                message,
            }
        })
}

fn log_decision(path: &Path, decision: FilterDecision, criteria: &FilterCriteria) {
    match decision {
        FilterDecision::NotRegular => tracing::trace!("{}: {:?}", decision, path),
        FilterDecision::Excluded => tracing::debug!(
            "{}: {:?} (pattern {})",
            decision,
            path,
            criteria.exclude_pattern().unwrap_or_default()
        ),
        FilterDecision::NoMatch => tracing::debug!(
            "{}: {:?} (pattern {})",
            decision,
            path,
            criteria.include_pattern()
        ),
        FilterDecision::TooOld => tracing::debug!(
            "{}: {:?} (max age {} days)",
            decision,
            path,
            criteria.max_age_days()
        ),
        FilterDecision::Accepted => tracing::debug!("{}: {:?}", decision, path),
    }
}
