//! Wires walker → workers → drain and owns the pipeline's cancellation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use crate::error::{PipelineError, PipelineResult};

use super::cancel::CancellationSignal;
use super::filter::FilterCriteria;
use super::transform::{Action, Outcome, TransformStage};
use super::walker::TreeWalker;
use super::worker::WorkerPool;

/// Default capacity of the path and outcome channels.
pub const DEFAULT_BUFFER_SIZE: usize = 64;

/// Tally of the outcomes drained during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Entries the walker looked at
    pub visited: u64,
    /// Paths that passed the filter
    pub accepted: u64,
    /// Outcomes drained
    pub processed: u64,
    /// Copied verbatim (within bounds or unreadable header)
    pub copied: u64,
    /// Produced by the transformer
    pub transformed: u64,
    /// Transform failed, source copied instead
    pub fell_back: u64,
    /// Outcomes carrying an error
    pub failed: u64,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl PipelineSummary {
    fn record(&mut self, outcome: &Outcome) {
        self.processed += 1;
        match outcome.action {
            Action::Copied => self.copied += 1,
            Action::Transformed => self.transformed += 1,
            Action::FellBack => self.fell_back += 1,
        }
        if outcome.error.is_some() {
            self.failed += 1;
        }
    }
}

/// One invocation of the resize-or-copy pipeline.
///
/// ```rust,ignore
/// let pipeline = Pipeline::new("./in", "./out", criteria, stage, 8)?;
/// let summary = pipeline.run().await?;
/// ```
#[derive(Debug)]
pub struct Pipeline {
    source: PathBuf,
    destination: PathBuf,
    criteria: Arc<FilterCriteria>,
    stage: Arc<TransformStage>,
    workers: usize,
    buffer_size: usize,
    reference_time: Option<SystemTime>,
    cancel: CancellationSignal,
}

impl Pipeline {
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        criteria: FilterCriteria,
        stage: TransformStage,
        workers: usize,
    ) -> PipelineResult<Self> {
        if workers == 0 {
            return Err(PipelineError::InvalidWorkers(workers));
        }
        Ok(Self {
            source: source.into(),
            destination: destination.into(),
            criteria: Arc::new(criteria),
            stage: Arc::new(stage),
            workers,
            buffer_size: DEFAULT_BUFFER_SIZE,
            reference_time: None,
            cancel: CancellationSignal::new(),
        })
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Pin "now" for the age filter.
    pub fn with_reference_time(mut self, now: SystemTime) -> Self {
        self.reference_time = Some(now);
        self
    }

    /// Use an externally owned signal so the caller can abort the run early.
    pub fn with_cancellation(mut self, cancel: CancellationSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that aborts this run when triggered.
    pub fn cancellation(&self) -> CancellationSignal {
        self.cancel.clone()
    }

    /// Run to completion, discarding individual outcomes.
    pub async fn run(self) -> PipelineResult<PipelineSummary> {
        self.run_with(|_| {}).await
    }

    /// Run to completion, passing every outcome to `on_outcome` as it is drained.
    ///
    /// Only a traversal error (or cancellation) fails the run. Per-file
    /// transform failures are counted in the summary and never returned.
    pub async fn run_with<F>(self, mut on_outcome: F) -> PipelineResult<PipelineSummary>
    where
        F: FnMut(&Outcome) + Send + 'static,
    {
        let start = Instant::now();
        let cancel = self.cancel.clone();
        // Whatever happens below, stragglers get released on the way out.
        let _teardown = cancel.drop_guard();

        tracing::info!(
            "Processing {:?} -> {:?} with {} worker(s)",
            self.source,
            self.destination,
            self.workers
        );

        let pool = WorkerPool::new(self.workers, Arc::clone(&self.stage), &self.destination)?;
        let mut walker = TreeWalker::new(&self.source, Arc::clone(&self.criteria));
        if let Some(now) = self.reference_time {
            walker = walker.with_reference_time(now);
        }

        let (paths, walk) = walker.spawn(cancel.clone(), self.buffer_size);
        let (mut outcomes, workers) = pool.spawn(paths, cancel.clone(), self.buffer_size);

        let drain = tokio::spawn(async move {
            let mut summary = PipelineSummary::default();
            while let Some(outcome) = outcomes.recv().await {
                if let Some(error) = &outcome.error {
                    tracing::debug!("Outcome for {:?}: {}", outcome.path, error);
                }
                summary.record(&outcome);
                on_outcome(&outcome);
            }
            summary
        });

        let panicked = workers.join().await;
        if panicked > 0 {
            tracing::warn!("{} worker(s) terminated abnormally", panicked);
        }
        cancel.cancel();

        let mut summary = drain
            .await
            .map_err(|e| PipelineError::TaskFailed(format!("drain: {e}")))?;
        let stats = walk.finish().await?;

        summary.visited = stats.visited;
        summary.accepted = stats.accepted;
        summary.elapsed = start.elapsed();
        tracing::info!(
            "Done: {} processed ({} copied, {} transformed, {} fell back) in {:.1?}",
            summary.processed,
            summary.copied,
            summary.transformed,
            summary.fell_back,
            summary.elapsed
        );
        Ok(summary)
    }
}
