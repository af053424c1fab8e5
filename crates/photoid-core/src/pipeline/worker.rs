//! Fixed-size worker pool applying the transform stage to every path.
//!
//! Workers share one path receiver and race for the next item; each file's
//! work runs on the blocking pool so a slow transform never stalls the
//! runtime. A worker exits when the input is exhausted or the pipeline is
//! cancelled. An in-flight file always completes before cancellation is
//! checked again.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::error::{PipelineError, PipelineResult};

use super::cancel::CancellationSignal;
use super::transform::{copy_file, Action, Outcome, TransformStage};

/// Spawns `workers` tasks that turn paths into [`Outcome`]s.
pub struct WorkerPool {
    workers: usize,
    stage: Arc<TransformStage>,
    destination_dir: PathBuf,
}

/// Handle to the running workers.
pub struct PoolHandle {
    handles: Vec<JoinHandle<()>>,
    live: Arc<AtomicUsize>,
}

impl PoolHandle {
    /// Number of workers that have not exited yet.
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Wait for every worker to exit. Returns how many of them panicked.
    pub async fn join(self) -> usize {
        let mut panicked = 0;
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker task failed: {e}");
                panicked += 1;
            }
        }
        panicked
    }
}

/// Decrements the live-worker count however the worker exits.
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl WorkerPool {
    pub fn new(
        workers: usize,
        stage: Arc<TransformStage>,
        destination_dir: impl Into<PathBuf>,
    ) -> PipelineResult<Self> {
        if workers == 0 {
            return Err(PipelineError::InvalidWorkers(workers));
        }
        Ok(Self {
            workers,
            stage,
            destination_dir: destination_dir.into(),
        })
    }

    /// Start the workers.
    ///
    /// Returns the outcome receiver (capacity `buffer`) and a handle to the
    /// workers. The outcome channel closes once every worker has exited.
    pub fn spawn(
        self,
        paths: mpsc::Receiver<PathBuf>,
        cancel: CancellationSignal,
        buffer: usize,
    ) -> (mpsc::Receiver<Outcome>, PoolHandle) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let paths = Arc::new(Mutex::new(paths));
        let destination_dir = Arc::new(self.destination_dir);
        let live = Arc::new(AtomicUsize::new(self.workers));

        let handles = (0..self.workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    paths: Arc::clone(&paths),
                    outcomes: tx.clone(),
                    stage: Arc::clone(&self.stage),
                    destination_dir: Arc::clone(&destination_dir),
                    cancel: cancel.clone(),
                };
                let guard = LiveGuard(Arc::clone(&live));
                tokio::spawn(async move {
                    let _guard = guard;
                    worker.run().await;
                })
            })
            .collect();

        (rx, PoolHandle { handles, live })
    }
}

struct Worker {
    id: usize,
    paths: Arc<Mutex<mpsc::Receiver<PathBuf>>>,
    outcomes: mpsc::Sender<Outcome>,
    stage: Arc<TransformStage>,
    destination_dir: Arc<PathBuf>,
    cancel: CancellationSignal,
}

impl Worker {
    async fn run(self) {
        tracing::trace!("Worker {} started", self.id);
        let mut processed = 0u64;

        while let Some(path) = self.next_path().await {
            let destination = destination_for(&self.destination_dir, &path);
            let outcome = self.process(path, destination).await;
            processed += 1;

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Worker {} canceled, dropping pending outcome", self.id);
                    break;
                }
                sent = self.outcomes.send(outcome) => {
                    if sent.is_err() {
                        tracing::debug!("Worker {}: outcome receiver closed", self.id);
                        break;
                    }
                }
            }
        }

        tracing::trace!("Worker {} exiting after {} file(s)", self.id, processed);
    }

    /// Next path from the shared input, or `None` on exhaustion or cancellation.
    async fn next_path(&self) -> Option<PathBuf> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            path = async { self.paths.lock().await.recv().await } => path,
        }
    }

    async fn process(&self, path: PathBuf, destination: PathBuf) -> Outcome {
        let stage = Arc::clone(&self.stage);
        let source = path.clone();
        let target = destination.clone();
        match tokio::task::spawn_blocking(move || stage.apply(&source, &target)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // The stage catches transformer panics itself; this is a panic
                // elsewhere in `apply`. Still deliver the source verbatim.
                tracing::error!("Processing {:?} panicked: {}", path, e);
                let (source, target) = (path.clone(), destination.clone());
                let copied =
                    tokio::task::spawn_blocking(move || copy_file(&source, &target)).await;
                let error = match copied {
                    Ok(Ok(_)) => PipelineError::TaskFailed(e.to_string()),
                    Ok(Err(copy_err)) => PipelineError::Copy {
                        path: path.clone(),
                        message: format!("{copy_err} (after task failed: {e})"),
                    },
                    Err(join_err) => PipelineError::TaskFailed(join_err.to_string()),
                };
                Outcome {
                    path,
                    destination,
                    action: Action::FellBack,
                    error: Some(error),
                }
            }
        }
    }
}

/// `destination_dir / basename(path)`.
pub fn destination_for(destination_dir: &Path, path: &Path) -> PathBuf {
    match path.file_name() {
        Some(name) => destination_dir.join(name),
        None => destination_dir.join(path),
    }
}
