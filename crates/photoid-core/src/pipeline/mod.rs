//! Resize-or-copy pipeline components.
//!
//! The stages, in the order data flows through them:
//! - **filter**: Decide which directory entries are eligible
//! - **walker**: Traverse the source tree and emit accepted paths
//! - **worker**: Fixed pool applying the transform stage to each path
//! - **transform**: Per-file resize-or-copy decision and fallback copy
//! - **resize**: Default image transformer built on the `image` crate
//! - **coordinator**: Wires the stages together and drains outcomes
//! - **cancel**: Shared cancellation signal

pub mod cancel;
pub mod coordinator;
pub mod filter;
pub mod resize;
pub mod transform;
pub mod walker;
pub mod worker;

// Re-exports for convenient access
pub use cancel::{CancelOnDrop, CancellationSignal};
pub use coordinator::{Pipeline, PipelineSummary, DEFAULT_BUFFER_SIZE};
pub use filter::{FilterCriteria, FilterDecision};
pub use resize::ResizeTransformer;
pub use transform::{Action, ImageTransformer, Outcome, TransformSpec, TransformStage};
pub use walker::{TreeWalker, WalkHandle, WalkStats};
pub use worker::{PoolHandle, WorkerPool};
