//! Crate error types

use thiserror::Error;

/// Errors surfaced by the coordinator handle.
///
/// Lifecycle failures inside the output pipelines are never errors at this
/// level; they travel through the per-surface state table and come back as
/// signal payloads. The handle only fails when the runtime itself is gone.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The coordinator runtime has shut down and no longer accepts commands
    #[error("coordinator runtime is closed")]
    Closed,
}
