//! Harness plumbing errors.
//!
//! None of these abort a run: they are folded into the verdict of the case
//! they occurred in, or reported by the caller that asked for an artifact.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrialError {
    #[error("cannot spawn case thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("case thread exited without reporting")]
    WorkerLost,
    #[error("log: {0}")]
    Log(#[from] std::io::Error),
    #[error("no case named {0:?}")]
    UnknownCase(String),
}
