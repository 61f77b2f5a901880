//! Structured error types for recipe execution
//!
//! Item-level faults are plain data collected per path and never abort a
//! run. Pool and recording failures are fatal for the run and propagate
//! out of `recipe::run`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// One item's transform failure. Collected and reported per path; the step
/// keeps processing every other item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFault {
    /// Path of the work item whose dispatch failed
    pub path: PathBuf,
    /// Human-readable description of the failure
    pub message: String,
}

impl ItemFault {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Fatal pool-level failures. A pool fault aborts the current step and every
/// step after it; commands already applied are not rolled back.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker {worker_id} initialization failed: {reason}")]
    InitFailed { worker_id: usize, reason: String },

    #[error("worker {worker_id} exited unexpectedly")]
    WorkerDied { worker_id: usize },

    #[error("pool reply channel closed with {in_flight} items in flight")]
    ChannelClosed { in_flight: usize },
}

/// Failures in the case recording subsystem.
#[derive(Debug, Error)]
pub enum CaseError {
    /// A write exceeded the ring's free capacity. Callers must bound writes
    /// by `free_byte_length`; hitting this is a precondition violation.
    #[error("ring buffer overflow: write of {requested} bytes exceeds {free} free bytes")]
    RingOverflow { requested: usize, free: usize },

    #[error("byte request of {requested} bytes exceeds ring capacity of {capacity}")]
    RequestTooLarge { requested: usize, capacity: usize },

    #[error("case log frame truncated at byte offset {offset}")]
    TruncatedFrame { offset: u64 },

    #[error("case log frame payload is not a valid record")]
    MalformedFrame(#[from] serde_json::Error),

    #[error("case log does not begin with a case header")]
    MissingHeader,

    #[error("case log I/O failed")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced out of a whole recipe run. Item faults are not errors;
/// they ride along inside `RunResult`.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("step {step_index} pool failure")]
    Pool {
        step_index: usize,
        #[source]
        source: PoolError,
    },

    #[error("case recording failed")]
    Case(#[from] CaseError),
}
