//! Coordinator ↔ worker protocol

use crate::command::FileCommand;
use crate::source::WorkItem;
use crate::transform::{ArgumentRecord, ConsoleLine, EngineKind, TransformUnit};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a worker needs before its first item. Sent once, first, to
/// every worker in the pool.
#[derive(Clone)]
pub struct StepInit {
    pub engine: EngineKind,
    pub transform: Arc<dyn TransformUnit>,
    pub args: ArgumentRecord,
    pub format: bool,
}

/// Coordinator → worker.
pub enum WorkerMessage {
    Init(StepInit),
    RunItem(WorkItem),
    /// Teardown; the worker stops without replying
    Exit,
}

/// Worker → coordinator: the complete result of one dispatched item.
/// Exactly one report is produced per `RunItem`.
#[derive(Debug)]
pub struct ItemReport {
    pub worker_id: usize,
    pub path: PathBuf,
    pub commands: Vec<FileCommand>,
    pub console: Vec<ConsoleLine>,
    /// A fault isolates to this dispatch; commands are empty when set
    pub fault: Option<String>,
}
