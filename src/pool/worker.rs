//! Execution worker task
//!
//! A worker is one long-lived isolated context. It receives its step
//! initialization once, then evaluates one item at a time until told to
//! exit. A panicking transform is caught and reported as that item's fault;
//! it never takes the worker down.

use super::messages::{ItemReport, StepInit, WorkerMessage};
use crate::command::FileCommand;
use crate::source::WorkItem;
use crate::transform::{Console, TransformOutcome};
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

pub(super) fn spawn_worker(
    id: usize,
    mut inbox: mpsc::Receiver<WorkerMessage>,
    replies: mpsc::Sender<ItemReport>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut init: Option<StepInit> = None;
        while let Some(message) = inbox.recv().await {
            match message {
                WorkerMessage::Init(step) => {
                    debug!(worker = id, engine = ?step.engine, "worker initialized");
                    init = Some(step);
                }
                WorkerMessage::RunItem(item) => {
                    let report = match &init {
                        Some(step) => evaluate(id, step, item),
                        None => ItemReport {
                            worker_id: id,
                            path: item.path,
                            commands: Vec::new(),
                            console: Vec::new(),
                            fault: Some("item dispatched before initialization".to_string()),
                        },
                    };
                    // coordinator gone: nothing left to report to
                    if replies.send(report).await.is_err() {
                        break;
                    }
                }
                WorkerMessage::Exit => {
                    trace!(worker = id, "worker exiting");
                    break;
                }
            }
        }
    })
}

fn evaluate(id: usize, step: &StepInit, item: WorkItem) -> ItemReport {
    let mut console = Console::default();
    let path = item.path.clone();
    let evaluated = std::panic::catch_unwind(AssertUnwindSafe(|| {
        step.transform.apply(&item, &step.args, &mut console)
    }));

    let (commands, fault) = match evaluated {
        Ok(Ok(TransformOutcome::Rewritten(new_data))) if new_data != item.content => (
            vec![FileCommand::Update {
                old_path: item.path,
                old_data: item.content,
                new_data,
            }],
            None,
        ),
        Ok(Ok(_)) => (Vec::new(), None),
        Ok(Err(err)) => (Vec::new(), Some(err.to_string())),
        Err(panic) => (Vec::new(), Some(describe_panic(&panic))),
    };

    trace!(
        worker = id,
        path = %path.display(),
        commands = commands.len(),
        fault = fault.is_some(),
        "item evaluated"
    );
    ItemReport {
        worker_id: id,
        path,
        commands,
        console: console.into_lines(),
        fault,
    }
}

fn describe_panic(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        format!("transform panicked: {text}")
    } else if let Some(text) = panic.downcast_ref::<String>() {
        format!("transform panicked: {text}")
    } else {
        "transform panicked".to_string()
    }
}
