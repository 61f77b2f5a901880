//! Recipe runner
//!
//! Drives recipe steps in order: one full pass over the work item source per
//! step, fanned out through a fresh worker pool, fully drained before the
//! next step begins. Later steps therefore observe content already mutated
//! by earlier ones. Commands from different items apply in completion order;
//! commands from one item apply in the order the transform emitted them.

pub mod progress;

pub use progress::{BarObserver, NullObserver, ProgressObserver};

use crate::command::{self, CommandStore, ContentSource, Formatter, StoreError};
use crate::errors::{ItemFault, RunError};
use crate::pool::{ItemReport, StepInit, WorkerPool};
use crate::source::WorkItem;
use crate::transform::Step;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a full recipe run. A populated fault list is not an error;
/// partial application is visible and expected.
#[derive(Debug, Default)]
pub struct RunResult {
    pub steps_completed: usize,
    pub items_processed: usize,
    pub commands_applied: usize,
    pub faults: Vec<ItemFault>,
}

impl RunResult {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Everything the runner needs besides the recipe itself.
pub struct RunContext<'a> {
    pub store: &'a dyn CommandStore,
    pub reader: &'a dyn ContentSource,
    pub formatter: &'a dyn Formatter,
    pub pool_size: usize,
    pub observer: &'a dyn ProgressObserver,
}

/// Run every step of a recipe over the paths the source yields.
///
/// The path list is snapshotted up front so identity stays stable across
/// steps; content is re-read fresh at the start of each step. A pool fault
/// aborts the remaining steps; commands already applied stay applied.
pub async fn run(
    steps: &[Step],
    source: impl Iterator<Item = PathBuf>,
    ctx: RunContext<'_>,
) -> Result<RunResult, RunError> {
    let paths: Vec<PathBuf> = source.collect();
    let mut result = RunResult::default();
    for (step_index, step) in steps.iter().enumerate() {
        info!(
            step = step_index,
            name = %step.name,
            engine = ?step.engine,
            items = paths.len(),
            "step started"
        );
        ctx.observer
            .step_started(step_index, steps.len(), paths.len());
        run_step(step_index, step, &paths, &ctx, &mut result).await?;
        result.steps_completed += 1;
    }
    info!(
        steps = result.steps_completed,
        items = result.items_processed,
        commands = result.commands_applied,
        faults = result.faults.len(),
        "recipe finished"
    );
    Ok(result)
}

async fn run_step(
    step_index: usize,
    step: &Step,
    paths: &[PathBuf],
    ctx: &RunContext<'_>,
    result: &mut RunResult,
) -> Result<(), RunError> {
    let init = StepInit {
        engine: step.engine,
        transform: Arc::clone(&step.transform),
        args: step.args.clone(),
        format: step.format,
    };
    let pool_err = |source| RunError::Pool { step_index, source };
    let mut pool = WorkerPool::spawn(ctx.pool_size, init).await.map_err(pool_err)?;

    for path in paths {
        // fresh fetch so this step observes the previous step's effects
        let content = match ctx.reader.read(path).await {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), "read failed: {err}");
                result.items_processed += 1;
                result
                    .faults
                    .push(ItemFault::new(path.clone(), format!("read failed: {err}")));
                ctx.observer.item_completed(path, false);
                continue;
            }
        };
        // keep the pending queue bounded: block on completions while every
        // worker is busy instead of queueing the whole file set
        while pool.idle_count() == 0 {
            match pool.next_report().await.map_err(pool_err)? {
                Some(report) => handle_report(report, step, ctx, result).await?,
                None => break,
            }
        }
        pool.dispatch(WorkItem {
            path: path.clone(),
            content,
        })
        .await
        .map_err(pool_err)?;
    }

    while let Some(report) = pool.next_report().await.map_err(pool_err)? {
        handle_report(report, step, ctx, result).await?;
    }
    pool.shutdown().await.map_err(pool_err)
}

async fn handle_report(
    report: ItemReport,
    step: &Step,
    ctx: &RunContext<'_>,
    result: &mut RunResult,
) -> Result<(), RunError> {
    result.items_processed += 1;
    for line in &report.console {
        ctx.observer.console_line(&report.path, line);
    }
    if let Some(message) = report.fault {
        // isolated to this dispatch; every other item's commands still land
        result.faults.push(ItemFault::new(report.path.clone(), message));
        ctx.observer.item_completed(&report.path, false);
        return Ok(());
    }
    for cmd in report.commands {
        match command::apply(cmd, ctx.store, ctx.formatter, step.format).await {
            Ok(()) => result.commands_applied += 1,
            // recording failures poison the transcript; everything else is
            // an item-level fault
            Err(StoreError::Recording(err)) => return Err(RunError::Case(err)),
            Err(err) => {
                result
                    .faults
                    .push(ItemFault::new(report.path.clone(), err.to_string()));
            }
        }
    }
    ctx.observer.item_completed(&report.path, true);
    Ok(())
}
