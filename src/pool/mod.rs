//! Worker pool coordinator
//!
//! Owns a fixed-size set of execution workers for one step and a pull-based
//! FIFO scheduler over them. All scheduling state — the idle-worker set and
//! the pending queue — lives on the caller's single control flow; workers
//! only ever see their own inbox and the shared reply channel, so nothing
//! here needs a lock.

mod messages;
mod worker;

pub use messages::{ItemReport, StepInit, WorkerMessage};

use crate::errors::PoolError;
use crate::source::WorkItem;
use std::collections::VecDeque;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use worker::spawn_worker;

/// State of one pool slot, owned and mutated only by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Busy,
}

struct Slot {
    sender: mpsc::Sender<WorkerMessage>,
    handle: JoinHandle<()>,
    state: SlotState,
    last_activity: Instant,
}

/// A pool of `pool_size` workers, created for one step and torn down after
/// it drains. Steps never share a pool.
pub struct WorkerPool {
    slots: Vec<Slot>,
    replies: mpsc::Receiver<ItemReport>,
    idle: VecDeque<usize>,
    pending: VecDeque<WorkItem>,
    in_flight: usize,
}

impl WorkerPool {
    /// Start `pool_size` workers, sending each the same initialization
    /// message before anything else.
    pub async fn spawn(pool_size: usize, init: StepInit) -> Result<Self, PoolError> {
        assert!(pool_size >= 1, "pool size must be at least 1");
        let (reply_tx, replies) = mpsc::channel(pool_size * 2);
        let mut slots = Vec::with_capacity(pool_size);
        for id in 0..pool_size {
            let (tx, rx) = mpsc::channel(4);
            let handle = spawn_worker(id, rx, reply_tx.clone());
            tx.send(WorkerMessage::Init(init.clone()))
                .await
                .map_err(|_| PoolError::InitFailed {
                    worker_id: id,
                    reason: "worker inbox closed before initialization".to_string(),
                })?;
            slots.push(Slot {
                sender: tx,
                handle,
                state: SlotState::Idle,
                last_activity: Instant::now(),
            });
        }
        // workers hold the only remaining senders; a closed reply channel
        // therefore means every worker is gone
        drop(reply_tx);
        debug!(pool_size, "worker pool started");
        Ok(Self {
            idle: (0..pool_size).collect(),
            slots,
            replies,
            pending: VecDeque::new(),
            in_flight: 0,
        })
    }

    pub fn pool_size(&self) -> usize {
        self.slots.len()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Items dispatched or queued but not yet reported.
    pub fn outstanding(&self) -> usize {
        self.in_flight + self.pending.len()
    }

    /// Per-slot state and last state change. Non-responding workers are not
    /// detected in-band; an external supervisor can poll this instead.
    pub fn slot_activity(&self) -> Vec<(SlotState, Instant)> {
        self.slots
            .iter()
            .map(|slot| (slot.state, slot.last_activity))
            .collect()
    }

    /// Hand an item to an idle worker if one exists, else queue it.
    pub async fn dispatch(&mut self, item: WorkItem) -> Result<(), PoolError> {
        match self.idle.pop_front() {
            Some(id) => self.send_to(id, item).await,
            None => {
                self.pending.push_back(item);
                Ok(())
            }
        }
    }

    async fn send_to(&mut self, id: usize, item: WorkItem) -> Result<(), PoolError> {
        let slot = &mut self.slots[id];
        slot.state = SlotState::Busy;
        slot.last_activity = Instant::now();
        self.in_flight += 1;
        slot.sender
            .send(WorkerMessage::RunItem(item))
            .await
            .map_err(|_| PoolError::WorkerDied { worker_id: id })
    }

    /// Wait for the next finished item. The reporting worker turns idle and
    /// immediately picks up the next queued item if there is one. Returns
    /// `None` once nothing is running or queued — the drain condition.
    pub async fn next_report(&mut self) -> Result<Option<ItemReport>, PoolError> {
        if self.in_flight == 0 {
            debug_assert!(self.pending.is_empty());
            return Ok(None);
        }
        let report = self
            .replies
            .recv()
            .await
            .ok_or(PoolError::ChannelClosed {
                in_flight: self.in_flight,
            })?;
        self.in_flight -= 1;
        let id = report.worker_id;
        self.slots[id].state = SlotState::Idle;
        self.slots[id].last_activity = Instant::now();
        match self.pending.pop_front() {
            Some(next) => self.send_to(id, next).await?,
            None => self.idle.push_back(id),
        }
        Ok(Some(report))
    }

    /// Send `Exit` to every worker and wait for each to stop. Valid only
    /// after the item source is exhausted and every worker is idle again;
    /// there is no mid-step cancellation path.
    pub async fn shutdown(mut self) -> Result<(), PoolError> {
        debug_assert_eq!(self.in_flight, 0, "shutdown with items in flight");
        debug_assert!(self.pending.is_empty(), "shutdown with queued items");
        for (id, slot) in self.slots.iter().enumerate() {
            if slot.sender.send(WorkerMessage::Exit).await.is_err() {
                warn!(worker = id, "worker inbox closed before exit message");
            }
        }
        let handles: Vec<JoinHandle<()>> =
            self.slots.drain(..).map(|slot| slot.handle).collect();
        for (id, joined) in futures::future::join_all(handles).await.into_iter().enumerate() {
            if joined.is_err() {
                return Err(PoolError::WorkerDied { worker_id: id });
            }
        }
        debug!("worker pool drained and shut down");
        Ok(())
    }
}
