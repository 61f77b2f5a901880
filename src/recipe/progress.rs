//! Progress reporting seam
//!
//! The runner reports processed/total counts and per-item console or fault
//! lines through this trait. Implementations must be cheap; they run on the
//! orchestration loop.

use crate::transform::{ConsoleKind, ConsoleLine};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Mutex;

pub trait ProgressObserver: Send + Sync {
    fn step_started(&self, _step_index: usize, _total_steps: usize, _total_items: usize) {}
    fn item_completed(&self, _path: &Path, _ok: bool) {}
    fn console_line(&self, _path: &Path, _line: &ConsoleLine) {}
}

/// Ignores everything. For library callers doing their own reporting.
pub struct NullObserver;

impl ProgressObserver for NullObserver {}

/// Terminal progress bar, one per step.
pub struct BarObserver {
    bar: Mutex<Option<ProgressBar>>,
}

impl BarObserver {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(bar) = guard.as_ref() {
                f(bar);
            }
        }
    }
}

impl Default for BarObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for BarObserver {
    fn step_started(&self, step_index: usize, total_steps: usize, total_items: usize) {
        let bar = ProgressBar::new(total_items as u64);
        bar.set_style(ProgressStyle::default_bar());
        bar.set_prefix(format!("step {}/{}", step_index + 1, total_steps));
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(previous) = guard.take() {
                previous.finish();
            }
            *guard = Some(bar);
        }
    }

    fn item_completed(&self, _path: &Path, _ok: bool) {
        self.with_bar(|bar| bar.inc(1));
    }

    fn console_line(&self, path: &Path, line: &ConsoleLine) {
        let text = match line.kind {
            ConsoleKind::Stdout => format!("{}: {}", path.display(), line.text),
            ConsoleKind::Stderr => format!("{}: [stderr] {}", path.display(), line.text),
        };
        self.with_bar(|bar| bar.println(&text));
    }
}
