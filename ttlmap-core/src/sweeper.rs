//! Background task that periodically removes expired entries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::time::Ticker;

/// Handle to a running sweeper task.
pub(crate) struct Sweeper {
    shutdown_tx: watch::Sender<bool>,
    active: Arc<AtomicBool>,
}

impl Sweeper {
    /// Spawns the sweeper on `runtime`.
    ///
    /// `sweep` runs on every tick and returns the number of entries removed,
    /// or `None` once the store it sweeps is gone.
    pub(crate) fn spawn<F>(runtime: &Handle, ticker: Box<dyn Ticker>, sweep: F) -> Self
    where
        F: Fn() -> Option<usize> + Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let active = Arc::new(AtomicBool::new(false));

        runtime.spawn(run(ticker, shutdown_rx, Arc::clone(&active), sweep));

        Self {
            shutdown_tx,
            active,
        }
    }

    /// Signals the task to exit. Safe to call more than once.
    pub(crate) fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Whether the task is currently waiting for ticks.
    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Clears the active flag however the task exits.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn run<F>(
    mut ticker: Box<dyn Ticker>,
    mut shutdown_rx: watch::Receiver<bool>,
    active: Arc<AtomicBool>,
    sweep: F,
) where
    F: Fn() -> Option<usize>,
{
    active.store(true, Ordering::Release);
    let _active = ActiveGuard(active);
    tracing::debug!("sweeper started");

    loop {
        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                // A dropped sender means the store is gone.
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            tick = ticker.tick() => {
                if tick.is_none() {
                    tracing::debug!("tick source closed");
                    break;
                }
                match sweep() {
                    Some(0) => {}
                    Some(removed) => tracing::debug!(removed, "swept expired entries"),
                    None => break,
                }
            }
        }
    }

    ticker.stop();
    tracing::debug!("sweeper stopped");
}
