//! Pluggable time source used for expiry checks and the sweep cadence.
//!
//! The store never reads the clock directly. Everything goes through a
//! [`TimeSource`], so tests can swap in [`ManualTime`] and drive both the
//! clock and the sweeper ticks by hand.

use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Supplies the current instant and repeating tickers.
pub trait TimeSource: Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> Instant;

    /// Creates a ticker that fires every `period`.
    fn new_ticker(&self, period: Duration) -> Box<dyn Ticker>;
}

/// A repeating tick signal created by [`TimeSource::new_ticker`].
#[async_trait]
pub trait Ticker: Send {
    /// Waits for the next tick and returns its instant.
    ///
    /// Returns `None` once the ticker is stopped or its source is gone;
    /// no tick will ever be delivered after that.
    async fn tick(&mut self) -> Option<Instant>;

    /// Turns the ticker off and releases its resources.
    fn stop(&mut self);
}

/// Time source backed by the system clock and Tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> Instant {
        Instant::now()
    }

    /// A period too long to schedule yields a ticker that never fires.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero, if called outside of a Tokio runtime, or
    /// if the runtime was built without its time driver (`enable_time`).
    fn new_ticker(&self, period: Duration) -> Box<dyn Ticker> {
        // First tick one full period from now, not immediately.
        let Some(start) = tokio::time::Instant::now().checked_add(period) else {
            return Box::new(SystemTicker::Parked);
        };
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        Box::new(SystemTicker::Running(interval))
    }
}

enum SystemTicker {
    Running(tokio::time::Interval),
    /// Waits forever; the period overflows the clock.
    Parked,
    Stopped,
}

#[async_trait]
impl Ticker for SystemTicker {
    async fn tick(&mut self) -> Option<Instant> {
        match self {
            SystemTicker::Running(interval) => Some(interval.tick().await.into_std()),
            SystemTicker::Parked => std::future::pending().await,
            SystemTicker::Stopped => None,
        }
    }

    fn stop(&mut self) {
        *self = SystemTicker::Stopped;
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use manual::ManualTime;

#[cfg(any(test, feature = "test-util"))]
mod manual {
    use super::{Ticker, TimeSource};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::{Duration, Instant};
    use tokio::sync::mpsc;

    /// A time source that only moves when told to.
    ///
    /// `now()` returns the mocked instant, which changes only through
    /// [`advance`](Self::advance) and [`set`](Self::set). Tickers never fire
    /// on their own; [`tick`](Self::tick) sends the mocked instant to every
    /// live ticker. Ticks are queued, so a tick sent before the receiving
    /// task starts waiting is still delivered.
    #[derive(Debug)]
    pub struct ManualTime {
        now: Mutex<Instant>,
        tickers: Mutex<Vec<mpsc::UnboundedSender<Instant>>>,
    }

    impl ManualTime {
        /// Creates a manual time source frozen at `now`.
        pub fn new(now: Instant) -> Self {
            Self {
                now: Mutex::new(now),
                tickers: Mutex::new(Vec::new()),
            }
        }

        /// Creates a manual time source frozen at the current system instant.
        pub fn starting_now() -> Self {
            Self::new(Instant::now())
        }

        /// Moves the mocked clock forward by `d`.
        pub fn advance(&self, d: Duration) {
            let mut now = self.now.lock();
            *now += d;
        }

        /// Sets the mocked clock to `t`, which may be in the past.
        pub fn set(&self, t: Instant) {
            *self.now.lock() = t;
        }

        /// Sends a tick carrying the current mocked instant on every live ticker.
        ///
        /// Set the clock first with `advance` or `set`, then tick.
        pub fn tick(&self) {
            let now = *self.now.lock();
            self.tickers.lock().retain(|tx| tx.send(now).is_ok());
        }

        /// Number of tickers that have not been stopped or dropped.
        pub fn ticker_count(&self) -> usize {
            let mut tickers = self.tickers.lock();
            tickers.retain(|tx| !tx.is_closed());
            tickers.len()
        }
    }

    impl TimeSource for ManualTime {
        fn now(&self) -> Instant {
            *self.now.lock()
        }

        fn new_ticker(&self, _period: Duration) -> Box<dyn Ticker> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.tickers.lock().push(tx);
            Box::new(ManualTicker { rx })
        }
    }

    struct ManualTicker {
        rx: mpsc::UnboundedReceiver<Instant>,
    }

    #[async_trait]
    impl Ticker for ManualTicker {
        async fn tick(&mut self) -> Option<Instant> {
            self.rx.recv().await
        }

        fn stop(&mut self) {
            self.rx.close();
        }
    }
}
