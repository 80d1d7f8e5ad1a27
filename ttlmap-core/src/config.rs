use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::time::{SystemTime, TimeSource};

/// Default interval between automatic sweeps of expired entries (5 minutes)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Configuration for a [`Store`](crate::Store) and its background sweeper
///
/// # Example
///
/// ```rust
/// use ttlmap_core::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_sweep_interval(Duration::from_secs(30))
///     .with_initial_capacity(1_000);
/// ```
#[derive(Clone)]
pub struct StoreConfig {
    /// Interval between sweeps (default: 5 minutes)
    ///
    /// A zero interval is replaced by the default when the store is built.
    pub sweep_interval: Duration,
    /// Pre-allocation hint for the table; does not bound its size
    pub initial_capacity: usize,
    /// Clock used for expiry checks and sweep ticks (default: system clock)
    pub time_source: Arc<dyn TimeSource>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            initial_capacity: 0,
            time_source: Arc::new(SystemTime),
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("sweep_interval", &self.sweep_interval)
            .field("initial_capacity", &self.initial_capacity)
            .finish_non_exhaustive()
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sweep interval
    ///
    /// This determines how often the background task removes expired entries.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ttlmap_core::StoreConfig;
    /// use std::time::Duration;
    ///
    /// // Sweep every 30 seconds
    /// let config = StoreConfig::default()
    ///     .with_sweep_interval(Duration::from_secs(30));
    /// ```
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the initial capacity hint for the table
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Sets the time source used for expiry and sweep ticks
    pub fn with_time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    /// The sweep interval actually used, with zero mapped to the default
    pub(crate) fn effective_sweep_interval(&self) -> Duration {
        if self.sweep_interval.is_zero() {
            DEFAULT_SWEEP_INTERVAL
        } else {
            self.sweep_interval
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualTime;
    use std::time::Instant;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
        assert_eq!(config.initial_capacity, 0);
    }

    #[test]
    fn test_custom_sweep_interval() {
        let config = StoreConfig::default().with_sweep_interval(Duration::from_secs(30));
        assert_eq!(config.effective_sweep_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_sweep_interval_uses_default() {
        let config = StoreConfig::default().with_sweep_interval(Duration::ZERO);
        assert_eq!(config.effective_sweep_interval(), DEFAULT_SWEEP_INTERVAL);
    }

    #[test]
    fn test_builder_pattern_chaining() {
        let start = Instant::now();
        let config = StoreConfig::new()
            .with_sweep_interval(Duration::from_secs(120))
            .with_initial_capacity(64)
            .with_time_source(Arc::new(ManualTime::new(start)));

        assert_eq!(config.sweep_interval, Duration::from_secs(120));
        assert_eq!(config.initial_capacity, 64);
        assert_eq!(config.time_source.now(), start);
    }

    #[test]
    fn test_debug_omits_time_source() {
        let rendered = format!("{:?}", StoreConfig::default());
        assert!(rendered.contains("sweep_interval"));
        assert!(!rendered.contains("time_source"));
    }
}
