//! # ttlmap core
//!
//! A concurrency-safe, generic in-memory key/value map where every entry
//! carries an optional absolute expiry instant.
//!
//! ## Features
//!
//! - One reader/writer lock around a single table (`parking_lot::RwLock`)
//! - Lazy expiry: expired entries are invisible to reads immediately
//! - Background sweeper per store, driven by a pluggable [`TimeSource`]
//! - Cancellable snapshot iteration that holds the read lock until it is
//!   exhausted, cancelled, or dropped
//! - Idempotent, thread-safe [`Store::stop`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use ttlmap_core::{Store, StoreConfig};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Sweep expired entries every 10 minutes instead of the default 5
//!     let config = StoreConfig::default()
//!         .with_sweep_interval(Duration::from_secs(600))
//!         .with_initial_capacity(1_000);
//!     let store: Store<&str, i32> = Store::with_config(config);
//!
//!     store.set("a", 1, Duration::from_secs(60)); // expires in 1 minute
//!     store.set("b", 2, Duration::ZERO); // never expires
//!
//!     // Replace the value, keep the expiry
//!     store.update("b", 4);
//!
//!     if let Some((value, expires_at)) = store.get_with_expiration("a") {
//!         println!("a = {value}, expires: {}", expires_at.is_some());
//!     }
//!
//!     let cancel = CancellationToken::new();
//!     for (key, value) in store.entries(&cancel) {
//!         println!("{key} = {value}");
//!     }
//!
//!     // Manual sweep (also done automatically by the background task)
//!     let removed = store.remove_expired();
//!     println!("removed {removed}");
//!
//!     store.stop();
//! }
//! ```

mod config;
mod entries;
mod entry;
mod error;
mod store;
mod sweeper;
mod time;

#[cfg(test)]
mod test_support;

pub use config::{StoreConfig, DEFAULT_SWEEP_INTERVAL};
pub use entries::Entries;
pub use error::StoreError;
pub use store::Store;
pub use time::{SystemTime, Ticker, TimeSource};

#[cfg(any(test, feature = "test-util"))]
pub use time::ManualTime;
