use thiserror::Error;

/// Errors that can occur when building a [`Store`](crate::Store).
///
/// Missing and expired keys are never errors; they are reported through
/// `Option` and `bool` results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store was built outside of a Tokio runtime, so its sweeper could not be spawned
    #[error(
        "ttlmap_core::Store requires a Tokio runtime. Build the store from within a \
         #[tokio::main] or #[tokio::test] context, or from code running on a Tokio runtime"
    )]
    NoRuntime,
}
