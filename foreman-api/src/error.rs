use thiserror::Error;

/// Errors raised by the provider and registry surface.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Invalid or missing policy values discovered at first use of a shared
    /// singleton. Not retryable with the same policy; the failed singleton is
    /// not cached, so a later call with a corrected policy may succeed.
    #[error("Shared pool policy rejected: {0}")]
    Configuration(String),

    /// Malformed `PoolConfig` passed to an exclusive-pool request. The pool
    /// is never constructed.
    #[error("Invalid pool configuration: {0}")]
    InvalidConfiguration(String),

    /// Task classification outside the selection policy's domain.
    #[error("Unsupported request: {0}")]
    UnsupportedRequest(String),

    /// Operation invoked outside the provider's started window.
    #[error("Provider is not running (state: {0})")]
    IllegalState(&'static str),

    /// Aggregated teardown failures, reported once per teardown.
    #[error("Teardown incomplete: {0}")]
    Teardown(String),

    /// Other unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised when submitting work to an executor handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The pool's bounded queue is saturated and no further worker can be
    /// added. Callers may re-submit once in-flight work drains.
    #[error("Task rejected, queue is full (capacity: {capacity})")]
    Rejected { capacity: usize },

    /// The pool has been shut down.
    #[error("Executor is shut down")]
    Shutdown,
}
