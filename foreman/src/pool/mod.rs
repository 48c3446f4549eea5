//! # Pool Engine
//!
//! Thread pool implementations backing every executor the provider hands
//! out.
//!
//! ## Key Concepts
//! - `ThreadPool`: an elastic OS-thread pool with core/transient sizing,
//!   keep-alive retirement, and saturation rejection
//! - `ScheduledPool`: a fixed-core scheduled executor layered on top of a
//!   `ThreadPool`, driven by a single timer thread
//!
//! ## Design Principles
//! - Task isolation: a panicking task never takes a worker down
//! - Visible backpressure: a saturated bounded queue rejects rather than
//!   blocks, so the submitter can decide to re-submit
//! - Bounded teardown: graceful drain first, forced discard after

pub mod scheduled;
pub mod thread_pool;

pub use scheduled::ScheduledPool;
pub use thread_pool::{PoolMetrics, ThreadPool};
