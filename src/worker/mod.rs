//! Decode worker pool.
//!
//! The pool bounds the number of concurrently executing decode operations
//! and multiplexes job submissions onto a fixed set of worker slots:
//!
//! ```text
//! submit(job) ──► JobQueue (FIFO) ──► next idle WorkerSlot ──► fetch + decode
//!                                                                   │
//! control thread ◄──────────── completion channel ◄─────────────────┘
//! ```
//!
//! Dispatch is strict FIFO; there is no priority reordering at this layer.
//! The caller controls perceived priority by choosing submission order.
//! Completion delivery is a single-consumer channel read on the control
//! thread, so the cache can apply READY/FAILED transitions serially.
//!
//! Cancellation is best-effort and advisory: a job that has not started is
//! skipped at dequeue and completes as [`JobOutcome::Cancelled`]; a running
//! job always finishes and its result is delivered normally. Workers are not
//! preemptible.

mod config;
mod handle;
mod job;
mod pool;
mod queue;
mod slot;

pub use config::{default_worker_count, WorkerPoolConfig, FALLBACK_WORKER_COUNT};
pub use handle::JobHandle;
pub use job::{DecodeJob, JobCompletion, JobId, JobOutcome};
pub use pool::{PoolError, PoolStats, WorkerPool};
pub use queue::JobQueue;
