//! Per-pipeline statistics — lightweight counters and gauges
//!
//! In-process metrics tracking without external dependencies. The scheduler
//! records pool changes here; pipeline factories receive the same sink and
//! may add their own bookkeeping around it.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Statistics snapshot — a point-in-time view of one pipeline's counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    /// Workers currently in the pool
    pub parallelism: u32,
    /// Total workers spawned since start
    pub workers_spawned: u64,
    /// Total workers retired by shrinking or shutdown
    pub workers_retired: u64,
    /// Worker run loops that exited with an error
    pub run_errors: u64,
    /// Worker teardowns that exceeded the stop timeout
    pub stop_timeouts: u64,
}

/// Statistics collector for one pipeline
#[derive(Debug, Default)]
pub struct PipelineStatistics {
    parallelism: AtomicU32,
    workers_spawned: AtomicU64,
    workers_retired: AtomicU64,
    run_errors: AtomicU64,
    stop_timeouts: AtomicU64,
}

impl PipelineStatistics {
    /// Create a new statistics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record workers added to the pool
    pub fn record_spawned(&self, count: u32) {
        self.workers_spawned
            .fetch_add(u64::from(count), Ordering::Relaxed);
    }

    /// Record workers removed from the pool
    pub fn record_retired(&self, count: u32) {
        self.workers_retired
            .fetch_add(u64::from(count), Ordering::Relaxed);
    }

    /// Record a worker run loop exiting with an error
    pub fn record_run_error(&self) {
        self.run_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a worker teardown exceeding the stop timeout
    pub fn record_stop_timeout(&self) {
        self.stop_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Update the current pool size gauge
    pub fn set_parallelism(&self, count: u32) {
        self.parallelism.store(count, Ordering::Relaxed);
    }

    /// Current pool size gauge
    pub fn parallelism(&self) -> u32 {
        self.parallelism.load(Ordering::Relaxed)
    }

    /// Total workers spawned since start
    pub fn workers_spawned(&self) -> u64 {
        self.workers_spawned.load(Ordering::Relaxed)
    }

    /// Take a snapshot of all counters
    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            parallelism: self.parallelism.load(Ordering::Relaxed),
            workers_spawned: self.workers_spawned.load(Ordering::Relaxed),
            workers_retired: self.workers_retired.load(Ordering::Relaxed),
            run_errors: self.run_errors.load(Ordering::Relaxed),
            stop_timeouts: self.stop_timeouts.load(Ordering::Relaxed),
        }
    }
}
