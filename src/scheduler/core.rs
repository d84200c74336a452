//! Shared scheduler substrate — the worker set and its bounded
//! spawn/teardown primitives

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use tokio::sync::RwLock;

use crate::config::{PipelineConfig, ScalingPolicy};
use crate::pipeline::{Pipeline, SpawnContext};
use crate::scheduler::handle::WorkerHandle;

/// State shared by the static and dynamic scheduler variants.
///
/// The worker set behaves as a stack: spawns push, shrinks pop from the
/// tail. Handles are exclusively owned by the set while present; every exit
/// path pops them before terminating them.
pub(crate) struct SchedulerCore {
    pipeline: Arc<dyn Pipeline>,
    workers: RwLock<Vec<WorkerHandle>>,
    started: AtomicBool,
    stopped: AtomicBool,
    // Collaborators booked at start for later spawns from the control loops.
    context: StdRwLock<Option<SpawnContext>>,
}

impl SchedulerCore {
    pub(crate) fn new(pipeline: Arc<dyn Pipeline>) -> Self {
        Self {
            pipeline,
            workers: RwLock::new(Vec::new()),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            context: StdRwLock::new(None),
        }
    }

    pub(crate) fn pipeline_name(&self) -> &str {
        self.pipeline.name()
    }

    pub(crate) fn config(&self) -> &PipelineConfig {
        self.pipeline.config()
    }

    pub(crate) fn policy(&self) -> &ScalingPolicy {
        &self.pipeline.config().scaling
    }

    /// Latch the started flag; false if already started.
    pub(crate) fn mark_started(&self) -> bool {
        self.started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Latch the stopped flag; false if already stopped.
    pub(crate) fn mark_stopped(&self) -> bool {
        self.stopped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn clear_started(&self) {
        self.started.store(false, Ordering::SeqCst);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Record the collaborators that later spawns pass to the factory.
    pub(crate) fn book_context(&self, spawn_ctx: SpawnContext) {
        *self.context.write().unwrap() = Some(spawn_ctx);
    }

    pub(crate) fn context(&self) -> Option<SpawnContext> {
        self.context.read().unwrap().clone()
    }

    pub(crate) async fn worker_count(&self) -> u32 {
        self.workers.read().await.len() as u32
    }

    /// Grow the pool by up to `requested` workers.
    ///
    /// Returns `(current_count, added_count)`. Never exceeds the policy cap;
    /// partial success is permitted when the factory fails mid-batch. Every
    /// appended handle is already executing when this returns.
    pub(crate) async fn start_pipeline(&self, requested: u32) -> (u32, u32) {
        let requested = if requested == 0 { 1 } else { requested };

        let Some(spawn_ctx) = self.context() else {
            return (self.worker_count().await, 0);
        };

        let mut workers = self.workers.write().await;
        let mut current = workers.len() as u32;

        if self.is_stopped() || current == u32::MAX {
            return (current, 0);
        }

        let headroom = self.policy().max_parallelism.saturating_sub(current);
        let requested = requested.min(headroom);

        let mut added = 0;
        while added < requested {
            let worker = match self
                .pipeline
                .get_instance(&spawn_ctx.ctx, &spawn_ctx.statistics, &spawn_ctx.model)
                .await
            {
                Ok(worker) => worker,
                Err(e) => {
                    tracing::error!(
                        pipeline = self.pipeline_name(),
                        instance = current + 1,
                        error = %e,
                        "Failed to launch pipeline worker"
                    );
                    break;
                }
            };

            let mut handle = WorkerHandle::new(worker);
            handle.prepare().await;
            handle.spawn_run(spawn_ctx.statistics.clone());
            workers.push(handle);

            current += 1;
            added += 1;
        }

        if added > 0 {
            spawn_ctx.statistics.record_spawned(added);
        }
        spawn_ctx.statistics.set_parallelism(current);

        (current, added)
    }

    /// Pop the tail worker if `guard` approves the count observed under the
    /// write lock. Returns the popped handle's index alongside it.
    pub(crate) async fn pop_tail_worker<F>(&self, guard: F) -> Option<(usize, WorkerHandle)>
    where
        F: FnOnce(u32) -> bool,
    {
        let mut workers = self.workers.write().await;
        if workers.is_empty() || !guard(workers.len() as u32) {
            return None;
        }

        let handle = workers.pop()?;
        let idx = workers.len();

        if let Some(spawn_ctx) = self.context() {
            spawn_ctx.statistics.set_parallelism(workers.len() as u32);
        }

        Some((idx, handle))
    }

    /// Terminate one worker, waiting up to the policy stop timeout for its
    /// full teardown. On timeout the teardown keeps running detached.
    pub(crate) async fn stop_worker(&self, idx: usize, handle: WorkerHandle, scheduled: bool) {
        let mut done = handle.terminate(scheduled);

        let timeout = self.policy().stop_timeout();
        let result = tokio::time::timeout(timeout, done.wait_for(|&torn_down| torn_down)).await;
        match result {
            Ok(_) => {}
            Err(_) => {
                tracing::warn!(
                    pipeline = self.pipeline_name(),
                    instance = idx + 1,
                    timeout_secs = timeout.as_secs(),
                    "Stopping pipeline worker timed out"
                );
                if let Some(spawn_ctx) = self.context() {
                    spawn_ctx.statistics.record_stop_timeout();
                }
            }
        }
    }

    /// Tear down every worker in the pool, front to back. Re-entrant: once
    /// the set is empty, further calls are no-ops.
    pub(crate) async fn stop_pipeline(&self) {
        tracing::debug!(pipeline = self.pipeline_name(), "Stopping pipeline");

        let mut workers = self.workers.write().await;
        let count = workers.len() as u32;

        for (idx, handle) in workers.drain(..).enumerate() {
            self.stop_worker(idx, handle, false).await;
        }

        if let Some(spawn_ctx) = self.context() {
            if count > 0 {
                spawn_ctx.statistics.record_retired(count);
            }
            spawn_ctx.statistics.set_parallelism(0);
        }

        tracing::info!(
            pipeline = self.pipeline_name(),
            parallelism = count,
            "Stopped pipeline"
        );
    }
}
