//! Pipeline scheduling — per-pipeline worker pools
//!
//! Every configured pipeline gets one scheduler that owns its pool of
//! workers. A fixed parallelism selects the preallocating static variant;
//! parallelism 0 selects the dynamic variant, which autoscales the pool
//! against upstream source queue pressure.

mod core;
pub mod dynamic;
mod handle;

pub use dynamic::DynamicScheduler;

use async_trait::async_trait;
use std::sync::Arc;

use crate::pipeline::{noop_source_trigger, Pipeline, SourceTrigger, SpawnContext};
use self::core::SchedulerCore;

/// Per-pipeline scheduler capability.
///
/// Lifecycle is `new -> started -> stopped`; both transitions are idempotent
/// and a stopped scheduler is terminal. `stop` halts the control loops only;
/// the enclosing registry tears the workers down via `stop_pipeline`
/// afterwards.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Name of the pipeline this scheduler manages
    fn pipeline_name(&self) -> &str;

    /// Hook handed to upstream sources; a no-op for static pools
    fn source_input_trigger(&self) -> SourceTrigger;

    /// Bring the pool up and start any control loops. Idempotent.
    async fn start(&self, spawn_ctx: SpawnContext);

    /// Halt control loops. Idempotent; does not tear down workers.
    async fn stop(&self);

    /// Tear down every worker in the pool. Idempotent.
    async fn stop_pipeline(&self);
}

/// Choose the scheduler variant from the pipeline's configuration.
pub fn create_scheduler(pipeline: Arc<dyn Pipeline>) -> Arc<dyn Scheduler> {
    if pipeline.config().is_dynamic() {
        Arc::new(DynamicScheduler::new(pipeline))
    } else {
        Arc::new(StaticScheduler::new(pipeline))
    }
}

/// Scheduler that preallocates a fixed number of workers at start.
pub struct StaticScheduler {
    core: Arc<SchedulerCore>,
}

impl StaticScheduler {
    pub fn new(pipeline: Arc<dyn Pipeline>) -> Self {
        Self {
            core: Arc::new(SchedulerCore::new(pipeline)),
        }
    }
}

#[async_trait]
impl Scheduler for StaticScheduler {
    fn pipeline_name(&self) -> &str {
        self.core.pipeline_name()
    }

    fn source_input_trigger(&self) -> SourceTrigger {
        noop_source_trigger()
    }

    async fn start(&self, spawn_ctx: SpawnContext) {
        if !self.core.mark_started() {
            return; // already started
        }

        self.core.book_context(spawn_ctx);

        let requested = self.core.config().parallelism();
        let (total, _) = self.core.start_pipeline(requested).await;

        tracing::debug!(
            pipeline = self.pipeline_name(),
            total,
            "Initialized static worker pool"
        );
    }

    async fn stop(&self) {
        if !self.core.mark_stopped() {
            return; // already stopped
        }

        self.core.clear_started();
    }

    async fn stop_pipeline(&self) {
        self.core.stop_pipeline().await;
    }
}
