//! Pipeline capability seams consumed by the schedulers
//!
//! A `Pipeline` is a factory for `Worker` instances; the scheduler decides
//! how many workers exist and drives their lifecycle through this interface
//! without knowing anything about the plugin chain inside.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::model::Model;
use crate::stats::PipelineStatistics;

/// Cheap, non-blocking probe returning the current queue length at an
/// upstream source. Invoked concurrently by the spawner, shrinker, and
/// launcher.
pub type QueueLengthProbe = Arc<dyn Fn() -> u32 + Send + Sync>;

/// Hook a source calls when it receives input: `(source_name, probe)`.
pub type SourceTrigger = Arc<dyn Fn(&str, QueueLengthProbe) + Send + Sync>;

/// Trigger that discards every invocation (static pools never react to
/// source pressure).
pub fn noop_source_trigger() -> SourceTrigger {
    Arc::new(|_, _| {})
}

/// One runnable instance of a pipeline.
///
/// Contract:
/// - `run` is long-running and returns only on stop or fatal error.
/// - `stop` is called concurrently with `run`, must cause an active `run` to
///   return, and resolves only after it has. It must also tolerate being
///   called on a worker whose `run` already returned on its own.
/// - `close` is called exactly once, strictly after `stop` has resolved.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Worker name (for logging)
    fn name(&self) -> &str;

    /// One-time setup, invoked before the first `run`
    async fn prepare(&self);

    /// Process input until stopped; an `Err` is fatal for this worker
    async fn run(&self) -> Result<()>;

    /// Interrupt `run` and wait for it to unwind. `scheduled` is true when
    /// the stop comes from pool shrinking rather than full shutdown.
    async fn stop(&self, scheduled: bool);

    /// Release resources; the final call a worker ever receives
    async fn close(&self);
}

/// A configured pipeline: a named, fallible factory for workers.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Pipeline name
    fn name(&self) -> &str;

    /// Pipeline settings, including the scaling policy
    fn config(&self) -> &PipelineConfig;

    /// Construct one worker. Called once per spawn; failures abort the
    /// remainder of the current spawn batch only.
    async fn get_instance(
        &self,
        ctx: &Arc<PipelineContext>,
        statistics: &Arc<PipelineStatistics>,
        model: &Arc<Model>,
    ) -> Result<Arc<dyn Worker>>;
}

/// Shared execution context handed to every worker of a pipeline.
#[derive(Debug)]
pub struct PipelineContext {
    pipeline_name: String,
}

impl PipelineContext {
    /// Create a context for the named pipeline
    pub fn new(pipeline_name: impl Into<String>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
        }
    }

    /// Name of the pipeline this context belongs to
    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }
}

/// Collaborators threaded through `Scheduler::start` into every
/// `Pipeline::get_instance` call.
#[derive(Clone)]
pub struct SpawnContext {
    /// Shared pipeline execution context
    pub ctx: Arc<PipelineContext>,
    /// Statistics sink for this pipeline
    pub statistics: Arc<PipelineStatistics>,
    /// Engine-wide model the factory may consult
    pub model: Arc<Model>,
}

impl SpawnContext {
    /// Bundle the three collaborators for a pipeline
    pub fn new(
        ctx: Arc<PipelineContext>,
        statistics: Arc<PipelineStatistics>,
        model: Arc<Model>,
    ) -> Self {
        Self {
            ctx,
            statistics,
            model,
        }
    }
}
