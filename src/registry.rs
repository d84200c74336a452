//! Scheduler registry — one scheduler per registered pipeline
//!
//! The registry owns scheduler lifecycles so the schedulers themselves stay
//! free of teardown policy: `Scheduler::stop` halts control loops only, and
//! the registry follows it with `stop_pipeline` to tear the workers down.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{EngineError, Result};
use crate::model::Model;
use crate::pipeline::{PipelineContext, SourceTrigger, SpawnContext};
use crate::scheduler::{create_scheduler, Scheduler};
use crate::stats::PipelineStatistics;

struct Entry {
    scheduler: Arc<dyn Scheduler>,
    statistics: Arc<PipelineStatistics>,
    trigger: SourceTrigger,
}

/// Owns one running scheduler per pipeline in the model.
pub struct SchedulerRegistry {
    model: Arc<Model>,
    entries: RwLock<HashMap<String, Entry>>,
}

impl SchedulerRegistry {
    /// Create a registry over the given model
    pub fn new(model: Arc<Model>) -> Self {
        Self {
            model,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create and start a scheduler for one registered pipeline.
    /// Starting an already-running pipeline is a no-op.
    pub async fn start(&self, pipeline_name: &str) -> Result<()> {
        if self.entries.read().unwrap().contains_key(pipeline_name) {
            return Ok(());
        }

        let pipeline = self
            .model
            .get(pipeline_name)
            .ok_or_else(|| EngineError::UnknownPipeline(pipeline_name.to_string()))?;

        let scheduler = create_scheduler(pipeline);
        let statistics = Arc::new(PipelineStatistics::new());
        let spawn_ctx = SpawnContext::new(
            Arc::new(PipelineContext::new(pipeline_name)),
            statistics.clone(),
            self.model.clone(),
        );

        scheduler.start(spawn_ctx).await;
        tracing::info!(pipeline = pipeline_name, "Pipeline scheduler started");

        let entry = Entry {
            trigger: scheduler.source_input_trigger(),
            scheduler,
            statistics,
        };
        self.entries
            .write()
            .unwrap()
            .insert(pipeline_name.to_string(), entry);

        Ok(())
    }

    /// Start a scheduler for every pipeline in the model
    pub async fn start_all(&self) -> Result<()> {
        let mut names = self.model.names();
        names.sort();
        for name in names {
            self.start(&name).await?;
        }
        Ok(())
    }

    /// Stop one pipeline: halt its control loops, then tear down its
    /// workers. The entry is removed; schedulers do not restart.
    pub async fn stop(&self, pipeline_name: &str) -> Result<()> {
        let entry = self.entries.write().unwrap().remove(pipeline_name);
        let Some(entry) = entry else {
            return Err(EngineError::UnknownPipeline(pipeline_name.to_string()));
        };

        entry.scheduler.stop().await;
        entry.scheduler.stop_pipeline().await;
        tracing::info!(pipeline = pipeline_name, "Pipeline scheduler stopped");

        Ok(())
    }

    /// Stop every running pipeline
    pub async fn stop_all(&self) {
        let mut names: Vec<String> = self.entries.read().unwrap().keys().cloned().collect();
        names.sort();
        for name in names {
            let _ = self.stop(&name).await;
        }
    }

    /// Trigger hook for a running pipeline, for wiring into sources
    pub fn source_trigger(&self, pipeline_name: &str) -> Option<SourceTrigger> {
        self.entries
            .read()
            .unwrap()
            .get(pipeline_name)
            .map(|entry| entry.trigger.clone())
    }

    /// Statistics sink of a running pipeline
    pub fn statistics(&self, pipeline_name: &str) -> Option<Arc<PipelineStatistics>> {
        self.entries
            .read()
            .unwrap()
            .get(pipeline_name)
            .map(|entry| entry.statistics.clone())
    }

    /// Number of running pipelines
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Whether no pipelines are running
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}
