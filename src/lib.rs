//! # flowgate
//!
//! An elastic pipeline engine: every configured pipeline gets a scheduler
//! that owns a pool of concurrent workers and, in dynamic mode, autoscales
//! the pool against upstream source queue pressure.
//!
//! ## Architecture
//!
//! ```text
//! Source ── trigger ──▶ Launcher ──▶ worker pool ◀── Shrinker
//!     ▲                    ▲
//!   probe ───────────── Spawner (periodic sweep)
//! ```
//!
//! ## Core Concepts
//!
//! - **Pipeline**: a named, fallible factory for workers (the plugin chain
//!   behind it is opaque to the engine).
//! - **Worker**: one long-running instance; `run` returns only on stop or
//!   fatal error, and teardown is staged so `close` happens exactly once.
//! - **Scheduler**: static (preallocated pool) or dynamic (autoscaled pool
//!   with launcher, spawner, and shrinker control loops).
//! - **Trigger / probe**: a source reports pressure by calling the trigger
//!   with a cheap queue-length probe; the scheduler does the rest.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flowgate::{Model, SchedulerRegistry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> flowgate::Result<()> {
//!     let model = Arc::new(Model::new());
//!     model.register(Arc::new(my_pipeline))?;
//!
//!     let registry = SchedulerRegistry::new(model);
//!     registry.start_all().await?;
//!
//!     // Wire triggers into sources:
//!     let trigger = registry.source_trigger("access").unwrap();
//!     trigger("files", Arc::new(|| queue.len() as u32));
//!
//!     registry.stop_all().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod scheduler;
pub mod stats;

// Re-export main types
pub use config::{EngineConfig, PipelineConfig, ScalingPolicy};
pub use error::{EngineError, Result};
pub use model::Model;
pub use pipeline::{
    noop_source_trigger, Pipeline, PipelineContext, QueueLengthProbe, SourceTrigger, SpawnContext,
    Worker,
};
pub use registry::SchedulerRegistry;
pub use scheduler::{create_scheduler, DynamicScheduler, Scheduler, StaticScheduler};
pub use stats::{PipelineStatistics, StatisticsSnapshot};
