use async_trait::async_trait;
use clap::Parser;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use flowgate::{
    EngineConfig, Model, Pipeline, PipelineConfig, PipelineContext, PipelineStatistics,
    QueueLengthProbe, Result, ScalingPolicy, SchedulerRegistry, Worker,
};

/// flowgate — elastic pipeline engine demo
///
/// Feeds an in-memory queue and lets the dynamic scheduler scale the worker
/// pool against the backlog. Watch the pool grow under load and taper off
/// once the queue drains.
#[derive(Parser)]
#[command(name = "flowgate", version, about)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "flowgate.toml")]
    config: String,

    /// Items pushed into each pipeline's queue per second
    #[arg(short, long, default_value_t = 50)]
    burst: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Shared in-memory work queue drained by the demo workers
struct WorkQueue {
    items: Mutex<VecDeque<u64>>,
}

impl WorkQueue {
    fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    fn push(&self, item: u64) {
        self.items.lock().unwrap().push_back(item);
    }

    fn pop(&self) -> Option<u64> {
        self.items.lock().unwrap().pop_front()
    }

    fn len(&self) -> u32 {
        self.items.lock().unwrap().len() as u32
    }
}

/// Demo worker: drains the shared queue until stopped
struct QueueWorker {
    name: String,
    queue: Arc<WorkQueue>,
    processed: Arc<AtomicU64>,
    stop_requested: AtomicBool,
    running: watch::Sender<bool>,
}

impl QueueWorker {
    fn new(name: String, queue: Arc<WorkQueue>, processed: Arc<AtomicU64>) -> Self {
        let (running, _) = watch::channel(false);
        Self {
            name,
            queue,
            processed,
            stop_requested: AtomicBool::new(false),
            running,
        }
    }
}

#[async_trait]
impl Worker for QueueWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn prepare(&self) {
        tracing::debug!(worker = self.name, "Worker prepared");
    }

    async fn run(&self) -> Result<()> {
        self.running.send_replace(true);
        while !self.stop_requested.load(Ordering::SeqCst) {
            match self.queue.pop() {
                Some(_item) => {
                    // Simulate per-item work so backlog actually builds.
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    self.processed.fetch_add(1, Ordering::Relaxed);
                }
                None => tokio::time::sleep(Duration::from_millis(20)).await,
            }
        }
        self.running.send_replace(false);
        Ok(())
    }

    async fn stop(&self, scheduled: bool) {
        tracing::debug!(worker = self.name, scheduled, "Worker stop requested");
        self.stop_requested.store(true, Ordering::SeqCst);

        let mut rx = self.running.subscribe();
        let _ = rx.wait_for(|&running| !running).await;
    }

    async fn close(&self) {
        tracing::debug!(worker = self.name, "Worker closed");
    }
}

/// Demo pipeline: builds queue workers over one shared queue
struct QueuePipeline {
    name: String,
    config: PipelineConfig,
    queue: Arc<WorkQueue>,
    processed: Arc<AtomicU64>,
    next_worker: AtomicU32,
}

impl QueuePipeline {
    fn new(name: String, config: PipelineConfig) -> Self {
        Self {
            name,
            config,
            queue: Arc::new(WorkQueue::new()),
            processed: Arc::new(AtomicU64::new(0)),
            next_worker: AtomicU32::new(0),
        }
    }

    fn probe(&self) -> QueueLengthProbe {
        let queue = self.queue.clone();
        Arc::new(move || queue.len())
    }
}

#[async_trait]
impl Pipeline for QueuePipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> &PipelineConfig {
        &self.config
    }

    async fn get_instance(
        &self,
        _ctx: &Arc<PipelineContext>,
        _statistics: &Arc<PipelineStatistics>,
        _model: &Arc<Model>,
    ) -> Result<Arc<dyn Worker>> {
        let id = self.next_worker.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(QueueWorker::new(
            format!("{}-{}", self.name, id),
            self.queue.clone(),
            self.processed.clone(),
        )))
    }
}

fn default_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.pipelines.insert(
        "demo".to_string(),
        PipelineConfig {
            parallelism: 0,
            scaling: ScalingPolicy {
                max_parallelism: 32,
                ..ScalingPolicy::default()
            },
        },
    );
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    tracing::info!("flowgate v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = if std::path::Path::new(&cli.config).exists() {
        tracing::info!(config = cli.config, "Loading configuration");
        EngineConfig::from_file(&cli.config).await?
    } else {
        tracing::warn!("Config file not found, using defaults");
        default_config()
    };
    config.validate()?;

    // Register one demo pipeline per configured pipeline
    let model = Arc::new(Model::new());
    let mut pipelines = Vec::new();
    for (name, pipeline_config) in &config.pipelines {
        let pipeline = Arc::new(QueuePipeline::new(name.clone(), pipeline_config.clone()));
        model.register(pipeline.clone())?;
        pipelines.push(pipeline);
    }

    let registry = Arc::new(SchedulerRegistry::new(model));
    registry.start_all().await?;

    // Feed each queue and fire the source trigger, like a real source would
    for pipeline in &pipelines {
        let Some(trigger) = registry.source_trigger(pipeline.name()) else {
            continue;
        };
        let queue = pipeline.queue.clone();
        let probe = pipeline.probe();
        let burst = cli.burst.max(1);

        tokio::spawn(async move {
            let mut item = 0u64;
            let mut ticker = tokio::time::interval(Duration::from_millis(250));
            loop {
                ticker.tick().await;
                for _ in 0..burst.div_ceil(4) {
                    queue.push(item);
                    item += 1;
                }
                trigger("generator", probe.clone());
            }
        });
    }

    // Periodic pool report
    {
        let registry = registry.clone();
        let names: Vec<String> = pipelines.iter().map(|p| p.name().to_string()).collect();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(2));
            loop {
                ticker.tick().await;
                for name in &names {
                    if let Some(statistics) = registry.statistics(name) {
                        let snapshot = statistics.snapshot();
                        tracing::info!(
                            pipeline = name,
                            parallelism = snapshot.parallelism,
                            spawned = snapshot.workers_spawned,
                            retired = snapshot.workers_retired,
                            "Pool status"
                        );
                    }
                }
            }
        });
    }

    tracing::info!("Engine running — press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down");
    registry.stop_all().await;

    for pipeline in &pipelines {
        tracing::info!(
            pipeline = pipeline.name(),
            processed = pipeline.processed.load(Ordering::Relaxed),
            remaining = pipeline.queue.len(),
            "Final pipeline totals"
        );
    }

    Ok(())
}
