//! Dynamic scheduler — autoscaling against source queue pressure
//!
//! Three control loops share the pool:
//! - the *launcher* consumes input events and grows the pool,
//! - the *spawner* sweeps all registered probes once per tick to catch
//!   triggers that were dropped or never sent,
//! - the *shrinker* retires one worker per tick while every probe reads
//!   empty.
//!
//! Triggers carry which source saw input and are debounced per source; the
//! sweep is stateless catch-up; the shrinker is deliberately slow. Growth
//! shortly after a shrink is boosted, treating the shrink as evidence the
//! pool was cut below its real working parallelism.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::pipeline::{Pipeline, QueueLengthProbe, SourceTrigger, SpawnContext};
use crate::scheduler::core::SchedulerCore;
use crate::scheduler::Scheduler;

/// Buffer for trigger events, sized to absorb triggers arriving before the
/// scheduler starts. Full means busy: triggers are dropped and the spawner
/// sweep redresses.
const LAUNCH_CHANNEL_CAPACITY: usize = 128;

/// One unit of scheduling input. Trigger events carry the originating source
/// and its probe; sweep events from the spawner carry neither.
struct InputEvent {
    source: Option<(String, QueueLengthProbe)>,
    queue_length: u32,
}

/// Launch/shrink timestamps shared between the launcher and the shrinker.
#[derive(Default)]
struct ScaleTimes {
    launch: StdRwLock<Option<Instant>>,
    shrink: StdRwLock<Option<Instant>>,
}

impl ScaleTimes {
    fn mark_launch(&self) {
        *self.launch.write().unwrap() = Some(Instant::now());
    }

    fn mark_shrink(&self) {
        *self.shrink.write().unwrap() = Some(Instant::now());
    }

    fn launched_within(&self, window: Duration) -> bool {
        self.launch
            .read()
            .unwrap()
            .is_some_and(|t| t.elapsed() < window)
    }

    fn shrunk_within(&self, window: Duration) -> bool {
        self.shrink
            .read()
            .unwrap()
            .is_some_and(|t| t.elapsed() < window)
    }
}

type ProbeRegistry = StdRwLock<HashMap<String, QueueLengthProbe>>;

/// Await until a stop signal's value becomes `true`. Kept separate so the
/// borrowed `watch::Ref` never has to live across an `.await` point inside a
/// `tokio::select!` branch, which would make the surrounding future `!Send`.
async fn wait_for_stop(stop: &mut watch::Receiver<bool>) {
    while stop.changed().await.is_ok() {
        if *stop.borrow() {
            return;
        }
    }
}

/// Sum the queue lengths across all registered probes. An addition that
/// would wrap is dropped from the sum, leaving the running total unchanged.
fn sum_queue_length(getters: &ProbeRegistry) -> u32 {
    let getters = getters.read().unwrap();
    let mut total = 0u32;
    for probe in getters.values() {
        if let Some(next) = total.checked_add(probe()) {
            total = next;
        }
    }
    total
}

/// Scheduler that autoscales its worker pool between the policy floor and
/// cap, driven by source triggers and probe sweeps.
pub struct DynamicScheduler {
    core: Arc<SchedulerCore>,
    launch_tx: StdMutex<Option<mpsc::Sender<InputEvent>>>,
    launch_weak: mpsc::WeakSender<InputEvent>,
    launch_rx: StdMutex<Option<mpsc::Receiver<InputEvent>>>,
    getters: Arc<ProbeRegistry>,
    times: Arc<ScaleTimes>,
    spawn_stop: watch::Sender<bool>,
    shrink_stop: watch::Sender<bool>,
    spawn_done_tx: StdMutex<Option<watch::Sender<bool>>>,
    spawn_done_rx: watch::Receiver<bool>,
}

impl DynamicScheduler {
    pub fn new(pipeline: Arc<dyn Pipeline>) -> Self {
        let (launch_tx, launch_rx) = mpsc::channel(LAUNCH_CHANNEL_CAPACITY);
        let (spawn_stop, _) = watch::channel(false);
        let (shrink_stop, _) = watch::channel(false);
        let (spawn_done_tx, spawn_done_rx) = watch::channel(false);

        Self {
            core: Arc::new(SchedulerCore::new(pipeline)),
            launch_weak: launch_tx.downgrade(),
            launch_tx: StdMutex::new(Some(launch_tx)),
            launch_rx: StdMutex::new(Some(launch_rx)),
            getters: Arc::new(StdRwLock::new(HashMap::new())),
            times: Arc::new(ScaleTimes::default()),
            spawn_stop,
            shrink_stop,
            spawn_done_tx: StdMutex::new(Some(spawn_done_tx)),
            spawn_done_rx,
        }
    }
}

#[async_trait]
impl Scheduler for DynamicScheduler {
    fn pipeline_name(&self) -> &str {
        self.core.pipeline_name()
    }

    /// The trigger evaluates the probe inline and posts non-blockingly, so
    /// sources are never held up by a busy launcher.
    fn source_input_trigger(&self) -> SourceTrigger {
        let core = self.core.clone();
        let weak = self.launch_weak.clone();

        Arc::new(move |source_name: &str, probe: QueueLengthProbe| {
            let queue_length = probe();
            if queue_length == 0 {
                return; // current parallelism is enough
            }
            if core.is_stopped() {
                return;
            }
            let Some(tx) = weak.upgrade() else {
                return; // channel closed during shutdown
            };

            let event = InputEvent {
                source: Some((source_name.to_string(), probe)),
                queue_length,
            };
            // Full means busy: drop, the spawner sweep redresses.
            let _ = tx.try_send(event);
        })
    }

    async fn start(&self, spawn_ctx: SpawnContext) {
        if !self.core.mark_started() {
            return; // already started
        }

        self.core.book_context(spawn_ctx);

        let init = self.core.policy().init_parallelism;
        let (total, _) = self.core.start_pipeline(init).await;
        tracing::debug!(
            pipeline = self.pipeline_name(),
            total,
            "Initialized dynamic worker pool"
        );

        let Some(launch_rx) = self.launch_rx.lock().unwrap().take() else {
            return;
        };
        tokio::spawn(launch_loop(
            self.core.clone(),
            launch_rx,
            self.getters.clone(),
            self.times.clone(),
        ));

        if let (Some(launch_tx), Some(spawn_done)) = (
            self.launch_tx.lock().unwrap().clone(),
            self.spawn_done_tx.lock().unwrap().take(),
        ) {
            tokio::spawn(spawn_loop(
                self.core.clone(),
                launch_tx,
                self.getters.clone(),
                self.spawn_stop.subscribe(),
                spawn_done,
            ));
        }

        tokio::spawn(shrink_loop(
            self.core.clone(),
            self.getters.clone(),
            self.times.clone(),
            self.shrink_stop.subscribe(),
        ));
    }

    /// Halts the three control loops. Worker teardown stays with
    /// `stop_pipeline`, which the registry calls afterwards.
    async fn stop(&self) {
        if !self.core.mark_stopped() {
            return; // already stopped
        }

        self.spawn_stop.send_replace(true);
        self.shrink_stop.send_replace(true);

        // Once the spawner confirms exit, no further events can be posted.
        let spawner_running = self.spawn_done_tx.lock().unwrap().is_none();
        if spawner_running {
            let mut done = self.spawn_done_rx.clone();
            let _ = done.wait_for(|&exited| exited).await;
        }

        // Drop the engine-side sender; with the spawner's copy gone the
        // channel closes and the launcher drains out.
        self.launch_tx.lock().unwrap().take();

        self.core.clear_started();
    }

    async fn stop_pipeline(&self) {
        self.core.stop_pipeline().await;
    }
}

/// Launcher: consumes input events in FIFO order and grows the pool.
///
/// Being the sole consumer, it serialises the per-source schedule ledger,
/// probe registration, and launch-time updates without further locking.
async fn launch_loop(
    core: Arc<SchedulerCore>,
    mut launch_rx: mpsc::Receiver<InputEvent>,
    getters: Arc<ProbeRegistry>,
    times: Arc<ScaleTimes>,
) {
    let mut last_schedule_times: HashMap<String, Instant> = HashMap::new();

    while let Some(event) = launch_rx.recv().await {
        let now = Instant::now();
        let mut queue_length = event.queue_length;

        match event.source {
            Some((source_name, probe)) => {
                // Per-source debounce: worker scheduling needs time to bite.
                if let Some(last) = last_schedule_times.get(&source_name) {
                    if now.duration_since(*last) < core.policy().spawn_min_interval() {
                        continue;
                    }
                }
                last_schedule_times.insert(source_name.clone(), now);

                // First-seen registration for the spawner and shrinker sweeps.
                getters
                    .write()
                    .unwrap()
                    .entry(source_name)
                    .or_insert(probe);
            }
            None => {
                // A sweep serves every source: restart all debounce windows.
                for last in last_schedule_times.values_mut() {
                    *last = now;
                }
            }
        }

        // A growth request close on the heels of a shrink suggests the
        // shrink undershot the real parallelism: scale up aggressively.
        if times.shrunk_within(core.policy().fast_scale_interval()) {
            let boosted = (f64::from(queue_length) * core.policy().fast_scale_ratio).ceil() as u32;
            let boosted = boosted.max(core.policy().fast_scale_min_count);
            if boosted > queue_length {
                queue_length = boosted;
            }
        }

        queue_length = queue_length.min(core.policy().spawn_max_in_each);

        let (total, added) = core.start_pipeline(queue_length).await;
        if added > 0 {
            times.mark_launch();
            tracing::debug!(
                pipeline = core.pipeline_name(),
                total,
                increase = added,
                "Spawned pipeline workers"
            );
        }
    }
}

/// Spawner: once per tick, sums all registered probes and posts the total as
/// an authoritative catch-up event. The send blocks; unlike triggers this
/// signal must not be dropped.
async fn spawn_loop(
    core: Arc<SchedulerCore>,
    launch_tx: mpsc::Sender<InputEvent>,
    getters: Arc<ProbeRegistry>,
    mut stop: watch::Receiver<bool>,
    done: watch::Sender<bool>,
) {
    let tick = core.policy().spawn_tick();
    let mut ticker = interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if core.worker_count().await >= core.policy().max_parallelism {
                    continue; // pool is at the cap
                }

                let queue_length = sum_queue_length(&getters);
                if queue_length == 0 {
                    continue; // current parallelism is enough
                }

                let event = InputEvent { source: None, queue_length };
                if launch_tx.send(event).await.is_err() {
                    break; // launcher gone
                }
            }
            _ = wait_for_stop(&mut stop) => break,
        }
    }

    drop(launch_tx);
    done.send_replace(true);
}

/// Shrinker: once per tick, retires the tail worker when every probe reads
/// empty, respecting the floor and the post-launch cooldown. One worker per
/// tick keeps transient emptiness from cliff-shrinking the pool.
async fn shrink_loop(
    core: Arc<SchedulerCore>,
    getters: Arc<ProbeRegistry>,
    times: Arc<ScaleTimes>,
    mut stop: watch::Receiver<bool>,
) {
    let tick = core.policy().shrink_tick();
    let mut ticker = interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let min = core.policy().min_parallelism;
                if core.worker_count().await <= min {
                    continue; // keep the floor
                }
                if sum_queue_length(&getters) != 0 {
                    continue; // pressure remains
                }

                let cooldown = core.policy().shrink_min_delay();
                // Re-check the count under the write lock; freshly launched
                // workers get the cooldown to start draining.
                let popped = core
                    .pop_tail_worker(|count| count > min && !times.launched_within(cooldown))
                    .await;
                let Some((idx, handle)) = popped else {
                    continue;
                };

                times.mark_shrink();
                core.stop_worker(idx, handle, true).await;

                if let Some(spawn_ctx) = core.context() {
                    spawn_ctx.statistics.record_retired(1);
                }
                let total = core.worker_count().await;
                tracing::info!(
                    pipeline = core.pipeline_name(),
                    total,
                    decrease = 1,
                    "Shrank pipeline worker pool"
                );
            }
            _ = wait_for_stop(&mut stop) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PipelineConfig, ScalingPolicy};
    use crate::scheduler::testing::{spawn_context, FakePipeline};
    use std::sync::atomic::{AtomicU32, Ordering};

    const HOUR_MS: u64 = 3_600_000;

    #[test]
    fn test_sum_queue_length_drops_wrapping_additions() {
        let getters: ProbeRegistry = StdRwLock::new(HashMap::new());
        {
            let mut map = getters.write().unwrap();
            map.insert("a".to_string(), Arc::new(|| 10u32) as QueueLengthProbe);
            map.insert("b".to_string(), Arc::new(|| u32::MAX - 5) as QueueLengthProbe);
            map.insert("c".to_string(), Arc::new(|| 7u32) as QueueLengthProbe);
        }

        // Whatever order the probes are visited in, additions that would
        // wrap are discarded and the total never jumps to u32::MAX: either
        // the small probes accumulate (17) or the huge one lands first and
        // the rest are dropped (u32::MAX - 5).
        let total = sum_queue_length(&getters);
        assert!(total == 17 || total == u32::MAX - 5);
    }

    #[test]
    fn test_sum_queue_length_empty_registry() {
        let getters: ProbeRegistry = StdRwLock::new(HashMap::new());
        assert_eq!(sum_queue_length(&getters), 0);
    }

    fn dynamic_pipeline(scaling: ScalingPolicy) -> Arc<FakePipeline> {
        Arc::new(FakePipeline::new(
            "access",
            PipelineConfig {
                parallelism: 0,
                scaling,
            },
        ))
    }

    /// Probe backed by a shared counter the test can adjust.
    fn adjustable_probe(initial: u32) -> (Arc<AtomicU32>, QueueLengthProbe) {
        let value = Arc::new(AtomicU32::new(initial));
        let probe_value = value.clone();
        let probe: QueueLengthProbe = Arc::new(move || probe_value.load(Ordering::SeqCst));
        (value, probe)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_spawns_init_parallelism() {
        let pipeline = dynamic_pipeline(ScalingPolicy {
            init_parallelism: 2,
            ..ScalingPolicy::default()
        });
        let scheduler = DynamicScheduler::new(pipeline.clone());

        scheduler.start(spawn_context("access")).await;
        assert_eq!(pipeline.created_count(), 2);

        // Idempotent start.
        scheduler.start(spawn_context("access")).await;
        assert_eq!(pipeline.created_count(), 2);

        scheduler.stop().await;
        scheduler.stop_pipeline().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_grows_pool_by_queue_length() {
        let pipeline = dynamic_pipeline(ScalingPolicy {
            init_parallelism: 1,
            max_parallelism: 10,
            spawn_tick_ms: HOUR_MS,
            shrink_tick_ms: HOUR_MS,
            ..ScalingPolicy::default()
        });
        let scheduler = DynamicScheduler::new(pipeline.clone());
        scheduler.start(spawn_context("access")).await;

        let trigger = scheduler.source_input_trigger();
        let (_, probe) = adjustable_probe(4);
        trigger("files", probe);
        settle().await;

        assert_eq!(pipeline.created_count(), 5);

        scheduler.stop().await;
        scheduler.stop_pipeline().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_ignores_empty_queue() {
        let pipeline = dynamic_pipeline(ScalingPolicy {
            spawn_tick_ms: HOUR_MS,
            shrink_tick_ms: HOUR_MS,
            ..ScalingPolicy::default()
        });
        let scheduler = DynamicScheduler::new(pipeline.clone());
        scheduler.start(spawn_context("access")).await;

        let trigger = scheduler.source_input_trigger();
        let (_, probe) = adjustable_probe(0);
        trigger("files", probe);
        settle().await;

        assert_eq!(pipeline.created_count(), 1);

        scheduler.stop().await;
        scheduler.stop_pipeline().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_source_debounce() {
        let pipeline = dynamic_pipeline(ScalingPolicy {
            init_parallelism: 1,
            max_parallelism: 100,
            spawn_min_interval_ms: 500,
            spawn_tick_ms: HOUR_MS,
            shrink_tick_ms: HOUR_MS,
            ..ScalingPolicy::default()
        });
        let scheduler = DynamicScheduler::new(pipeline.clone());
        scheduler.start(spawn_context("access")).await;

        let trigger = scheduler.source_input_trigger();
        let (_, probe) = adjustable_probe(3);

        trigger("files", probe.clone());
        settle().await;
        assert_eq!(pipeline.created_count(), 4);

        // Inside the debounce window: skipped entirely.
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger("files", probe.clone());
        settle().await;
        assert_eq!(pipeline.created_count(), 4);

        // A different source has its own window.
        let (_, other_probe) = adjustable_probe(2);
        trigger("socket", other_probe);
        settle().await;
        assert_eq!(pipeline.created_count(), 6);

        // Past the window: accepted again.
        tokio::time::sleep(Duration::from_millis(600)).await;
        trigger("files", probe);
        settle().await;
        assert_eq!(pipeline.created_count(), 9);

        scheduler.stop().await;
        scheduler.stop_pipeline().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawner_sweep_catches_steady_pressure() {
        let pipeline = dynamic_pipeline(ScalingPolicy {
            init_parallelism: 1,
            max_parallelism: 20,
            spawn_tick_ms: 1000,
            shrink_tick_ms: HOUR_MS,
            ..ScalingPolicy::default()
        });
        let scheduler = DynamicScheduler::new(pipeline.clone());
        scheduler.start(spawn_context("access")).await;

        let trigger = scheduler.source_input_trigger();
        let (value, probe) = adjustable_probe(7);
        trigger("files", probe);
        settle().await;
        assert_eq!(pipeline.created_count(), 8);

        // No further triggers, but the queue stays non-empty: the sweep
        // posts the probe total as a catch-up event.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(pipeline.created_count(), 15);

        // Once drained, sweeps go quiet.
        value.store(0, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(pipeline.created_count(), 15);

        scheduler.stop().await;
        scheduler.stop_pipeline().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrink_tapers_to_floor() {
        let pipeline = dynamic_pipeline(ScalingPolicy {
            init_parallelism: 3,
            min_parallelism: 1,
            spawn_tick_ms: HOUR_MS,
            shrink_tick_ms: 1000,
            ..ScalingPolicy::default()
        });
        let scheduler = DynamicScheduler::new(pipeline.clone());
        let spawn_ctx = spawn_context("access");
        scheduler.start(spawn_ctx.clone()).await;
        assert_eq!(spawn_ctx.statistics.parallelism(), 3);

        // One worker retired per tick, down to the floor.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(spawn_ctx.statistics.parallelism(), 2);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(spawn_ctx.statistics.parallelism(), 1);

        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(spawn_ctx.statistics.parallelism(), 1);
        assert_eq!(spawn_ctx.statistics.snapshot().workers_retired, 2);

        scheduler.stop().await;
        scheduler.stop_pipeline().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrink_respects_post_launch_cooldown() {
        let pipeline = dynamic_pipeline(ScalingPolicy {
            init_parallelism: 1,
            min_parallelism: 1,
            shrink_min_delay_ms: 500,
            spawn_tick_ms: HOUR_MS,
            shrink_tick_ms: 200,
            ..ScalingPolicy::default()
        });
        let scheduler = DynamicScheduler::new(pipeline.clone());
        let spawn_ctx = spawn_context("access");
        scheduler.start(spawn_ctx.clone()).await;

        let trigger = scheduler.source_input_trigger();
        let (value, probe) = adjustable_probe(2);
        trigger("files", probe);
        settle().await;
        assert_eq!(spawn_ctx.statistics.parallelism(), 3);

        // Queue drains right away, but the launch is fresher than the
        // cooldown: ticks inside the window must not shrink.
        value.store(0, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(spawn_ctx.statistics.parallelism(), 3);

        // First tick past the cooldown retires one worker.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(spawn_ctx.statistics.parallelism(), 2);

        scheduler.stop().await;
        scheduler.stop_pipeline().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_scale_after_recent_shrink() {
        let pipeline = dynamic_pipeline(ScalingPolicy {
            init_parallelism: 2,
            min_parallelism: 1,
            max_parallelism: 20,
            fast_scale_interval_ms: 1000,
            fast_scale_min_count: 5,
            spawn_tick_ms: HOUR_MS,
            shrink_tick_ms: 1000,
            ..ScalingPolicy::default()
        });
        let scheduler = DynamicScheduler::new(pipeline.clone());
        let spawn_ctx = spawn_context("access");
        scheduler.start(spawn_ctx.clone()).await;

        // Idle pool: first shrink tick retires one worker and stamps the
        // shrink time.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(spawn_ctx.statistics.parallelism(), 1);

        // Growth inside the fast-scale window is boosted to at least
        // max(5, ceil(3 * 1.2)).
        let trigger = scheduler.source_input_trigger();
        let (value, probe) = adjustable_probe(3);
        trigger("files", probe);
        value.store(0, Ordering::SeqCst);
        settle().await;
        assert_eq!(spawn_ctx.statistics.parallelism(), 6);

        scheduler.stop().await;
        scheduler.stop_pipeline().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_triggers_before_start_are_buffered() {
        let pipeline = dynamic_pipeline(ScalingPolicy {
            init_parallelism: 1,
            max_parallelism: 10,
            spawn_tick_ms: HOUR_MS,
            shrink_tick_ms: HOUR_MS,
            ..ScalingPolicy::default()
        });
        let scheduler = DynamicScheduler::new(pipeline.clone());

        // The channel buffers triggers posted before start; overflow beyond
        // the capacity is dropped without blocking the caller.
        let trigger = scheduler.source_input_trigger();
        let (_, probe) = adjustable_probe(4);
        for _ in 0..200 {
            trigger("files", probe.clone());
        }

        scheduler.start(spawn_context("access")).await;
        settle().await;

        // One buffered event is accepted; the rest fall to the debounce.
        assert_eq!(pipeline.created_count(), 5);

        scheduler.stop().await;
        scheduler.stop_pipeline().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_control_loops() {
        let pipeline = dynamic_pipeline(ScalingPolicy {
            init_parallelism: 1,
            spawn_tick_ms: 1000,
            shrink_tick_ms: 1000,
            ..ScalingPolicy::default()
        });
        let scheduler = DynamicScheduler::new(pipeline.clone());
        scheduler.start(spawn_context("access")).await;

        scheduler.stop().await;
        scheduler.stop().await; // idempotent

        // Triggers after stop are dropped at the door.
        let trigger = scheduler.source_input_trigger();
        let (_, probe) = adjustable_probe(9);
        trigger("files", probe);
        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(pipeline.created_count(), 1);

        // Teardown stays with stop_pipeline.
        let workers = pipeline.workers();
        assert_eq!(workers[0].closes(), 0);
        scheduler.stop_pipeline().await;
        assert_eq!(workers[0].closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_resets_debounce_windows() {
        let pipeline = dynamic_pipeline(ScalingPolicy {
            init_parallelism: 1,
            max_parallelism: 100,
            spawn_min_interval_ms: 500,
            spawn_tick_ms: 1000,
            shrink_tick_ms: HOUR_MS,
            ..ScalingPolicy::default()
        });
        let scheduler = DynamicScheduler::new(pipeline.clone());
        scheduler.start(spawn_context("access")).await;

        let trigger = scheduler.source_input_trigger();
        let (value, probe) = adjustable_probe(2);
        trigger("files", probe.clone());
        settle().await;
        assert_eq!(pipeline.created_count(), 3);

        // The sweep at t=1000ms serves every source and restarts its
        // debounce window, so a trigger at t=1200ms is still rate-limited
        // even though 500ms have passed since the last accepted trigger.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let after_sweep = pipeline.created_count();
        value.store(0, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let (_, late_probe) = adjustable_probe(4);
        trigger("files", late_probe);
        settle().await;
        assert_eq!(pipeline.created_count(), after_sweep);

        scheduler.stop().await;
        scheduler.stop_pipeline().await;
    }
}
