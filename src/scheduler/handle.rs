//! Worker handle — owns one worker's run loop and staged teardown

use std::sync::Arc;
use tokio::sync::watch;

use crate::pipeline::Worker;
use crate::stats::PipelineStatistics;

/// Signal halves consumed by the run task when it is spawned.
struct RunParts {
    stop: watch::Receiver<bool>,
    stopped: watch::Receiver<bool>,
    done: watch::Sender<bool>,
}

/// Wraps one worker together with its teardown signalling.
///
/// Three one-shot signals stage the teardown:
/// - `stop` asks the run loop to exit after the current `Worker::run` unwinds.
/// - `stopped` fires once `Worker::stop` has fully returned.
/// - `done` fires after `Worker::close`, and is the public completion handle.
///
/// `Worker::stop` blocks until `run` unwinds, so the request to stop and the
/// completion of stopping are separate signals: the run loop can short-circuit
/// as soon as the current `run` returns, while `close` still happens exactly
/// once, strictly after `stop` has returned.
///
/// Handles are single-use: spawned once, terminated once, never restarted.
pub(crate) struct WorkerHandle {
    worker: Arc<dyn Worker>,
    stop: watch::Sender<bool>,
    stopped: watch::Sender<bool>,
    done: watch::Receiver<bool>,
    run_parts: Option<RunParts>,
}

impl WorkerHandle {
    pub(crate) fn new(worker: Arc<dyn Worker>) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (stopped_tx, stopped_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            worker,
            stop: stop_tx,
            stopped: stopped_tx,
            done: done_rx,
            run_parts: Some(RunParts {
                stop: stop_rx,
                stopped: stopped_rx,
                done: done_tx,
            }),
        }
    }

    /// One-time worker setup; invoked before `spawn_run`.
    pub(crate) async fn prepare(&self) {
        self.worker.prepare().await;
    }

    /// Spawn the owning run task for this worker.
    ///
    /// The task re-enters `Worker::run` until `stop` is requested or a run
    /// returns an error, then waits for `stopped`, closes the worker, and
    /// fires `done`.
    pub(crate) fn spawn_run(&mut self, statistics: Arc<PipelineStatistics>) {
        let Some(parts) = self.run_parts.take() else {
            return; // already spawned
        };
        let worker = self.worker.clone();

        tokio::spawn(async move {
            let RunParts {
                stop,
                mut stopped,
                done,
            } = parts;

            loop {
                if *stop.borrow() {
                    break;
                }
                if let Err(e) = worker.run().await {
                    tracing::error!(
                        worker = worker.name(),
                        error = %e,
                        "Worker run failed, exiting run loop"
                    );
                    statistics.record_run_error();
                    break;
                }
            }

            // Worker::stop must have fully returned before close.
            let _ = stopped.wait_for(|&stopped| stopped).await;
            worker.close().await;
            done.send_replace(true);
        });
    }

    /// Request teardown. Closes `stop`, runs `Worker::stop(scheduled)` on its
    /// own task (it blocks until `run` unwinds), and returns the `done`
    /// signal so the caller can await full teardown.
    pub(crate) fn terminate(self, scheduled: bool) -> watch::Receiver<bool> {
        self.stop.send_replace(true);

        let worker = self.worker;
        let stopped = self.stopped;
        tokio::spawn(async move {
            worker.stop(scheduled).await;
            stopped.send_replace(true);
        });

        self.done
    }
}
