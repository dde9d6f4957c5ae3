//! Dedicated inference thread

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use preprocess::InputTensor;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::backend::ModelBackend;
use crate::engine::InferenceRun;
use crate::outputs::ModelOutputs;
use crate::InferenceError;

/// A queued inference request
pub(crate) struct Job {
    pub input: InputTensor,
    pub enqueued: Instant,
    pub deadline: Instant,
    pub reply: oneshot::Sender<Result<InferenceRun, InferenceError>>,
}

impl Job {
    pub fn new(
        input: InputTensor,
        timeout: Duration,
        reply: oneshot::Sender<Result<InferenceRun, InferenceError>>,
    ) -> Self {
        let enqueued = Instant::now();
        Self {
            input,
            enqueued,
            deadline: enqueued + timeout,
            reply,
        }
    }
}

/// Spawn the worker that owns the backend for its whole life.
///
/// The thread exits once every sender is dropped and the queue drains.
pub(crate) fn spawn(
    mut backend: Box<dyn ModelBackend>,
    mut jobs: mpsc::Receiver<Job>,
    timeout_ms: u64,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("inference-worker".to_string())
        .spawn(move || {
            info!("Inference worker started ({})", backend.name());
            while let Some(job) = jobs.blocking_recv() {
                process(backend.as_mut(), job, timeout_ms);
            }
            info!("Inference worker stopped");
        })
}

fn process(backend: &mut dyn ModelBackend, job: Job, timeout_ms: u64) {
    if job.reply.is_closed() {
        debug!("Skipping inference job abandoned by its caller");
        return;
    }
    let queued = job.enqueued.elapsed();
    if Instant::now() >= job.deadline {
        warn!("Inference job expired after {}ms in queue", queued.as_millis());
        let _ = job.reply.send(Err(InferenceError::Timeout(timeout_ms)));
        return;
    }

    let started = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| backend.run(&job.input))).unwrap_or_else(|_| {
        error!("Model backend panicked during inference");
        Err(InferenceError::InferenceFailed("model backend panicked".to_string()))
    });
    let elapsed = started.elapsed();

    let result = result.and_then(ModelOutputs::from_raw).map(|outputs| InferenceRun {
        outputs,
        elapsed,
        queued,
    });
    debug!(
        "Inference finished in {}ms (queued {}ms)",
        elapsed.as_millis(),
        queued.as_millis()
    );

    if job.reply.send(result).is_err() {
        debug!("Caller went away before inference finished");
    }
}
