//! Inference Engine Implementation

use std::sync::Mutex;
use std::thread::JoinHandle;
use std::time::Duration;

use preprocess::InputTensor;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::handle::{ModelHandle, ModelInfo};
use crate::outputs::ModelOutputs;
use crate::worker::{self, Job};
use crate::InferenceError;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum jobs waiting for the worker
    pub queue_depth: usize,
    /// How long a caller waits for its result, queueing included
    pub wait_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_depth: 8,
            wait_timeout_ms: 120_000,
        }
    }
}

/// Result of one model execution
#[derive(Debug, Clone)]
pub struct InferenceRun {
    /// Named model outputs
    pub outputs: ModelOutputs,
    /// Time spent inside the model
    pub elapsed: Duration,
    /// Time spent waiting in the queue
    pub queued: Duration,
}

/// Serialized access to the loaded model.
///
/// Every call goes through one worker thread, so at most one inference runs
/// at a time. Shared behind an `Arc` by request handlers.
pub struct InferenceEngine {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    info: ModelInfo,
    config: EngineConfig,
}

impl InferenceEngine {
    /// Start the engine for a model handle.
    ///
    /// An unloaded handle gives an engine that refuses every request with
    /// [`InferenceError::ModelNotLoaded`].
    pub fn start(handle: ModelHandle, config: EngineConfig) -> Self {
        let (backend, mut info) = handle.into_parts();
        let mut sender = None;
        let mut worker = None;

        if let Some(backend) = backend {
            let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
            match worker::spawn(backend, rx, config.wait_timeout_ms) {
                Ok(join) => {
                    info!(
                        "Inference engine started (queue depth {}, timeout {}ms)",
                        config.queue_depth, config.wait_timeout_ms
                    );
                    sender = Some(tx);
                    worker = Some(join);
                }
                Err(e) => {
                    error!("Failed to spawn inference worker: {}", e);
                    info.loaded = false;
                }
            }
        } else {
            warn!("Inference engine started without a model");
        }

        Self {
            sender: Mutex::new(sender),
            worker: Mutex::new(worker),
            info,
            config,
        }
    }

    /// Check if a model is loaded
    pub fn is_loaded(&self) -> bool {
        self.info.loaded
    }

    /// Model metadata
    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fail fast when no model is resident
    pub fn ensure_loaded(&self) -> Result<(), InferenceError> {
        if self.info.loaded {
            Ok(())
        } else {
            Err(InferenceError::ModelNotLoaded)
        }
    }

    /// Run the model on one input.
    ///
    /// Fails with `QueueFull` when the queue is at capacity and `Timeout`
    /// when no result arrives within the configured wait. A timed out job
    /// is dropped by the worker without running.
    pub async fn infer(&self, input: InputTensor) -> Result<InferenceRun, InferenceError> {
        self.ensure_loaded()?;
        let sender = self
            .sender
            .lock()
            .map_err(|_| InferenceError::WorkerStopped)?
            .clone()
            .ok_or(InferenceError::WorkerStopped)?;

        let timeout = Duration::from_millis(self.config.wait_timeout_ms);
        let (reply_tx, reply_rx) = oneshot::channel();
        sender
            .try_send(Job::new(input, timeout, reply_tx))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    warn!("Inference queue full, rejecting request");
                    InferenceError::QueueFull(self.config.queue_depth)
                }
                mpsc::error::TrySendError::Closed(_) => InferenceError::WorkerStopped,
            })?;
        drop(sender);

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(InferenceError::WorkerStopped),
            Err(_) => {
                warn!("Inference timed out after {}ms", self.config.wait_timeout_ms);
                Err(InferenceError::Timeout(self.config.wait_timeout_ms))
            }
        }
    }

    /// Close the queue and wait for the worker to finish pending jobs
    pub fn shutdown(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        let worker = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(worker) = worker {
            debug!("Waiting for inference worker to exit");
            if worker.join().is_err() {
                error!("Inference worker exited with a panic");
            }
        }
    }
}

impl Drop for InferenceEngine {
    fn drop(&mut self) {
        // Closing the queue lets the worker exit once it drains.
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("info", &self.info)
            .field("config", &self.config)
            .finish()
    }
}
