use crate::config::PipelineConfig;
use crate::coordinator::{CommitErrorPolicy, Coordinator};
use crate::fan_in;
use parking_lot::Mutex;
use std::sync::Arc;
use tether_core::{DeleteRequest, Result, ShortCode, StoreError, Tombstoner};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Runs one pass of the pipeline over `inputs` and returns its outcome.
///
/// All inputs are merged into one stream and buffered. A batch is
/// committed when the buffer reaches the threshold, when the flush timer
/// fires with requests pending, and once more after every input has
/// closed. The first failed commit is returned as `CommitFailed`.
/// Cancellation returns `Cancelled` without committing what is buffered.
pub async fn process<T: Tombstoner + ?Sized>(
    tombstoner: &T,
    config: &PipelineConfig,
    cancel: &CancellationToken,
    inputs: Vec<mpsc::Receiver<DeleteRequest>>,
) -> Result<()> {
    let (merged_tx, merged_rx) = mpsc::channel(config.capacity());

    // Dropped on return, which aborts forwarders still blocked on a full
    // merged channel.
    let mut forwarders = JoinSet::new();
    for input in inputs {
        forwarders.spawn(fan_in::forward(input, merged_tx.clone(), cancel.clone()));
    }
    drop(merged_tx);

    debug!(channels = forwarders.len(), "processing delete requests");

    Coordinator::new(tombstoner, config, cancel, CommitErrorPolicy::Abort)
        .run(merged_rx)
        .await
}

/// How [`DeletionPipeline::shutdown`] treats requests not yet committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Commit everything already accepted, then stop.
    Drain,
    /// Stop now. Buffered requests are dropped.
    Discard,
}

/// A long-lived, detached deletion pipeline.
///
/// [`submit`](Self::submit) hands a call's requests to a forwarder task
/// and returns; one coordinator task batches requests from every call and
/// commits them. A failed batch is logged and dropped, callers resubmit.
/// Dropping the pipeline without [`shutdown`](Self::shutdown) discards
/// pending requests.
pub struct DeletionPipeline {
    intake: Mutex<Option<mpsc::Sender<DeleteRequest>>>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl DeletionPipeline {
    /// Starts the coordinator task.
    pub fn spawn<T: Tombstoner + ?Sized>(tombstoner: Arc<T>, config: PipelineConfig) -> Self {
        let (intake, requests) = mpsc::channel(config.capacity());
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        let task_cancel = cancel.clone();
        tracker.spawn(async move {
            let coordinator = Coordinator::new(
                tombstoner.as_ref(),
                &config,
                &task_cancel,
                CommitErrorPolicy::Continue,
            );
            match coordinator.run(requests).await {
                Ok(()) => info!("delete pipeline drained"),
                Err(StoreError::Cancelled) => warn!("delete pipeline discarded pending requests"),
                Err(err) => error!(error = %err, "delete pipeline stopped"),
            }
        });

        Self {
            intake: Mutex::new(Some(intake)),
            cancel,
            tracker,
        }
    }

    /// Queues tombstones for `codes` owned by `user_id`.
    ///
    /// Returns once the requests sit in their own intake channel, before
    /// any commit. Fails with `Cancelled` after shutdown has begun.
    pub fn submit(&self, user_id: &str, codes: Vec<ShortCode>) -> Result<()> {
        let Some(output) = self.intake.lock().clone() else {
            return Err(StoreError::Cancelled);
        };
        if codes.is_empty() {
            return Ok(());
        }

        let count = codes.len();
        let requests = codes
            .into_iter()
            .map(|code| DeleteRequest::new(user_id, code))
            .collect();
        let input = fan_in::intake(requests).map_err(|e| {
            StoreError::Unavailable(format!("delete intake rejected request: {e}"))
        })?;

        self.tracker
            .spawn(fan_in::forward(input, output, self.cancel.clone()));
        debug!(count, user_id, "queued delete requests");
        Ok(())
    }

    /// A token that fires when the pipeline is discarded.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of tasks still running, coordinator included.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stops intake and waits for every task to finish.
    pub async fn shutdown(&self, mode: ShutdownMode) {
        self.intake.lock().take();
        self.tracker.close();
        if mode == ShutdownMode::Discard {
            self.cancel.cancel();
        }
        self.tracker.wait().await;
        info!(mode = ?mode, "delete pipeline stopped");
    }
}

impl Drop for DeletionPipeline {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for DeletionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionPipeline")
            .field("in_flight", &self.tracker.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
