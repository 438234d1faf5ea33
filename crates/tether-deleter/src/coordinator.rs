use crate::config::PipelineConfig;
use tether_core::{DeleteRequest, Result, StoreError, Tombstoner};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why a buffer was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// The buffer reached the flush threshold.
    Threshold,
    /// The flush timer fired with requests pending.
    Interval,
    /// Every producer finished.
    Drained,
}

/// What the coordinator does after a batch fails to commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitErrorPolicy {
    /// Stop and return the error.
    Abort,
    /// Log, drop the failed batch and keep consuming.
    Continue,
}

/// The buffering loop between the merged request stream and the
/// tombstoner.
///
/// Waits on inbound requests, the flush timer and cancellation in a single
/// `select!`. Cancellation wins ties and abandons whatever is buffered.
pub(crate) struct Coordinator<'a, T: ?Sized> {
    tombstoner: &'a T,
    config: &'a PipelineConfig,
    cancel: &'a CancellationToken,
    policy: CommitErrorPolicy,
}

impl<'a, T: Tombstoner + ?Sized> Coordinator<'a, T> {
    pub(crate) fn new(
        tombstoner: &'a T,
        config: &'a PipelineConfig,
        cancel: &'a CancellationToken,
        policy: CommitErrorPolicy,
    ) -> Self {
        Self {
            tombstoner,
            config,
            cancel,
            policy,
        }
    }

    pub(crate) async fn run(&self, mut requests: mpsc::Receiver<DeleteRequest>) -> Result<()> {
        let threshold = self.config.threshold();
        let period = self.config.interval();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut buffer: Vec<DeleteRequest> = Vec::with_capacity(threshold);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    warn!(buffered = buffer.len(), "delete pipeline cancelled, pending requests dropped");
                    return Err(StoreError::Cancelled);
                }

                request = requests.recv() => match request {
                    Some(request) => {
                        buffer.push(request);
                        if buffer.len() >= threshold {
                            self.flush(&mut buffer, FlushReason::Threshold).await?;
                        }
                    }
                    None => {
                        if !buffer.is_empty() {
                            self.flush(&mut buffer, FlushReason::Drained).await?;
                        }
                        debug!("delete request stream closed");
                        return Ok(());
                    }
                },

                _ = ticker.tick() => {
                    if !buffer.is_empty() {
                        self.flush(&mut buffer, FlushReason::Interval).await?;
                    }
                }
            }
        }
    }

    /// Commits and empties `buffer`. A commit still running when `cancel`
    /// fires is dropped, which rolls its transaction back.
    async fn flush(&self, buffer: &mut Vec<DeleteRequest>, reason: FlushReason) -> Result<()> {
        let count = buffer.len();

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StoreError::Cancelled),
            outcome = self.tombstoner.commit_deletes(buffer.as_slice()) => outcome,
        };

        match outcome {
            Ok(()) => {
                info!(count, reason = ?reason, "committed delete batch");
                buffer.clear();
                Ok(())
            }
            Err(StoreError::Cancelled) => {
                warn!(count, "delete batch commit cancelled");
                Err(StoreError::Cancelled)
            }
            Err(err) => {
                error!(count, reason = ?reason, error = %err, "failed to commit delete batch");
                buffer.clear();
                match self.policy {
                    CommitErrorPolicy::Abort => Err(match err {
                        StoreError::CommitFailed(_) => err,
                        other => StoreError::CommitFailed(other.to_string()),
                    }),
                    CommitErrorPolicy::Continue => Ok(()),
                }
            }
        }
    }
}
