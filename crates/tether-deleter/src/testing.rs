use async_trait::async_trait;
use std::time::Duration;
use tether_core::{DeleteRequest, Result, ShortCode, StoreError, Tombstoner};
use tokio::sync::mpsc;

/// Reports every commit attempt on a channel.
///
/// A failing tombstoner still reports the batch it was handed before
/// returning its error. A slow one reports only once the delay has passed.
pub(crate) struct RecordingTombstoner {
    batches: mpsc::UnboundedSender<Vec<DeleteRequest>>,
    fail: bool,
    delay: Duration,
}

impl RecordingTombstoner {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Vec<DeleteRequest>>) {
        let (batches, rx) = mpsc::unbounded_channel();
        let tombstoner = Self {
            batches,
            fail: false,
            delay: Duration::ZERO,
        };
        (tombstoner, rx)
    }

    pub(crate) fn failing() -> (Self, mpsc::UnboundedReceiver<Vec<DeleteRequest>>) {
        let (mut tombstoner, rx) = Self::new();
        tombstoner.fail = true;
        (tombstoner, rx)
    }

    pub(crate) fn slow(delay: Duration) -> (Self, mpsc::UnboundedReceiver<Vec<DeleteRequest>>) {
        let (mut tombstoner, rx) = Self::new();
        tombstoner.delay = delay;
        (tombstoner, rx)
    }
}

#[async_trait]
impl Tombstoner for RecordingTombstoner {
    async fn commit_deletes(&self, batch: &[DeleteRequest]) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let _ = self.batches.send(batch.to_vec());
        if self.fail {
            return Err(StoreError::Query("injected failure".to_string()));
        }
        Ok(())
    }
}

pub(crate) fn request(user: &str, n: usize) -> DeleteRequest {
    DeleteRequest::new(user, ShortCode::new_unchecked(format!("code{n}")))
}

pub(crate) fn codes(n: usize) -> Vec<ShortCode> {
    (0..n)
        .map(|i| ShortCode::new_unchecked(format!("code{i}")))
        .collect()
}
