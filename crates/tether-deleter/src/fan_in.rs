use tether_core::DeleteRequest;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Drains `input` into `output` until the input closes, the output is
/// dropped, or `cancel` fires.
pub(crate) async fn forward(
    mut input: mpsc::Receiver<DeleteRequest>,
    output: mpsc::Sender<DeleteRequest>,
    cancel: CancellationToken,
) {
    loop {
        let request = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            request = input.recv() => match request {
                Some(request) => request,
                None => return,
            },
        };

        trace!(code = %request.short_code, user_id = %request.user_id, "forwarding delete request");

        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            sent = output.send(request) => sent,
        };
        if sent.is_err() {
            return;
        }
    }
}

/// Fills a bounded channel sized for `requests` and closes it.
///
/// The receiver yields every request and then `None`, which makes it a
/// ready-made input for [`process`](crate::process).
pub fn intake(
    requests: Vec<DeleteRequest>,
) -> Result<mpsc::Receiver<DeleteRequest>, mpsc::error::TrySendError<DeleteRequest>> {
    let (tx, rx) = mpsc::channel(requests.len().max(1));
    for request in requests {
        tx.try_send(request)?;
    }
    Ok(rx)
}
