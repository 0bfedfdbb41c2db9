//! Time-or-size batching over bounded channels
//!
//! Every pipeline in cyanite drains its ingress channel through the same
//! primitive: collect up to `size` items, or whatever arrived within
//! `interval` of the first item, whichever trips first.

use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use tokio::time::Instant;

/// Await the next batch from `rx`.
///
/// Blocks until at least one item is available, then collects further items
/// until either `size` items are gathered or `interval` has elapsed since
/// the first item. Returns `None` once the channel is closed and fully
/// drained, so callers can use it as a loop condition that doubles as a
/// shutdown drain.
pub(crate) async fn next_batch<T>(
    rx: &mut Receiver<T>,
    size: usize,
    interval: Duration,
) -> Option<Vec<T>> {
    let first = rx.recv().await?;
    let mut batch = Vec::with_capacity(size.min(64));
    batch.push(first);

    let deadline = Instant::now() + interval;
    while batch.len() < size {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(item)) => batch.push(item),
            // Channel closed: emit what we have, the next call returns None
            Ok(None) => break,
            // Interval elapsed
            Err(_) => break,
        }
    }

    Some(batch)
}
