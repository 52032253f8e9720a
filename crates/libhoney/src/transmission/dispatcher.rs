//! Dispatcher pool - bounded concurrent batch delivery
//!
//! A fixed set of workers consumes sealed batches from the shared ready
//! queue and hands each to the batch sender synchronously, so the pool
//! width is exactly the bound on in-flight HTTP requests. Workers exit
//! once the ready queue is closed and drained.

use std::sync::Arc;

use async_trait::async_trait;
use crossfire::MAsyncRx;
use tokio::task::JoinHandle;

use crate::transmission::batcher::Batch;

/// Consumer of sealed batches.
///
/// The production implementation is the HTTP sender; tests substitute a
/// capture to observe batches exactly as the pool would deliver them.
#[async_trait]
pub(crate) trait BatchSender: Send + Sync {
    /// Deliver one batch and report its per-event outcomes.
    async fn send_batch(&self, batch: Batch);
}

/// Spawn `count` workers draining the ready queue into the sender.
///
/// `count` may be zero, in which case dispatch is suspended and sealed
/// batches back up in the ready queue until shutdown sheds them.
pub(crate) fn spawn_workers(
    count: usize,
    ready_rx: MAsyncRx<Batch>,
    sender: Arc<dyn BatchSender>,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|worker_id| {
            let ready_rx = ready_rx.clone();
            let sender = Arc::clone(&sender);
            tokio::spawn(async move {
                tracing::trace!(worker_id, "dispatcher worker starting");
                while let Ok(batch) = ready_rx.recv().await {
                    sender.send_batch(batch).await;
                }
                tracing::trace!(worker_id, "dispatcher worker stopping");
            })
        })
        .collect()
}
