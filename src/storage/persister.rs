//! Background persistence of committed entities.
//!
//! Committed batches go through a bounded channel to a fixed pool of worker
//! tasks. A request only waits for channel capacity, never for the save
//! itself; save failures end up in the counters and the log.

use super::bridge::{DiskTierBridge, SaveReport};
use crate::core::{Entity, Guid, Result, SphynxError};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistencePolicy {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for PersistencePolicy {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistenceStats {
    /// Batches accepted onto the queue.
    pub enqueued: u64,
    /// Entities written to disk.
    pub saved: u64,
    /// Entities whose save failed.
    pub failed: u64,
    /// Batches accepted but not yet fully processed.
    pub pending: usize,
}

struct PersistJob {
    batch: Vec<(Guid, Arc<Entity>)>,
}

#[derive(Default)]
struct QueueCounters {
    enqueued: AtomicU64,
    saved: AtomicU64,
    failed: AtomicU64,
    pending: AtomicUsize,
    idle: Notify,
}

impl QueueCounters {
    fn finish(&self, report: SaveReport) {
        self.saved.fetch_add(report.saved as u64, Ordering::Relaxed);
        self.failed.fetch_add(report.failed as u64, Ordering::Relaxed);
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

pub struct PersistenceQueue {
    sender: Mutex<Option<mpsc::Sender<PersistJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<QueueCounters>,
}

impl PersistenceQueue {
    /// Spawns the worker pool. Must be called from inside a tokio runtime.
    pub fn start(bridge: DiskTierBridge, policy: PersistencePolicy) -> Self {
        let (sender, receiver) = mpsc::channel(policy.queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let counters = Arc::new(QueueCounters::default());

        let workers = (0..policy.workers.max(1))
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    Arc::clone(&receiver),
                    bridge.clone(),
                    Arc::clone(&counters),
                ))
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            counters,
        }
    }

    /// Queues one committed batch. Waits only while the queue is full.
    pub async fn enqueue(&self, batch: Vec<(Guid, Arc<Entity>)>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let sender = self.sender()?;

        self.counters.pending.fetch_add(1, Ordering::AcqRel);
        if sender.send(PersistJob { batch }).await.is_err() {
            self.counters.finish(SaveReport::default());
            return Err(SphynxError::Persistence(
                "persistence workers have stopped".to_string(),
            ));
        }
        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn sender(&self) -> Result<mpsc::Sender<PersistJob>> {
        self.sender
            .lock()?
            .clone()
            .ok_or_else(|| SphynxError::Persistence("persistence queue is closed".to_string()))
    }

    pub fn stats(&self) -> PersistenceStats {
        PersistenceStats {
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            saved: self.counters.saved.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            pending: self.counters.pending.load(Ordering::Acquire),
        }
    }

    /// Resolves once every accepted batch has been processed.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.counters.idle.notified();
            if self.counters.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stops accepting batches, drains what is queued and joins the workers.
    pub async fn shutdown(&self) -> Result<()> {
        drop(self.sender.lock()?.take());
        let workers = std::mem::take(&mut *self.workers.lock()?);
        for worker in workers {
            worker.await?;
        }
        Ok(())
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<PersistJob>>>,
    bridge: DiskTierBridge,
    counters: Arc<QueueCounters>,
) {
    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(job) = job else {
            debug!(worker_id, "persistence worker stopping");
            break;
        };

        let entities = job.batch.len();
        let bridge = bridge.clone();
        let report = match tokio::task::spawn_blocking(move || bridge.save_all(&job.batch)).await {
            Ok(report) => report,
            Err(err) => {
                error!(worker_id, error = %err, "persistence task panicked");
                SaveReport {
                    saved: 0,
                    failed: entities,
                }
            }
        };
        if report.failed > 0 {
            warn!(worker_id, failed = report.failed, saved = report.saved, "batch partially persisted");
        }
        counters.finish(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::VertexSet;
    use crate::storage::{EntityCache, OrderedDiskStore};
    use tempfile::TempDir;

    fn queue(dir: &TempDir, policy: PersistencePolicy) -> (PersistenceQueue, Arc<OrderedDiskStore>) {
        let store = Arc::new(OrderedDiskStore::open(dir.path()).unwrap());
        let bridge = DiskTierBridge::new(Arc::clone(&store), Arc::new(EntityCache::new()));
        (PersistenceQueue::start(bridge, policy), store)
    }

    fn batch(prefix: &str, n: usize) -> Vec<(Guid, Arc<Entity>)> {
        (0..n)
            .map(|i| {
                (
                    Guid::new(format!("{prefix}-{i}")),
                    Arc::new(Entity::VertexSet(VertexSet::new(vec![i as i64]))),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_enqueued_batches_reach_disk() {
        let dir = TempDir::new().unwrap();
        let (queue, store) = queue(&dir, PersistencePolicy::default());

        queue.enqueue(batch("a", 3)).await.unwrap();
        queue.enqueue(batch("b", 2)).await.unwrap();
        queue.wait_idle().await;

        let stats = queue.stats();
        assert_eq!(stats.enqueued, 2);
        assert_eq!(stats.saved, 5);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.pending, 0);
        assert!(store.exists(&Guid::from("b-1")).unwrap());
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_returned() {
        let dir = TempDir::new().unwrap();
        let (queue, _) = queue(&dir, PersistencePolicy::default());
        let entity = Arc::new(Entity::Scalar(b"1".to_vec()));

        queue
            .enqueue(vec![(Guid::from("a/b"), entity)])
            .await
            .unwrap();
        queue.wait_idle().await;

        assert_eq!(queue.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_small_queue_applies_backpressure_without_losing_batches() {
        let dir = TempDir::new().unwrap();
        let policy = PersistencePolicy {
            workers: 1,
            queue_capacity: 1,
        };
        let (queue, _) = queue(&dir, policy);

        for i in 0..10 {
            queue.enqueue(batch(&format!("job{i}"), 1)).await.unwrap();
        }
        queue.wait_idle().await;
        assert_eq!(queue.stats().saved, 10);
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_fails() {
        let dir = TempDir::new().unwrap();
        let (queue, _) = queue(&dir, PersistencePolicy::default());
        queue.shutdown().await.unwrap();

        let err = queue.enqueue(batch("late", 1)).await.unwrap_err();
        assert!(matches!(err, SphynxError::Persistence(_)));
    }
}
