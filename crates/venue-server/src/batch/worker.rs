//! Import queue and the worker pool that drains it
//!
//! Ingestion, the resume pass and the reaper push import ids onto a bounded
//! [`BatchQueue`]. A fixed number of worker tasks pull ids off the queue and
//! run [`Sequencer::drain`] for each one. An import that is already waiting
//! in the queue is not queued twice.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::sequencer::{Sequencer, SequencerSettings};
use super::store::BatchStore;
use crate::config::BatchConfig;
use crate::search::SearchInvoker;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Batch queue is closed")]
    Closed,

    #[error("Batch queue state is unavailable: {0}")]
    Poisoned(String),
}

/// Result of an enqueue attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Queued,
    /// Already waiting in the queue
    AlreadyQueued,
    /// Queue full; the next reaper sweep picks the import up
    Deferred,
}

/// Sending side of the import queue
#[derive(Clone)]
pub struct BatchQueue {
    tx: mpsc::Sender<Uuid>,
    waiting: Arc<Mutex<HashSet<Uuid>>>,
}

impl BatchQueue {
    /// Create a queue and its receiving end
    pub fn channel(capacity: usize) -> (Self, QueueReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let waiting = Arc::new(Mutex::new(HashSet::new()));
        let queue = Self {
            tx,
            waiting: waiting.clone(),
        };
        let receiver = QueueReceiver {
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
            waiting,
        };
        (queue, receiver)
    }

    /// Queue an import for draining without waiting for space
    pub fn enqueue(&self, import_id: Uuid) -> Result<Enqueued, QueueError> {
        let mut waiting = self
            .waiting
            .lock()
            .map_err(|e| QueueError::Poisoned(e.to_string()))?;

        if !waiting.insert(import_id) {
            return Ok(Enqueued::AlreadyQueued);
        }

        match self.tx.try_send(import_id) {
            Ok(()) => Ok(Enqueued::Queued),
            Err(TrySendError::Full(_)) => {
                waiting.remove(&import_id);
                tracing::warn!(%import_id, "Batch queue is full, deferring import");
                Ok(Enqueued::Deferred)
            }
            Err(TrySendError::Closed(_)) => {
                waiting.remove(&import_id);
                Err(QueueError::Closed)
            }
        }
    }

    /// Number of imports waiting to be picked up
    pub fn len(&self) -> usize {
        self.waiting.lock().map(|w| w.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Receiving side, shared by all workers
#[derive(Clone)]
pub struct QueueReceiver {
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Uuid>>>,
    waiting: Arc<Mutex<HashSet<Uuid>>>,
}

impl QueueReceiver {
    /// Next import id; `None` once every [`BatchQueue`] handle is dropped
    pub async fn next(&self) -> Option<Uuid> {
        let import_id = self.rx.lock().await.recv().await?;
        if let Ok(mut waiting) = self.waiting.lock() {
            waiting.remove(&import_id);
        }
        Some(import_id)
    }
}

/// Worker identity used as the lease owner
pub fn worker_id(index: usize) -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    format!("{}:{}:{}", host, index, Uuid::new_v4())
}

/// Spawn `config.workers` tasks that drain imports from the queue
///
/// Workers exit once the queue is closed and empty.
pub fn spawn_workers(
    store: Arc<dyn BatchStore>,
    invoker: Arc<dyn SearchInvoker>,
    config: &BatchConfig,
    receiver: QueueReceiver,
) -> Vec<JoinHandle<()>> {
    let settings = SequencerSettings::from(config);

    (0..config.workers.max(1))
        .map(|index| {
            let sequencer =
                Sequencer::new(store.clone(), invoker.clone(), settings, worker_id(index));
            let receiver = receiver.clone();
            tokio::spawn(run_worker(sequencer, receiver))
        })
        .collect()
}

async fn run_worker(sequencer: Sequencer, receiver: QueueReceiver) {
    tracing::info!(worker = %sequencer.owner(), "Batch worker started");

    while let Some(import_id) = receiver.next().await {
        match sequencer.drain(import_id).await {
            Ok(report) => tracing::debug!(
                %import_id,
                dispatched = report.dispatched,
                import_completed = report.import_completed,
                "Drain finished"
            ),
            Err(e) => tracing::error!(
                %import_id,
                error = %e,
                "Drain failed, import left pending for the next sweep"
            ),
        }
    }

    tracing::info!(worker = %sequencer.owner(), "Batch worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::memory::InMemoryBatchStore;
    use crate::batch::store::{ImportStore, ItemStore};
    use crate::batch::types::ImportStatus;
    use crate::search::{SearchFailure, SearchOutcome};
    use async_trait::async_trait;
    use std::time::Duration;
    use venue_common::SearchType;

    struct OkInvoker;

    #[async_trait]
    impl SearchInvoker for OkInvoker {
        async fn invoke(
            &self,
            venue_name: &str,
            search_type: SearchType,
        ) -> Result<SearchOutcome, SearchFailure> {
            Ok(SearchOutcome {
                search_id: Uuid::new_v4(),
                venue_name: venue_name.to_string(),
                search_type,
                images: Vec::new(),
                hotel: None,
            })
        }
    }

    #[tokio::test]
    async fn test_enqueue_dedupes_waiting_imports() {
        let (queue, receiver) = BatchQueue::channel(4);
        let id = Uuid::new_v4();

        assert_eq!(queue.enqueue(id).unwrap(), Enqueued::Queued);
        assert_eq!(queue.enqueue(id).unwrap(), Enqueued::AlreadyQueued);
        assert_eq!(queue.len(), 1);

        assert_eq!(receiver.next().await, Some(id));
        assert!(queue.is_empty());
        assert_eq!(queue.enqueue(id).unwrap(), Enqueued::Queued);
    }

    #[tokio::test]
    async fn test_enqueue_defers_when_full() {
        let (queue, _receiver) = BatchQueue::channel(1);

        assert_eq!(queue.enqueue(Uuid::new_v4()).unwrap(), Enqueued::Queued);
        assert_eq!(queue.enqueue(Uuid::new_v4()).unwrap(), Enqueued::Deferred);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_after_close() {
        let (queue, receiver) = BatchQueue::channel(1);
        drop(receiver);
        assert!(matches!(queue.enqueue(Uuid::new_v4()), Err(QueueError::Closed)));
    }

    #[tokio::test]
    async fn test_workers_drain_queued_imports() {
        let store = Arc::new(InMemoryBatchStore::new());
        let mut import_ids = Vec::new();
        for file in ["a.csv", "b.csv", "c.csv"] {
            let import = store.create_import(file, SearchType::Venue).await.unwrap();
            store
                .create_items(import.id, &["One".to_string(), "Two".to_string()])
                .await
                .unwrap();
            import_ids.push(import.id);
        }

        let config = BatchConfig {
            workers: 2,
            ..BatchConfig::default()
        };
        let (queue, receiver) = BatchQueue::channel(config.queue_capacity);
        let handles = spawn_workers(store.clone(), Arc::new(OkInvoker), &config, receiver);

        for id in &import_ids {
            queue.enqueue(*id).unwrap();
        }
        drop(queue);

        for handle in handles {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .unwrap()
                .unwrap();
        }

        for id in import_ids {
            assert_eq!(store.get_import(id).await.unwrap().status, ImportStatus::Completed);
        }
    }
}
