//! Async thumbnail loading orchestrator.
//!
//! A single background consumer works the request queue in batches,
//! serving visible items before off-screen ones.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::domain::entities::{ThumbnailStatus, VideoId};

use super::cache_service::{CacheStats, ThumbnailCacheService};

/// Message sent when a thumbnail request reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailEvent {
    /// The video the request was issued for.
    pub id: VideoId,
    /// Terminal state of the request.
    pub status: ThumbnailStatus,
    /// The resolved thumbnail path, or None when no thumbnail exists
    /// or the request did not complete.
    pub path: Option<PathBuf>,
}

/// A load request travelling from `enqueue` to the consumer loop.
#[derive(Debug)]
struct QueuedRequest {
    seq: u64,
    id: VideoId,
    path: PathBuf,
    visible: bool,
    cancel: CancellationToken,
}

struct TrackedRequest {
    id: VideoId,
    status: ThumbnailStatus,
    cancel: CancellationToken,
}

/// Registry of live requests, keyed by sequence number.
///
/// Entries are inserted on enqueue and removed when the request reaches
/// a terminal state, so the registry always mirrors the actual backlog.
#[derive(Default)]
struct RequestRegistry {
    entries: Mutex<HashMap<u64, TrackedRequest>>,
}

impl RequestRegistry {
    fn insert(&self, seq: u64, id: VideoId, cancel: CancellationToken) {
        self.entries.lock().insert(
            seq,
            TrackedRequest {
                id,
                status: ThumbnailStatus::Pending,
                cancel,
            },
        );
    }

    fn mark_processing(&self, seq: u64) {
        if let Some(entry) = self.entries.lock().get_mut(&seq) {
            entry.status = ThumbnailStatus::Processing;
        }
    }

    fn remove(&self, seq: u64) {
        self.entries.lock().remove(&seq);
    }

    /// Cancels every pending request whose id is not in `visible`.
    /// Requests already being processed are left alone.
    fn cancel_not_visible(&self, visible: &HashSet<VideoId>) -> usize {
        let entries = self.entries.lock();
        let mut cancelled = 0;
        for entry in entries.values() {
            if entry.status.is_pending()
                && !entry.cancel.is_cancelled()
                && !visible.contains(&entry.id)
            {
                entry.cancel.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }

    fn contains_id(&self, id: VideoId) -> bool {
        self.entries.lock().values().any(|entry| entry.id == id)
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Prioritized, cancellable thumbnail loader.
///
/// Requests are queued without blocking the caller; a single background
/// consumer resolves them through the [`ThumbnailCacheService`] and
/// publishes a [`ThumbnailEvent`] per request on the event channel.
pub struct ThumbnailLoader {
    cache: Arc<ThumbnailCacheService>,
    request_tx: mpsc::UnboundedSender<QueuedRequest>,
    registry: Arc<RequestRegistry>,
    next_seq: AtomicU64,
    shutdown_token: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ThumbnailLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailLoader")
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

/// State for the background worker loop.
struct WorkerState {
    cache: Arc<ThumbnailCacheService>,
    registry: Arc<RequestRegistry>,
    event_tx: mpsc::UnboundedSender<ThumbnailEvent>,
    request_rx: mpsc::UnboundedReceiver<QueuedRequest>,
    shutdown: CancellationToken,
}

impl ThumbnailLoader {
    /// Creates a loader and spawns its background consumer task.
    #[must_use]
    pub fn new(
        cache: Arc<ThumbnailCacheService>,
        event_tx: &mpsc::UnboundedSender<ThumbnailEvent>,
    ) -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let registry = Arc::new(RequestRegistry::default());
        let shutdown_token = CancellationToken::new();

        let worker_state = WorkerState {
            cache: cache.clone(),
            registry: registry.clone(),
            event_tx: event_tx.clone(),
            request_rx,
            shutdown: shutdown_token.clone(),
        };

        let worker = tokio::spawn(Self::run_worker_loop(worker_state));

        Self {
            cache,
            request_tx,
            registry,
            next_seq: AtomicU64::new(0),
            shutdown_token,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Worker loop handling queued requests in visible-first batches.
    ///
    /// Each pass waits for one request, drains everything else that has
    /// queued up in the meantime, and stable-sorts the batch so visible
    /// items come first while enqueue order is kept within each group.
    async fn run_worker_loop(mut state: WorkerState) {
        loop {
            let first = tokio::select! {
                () = state.shutdown.cancelled() => break,
                request = state.request_rx.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            let mut batch = vec![first];
            while let Ok(request) = state.request_rx.try_recv() {
                batch.push(request);
            }
            batch.sort_by_key(|request| !request.visible);
            trace!(size = batch.len(), "Processing thumbnail request batch");

            for request in batch {
                if state.shutdown.is_cancelled() {
                    state.registry.remove(request.seq);
                    continue;
                }
                Self::process_request(&state, request).await;
            }
        }

        // Whatever never got picked up is abandoned without an event.
        while let Ok(request) = state.request_rx.try_recv() {
            state.registry.remove(request.seq);
        }
        state.registry.clear();
        debug!("Thumbnail worker loop stopped");
    }

    async fn process_request(state: &WorkerState, request: QueuedRequest) {
        if request.cancel.is_cancelled() {
            state.registry.remove(request.seq);
            trace!(id = %request.id, "Skipping cancelled thumbnail request");
            let _ = state.event_tx.send(ThumbnailEvent {
                id: request.id,
                status: ThumbnailStatus::Cancelled,
                path: None,
            });
            return;
        }

        state.registry.mark_processing(request.seq);
        let (status, path) = match state.cache.load(&request.path).await {
            Ok(resolved) => (ThumbnailStatus::Completed, resolved),
            Err(e) => {
                warn!(
                    id = %request.id,
                    path = %request.path.display(),
                    error = %e,
                    "Thumbnail load failed"
                );
                (ThumbnailStatus::Failed(e.to_string()), None)
            }
        };

        state.registry.remove(request.seq);
        let _ = state.event_tx.send(ThumbnailEvent {
            id: request.id,
            status,
            path,
        });
    }

    /// Queues a thumbnail load for `id`.
    ///
    /// Never blocks; the terminal state arrives on the event channel.
    /// After [`shutdown`](Self::shutdown) the request is dropped.
    pub fn enqueue(&self, id: VideoId, path: PathBuf, visible: bool) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        self.registry.insert(seq, id, cancel.clone());

        let request = QueuedRequest {
            seq,
            id,
            path,
            visible,
            cancel,
        };
        if self.request_tx.send(request).is_err() {
            self.registry.remove(seq);
            warn!(id = %id, "Thumbnail loader is stopped, dropping request");
        }
    }

    /// Replaces the visible-id set, cancelling pending requests that
    /// scrolled out of view.
    ///
    /// A request already being processed is never interrupted; it runs
    /// to completion even when its id is absent from `visible`.
    pub fn update_visible_items(&self, visible: &[VideoId]) {
        let visible: HashSet<VideoId> = visible.iter().copied().collect();
        let cancelled = self.registry.cancel_not_visible(&visible);
        if cancelled > 0 {
            debug!(count = cancelled, "Cancelled off-screen thumbnail requests");
        }
    }

    /// Returns true if a request for `id` has not reached a terminal state.
    #[must_use]
    pub fn is_queued(&self, id: VideoId) -> bool {
        self.registry.contains_id(id)
    }

    /// Returns the number of live requests.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns statistics from the underlying cache service.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Stops the consumer loop and waits for it to finish.
    ///
    /// A request being processed when the signal arrives runs to
    /// completion and its event is still delivered. Requests that never
    /// started are abandoned without an event.
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!(error = %e, "Thumbnail worker task ended abnormally");
            }
        }
        info!("Thumbnail loader stopped");
    }
}
