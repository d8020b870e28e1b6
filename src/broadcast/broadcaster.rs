//! Broadcast queue owner and delivery loop.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::broadcast::message::{Envelope, Payload};
use crate::broadcast::queue::{BroadcastQueue, QueueStats, QueuedBroadcast};
use crate::broadcast::registry::{ClientRegistry, ClientStats, Delivery};
use crate::broadcast::{BroadcastId, ClientId};
use crate::config::{BroadcastConfig, RetryMode};
use crate::lifecycle::Shutdown;
use crate::notify::{Listener, Listeners, Notification, SendFailure};
use crate::observability::metrics;
use crate::time::now_millis;

/// Who a broadcast is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    All,
    /// Explicit ids; unregistered ids are dropped at enqueue time.
    Clients(Vec<ClientId>),
    Tag(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    #[error("broadcast queue is full, rejected {message_type} broadcast {id}")]
    QueueFull { id: BroadcastId, message_type: String },
}

/// Outcome of a single sweep over the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Broadcasts looked at.
    pub processed: usize,
    pub completed: usize,
    pub retried: usize,
    pub dropped: usize,
    /// Individual sends that succeeded.
    pub sent: usize,
    /// Individual sends that failed.
    pub failed: usize,
    /// Another sweep was in progress, so this one did nothing.
    pub skipped: bool,
}

struct Worker {
    shutdown: Shutdown,
    // Detached on stop; the task exits at its next select.
    _handle: JoinHandle<()>,
}

struct Inner {
    config: BroadcastConfig,
    registry: Arc<ClientRegistry>,
    queue: Mutex<BroadcastQueue>,
    // Held for a whole sweep; sweeps never overlap.
    sweep: Mutex<()>,
    listeners: Listeners,
    worker: Mutex<Option<Worker>>,
}

/// Owns the broadcast queue and drives delivery to the registry.
///
/// Cloning is cheap; clones share the same queue, registry and loop.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<Inner>,
}

/// Work captured for one broadcast while the queue lock is held.
struct SweepItem {
    id: BroadcastId,
    payload: Arc<Payload>,
    recipients: Vec<ClientId>,
}

impl Broadcaster {
    /// Create a broadcaster with its own registry sharing `listeners`.
    pub fn new(config: BroadcastConfig, listeners: Listeners) -> Self {
        let registry = Arc::new(ClientRegistry::new(listeners.clone()));
        Self::with_registry(config, registry, listeners)
    }

    pub fn with_registry(
        config: BroadcastConfig,
        registry: Arc<ClientRegistry>,
        listeners: Listeners,
    ) -> Self {
        let queue = BroadcastQueue::new(config.max_queue_size);
        Self {
            inner: Arc::new(Inner {
                config,
                registry,
                queue: Mutex::new(queue),
                sweep: Mutex::new(()),
                listeners,
                worker: Mutex::new(None),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.inner.registry
    }

    pub fn config(&self) -> &BroadcastConfig {
        &self.inner.config
    }

    pub fn listeners(&self) -> &Listeners {
        &self.inner.listeners
    }

    pub fn add_listener(&self, listener: Arc<dyn Listener>) {
        self.inner.listeners.add(listener);
    }

    fn queue(&self) -> MutexGuard<'_, BroadcastQueue> {
        self.inner.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, target: Target) -> BTreeSet<ClientId> {
        let registry = &self.inner.registry;
        match target {
            Target::All => registry.client_ids().into_iter().collect(),
            Target::Clients(ids) => ids.into_iter().filter(|id| registry.contains(id)).collect(),
            Target::Tag(tag) => registry.clients_by_tag(&tag).into_iter().collect(),
        }
    }

    /// Queue a payload for delivery.
    ///
    /// A target set that resolves to no registered clients is not queued: a
    /// `NoTargets` notification is emitted and a fresh id is still returned.
    pub fn enqueue(&self, payload: Payload, target: Target) -> Result<BroadcastId, BroadcastError> {
        let id = Uuid::new_v4();
        let message_type = payload.message_type().to_string();
        let targets = self.resolve(target);

        if targets.is_empty() {
            self.inner.listeners.emit(Notification::NoTargets {
                broadcast_id: id,
                message_type,
            });
            return Ok(id);
        }

        let target_count = targets.len();
        let broadcast = QueuedBroadcast {
            id,
            payload: Arc::new(payload),
            created_at: now_millis(),
            targets,
            delivered: HashSet::new(),
            retry_count: 0,
            max_retries: self.inner.config.max_retries,
        };

        let pushed = {
            let mut queue = self.queue();
            let max_size = queue.max_size();
            let result = queue.push(broadcast).map_err(|_| max_size);
            metrics::record_queue_size(queue.len());
            result
        };

        if let Err(max_size) = pushed {
            self.inner.listeners.emit(Notification::QueueFull {
                broadcast_id: id,
                message_type: message_type.clone(),
                max_size,
            });
            return Err(BroadcastError::QueueFull { id, message_type });
        }

        self.inner.listeners.emit(Notification::BroadcastQueued {
            broadcast_id: id,
            message_type,
            target_count,
        });
        Ok(id)
    }

    /// Queue a payload for every registered client.
    pub fn broadcast(&self, payload: Payload) -> Result<BroadcastId, BroadcastError> {
        self.enqueue(payload, Target::All)
    }

    pub fn broadcast_to<I, S>(&self, ids: I, payload: Payload) -> Result<BroadcastId, BroadcastError>
    where
        I: IntoIterator<Item = S>,
        S: Into<ClientId>,
    {
        let ids = ids.into_iter().map(Into::into).collect();
        self.enqueue(payload, Target::Clients(ids))
    }

    pub fn broadcast_to_tag(&self, tag: &str, payload: Payload) -> Result<BroadcastId, BroadcastError> {
        self.enqueue(payload, Target::Tag(tag.to_string()))
    }

    /// Send directly to one client, bypassing the queue.
    pub fn send_to_client(&self, id: &str, payload: &Payload) -> bool {
        self.inner.registry.send(id, payload)
    }

    /// Run one delivery sweep over everything currently queued.
    ///
    /// Sends happen without the queue lock held; broadcasts enqueued during
    /// the sweep wait for the next one. A call made while another sweep is
    /// running returns immediately with `skipped` set.
    pub fn process_queue(&self) -> SweepReport {
        let _sweep = match self.inner.sweep.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                tracing::debug!("Sweep already in progress, skipping");
                return SweepReport {
                    skipped: true,
                    ..SweepReport::default()
                };
            }
        };
        let mode = self.inner.config.retry_mode;
        let work: Vec<SweepItem> = self
            .queue()
            .iter()
            .map(|b| SweepItem {
                id: b.id,
                payload: b.payload.clone(),
                recipients: b.recipients(mode),
            })
            .collect();

        let mut report = SweepReport::default();
        for item in work {
            report.processed += 1;
            let message_type = item.payload.message_type();
            let mut delivered = Vec::new();
            let mut failed = 0;

            match Envelope::new(item.id, &item.payload).to_frame() {
                Ok(frame) => {
                    for client in &item.recipients {
                        match self.inner.registry.deliver(client, message_type, &frame) {
                            Delivery::Sent => delivered.push(client.clone()),
                            Delivery::Failed(_) => failed += 1,
                            Delivery::Absent => {}
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(broadcast_id = %item.id, error = %e, "Failed to serialize broadcast");
                    for client in &item.recipients {
                        self.inner.listeners.emit(Notification::SendError {
                            client_id: client.clone(),
                            message_type: message_type.to_string(),
                            reason: SendFailure::Serialization(e.to_string()),
                        });
                    }
                    failed = item.recipients.len();
                }
            }

            report.sent += delivered.len();
            report.failed += failed;
            self.apply_outcome(&item.id, delivered, failed, &mut report);
        }

        metrics::record_queue_size(self.queue_size());
        report
    }

    fn apply_outcome(
        &self,
        id: &BroadcastId,
        delivered: Vec<ClientId>,
        failed: usize,
        report: &mut SweepReport,
    ) {
        let mode = self.inner.config.retry_mode;
        let notification = {
            let mut queue = self.queue();
            // Gone if the broadcaster was closed mid-sweep.
            let Some(broadcast) = queue.get_mut(id) else {
                return;
            };

            let sent_now = delivered.len();
            if mode == RetryMode::PendingOnly {
                broadcast.delivered.extend(delivered);
            }

            if failed == 0 {
                let success_count = match mode {
                    RetryMode::Coarse => sent_now,
                    RetryMode::PendingOnly => broadcast.delivered.len(),
                };
                let done = queue.remove(id);
                report.completed += 1;
                done.map(|b| Notification::BroadcastCompleted {
                    broadcast_id: b.id,
                    message_type: b.message_type().to_string(),
                    success_count,
                    retry_count: b.retry_count,
                })
            } else {
                broadcast.retry_count += 1;
                if broadcast.retry_count >= broadcast.max_retries {
                    let dropped = queue.remove(id);
                    report.dropped += 1;
                    dropped.map(|b| Notification::MaxRetriesExceeded {
                        broadcast_id: b.id,
                        message_type: b.message_type().to_string(),
                        failed_count: failed,
                        retry_count: b.retry_count,
                    })
                } else {
                    report.retried += 1;
                    None
                }
            }
        };

        if let Some(notification) = notification {
            self.inner.listeners.emit(notification);
        }
    }

    /// Start the periodic delivery loop. Idempotent.
    ///
    /// Returns false if the loop was already running or no Tokio runtime is
    /// available.
    pub fn start(&self) -> bool {
        let mut worker = self
            .inner
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "Cannot start delivery loop outside a Tokio runtime");
                return false;
            }
        };

        let interval_ms = self.inner.config.interval_ms.max(1);
        let shutdown = Shutdown::new();
        let mut stop_rx = shutdown.subscribe();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.recv() => break,
                    _ = ticker.tick() => {
                        let Some(inner) = weak.upgrade() else {
                            break;
                        };
                        let report = Broadcaster { inner }.process_queue();
                        if report.processed > 0 {
                            tracing::trace!(
                                processed = report.processed,
                                completed = report.completed,
                                retried = report.retried,
                                dropped = report.dropped,
                                "Sweep finished"
                            );
                        }
                    }
                }
            }
        });

        *worker = Some(Worker {
            shutdown,
            _handle: handle,
        });
        drop(worker);

        self.inner
            .listeners
            .emit(Notification::ProcessingStarted { interval_ms });
        true
    }

    /// Stop the delivery loop. Idempotent; a no-op if never started.
    ///
    /// A sweep already in progress runs to completion; no new sweep starts.
    pub fn stop(&self) -> bool {
        let worker = self
            .inner
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(worker) = worker else {
            return false;
        };
        worker.shutdown.trigger();
        self.inner.listeners.emit(Notification::ProcessingStopped);
        true
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Stop the loop, discard queued broadcasts and close every client.
    pub fn close(&self, code: u16, reason: &str) {
        self.stop();
        let discarded = {
            let mut queue = self.queue();
            let n = queue.clear();
            metrics::record_queue_size(0);
            n
        };
        if discarded > 0 {
            tracing::info!(discarded = discarded, "Discarded pending broadcasts");
        }
        self.inner.registry.close_all(code, reason);
        self.inner.listeners.emit(Notification::BroadcasterClosed {
            code,
            reason: reason.to_string(),
        });
    }

    pub fn queue_size(&self) -> usize {
        self.queue().len()
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue().stats()
    }

    pub fn client_stats(&self) -> ClientStats {
        self.inner.registry.stats()
    }
}
