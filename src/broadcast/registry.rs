//! Connected client registry.
//!
//! Maps client ids to their sink, tags and timestamps. Registration is
//! idempotent by id: registering an existing id replaces its entry.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::broadcast::message::{Envelope, Payload};
use crate::broadcast::sink::ClientSink;
use crate::broadcast::ClientId;
use crate::notify::{Listeners, Notification, SendFailure};
use crate::time::now_millis;

struct ClientEntry {
    sink: Arc<dyn ClientSink>,
    joined_at: u64,
    last_message_at: u64,
    tags: BTreeSet<String>,
}

/// Result of handing a frame to one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Delivery {
    Sent,
    Failed(SendFailure),
    /// The client is no longer registered.
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Open,
    Closed,
}

/// Per-client view for introspection.
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub id: ClientId,
    pub joined_at: u64,
    pub last_message_at: u64,
    pub tags: Vec<String>,
    pub connection_state: ConnectionState,
}

/// Registry snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ClientStats {
    pub total: usize,
    pub by_tag: BTreeMap<String, usize>,
    pub clients: Vec<ClientInfo>,
}

/// Thread-safe set of connected clients.
pub struct ClientRegistry {
    clients: DashMap<ClientId, ClientEntry>,
    listeners: Listeners,
}

impl ClientRegistry {
    pub fn new(listeners: Listeners) -> Self {
        Self {
            clients: DashMap::new(),
            listeners,
        }
    }

    /// Add or replace a client.
    ///
    /// Re-registering an id swaps in the new sink and tags and resets
    /// `joined_at`. The previous sink is not closed.
    pub fn register<I, S>(&self, id: impl Into<ClientId>, sink: Arc<dyn ClientSink>, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        let tags: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        let now = now_millis();
        let tag_list: Vec<String> = tags.iter().cloned().collect();

        self.clients.insert(
            id.clone(),
            ClientEntry {
                sink,
                joined_at: now,
                last_message_at: now,
                tags,
            },
        );

        self.listeners.emit(Notification::ClientConnected {
            client_id: id,
            tags: tag_list,
        });
    }

    /// Remove a client. Returns false if the id was unknown.
    pub fn unregister(&self, id: &str) -> bool {
        if self.clients.remove(id).is_none() {
            return false;
        }
        self.listeners.emit(Notification::ClientDisconnected {
            client_id: id.to_string(),
        });
        true
    }

    /// Remove a client only while `sink` is still its registered sink.
    ///
    /// Lets a closing connection clean up without evicting a newer
    /// connection that re-registered the same id.
    pub fn unregister_sink(&self, id: &str, sink: &Arc<dyn ClientSink>) -> bool {
        let removed = self
            .clients
            .remove_if(id, |_, entry| std::ptr::addr_eq(Arc::as_ptr(&entry.sink), Arc::as_ptr(sink)));
        if removed.is_none() {
            return false;
        }
        self.listeners.emit(Notification::ClientDisconnected {
            client_id: id.to_string(),
        });
        true
    }

    pub fn get_sink(&self, id: &str) -> Option<Arc<dyn ClientSink>> {
        self.clients.get(id).map(|entry| entry.sink.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.clients.contains_key(id)
    }

    /// Add a tag to a client. Returns false if the id was unknown.
    pub fn add_tag(&self, id: &str, tag: &str) -> bool {
        match self.clients.get_mut(id) {
            Some(mut entry) => {
                entry.tags.insert(tag.to_string());
                true
            }
            None => false,
        }
    }

    /// Remove a tag from a client. Returns false if the id was unknown.
    pub fn remove_tag(&self, id: &str, tag: &str) -> bool {
        match self.clients.get_mut(id) {
            Some(mut entry) => {
                entry.tags.remove(tag);
                true
            }
            None => false,
        }
    }

    /// Current tags of a client, sorted.
    pub fn tags(&self, id: &str) -> Option<Vec<String>> {
        self.clients
            .get(id)
            .map(|entry| entry.tags.iter().cloned().collect())
    }

    pub fn clients_by_tag(&self, tag: &str) -> HashSet<ClientId> {
        self.clients
            .iter()
            .filter(|entry| entry.tags.contains(tag))
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        self.clients.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Send a payload directly to one client, bypassing the queue.
    pub fn send(&self, id: &str, payload: &Payload) -> bool {
        let message_type = payload.message_type();
        match Envelope::new(Uuid::new_v4(), payload).to_frame() {
            Ok(frame) => self.send_frame(id, message_type, &frame),
            Err(e) => {
                self.emit_send_error(id, message_type, SendFailure::Serialization(e.to_string()));
                false
            }
        }
    }

    /// Send an error envelope to one client.
    pub fn send_error(&self, id: &str, message: &str) -> bool {
        let envelope = Envelope::error(message);
        match envelope.to_frame() {
            Ok(frame) => self.send_frame(id, envelope.message_type, &frame),
            Err(e) => {
                self.emit_send_error(id, envelope.message_type, SendFailure::Serialization(e.to_string()));
                false
            }
        }
    }

    fn send_frame(&self, id: &str, message_type: &str, frame: &str) -> bool {
        match self.deliver(id, message_type, frame) {
            Delivery::Sent => true,
            Delivery::Failed(_) => false,
            Delivery::Absent => {
                self.emit_send_error(id, message_type, SendFailure::UnknownClient);
                false
            }
        }
    }

    /// Hand an already serialized frame to one client.
    ///
    /// Failures are notified; an absent client is reported to the caller only.
    pub(crate) fn deliver(&self, id: &str, message_type: &str, frame: &str) -> Delivery {
        // Clone the sink out so no shard lock is held across the send.
        let Some(sink) = self.get_sink(id) else {
            return Delivery::Absent;
        };
        let result = sink.send(frame);
        if result.is_ok() {
            self.touch(id, &sink);
        }

        match result {
            Ok(()) => {
                self.listeners.emit(Notification::MessageSent {
                    client_id: id.to_string(),
                    message_type: message_type.to_string(),
                });
                Delivery::Sent
            }
            Err(e) => {
                let failure = SendFailure::from(e);
                self.emit_send_error(id, message_type, failure.clone());
                Delivery::Failed(failure)
            }
        }
    }

    /// Record activity, unless `id` was re-registered with another sink meanwhile.
    fn touch(&self, id: &str, sink: &Arc<dyn ClientSink>) {
        if let Some(mut entry) = self.clients.get_mut(id) {
            if std::ptr::addr_eq(Arc::as_ptr(&entry.sink), Arc::as_ptr(sink)) {
                entry.last_message_at = now_millis();
            }
        }
    }

    /// True while `sink` is the one registered under `id`.
    pub fn is_current_sink(&self, id: &str, sink: &Arc<dyn ClientSink>) -> bool {
        self.clients
            .get(id)
            .is_some_and(|entry| std::ptr::addr_eq(Arc::as_ptr(&entry.sink), Arc::as_ptr(sink)))
    }

    fn emit_send_error(&self, id: &str, message_type: &str, reason: SendFailure) {
        self.listeners.emit(Notification::SendError {
            client_id: id.to_string(),
            message_type: message_type.to_string(),
            reason,
        });
    }

    /// Close every client's sink and empty the registry.
    ///
    /// Close failures are logged and otherwise ignored.
    pub fn close_all(&self, code: u16, reason: &str) {
        for id in self.client_ids() {
            let Some((id, entry)) = self.clients.remove(&id) else {
                continue;
            };
            if let Err(e) = entry.sink.close(code, reason) {
                tracing::debug!(client_id = %id, error = %e, "Close failed");
            }
            self.listeners
                .emit(Notification::ClientDisconnected { client_id: id });
        }
    }

    pub fn stats(&self) -> ClientStats {
        let mut by_tag: BTreeMap<String, usize> = BTreeMap::new();
        let mut clients: Vec<ClientInfo> = self
            .clients
            .iter()
            .map(|entry| {
                for tag in &entry.tags {
                    *by_tag.entry(tag.clone()).or_default() += 1;
                }
                ClientInfo {
                    id: entry.key().clone(),
                    joined_at: entry.joined_at,
                    last_message_at: entry.last_message_at,
                    tags: entry.tags.iter().cloned().collect(),
                    connection_state: if entry.sink.is_open() {
                        ConnectionState::Open
                    } else {
                        ConnectionState::Closed
                    },
                }
            })
            .collect();
        clients.sort_by(|a, b| a.id.cmp(&b.id));

        ClientStats {
            total: clients.len(),
            by_tag,
            clients,
        }
    }
}
