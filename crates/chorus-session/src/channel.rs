//! Broadcast channel abstraction for one document topic.
//!
//! The real transport (reliable, ordered delivery to all subscribers) is
//! an external collaborator. [`MemoryHub`] is the in-memory implementation
//! used by tests and the simulation binary: replica publishers feed one
//! "edit" queue consumed by the engine, and the engine fans rebroadcasts
//! out to every subscriber's "update" queue in order.

use crate::error::SessionError;
use async_trait::async_trait;
use chorus_core::ReplicaId;
use chorus_wire::WireOp;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Messages delivered on a replica's subscription.
#[derive(Clone, Debug)]
pub enum ChannelMessage {
    /// An edit batch rebroadcast by the engine.
    Edit(Vec<WireOp>),
    /// This replica's subscription has caught up (or fallen behind).
    Synced(bool),
}

/// Replica-side handle for publishing local edit batches.
#[async_trait]
pub trait EditChannel: Send + Sync + 'static {
    /// Publish one edit batch toward the engine.
    ///
    /// While disconnected the batch is queued, never dropped; it goes out
    /// on [`EditChannel::reconnect`], in order.
    async fn publish(&self, ops: Vec<WireOp>) -> Result<(), SessionError>;

    fn is_connected(&self) -> bool;

    /// Stop sending; queue outgoing batches locally.
    fn disconnect(&self);

    /// Resume sending, flushing everything queued while disconnected.
    async fn reconnect(&self) -> Result<(), SessionError>;
}

type Subscribers = Arc<RwLock<HashMap<ReplicaId, mpsc::Sender<ChannelMessage>>>>;
type SharedEditReceiver = Arc<RwLock<Option<mpsc::Receiver<Vec<WireOp>>>>>;

const CHANNEL_CAPACITY: usize = 256;

/// In-memory broadcast medium for one document topic.
pub struct MemoryHub {
    topic: String,
    edit_tx: mpsc::Sender<Vec<WireOp>>,
    edit_rx: SharedEditReceiver,
    subscribers: Subscribers,
}

impl MemoryHub {
    pub fn new(topic: impl Into<String>) -> Self {
        let (edit_tx, edit_rx) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            topic: topic.into(),
            edit_tx,
            edit_rx: Arc::new(RwLock::new(Some(edit_rx))),
            subscribers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Subscribe a replica; delivers `Edit` and `Synced` messages in FIFO
    /// order. One subscription per replica.
    pub fn attach(&self, id: &ReplicaId) -> mpsc::Receiver<ChannelMessage> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.subscribers.write().insert(id.clone(), tx);
        debug!(topic = %self.topic, replica = %id, "replica attached");
        rx
    }

    /// Drop a replica's subscription. Undelivered messages are discarded
    /// with the session.
    pub fn detach(&self, id: &ReplicaId) {
        self.subscribers.write().remove(id);
        debug!(topic = %self.topic, replica = %id, "replica detached");
    }

    /// Take the engine-side "edit" stream. Can only be taken once: there
    /// is exactly one serialization point per topic.
    pub fn take_edits(&self) -> mpsc::Receiver<Vec<WireOp>> {
        self.edit_rx
            .write()
            .take()
            .expect("edit stream already taken; one engine per topic")
    }

    /// Create a publisher handle for a replica.
    pub fn publisher(&self) -> MemoryPublisher {
        MemoryPublisher {
            tx: self.edit_tx.clone(),
            state: Arc::new(Mutex::new(PublisherState {
                connected: true,
                deferred: VecDeque::new(),
            })),
        }
    }

    /// Rebroadcast an edit batch to every subscriber, the origin included.
    pub async fn broadcast(&self, ops: Vec<WireOp>) {
        let targets: Vec<_> = self.subscribers.read().values().cloned().collect();
        for tx in targets {
            // A detached replica's closed queue is not an error.
            let _ = tx.send(ChannelMessage::Edit(ops.clone())).await;
        }
    }

    /// Deliver the per-replica "caught up" signal.
    pub async fn signal_synced(&self, id: &ReplicaId, synced: bool) {
        let tx = self.subscribers.read().get(id).cloned();
        if let Some(tx) = tx {
            let _ = tx.send(ChannelMessage::Synced(synced)).await;
        }
    }
}

struct PublisherState {
    connected: bool,
    deferred: VecDeque<Vec<WireOp>>,
}

/// Publisher half handed to each replica.
#[derive(Clone)]
pub struct MemoryPublisher {
    tx: mpsc::Sender<Vec<WireOp>>,
    state: Arc<Mutex<PublisherState>>,
}

#[async_trait]
impl EditChannel for MemoryPublisher {
    async fn publish(&self, ops: Vec<WireOp>) -> Result<(), SessionError> {
        {
            let mut state = self.state.lock();
            if !state.connected {
                debug!("disconnected; deferring edit batch");
                state.deferred.push_back(ops);
                return Ok(());
            }
        }
        self.tx
            .send(ops)
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn disconnect(&self) {
        self.state.lock().connected = false;
    }

    async fn reconnect(&self) -> Result<(), SessionError> {
        let pending: Vec<_> = {
            let mut state = self.state.lock();
            state.connected = true;
            state.deferred.drain(..).collect()
        };
        for ops in pending {
            self.tx
                .send(ops)
                .await
                .map_err(|_| SessionError::ChannelClosed)?;
        }
        Ok(())
    }
}
