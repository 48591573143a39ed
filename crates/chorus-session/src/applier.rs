//! Per-replica replay of rebroadcast batches.
//!
//! A [`LocalApplier`] consumes batches strictly in delivery order. Records
//! whose origin matches the local replica are echoes of edits already in
//! the buffer and are never re-applied as content; everything else is
//! translated into buffer spans and applied as one synthetic-tagged
//! transaction, after which the local selection is remapped through the
//! composed position map and committed as a second synthetic transaction.
//!
//! [`Replica`] wires an applier to its channel subscription, publisher,
//! and snapshot source, forming one participant.

use crate::bootstrap::{self, SnapshotSource};
use crate::buffer::{Change, EditBuffer, OriginTag, Span, Transaction};
use crate::channel::{ChannelMessage, EditChannel};
use crate::error::Result;
use crate::translator::OperationTranslator;
use chorus_core::{Operation, OperationBatch, PosMap, ReplicaId};
use chorus_wire::{to_wire, WireOp};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Replays remote operations into the local buffer.
pub struct LocalApplier<B: EditBuffer> {
    id: ReplicaId,
    buffer: B,
    translator: OperationTranslator,
    synced: bool,
}

impl<B: EditBuffer> LocalApplier<B> {
    pub fn new(id: ReplicaId, buffer: B) -> Self {
        let translator = OperationTranslator::new(id.clone());
        Self {
            id,
            buffer,
            translator,
            synced: false,
        }
    }

    pub fn id(&self) -> &ReplicaId {
        &self.id
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut B {
        &mut self.buffer
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn set_synced(&mut self, synced: bool) {
        self.synced = synced;
    }

    /// The buffer provider's transaction hook: translate a local
    /// transaction into a publishable batch. Synthetic transactions yield
    /// an empty batch; callers skip publication for those.
    pub fn on_transaction(&self, tx: &Transaction) -> OperationBatch {
        self.translator.translate(tx)
    }

    /// Replay one rebroadcast batch.
    ///
    /// Before the sync signal has arrived the batch is dropped: the
    /// full-resync repair at sync time covers everything missed.
    pub fn update(&mut self, ops: &[WireOp]) {
        if !self.synced {
            debug!(replica = %self.id, "not yet synced; dropping update");
            return;
        }

        let mut composed = PosMap::identity();
        let mut spans = Vec::new();
        let mut len = self.buffer.len_chars();

        for wire in ops {
            if wire.origin().as_ref() == Some(&self.id) {
                // Echo of our own edit: the content is already local.
                continue;
            }
            let Some(op) = wire.clone().into_op() else {
                warn!(replica = %self.id, "ignoring unknown wire action");
                continue;
            };
            let (at, removed, text) = match op {
                Operation::Insert { at, removed, text } => (at, removed, text),
                Operation::Delete { from, to } => (from, to.saturating_sub(from), String::new()),
                Operation::LegacySplice { at, text } => (at, 0, text),
            };
            // Clamp against the running length, same policy as the engine.
            let at_c = at.min(len);
            let end = at.saturating_add(removed);
            let end_c = end.min(len).max(at_c);
            if at_c != at || end_c != end {
                warn!(replica = %self.id, "operation clamped to buffer bounds");
            }
            let inserted = text.chars().count();
            spans.push(Span {
                from: at_c,
                to: end_c,
                insert: text,
            });
            composed = composed.then(PosMap::replace(at_c, end_c - at_c, inserted));
            len = len - (end_c - at_c) + inserted;
        }

        if spans.is_empty() {
            return;
        }

        let selection = self.buffer.selection();

        // Content: one atomic synthetic transaction.
        let changes: Vec<Change> = spans
            .iter()
            .map(|s| Change {
                from_old: s.from,
                to_old: s.to,
                inserted: s.insert.clone(),
            })
            .collect();
        self.buffer.apply(&spans, OriginTag::SyntheticReplay);
        let replayed = Transaction {
            changes,
            origin: OriginTag::SyntheticReplay,
        };
        debug_assert!(
            self.on_transaction(&replayed).is_empty(),
            "replay must never re-translate"
        );

        // Selection: remapped in a single pass, committed separately.
        self.buffer
            .set_selection(selection.map(&composed), OriginTag::SyntheticReplay);
    }

    /// Compare against the authoritative snapshot and force-replace the
    /// buffer on divergence. Idempotent.
    pub fn resync(&mut self, source: &dyn SnapshotSource) -> bool {
        bootstrap::resync(&mut self.buffer, source)
    }
}

/// One participant: applier + channel subscription + publisher + snapshot
/// source.
pub struct Replica<B: EditBuffer, C: EditChannel> {
    applier: LocalApplier<B>,
    channel: C,
    updates: mpsc::Receiver<ChannelMessage>,
    snapshots: Arc<dyn SnapshotSource>,
}

impl<B: EditBuffer, C: EditChannel> Replica<B, C> {
    /// Attach with a fresh buffer seeded from the authoritative snapshot.
    pub fn attach(
        id: ReplicaId,
        updates: mpsc::Receiver<ChannelMessage>,
        channel: C,
        snapshots: Arc<dyn SnapshotSource>,
    ) -> Self
    where
        B: Default,
    {
        let mut buffer = B::default();
        bootstrap::attach(&mut buffer, snapshots.as_ref());
        Self {
            applier: LocalApplier::new(id, buffer),
            channel,
            updates,
            snapshots,
        }
    }

    pub fn id(&self) -> &ReplicaId {
        self.applier.id()
    }

    pub fn applier(&self) -> &LocalApplier<B> {
        &self.applier
    }

    pub fn text(&self) -> String {
        self.applier.buffer().text()
    }

    pub fn is_synced(&self) -> bool {
        self.applier.is_synced()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Perform one local user edit: mutate the buffer, translate the
    /// transaction, and publish the batch (unless it is empty).
    pub async fn edit(&mut self, from: usize, to: usize, insert: &str) -> Result<()> {
        let span = Span {
            from,
            to,
            insert: insert.to_string(),
        };
        self.applier
            .buffer_mut()
            .apply(std::slice::from_ref(&span), OriginTag::LocalUserEdit);

        let tx = Transaction {
            changes: vec![Change {
                from_old: from,
                to_old: to,
                inserted: insert.to_string(),
            }],
            origin: OriginTag::LocalUserEdit,
        };
        let batch = self.applier.on_transaction(&tx);
        if batch.is_empty() {
            return Ok(());
        }
        self.channel.publish(to_wire(&batch)).await
    }

    fn handle(&mut self, message: ChannelMessage) {
        match message {
            ChannelMessage::Edit(ops) => self.applier.update(&ops),
            ChannelMessage::Synced(synced) => {
                self.applier.set_synced(synced);
                if synced {
                    self.applier.resync(self.snapshots.as_ref());
                }
            }
        }
    }

    /// Process every message currently queued, in delivery order. Returns
    /// how many were handled.
    pub async fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.updates.try_recv() {
            self.handle(message);
            handled += 1;
        }
        handled
    }

    /// Consume the subscription until it closes. Detaching is simply
    /// dropping the replica; undelivered messages go with it.
    pub async fn run(mut self) {
        while let Some(message) = self.updates.recv().await {
            self.handle(message);
        }
        debug!(replica = %self.applier.id, "subscription closed; replica stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PlainBuffer;
    use crate::channel::MemoryHub;
    use crate::engine::{EngineService, ReconciliationEngine};
    use chorus_core::{SelRange, Selection};

    fn synced_applier(id: &str, text: &str) -> LocalApplier<PlainBuffer> {
        let mut applier = LocalApplier::new(ReplicaId::new(id), PlainBuffer::from_text(text));
        applier.set_synced(true);
        applier
    }

    fn insert_op(view: &str, at: usize, text: &str) -> WireOp {
        WireOp::Insert {
            from_a: at,
            to_a: at,
            text: text.to_string(),
            view_id: view.to_string(),
        }
    }

    #[test]
    fn test_remote_batch_applied() {
        let mut applier = synced_applier("me", "hello");
        applier.update(&[insert_op("them", 5, " world")]);
        assert_eq!(applier.buffer().text(), "hello world");
    }

    #[test]
    fn test_own_echo_not_reapplied() {
        let mut applier = synced_applier("me", "hello");
        applier.update(&[insert_op("me", 5, " world")]);
        assert_eq!(applier.buffer().text(), "hello");
    }

    #[test]
    fn test_mixed_echo_and_remote() {
        let mut applier = synced_applier("me", "");
        applier.update(&[insert_op("me", 0, "xx"), insert_op("them", 0, "ab")]);
        assert_eq!(applier.buffer().text(), "ab");
    }

    #[test]
    fn test_selection_remapped_through_batch() {
        let mut applier = synced_applier("me", "hello");
        applier
            .buffer_mut()
            .set_selection(Selection::new(vec![SelRange::new(1, 4)], 0), OriginTag::LocalUserEdit);

        applier.update(&[insert_op("them", 0, ">> ")]);
        assert_eq!(applier.buffer().text(), ">> hello");
        assert_eq!(
            applier.buffer().selection(),
            Selection::new(vec![SelRange::new(4, 7)], 0)
        );
    }

    #[test]
    fn test_updates_dropped_before_sync() {
        let mut applier = LocalApplier::new(ReplicaId::new("me"), PlainBuffer::from_text(""));
        applier.update(&[insert_op("them", 0, "lost")]);
        assert_eq!(applier.buffer().text(), "");
    }

    #[test]
    fn test_hostile_del_coordinates_clamped_not_fatal() {
        let mut applier = synced_applier("me", "abc");
        applier.update(&[WireOp::Del {
            index: usize::MAX,
            length: 7,
            view_id: "them".to_string(),
        }]);
        assert_eq!(applier.buffer().text(), "abc");
    }

    #[test]
    fn test_unknown_action_skipped() {
        let mut applier = synced_applier("me", "abc");
        applier.update(&[WireOp::Unknown, insert_op("them", 3, "!")]);
        assert_eq!(applier.buffer().text(), "abc!");
    }

    #[tokio::test]
    async fn test_three_replicas_converge() {
        let hub = Arc::new(MemoryHub::new("doc"));
        let engine = ReconciliationEngine::new("").into_handle();
        let mut service = EngineService::new(engine.clone(), hub.clone());
        let snapshots: Arc<dyn SnapshotSource> =
            Arc::new(crate::bootstrap::EngineSnapshots::new(engine.clone()));

        let mut replicas: Vec<Replica<PlainBuffer, _>> = Vec::new();
        for name in ["a", "b", "c"] {
            let id = ReplicaId::new(name);
            let updates = hub.attach(&id);
            let mut replica =
                Replica::attach(id.clone(), updates, hub.publisher(), snapshots.clone());
            hub.signal_synced(&id, true).await;
            replica.drain().await;
            replicas.push(replica);
        }

        replicas[0].edit(0, 0, "hello").await.unwrap();
        service.drain().await;
        for replica in replicas.iter_mut() {
            replica.drain().await;
        }

        replicas[1].edit(5, 5, " world").await.unwrap();
        service.drain().await;
        for replica in replicas.iter_mut() {
            replica.drain().await;
        }

        replicas[2].edit(0, 0, "# ").await.unwrap();
        service.drain().await;
        for replica in replicas.iter_mut() {
            replica.drain().await;
        }

        let expected = engine.text();
        assert_eq!(expected, "# hello world");
        for replica in &replicas {
            assert_eq!(replica.text(), expected);
        }
    }

    #[tokio::test]
    async fn test_concurrent_inserts_resolve_arrival_order() {
        let hub = Arc::new(MemoryHub::new("doc"));
        let engine = ReconciliationEngine::new("").into_handle();
        let mut service = EngineService::new(engine.clone(), hub.clone());
        let snapshots: Arc<dyn SnapshotSource> =
            Arc::new(crate::bootstrap::EngineSnapshots::new(engine.clone()));

        let mut x: Replica<PlainBuffer, _> = Replica::attach(
            ReplicaId::new("x"),
            hub.attach(&ReplicaId::new("x")),
            hub.publisher(),
            snapshots.clone(),
        );
        let mut y: Replica<PlainBuffer, _> = Replica::attach(
            ReplicaId::new("y"),
            hub.attach(&ReplicaId::new("y")),
            hub.publisher(),
            snapshots.clone(),
        );
        hub.signal_synced(&ReplicaId::new("x"), true).await;
        hub.signal_synced(&ReplicaId::new("y"), true).await;
        x.drain().await;
        y.drain().await;

        // Both edit before seeing each other's operation.
        x.edit(0, 0, "ab").await.unwrap();
        y.edit(0, 0, "cd").await.unwrap();
        service.drain().await;
        x.drain().await;
        y.drain().await;

        // Arrival order X then Y; Y's at=0 is read against the post-X
        // document, so "cd" lands in front. No rebasing anywhere.
        assert_eq!(engine.text(), "cdab");
        assert_eq!(x.text(), "cdab");
        // Y applied X's insert against a buffer where "cd" already sat at
        // the front, so it diverges. This is the arrival-order-wins policy;
        // the full-resync repair is the designated recovery.
        assert_eq!(y.text(), "abcd");

        hub.signal_synced(&ReplicaId::new("y"), true).await;
        y.drain().await;
        assert_eq!(y.text(), "cdab");
    }

    #[tokio::test]
    async fn test_edit_while_disconnected_defers_publication() {
        let hub = Arc::new(MemoryHub::new("doc"));
        let engine = ReconciliationEngine::new("").into_handle();
        let mut service = EngineService::new(engine.clone(), hub.clone());
        let snapshots: Arc<dyn SnapshotSource> =
            Arc::new(crate::bootstrap::EngineSnapshots::new(engine.clone()));

        let id = ReplicaId::new("a");
        let mut replica: Replica<PlainBuffer, _> =
            Replica::attach(id.clone(), hub.attach(&id), hub.publisher(), snapshots);
        hub.signal_synced(&id, true).await;
        replica.drain().await;

        replica.channel().disconnect();
        replica.edit(0, 0, "offline edit").await.unwrap();
        service.drain().await;
        // Local edit kept, publication deferred.
        assert_eq!(replica.text(), "offline edit");
        assert_eq!(engine.text(), "");

        replica.channel().reconnect().await.unwrap();
        service.drain().await;
        replica.drain().await;
        assert_eq!(engine.text(), "offline edit");
        assert_eq!(replica.text(), "offline edit");
    }
}
