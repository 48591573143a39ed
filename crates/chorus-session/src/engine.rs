//! The reconciliation engine: the single authoritative serialization
//! point.
//!
//! Every content-affecting operation passes through
//! [`ReconciliationEngine::receive`] in arrival order, so the order the
//! engine rebroadcasts is the global total order every replica observes.
//! Coordinates are read against the document state at the moment the
//! engine processes the operation, strictly in batch order, with no
//! rebasing: concurrent edits resolve arrival-order-wins.

use crate::buffer::{Change, EditBuffer, OriginTag, PlainBuffer, Span, Transaction};
use crate::channel::MemoryHub;
use crate::error::Result;
use crate::translator::OperationTranslator;
use chorus_core::{Document, Operation, OperationBatch, PosMap, ReplicaId, Selection};
use chorus_wire::{decode_snapshot_v1, encode_snapshot_v1, WireOp};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Owner of the authoritative document.
///
/// The engine also keeps its own editable view of the document for
/// bookkeeping: every applied batch is mirrored into it as a
/// synthetic-tagged transaction, which the engine's translator must
/// translate to nothing. That closed loop is checked on every receive.
pub struct ReconciliationEngine {
    document: Document,
    view: PlainBuffer,
    translator: OperationTranslator,
    persisted_selection: Option<Selection>,
}

impl ReconciliationEngine {
    pub fn new(initial_text: &str) -> Self {
        Self {
            document: Document::from_text(initial_text),
            view: PlainBuffer::from_text(initial_text),
            translator: OperationTranslator::new(ReplicaId::new("engine")),
            persisted_selection: None,
        }
    }

    /// Restore an engine from a persisted snapshot.
    pub fn from_snapshot(json: &str) -> Result<Self> {
        let snapshot = decode_snapshot_v1(json)?;
        let text = snapshot.text.to_text();
        let mut engine = Self::new(&text);
        engine.persisted_selection = snapshot.selection;
        Ok(engine)
    }

    /// Persist the current state.
    pub fn snapshot_json(&self) -> Result<String> {
        let text = self.document.to_string();
        Ok(encode_snapshot_v1(&text, self.persisted_selection.as_ref())?)
    }

    pub fn text(&self) -> String {
        self.document.to_string()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn persisted_selection(&self) -> Option<&Selection> {
        self.persisted_selection.as_ref()
    }

    /// Apply a batch to the authoritative document, in order, and mirror
    /// it into the bookkeeping view. Returns the composed position map.
    ///
    /// Out-of-bounds coordinates are clamped to the current bounds: one
    /// stale operation must not abort the batch or desynchronize the
    /// session.
    pub fn receive(&mut self, batch: &OperationBatch) -> PosMap {
        let mut composed = PosMap::identity();
        let mut spans = Vec::with_capacity(batch.ops.len());

        for op in &batch.ops {
            let applied = self.document.apply(op);
            if applied.clamped {
                warn!(origin = %batch.origin, ?op, "operation clamped to document bounds");
            }
            let insert = match op {
                Operation::Insert { text, .. } | Operation::LegacySplice { text, .. } => {
                    text.clone()
                }
                Operation::Delete { .. } => String::new(),
            };
            spans.push(Span {
                from: applied.at,
                to: applied.at + applied.removed,
                insert,
            });
            composed = composed.then(applied.map);
        }

        // Mirror into the engine's own view as a synthetic transaction.
        let changes: Vec<Change> = spans
            .iter()
            .map(|s| Change {
                from_old: s.from,
                to_old: s.to,
                inserted: s.insert.clone(),
            })
            .collect();
        self.view.apply(&spans, OriginTag::SyntheticReplay);
        let mirrored = Transaction {
            changes,
            origin: OriginTag::SyntheticReplay,
        };
        debug_assert!(
            self.translator.translate(&mirrored).is_empty(),
            "reconcile mutation must never re-translate"
        );
        debug_assert_eq!(self.view.text(), self.document.to_string());

        debug!(origin = %batch.origin, ops = batch.len(), len = self.document.len(),
               "batch applied");
        composed
    }

    pub fn into_handle(self) -> EngineHandle {
        EngineHandle(Arc::new(RwLock::new(self)))
    }
}

/// Shared handle to the engine, for the service loop and snapshot reads.
#[derive(Clone)]
pub struct EngineHandle(pub Arc<RwLock<ReconciliationEngine>>);

impl EngineHandle {
    pub fn text(&self) -> String {
        self.0.read().text()
    }

    pub fn persisted_selection(&self) -> Option<Selection> {
        self.0.read().persisted_selection().cloned()
    }
}

/// Build a canonical batch from wire records, skipping unknown actions.
///
/// Returns `None` when nothing actionable remains.
pub fn batch_from_wire(ops: &[WireOp]) -> Option<OperationBatch> {
    let mut origin = None;
    let mut decoded = Vec::with_capacity(ops.len());
    for wire in ops {
        match wire.clone().into_op() {
            Some(op) => {
                if origin.is_none() {
                    origin = wire.origin();
                }
                decoded.push(op);
            }
            None => warn!("ignoring unknown wire action"),
        }
    }
    let origin = origin?;
    Some(OperationBatch::with_ops(origin, decoded))
}

/// Drives the engine from the hub's edit stream: apply in arrival order,
/// then rebroadcast to every subscriber, the origin included.
pub struct EngineService {
    engine: EngineHandle,
    hub: Arc<MemoryHub>,
    edits: mpsc::Receiver<Vec<WireOp>>,
}

impl EngineService {
    pub fn new(engine: EngineHandle, hub: Arc<MemoryHub>) -> Self {
        let edits = hub.take_edits();
        Self { engine, hub, edits }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    async fn handle(&mut self, ops: Vec<WireOp>) {
        if let Some(batch) = batch_from_wire(&ops) {
            self.engine.0.write().receive(&batch);
        }
        // Rebroadcast the records as received; replicas do their own
        // unknown-action filtering, like any other subscriber would.
        self.hub.broadcast(ops).await;
    }

    /// Process every edit batch currently queued. Returns how many were
    /// handled.
    pub async fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(ops) = self.edits.try_recv() {
            self.handle(ops).await;
            handled += 1;
        }
        handled
    }

    /// Run until every publisher is gone.
    pub async fn run(mut self) {
        while let Some(ops) = self.edits.recv().await {
            self.handle(ops).await;
        }
        debug!("edit stream closed; engine service stopping");
    }
}
