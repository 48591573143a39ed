//! Translate local buffer transactions into canonical operation batches.

use crate::buffer::{OriginTag, Transaction};
use chorus_core::{Operation, OperationBatch, ReplicaId};

/// Converts one local transaction into an [`OperationBatch`].
///
/// Transactions tagged [`OriginTag::SyntheticReplay`] translate to an
/// empty batch: mutations the pipeline itself performed must never be
/// re-published, or every replica would echo forever. Callers skip
/// publication when the batch is empty.
#[derive(Clone, Debug)]
pub struct OperationTranslator {
    origin: ReplicaId,
}

impl OperationTranslator {
    pub fn new(origin: ReplicaId) -> Self {
        Self { origin }
    }

    pub fn origin(&self) -> &ReplicaId {
        &self.origin
    }

    /// Translate a transaction. Pure: reads the transaction, returns the
    /// batch, touches nothing else.
    pub fn translate(&self, tx: &Transaction) -> OperationBatch {
        let mut batch = OperationBatch::new(self.origin.clone());
        if tx.origin == OriginTag::SyntheticReplay {
            return batch;
        }

        for change in &tx.changes {
            let op = Operation::Insert {
                at: change.from_old,
                removed: change.to_old.saturating_sub(change.from_old),
                text: change.inserted.clone(),
            };
            if !op.is_noop() {
                batch.ops.push(op);
            }
        }
        batch
    }
}
