//! Canonical operations and replica identity.
//!
//! An [`Operation`] describes one text mutation in document character
//! offsets. Coordinates are always valid against the document state
//! immediately before the operation is applied; the engine reads them at
//! face value in arrival order, with no rebasing.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identity of one replica (one participant's buffer).
///
/// Used solely to suppress re-application of self-originated operations
/// when the engine echoes a batch back to everyone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaId(pub String);

impl ReplicaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh unique identity.
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }
}

impl std::fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One canonical text mutation in document character offsets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Replace `[at, at + removed)` with `text`.
    ///
    /// `removed = 0` makes this a pure insertion.
    Insert {
        at: usize,
        removed: usize,
        text: String,
    },
    /// Remove `[from, to)`.
    Delete { from: usize, to: usize },
    /// Insert `text` at `at` with nothing removed.
    ///
    /// Semantically identical to `Insert` with `removed = 0`; retained only
    /// for wire compatibility with the legacy `splice` action.
    LegacySplice { at: usize, text: String },
}

impl Operation {
    /// Whether applying this operation would leave any document unchanged.
    pub fn is_noop(&self) -> bool {
        match self {
            Operation::Insert { removed, text, .. } => *removed == 0 && text.is_empty(),
            Operation::Delete { from, to } => from >= to,
            Operation::LegacySplice { text, .. } => text.is_empty(),
        }
    }
}

/// Ordered sequence of operations derived from a single local transaction.
///
/// Operations in a batch must be applied strictly in list order: later
/// operations assume the earlier ones already took effect. An empty batch
/// must never be published.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationBatch {
    /// The operations, in application order.
    pub ops: Vec<Operation>,
    /// The replica that issued this batch.
    pub origin: ReplicaId,
}

impl OperationBatch {
    pub fn new(origin: ReplicaId) -> Self {
        Self {
            ops: Vec::new(),
            origin,
        }
    }

    pub fn with_ops(origin: ReplicaId, ops: Vec<Operation>) -> Self {
        Self { ops, origin }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}
