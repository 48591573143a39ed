//! Field-tagged edit records broadcast over the channel.
//!
//! The schema is fixed for compatibility with existing peers:
//!
//! ```text
//! { action: "insert", fromA, toA, text, viewId }   replace [fromA,toA) with text
//! { action: "splice", index, value, viewId }       insert value at index
//! { action: "del",    index, length?, viewId }     remove length chars (default 1)
//! ```
//!
//! Decoding is lenient: extra fields are ignored and an unrecognized
//! `action` yields [`WireOp::Unknown`], which callers skip with a warning
//! instead of aborting the batch.

use crate::error::Result;
use chorus_core::{Operation, OperationBatch, ReplicaId};
use serde::{Deserialize, Serialize};

fn default_del_length() -> usize {
    1
}

/// One edit record as it appears on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum WireOp {
    #[serde(rename = "insert")]
    Insert {
        #[serde(rename = "fromA")]
        from_a: usize,
        #[serde(rename = "toA")]
        to_a: usize,
        #[serde(default)]
        text: String,
        #[serde(rename = "viewId")]
        view_id: String,
    },
    #[serde(rename = "splice")]
    Splice {
        index: usize,
        value: String,
        #[serde(rename = "viewId")]
        view_id: String,
    },
    #[serde(rename = "del")]
    Del {
        index: usize,
        #[serde(default = "default_del_length")]
        length: usize,
        #[serde(rename = "viewId")]
        view_id: String,
    },
    /// Unrecognized action tag. Skipped by every consumer.
    #[serde(other)]
    Unknown,
}

impl WireOp {
    /// Encode one canonical operation for a given origin.
    pub fn from_op(op: &Operation, origin: &ReplicaId) -> Self {
        match op {
            Operation::Insert { at, removed, text } => WireOp::Insert {
                from_a: *at,
                to_a: at + removed,
                text: text.clone(),
                view_id: origin.0.clone(),
            },
            Operation::Delete { from, to } => WireOp::Del {
                index: *from,
                length: to.saturating_sub(*from),
                view_id: origin.0.clone(),
            },
            Operation::LegacySplice { at, text } => WireOp::Splice {
                index: *at,
                value: text.clone(),
                view_id: origin.0.clone(),
            },
        }
    }

    /// The origin carried by this record, if it has one.
    pub fn origin(&self) -> Option<ReplicaId> {
        match self {
            WireOp::Insert { view_id, .. }
            | WireOp::Splice { view_id, .. }
            | WireOp::Del { view_id, .. } => Some(ReplicaId::new(view_id.clone())),
            WireOp::Unknown => None,
        }
    }

    /// Decode into a canonical operation, or `None` for unknown actions.
    pub fn into_op(self) -> Option<Operation> {
        match self {
            WireOp::Insert {
                from_a, to_a, text, ..
            } => Some(Operation::Insert {
                at: from_a,
                removed: to_a.saturating_sub(from_a),
                text,
            }),
            WireOp::Splice { index, value, .. } => Some(Operation::LegacySplice {
                at: index,
                text: value,
            }),
            WireOp::Del { index, length, .. } => Some(Operation::Delete {
                from: index,
                // Wire-supplied coordinates can be absurd; saturate here and
                // let the document clamp to its bounds.
                to: index.saturating_add(length),
            }),
            WireOp::Unknown => None,
        }
    }
}

/// Encode a whole batch as the wire records for one publish.
pub fn to_wire(batch: &OperationBatch) -> Vec<WireOp> {
    batch
        .ops
        .iter()
        .map(|op| WireOp::from_op(op, &batch.origin))
        .collect()
}

/// Serialize a batch to its JSON wire form.
pub fn encode_batch(batch: &OperationBatch) -> Result<String> {
    Ok(serde_json::to_string(&to_wire(batch))?)
}

/// Deserialize wire records from JSON.
pub fn decode_ops(json: &str) -> Result<Vec<WireOp>> {
    Ok(serde_json::from_str(json)?)
}
