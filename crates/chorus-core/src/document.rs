//! The authoritative document: an ordered character sequence.
//!
//! The document is mutated only through [`Document::apply`], which clamps
//! out-of-bounds coordinates to the current bounds instead of failing. One
//! stale operation must never abort a batch or desynchronize a session;
//! the full-resync repair in the session layer handles any residual
//! divergence.

use crate::op::Operation;
use crate::posmap::PosMap;
use serde::{Deserialize, Serialize};

/// Result of applying one operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Applied {
    /// Mapping from pre-operation to post-operation positions, built from
    /// the coordinates actually used after clamping.
    pub map: PosMap,
    /// Whether any coordinate had to be clamped to the document bounds.
    pub clamped: bool,
    /// Start of the replaced range, after clamping.
    pub at: usize,
    /// Number of characters actually removed, after clamping.
    pub removed: usize,
}

/// An ordered character sequence addressed by character offset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    chars: Vec<char>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
        }
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Apply one operation, clamping its coordinates to the current bounds.
    pub fn apply(&mut self, op: &Operation) -> Applied {
        match op {
            Operation::Insert { at, removed, text } => self.splice(*at, *removed, text),
            Operation::Delete { from, to } => {
                let removed = to.saturating_sub(*from);
                self.splice(*from, removed, "")
            }
            Operation::LegacySplice { at, text } => self.splice(*at, 0, text),
        }
    }

    /// Replace `[at, at + removed)` with `text`, clamped to bounds.
    fn splice(&mut self, at: usize, removed: usize, text: &str) -> Applied {
        let len = self.len();
        let at_c = at.min(len);
        let end = at.saturating_add(removed);
        let end_c = end.min(len);
        let clamped = at_c != at || end_c != end;

        let inserted: Vec<char> = text.chars().collect();
        let inserted_len = inserted.len();
        self.chars.splice(at_c..end_c, inserted);

        Applied {
            map: PosMap::replace(at_c, end_c - at_c, inserted_len),
            clamped,
            at: at_c,
            removed: end_c - at_c,
        }
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for ch in &self.chars {
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}
