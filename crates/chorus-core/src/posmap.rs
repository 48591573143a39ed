//! Position mapping through applied operations.
//!
//! Every applied operation yields a [`PosMap`] that carries document
//! positions from the pre-operation coordinate space into the
//! post-operation space. Maps compose, so a whole batch can remap a
//! selection in a single pass.
//!
//! Mapping policy:
//!
//! - An insertion at `p` shifts every position `>= p` right by the inserted
//!   length (forward bias: an anchor sitting exactly at `p` moves with the
//!   insertion, matching editable-buffer semantics).
//! - A deletion of `[from, to)` collapses positions inside the range to
//!   `from` and shifts positions `>= to` left by the deleted length.

use serde::{Deserialize, Serialize};

/// One primitive coordinate shift.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum Step {
    Ins { at: usize, len: usize },
    Del { from: usize, to: usize },
}

impl Step {
    fn map(&self, pos: usize) -> usize {
        match *self {
            Step::Ins { at, len } => {
                if pos >= at {
                    pos + len
                } else {
                    pos
                }
            }
            Step::Del { from, to } => {
                if pos >= to {
                    pos - (to - from)
                } else if pos > from {
                    from
                } else {
                    pos
                }
            }
        }
    }
}

/// Composable position mapping for one or more applied operations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosMap {
    steps: Vec<Step>,
}

impl PosMap {
    /// The identity mapping.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Mapping for a replacement of `[at, at + removed)` with `inserted`
    /// characters. The deletion step runs first, then the insertion, so a
    /// pure insert (`removed = 0`) and a pure delete (`inserted = 0`) are
    /// both special cases.
    pub fn replace(at: usize, removed: usize, inserted: usize) -> Self {
        let mut steps = Vec::with_capacity(2);
        if removed > 0 {
            steps.push(Step::Del {
                from: at,
                to: at + removed,
            });
        }
        if inserted > 0 {
            steps.push(Step::Ins { at, len: inserted });
        }
        Self { steps }
    }

    /// Mapping for a pure insertion of `len` characters at `at`.
    pub fn insert(at: usize, len: usize) -> Self {
        Self::replace(at, 0, len)
    }

    /// Mapping for a pure deletion of `[from, to)`.
    pub fn delete(from: usize, to: usize) -> Self {
        Self::replace(from, to.saturating_sub(from), 0)
    }

    pub fn is_identity(&self) -> bool {
        self.steps.is_empty()
    }

    /// Compose: `self` first, then `next`.
    pub fn then(mut self, next: PosMap) -> PosMap {
        self.steps.extend(next.steps);
        self
    }

    /// Carry a position through the mapping.
    pub fn map_pos(&self, pos: usize) -> usize {
        self.steps.iter().fold(pos, |p, step| step.map(p))
    }
}
