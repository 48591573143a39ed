//! Selection ranges and their remapping.
//!
//! A selection is local to each replica and never authoritative; it is
//! carried through every applied operation via [`PosMap`] so a cursor keeps
//! pointing at the "same" text while remote edits land around it.
//!
//! The serialized shape (`ranges` of `anchor`/`head` plus a `main` index)
//! is fixed by the persisted-document schema.

use crate::posmap::PosMap;
use serde::{Deserialize, Serialize};

/// One selection range. `anchor == head` is a plain cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelRange {
    pub anchor: usize,
    pub head: usize,
}

impl SelRange {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// A zero-width cursor at `pos`.
    pub fn cursor(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    pub fn is_cursor(&self) -> bool {
        self.anchor == self.head
    }

    /// Carry both endpoints through a position mapping.
    pub fn map(&self, map: &PosMap) -> Self {
        Self {
            anchor: map.map_pos(self.anchor),
            head: map.map_pos(self.head),
        }
    }

    /// Clamp both endpoints to a document length.
    pub fn clamp(&self, len: usize) -> Self {
        Self {
            anchor: self.anchor.min(len),
            head: self.head.min(len),
        }
    }
}

/// An ordered set of selection ranges with a main (primary) range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub ranges: Vec<SelRange>,
    pub main: usize,
}

impl Selection {
    /// A single zero-width cursor at `pos`.
    pub fn point(pos: usize) -> Self {
        Self {
            ranges: vec![SelRange::cursor(pos)],
            main: 0,
        }
    }

    pub fn new(ranges: Vec<SelRange>, main: usize) -> Self {
        Self { ranges, main }
    }

    /// Whether the selection has at least one range and a valid main index.
    pub fn is_valid(&self) -> bool {
        !self.ranges.is_empty() && self.main < self.ranges.len()
    }

    /// Carry every range through a position mapping in one pass.
    pub fn map(&self, map: &PosMap) -> Self {
        Self {
            ranges: self.ranges.iter().map(|r| r.map(map)).collect(),
            main: self.main,
        }
    }

    /// Clamp every range to a document length.
    pub fn clamp(&self, len: usize) -> Self {
        Self {
            ranges: self.ranges.iter().map(|r| r.clamp(len)).collect(),
            main: self.main,
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::point(0)
    }
}
