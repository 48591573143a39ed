//! Chorus Core - Data model for the Chorus collaborative text engine.
//!
//! This crate defines the canonical vocabulary shared by every layer of the
//! system:
//!
//! - [`op`] - Operations, operation batches, and replica identity
//! - [`document`] - The authoritative character-sequence document
//! - [`posmap`] - Position mapping through applied operations
//! - [`selection`] - Cursor/selection ranges and their remapping
//!
//! Everything here is plain data with no I/O: the session layer owns the
//! channels and event loops, the wire layer owns serialization.

pub mod document;
pub mod op;
pub mod posmap;
pub mod selection;

pub use document::{Applied, Document};
pub use op::{Operation, OperationBatch, ReplicaId};
pub use posmap::PosMap;
pub use selection::{SelRange, Selection};
