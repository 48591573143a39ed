//! Chorus Wire - Explicit, versioned encoding for everything that leaves
//! the process.
//!
//! Two entities are persisted or transmitted:
//!
//! - [`wire`] - the field-tagged edit records broadcast over the channel
//!   (`action: "insert" | "splice" | "del"` plus a `viewId` origin)
//! - [`snapshot`] - the persisted document layout (text as a string or a
//!   list of lines, plus an optional selection)
//!
//! Every format has a dedicated encode/decode function pair; there is no
//! registry or reflection. Unknown wire actions decode to a sentinel that
//! callers skip rather than failing the whole batch.

pub mod error;
pub mod snapshot;
pub mod wire;

pub use error::{Result, WireError};
pub use snapshot::{decode_snapshot_v1, encode_snapshot_v1, DocumentSnapshot};
pub use wire::{decode_ops, encode_batch, to_wire, WireOp};
