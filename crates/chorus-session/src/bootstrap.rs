//! Replica bootstrap and the idempotent full-resync repair.
//!
//! On attach a replica's buffer is seeded from the authoritative snapshot
//! plus a persisted selection when one exists. When the transport signals
//! "caught up", the buffer is compared against the snapshot and, on any
//! divergence, force-replaced in one atomic transaction. The repair is a
//! no-op when nothing diverged and is safe to run at any time; it is the
//! backstop for every residual inconsistency in the system.

use crate::buffer::{EditBuffer, OriginTag, Span};
use crate::engine::EngineHandle;
use chorus_core::Selection;
use tracing::{debug, info};

/// Read access to the authoritative snapshot.
pub trait SnapshotSource: Send + Sync {
    /// Current authoritative document text.
    fn snapshot_text(&self) -> String;

    /// Selection persisted with the document, if any.
    fn persisted_selection(&self) -> Option<Selection>;
}

/// Snapshot access backed by a shared engine handle.
pub struct EngineSnapshots {
    engine: EngineHandle,
}

impl EngineSnapshots {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }
}

impl SnapshotSource for EngineSnapshots {
    fn snapshot_text(&self) -> String {
        self.engine.text()
    }

    fn persisted_selection(&self) -> Option<Selection> {
        self.engine.persisted_selection()
    }
}

/// Seed a buffer from the authoritative snapshot at attach time.
pub fn attach<B: EditBuffer + ?Sized>(buffer: &mut B, source: &dyn SnapshotSource) {
    let text = source.snapshot_text();
    let len = buffer.len_chars();
    buffer.apply(
        &[Span {
            from: 0,
            to: len,
            insert: text.clone(),
        }],
        OriginTag::SyntheticReplay,
    );

    let selection = match source.persisted_selection() {
        Some(sel) if sel.is_valid() => sel.clamp(text.chars().count()),
        _ => Selection::point(0),
    };
    buffer.set_selection(selection, OriginTag::SyntheticReplay);
    debug!(len = text.chars().count(), "buffer seeded from snapshot");
}

/// Compare the buffer against the authoritative snapshot; on divergence,
/// force-replace the content in one atomic transaction. Returns whether a
/// repair happened.
pub fn resync<B: EditBuffer + ?Sized>(buffer: &mut B, source: &dyn SnapshotSource) -> bool {
    let authoritative = source.snapshot_text();
    if buffer.text() == authoritative {
        return false;
    }

    let len = buffer.len_chars();
    let selection = buffer.selection();
    buffer.apply(
        &[Span {
            from: 0,
            to: len,
            insert: authoritative.clone(),
        }],
        OriginTag::SyntheticReplay,
    );
    buffer.set_selection(
        selection.clamp(authoritative.chars().count()),
        OriginTag::SyntheticReplay,
    );
    info!("resync repaired diverged buffer");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PlainBuffer;
    use chorus_core::SelRange;

    struct FixedSnapshot {
        text: String,
        selection: Option<Selection>,
    }

    impl SnapshotSource for FixedSnapshot {
        fn snapshot_text(&self) -> String {
            self.text.clone()
        }

        fn persisted_selection(&self) -> Option<Selection> {
            self.selection.clone()
        }
    }

    #[test]
    fn test_attach_seeds_text_and_selection() {
        let source = FixedSnapshot {
            text: "restored".to_string(),
            selection: Some(Selection::new(vec![SelRange::new(2, 5)], 0)),
        };
        let mut buffer = PlainBuffer::new();
        attach(&mut buffer, &source);

        assert_eq!(buffer.text(), "restored");
        assert_eq!(
            buffer.selection(),
            Selection::new(vec![SelRange::new(2, 5)], 0)
        );
    }

    #[test]
    fn test_attach_without_selection_defaults_to_point() {
        let source = FixedSnapshot {
            text: "doc".to_string(),
            selection: None,
        };
        let mut buffer = PlainBuffer::from_text("stale local state");
        attach(&mut buffer, &source);

        assert_eq!(buffer.text(), "doc");
        assert_eq!(buffer.selection(), Selection::point(0));
    }

    #[test]
    fn test_resync_repairs_divergence() {
        let source = FixedSnapshot {
            text: "authoritative".to_string(),
            selection: None,
        };
        let mut buffer = PlainBuffer::from_text("diverged");

        assert!(resync(&mut buffer, &source));
        assert_eq!(buffer.text(), "authoritative");
    }

    #[test]
    fn test_resync_is_idempotent() {
        let source = FixedSnapshot {
            text: "same".to_string(),
            selection: None,
        };
        let mut buffer = PlainBuffer::from_text("same");

        assert!(!resync(&mut buffer, &source));
        assert_eq!(buffer.text(), "same");
        // A second repair with no intervening edits changes nothing.
        assert!(!resync(&mut buffer, &source));
        assert_eq!(buffer.text(), "same");
    }

    #[test]
    fn test_resync_clamps_selection() {
        let source = FixedSnapshot {
            text: "ab".to_string(),
            selection: None,
        };
        let mut buffer = PlainBuffer::from_text("much longer text");
        buffer.set_selection(Selection::point(10), OriginTag::LocalUserEdit);

        resync(&mut buffer, &source);
        assert_eq!(buffer.selection(), Selection::point(2));
    }
}
