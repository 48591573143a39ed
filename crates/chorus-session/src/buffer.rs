//! The editable-buffer boundary.
//!
//! The real text buffer (rendering, cursor UI, input handling) is an
//! external collaborator; this module defines the narrow seam the pipeline
//! talks through. Inbound, the buffer reports transactions as ordered
//! change lists tagged with their authorship; outbound, the pipeline asks
//! the buffer to apply span transactions and set selections, always tagged
//! [`OriginTag::SyntheticReplay`] so they are never translated again.
//!
//! [`PlainBuffer`] is the in-memory implementation used by tests and the
//! simulation binary.

use chorus_core::Selection;

/// Who authored a buffer mutation.
///
/// The translator forwards only `LocalUserEdit` transactions; everything
/// the pipeline itself writes into a buffer is `SyntheticReplay`. This is
/// the feedback-loop guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OriginTag {
    LocalUserEdit,
    SyntheticReplay,
}

/// One raw change in pre-transaction coordinates: replace
/// `[from_old, to_old)` with `inserted`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    pub from_old: usize,
    pub to_old: usize,
    pub inserted: String,
}

/// One buffer transaction as reported by the buffer provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Ordered changes, all in pre-transaction coordinates.
    pub changes: Vec<Change>,
    pub origin: OriginTag,
}

/// One span of an outbound transaction: replace `[from, to)` with
/// `insert`, in current document coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub from: usize,
    pub to: usize,
    pub insert: String,
}

/// The editable text buffer seam.
pub trait EditBuffer: Send {
    fn text(&self) -> String;

    fn len_chars(&self) -> usize;

    /// Apply one atomic transaction. Spans are interpreted sequentially:
    /// each span's coordinates are valid after the spans before it have
    /// taken effect.
    fn apply(&mut self, spans: &[Span], origin: OriginTag);

    fn selection(&self) -> Selection;

    fn set_selection(&mut self, selection: Selection, origin: OriginTag);
}

/// A plain in-memory buffer: character vector plus a selection.
#[derive(Clone, Debug, Default)]
pub struct PlainBuffer {
    chars: Vec<char>,
    selection: Selection,
}

impl PlainBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            selection: Selection::point(0),
        }
    }
}

impl EditBuffer for PlainBuffer {
    fn text(&self) -> String {
        self.chars.iter().collect()
    }

    fn len_chars(&self) -> usize {
        self.chars.len()
    }

    fn apply(&mut self, spans: &[Span], _origin: OriginTag) {
        for span in spans {
            let len = self.chars.len();
            let from = span.from.min(len);
            let to = span.to.min(len).max(from);
            self.chars.splice(from..to, span.insert.chars());
        }
        // Keep the selection inside bounds; remapping is the caller's job.
        self.selection = self.selection.clamp(self.chars.len());
    }

    fn selection(&self) -> Selection {
        self.selection.clone()
    }

    fn set_selection(&mut self, selection: Selection, _origin: OriginTag) {
        self.selection = selection.clamp(self.chars.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_apply_sequentially() {
        let mut buffer = PlainBuffer::from_text("abc");
        buffer.apply(
            &[
                Span {
                    from: 0,
                    to: 0,
                    insert: "xy".to_string(),
                },
                // Coordinates valid after the first span took effect.
                Span {
                    from: 2,
                    to: 3,
                    insert: String::new(),
                },
            ],
            OriginTag::SyntheticReplay,
        );
        assert_eq!(buffer.text(), "xybc");
    }

    #[test]
    fn test_full_overwrite() {
        let mut buffer = PlainBuffer::from_text("old content");
        let len = buffer.len_chars();
        buffer.apply(
            &[Span {
                from: 0,
                to: len,
                insert: "new".to_string(),
            }],
            OriginTag::SyntheticReplay,
        );
        assert_eq!(buffer.text(), "new");
    }

    #[test]
    fn test_selection_clamped_after_apply() {
        let mut buffer = PlainBuffer::from_text("abcdef");
        buffer.set_selection(Selection::point(6), OriginTag::LocalUserEdit);
        buffer.apply(
            &[Span {
                from: 2,
                to: 6,
                insert: String::new(),
            }],
            OriginTag::SyntheticReplay,
        );
        assert_eq!(buffer.selection(), Selection::point(2));
    }

    #[test]
    fn test_out_of_bounds_span_clamped() {
        let mut buffer = PlainBuffer::from_text("ab");
        buffer.apply(
            &[Span {
                from: 10,
                to: 20,
                insert: "c".to_string(),
            }],
            OriginTag::SyntheticReplay,
        );
        assert_eq!(buffer.text(), "abc");
    }
}
