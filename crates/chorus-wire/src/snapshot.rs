//! Persisted document layout.
//!
//! ```text
//! { text: string | [lines], selection?: { ranges: [{anchor, head}], main } }
//! ```
//!
//! Some producers persist the text as a list of lines, others as one
//! string; both decode to the same buffer. A missing or invalid selection
//! falls back to a single point at the start of the document.

use crate::error::{Result, WireError};
use chorus_core::Selection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Text as persisted: either one joined string or a list of lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotText {
    Joined(String),
    Lines(Vec<String>),
}

impl SnapshotText {
    pub fn to_text(&self) -> String {
        match self {
            SnapshotText::Joined(s) => s.clone(),
            SnapshotText::Lines(lines) => lines.join("\n"),
        }
    }
}

/// The persisted document record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub text: SnapshotText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
}

impl DocumentSnapshot {
    /// The selection to restore: the persisted one when valid, else a
    /// point at the start of the document.
    pub fn selection_or_default(&self) -> Selection {
        match &self.selection {
            Some(sel) if sel.is_valid() => sel.clone(),
            _ => Selection::point(0),
        }
    }
}

/// Encode a snapshot (v1 layout): text persisted as a list of lines.
pub fn encode_snapshot_v1(text: &str, selection: Option<&Selection>) -> Result<String> {
    let snapshot = DocumentSnapshot {
        text: SnapshotText::Lines(text.split('\n').map(str::to_string).collect()),
        selection: selection.cloned(),
    };
    Ok(serde_json::to_string(&snapshot)?)
}

/// Decode a snapshot (v1 layout).
pub fn decode_snapshot_v1(json: &str) -> Result<DocumentSnapshot> {
    let value: Value = serde_json::from_str(json)?;
    if value.get("text").is_none() {
        return Err(WireError::MissingText);
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_core::SelRange;

    #[test]
    fn test_text_as_string() {
        let snap = decode_snapshot_v1(r#"{"text": "hello\nworld"}"#).unwrap();
        assert_eq!(snap.text.to_text(), "hello\nworld");
        assert_eq!(snap.selection_or_default(), Selection::point(0));
    }

    #[test]
    fn test_text_as_lines() {
        let snap = decode_snapshot_v1(r#"{"text": ["hello", "world"]}"#).unwrap();
        assert_eq!(snap.text.to_text(), "hello\nworld");
    }

    #[test]
    fn test_selection_restored() {
        let json = r#"{
            "text": "abc",
            "selection": {"ranges": [{"anchor": 1, "head": 2}], "main": 0}
        }"#;
        let snap = decode_snapshot_v1(json).unwrap();
        assert_eq!(
            snap.selection_or_default(),
            Selection::new(vec![SelRange::new(1, 2)], 0)
        );
    }

    #[test]
    fn test_empty_selection_falls_back_to_point() {
        let json = r#"{"text": "abc", "selection": {"ranges": [], "main": 0}}"#;
        let snap = decode_snapshot_v1(json).unwrap();
        assert_eq!(snap.selection_or_default(), Selection::point(0));
    }

    #[test]
    fn test_missing_text_is_an_error() {
        let err = decode_snapshot_v1(r#"{"selection": null}"#).unwrap_err();
        assert!(matches!(err, WireError::MissingText));
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let sel = Selection::point(4);
        let json = encode_snapshot_v1("line one\nline two", Some(&sel)).unwrap();
        let snap = decode_snapshot_v1(&json).unwrap();
        assert_eq!(snap.text.to_text(), "line one\nline two");
        assert_eq!(snap.selection_or_default(), sel);
    }
}
