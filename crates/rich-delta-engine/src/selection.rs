use serde::{Deserialize, Serialize};

use crate::error::DeltaError;

/// A half-open range of character offsets; `start == end` is a caret.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        Selection { start, end }
    }

    pub fn caret(offset: usize) -> Self {
        Selection::new(offset, offset)
    }

    pub fn is_caret(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `offset` lies inside `start..end`.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// True when the selection touches `start..=end`, boundaries included.
    pub fn touches(&self, start: usize, end: usize) -> bool {
        self.start <= end && self.end >= start
    }

    /// Checks `start <= end <= len`.
    pub fn validate(&self, len: usize) -> Result<(), DeltaError> {
        if self.start > self.end || self.end > len {
            return Err(DeltaError::InvalidSelection {
                start: self.start,
                end: self.end,
                len,
            });
        }
        Ok(())
    }

    /// Maps both ends through a sequence of text edits.
    pub(crate) fn map_through(&self, edits: &[OffsetEdit]) -> Selection {
        Selection::new(map_offset(self.start, edits), map_offset(self.end, edits))
    }
}

impl From<std::ops::Range<usize>> for Selection {
    fn from(range: std::ops::Range<usize>) -> Self {
        Selection::new(range.start, range.end)
    }
}

/// Describes one atomic text edit reported by the host's text input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeContext {
    pub selection_before_change: Selection,
    pub selection_after_change: Selection,
    /// Number of characters removed, when the host knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_length: Option<usize>,
}

impl ChangeContext {
    pub fn new(selection_before_change: Selection, selection_after_change: Selection) -> Self {
        ChangeContext {
            selection_before_change,
            selection_after_change,
            deleted_length: None,
        }
    }

    pub fn with_deleted_length(mut self, deleted_length: usize) -> Self {
        self.deleted_length = Some(deleted_length);
        self
    }
}

/// A raw text-change event: the host's full new text plus its context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChangeEvent {
    pub new_text: String,
    #[serde(flatten)]
    pub context: ChangeContext,
}

impl TextChangeEvent {
    pub fn from_json(json: &str) -> Result<Self, DeltaError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A replacement of `removed` characters at `at` by `inserted` characters.
///
/// Edits in a sequence are expressed in the coordinates left by the
/// previous edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OffsetEdit {
    pub at: usize,
    pub removed: usize,
    pub inserted: usize,
}

/// Offsets inside a removed span collapse to the end of the inserted text;
/// an offset exactly at an insertion point moves past it.
fn map_offset(offset: usize, edits: &[OffsetEdit]) -> usize {
    edits.iter().fold(offset, |offset, edit| {
        if offset < edit.at {
            offset
        } else if offset < edit.at + edit.removed {
            edit.at + edit.inserted
        } else {
            offset - edit.removed + edit.inserted
        }
    })
}
