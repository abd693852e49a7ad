//! Heading prefixes of propagable line types and list renumbering.
//!
//! Ordered and unordered list lines carry a visible prefix ("1. ", "• ") as
//! ordinary text at the start of their content. The prefix of a line is a
//! function of its type and of its ordinal inside the maximal contiguous run
//! of lines sharing that type.

use regex::Regex;
use std::sync::OnceLock;

use crate::attributes::Attributes;
use crate::delta::{Delta, DeltaBuilder};
use crate::lines::{LineChunk, TextLineType};
use crate::selection::OffsetEdit;

pub const BULLET: &str = "• ";
pub const ORDERED_SEPARATOR: &str = ". ";

fn ordered_prefix() -> &'static Regex {
    static ORDERED_PREFIX: OnceLock<Regex> = OnceLock::new();
    ORDERED_PREFIX.get_or_init(|| Regex::new(r"^[0-9]+\. ").expect("Invalid ordered prefix regex"))
}

/// The prefix a line of `line_type` shows at position `ordinal` (0-based) of
/// its list. Empty for non-propagable types.
pub fn heading_characters(line_type: &TextLineType, ordinal: usize) -> String {
    match line_type {
        TextLineType::OrderedList => format!("{}{ORDERED_SEPARATOR}", ordinal + 1),
        TextLineType::UnorderedList => BULLET.to_string(),
        TextLineType::Normal | TextLineType::Custom(_) => String::new(),
    }
}

/// Length in characters of a prefix generated for `line_type` (any ordinal)
/// at the start of `content`.
pub fn heading_prefix_len(line_type: &TextLineType, content: &str) -> Option<usize> {
    match line_type {
        TextLineType::OrderedList => ordered_prefix()
            .find(content)
            .map(|found| found.as_str().chars().count()),
        TextLineType::UnorderedList => content
            .starts_with(BULLET)
            .then(|| BULLET.chars().count()),
        TextLineType::Normal | TextLineType::Custom(_) => None,
    }
}

impl Delta {
    /// Renumbers every list in the document so that each contiguous run of
    /// a propagable type is prefixed 0..k-1 in document order.
    pub fn renumber_lists(&self) -> Delta {
        let mut chunks = self.split_lines();
        renumber(&mut chunks);
        Delta::from_lines(&chunks)
    }
}

/// Removes the prefix `line_type` generated from the start of the line.
/// Returns the number of characters removed.
pub(crate) fn strip_heading(chunk: &mut LineChunk, line_type: &TextLineType) -> usize {
    let Some(prefix_len) = heading_prefix_len(line_type, &chunk.content.text()) else {
        return 0;
    };
    chunk.content = chunk.content.slice(prefix_len, chunk.content_len());
    prefix_len
}

/// Brings every propagable line's prefix in line with its ordinal, replacing
/// a recognized prefix or inserting a fresh one. Returns the edits made, in
/// document order.
pub(crate) fn renumber(chunks: &mut [LineChunk]) -> Vec<OffsetEdit> {
    let mut edits = Vec::new();
    let mut line_start = 0;
    let mut previous_type = TextLineType::Normal;
    let mut ordinal = 0;
    for chunk in chunks.iter_mut() {
        let line_type = chunk.line_type();
        if line_type.is_propagable() {
            ordinal = if line_type == previous_type { ordinal + 1 } else { 0 };
            if let Some(edit) = apply_heading(chunk, &line_type, ordinal, line_start) {
                edits.push(edit);
            }
        }
        line_start += chunk.len();
        previous_type = line_type;
    }
    edits
}

fn apply_heading(
    chunk: &mut LineChunk,
    line_type: &TextLineType,
    ordinal: usize,
    line_start: usize,
) -> Option<OffsetEdit> {
    let expected = heading_characters(line_type, ordinal);
    let text = chunk.content.text();
    let existing = heading_prefix_len(line_type, &text).unwrap_or(0);
    if text.chars().take(existing).eq(expected.chars()) {
        return None;
    }
    let mut builder = DeltaBuilder::default();
    builder.push(&expected, &Attributes::default());
    builder.extend(&chunk.content.slice(existing, chunk.content_len()));
    chunk.content = builder.finish();
    Some(OffsetEdit {
        at: line_start,
        removed: existing,
        inserted: expected.chars().count(),
    })
}
