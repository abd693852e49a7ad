//! Diff reconciliation: rebuilding the document after a raw text change.
//!
//! The host text input only reports its whole new text and the selection
//! before and after the change. [`Delta::apply_text_diff`] infers the single
//! edit that happened, then splices it into the previous delta so that
//! untouched text keeps its attributes, inserted text gets the armed cursor
//! attributes, and line types follow the newline rules:
//!
//! - a newline typed inside a line leaves the line's type on the first half;
//!   the new line inherits it only for propagable (list) types;
//! - merging lines keeps the type of the first line;
//! - list prefixes are renumbered whenever the line structure changed;
//! - a list prefix is atomic: an edit landing inside it drops what is left
//!   of it and the prefix is regenerated.

use crate::attributes::{AttributeOverrides, Attributes};
use crate::delta::{Delta, DeltaBuilder, DeltaUpdate};
use crate::error::DeltaError;
use crate::heading::{heading_prefix_len, renumber, strip_heading};
use crate::lines::TextLineType;
use crate::selection::{ChangeContext, OffsetEdit};

/// The single edit inferred from a text change, in character offsets of
/// the previous text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TextEdit {
    start: usize,
    deleted: usize,
    inserted: String,
}

impl TextEdit {
    fn inserted_len(&self) -> usize {
        self.inserted.chars().count()
    }
}

impl Delta {
    /// Reconciles `new_text`, as reported by the host after one edit, with
    /// this delta.
    ///
    /// Armed `cursor_attributes` are stamped on inserted characters (a `None`
    /// entry keeps the attribute off). When nothing is armed, inserted
    /// characters take the attributes of the character before the insertion
    /// point.
    pub fn apply_text_diff(
        &self,
        new_text: &str,
        context: &ChangeContext,
        cursor_attributes: &AttributeOverrides,
    ) -> Result<DeltaUpdate, DeltaError> {
        let old_chars: Vec<char> = self.text().chars().collect();
        let new_chars: Vec<char> = new_text.chars().collect();
        context.selection_before_change.validate(old_chars.len())?;
        context.selection_after_change.validate(new_chars.len())?;

        let edit = localize_edit(&old_chars, &new_chars, context)?;
        log::trace!("reconciling text change as {edit:?}");

        let mut edits = Vec::new();
        let spliced = self.splice(&old_chars, &edit, cursor_attributes, &mut edits);

        let after = context.selection_after_change;
        let overriding_selection = Some(after.map_through(&edits)).filter(|mapped| *mapped != after);
        Ok(DeltaUpdate {
            final_delta: spliced,
            overriding_selection,
        })
    }

    fn splice(
        &self,
        old_chars: &[char],
        edit: &TextEdit,
        cursor_attributes: &AttributeOverrides,
        edits: &mut Vec<OffsetEdit>,
    ) -> Delta {
        let deleted_end = edit.start + edit.deleted;
        let deleted_newline = old_chars[edit.start..deleted_end].contains(&'\n');
        let inserted_newline = edit.inserted.contains('\n');

        let line_attributes = self.line_attributes_at(edit.start);
        let line_type = TextLineType::from_attributes(&line_attributes);
        let propagated = if line_type.is_propagable() {
            line_attributes.clone()
        } else {
            Attributes::default()
        };

        let prefix_span = if deleted_newline
            || inserted_newline
            || (edit.deleted == 0 && edit.inserted.is_empty())
        {
            None
        } else {
            touched_prefix(old_chars, edit.start, &line_type)
        };

        let text_attributes = if cursor_attributes.is_empty() {
            self.text_attributes_before(edit.start)
        } else {
            Attributes::default()
                .merge(cursor_attributes)
                .without_line_type()
        };

        let mut builder = DeltaBuilder::default();
        builder.extend(&self.slice(0, edit.start));
        for (index, segment) in edit.inserted.split('\n').enumerate() {
            if index == 1 {
                builder.push("\n", &line_attributes);
            } else if index > 1 {
                builder.push("\n", &propagated);
            }
            builder.push(segment, &text_attributes);
        }

        let starts_at_line_start = edit.start == 0 || old_chars[edit.start - 1] == '\n';
        let ends_at_line_start = deleted_end > edit.start && old_chars[deleted_end - 1] == '\n';
        let whole_lines_removed =
            deleted_newline && edit.inserted.is_empty() && starts_at_line_start && ends_at_line_start;

        let terminator = if inserted_newline {
            Some(propagated)
        } else if deleted_newline && !whole_lines_removed {
            Some(line_attributes)
        } else {
            None
        };
        let tail = self.slice(deleted_end, old_chars.len());
        let mut tail = match terminator {
            Some(attributes) => with_first_newline_attributes(&tail, &attributes),
            None => tail,
        };

        if deleted_newline && !inserted_newline && !whole_lines_removed && ends_at_line_start {
            let absorbed = TextLineType::from_attributes(&self.line_attributes_at(deleted_end));
            let mut chunks = tail.split_lines();
            if let Some(first) = chunks.first_mut() {
                let removed = strip_heading(first, &absorbed);
                if removed > 0 {
                    edits.push(OffsetEdit {
                        at: edit.start + edit.inserted_len(),
                        removed,
                        inserted: 0,
                    });
                    tail = Delta::from_lines(&chunks);
                }
            }
        }
        builder.extend(&tail);
        let mut spliced = builder.finish();

        if let Some((line_start, prefix_end)) = prefix_span {
            log::debug!("edit landed inside a list prefix, regenerating it");
            spliced = drop_prefix_remnant(spliced, edit, line_start, prefix_end, edits);
        }

        if self.ends_with_newline() && !spliced.ends_with_newline() {
            log::debug!("appending trailing newline after text change");
            let mut builder = DeltaBuilder::default();
            builder.extend(&spliced);
            builder.push("\n", &Attributes::default());
            spliced = builder.finish();
        }

        if deleted_newline || inserted_newline || prefix_span.is_some() {
            let mut chunks = spliced.split_lines();
            edits.extend(renumber(&mut chunks));
            spliced = Delta::from_lines(&chunks);
        }
        spliced
    }

    /// Text attributes of the character preceding `offset`, or nothing when
    /// it starts a line.
    pub(crate) fn text_attributes_before(&self, offset: usize) -> Attributes {
        match offset.checked_sub(1).and_then(|previous| self.char_at(previous)) {
            Some((ch, attributes)) if ch != '\n' => attributes.without_line_type(),
            _ => Attributes::default(),
        }
    }
}

/// `delta` with the attributes of its first newline replaced.
fn with_first_newline_attributes(delta: &Delta, attributes: &Attributes) -> Delta {
    let mut chunks = delta.split_lines();
    if let Some(first) = chunks.first_mut()
        && first.newline.is_some()
    {
        first.newline = Some(attributes.clone());
    }
    Delta::from_lines(&chunks)
}

/// Start and end of the heading prefix of the line holding `at`, when `at`
/// falls inside it.
fn touched_prefix(
    old_chars: &[char],
    at: usize,
    line_type: &TextLineType,
) -> Option<(usize, usize)> {
    let line_start = old_chars[..at]
        .iter()
        .rposition(|ch| *ch == '\n')
        .map_or(0, |newline| newline + 1);
    let line_end = old_chars[line_start..]
        .iter()
        .position(|ch| *ch == '\n')
        .map_or(old_chars.len(), |newline| line_start + newline);
    let content: String = old_chars[line_start..line_end].iter().collect();
    let prefix_end = line_start + heading_prefix_len(line_type, &content)?;
    (at < prefix_end).then_some((line_start, prefix_end))
}

/// Removes the characters of the old prefix `line_start..prefix_end` that
/// survived `edit`, keeping whatever the edit inserted.
fn drop_prefix_remnant(
    mut delta: Delta,
    edit: &TextEdit,
    line_start: usize,
    prefix_end: usize,
    edits: &mut Vec<OffsetEdit>,
) -> Delta {
    let deleted_end = edit.start + edit.deleted;
    if deleted_end < prefix_end {
        let at = edit.start + edit.inserted_len();
        let removed = prefix_end - deleted_end;
        delta = without_range(&delta, at, at + removed);
        edits.push(OffsetEdit {
            at,
            removed,
            inserted: 0,
        });
    }
    if edit.start > line_start {
        delta = without_range(&delta, line_start, edit.start);
        edits.push(OffsetEdit {
            at: line_start,
            removed: edit.start - line_start,
            inserted: 0,
        });
    }
    delta
}

fn without_range(delta: &Delta, start: usize, end: usize) -> Delta {
    let mut builder = DeltaBuilder::default();
    builder.extend(&delta.slice(0, start));
    builder.extend(&delta.slice(end, delta.len()));
    builder.finish()
}

/// Infers the edit from the change context, checked against `new_chars`.
///
/// The context-derived edit wins when it reproduces the new text, possibly
/// short of trailing newlines the host dropped. Otherwise (the caret did not
/// move over the changed text, as with keyboard suggestions) the edit is the
/// region between the common prefix and the common suffix.
fn localize_edit(
    old_chars: &[char],
    new_chars: &[char],
    context: &ChangeContext,
) -> Result<TextEdit, DeltaError> {
    let before = context.selection_before_change;
    let after = context.selection_after_change;
    let start = before.start.min(after.start);
    let deleted = match context.deleted_length {
        Some(deleted) => deleted,
        None if after.end < before.start => before.end - start,
        None => before.end - before.start,
    };
    if start
        .checked_add(deleted)
        .is_none_or(|end| end > old_chars.len())
    {
        return Err(DeltaError::InvalidSelection {
            start,
            end: start.saturating_add(deleted),
            len: old_chars.len(),
        });
    }
    let inserted: String = new_chars[start..after.end.max(start)].iter().collect();
    let candidate = TextEdit {
        start,
        deleted,
        inserted,
    };
    if reproduces(old_chars, new_chars, &candidate) {
        return Ok(candidate);
    }

    log::debug!("change context does not localize the edit, falling back to prefix/suffix diff");
    Ok(prefix_suffix_edit(old_chars, new_chars))
}

fn reproduces(old_chars: &[char], new_chars: &[char], edit: &TextEdit) -> bool {
    if edit.deleted == 0 && edit.inserted.is_empty() {
        return old_chars == new_chars;
    }
    let result: Vec<char> = old_chars[..edit.start]
        .iter()
        .copied()
        .chain(edit.inserted.chars())
        .chain(old_chars[edit.start + edit.deleted..].iter().copied())
        .collect();
    result.starts_with(new_chars) && result[new_chars.len()..].iter().all(|ch| *ch == '\n')
}

fn prefix_suffix_edit(old_chars: &[char], new_chars: &[char]) -> TextEdit {
    let prefix = old_chars
        .iter()
        .zip(new_chars)
        .take_while(|(old, new)| old == new)
        .count();
    let max_suffix = old_chars.len().min(new_chars.len()) - prefix;
    let suffix = old_chars
        .iter()
        .rev()
        .zip(new_chars.iter().rev())
        .take(max_suffix)
        .take_while(|(old, new)| old == new)
        .count();
    TextEdit {
        start: prefix,
        deleted: old_chars.len() - prefix - suffix,
        inserted: new_chars[prefix..new_chars.len() - suffix].iter().collect(),
    }
}
