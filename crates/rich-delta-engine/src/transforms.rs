//! Selection-scoped reads and transforms on character and line attributes.

use crate::attributes::{AttributeValue, Attributes};
use crate::delta::{Delta, DeltaUpdate, Run};
use crate::error::DeltaError;
use crate::heading::{renumber, strip_heading};
use crate::lines::{TextLineType, is_line_in_selection};
use crate::selection::{OffsetEdit, Selection};

/// How toggling an attribute affects a selection.
///
/// - `Clear`: every selected character already has the value; remove it.
/// - `Replace`: every selected character has the attribute, with differing
///   values; set the value.
/// - `Assign`: at least one selected character lacks the attribute; set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TogglePolicy {
    Clear,
    Replace,
    Assign,
}

impl TogglePolicy {
    fn over<'a>(
        sets: impl IntoIterator<Item = &'a Attributes>,
        name: &str,
        value: &AttributeValue,
    ) -> TogglePolicy {
        let mut any = false;
        let mut all_present = true;
        let mut all_equal = true;
        for attributes in sets {
            any = true;
            match attributes.get(name) {
                Some(existing) if existing == value => {}
                Some(_) => all_equal = false,
                None => {
                    all_present = false;
                    all_equal = false;
                }
            }
        }
        match (any, all_equal, all_present) {
            (true, true, _) => TogglePolicy::Clear,
            (true, false, true) => TogglePolicy::Replace,
            _ => TogglePolicy::Assign,
        }
    }
}

fn has_text(run: &Run) -> bool {
    run.text.chars().any(|ch| ch != '\n')
}

impl Delta {
    /// Expands `selection` to whole lines: from the start of the first line
    /// it touches to past the newline of the last one.
    pub fn selection_encompassing_lines(
        &self,
        selection: Selection,
    ) -> Result<Selection, DeltaError> {
        let len = self.len();
        selection.validate(len)?;
        let mut touched = self
            .lines()
            .filter(|line| is_line_in_selection(&selection, line));
        let Some(first) = touched.next() else {
            return Ok(selection);
        };
        let last_end = touched.last().map_or(first.end, |line| line.end);
        Ok(Selection::new(first.start, (last_end + 1).min(len)))
    }

    /// Attributes shared by every non-newline character of `selection`.
    ///
    /// For a caret these are the attributes the next typed character would
    /// inherit: those of the character before it on the same line.
    pub fn selected_text_attributes(&self, selection: Selection) -> Result<Attributes, DeltaError> {
        selection.validate(self.len())?;
        if selection.is_caret() {
            return Ok(self.text_attributes_before(selection.start));
        }
        let slice = self.slice(selection.start, selection.end);
        let common = Attributes::intersect_across_runs(
            slice
                .runs()
                .iter()
                .filter(|run| has_text(run))
                .map(|run| &run.attributes),
        );
        Ok(common.without_line_type())
    }

    /// The type shared by every line `selection` touches, `Normal` when they
    /// disagree.
    pub fn line_type_in_selection(&self, selection: Selection) -> Result<TextLineType, DeltaError> {
        selection.validate(self.len())?;
        let mut types = self
            .lines()
            .filter(|line| is_line_in_selection(&selection, line))
            .map(|line| line.line_type());
        let Some(first) = types.next() else {
            return Ok(TextLineType::Normal);
        };
        if types.all(|line_type| line_type == first) {
            Ok(first)
        } else {
            Ok(TextLineType::Normal)
        }
    }

    /// Toggles `name = value` on the characters of `selection` following
    /// [`TogglePolicy`]. Newlines keep their line attributes and a caret
    /// leaves the document untouched.
    pub fn apply_text_transform_to_selection(
        &self,
        selection: Selection,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<DeltaUpdate, DeltaError> {
        selection.validate(self.len())?;
        if selection.is_caret() {
            return Ok(DeltaUpdate::unchanged(self.clone()));
        }
        let value = value.into();
        let slice = self.slice(selection.start, selection.end);
        let policy = TogglePolicy::over(
            slice
                .runs()
                .iter()
                .filter(|run| has_text(run))
                .map(|run| &run.attributes),
            name,
            &value,
        );
        let transformed = self.map_text_attributes(selection.start, selection.end, |existing| {
            let mut attributes = existing.clone();
            match policy {
                TogglePolicy::Clear => {
                    attributes.remove(name);
                }
                TogglePolicy::Replace | TogglePolicy::Assign => {
                    attributes.insert(name, value.clone());
                }
            }
            attributes
        });
        Ok(DeltaUpdate::unchanged(transformed))
    }

    /// Sets the type of every line `selection` touches, then renumbers the
    /// document's lists.
    ///
    /// Lines leaving a list type lose their prefix. The selection is mapped
    /// through the prefix changes and returned when it moved.
    pub fn apply_line_type_to_selection(
        &self,
        selection: Selection,
        line_type: &TextLineType,
    ) -> Result<DeltaUpdate, DeltaError> {
        selection.validate(self.len())?;
        let mut chunks = self.split_lines();
        let mut edits = Vec::new();
        let mut original_start = 0;
        let mut shifted_start = 0;
        for chunk in chunks.iter_mut() {
            let original_len = chunk.len();
            if selection.touches(original_start, original_start + chunk.content_len()) {
                let previous = chunk.line_type();
                if previous != *line_type && previous.is_propagable() {
                    let removed = strip_heading(chunk, &previous);
                    if removed > 0 {
                        edits.push(OffsetEdit {
                            at: shifted_start,
                            removed,
                            inserted: 0,
                        });
                    }
                }
                chunk.set_line_type(line_type);
            }
            original_start += original_len;
            shifted_start += chunk.len();
        }
        edits.extend(renumber(&mut chunks));

        let mapped = selection.map_through(&edits);
        Ok(DeltaUpdate {
            final_delta: Delta::from_lines(&chunks),
            overriding_selection: Some(mapped).filter(|mapped| *mapped != selection),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::LINE_TYPE_ATTRIBUTE;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn typed(tag: &str) -> Attributes {
        Attributes::new().with(LINE_TYPE_ATTRIBUTE, tag)
    }

    fn decorated(value: &str) -> Attributes {
        Attributes::new().with("textDecoration", value)
    }

    #[rstest]
    #[case::all_equal(vec![decorated("underline"), decorated("underline")], TogglePolicy::Clear)]
    #[case::differing_values(vec![decorated("underline"), decorated("strike")], TogglePolicy::Replace)]
    #[case::one_missing(vec![decorated("underline"), Attributes::new()], TogglePolicy::Assign)]
    #[case::nothing_selected(vec![], TogglePolicy::Assign)]
    fn test_toggle_policy(#[case] sets: Vec<Attributes>, #[case] expected: TogglePolicy) {
        let value = AttributeValue::from("underline");

        assert_eq!(TogglePolicy::over(&sets, "textDecoration", &value), expected);
    }

    #[rstest]
    #[case::left_of_start(Selection::new(2, 6), Selection::new(0, 6))]
    #[case::right_of_end(Selection::new(0, 4), Selection::new(0, 6))]
    #[case::caret(Selection::caret(3), Selection::new(0, 6))]
    fn test_selection_encompassing_single_line(
        #[case] selection: Selection,
        #[case] expected: Selection,
    ) {
        let delta = Delta::plain("Hello\n");

        assert_eq!(delta.selection_encompassing_lines(selection).unwrap(), expected);
    }

    #[test]
    fn test_selection_encompassing_unterminated_line_is_capped() {
        let delta = Delta::plain("A\nBC");

        assert_eq!(
            delta.selection_encompassing_lines(Selection::caret(3)).unwrap(),
            Selection::new(2, 4)
        );
    }

    #[test]
    fn test_caret_attributes_come_from_previous_character() {
        let delta = Delta::new([
            Run::new("ab", Attributes::new().with("bold", true)),
            Run::plain("c\n"),
        ]);

        assert_eq!(
            delta.selected_text_attributes(Selection::caret(2)).unwrap(),
            Attributes::new().with("bold", true)
        );
        assert!(delta.selected_text_attributes(Selection::caret(0)).unwrap().is_empty());
        assert!(delta.selected_text_attributes(Selection::caret(4)).unwrap().is_empty());
    }

    #[test]
    fn test_text_transform_on_caret_is_noop() {
        let delta = Delta::plain("Hello\n");

        let update = delta
            .apply_text_transform_to_selection(Selection::caret(2), "bold", true)
            .unwrap();

        assert_eq!(update, DeltaUpdate::unchanged(delta));
    }

    #[test]
    fn test_text_transform_keeps_line_attributes() {
        let delta = Delta::new([Run::plain("A"), Run::new("\n", typed("ul")), Run::plain("B\n")]);

        let update = delta
            .apply_text_transform_to_selection(Selection::new(0, 3), "bold", true)
            .unwrap();

        let bold = Attributes::new().with("bold", true);
        assert_eq!(
            update.final_delta.runs(),
            &[
                Run::new("A", bold.clone()),
                Run::new("\n", typed("ul")),
                Run::new("B", bold),
                Run::plain("\n"),
            ]
        );
    }

    #[test]
    fn test_line_type_of_empty_document_is_normal() {
        assert_eq!(
            Delta::default().line_type_in_selection(Selection::caret(0)).unwrap(),
            TextLineType::Normal
        );
    }

    #[test]
    fn test_line_type_on_unterminated_line_terminates_it() {
        let delta = Delta::plain("tail");

        let update = delta
            .apply_line_type_to_selection(Selection::caret(4), &TextLineType::from("quote"))
            .unwrap();

        assert_eq!(
            update.final_delta.runs(),
            &[Run::plain("tail"), Run::new("\n", typed("quote"))]
        );
    }

    #[test]
    fn test_line_type_maps_selection_through_prefixes() {
        let delta = Delta::plain("A\nB\n");

        let update = delta
            .apply_line_type_to_selection(Selection::new(0, 4), &TextLineType::OrderedList)
            .unwrap();

        assert_eq!(update.final_delta.text(), "1. A\n2. B\n");
        assert_eq!(update.overriding_selection, Some(Selection::new(3, 10)));
    }

    #[test]
    fn test_selection_ops_reject_out_of_range_selection() {
        let delta = Delta::plain("Hi\n");
        let selection = Selection::new(0, 4);

        assert!(delta.selection_encompassing_lines(selection).is_err());
        assert!(delta.selected_text_attributes(selection).is_err());
        assert!(delta.line_type_in_selection(selection).is_err());
        assert!(
            delta
                .apply_text_transform_to_selection(selection, "bold", true)
                .is_err()
        );
        assert!(
            delta
                .apply_line_type_to_selection(selection, &TextLineType::UnorderedList)
                .is_err()
        );
    }
}
