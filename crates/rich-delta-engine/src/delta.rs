use serde::{Deserialize, Serialize};

use crate::attributes::Attributes;
use crate::error::DeltaError;
use crate::selection::Selection;

/// A contiguous piece of text with uniform attributes.
///
/// Serialized as `{ "insert": text, "attributes"?: {...} }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Run {
    #[serde(rename = "insert")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl Run {
    pub fn new(text: impl Into<String>, attributes: Attributes) -> Self {
        Run {
            text: text.into(),
            attributes,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Attributes::default())
    }

    /// Length in characters (Unicode scalar values).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_newline(&self) -> bool {
        self.text == "\n"
    }
}

/// The document: an ordered sequence of runs in canonical form.
///
/// Canonical form has no empty runs and no two adjacent runs with equal
/// attributes. Every constructor canonicalizes, including deserialization, so
/// equality between deltas is equality of meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Run>", into = "Vec<Run>")]
pub struct Delta {
    runs: Vec<Run>,
}

/// Result of an operation producing a new delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaUpdate {
    pub final_delta: Delta,
    /// Set when the operation moved text around the caller's selection
    /// (heading prefixes added or removed), so the caller must adopt it.
    pub overriding_selection: Option<Selection>,
}

impl DeltaUpdate {
    pub fn unchanged(delta: Delta) -> Self {
        DeltaUpdate {
            final_delta: delta,
            overriding_selection: None,
        }
    }
}

impl Delta {
    pub fn new(runs: impl IntoIterator<Item = Run>) -> Self {
        let mut builder = DeltaBuilder::default();
        for run in runs {
            builder.push(&run.text, &run.attributes);
        }
        builder.finish()
    }

    pub fn plain(text: &str) -> Self {
        Self::new([Run::plain(text)])
    }

    pub fn from_json(json: &str) -> Result<Self, DeltaError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, DeltaError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Document length in characters.
    pub fn len(&self) -> usize {
        self.runs.iter().map(Run::char_len).sum()
    }

    /// The flattened document text.
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    pub fn ends_with_newline(&self) -> bool {
        self.runs.last().is_some_and(|run| run.text.ends_with('\n'))
    }

    /// Re-merges runs into canonical form. A no-op on canonical deltas.
    pub fn canonicalize(&self) -> Delta {
        Delta::new(self.runs.iter().cloned())
    }

    /// The sub-delta covering characters `start..end` (clamped to the length).
    pub fn slice(&self, start: usize, end: usize) -> Delta {
        let mut builder = DeltaBuilder::default();
        let mut position = 0;
        for run in &self.runs {
            let run_start = position;
            let run_end = run_start + run.char_len();
            position = run_end;
            if run_end <= start {
                continue;
            }
            if run_start >= end {
                break;
            }
            let from = start.saturating_sub(run_start);
            let to = end.min(run_end) - run_start;
            builder.push(char_slice(&run.text, from, to), &run.attributes);
        }
        builder.finish()
    }

    /// The character at `offset` together with the attributes of its run.
    pub fn char_at(&self, offset: usize) -> Option<(char, &Attributes)> {
        let mut position = 0;
        for run in &self.runs {
            let len = run.char_len();
            if offset < position + len {
                let ch = run.text.chars().nth(offset - position)?;
                return Some((ch, &run.attributes));
            }
            position += len;
        }
        None
    }

    /// Applies `transform` to the attributes of every non-newline character
    /// in `start..end`. Newlines keep their (line) attributes.
    pub(crate) fn map_text_attributes(
        &self,
        start: usize,
        end: usize,
        transform: impl Fn(&Attributes) -> Attributes,
    ) -> Delta {
        let mut builder = DeltaBuilder::default();
        builder.extend(&self.slice(0, start));
        for run in self.slice(start, end).runs() {
            let transformed = transform(&run.attributes);
            for (index, segment) in run.text.split('\n').enumerate() {
                if index > 0 {
                    builder.push("\n", &run.attributes);
                }
                builder.push(segment, &transformed);
            }
        }
        builder.extend(&self.slice(end, self.len()));
        builder.finish()
    }
}

impl From<Vec<Run>> for Delta {
    fn from(runs: Vec<Run>) -> Self {
        Delta::new(runs)
    }
}

impl From<Delta> for Vec<Run> {
    fn from(delta: Delta) -> Self {
        delta.runs
    }
}

impl FromIterator<Run> for Delta {
    fn from_iter<I: IntoIterator<Item = Run>>(iter: I) -> Self {
        Delta::new(iter)
    }
}

/// Accumulates runs, merging as it goes so the result is canonical.
#[derive(Debug, Default)]
pub(crate) struct DeltaBuilder {
    runs: Vec<Run>,
}

impl DeltaBuilder {
    pub(crate) fn push(&mut self, text: &str, attributes: &Attributes) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.runs.last_mut()
            && last.attributes == *attributes
        {
            last.text.push_str(text);
            return;
        }
        self.runs.push(Run::new(text, attributes.clone()));
    }

    pub(crate) fn extend(&mut self, delta: &Delta) {
        for run in delta.runs() {
            self.push(&run.text, &run.attributes);
        }
    }

    pub(crate) fn finish(self) -> Delta {
        Delta { runs: self.runs }
    }
}

/// Substring by character offsets.
pub(crate) fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let byte_at = |index: usize| {
        text.char_indices()
            .nth(index)
            .map_or(text.len(), |(byte, _)| byte)
    };
    let from = byte_at(start);
    let to = byte_at(end).max(from);
    &text[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::LINE_TYPE_ATTRIBUTE;
    use pretty_assertions::assert_eq;

    fn bold() -> Attributes {
        Attributes::new().with("bold", true)
    }

    #[test]
    fn test_adjacent_equal_runs_are_merged() {
        let delta = Delta::new([
            Run::plain("Hello "),
            Run::plain("world"),
            Run::new("!", bold()),
            Run::new("?", bold()),
        ]);

        assert_eq!(
            delta.runs(),
            &[Run::plain("Hello world"), Run::new("!?", bold())]
        );
    }

    #[test]
    fn test_empty_runs_are_dropped() {
        let delta = Delta::new([Run::plain("A"), Run::new("", bold()), Run::plain("B")]);

        assert_eq!(delta.runs(), &[Run::plain("AB")]);
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let delta = Delta::new([
            Run::plain("A"),
            Run::new("\n", Attributes::new().with(LINE_TYPE_ATTRIBUTE, "ol")),
            Run::plain("B\nC\n"),
        ]);

        assert_eq!(delta.canonicalize(), delta);
        assert_eq!(delta.canonicalize().canonicalize(), delta);
    }

    #[test]
    fn test_length_counts_characters() {
        let delta = Delta::new([Run::plain("• é"), Run::new("ü\n", bold())]);

        assert_eq!(delta.len(), 5);
        assert_eq!(delta.text(), "• éü\n");
    }

    #[test]
    fn test_slice_across_runs() {
        let delta = Delta::new([
            Run::plain("prefix"),
            Run::new("test", bold()),
            Run::plain("suffix"),
        ]);

        assert_eq!(
            delta.slice(4, 12).runs(),
            &[Run::plain("ix"), Run::new("test", bold()), Run::plain("su")]
        );
        assert!(delta.slice(3, 3).is_empty());
        assert_eq!(delta.slice(10, 100).text(), "suffix");
    }

    #[test]
    fn test_char_at() {
        let delta = Delta::new([Run::plain("ab"), Run::new("c", bold())]);

        assert_eq!(delta.char_at(1), Some(('b', &Attributes::default())));
        assert_eq!(delta.char_at(2), Some(('c', &bold())));
        assert_eq!(delta.char_at(3), None);
    }

    #[test]
    fn test_map_text_attributes_skips_newlines() {
        let line = Attributes::new().with(LINE_TYPE_ATTRIBUTE, "misc");
        let delta = Delta::new([Run::plain("ab"), Run::new("\n", line.clone())]);

        let mapped = delta.map_text_attributes(0, 3, |_| bold());

        assert_eq!(
            mapped.runs(),
            &[Run::new("ab", bold()), Run::new("\n", line)]
        );
    }

    #[test]
    fn test_deserialize_canonicalizes() {
        let delta = Delta::from_json(
            r#"[{"insert": "A"}, {"insert": "B", "attributes": {}}, {"insert": "\n", "attributes": {"bold": null}}]"#,
        )
        .unwrap();

        assert_eq!(delta.runs(), &[Run::plain("AB\n")]);
    }

    #[test]
    fn test_serialize_omits_empty_attributes() {
        let delta = Delta::new([Run::plain("A"), Run::new("B", bold())]);

        assert_eq!(
            delta.to_json(false).unwrap(),
            r#"[{"insert":"A"},{"insert":"B","attributes":{"bold":true}}]"#
        );
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let error = Delta::from_json("{not json").unwrap_err();

        assert!(matches!(error, DeltaError::Json(_)));
    }
}
