use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::attributes::{AttributeValue, Attributes, LINE_TYPE_ATTRIBUTE};
use crate::delta::{Delta, DeltaBuilder, Run};
use crate::selection::Selection;

/// Type of a line, stored under [`LINE_TYPE_ATTRIBUTE`] on its newline.
///
/// The vocabulary is open: any unknown tag is kept as an opaque
/// [`TextLineType::Custom`] type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TextLineType {
    #[default]
    Normal,
    OrderedList,
    UnorderedList,
    Custom(String),
}

impl TextLineType {
    pub fn as_str(&self) -> &str {
        match self {
            TextLineType::Normal => "normal",
            TextLineType::OrderedList => "ol",
            TextLineType::UnorderedList => "ul",
            TextLineType::Custom(tag) => tag,
        }
    }

    /// Propagable types carry a generated heading prefix and are inherited
    /// by the line created when a newline is typed inside them.
    pub fn is_propagable(&self) -> bool {
        matches!(self, TextLineType::OrderedList | TextLineType::UnorderedList)
    }

    pub fn from_attributes(attributes: &Attributes) -> Self {
        match attributes.get(LINE_TYPE_ATTRIBUTE) {
            Some(AttributeValue::Text(tag)) => TextLineType::from(tag.as_str()),
            _ => TextLineType::Normal,
        }
    }

    /// `attributes` with this type applied; `Normal` removes the tag.
    pub fn apply_to(&self, attributes: &Attributes) -> Attributes {
        let mut attributes = attributes.clone();
        match self {
            TextLineType::Normal => {
                attributes.remove(LINE_TYPE_ATTRIBUTE);
            }
            other => attributes.insert(LINE_TYPE_ATTRIBUTE, other.as_str()),
        }
        attributes
    }
}

impl From<&str> for TextLineType {
    fn from(tag: &str) -> Self {
        match tag {
            "normal" | "" => TextLineType::Normal,
            "ol" => TextLineType::OrderedList,
            "ul" => TextLineType::UnorderedList,
            other => TextLineType::Custom(other.to_string()),
        }
    }
}

impl From<String> for TextLineType {
    fn from(tag: String) -> Self {
        TextLineType::from(tag.as_str())
    }
}

impl From<TextLineType> for String {
    fn from(line_type: TextLineType) -> Self {
        line_type.as_str().to_string()
    }
}

impl FromStr for TextLineType {
    type Err = Infallible;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Ok(TextLineType::from(tag))
    }
}

impl fmt::Display for TextLineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A newline-delimited span of the document.
///
/// `end` is the offset of the terminating newline, so `start..end` is the
/// content. Lines are derived on demand and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub content: String,
    /// Attributes of the terminating newline; empty for an unterminated line.
    pub attributes: Attributes,
}

impl Line {
    pub fn line_type(&self) -> TextLineType {
        TextLineType::from_attributes(&self.attributes)
    }
}

/// True when the selection overlaps the line. Offsets on a line boundary
/// belong to both adjoining lines, so a caret on a line break touches both.
pub fn is_line_in_selection(selection: &Selection, line: &Line) -> bool {
    selection.touches(line.start, line.end)
}

/// Lazy iterator over the lines of a delta. Each run is visited once.
///
/// A delta ending with a newline has no extra empty line after it; an
/// unterminated trailing line is yielded with empty attributes.
#[derive(Debug, Clone)]
pub struct LineWalker<'a> {
    runs: &'a [Run],
    run_index: usize,
    byte_offset: usize,
    position: usize,
    line_start: usize,
    line_index: usize,
}

impl<'a> LineWalker<'a> {
    pub fn new(delta: &'a Delta) -> Self {
        LineWalker {
            runs: delta.runs(),
            run_index: 0,
            byte_offset: 0,
            position: 0,
            line_start: 0,
            line_index: 0,
        }
    }

    fn emit(&mut self, content: String, attributes: Attributes) -> Line {
        let line = Line {
            index: self.line_index,
            start: self.line_start,
            end: self.position,
            content,
            attributes,
        };
        self.line_index += 1;
        line
    }
}

impl Iterator for LineWalker<'_> {
    type Item = Line;

    fn next(&mut self) -> Option<Line> {
        let mut content = String::new();
        while let Some(run) = self.runs.get(self.run_index) {
            let rest = &run.text[self.byte_offset..];
            match rest.find('\n') {
                Some(newline) => {
                    let segment = &rest[..newline];
                    content.push_str(segment);
                    self.position += segment.chars().count();
                    let line = self.emit(content, run.attributes.clone());
                    self.position += 1;
                    self.line_start = self.position;
                    self.byte_offset += newline + 1;
                    if self.byte_offset >= run.text.len() {
                        self.run_index += 1;
                        self.byte_offset = 0;
                    }
                    return Some(line);
                }
                None => {
                    content.push_str(rest);
                    self.position += rest.chars().count();
                    self.run_index += 1;
                    self.byte_offset = 0;
                }
            }
        }
        if self.position > self.line_start {
            let line = self.emit(content, Attributes::default());
            self.line_start = self.position;
            return Some(line);
        }
        None
    }
}

impl Delta {
    pub fn lines(&self) -> LineWalker<'_> {
        LineWalker::new(self)
    }

    /// Attributes of the line containing `offset`, i.e. of the first newline
    /// at or after it. Empty past the last newline.
    pub fn line_attributes_at(&self, offset: usize) -> Attributes {
        self.lines()
            .find(|line| line.end >= offset)
            .map(|line| line.attributes)
            .unwrap_or_default()
    }

    pub(crate) fn split_lines(&self) -> Vec<LineChunk> {
        let mut chunks = Vec::new();
        let mut content = DeltaBuilder::default();
        for run in self.runs() {
            for (index, segment) in run.text.split('\n').enumerate() {
                if index > 0 {
                    let finished = std::mem::take(&mut content).finish();
                    chunks.push(LineChunk {
                        content: finished,
                        newline: Some(run.attributes.clone()),
                    });
                }
                content.push(segment, &run.attributes);
            }
        }
        let rest = content.finish();
        if !rest.is_empty() {
            chunks.push(LineChunk {
                content: rest,
                newline: None,
            });
        }
        chunks
    }

    pub(crate) fn from_lines(chunks: &[LineChunk]) -> Delta {
        let mut builder = DeltaBuilder::default();
        for chunk in chunks {
            builder.extend(&chunk.content);
            if let Some(attributes) = &chunk.newline {
                builder.push("\n", attributes);
            }
        }
        builder.finish()
    }
}

/// A line decomposed for rewriting: its content runs and, when terminated,
/// the attributes of its newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LineChunk {
    pub content: Delta,
    pub newline: Option<Attributes>,
}

impl LineChunk {
    pub fn line_type(&self) -> TextLineType {
        self.newline
            .as_ref()
            .map(TextLineType::from_attributes)
            .unwrap_or_default()
    }

    /// Sets the line type, terminating the line if it had no newline yet.
    pub fn set_line_type(&mut self, line_type: &TextLineType) {
        let current = self.newline.take().unwrap_or_default();
        self.newline = Some(line_type.apply_to(&current));
    }

    pub fn content_len(&self) -> usize {
        self.content.len()
    }

    /// Length including the newline.
    pub fn len(&self) -> usize {
        self.content_len() + usize::from(self.newline.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn typed(tag: &str) -> Attributes {
        Attributes::new().with(LINE_TYPE_ATTRIBUTE, tag)
    }

    #[test]
    fn test_walker_yields_line_attributes() {
        let delta = Delta::new([
            Run::plain("eheh"),
            Run::new("\n", typed("misc")),
            Run::plain("ahah"),
            Run::new("\n", typed("rand")),
            Run::plain("ohoh\n\n"),
        ]);

        let lines: Vec<Line> = delta.lines().collect();

        let contents: Vec<&str> = lines.iter().map(|l| l.content.as_str()).collect();
        assert_eq!(contents, vec!["eheh", "ahah", "ohoh", ""]);
        let attributes: Vec<Attributes> = lines.iter().map(|l| l.attributes.clone()).collect();
        assert_eq!(
            attributes,
            vec![typed("misc"), typed("rand"), Attributes::new(), Attributes::new()]
        );
    }

    #[test]
    fn test_walker_offsets() {
        let delta = Delta::plain("A\nBC\nD\n");

        let spans: Vec<(usize, usize)> = delta.lines().map(|l| (l.start, l.end)).collect();

        assert_eq!(spans, vec![(0, 1), (2, 4), (5, 6)]);
    }

    #[test]
    fn test_walker_yields_unterminated_last_line() {
        let delta = Delta::new([Run::plain("A"), Run::new("\n", typed("ol")), Run::plain("tail")]);

        let lines: Vec<Line> = delta.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].content, "tail");
        assert_eq!((lines[1].start, lines[1].end), (2, 6));
        assert_eq!(lines[1].line_type(), TextLineType::Normal);
    }

    #[test]
    fn test_walker_on_empty_delta() {
        assert_eq!(Delta::default().lines().count(), 0);
    }

    #[test]
    fn test_walker_content_spans_runs() {
        let delta = Delta::new([
            Run::plain("He"),
            Run::new("llo", Attributes::new().with("bold", true)),
            Run::new("\n", typed("ul")),
        ]);

        let line = delta.lines().next().unwrap();

        assert_eq!(line.content, "Hello");
        assert_eq!(line.line_type(), TextLineType::UnorderedList);
    }

    #[test]
    fn test_walker_is_restartable() {
        let delta = Delta::plain("A\nB\n");
        let walker = delta.lines();

        assert_eq!(walker.clone().count(), 2);
        assert_eq!(walker.count(), 2);
    }

    #[rstest]
    #[case::start_at_line_start(Selection::new(0, 1), 0, true)]
    #[case::caret_at_line_end(Selection::caret(1), 0, true)]
    #[case::caret_at_second_line_end(Selection::caret(4), 1, true)]
    #[case::spanning_into_line(Selection::new(1, 4), 1, true)]
    #[case::ending_at_line_start(Selection::new(1, 2), 1, true)]
    #[case::after_line_end(Selection::caret(2), 0, false)]
    #[case::after_second_line_end(Selection::caret(5), 1, false)]
    fn test_is_line_in_selection(
        #[case] selection: Selection,
        #[case] line_index: usize,
        #[case] expected: bool,
    ) {
        let delta = Delta::plain("A\nBC\nD\n");
        let line = delta.lines().nth(line_index).unwrap();

        assert_eq!(is_line_in_selection(&selection, &line), expected);
    }

    #[test]
    fn test_line_attributes_at() {
        let delta = Delta::new([
            Run::plain("A"),
            Run::new("\n", typed("custom")),
            Run::plain("B\n"),
        ]);

        assert_eq!(delta.line_attributes_at(0), typed("custom"));
        assert_eq!(delta.line_attributes_at(1), typed("custom"));
        assert_eq!(delta.line_attributes_at(2), Attributes::new());
        assert_eq!(delta.line_attributes_at(4), Attributes::new());
    }

    #[test]
    fn test_split_and_join_lines_round_trip() {
        let delta = Delta::new([
            Run::plain("A"),
            Run::new("\n", typed("ol")),
            Run::plain("B\nC\n"),
            Run::new("tail", Attributes::new().with("bold", true)),
        ]);

        let chunks = delta.split_lines();

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].line_type(), TextLineType::OrderedList);
        assert_eq!(chunks[3].newline, None);
        assert_eq!(Delta::from_lines(&chunks), delta);
    }

    #[test]
    fn test_set_line_type_terminates_open_line() {
        let mut chunk = LineChunk {
            content: Delta::plain("tail"),
            newline: None,
        };

        chunk.set_line_type(&TextLineType::OrderedList);

        assert_eq!(chunk.newline, Some(typed("ol")));
        assert_eq!(chunk.len(), 5);
    }

    #[rstest]
    #[case("normal", TextLineType::Normal)]
    #[case("ol", TextLineType::OrderedList)]
    #[case("ul", TextLineType::UnorderedList)]
    #[case("quote", TextLineType::Custom("quote".to_string()))]
    fn test_line_type_vocabulary(#[case] tag: &str, #[case] expected: TextLineType) {
        assert_eq!(tag.parse::<TextLineType>().unwrap(), expected);
        assert_eq!(TextLineType::from_attributes(&typed(tag)), expected);
    }

    #[test]
    fn test_only_list_types_are_propagable() {
        assert!(TextLineType::OrderedList.is_propagable());
        assert!(TextLineType::UnorderedList.is_propagable());
        assert!(!TextLineType::Normal.is_propagable());
        assert!(!TextLineType::Custom("misc".to_string()).is_propagable());
    }
}
