use crate::attributes::{AttributeOverrides, AttributeValue, Attributes};
use crate::delta::Delta;
use crate::error::DeltaError;
use crate::lines::TextLineType;
use crate::selection::{ChangeContext, Selection};

/// One editable text block: the document, the host's selection and the
/// attributes armed at the caret.
///
/// Every event returns the next block; the current one is never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBlock {
    delta: Delta,
    selection: Selection,
    cursor_attributes: AttributeOverrides,
}

impl TextBlock {
    /// Opens `delta` with the caret at the start.
    pub fn new(delta: Delta) -> Self {
        TextBlock {
            delta,
            ..Default::default()
        }
    }

    pub fn delta(&self) -> &Delta {
        &self.delta
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn cursor_attributes(&self) -> &AttributeOverrides {
        &self.cursor_attributes
    }

    /// Reconciles a raw text change reported by the host.
    ///
    /// The selection becomes the post-change selection, or the overriding
    /// one when list prefixes moved text around the caret.
    pub fn handle_text_change(
        &self,
        new_text: &str,
        context: &ChangeContext,
    ) -> Result<TextBlock, DeltaError> {
        let update = self
            .delta
            .apply_text_diff(new_text, context, &self.cursor_attributes)?;
        Ok(TextBlock {
            selection: update
                .overriding_selection
                .unwrap_or(context.selection_after_change),
            delta: update.final_delta,
            cursor_attributes: self.cursor_attributes.clone(),
        })
    }

    /// Moving the selection disarms the cursor attributes.
    pub fn handle_selection_change(&self, selection: Selection) -> Result<TextBlock, DeltaError> {
        selection.validate(self.delta.len())?;
        if selection == self.selection {
            return Ok(self.clone());
        }
        Ok(TextBlock {
            delta: self.delta.clone(),
            selection,
            cursor_attributes: AttributeOverrides::new(),
        })
    }

    /// Arms `overrides` at the caret; they win over already armed entries.
    pub fn set_cursor_attributes(&self, overrides: &AttributeOverrides) -> TextBlock {
        let mut cursor_attributes = self.cursor_attributes.clone();
        cursor_attributes.extend(overrides.clone());
        TextBlock {
            cursor_attributes,
            ..self.clone()
        }
    }

    /// Toggles `name = value` on the selection, or at the caret on the
    /// attributes the next typed characters will get.
    pub fn apply_text_transform(
        &self,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<TextBlock, DeltaError> {
        let value = value.into();
        if self.selection.is_caret() {
            let current = self.selected_text_attributes()?;
            let mut cursor_attributes = self.armed_or_inherited(&current);
            let toggled = if current.get(name) == Some(&value) {
                None
            } else {
                Some(value)
            };
            log::debug!("toggling cursor attribute {name} to {toggled:?}");
            cursor_attributes.insert(name.to_string(), toggled);
            return Ok(TextBlock {
                cursor_attributes,
                ..self.clone()
            });
        }
        let update = self
            .delta
            .apply_text_transform_to_selection(self.selection, name, value)?;
        Ok(TextBlock {
            delta: update.final_delta,
            ..self.clone()
        })
    }

    pub fn apply_line_type(&self, line_type: &TextLineType) -> Result<TextBlock, DeltaError> {
        let update = self
            .delta
            .apply_line_type_to_selection(self.selection, line_type)?;
        Ok(TextBlock {
            selection: update.overriding_selection.unwrap_or(self.selection),
            delta: update.final_delta,
            cursor_attributes: self.cursor_attributes.clone(),
        })
    }

    /// Attributes shared by the selection; at a caret, what the next typed
    /// character will get.
    pub fn selected_text_attributes(&self) -> Result<Attributes, DeltaError> {
        if self.selection.is_caret() && !self.cursor_attributes.is_empty() {
            return Ok(Attributes::default().merge(&self.cursor_attributes));
        }
        self.delta.selected_text_attributes(self.selection)
    }

    pub fn selected_line_type(&self) -> Result<TextLineType, DeltaError> {
        self.delta.line_type_in_selection(self.selection)
    }

    /// Armed overrides, or the inherited attributes turned into overrides so
    /// that a single toggle does not drop them.
    fn armed_or_inherited(&self, current: &Attributes) -> AttributeOverrides {
        if !self.cursor_attributes.is_empty() {
            return self.cursor_attributes.clone();
        }
        current
            .iter()
            .map(|(name, value)| (name.clone(), Some(value.clone())))
            .collect()
    }
}
