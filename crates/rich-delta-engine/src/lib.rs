pub mod attributes;
pub mod delta;
mod diff;
pub mod document;
pub mod error;
pub mod heading;
pub mod lines;
pub mod selection;
pub mod transforms;

// Re-export key types for easier usage
pub use attributes::{AttributeOverrides, AttributeValue, Attributes, LINE_TYPE_ATTRIBUTE};
pub use delta::{Delta, DeltaUpdate, Run};
pub use document::TextBlock;
pub use error::DeltaError;
pub use heading::{heading_characters, heading_prefix_len};
pub use lines::{Line, LineWalker, TextLineType, is_line_in_selection};
pub use selection::{ChangeContext, Selection, TextChangeEvent};
pub use transforms::TogglePolicy;
