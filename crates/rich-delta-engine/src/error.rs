/// Errors raised by delta operations.
#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    /// A selection (or change context) does not fit the text it refers to.
    ///
    /// Offsets are never clamped: a clamped selection could silently drop a
    /// real edit, so callers must sequence events against the delta version
    /// they were computed from.
    #[error("invalid selection {start}..{end} for text of length {len}")]
    InvalidSelection { start: usize, end: usize, len: usize },
    #[error("invalid delta JSON: {0}")]
    Json(#[from] serde_json::Error),
}
