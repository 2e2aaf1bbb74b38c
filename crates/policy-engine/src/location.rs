use std::fmt;

/// A position in source text, attached to tokens, AST nodes, and errors.
///
/// `line` and `column` are 1-based, matching how editors report positions.
/// `offset`/`length` are byte-based and optional because not every caller
/// that constructs a `Location` (e.g. a synthesized node) has a byte range
/// to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
    pub offset: Option<u32>,
    pub length: Option<u32>,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column, offset: None, length: None }
    }

    pub fn with_span(line: u32, column: u32, offset: u32, length: u32) -> Self {
        Self { line, column, offset: Some(offset), length: Some(length) }
    }

    /// Location for synthesized nodes that have no source origin (e.g. a
    /// desugared `else` clause). Kept distinct from a real `(1, 1)` token so
    /// callers can tell them apart if they need to.
    pub fn synthetic() -> Self {
        Self { line: 0, column: 0, offset: None, length: None }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::synthetic()
    }
}
