use serde::Serialize;

/// Lexical context carried from the end of one line into the next.
///
/// The default value is the state at the start of a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct CarryState {
    /// The line ended inside an unterminated `/* ... */` comment.
    pub in_block_comment: bool,
    /// The line ended inside a raw string literal; holds its delimiter
    /// (the part between `"` and `(`, possibly empty).
    pub raw_string: Option<String>,
    /// The line was a preprocessor directive ending with a backslash.
    pub in_preprocessor_continuation: bool,
}

impl CarryState {
    /// Whether the next line starts in plain code.
    pub fn is_clear(&self) -> bool {
        !self.in_block_comment
            && self.raw_string.is_none()
            && !self.in_preprocessor_continuation
    }
}
