use serde::Serialize;

/// Column span within a single line. Start is inclusive, end is exclusive.
///
/// Columns count characters from the start of the line, so a tab occupies a
/// single column. Spans never cross line boundaries: the engine only ever
/// looks at one line at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Create a new span from character columns.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start ({start}) must be <= end ({end})");
        Self { start, end }
    }

    /// Width of the span in columns.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Whether the span is empty (zero-width).
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}
