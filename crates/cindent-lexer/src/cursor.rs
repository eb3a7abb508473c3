/// Character-level iterator over a single line of source text.
///
/// The cursor tracks two positions at once: the byte offset (for slicing the
/// line) and the character column (for token spans). Columns count every
/// character as one, tabs included.
pub struct Cursor<'src> {
    source: &'src str,
    pos: usize,
    col: u32,
    chars: std::str::Chars<'src>,
}

impl<'src> Cursor<'src> {
    /// Create a new cursor at the start of the line.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            col: 0,
            chars: source.chars(),
        }
    }

    /// Look at the current character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    /// Look at the character after the current one without consuming anything.
    pub fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next()
    }

    /// Consume the current character and advance both positions.
    ///
    /// Returns the consumed character, or `None` at end of line.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += c.len_utf8();
        self.col += 1;
        Some(c)
    }

    /// Current byte offset in the line.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Current character column in the line.
    pub fn col(&self) -> u32 {
        self.col
    }

    /// Whether the whole line has been consumed.
    pub fn is_eof(&self) -> bool {
        self.peek().is_none()
    }

    /// The unconsumed remainder of the line.
    pub fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    /// Advance while the predicate holds for the current character.
    pub fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if predicate(c) {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Consume `n` characters, stopping early at end of line.
    pub fn eat_chars(&mut self, n: usize) {
        for _ in 0..n {
            if self.advance().is_none() {
                break;
            }
        }
    }

    /// Consume everything up to and including the next occurrence of
    /// `needle`. Returns `false` (having consumed the whole line) when the
    /// needle does not occur.
    pub fn eat_through(&mut self, needle: &str) -> bool {
        match self.rest().find(needle) {
            Some(offset) => {
                let target = self.pos + offset + needle.len();
                while self.pos < target && self.advance().is_some() {}
                true
            }
            None => {
                self.eat_while(|_| true);
                false
            }
        }
    }

    /// Extract a slice of the line by byte offsets.
    ///
    /// # Panics
    ///
    /// Panics if start or end are out of bounds or not on UTF-8 boundaries.
    pub fn slice(&self, start: usize, end: usize) -> &'src str {
        &self.source[start..end]
    }
}
