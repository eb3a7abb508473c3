// cindent lexer -- single-line tokenizer for C-family source text.

mod cursor;

use cindent_common::carry::CarryState;
use cindent_common::token::{keyword_from_str, Token, TokenKind};
use cursor::Cursor;

/// Multi-character operators, longest first so the first match wins.
const OPERATORS: &[&str] = &[
    "<<=", ">>=", "<=>", "...", "->*", "::", "##", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||",
    "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "->", ".*",
];

const ASSIGNMENTS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=",
];

/// Identifiers after which `<` always opens a template argument list.
const CAST_NAMES: &[&str] = &[
    "static_cast",
    "dynamic_cast",
    "reinterpret_cast",
    "const_cast",
    "qobject_cast",
    "qvariant_cast",
];

/// Words that may precede a type name, e.g. `const QList<int>`.
const TYPE_QUALIFIERS: &[&str] = &[
    "const", "static", "inline", "virtual", "unsigned", "signed", "volatile", "mutable",
    "constexpr", "explicit", "friend", "using", "new", "typedef",
];

/// The tokens of one line together with the carry state around it.
#[derive(Debug, Clone, PartialEq)]
pub struct LexedLine {
    pub tokens: Vec<Token>,
    /// Carry state the line was lexed with.
    pub carry_in: CarryState,
    /// Carry state to lex the following line with.
    pub carry_out: CarryState,
}

impl LexedLine {
    /// Tokens that take part in structural analysis (no comments or blanks).
    pub fn significant(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| t.is_significant())
    }

    pub fn first_significant(&self) -> Option<&Token> {
        self.significant().next()
    }

    pub fn last_significant(&self) -> Option<&Token> {
        self.significant().last()
    }

    /// Whether the line holds no significant token at all.
    pub fn is_blank(&self) -> bool {
        self.first_significant().is_none()
    }

    /// Whether the line is a preprocessor directive or one of its
    /// backslash-continued follow-up lines.
    pub fn is_preprocessor(&self) -> bool {
        self.carry_in.in_preprocessor_continuation
            || self
                .first_significant()
                .is_some_and(|t| t.kind == TokenKind::Hash)
    }

    /// Whether the line lies entirely inside a raw string literal.
    pub fn is_raw_string_continuation(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| t.kind == TokenKind::RawStringContinuation)
    }
}

/// The line lexer. Converts one line plus its incoming carry state into a
/// token sequence and the outgoing carry state.
pub struct LineLexer<'src> {
    cursor: Cursor<'src>,
    tokens: Vec<Token>,
    carry: CarryState,
    /// Template argument lists opened on this line and not closed yet.
    template_depth: u32,
}

impl<'src> LineLexer<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            tokens: Vec::new(),
            carry: CarryState::default(),
            template_depth: 0,
        }
    }

    /// Tokenize one line given the carry state left by the previous line.
    ///
    /// Never fails: unterminated literals run to the end of the line and
    /// unknown characters become single-character operators.
    pub fn tokenize(line: &str, carry: &CarryState) -> LexedLine {
        let mut lexer = LineLexer::new(line);

        let resumed = if carry.in_block_comment {
            lexer.resume_block_comment()
        } else if let Some(delimiter) = &carry.raw_string {
            lexer.resume_raw_string(delimiter)
        } else {
            true
        };

        if resumed {
            while !lexer.cursor.is_eof() {
                lexer.next_token();
            }
        }

        let preprocessor = carry.in_preprocessor_continuation
            || lexer
                .tokens
                .iter()
                .find(|t| t.is_significant())
                .is_some_and(|t| t.kind == TokenKind::Hash);
        lexer.carry.in_preprocessor_continuation =
            preprocessor && line.trim_end().ends_with('\\');

        LexedLine {
            tokens: lexer.tokens,
            carry_in: carry.clone(),
            carry_out: lexer.carry,
        }
    }

    // ── Carry-over ───────────────────────────────────────────────────────

    /// Continue a block comment from the previous line. Returns whether the
    /// comment ended on this line.
    fn resume_block_comment(&mut self) -> bool {
        if self.cursor.eat_through("*/") {
            self.push(TokenKind::BlockCommentEnd, 0, 0);
            true
        } else {
            self.push(TokenKind::CommentContinuation, 0, 0);
            self.carry.in_block_comment = true;
            false
        }
    }

    /// Continue a raw string from the previous line. Returns whether the
    /// literal ended on this line.
    fn resume_raw_string(&mut self, delimiter: &str) -> bool {
        let terminator = format!("){delimiter}\"");
        if self.cursor.eat_through(&terminator) {
            self.push(TokenKind::StringLiteral, 0, 0);
            true
        } else {
            self.push(TokenKind::RawStringContinuation, 0, 0);
            self.carry.raw_string = Some(delimiter.to_string());
            false
        }
    }

    // ── Main dispatch ────────────────────────────────────────────────────

    fn next_token(&mut self) {
        let start = self.cursor.pos();
        let start_col = self.cursor.col();
        let Some(c) = self.cursor.peek() else {
            return;
        };

        match c {
            ' ' | '\t' | '\r' | '\n' | '\x0c' => {
                self.cursor
                    .eat_while(|c| matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0c'));
                self.push(TokenKind::Whitespace, start, start_col);
            }
            '/' if self.cursor.peek_next() == Some('/') => {
                self.cursor.eat_while(|_| true);
                self.push(TokenKind::LineComment, start, start_col);
            }
            '/' if self.cursor.peek_next() == Some('*') => self.lex_block_comment(start, start_col),
            '"' => {
                self.lex_quoted('"');
                self.push(TokenKind::StringLiteral, start, start_col);
            }
            '\'' => {
                self.lex_quoted('\'');
                self.push(TokenKind::CharLiteral, start, start_col);
            }
            '0'..='9' => self.lex_number(start, start_col),
            '.' if self.cursor.peek_next().is_some_and(|c| c.is_ascii_digit()) => {
                self.lex_number(start, start_col)
            }
            '#' if self.significant_count() == 0 => {
                self.cursor.advance();
                self.push(TokenKind::Hash, start, start_col);
            }
            '@' => self.lex_at(start, start_col),
            c if is_ident_start(c) => self.lex_ident(start, start_col),
            '{' => self.single(TokenKind::LBrace, start, start_col),
            '}' => self.single(TokenKind::RBrace, start, start_col),
            '(' => self.single(TokenKind::LParen, start, start_col),
            ')' => self.single(TokenKind::RParen, start, start_col),
            '[' => self.single(TokenKind::LBracket, start, start_col),
            ']' => self.single(TokenKind::RBracket, start, start_col),
            ';' => self.single(TokenKind::Semicolon, start, start_col),
            ',' => self.single(TokenKind::Comma, start, start_col),
            '?' => self.single(TokenKind::Question, start, start_col),
            _ => self.lex_operator(start, start_col),
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    /// Emit a token covering `start..cursor` (bytes) and `start_col..cursor`
    /// (columns).
    fn push(&mut self, kind: TokenKind, start: usize, start_col: u32) {
        let text = self.cursor.slice(start, self.cursor.pos());
        self.tokens
            .push(Token::new(kind, start_col, self.cursor.col(), text));
    }

    fn single(&mut self, kind: TokenKind, start: usize, start_col: u32) {
        self.cursor.advance();
        self.push(kind, start, start_col);
    }

    fn significant_count(&self) -> usize {
        self.tokens.iter().filter(|t| t.is_significant()).count()
    }

    /// The `n`-th significant token counting back from the end (0 = last).
    fn significant_back(&self, n: usize) -> Option<&Token> {
        self.tokens.iter().rev().filter(|t| t.is_significant()).nth(n)
    }

    // ── Comments ─────────────────────────────────────────────────────────

    fn lex_block_comment(&mut self, start: usize, start_col: u32) {
        self.cursor.eat_chars(2); // consume "/*"
        if self.cursor.eat_through("*/") {
            self.push(TokenKind::BlockComment, start, start_col);
        } else {
            self.push(TokenKind::BlockCommentStart, start, start_col);
            self.carry.in_block_comment = true;
        }
    }

    // ── Literals ─────────────────────────────────────────────────────────

    /// Consume a quoted literal, opening quote included. An unterminated
    /// literal runs to the end of the line.
    fn lex_quoted(&mut self, quote: char) {
        self.cursor.advance(); // consume opening quote
        loop {
            match self.cursor.advance() {
                None => break,
                Some('\\') => {
                    self.cursor.advance(); // escaped char
                }
                Some(c) if c == quote => break,
                Some(_) => {}
            }
        }
    }

    /// Consume a raw string literal starting at the opening `"`.
    fn lex_raw_string(&mut self) {
        let rest = self.cursor.rest();
        let delimiter_len = rest[1..]
            .find(|c: char| c == '(' || c == ')' || c == '\\' || c.is_whitespace() || c == '"')
            .filter(|&len| len <= 16 && rest[1 + len..].starts_with('('));
        let Some(len) = delimiter_len else {
            // Not a well-formed raw string opener; recover as an ordinary string.
            self.lex_quoted('"');
            return;
        };
        let delimiter = rest[1..1 + len].to_string();
        self.cursor.eat_chars(delimiter.chars().count() + 2); // consume `"`, delimiter and `(`
        let terminator = format!("){delimiter}\"");
        if !self.cursor.eat_through(&terminator) {
            self.carry.raw_string = Some(delimiter);
        }
    }

    fn lex_number(&mut self, start: usize, start_col: u32) {
        let mut prev = '\0';
        while let Some(c) = self.cursor.peek() {
            let take = c.is_ascii_alphanumeric()
                || c == '_'
                || c == '.'
                || (c == '\''
                    && self
                        .cursor
                        .peek_next()
                        .is_some_and(|n| n.is_ascii_alphanumeric()))
                || (matches!(c, '+' | '-') && matches!(prev, 'e' | 'E' | 'p' | 'P'));
            if !take {
                break;
            }
            prev = c;
            self.cursor.advance();
        }
        self.push(TokenKind::Number, start, start_col);
    }

    // ── Words ────────────────────────────────────────────────────────────

    fn lex_ident(&mut self, start: usize, start_col: u32) {
        self.cursor.advance(); // consume first char
        self.cursor.eat_while(is_ident_continue);
        let text = self.cursor.slice(start, self.cursor.pos());

        match (text, self.cursor.peek()) {
            ("R" | "LR" | "uR" | "UR" | "u8R", Some('"')) => {
                self.lex_raw_string();
                self.push(TokenKind::StringLiteral, start, start_col);
            }
            ("L" | "u" | "U" | "u8", Some('"')) => {
                self.lex_quoted('"');
                self.push(TokenKind::StringLiteral, start, start_col);
            }
            ("L" | "u" | "U" | "u8", Some('\'')) => {
                self.lex_quoted('\'');
                self.push(TokenKind::CharLiteral, start, start_col);
            }
            _ => {
                let kind = keyword_from_str(text).unwrap_or(TokenKind::Ident);
                self.push(kind, start, start_col);
            }
        }
    }

    /// `@keyword`, `@"string"`, or a lone `@`.
    fn lex_at(&mut self, start: usize, start_col: u32) {
        match self.cursor.peek_next() {
            Some(c) if is_ident_start(c) => {
                self.cursor.advance(); // consume '@'
                self.cursor.advance();
                self.cursor.eat_while(is_ident_continue);
                self.push(TokenKind::AtKeyword, start, start_col);
            }
            Some('"') => {
                self.cursor.advance(); // consume '@'
                self.lex_quoted('"');
                self.push(TokenKind::StringLiteral, start, start_col);
            }
            _ => self.single(TokenKind::Operator, start, start_col),
        }
    }

    // ── Operators ────────────────────────────────────────────────────────

    fn lex_operator(&mut self, start: usize, start_col: u32) {
        let rest = self.cursor.rest();
        let op: &str = match OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            Some(op) => op,
            None => {
                let len = rest.chars().next().map_or(0, char::len_utf8);
                &rest[..len]
            }
        };

        let kind = match op {
            "::" => TokenKind::ColonColon,
            ":" => TokenKind::Colon,
            "<<" => TokenKind::Shl,
            ">>" => {
                self.template_depth = self.template_depth.saturating_sub(2);
                TokenKind::Shr
            }
            ">" => {
                self.template_depth = self.template_depth.saturating_sub(1);
                TokenKind::Gt
            }
            "<" => {
                if self.opens_template(start_col) {
                    self.template_depth += 1;
                    TokenKind::TemplateOpen
                } else {
                    TokenKind::Lt
                }
            }
            op if ASSIGNMENTS.contains(&op) => TokenKind::Assign,
            _ => TokenKind::Operator,
        };
        self.cursor.eat_chars(op.chars().count());
        self.push(kind, start, start_col);
    }

    /// Decide whether the `<` under the cursor opens a template argument
    /// list. Local heuristic only: `a<b` glued at statement start is read as
    /// a template, `a < b` never is.
    fn opens_template(&self, lt_col: u32) -> bool {
        let Some(prev) = self.significant_back(0) else {
            return false;
        };
        if prev.kind == TokenKind::Template {
            return true;
        }
        if prev.kind == TokenKind::Ident && CAST_NAMES.contains(&prev.text.as_str()) {
            return true;
        }
        if !prev.kind.is_word() || prev.span.end != lt_col {
            return false;
        }
        if self
            .cursor
            .peek_next()
            .map_or(true, |c| c.is_whitespace() || c == '=')
        {
            return false;
        }
        if self.template_depth > 0 {
            return true;
        }
        match self.significant_back(1) {
            None => true,
            Some(before) => match before.kind {
                TokenKind::Semicolon
                | TokenKind::LBrace
                | TokenKind::RBrace
                | TokenKind::LParen
                | TokenKind::Comma
                | TokenKind::ColonColon
                | TokenKind::TemplateOpen
                | TokenKind::Typename
                | TokenKind::Class
                | TokenKind::Struct
                | TokenKind::Return => true,
                TokenKind::Ident => TYPE_QUALIFIERS.contains(&before.text.as_str()),
                _ => false,
            },
        }
    }
}

/// Whether a character can start an identifier.
fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

/// Whether a character can continue an identifier.
fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
