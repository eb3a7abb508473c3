use serde::Serialize;

use crate::span::Span;

/// A token produced by the line lexer.
///
/// Tokens keep their raw text because the formatter needs to look at
/// operator spellings, preprocessor directive names and identifier casing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

impl Token {
    /// Create a new token from a kind, column offsets and its raw text.
    pub fn new(kind: TokenKind, start: u32, end: u32, text: impl Into<String>) -> Self {
        Self {
            kind,
            span: Span::new(start, end),
            text: text.into(),
        }
    }

    /// Whether the token takes part in structural analysis.
    pub fn is_significant(&self) -> bool {
        self.kind.is_significant()
    }
}

/// Every kind of token the line lexer distinguishes.
///
/// Only the keywords that steer indentation get their own variant; all
/// other keywords lex as [`TokenKind::Ident`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // ── Keywords ───────────────────────────────────────────────────────
    If,
    Else,
    While,
    For,
    /// `foreach`, `Q_FOREACH`, `forever`, `Q_FOREVER`.
    ForLike,
    Do,
    Switch,
    Case,
    Default,
    Namespace,
    Class,
    Struct,
    Union,
    Enum,
    Template,
    Extern,
    Public,
    Protected,
    Private,
    /// `signals` or `Q_SIGNALS`.
    Signals,
    /// `slots` or `Q_SLOTS`.
    Slots,
    Return,
    Break,
    Continue,
    Goto,
    Try,
    Catch,
    Typename,

    // ── Words and literals ─────────────────────────────────────────────
    /// Identifier or any keyword without structural meaning.
    Ident,
    /// `@interface`, `@end`, `@property`, ...
    AtKeyword,
    /// Integer or floating literal, including digit separators.
    Number,
    /// String literal, possibly prefixed or raw, possibly unterminated.
    StringLiteral,
    /// Character literal, possibly unterminated.
    CharLiteral,
    /// A whole line inside a multi-line raw string.
    RawStringContinuation,

    // ── Comments ───────────────────────────────────────────────────────
    /// `// ...` to end of line.
    LineComment,
    /// `/* ... */` closed on the same line.
    BlockComment,
    /// `/* ...` left open at end of line.
    BlockCommentStart,
    /// `... */` closing a comment opened on an earlier line.
    BlockCommentEnd,
    /// A whole line inside a block comment.
    CommentContinuation,

    // ── Preprocessor and layout ────────────────────────────────────────
    /// `#` introducing a preprocessor directive.
    Hash,
    /// A run of spaces and tabs.
    Whitespace,

    // ── Punctuation ────────────────────────────────────────────────────
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `::`
    ColonColon,
    /// `?`
    Question,
    /// `<` classified as the start of a template argument list.
    TemplateOpen,
    /// `<` as a relational operator.
    Lt,
    /// `>`; closes a template argument list when one is open.
    Gt,
    /// `<<`
    Shl,
    /// `>>`; closes two template argument lists when they are open.
    Shr,
    /// `=`, `+=`, `<<=`, ...
    Assign,
    /// Any other operator; the spelling is in [`Token::text`].
    Operator,
}

impl TokenKind {
    /// Whether tokens of this kind take part in structural analysis.
    pub fn is_significant(self) -> bool {
        !self.is_comment() && self != TokenKind::Whitespace
    }

    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::LineComment
                | TokenKind::BlockComment
                | TokenKind::BlockCommentStart
                | TokenKind::BlockCommentEnd
                | TokenKind::CommentContinuation
        )
    }

    /// Keywords that introduce an access specifier label.
    pub fn is_access_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Public
                | TokenKind::Protected
                | TokenKind::Private
                | TokenKind::Signals
                | TokenKind::Slots
        )
    }

    /// Keywords and words that may start a declaration-level name, used by
    /// the template angle heuristic.
    pub fn is_word(self) -> bool {
        self == TokenKind::Ident || keyword_text(self).is_some()
    }
}

/// Look up a structural keyword from its spelling.
///
/// Returns `Some(TokenKind)` for keywords the engine cares about, `None`
/// otherwise. Lookup is case-sensitive.
pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
    match s {
        "if" => Some(TokenKind::If),
        "else" => Some(TokenKind::Else),
        "while" => Some(TokenKind::While),
        "for" => Some(TokenKind::For),
        "foreach" | "Q_FOREACH" | "forever" | "Q_FOREVER" => Some(TokenKind::ForLike),
        "do" => Some(TokenKind::Do),
        "switch" => Some(TokenKind::Switch),
        "case" => Some(TokenKind::Case),
        "default" => Some(TokenKind::Default),
        "namespace" => Some(TokenKind::Namespace),
        "class" => Some(TokenKind::Class),
        "struct" => Some(TokenKind::Struct),
        "union" => Some(TokenKind::Union),
        "enum" => Some(TokenKind::Enum),
        "template" => Some(TokenKind::Template),
        "extern" => Some(TokenKind::Extern),
        "public" => Some(TokenKind::Public),
        "protected" => Some(TokenKind::Protected),
        "private" => Some(TokenKind::Private),
        "signals" | "Q_SIGNALS" => Some(TokenKind::Signals),
        "slots" | "Q_SLOTS" => Some(TokenKind::Slots),
        "return" => Some(TokenKind::Return),
        "break" => Some(TokenKind::Break),
        "continue" => Some(TokenKind::Continue),
        "goto" => Some(TokenKind::Goto),
        "try" => Some(TokenKind::Try),
        "catch" => Some(TokenKind::Catch),
        "typename" => Some(TokenKind::Typename),
        _ => None,
    }
}

/// Canonical spelling of a keyword kind, `None` for non-keywords.
pub fn keyword_text(kind: TokenKind) -> Option<&'static str> {
    let text = match kind {
        TokenKind::If => "if",
        TokenKind::Else => "else",
        TokenKind::While => "while",
        TokenKind::For => "for",
        TokenKind::ForLike => "foreach",
        TokenKind::Do => "do",
        TokenKind::Switch => "switch",
        TokenKind::Case => "case",
        TokenKind::Default => "default",
        TokenKind::Namespace => "namespace",
        TokenKind::Class => "class",
        TokenKind::Struct => "struct",
        TokenKind::Union => "union",
        TokenKind::Enum => "enum",
        TokenKind::Template => "template",
        TokenKind::Extern => "extern",
        TokenKind::Public => "public",
        TokenKind::Protected => "protected",
        TokenKind::Private => "private",
        TokenKind::Signals => "signals",
        TokenKind::Slots => "slots",
        TokenKind::Return => "return",
        TokenKind::Break => "break",
        TokenKind::Continue => "continue",
        TokenKind::Goto => "goto",
        TokenKind::Try => "try",
        TokenKind::Catch => "catch",
        TokenKind::Typename => "typename",
        _ => return None,
    };
    Some(text)
}
