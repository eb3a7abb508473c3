//! Formatter core: one line plus the stack left by the line above in, the
//! line's indentation plus the stack for the line below out.
//!
//! The engine never fails. Unbalanced closers, stray `else`s and misread
//! angle brackets all degrade into slightly odd indentation, never into an
//! error or a panic.

use cindent_common::token::{Token, TokenKind};
use cindent_lexer::LexedLine;
use serde::Serialize;

use crate::context::{ContextStack, Frame, FrameKind, LastToken, Statement};
use crate::style::StylePolicy;

/// Computed indentation for one line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineIndent {
    pub indent_units: u32,
    /// Extra columns on top of the indent units.
    pub padding: u32,
    /// The line lies inside a raw string literal and must not be touched.
    pub verbatim: bool,
}

impl LineIndent {
    /// Total leading columns.
    pub fn columns(&self, policy: &StylePolicy) -> u32 {
        self.indent_units * policy.indent_width + self.padding
    }
}

/// Compute the indentation of `line` given the stack left by the line above,
/// and the stack to hand to the line below.
pub fn indent_line(
    line: &LexedLine,
    previous: &ContextStack,
    policy: &StylePolicy,
) -> (LineIndent, ContextStack) {
    let mut stack = previous.clone();
    if line.is_preprocessor() {
        let indent = preprocessor_line(line, &mut stack, policy);
        return (indent, stack);
    }

    if line.is_raw_string_continuation() {
        let indent = LineIndent {
            indent_units: stack.depth_units(),
            padding: 0,
            verbatim: true,
        };
        return (indent, stack);
    }

    let verbatim = line.carry_in.raw_string.is_some();
    let tokens: Vec<&Token> = line.significant().collect();
    let mut scan = LineScan::new(stack, policy);

    let Some(first) = tokens.first().copied() else {
        let indent = scan.resting(line);
        return (indent, scan.stack);
    };

    scan.origin = leading_blanks(line);

    let (leading, units) = scan.leading(&tokens);
    let macro_line = !scan.stack.top().statement.open
        && (first.kind == TokenKind::AtKeyword || is_macro_line(&tokens));
    let units = units.unwrap_or_else(|| scan.stack.depth_units());
    let padding = match &leading {
        Leading::ClosedBrace(Some(closed)) => closed.base_padding,
        _ => scan.padding_for(Some(first)),
    };

    let width = policy.indent_width;
    if verbatim {
        scan.indent_cols = scan.origin;
        scan.padding = scan.origin.saturating_sub(units * width);
    } else {
        scan.indent_cols = units * width + padding;
        scan.padding = padding;
    }

    let mut leading = Some(leading);
    for (i, tok) in tokens.iter().copied().enumerate() {
        let next = tokens.get(i + 1).copied();
        scan.angle_closed = false;
        match leading.take() {
            Some(Leading::ClosedBrace(closed)) => {
                if let Some(closed) = closed {
                    scan.after_close_brace(closed);
                }
            }
            Some(Leading::ClosedParen(closed)) => {
                if let Some(closed) = closed {
                    scan.after_close_paren(closed);
                }
            }
            Some(Leading::ClosedAngle) => {
                scan.angle_closed = true;
                scan.mark(LastToken::Word);
            }
            Some(Leading::Brace(prepared)) => scan.push_brace(prepared, next),
            Some(Leading::Plain) | None => scan.token(tok, next, &tokens[i + 1..]),
        }
        scan.trailing_operator = scan.is_trailing_operator(tok);
        scan.prev = Some(tok.kind);
    }
    scan.finish_line(macro_line);

    let indent = if verbatim {
        LineIndent {
            indent_units: units,
            padding: scan.padding,
            verbatim: true,
        }
    } else {
        LineIndent {
            indent_units: units,
            padding,
            verbatim: false,
        }
    };
    (indent, scan.stack)
}

/// Directive lines sit at column 0; continuation lines of a multi-line
/// directive get one unit. Conditionals save and restore the main frames.
fn preprocessor_line(
    line: &LexedLine,
    stack: &mut ContextStack,
    policy: &StylePolicy,
) -> LineIndent {
    if line.carry_in.in_preprocessor_continuation {
        return LineIndent {
            indent_units: u32::from(policy.indent_macro_continuation),
            padding: 0,
            verbatim: false,
        };
    }
    let directive = line.significant().nth(1).map_or("", |t| t.text.as_str());
    match directive {
        "if" | "ifdef" | "ifndef" => stack.enter_conditional(),
        "elif" | "elifdef" | "elifndef" | "else" => stack.next_branch(),
        "endif" => {
            if stack.conditional_depth() == 0 {
                tracing::trace!("#endif without an open conditional");
            }
            stack.leave_conditional();
        }
        _ => {}
    }
    LineIndent::default()
}

/// What the leading token of a line did to the stack before the line's
/// indentation was computed.
enum Leading {
    Plain,
    ClosedBrace(Option<Frame>),
    ClosedParen(Option<Frame>),
    ClosedAngle,
    Brace(PreparedBrace),
}

/// A `{` whose frame kind is decided and whose enclosing frames are already
/// adjusted, waiting to be pushed.
struct PreparedBrace {
    kind: FrameKind,
    brace_units: u8,
    body_units: u8,
    saved_indent: Option<u8>,
    line_units: u32,
    /// The `{` belonged to a `switch` frame that was updated in place.
    in_place: bool,
}

struct LineScan<'p> {
    stack: ContextStack,
    policy: &'p StylePolicy,
    /// Column the first non-blank token lands on after re-indentation.
    indent_cols: u32,
    /// Column of the first non-blank token in the input line.
    origin: u32,
    padding: u32,
    prev: Option<TokenKind>,
    pending_control: Option<FrameKind>,
    trailing_operator: bool,
    angle_closed: bool,
}

impl<'p> LineScan<'p> {
    fn new(stack: ContextStack, policy: &'p StylePolicy) -> Self {
        Self {
            stack,
            policy,
            indent_cols: 0,
            origin: 0,
            padding: 0,
            prev: None,
            pending_control: None,
            trailing_operator: false,
            angle_closed: false,
        }
    }

    /// Visual column of a token once the line is re-indented.
    fn col(&self, tok: &Token) -> u32 {
        self.indent_cols + tok.span.start.saturating_sub(self.origin)
    }

    // ── Indentation ──────────────────────────────────────────────────────

    /// Indentation for a line without significant tokens.
    fn resting(&self, line: &LexedLine) -> LineIndent {
        let mut padding = self.padding_for(None);
        let starred = line.tokens.iter().any(|t| {
            matches!(
                t.kind,
                TokenKind::CommentContinuation | TokenKind::BlockCommentEnd
            ) && t.text.trim_start().starts_with('*')
        });
        if starred {
            padding += 1;
        }
        LineIndent {
            indent_units: self.stack.depth_units(),
            padding,
            verbatim: false,
        }
    }

    fn padding_for(&self, first: Option<&Token>) -> u32 {
        let width = self.policy.indent_width;
        let depth_cols = self.stack.depth_units() * width;
        let top = self.stack.top();

        if top.kind.is_continuation() {
            let anchor = if top.kind == FrameKind::MemberInitList
                && first.is_some_and(|t| t.kind == TokenKind::Comma)
            {
                top.flags.alt_anchor
            } else {
                top.anchor
            };
            return anchor.saturating_sub(depth_cols);
        }

        let stmt = &top.statement;
        let Some(first) = first else {
            return top.base_padding;
        };
        if !stmt.open {
            return top.base_padding;
        }
        if top.kind == FrameKind::FunctionHeader && first.kind == TokenKind::Colon {
            return top.base_padding;
        }
        if matches!(first.kind, TokenKind::Shl | TokenKind::Shr) {
            if let Some(stream) = stmt.stream {
                return stream.saturating_sub(depth_cols);
            }
        }
        if stmt.continues || is_leading_operator(first) {
            let aligned = if self.policy.align_assignments {
                stmt.operand.or(stmt.stream_operand)
            } else {
                stmt.stream_operand
            };
            let col = aligned.unwrap_or(stmt.start + width);
            return col.saturating_sub(depth_cols);
        }
        top.base_padding
    }

    /// Stack adjustments the first token makes before the line's own
    /// indentation is known. Returns an override for the line's units.
    fn leading(&mut self, tokens: &[&Token]) -> (Leading, Option<u32>) {
        let first = tokens[0];
        self.resolve_awaiting(first.kind);

        match first.kind {
            TokenKind::RBrace => {
                let closed = self.pop_brace();
                let units = closed
                    .as_ref()
                    .map(|f| self.stack.depth_units() + u32::from(f.flags.brace_units));
                (Leading::ClosedBrace(closed), units)
            }
            TokenKind::RParen => (
                Leading::ClosedParen(self.pop_paren(FrameKind::ParenExpr)),
                None,
            ),
            TokenKind::RBracket => (
                Leading::ClosedParen(self.pop_paren(FrameKind::BracketList)),
                None,
            ),
            TokenKind::Gt | TokenKind::Shr
                if self.stack.top().kind == FrameKind::TemplateAngle =>
            {
                self.close_angles(first.kind);
                (Leading::ClosedAngle, None)
            }
            TokenKind::LBrace => {
                let prepared = self.prepare_brace();
                let units = prepared.line_units;
                (Leading::Brace(prepared), Some(units))
            }
            TokenKind::Case | TokenKind::Default => {
                self.pop_case_label();
                (Leading::Plain, None)
            }
            kind if kind.is_access_keyword() && has_colon(tokens) => {
                self.pop_access_region();
                let top = self.stack.top();
                if matches!(top.kind, FrameKind::Class | FrameKind::Struct) && !top.statement.open {
                    let body = u32::from(top.indent - top.flags.brace_units);
                    let units = self.stack.depth_units().saturating_sub(body)
                        + u32::from(self.policy.indent_access_specifiers);
                    (Leading::Plain, Some(units))
                } else {
                    (Leading::Plain, None)
                }
            }
            TokenKind::Colon if self.stack.top().kind == FrameKind::FunctionHeader => {
                let units =
                    self.stack.depth_units() + u32::from(self.policy.indent_member_init_colon);
                (Leading::Plain, Some(units))
            }
            TokenKind::Break | TokenKind::Continue | TokenKind::Return | TokenKind::Goto
                if self.stack.top().kind == FrameKind::CaseLabel
                    && !self.policy.indent_control_flow_relative_to_switch_labels =>
            {
                let label = u32::from(self.stack.top().indent);
                (
                    Leading::Plain,
                    Some(self.stack.depth_units().saturating_sub(label)),
                )
            }
            _ => (Leading::Plain, None),
        }
    }

    // ── Token dispatch ───────────────────────────────────────────────────

    fn token(&mut self, tok: &Token, next: Option<&Token>, rest: &[&Token]) {
        self.resolve_awaiting(tok.kind);

        match tok.kind {
            TokenKind::LBrace => {
                let prepared = self.prepare_brace();
                self.push_brace(prepared, next);
            }
            TokenKind::RBrace => {
                if let Some(closed) = self.pop_brace() {
                    self.after_close_brace(closed);
                }
            }
            TokenKind::LParen => self.open_paren(tok, next, FrameKind::ParenExpr),
            TokenKind::LBracket => self.open_paren(tok, next, FrameKind::BracketList),
            TokenKind::RParen => {
                if let Some(closed) = self.pop_paren(FrameKind::ParenExpr) {
                    self.after_close_paren(closed);
                }
            }
            TokenKind::RBracket => {
                if let Some(closed) = self.pop_paren(FrameKind::BracketList) {
                    self.after_close_paren(closed);
                }
            }
            TokenKind::TemplateOpen => {
                self.touch(tok, LastToken::Operator);
                let (anchor, indent) = self.opener(next);
                let padding = self.padding;
                let frame = self.stack.push(FrameKind::TemplateAngle, anchor);
                frame.indent = indent;
                frame.base_padding = padding;
            }
            TokenKind::Gt | TokenKind::Shr
                if self.stack.top().kind == FrameKind::TemplateAngle =>
            {
                self.close_angles(tok.kind);
                self.angle_closed = true;
                self.mark(LastToken::Word);
            }
            TokenKind::Shl | TokenKind::Shr => self.stream_operator(tok, next),
            TokenKind::Semicolon => self.end_statement(),
            TokenKind::Comma => {
                while self.stack.top().kind == FrameKind::Ternary {
                    self.stack.pop();
                }
                self.touch(tok, LastToken::Open);
            }
            TokenKind::Colon => self.colon(tok, next),
            TokenKind::Question => {
                self.touch(tok, LastToken::Operator);
                let anchor = self.col(tok);
                let padding = self.padding;
                self.stack.push(FrameKind::Ternary, anchor).base_padding = padding;
            }
            TokenKind::Assign => {
                self.touch(tok, LastToken::Assign);
                let operand = next.map(|n| self.col(n));
                let stmt = &mut self.stack.top_mut().statement;
                stmt.assign = true;
                if stmt.operand.is_none() {
                    stmt.operand = operand;
                }
            }
            TokenKind::Return => {
                self.touch(tok, LastToken::Return);
                let operand = next.map(|n| self.col(n));
                let stmt = &mut self.stack.top_mut().statement;
                if stmt.operand.is_none() {
                    stmt.operand = operand;
                }
            }
            TokenKind::If
            | TokenKind::While
            | TokenKind::For
            | TokenKind::ForLike
            | TokenKind::Switch => self.control_keyword(tok, next),
            TokenKind::Else => self.bind_else(),
            TokenKind::Do => {
                let padding = self.padding;
                self.push_pending(FrameKind::DoPending, padding);
            }
            TokenKind::Case | TokenKind::Default => self.case_label(tok),
            kind if kind.is_access_keyword() => self.access_keyword(tok, rest),
            TokenKind::Namespace => self.declare(tok, FrameKind::Namespace),
            TokenKind::Class => self.declare(tok, FrameKind::Class),
            TokenKind::Struct | TokenKind::Union => self.declare(tok, FrameKind::Struct),
            TokenKind::Enum => self.declare(tok, FrameKind::Enum),
            TokenKind::Extern
                if next.is_some_and(|n| n.kind == TokenKind::StringLiteral) =>
            {
                self.declare(tok, FrameKind::ExternBlock)
            }
            TokenKind::Operator => {
                let top = self.stack.top();
                let objc = !top.statement.open
                    && top.kind.is_declaration_scope()
                    && matches!(tok.text.as_str(), "-" | "+");
                self.touch(tok, LastToken::Operator);
                if objc {
                    self.stack.top_mut().statement.objc_method = true;
                }
            }
            TokenKind::Lt | TokenKind::Gt | TokenKind::ColonColon => {
                self.touch(tok, LastToken::Operator)
            }
            TokenKind::Ident if is_specifier(&tok.text) => self.touch(tok, LastToken::Keyword),
            TokenKind::Ident
            | TokenKind::AtKeyword
            | TokenKind::Number
            | TokenKind::StringLiteral
            | TokenKind::CharLiteral => self.touch(tok, LastToken::Word),
            _ => self.touch(tok, LastToken::Keyword),
        }
    }

    /// Record a token as part of the statement open in the top frame.
    fn touch(&mut self, tok: &Token, last: LastToken) {
        let col = self.col(tok);
        let stmt = &mut self.stack.top_mut().statement;
        if !stmt.open {
            stmt.open = true;
            stmt.start = col;
        }
        stmt.tokens += 1;
        stmt.last = last;
    }

    fn mark(&mut self, last: LastToken) {
        let stmt = &mut self.stack.top_mut().statement;
        if !stmt.open {
            stmt.open = true;
            stmt.start = self.indent_cols;
        }
        stmt.last = last;
    }

    /// Anchor and indent for a frame opened by a bracket: align with the
    /// next token when there is one, otherwise one unit in from the line.
    fn opener(&self, next: Option<&Token>) -> (u32, u8) {
        match next {
            Some(next) => (self.col(next), 0),
            None => (
                self.indent_cols + self.policy.indent_width,
                u8::from(self.padding == 0),
            ),
        }
    }

    fn is_trailing_operator(&self, tok: &Token) -> bool {
        match tok.kind {
            TokenKind::Assign | TokenKind::Shl | TokenKind::Lt | TokenKind::Question => true,
            TokenKind::Gt | TokenKind::Shr => !self.angle_closed,
            TokenKind::Operator => matches!(
                tok.text.as_str(),
                "&&" | "||"
                    | "+"
                    | "-"
                    | "*"
                    | "/"
                    | "%"
                    | "|"
                    | "&"
                    | "^"
                    | "=="
                    | "!="
                    | "<="
                    | ">="
                    | "<=>"
            ),
            _ => false,
        }
    }

    fn finish_line(&mut self, macro_line: bool) {
        if macro_line {
            if self.stack.top().kind == FrameKind::FunctionHeader {
                self.stack.pop();
            }
            self.stack.top_mut().statement = Statement::default();
            return;
        }
        let trailing = self.trailing_operator;
        let top = self.stack.top_mut();
        if !top.kind.is_continuation() {
            top.statement.continues = trailing && top.statement.open;
        }
    }

    // ── Statements and control flow ──────────────────────────────────────

    /// Pop frames whose controlled statement finished before `kind`, unless
    /// `kind` is the `else` or `while` they are waiting for.
    fn resolve_awaiting(&mut self, kind: TokenKind) {
        loop {
            let top = self.stack.top();
            if !top.flags.awaiting {
                return;
            }
            match (top.kind, kind) {
                (FrameKind::IfPending, TokenKind::Else) | (FrameKind::DoPending, TokenKind::While) => {
                    return
                }
                _ => {
                    self.stack.pop();
                    self.complete_statement();
                }
            }
        }
    }

    /// A statement ended in the top frame. One-shot control frames it
    /// completes are popped; `if` and `do` start waiting instead.
    fn complete_statement(&mut self) {
        loop {
            let top = self.stack.top_mut();
            top.statement = Statement::default();
            match top.kind {
                FrameKind::IfPending | FrameKind::DoPending if !top.flags.awaiting => {
                    top.flags.awaiting = true;
                    top.indent = 0;
                    return;
                }
                kind if kind.is_pending_control() => {
                    self.stack.pop();
                }
                _ => return,
            }
        }
    }

    fn end_statement(&mut self) {
        loop {
            match self.stack.top().kind {
                FrameKind::Ternary
                | FrameKind::TemplateAngle
                | FrameKind::MemberInitList
                | FrameKind::LabelPending
                | FrameKind::FunctionHeader => {
                    self.stack.pop();
                }
                _ => break,
            }
        }
        let top = self.stack.top_mut();
        match top.kind {
            FrameKind::ParenExpr | FrameKind::BracketList => {
                top.statement.last = LastToken::Open;
                return;
            }
            FrameKind::BraceInitList => {
                tracing::trace!("statement inside a brace list; treating it as a block");
                top.kind = FrameKind::Block;
            }
            _ => {}
        }
        self.complete_statement();
    }

    fn push_pending(&mut self, kind: FrameKind, base_padding: u32) {
        let anchor = self.indent_cols;
        let frame = self.stack.push(kind, anchor);
        frame.indent = u8::from(kind != FrameKind::Switch);
        frame.base_padding = base_padding;
    }

    fn control_keyword(&mut self, tok: &Token, next: Option<&Token>) {
        let kind = match tok.kind {
            TokenKind::If => FrameKind::IfPending,
            TokenKind::While => FrameKind::WhilePending,
            TokenKind::Switch => FrameKind::Switch,
            _ => FrameKind::ForPending,
        };
        let top = self.stack.top_mut();
        if tok.kind == TokenKind::While && top.kind == FrameKind::DoPending && top.flags.awaiting {
            self.stack.pop();
            self.touch(tok, LastToken::Keyword);
            return;
        }
        if tok.kind == TokenKind::If
            && top.kind == FrameKind::ElsePending
            && self.prev == Some(TokenKind::Else)
        {
            top.indent = 0;
        }
        if next.is_some_and(|n| n.kind == TokenKind::LParen) {
            self.pending_control = Some(kind);
        } else {
            let padding = self.padding;
            self.push_pending(kind, padding);
        }
    }

    fn bind_else(&mut self) {
        let top = self.stack.top_mut();
        if top.kind == FrameKind::IfPending && top.flags.awaiting {
            top.kind = FrameKind::ElsePending;
            top.flags.awaiting = false;
            top.indent = 1;
            top.statement = Statement::default();
        } else {
            tracing::trace!("else without a matching if");
            let padding = self.padding;
            self.push_pending(FrameKind::ElsePending, padding);
        }
    }

    fn declare(&mut self, tok: &Token, kind: FrameKind) {
        if self.stack.top().kind.is_continuation() {
            self.touch(tok, LastToken::Keyword);
            return;
        }
        self.touch(tok, LastToken::Keyword);
        let stmt = &mut self.stack.top_mut().statement;
        if stmt.decl.is_none() {
            stmt.decl = Some(kind);
        }
    }

    fn stream_operator(&mut self, tok: &Token, next: Option<&Token>) {
        self.touch(tok, LastToken::Operator);
        let col = self.col(tok);
        let operand = next.map(|n| self.col(n));
        let stmt = &mut self.stack.top_mut().statement;
        if stmt.stream.is_none() {
            stmt.stream = Some(col);
            stmt.stream_operand = operand;
        }
    }

    // ── Labels ───────────────────────────────────────────────────────────

    fn pop_case_label(&mut self) {
        if let Some(index) = self
            .stack
            .find_above(|f| f.kind == FrameKind::CaseLabel, |f| f.kind.is_brace())
        {
            self.stack.remove_from(index);
        }
    }

    fn pop_access_region(&mut self) {
        if let Some(index) = self.stack.find_above(
            |f| f.kind == FrameKind::AccessSpecifierRegion,
            |f| f.kind.is_brace(),
        ) {
            self.stack.remove_from(index);
        }
    }

    fn case_label(&mut self, tok: &Token) {
        let top = self.stack.top();
        let in_switch = (top.kind == FrameKind::Switch && top.flags.braced)
            || top.kind == FrameKind::CaseLabel;
        if !in_switch {
            self.touch(tok, LastToken::Keyword);
            return;
        }
        if top.kind == FrameKind::CaseLabel {
            self.stack.pop();
        }
        let padding = self.padding;
        self.stack
            .push(FrameKind::LabelPending, self.indent_cols)
            .base_padding = padding;
    }

    fn access_keyword(&mut self, tok: &Token, rest: &[&Token]) {
        let top = self.stack.top();
        if top.kind == FrameKind::LabelPending && top.flags.access {
            return;
        }
        let labelled = rest.iter().any(|t| t.kind == TokenKind::Colon);
        if top.kind == FrameKind::AccessSpecifierRegion && !top.statement.open && labelled {
            self.stack.pop();
        }
        let top = self.stack.top();
        if matches!(top.kind, FrameKind::Class | FrameKind::Struct)
            && !top.statement.open
            && labelled
        {
            let padding = self.padding;
            let frame = self.stack.push(FrameKind::LabelPending, self.indent_cols);
            frame.flags.access = true;
            frame.base_padding = padding;
        } else {
            self.touch(tok, LastToken::Keyword);
        }
    }

    fn colon(&mut self, tok: &Token, next: Option<&Token>) {
        while self.stack.top().kind == FrameKind::Ternary && self.stack.top().flags.seen_colon {
            self.stack.pop();
        }
        let col = self.col(tok);
        let top = self.stack.top_mut();
        match top.kind {
            FrameKind::LabelPending => {
                let access = top.flags.access;
                let padding = top.base_padding;
                self.stack.pop();
                let indent = if access {
                    self.region_units()
                } else {
                    u8::from(self.policy.indent_statements_relative_to_switch_labels)
                };
                let kind = if access {
                    FrameKind::AccessSpecifierRegion
                } else {
                    FrameKind::CaseLabel
                };
                let frame = self.stack.push(kind, col);
                frame.indent = indent;
                frame.base_padding = padding;
            }
            FrameKind::Ternary => {
                top.anchor = col;
                top.flags.seen_colon = true;
            }
            FrameKind::FunctionHeader => self.open_member_init(tok, next),
            FrameKind::MemberInitList => {}
            kind if kind.is_continuation() => self.touch(tok, LastToken::Operator),
            _ => {
                let stmt = &top.statement;
                if stmt.open && stmt.tokens == 1 && stmt.decl.is_none() {
                    // `label:`
                    top.statement = Statement::default();
                } else {
                    self.touch(tok, LastToken::Operator);
                }
            }
        }
    }

    /// Units an access specifier region adds below its class.
    fn region_units(&self) -> u8 {
        if !self.policy.indent_declarations_relative_to_access_specifiers {
            return 0;
        }
        let top = self.stack.top();
        let body = i32::from(top.indent) - i32::from(top.flags.brace_units);
        let units = i32::from(self.policy.indent_access_specifiers) + 1 - body;
        u8::try_from(units.max(0)).unwrap_or(0)
    }

    /// With alignment the initializers line up after the `:`; without it
    /// they sit flush with the start of the declaration.
    fn open_member_init(&mut self, tok: &Token, next: Option<&Token>) {
        let col = self.col(tok);
        let leading = col == self.indent_cols;
        let header = self.stack.top();
        let (anchor, indent) = if self.policy.align_member_initializers {
            (
                next.map_or(col + 2, |n| self.col(n)),
                u8::from(leading && self.policy.indent_member_init_colon),
            )
        } else {
            (header.statement.start, 0)
        };
        let padding = header.base_padding;
        let frame = self.stack.push(FrameKind::MemberInitList, anchor);
        frame.indent = indent;
        frame.base_padding = padding;
        frame.flags.alt_anchor = col;
    }

    // ── Brackets ─────────────────────────────────────────────────────────

    fn open_paren(&mut self, tok: &Token, next: Option<&Token>, kind: FrameKind) {
        let control = if kind == FrameKind::ParenExpr {
            self.pending_control.take()
        } else {
            None
        };
        self.pending_control = None;
        if control.is_none() {
            self.touch(tok, LastToken::Open);
        }
        let (anchor, indent) = self.opener(next);
        let padding = self.padding;
        let frame = self.stack.push(kind, anchor);
        frame.indent = indent;
        frame.base_padding = padding;
        frame.flags.control = control;
    }

    /// Pop the innermost `kind` frame within the current brace scope.
    fn pop_paren(&mut self, kind: FrameKind) -> Option<Frame> {
        if let Some(index) = self
            .stack
            .find_above(|f| f.kind == kind, |f| f.kind.is_brace())
        {
            return self.stack.remove_from(index);
        }
        let top = self.stack.top().kind;
        if matches!(
            top,
            FrameKind::ParenExpr | FrameKind::BracketList | FrameKind::TemplateAngle
        ) {
            tracing::trace!(?kind, ?top, "mismatched closer pops the open bracket");
            return self.stack.pop();
        }
        tracing::trace!(?kind, "stray closer ignored");
        None
    }

    fn after_close_paren(&mut self, closed: Frame) {
        let last = if closed.kind == FrameKind::BracketList {
            LastToken::CloseBracket
        } else {
            LastToken::CloseParen
        };
        if let Some(control) = closed.flags.control {
            self.push_pending(control, closed.base_padding);
            return;
        }
        self.mark(last);
        if closed.kind != FrameKind::ParenExpr {
            return;
        }
        let top = self.stack.top();
        if top.kind.is_declaration_scope() && !top.statement.assign && !top.statement.objc_method {
            let base_padding = top.base_padding;
            let statement = std::mem::take(&mut self.stack.top_mut().statement);
            let header = self.stack.push(FrameKind::FunctionHeader, statement.start);
            header.statement = statement;
            header.base_padding = base_padding;
        }
    }

    fn close_angles(&mut self, kind: TokenKind) {
        let count = if kind == TokenKind::Shr { 2 } else { 1 };
        for _ in 0..count {
            if self.stack.top().kind == FrameKind::TemplateAngle {
                self.stack.pop();
            }
        }
    }

    // ── Braces ───────────────────────────────────────────────────────────

    /// Decide what a `{` opens from the frame and statement it appears in.
    fn brace_kind(&self) -> FrameKind {
        let top = self.stack.top();
        let stmt = &top.statement;
        match top.kind {
            FrameKind::Switch if !top.flags.braced => return FrameKind::Switch,
            FrameKind::MemberInitList => {
                return if stmt.last == LastToken::Word {
                    FrameKind::BraceInitList
                } else {
                    FrameKind::FunctionBody
                };
            }
            FrameKind::FunctionHeader => {
                return if matches!(stmt.last, LastToken::Assign | LastToken::Open) {
                    FrameKind::BraceInitList
                } else {
                    FrameKind::FunctionBody
                };
            }
            kind if kind.is_continuation() => {
                return if matches!(stmt.last, LastToken::CloseParen | LastToken::CloseBracket) {
                    FrameKind::Block
                } else {
                    FrameKind::BraceInitList
                };
            }
            _ => {}
        }
        if matches!(
            stmt.last,
            LastToken::Assign | LastToken::Open | LastToken::Return | LastToken::Operator
        ) {
            return FrameKind::BraceInitList;
        }
        if let Some(decl) = stmt.decl {
            return decl;
        }
        if stmt.objc_method {
            return FrameKind::FunctionBody;
        }
        if stmt.open && stmt.last == LastToken::Word {
            return FrameKind::BraceInitList;
        }
        FrameKind::Block
    }

    fn prepare_brace(&mut self) -> PreparedBrace {
        let kind = self.brace_kind();
        let (brace_units, body_units) = if kind == FrameKind::BraceInitList {
            (0, 0)
        } else {
            self.policy.brace_units(kind)
        };

        if kind == FrameKind::Switch {
            let line_units = self.stack.depth_units() + u32::from(brace_units);
            let top = self.stack.top_mut();
            top.flags.braced = true;
            top.flags.brace_units = brace_units;
            top.indent = brace_units + body_units;
            top.statement = Statement::default();
            return PreparedBrace {
                kind,
                brace_units,
                body_units,
                saved_indent: None,
                line_units,
                in_place: true,
            };
        }

        if kind == FrameKind::FunctionBody {
            if self.stack.top().kind == FrameKind::MemberInitList {
                self.stack.pop();
            }
            if self.stack.top().kind == FrameKind::FunctionHeader {
                self.stack.pop();
            }
        }

        let mut saved_indent = None;
        let blocks_relative = self.policy.indent_blocks_relative_to_switch_labels;
        let top = self.stack.top_mut();
        if kind == FrameKind::Block && top.kind.is_pending_control() {
            top.indent = 0;
        }
        if kind == FrameKind::Block && top.kind == FrameKind::CaseLabel && !blocks_relative {
            saved_indent = Some(top.indent);
            top.indent = 0;
        }
        if kind != FrameKind::BraceInitList {
            top.statement = Statement::default();
        }

        PreparedBrace {
            kind,
            brace_units,
            body_units,
            saved_indent,
            line_units: self.stack.depth_units() + u32::from(brace_units),
            in_place: false,
        }
    }

    fn push_brace(&mut self, prepared: PreparedBrace, next: Option<&Token>) {
        if prepared.in_place {
            return;
        }
        if prepared.kind == FrameKind::BraceInitList {
            self.mark(LastToken::Open);
        }
        let (anchor, indent) = if prepared.kind == FrameKind::BraceInitList {
            self.opener(next)
        } else {
            (
                self.indent_cols,
                prepared.brace_units + prepared.body_units,
            )
        };
        let padding = self.padding;
        let frame = self.stack.push(prepared.kind, anchor);
        frame.indent = indent;
        frame.base_padding = padding;
        frame.flags.brace_units = prepared.brace_units;
        frame.flags.saved_indent = prepared.saved_indent;
    }

    /// Pop the innermost brace-delimited frame and everything above it.
    fn pop_brace(&mut self) -> Option<Frame> {
        let found = self.stack.find_above(
            |f| f.kind.is_brace() && (f.kind != FrameKind::Switch || f.flags.braced),
            |_| false,
        );
        match found {
            Some(index) => self.stack.remove_from(index),
            None => {
                tracing::trace!("unbalanced closing brace ignored");
                None
            }
        }
    }

    fn after_close_brace(&mut self, closed: Frame) {
        match closed.kind {
            FrameKind::BraceInitList => self.mark(LastToken::CloseBrace),
            FrameKind::Class | FrameKind::Struct | FrameKind::Enum => {
                self.mark(LastToken::CloseBrace)
            }
            _ => {
                if let Some(saved) = closed.flags.saved_indent {
                    let top = self.stack.top_mut();
                    if top.kind == FrameKind::CaseLabel {
                        top.indent = saved;
                    }
                }
                self.complete_statement();
            }
        }
    }
}

/// Column of the first non-blank character of the line. Tokens carried over
/// from the line above (a comment or raw string tail) start at column 0 and
/// include the line's leading blanks.
fn leading_blanks(line: &LexedLine) -> u32 {
    let mut column = 0;
    for tok in &line.tokens {
        let blanks = tok
            .text
            .chars()
            .take_while(|c| matches!(c, ' ' | '\t'))
            .count();
        column += u32::try_from(blanks).unwrap_or(u32::MAX);
        if blanks < tok.text.chars().count() {
            break;
        }
    }
    column
}

/// Operators that mark a line as the continuation of the statement above.
fn is_leading_operator(tok: &Token) -> bool {
    match tok.kind {
        TokenKind::Shl
        | TokenKind::Shr
        | TokenKind::Lt
        | TokenKind::Gt
        | TokenKind::Question
        | TokenKind::Colon
        | TokenKind::Assign => true,
        TokenKind::Operator => matches!(
            tok.text.as_str(),
            "&&" | "||"
                | "+"
                | "-"
                | "*"
                | "/"
                | "%"
                | "|"
                | "&"
                | "^"
                | "=="
                | "!="
                | "<="
                | ">="
                | "<=>"
                | "."
                | "->"
                | "->*"
                | ".*"
        ),
        _ => false,
    }
}

/// Trailing specifiers after a parameter list; a `{` after them is a body.
fn is_specifier(text: &str) -> bool {
    matches!(
        text,
        "const" | "mutable" | "noexcept" | "override" | "final" | "volatile"
    )
}

fn has_colon(tokens: &[&Token]) -> bool {
    tokens.iter().any(|t| t.kind == TokenKind::Colon)
}

/// `FOO` or `FOO(...)` alone on a line: an ALL-CAPS macro invocation that
/// does not end in `;`.
fn is_macro_line(tokens: &[&Token]) -> bool {
    let first = tokens[0];
    if first.kind != TokenKind::Ident || !is_macro_name(&first.text) {
        return false;
    }
    if tokens.len() == 1 {
        return true;
    }
    if tokens[1].kind != TokenKind::LParen {
        return false;
    }
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(1) {
        match tok.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == tokens.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

fn is_macro_name(text: &str) -> bool {
    text.chars().count() >= 2
        && !text.starts_with(|c: char| c.is_ascii_digit())
        && text.chars().any(|c| c.is_ascii_uppercase())
        && text
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
