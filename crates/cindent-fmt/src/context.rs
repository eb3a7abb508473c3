//! Context stack: the nested lexical scopes the engine tracks between lines.
//!
//! The stack is a plain value. Everything the engine remembers about the
//! text above a line lives in it, so a snapshot of the stack at the end of a
//! line is enough to resume formatting at the next one.

use serde::Serialize;

/// Every kind of scope the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FrameKind {
    /// Bottom sentinel; never popped.
    TopLevel,
    Namespace,
    Class,
    Struct,
    Enum,
    /// A declaration whose parameter list closed at declaration scope; waits
    /// for `{`, `:` or `;`.
    FunctionHeader,
    FunctionBody,
    Block,
    IfPending,
    ElsePending,
    WhilePending,
    ForPending,
    DoPending,
    Switch,
    CaseLabel,
    AccessSpecifierRegion,
    TemplateAngle,
    ParenExpr,
    BracketList,
    BraceInitList,
    Ternary,
    MemberInitList,
    ExternBlock,
    PreprocessorIf,
    /// `case`, `default` or an access keyword waiting for its `:`.
    LabelPending,
}

impl FrameKind {
    /// Frames whose content lines align to an anchor column.
    pub fn is_continuation(self) -> bool {
        matches!(
            self,
            FrameKind::ParenExpr
                | FrameKind::BracketList
                | FrameKind::BraceInitList
                | FrameKind::TemplateAngle
                | FrameKind::Ternary
                | FrameKind::MemberInitList
        )
    }

    /// Frames opened by `{` and closed by `}`.
    pub fn is_brace(self) -> bool {
        matches!(
            self,
            FrameKind::Namespace
                | FrameKind::Class
                | FrameKind::Struct
                | FrameKind::Enum
                | FrameKind::FunctionBody
                | FrameKind::Block
                | FrameKind::Switch
                | FrameKind::BraceInitList
                | FrameKind::ExternBlock
        )
    }

    /// One-shot frames waiting for the statement a control keyword governs.
    pub fn is_pending_control(self) -> bool {
        matches!(
            self,
            FrameKind::IfPending
                | FrameKind::ElsePending
                | FrameKind::WhilePending
                | FrameKind::ForPending
                | FrameKind::DoPending
        )
    }

    /// Scopes in which a closed parameter list starts a function definition.
    pub fn is_declaration_scope(self) -> bool {
        matches!(
            self,
            FrameKind::TopLevel
                | FrameKind::Namespace
                | FrameKind::Class
                | FrameKind::Struct
                | FrameKind::ExternBlock
                | FrameKind::AccessSpecifierRegion
        )
    }
}

/// Coarse class of the last token seen in a statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum LastToken {
    #[default]
    None,
    /// `(`, `[`, `{` or `,`.
    Open,
    Assign,
    Return,
    Operator,
    CloseParen,
    CloseBracket,
    CloseBrace,
    /// Identifier, literal, or a `>` closing template arguments.
    Word,
    /// Structural keyword such as `try` or `else`.
    Keyword,
}

/// The statement currently open inside a frame. Columns are absolute
/// visual columns in the re-indented text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub open: bool,
    pub start: u32,
    pub tokens: u32,
    /// First operand after an assignment or `return`.
    pub operand: Option<u32>,
    /// First `<<`/`>>` of a stream chain.
    pub stream: Option<u32>,
    /// First operand after that stream operator.
    pub stream_operand: Option<u32>,
    /// Kind of scope a following `{` opens, from `class`, `namespace`, ...
    pub decl: Option<FrameKind>,
    pub assign: bool,
    /// Objective-C method declaration (`- (void)foo`).
    pub objc_method: bool,
    /// The previous line ended with a binary operator.
    pub continues: bool,
    pub last: LastToken,
}

/// Auxiliary per-frame state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrameFlags {
    /// `if` whose body is complete and may still take an `else`; `do`
    /// whose body is complete and waits for `while`.
    pub awaiting: bool,
    /// `Switch` has seen its `{`.
    pub braced: bool,
    /// `Ternary` has seen its `:`.
    pub seen_colon: bool,
    /// Pending kind to push when this paren (a control head) closes.
    pub control: Option<FrameKind>,
    /// `LabelPending` opened by an access keyword rather than `case`.
    pub access: bool,
    /// Contribution of the enclosing `CaseLabel`, restored when this block
    /// closes.
    pub saved_indent: Option<u8>,
    /// Part of `indent` that comes from indented braces.
    pub brace_units: u8,
    /// Secondary anchor: the `:` column of a member initializer list.
    pub alt_anchor: u32,
}

/// One nested scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub kind: FrameKind,
    /// Column continuation lines align to.
    pub anchor: u32,
    /// Indent units this frame adds to the lines inside it.
    pub indent: u8,
    /// Padding of the line that opened the frame.
    pub base_padding: u32,
    pub flags: FrameFlags,
    pub statement: Statement,
}

impl Frame {
    pub fn new(kind: FrameKind, anchor: u32) -> Self {
        Self {
            kind,
            anchor,
            indent: 0,
            base_padding: 0,
            flags: FrameFlags::default(),
            statement: Statement::default(),
        }
    }
}

/// One open `#if` group and the main frames as they stood when it opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreprocessorFrame {
    pub frame: Frame,
    pub saved: Vec<Frame>,
}

/// Ordered, never-empty sequence of frames with a `TopLevel` sentinel at the
/// bottom, plus the independent stack of open preprocessor conditionals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextStack {
    frames: Vec<Frame>,
    preprocessor: Vec<PreprocessorFrame>,
}

impl Default for ContextStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStack {
    /// The state at the start of a file.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new(FrameKind::TopLevel, 0)],
            preprocessor: Vec::new(),
        }
    }

    /// Push a frame and return it for further setup.
    pub fn push(&mut self, kind: FrameKind, anchor: u32) -> &mut Frame {
        self.frames.push(Frame::new(kind, anchor));
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Pop the top frame. Popping the sentinel is a no-op returning `None`.
    pub fn pop(&mut self) -> Option<Frame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    pub fn top(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    pub fn top_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Sum of indent contributions over all frames.
    pub fn depth_units(&self) -> u32 {
        self.frames.iter().map(|f| u32::from(f.indent)).sum()
    }

    pub fn top_anchor_column(&self) -> u32 {
        self.top().anchor
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false: the sentinel is never removed.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Index of the topmost frame matching `predicate`, searching down to
    /// (but not into) the first frame for which `stop` holds.
    pub fn find_above(
        &self,
        predicate: impl Fn(&Frame) -> bool,
        stop: impl Fn(&Frame) -> bool,
    ) -> Option<usize> {
        for (index, frame) in self.frames.iter().enumerate().rev() {
            if predicate(frame) {
                return Some(index);
            }
            if stop(frame) {
                return None;
            }
        }
        None
    }

    /// Remove the frame at `index` and everything above it, returning the
    /// frame at `index`. The sentinel is never removed.
    pub fn remove_from(&mut self, index: usize) -> Option<Frame> {
        if index == 0 || index >= self.frames.len() {
            return None;
        }
        let mut removed = self.frames.drain(index..);
        removed.next()
    }

    // ── Preprocessor conditionals ────────────────────────────────────────

    /// `#if`, `#ifdef`, `#ifndef`: remember the main frames.
    pub fn enter_conditional(&mut self) {
        self.preprocessor.push(PreprocessorFrame {
            frame: Frame::new(FrameKind::PreprocessorIf, 0),
            saved: self.frames.clone(),
        });
    }

    /// `#elif`, `#else`: the next branch starts from the same frames as the
    /// first one. Without an open conditional this is a no-op.
    pub fn next_branch(&mut self) {
        if let Some(open) = self.preprocessor.last() {
            self.frames = open.saved.clone();
        }
    }

    /// `#endif`: keep the frames of the last branch. Without an open
    /// conditional this is a no-op.
    pub fn leave_conditional(&mut self) {
        self.preprocessor.pop();
    }

    pub fn conditional_depth(&self) -> usize {
        self.preprocessor.len()
    }
}
