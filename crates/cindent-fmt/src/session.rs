//! Document session: the editor-facing side of the engine.
//!
//! An [`Indenter`] answers "how should line N be indented?" for a document
//! it does not own, remembering line states between requests. Callers report
//! edits with [`Indenter::invalidate_cache`]. If the document revision moves
//! on without a report, every snapshot from an older revision is discarded.

use std::ops::Range;

use cindent_common::carry::CarryState;
use cindent_lexer::LineLexer;

use crate::cache::{line_hash, LineStateCache, Snapshot};
use crate::context::ContextStack;
use crate::engine::{indent_line, LineIndent};
use crate::style::StylePolicy;

/// Read access to a line-oriented text buffer.
pub trait Document {
    fn line_count(&self) -> usize;
    /// Text of a line without its terminator, `None` past the end.
    fn line_text(&self, line: usize) -> Option<&str>;
    /// Counter bumped on every edit.
    fn revision(&self) -> u64;
}

/// A plain in-memory document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDocument {
    lines: Vec<String>,
    revision: u64,
}

impl TextDocument {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            revision: 0,
        }
    }

    /// Replace a line. Returns `false` when the line does not exist.
    pub fn set_line(&mut self, line: usize, text: &str) -> bool {
        match self.lines.get_mut(line) {
            Some(slot) => {
                *slot = text.to_string();
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Insert a line before `line`; past the end it is appended.
    pub fn insert_line(&mut self, line: usize, text: &str) {
        let at = line.min(self.lines.len());
        self.lines.insert(at, text.to_string());
        self.revision += 1;
    }

    pub fn remove_line(&mut self, line: usize) -> Option<String> {
        if line >= self.lines.len() {
            return None;
        }
        self.revision += 1;
        Some(self.lines.remove(line))
    }

    /// The document joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

impl Document for TextDocument {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line_text(&self, line: usize) -> Option<&str> {
        self.lines.get(line).map(String::as_str)
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

/// New leading whitespace for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEdit {
    pub line: usize,
    pub indent: String,
}

impl LineEdit {
    /// `text` with its leading blanks replaced by the new indentation.
    pub fn apply_to(&self, text: &str) -> String {
        let body = text.trim_start_matches([' ', '\t']);
        if body.is_empty() {
            return String::new();
        }
        format!("{}{body}", self.indent)
    }
}

/// Per-document indentation service: one cache, one borrowed policy.
#[derive(Debug)]
pub struct Indenter<'p> {
    policy: &'p StylePolicy,
    cache: LineStateCache,
    /// Document revision of the last request, `None` after a reported edit.
    revision: Option<u64>,
}

impl<'p> Indenter<'p> {
    pub fn new(policy: &'p StylePolicy) -> Self {
        Self {
            policy,
            cache: LineStateCache::new(),
            revision: None,
        }
    }

    pub fn policy(&self) -> &StylePolicy {
        self.policy
    }

    pub fn cache(&self) -> &LineStateCache {
        &self.cache
    }

    /// Forget every line state at or after `line`. Call after an edit
    /// touching `line`.
    pub fn invalidate_cache(&mut self, line: usize) {
        self.cache.invalidate_from(line);
        self.revision = None;
    }

    /// Indentation for `line`, computed from the nearest valid cached state
    /// above it.
    pub fn indent_for<D: Document + ?Sized>(&mut self, doc: &D, line: usize) -> LineIndent {
        self.sync_revision(doc.revision());
        let (start, mut stack, mut carry) = self.resume_point(doc, line);
        if line > start {
            tracing::trace!(from = start, to = line, "recomputing line states");
        }
        for n in start..line {
            let (_, next_stack, next_carry) = self.step(doc, n, &stack, &carry);
            stack = next_stack;
            carry = next_carry;
        }
        let (indent, _, _) = self.step(doc, line, &stack, &carry);
        indent
    }

    /// Leading whitespace edits for every line in `range` whose indentation
    /// differs from the computed one. Verbatim lines are left alone and
    /// blank lines are emptied.
    pub fn reindent_lines<D: Document + ?Sized>(
        &mut self,
        doc: &D,
        range: Range<usize>,
    ) -> Vec<LineEdit> {
        let end = range.end.min(doc.line_count());
        let mut edits = Vec::new();
        for line in range.start..end {
            let indent = self.indent_for(doc, line);
            if indent.verbatim {
                continue;
            }
            let text = doc.line_text(line).unwrap_or("");
            let body = text.trim_start_matches([' ', '\t']);
            let current = &text[..text.len() - body.len()];
            let wanted = if body.is_empty() {
                String::new()
            } else {
                self.policy.render_indent(indent.indent_units, indent.padding)
            };
            if current != wanted {
                edits.push(LineEdit {
                    line,
                    indent: wanted,
                });
            }
        }
        edits
    }

    /// Drop snapshots older than `revision` when the document changed
    /// without a call to [`Indenter::invalidate_cache`].
    fn sync_revision(&mut self, revision: u64) {
        if self.revision.is_some_and(|seen| seen != revision) {
            let dropped = self.cache.retain_revision(revision);
            tracing::debug!(revision, dropped, "unreported edit; dropped older line states");
        }
        self.revision = Some(revision);
    }

    /// First line to recompute and the state to recompute it from.
    fn resume_point<D: Document + ?Sized>(
        &mut self,
        doc: &D,
        line: usize,
    ) -> (usize, ContextStack, CarryState) {
        loop {
            let Some((at, hash)) = self
                .cache
                .nearest_before(line)
                .map(|(at, snapshot)| (at, snapshot.text_hash))
            else {
                return (0, ContextStack::new(), CarryState::default());
            };
            if doc.line_text(at).map(line_hash) == Some(hash) {
                if let Some(snapshot) = self.cache.get(at) {
                    tracing::trace!(line, resume = at, "resuming from cached line state");
                    return (at + 1, snapshot.stack.clone(), snapshot.carry.clone());
                }
            }
            tracing::trace!(line = at, "cached line state is stale");
            self.cache.invalidate_from(at);
        }
    }

    fn step<D: Document + ?Sized>(
        &mut self,
        doc: &D,
        line: usize,
        stack: &ContextStack,
        carry: &CarryState,
    ) -> (LineIndent, ContextStack, CarryState) {
        let text = doc.line_text(line).unwrap_or("");
        let lexed = LineLexer::tokenize(text, carry);
        let (indent, next) = indent_line(&lexed, stack, self.policy);
        self.cache.put(
            line,
            Snapshot {
                stack: next.clone(),
                carry: lexed.carry_out.clone(),
                revision: doc.revision(),
                text_hash: line_hash(text),
            },
        );
        (indent, next, lexed.carry_out)
    }
}

/// Re-indent a whole buffer. A trailing newline is kept.
pub fn reindent_text(source: &str, policy: &StylePolicy) -> String {
    let doc = TextDocument::from_text(source);
    let mut indenter = Indenter::new(policy);
    let edits = indenter.reindent_lines(&doc, 0..doc.line_count());

    let mut lines: Vec<String> = (0..doc.line_count())
        .map(|n| doc.line_text(n).unwrap_or("").to_string())
        .collect();
    for edit in edits {
        if let Some(text) = lines.get_mut(edit.line) {
            *text = edit.apply_to(text);
        }
    }
    let mut out = lines.join("\n");
    if source.ends_with('\n') {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_edits_bump_revision() {
        let mut doc = TextDocument::from_text("a\nb\nc");
        assert_eq!(doc.line_count(), 3);
        assert!(doc.set_line(1, "B"));
        assert!(!doc.set_line(9, "x"));
        doc.insert_line(0, "top");
        assert_eq!(doc.remove_line(3).as_deref(), Some("c"));
        assert!(doc.remove_line(3).is_none());
        assert_eq!(doc.revision(), 3);
        assert_eq!(doc.text(), "top\na\nB");
    }

    #[test]
    fn line_edit_replaces_leading_blanks() {
        let edit = LineEdit {
            line: 0,
            indent: "    ".to_string(),
        };
        assert_eq!(edit.apply_to("\t  foo();"), "    foo();");
        assert_eq!(edit.apply_to("  \t"), "");
    }

    #[test]
    fn indent_for_fills_cache_up_to_line() {
        let policy = StylePolicy::default();
        let doc = TextDocument::from_text("void f()\n{\nfoo();\n}");
        let mut indenter = Indenter::new(&policy);
        let indent = indenter.indent_for(&doc, 2);
        assert_eq!(indent.indent_units, 1);
        assert_eq!(indenter.cache().len(), 3);
    }

    #[test]
    fn reindent_lines_reports_only_changes() {
        let policy = StylePolicy::default();
        let doc = TextDocument::from_text("void f()\n{\n    a();\nb();\n}");
        let mut indenter = Indenter::new(&policy);
        let edits = indenter.reindent_lines(&doc, 0..10);
        assert_eq!(
            edits,
            vec![LineEdit {
                line: 3,
                indent: "    ".to_string()
            }]
        );
    }

    #[test]
    fn reindent_text_keeps_trailing_newline() {
        let policy = StylePolicy::default();
        assert_eq!(
            reindent_text("if (a)\nb();\n\n", &policy),
            "if (a)\n    b();\n\n"
        );
    }
}
