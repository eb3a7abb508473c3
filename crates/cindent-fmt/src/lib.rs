//! Incremental indentation engine for C-family source text.
//!
//! Lines are processed top to bottom. Each line is tokenized on its own,
//! then the engine combines its tokens with the context stack left by the
//! line above to produce the line's indentation and the stack for the line
//! below. The stacks are cached per line so an editor can ask for any line
//! without rescanning the file.
//!
//! ```
//! use cindent_fmt::{reindent_text, StylePolicy};
//!
//! let source = "int main()\n{\nif (x)\nreturn 1;\nreturn 0;\n}\n";
//! let formatted = reindent_text(source, &StylePolicy::default());
//! assert_eq!(
//!     formatted,
//!     "int main()\n{\n    if (x)\n        return 1;\n    return 0;\n}\n"
//! );
//! ```

pub mod cache;
pub mod context;
pub mod engine;
pub mod session;
pub mod style;

pub use cache::{LineStateCache, Snapshot};
pub use context::{ContextStack, Frame, FrameKind};
pub use engine::{indent_line, LineIndent};
pub use session::{reindent_text, Document, Indenter, LineEdit, TextDocument};
pub use style::{StyleError, StylePolicy};

#[cfg(test)]
mod idempotency_tests {
    use super::{reindent_text, StylePolicy};

    fn assert_idempotent(name: &str, source: &str) {
        let policy = StylePolicy::default();
        let formatted = reindent_text(source, &policy);
        let double_formatted = reindent_text(&formatted, &policy);
        assert_eq!(
            formatted, double_formatted,
            "Idempotency failed for: {}\nFirst:  {:?}\nSecond: {:?}",
            name, formatted, double_formatted
        );
    }

    #[test]
    fn idempotent_empty_file() {
        assert_idempotent("empty file", "");
    }

    #[test]
    fn idempotent_brace_less_if() {
        assert_idempotent("brace-less if", "if (a)\n  b();\n      c();");
    }

    #[test]
    fn idempotent_misaligned_arguments() {
        assert_idempotent("arguments", "foo(a,\n b,\n            c);");
    }

    #[test]
    fn idempotent_operator_continuation() {
        assert_idempotent("continuation", "int f()\n{\n  return a +\n b;\n}");
    }

    #[test]
    fn idempotent_tabbed_switch() {
        assert_idempotent(
            "tabbed switch",
            "void f()\n{\n\tswitch (x) {\n\tcase 1:\n\t\tbreak;\n\t}\n}",
        );
    }

    #[test]
    fn idempotent_block_comment() {
        assert_idempotent("block comment", "/*\n    * a\n*/\nint x;");
    }

    #[test]
    fn idempotent_inline_member_function() {
        assert_idempotent(
            "inline member",
            "class A {\n  public:\n    void f() {\n      g();\n    }\n};",
        );
    }
}
