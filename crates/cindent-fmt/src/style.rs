//! Style policy: the immutable knobs that steer indentation.
//!
//! A policy is plain data loaded from TOML. Every field has a default, so a
//! style file only names what it changes:
//!
//! ```toml
//! indent_width = 2
//! indent_switch_labels = true
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::context::FrameKind;

/// Formatting policy consulted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StylePolicy {
    /// Columns per indent unit. Default: 4.
    pub indent_width: u32,
    /// Columns a tab character advances to. Default: 8.
    pub tab_width: u32,
    /// Render whole tab stops of the leading whitespace as tabs.
    pub use_tabs: bool,

    // Brace lines: indent the `{`/`}` lines themselves one unit.
    pub indent_namespace_braces: bool,
    pub indent_class_braces: bool,
    pub indent_enum_braces: bool,
    pub indent_function_braces: bool,
    pub indent_block_braces: bool,

    // Bodies: indent the lines between the braces one unit.
    pub indent_namespace_body: bool,
    pub indent_class_body: bool,
    pub indent_enum_body: bool,
    pub indent_function_body: bool,
    pub indent_block_body: bool,
    pub indent_extern_body: bool,

    /// `case`/`default` lines one unit inside the switch braces.
    pub indent_switch_labels: bool,
    /// Statements one unit past their `case` label.
    pub indent_statements_relative_to_switch_labels: bool,
    /// A `{` after a `case` label indents relative to the label.
    pub indent_blocks_relative_to_switch_labels: bool,
    /// `break`/`continue`/`return`/`goto` indent relative to the label.
    pub indent_control_flow_relative_to_switch_labels: bool,

    /// `public:` and friends one unit inside the class.
    pub indent_access_specifiers: bool,
    /// Members one unit past their access specifier.
    pub indent_declarations_relative_to_access_specifiers: bool,

    /// Continuation lines of an assignment align with its first operand.
    pub align_assignments: bool,
    /// Member initializers align with the first one.
    pub align_member_initializers: bool,
    /// A `:` starting a member initializer line gets one extra unit.
    pub indent_member_init_colon: bool,

    /// Backslash-continued preprocessor lines get one unit.
    pub indent_macro_continuation: bool,
}

impl Default for StylePolicy {
    fn default() -> Self {
        Self {
            indent_width: 4,
            tab_width: 8,
            use_tabs: false,
            indent_namespace_braces: false,
            indent_class_braces: false,
            indent_enum_braces: false,
            indent_function_braces: false,
            indent_block_braces: false,
            indent_namespace_body: false,
            indent_class_body: true,
            indent_enum_body: true,
            indent_function_body: true,
            indent_block_body: true,
            indent_extern_body: false,
            indent_switch_labels: false,
            indent_statements_relative_to_switch_labels: true,
            indent_blocks_relative_to_switch_labels: false,
            indent_control_flow_relative_to_switch_labels: true,
            indent_access_specifiers: false,
            indent_declarations_relative_to_access_specifiers: true,
            align_assignments: true,
            align_member_initializers: true,
            indent_member_init_colon: true,
            indent_macro_continuation: true,
        }
    }
}

impl StylePolicy {
    /// Parse a policy from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> Result<StylePolicy, StyleError> {
        let policy: StylePolicy = toml::from_str(content).map_err(StyleError::Parse)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Read and parse a policy file.
    pub fn from_file(path: &Path) -> Result<StylePolicy, StyleError> {
        let content = std::fs::read_to_string(path).map_err(|source| StyleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), StyleError> {
        if self.indent_width == 0 {
            return Err(StyleError::Invalid {
                field: "indent_width",
                reason: "must be at least 1",
            });
        }
        if self.tab_width == 0 {
            return Err(StyleError::Invalid {
                field: "tab_width",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Units the `{` line and the body of a brace-delimited scope add, as
    /// `(brace, body)`.
    pub fn brace_units(&self, kind: FrameKind) -> (u8, u8) {
        let (brace, body) = match kind {
            FrameKind::Namespace => (self.indent_namespace_braces, self.indent_namespace_body),
            FrameKind::Class | FrameKind::Struct => {
                (self.indent_class_braces, self.indent_class_body)
            }
            FrameKind::Enum => (self.indent_enum_braces, self.indent_enum_body),
            FrameKind::FunctionBody => (self.indent_function_braces, self.indent_function_body),
            FrameKind::Switch => (self.indent_block_braces, self.indent_switch_labels),
            FrameKind::ExternBlock => (false, self.indent_extern_body),
            _ => (self.indent_block_braces, self.indent_block_body),
        };
        (u8::from(brace), u8::from(body))
    }

    /// Leading whitespace for `units` indent units plus `padding` columns.
    pub fn render_indent(&self, units: u32, padding: u32) -> String {
        let columns = units * self.indent_width + padding;
        if !self.use_tabs {
            return " ".repeat(columns as usize);
        }
        let tabs = columns / self.tab_width;
        let spaces = columns % self.tab_width;
        let mut out = "\t".repeat(tabs as usize);
        out.push_str(&" ".repeat(spaces as usize));
        out
    }
}

/// Errors from loading a style policy.
#[derive(Debug)]
pub enum StyleError {
    /// The policy file could not be read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The policy text is not valid TOML for a policy.
    Parse(toml::de::Error),
    /// A field holds a value the engine cannot work with.
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for StyleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read style file {}: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse style policy: {err}"),
            Self::Invalid { field, reason } => write!(f, "invalid style policy: {field} {reason}"),
        }
    }
}

impl std::error::Error for StyleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let policy = StylePolicy::from_toml_str("").unwrap();
        assert_eq!(policy, StylePolicy::default());
    }

    #[test]
    fn partial_toml_overrides_named_fields() {
        let policy = StylePolicy::from_toml_str(
            "indent_width = 2\nindent_switch_labels = true\nuse_tabs = true\n",
        )
        .unwrap();
        assert_eq!(policy.indent_width, 2);
        assert!(policy.indent_switch_labels);
        assert!(policy.use_tabs);
        assert!(policy.indent_function_body);
    }

    #[test]
    fn zero_width_is_rejected() {
        let err = StylePolicy::from_toml_str("indent_width = 0").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid style policy: indent_width must be at least 1"
        );
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = StylePolicy::from_toml_str("indent_width = \"four\"").unwrap_err();
        assert!(matches!(err, StyleError::Parse(_)));
        assert!(err.to_string().starts_with("failed to parse style policy"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = StylePolicy::from_file(Path::new("/nonexistent/style.toml")).unwrap_err();
        assert!(matches!(err, StyleError::Io { .. }));
    }

    #[test]
    fn render_indent_with_spaces() {
        let policy = StylePolicy::default();
        assert_eq!(policy.render_indent(2, 3), " ".repeat(11));
        assert_eq!(policy.render_indent(0, 0), "");
    }

    #[test]
    fn render_indent_with_tabs() {
        let policy = StylePolicy {
            use_tabs: true,
            ..StylePolicy::default()
        };
        assert_eq!(policy.render_indent(2, 0), "\t");
        assert_eq!(policy.render_indent(3, 2), "\t      ");
    }

    #[test]
    fn brace_units_follow_policy() {
        let policy = StylePolicy::default();
        assert_eq!(policy.brace_units(FrameKind::Namespace), (0, 0));
        assert_eq!(policy.brace_units(FrameKind::Class), (0, 1));
        assert_eq!(policy.brace_units(FrameKind::Switch), (0, 0));
        let gnu = StylePolicy {
            indent_block_braces: true,
            ..StylePolicy::default()
        };
        assert_eq!(gnu.brace_units(FrameKind::Block), (1, 1));
    }
}
