use cindent_common::carry::CarryState;
use cindent_fmt::{
    indent_line, reindent_text, ContextStack, Document, Indenter, StylePolicy, TextDocument,
};
use cindent_lexer::LineLexer;
use insta::assert_snapshot;

fn fmt(source: &str) -> String {
    reindent_text(source, &StylePolicy::default())
}

/// Strip all indentation from `expected`, re-indent it, and check both the
/// result and that re-indenting the expected text changes nothing.
fn assert_layout(expected: &str, policy: &StylePolicy) {
    let flat: String = expected
        .lines()
        .map(|l| l.trim_start())
        .collect::<Vec<_>>()
        .join("\n");
    assert_eq!(reindent_text(&flat, policy), expected, "from flat input");
    assert_eq!(reindent_text(expected, policy), expected, "not idempotent");
}

// ── Fixture corpus ─────────────────────────────────────────────────────

#[test]
fn test_fixture_is_stable() {
    let source = include_str!("../../../tests/fixtures/widget.cpp");
    assert_eq!(fmt(source), source);
}

#[test]
fn test_fixture_from_flat_input() {
    let source = include_str!("../../../tests/fixtures/widget.cpp");
    let flat: String = source.lines().map(|l| format!("{}\n", l.trim_start())).collect();
    assert_eq!(fmt(&flat), source);
}

#[test]
fn test_reindent_snapshot() {
    let source = "int main(int argc, char **argv)\n{\nif (argc > 1)\nrun(argv[1],\nfalse);\nreturn 0;\n}";
    assert_snapshot!(fmt(source), @r###"
    int main(int argc, char **argv)
    {
        if (argc > 1)
            run(argv[1],
                false);
        return 0;
    }
    "###);
}

/// Render the frames left after the last line of `source`.
fn frames_after(source: &str) -> String {
    let policy = StylePolicy::default();
    let mut stack = ContextStack::new();
    let mut carry = CarryState::default();
    for text in source.lines() {
        let lexed = LineLexer::tokenize(text, &carry);
        let (_, next) = indent_line(&lexed, &stack, &policy);
        stack = next;
        carry = lexed.carry_out;
    }
    stack
        .frames()
        .iter()
        .map(|f| format!("{:?} indent={} anchor={}", f.kind, f.indent, f.anchor))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_stack_inside_open_call() {
    assert_snapshot!(frames_after("void f()\n{\nif (a)\nfoo(x,"), @r###"
    TopLevel indent=0 anchor=0
    FunctionBody indent=1 anchor=0
    IfPending indent=1 anchor=4
    ParenExpr indent=0 anchor=12
    "###);
}

// ── Control flow ───────────────────────────────────────────────────────

#[test]
fn test_dangling_else_binds_to_nearest_if() {
    assert_layout(
        "void f()\n\
         {\n\
         \x20   if (a)\n\
         \x20       if (b)\n\
         \x20           x();\n\
         \x20       else\n\
         \x20           y();\n\
         \x20   else\n\
         \x20       z();\n\
         \x20   w();\n\
         }",
        &StylePolicy::default(),
    );
}

#[test]
fn test_brace_less_else_if_chain() {
    assert_layout(
        "void f()\n\
         {\n\
         \x20   if (a)\n\
         \x20       if (b)\n\
         \x20           foo;\n\
         \x20       else if (c)\n\
         \x20           foo;\n\
         \x20       else\n\
         \x20           foo;\n\
         }",
        &StylePolicy::default(),
    );
}

#[test]
fn test_else_if_chain_with_braces() {
    assert_layout(
        "int g(int a)\n\
         {\n\
         \x20   if (a == 1) {\n\
         \x20       return 1;\n\
         \x20   } else if (a == 2) {\n\
         \x20       return 2;\n\
         \x20   } else {\n\
         \x20       return 3;\n\
         \x20   }\n\
         }",
        &StylePolicy::default(),
    );
}

#[test]
fn test_brace_less_loops_nest() {
    assert_layout(
        "void h()\n\
         {\n\
         \x20   for (int i = 0; i < n; ++i)\n\
         \x20       while (x)\n\
         \x20           step();\n\
         \x20   done();\n\
         }",
        &StylePolicy::default(),
    );
}

#[test]
fn test_do_while_with_and_without_braces() {
    assert_layout(
        "void k()\n\
         {\n\
         \x20   do\n\
         \x20       x();\n\
         \x20   while (y);\n\
         \x20   do {\n\
         \x20       z();\n\
         \x20   } while (w);\n\
         \x20   end();\n\
         }",
        &StylePolicy::default(),
    );
}

#[test]
fn test_goto_label_ends_statement() {
    assert_layout(
        "void f()\n\
         {\n\
         \x20   goto done;\n\
         \x20   done:\n\
         \x20   return;\n\
         }",
        &StylePolicy::default(),
    );
}

// ── Switch ─────────────────────────────────────────────────────────────

#[test]
fn test_switch_flags_compose() {
    let policy = StylePolicy {
        indent_switch_labels: true,
        indent_statements_relative_to_switch_labels: true,
        indent_blocks_relative_to_switch_labels: false,
        ..StylePolicy::default()
    };
    assert_layout(
        "void s(int v)\n\
         {\n\
         \x20   switch (v) {\n\
         \x20       case 1:\n\
         \x20           a();\n\
         \x20           break;\n\
         \x20       case 2: {\n\
         \x20           b();\n\
         \x20           break;\n\
         \x20       }\n\
         \x20       default:\n\
         \x20           c();\n\
         \x20   }\n\
         }",
        &policy,
    );
}

#[test]
fn test_switch_single_line() {
    let policy = StylePolicy {
        indent_switch_labels: true,
        ..StylePolicy::default()
    };
    assert_layout(
        "void s(int a)\n\
         {\n\
         \x20   switch (a) { case 1: foo; case 2: { foo; } }\n\
         \x20   bar();\n\
         }",
        &policy,
    );
}

#[test]
fn test_control_flow_at_label_level() {
    let policy = StylePolicy {
        indent_control_flow_relative_to_switch_labels: false,
        ..StylePolicy::default()
    };
    assert_layout(
        "void s(int v)\n\
         {\n\
         \x20   switch (v) {\n\
         \x20   case 1:\n\
         \x20       a();\n\
         \x20   break;\n\
         \x20   }\n\
         }",
        &policy,
    );
}

// ── Classes and declarations ───────────────────────────────────────────

#[test]
fn test_class_with_access_specifiers() {
    assert_layout(
        "class Widget : public QObject\n\
         {\n\
         \x20   Q_OBJECT\n\
         public:\n\
         \x20   explicit Widget(QObject *parent = nullptr);\n\
         \x20   ~Widget() override;\n\
         \n\
         signals:\n\
         \x20   void changed();\n\
         \n\
         private:\n\
         \x20   int m_value = 0;\n\
         };",
        &StylePolicy::default(),
    );
}

#[test]
fn test_indented_access_specifiers() {
    let policy = StylePolicy {
        indent_access_specifiers: true,
        ..StylePolicy::default()
    };
    assert_layout(
        "struct S {\n\
         \x20   public:\n\
         \x20       int a;\n\
         \x20   private slots:\n\
         \x20       void b();\n\
         };",
        &policy,
    );
}

#[test]
fn test_member_initializers_align() {
    assert_layout(
        "Foo::Foo(int a, int b)\n\
         \x20   : m_a(a),\n\
         \x20     m_b(b)\n\
         {\n\
         }",
        &StylePolicy::default(),
    );
}

#[test]
fn test_member_initializers_with_narrow_indent() {
    let policy = StylePolicy {
        indent_width: 2,
        ..StylePolicy::default()
    };
    assert_layout("Foo()\n  : a(1),\n    b(2)\n{}", &policy);
}

#[test]
fn test_member_initializers_flush_with_declaration() {
    let policy = StylePolicy {
        align_member_initializers: false,
        ..StylePolicy::default()
    };
    assert_layout(
        "Foo::Foo()\n\
         \x20   : a(1),\n\
         b(2)\n\
         {\n\
         }",
        &policy,
    );
}

#[test]
fn test_leading_comma_initializers() {
    assert_layout(
        "Foo::Foo()\n\
         \x20   : m_a(1)\n\
         \x20   , m_b(2)\n\
         {\n\
         }",
        &StylePolicy::default(),
    );
}

#[test]
fn test_namespace_and_extern_bodies() {
    assert_layout(
        "namespace app {\n\
         namespace detail {\n\
         \n\
         int helper();\n\
         \n\
         }\n\
         }\n\
         \n\
         extern \"C\" {\n\
         void c_api();\n\
         }",
        &StylePolicy::default(),
    );
}

#[test]
fn test_enum_body() {
    assert_layout(
        "enum Color {\n\
         \x20   Red,\n\
         \x20   Green = 2,\n\
         \x20   Blue\n\
         };",
        &StylePolicy::default(),
    );
}

#[test]
fn test_template_arguments_across_lines() {
    assert_layout(
        "template <typename T,\n\
         \x20         typename U>\n\
         struct Pair\n\
         {\n\
         \x20   T first;\n\
         \x20   U second;\n\
         };",
        &StylePolicy::default(),
    );
}

// ── Expressions ────────────────────────────────────────────────────────

#[test]
fn test_continuations_align_with_operands() {
    assert_layout(
        "int main()\n\
         {\n\
         \x20   int total = first +\n\
         \x20               second;\n\
         \x20   QString s = QString(\"a\")\n\
         \x20               + b;\n\
         \x20   qDebug() << \"x\"\n\
         \x20            << y;\n\
         \x20   return a &&\n\
         \x20          b;\n\
         }",
        &StylePolicy::default(),
    );
}

#[test]
fn test_continuation_without_alignment() {
    let policy = StylePolicy {
        align_assignments: false,
        ..StylePolicy::default()
    };
    assert_layout(
        "void f()\n\
         {\n\
         \x20   int total = first +\n\
         \x20       second;\n\
         }",
        &policy,
    );
}

#[test]
fn test_ternary_branches_align() {
    assert_layout(
        "void f()\n\
         {\n\
         \x20   x = cond\n\
         \x20       ? a\n\
         \x20       : b;\n\
         \x20   y = c ? d\n\
         \x20         : e;\n\
         }",
        &StylePolicy::default(),
    );
}

#[test]
fn test_lambdas_indent_from_statement() {
    assert_layout(
        "void f()\n\
         {\n\
         \x20   connect(a, &A::done, this, [this]() {\n\
         \x20       finish();\n\
         \x20   });\n\
         \x20   auto g = [](int x) {\n\
         \x20       return x;\n\
         \x20   };\n\
         }",
        &StylePolicy::default(),
    );
}

#[test]
fn test_brace_init_lists() {
    assert_layout(
        "static const int table[] = {\n\
         \x20   1, 2, 3,\n\
         \x20   4, 5, 6,\n\
         };\n\
         QStringList names = { \"a\",\n\
         \x20                     \"b\" };",
        &StylePolicy::default(),
    );
}

#[test]
fn test_gnu_braces() {
    let policy = StylePolicy {
        indent_width: 2,
        indent_block_braces: true,
        ..StylePolicy::default()
    };
    assert_layout(
        "void f()\n\
         {\n\
         \x20 if (a)\n\
         \x20   {\n\
         \x20     g();\n\
         \x20   }\n\
         }",
        &policy,
    );
}

// ── Robustness ─────────────────────────────────────────────────────────

#[test]
fn test_macro_lines_do_not_continue() {
    assert_layout(
        "class A\n\
         {\n\
         \x20   Q_DECLARE_PRIVATE(A)\n\
         \x20   Q_DISABLE_COPY(A)\n\
         public:\n\
         \x20   A();\n\
         };\n\
         Q_DECLARE_METATYPE(A)\n\
         int i;\n\
         void f()\n\
         {\n\
         \x20   FOO\n\
         \x20   bar();\n\
         }",
        &StylePolicy::default(),
    );
}

#[test]
fn test_macro_line_adds_no_indentation() {
    assert_layout("Q_SOMETHING\nint i;", &StylePolicy::default());
}

#[test]
fn test_stray_closers_are_harmless() {
    assert_eq!(
        fmt("}\n)\n]\nint x;\nelse\nfoo();\nbar();"),
        "}\n)\n]\nint x;\nelse\n    foo();\nbar();"
    );
}

#[test]
fn test_objective_c_methods() {
    assert_layout(
        "@interface Foo : NSObject\n\
         - (void)bar;\n\
         @end\n\
         \n\
         @implementation Foo\n\
         - (void)bar\n\
         {\n\
         \x20   [self baz:1];\n\
         }\n\
         @end",
        &StylePolicy::default(),
    );
}

#[test]
fn test_preprocessor_branches_keep_braces_balanced() {
    assert_layout(
        "void f()\n\
         {\n\
         #ifdef Q_OS_WIN\n\
         \x20   if (win) {\n\
         #else\n\
         \x20   if (other) {\n\
         #endif\n\
         \x20       run();\n\
         \x20   }\n\
         }",
        &StylePolicy::default(),
    );
}

#[test]
fn test_raw_string_lines_are_verbatim() {
    let source = "void f()\n{\nconst char *s = R\"(\n  keep   this\n)\";\ng();\n}";
    assert_eq!(
        fmt(source),
        "void f()\n{\n    const char *s = R\"(\n  keep   this\n)\";\n    g();\n}"
    );
}

#[test]
fn test_block_comment_body() {
    assert_eq!(
        fmt("void f()\n{\n/*\n * doc\n */\ng();\n}"),
        "void f()\n{\n    /*\n     * doc\n     */\n    g();\n}"
    );
}

#[test]
fn test_code_after_comment_end_is_stable() {
    assert_layout(
        "void f()\n\
         {\n\
         \x20   /* note\n\
         \x20   */ foo(a,\n\
         \x20          b);\n\
         }",
        &StylePolicy::default(),
    );
}

#[test]
fn test_tabs_for_whole_tab_stops() {
    let policy = StylePolicy {
        use_tabs: true,
        ..StylePolicy::default()
    };
    assert_eq!(
        reindent_text("void f()\n{\nif (a)\nb();\n}", &policy),
        "void f()\n{\n    if (a)\n\tb();\n}"
    );
}

#[test]
fn test_policy_from_toml_drives_layout() {
    let policy = StylePolicy::from_toml_str("indent_width = 2\n").unwrap();
    assert_eq!(
        reindent_text("void f()\n{\nif (a)\nb();\n}", &policy),
        "void f()\n{\n  if (a)\n    b();\n}"
    );
}

// ── Line-state cache ───────────────────────────────────────────────────

fn all_indents(indenter: &mut Indenter<'_>, doc: &TextDocument) -> Vec<(u32, u32)> {
    (0..doc.line_count())
        .map(|line| {
            let indent = indenter.indent_for(doc, line);
            (indent.indent_units, indent.padding)
        })
        .collect()
}

#[test]
fn test_cached_results_match_fresh_results_after_edit() {
    let policy = StylePolicy::default();
    let mut doc = TextDocument::from_text("void f()\n{\nif (a)\nb();\nc();\n}\nint x;");
    let mut indenter = Indenter::new(&policy);
    let before = all_indents(&mut indenter, &doc);
    assert_eq!(before[3], (2, 0));
    assert_eq!(indenter.cache().len(), doc.line_count());

    doc.set_line(2, "if (a) {");
    doc.insert_line(5, "}");
    indenter.invalidate_cache(2);
    let cached = all_indents(&mut indenter, &doc);

    let mut fresh = Indenter::new(&policy);
    assert_eq!(cached, all_indents(&mut fresh, &doc));
    assert_eq!(cached[4], (2, 0));
}

#[test]
fn test_unreported_edit_of_resume_line() {
    let policy = StylePolicy::default();
    let mut doc = TextDocument::from_text("void f()\n{\nfoo(a,\nb);\n}");
    let mut indenter = Indenter::new(&policy);
    assert_eq!(indenter.indent_for(&doc, 3).padding, 4);

    doc.set_line(2, "foo(a);");
    let indent = indenter.indent_for(&doc, 3);
    assert_eq!((indent.indent_units, indent.padding), (1, 0));
}

#[test]
fn test_unreported_edit_above_resume_line() {
    let policy = StylePolicy::default();
    let mut doc = TextDocument::from_text("void f()\n{\nfoo(a,\nb,\nc);\n}");
    let mut indenter = Indenter::new(&policy);
    assert_eq!(indenter.indent_for(&doc, 4).padding, 4);

    doc.set_line(2, "foo(a);");
    let cached = indenter.indent_for(&doc, 4);
    let fresh = Indenter::new(&policy).indent_for(&doc, 4);
    assert_eq!(cached, fresh);
    assert_eq!((cached.indent_units, cached.padding), (1, 0));
}

#[test]
fn test_reported_edit_keeps_lines_above() {
    let policy = StylePolicy::default();
    let mut doc = TextDocument::from_text("void f()\n{\nfoo(a,\nb);\n}");
    let mut indenter = Indenter::new(&policy);
    indenter.indent_for(&doc, 4);

    doc.set_line(3, "b,");
    indenter.invalidate_cache(3);
    assert_eq!(indenter.cache().len(), 3);
    assert_eq!(indenter.indent_for(&doc, 3).padding, 4);
    assert_eq!(indenter.cache().len(), 4);
}

#[test]
fn test_random_access_matches_sequential_pass() {
    let policy = StylePolicy::default();
    let source = include_str!("../../../tests/fixtures/widget.cpp");
    let doc = TextDocument::from_text(source);
    let mut sequential = Indenter::new(&policy);
    let expected = all_indents(&mut sequential, &doc);

    let mut random = Indenter::new(&policy);
    for line in [40, 3, 60, 12, 12, 0, 67] {
        let indent = random.indent_for(&doc, line);
        assert_eq!((indent.indent_units, indent.padding), expected[line], "line {line}");
    }
}
