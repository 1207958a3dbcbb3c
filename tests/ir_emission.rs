//! End-to-end tests driving the pipeline in-process (reader → lexer →
//! parser → codegen) and inspecting the emitted LLVM IR text directly,
//! without shelling out to `clang`.

use abcc::codegen::CodeGen;
use abcc::diagnostics::Diagnostics;
use abcc::lexer::Lexer;
use abcc::parser::Parser;
use abcc::reader::Reader;
use abcc::strings::Interner;
use std::path::Path;
use std::rc::Rc;

/// Write `text` to `name` inside `dir` and compile it, returning the
/// emitted IR.
fn compile_in(dir: &Path, name: &str, text: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();

    let interner = Rc::new(Interner::new());
    let diags = Rc::new(Diagnostics::new());
    let mut reader = Reader::new(interner.clone(), vec![dir.to_path_buf()]);
    reader.open_root(&path).unwrap();
    let lexer = Lexer::new(reader, interner.clone(), diags.clone());
    let mut parser = Parser::new(lexer, interner, diags);
    let program = parser.parse_program();
    let codegen = CodeGen::new(&parser.types, name.to_string());
    codegen.emit_program(&program)
}

#[test]
fn short_circuit_and_branches_around_the_rhs_call() {
    let dir = tempfile::tempdir().unwrap();
    let ir = compile_in(
        dir.path(),
        "main.abc",
        r#"
        extern fn side(): i32;
        fn main(): i32 {
            if (0 && side()) {
                return 1;
            }
            return 0;
        }
        "#,
    );

    // The lhs is a compile-time-false literal, so the `&&`'s cond_br must
    // send control straight to the short-circuit join rather than into the
    // block that calls `side`.
    assert!(
        ir.contains("br i1 0, label %sc.rhs"),
        "expected a branch on the literal-false lhs, got:\n{ir}"
    );
    // The call to `side` still exists in the unreached rhs block — codegen
    // doesn't need to prove it dead, only avoid ever branching into it.
    assert!(ir.contains("call i32 @side()"));
}

#[test]
fn include_once_avoids_a_duplicate_global_definition() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("b.abc"), "global g: i32 = 7;\n").unwrap();
    let ir = compile_in(
        dir.path(),
        "a.abc",
        r#"
        @"b.abc"
        @"b.abc"
        fn main(): i32 { return g; }
        "#,
    );

    assert_eq!(
        ir.matches("@g = global i32 7").count(),
        1,
        "expected exactly one definition of 'g', got:\n{ir}"
    );
}

#[test]
fn forward_declared_struct_completes_and_members_resolve_by_index() {
    let dir = tempfile::tempdir().unwrap();
    let ir = compile_in(
        dir.path(),
        "main.abc",
        r#"
        struct S;
        struct S { x: i32; y: i32; };
        fn main(): i32 {
            local s: S;
            return s.x;
        }
        "#,
    );

    // Member `x` is field index 0 of `S`, so accessing it lowers to a GEP
    // with a literal 0 second index.
    assert!(
        ir.contains("getelementptr { i32, i32 }, ptr") && ir.contains("i32 0, i32 0"),
        "expected a GEP addressing field 0 of the completed struct, got:\n{ir}"
    );
}

#[test]
fn compound_initializer_zero_fills_unspecified_tail_members() {
    let dir = tempfile::tempdir().unwrap();
    let ir = compile_in(
        dir.path(),
        "main.abc",
        r#"
        struct Pair { a: i32; b: i32; };
        fn main(): i32 {
            local p: Pair = { 1 };
            return p.b;
        }
        "#,
    );
    // `b` was never given an initializer: the whole aggregate is zeroed
    // first, then field 0 alone is overwritten with the provided value.
    assert!(ir.contains("alloca { i32, i32 }"));
    assert!(ir.contains("store { i32, i32 } zeroinitializer"));
    assert!(
        ir.contains("getelementptr { i32, i32 }, ptr") && ir.contains("i32 0, i32 0"),
        "expected a GEP to field 0 to store the one provided value, got:\n{ir}"
    );
    assert!(ir.contains("store i32 1,"), "expected the provided value 1 to be stored, got:\n{ir}");
}

#[test]
fn compound_literal_as_a_call_argument_materializes_a_hidden_local() {
    let dir = tempfile::tempdir().unwrap();
    let ir = compile_in(
        dir.path(),
        "main.abc",
        r#"
        struct Pair { a: i32; b: i32; };
        extern fn take(p: Pair): i32;
        fn main(): i32 {
            return take({ 1, 2 });
        }
        "#,
    );
    assert!(
        ir.contains("%.compound0 = alloca { i32, i32 }"),
        "expected the compound literal to materialize into a hidden local, got:\n{ir}"
    );
    assert!(ir.contains("store { i32, i32 } zeroinitializer"));
    assert!(ir.contains("call i32 @take("), "expected the call to reference the materialized value, got:\n{ir}");
}

#[test]
fn failed_assert_calls_the_extern_assert_with_condition_text_file_and_line() {
    let dir = tempfile::tempdir().unwrap();
    let ir = compile_in(
        dir.path(),
        "main.abc",
        r#"
        fn main(): i32 {
            local n: i32 = 1;
            assert(n > 0);
            return 0;
        }
        "#,
    );
    assert!(
        ir.contains("declare i1 @__assert(ptr, ptr, i32)"),
        "expected a single extern declaration of __assert, got:\n{ir}"
    );
    assert!(
        ir.contains(r#"c"n > 0\00""#),
        "expected the flat-printed condition text as a string constant, got:\n{ir}"
    );
    assert!(
        ir.contains(r#"main.abc\00""#),
        "expected the source file path as a string constant, got:\n{ir}"
    );
    assert!(ir.contains("call i1 @__assert(ptr"), "expected a call to __assert, got:\n{ir}");
    assert!(ir.contains("unreachable"), "expected the trap to remain after the diagnostic call, got:\n{ir}");
}
