//! Subprocess tests for the fatal-diagnostic paths, which call
//! `process::exit` and so can't be exercised in-process.

use std::io::Write;
use std::process::Command;

fn run(dir: &std::path::Path, name: &str, text: &str) -> std::process::Output {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(text.as_bytes()).unwrap();
    Command::new(env!("CARGO_BIN_EXE_abcc"))
        .arg("--emit-llvm")
        .arg(&path)
        .current_dir(dir)
        .output()
        .expect("failed to run abcc")
}

#[test]
fn widened_literal_returned_from_an_i32_function_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(
        dir.path(),
        "main.abc",
        "fn main(): i32 { return 2147483648; }\n",
    );
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("does not fit in i32"),
        "expected the literal-overflow warning, got:\n{stderr}"
    );
    assert!(
        !out.status.success(),
        "expected a fatal exit once the widened i64 literal hits the i32 return type, got:\n{stderr}"
    );
}

#[test]
fn duplicate_switch_case_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(
        dir.path(),
        "main.abc",
        r#"
        fn main(): i32 {
            local n: i32 = 1;
            switch (n) {
                case 1: return 1;
                case 1: return 2;
                default: return 0;
            }
        }
        "#,
    );
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("duplicate case value"), "got:\n{stderr}");
}

#[test]
fn const_discarding_initializer_is_fatal_but_an_explicit_cast_compiles() {
    let dir = tempfile::tempdir().unwrap();
    let rejected = run(
        dir.path(),
        "bad.abc",
        r#"
        fn main(): i32 {
            local x: const i32 = 1;
            local q: -> const i32 = &x;
            local p: -> i32 = q;
            return 0;
        }
        "#,
    );
    assert!(!rejected.status.success());

    let accepted = run(
        dir.path(),
        "good.abc",
        r#"
        fn main(): i32 {
            local x: const i32 = 1;
            local q: -> const i32 = &x;
            local p: -> i32 = (-> i32)q;
            return 0;
        }
        "#,
    );
    assert!(
        accepted.status.success(),
        "expected the explicit cast to compile, got:\n{}",
        String::from_utf8_lossy(&accepted.stderr)
    );
}
