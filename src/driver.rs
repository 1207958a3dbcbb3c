//! Multi-file compilation and output dispatch.
//!
//! [`compile_unit`] takes one input file through the whole pipeline and
//! hands the result to `clang`/`llc` for everything beyond textual IR;
//! [`compile_units`] drives a whole command-line invocation, checking the
//! single-output/multiple-input conflict up front so that no file is
//! partially compiled before the conflict is reported.

use crate::codegen::CodeGen;
use crate::config::{CompilerConfig, DepsConfig, EmitKind};
use crate::diagnostics::Diagnostics;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::reader::Reader;
use crate::strings::Interner;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;

/// Default output extension for a given [`EmitKind`], used when `-o` is
/// absent.
fn default_extension(emit: EmitKind) -> &'static str {
    match emit {
        EmitKind::LlvmIr => "ll",
        EmitKind::Assembly => "s",
        EmitKind::Object => "o",
        EmitKind::Executable => "",
    }
}

fn default_output_path(input: &Path, emit: EmitKind) -> PathBuf {
    let ext = default_extension(emit);
    if ext.is_empty() {
        input.with_extension("")
    } else {
        input.with_extension(ext)
    }
}

/// Compile every input file in one invocation, checking the single-output
/// conflict before compiling any of them.
pub fn compile_units(inputs: &[PathBuf], config: &CompilerConfig) -> Result<(), String> {
    if inputs.len() > 1 && !config.allows_multiple_inputs() {
        return Err(
            "a single-output flag (-o, -S, or --emit-llvm) cannot be combined with more than one .abc input"
                .to_string(),
        );
    }
    for input in inputs {
        compile_unit(input, config)?;
    }
    Ok(())
}

/// Run one input file through lexing, parsing, IR emission, and output
/// dispatch.
pub fn compile_unit(input: &Path, config: &CompilerConfig) -> Result<(), String> {
    let interner = Rc::new(Interner::new());
    let diags = Rc::new(Diagnostics::new());

    let mut reader = Reader::new(interner.clone(), config.include_paths.clone());
    reader
        .open_root(input)
        .map_err(|e| format!("{}: {}", input.display(), e))?;

    let lexer = Lexer::new(reader, interner.clone(), diags.clone());
    let mut parser = Parser::new(lexer, interner, diags.clone());
    let program = parser.parse_program();

    if config.print_ast {
        print_program(&program);
    }

    let source_name = input.display().to_string();
    let codegen = CodeGen::new(&parser.types, source_name);
    let ir = codegen.emit_program(&program);

    let output_path = config
        .output_path
        .clone()
        .unwrap_or_else(|| default_output_path(input, config.emit));

    if config.deps.emit_deps {
        write_deps_file(input, &output_path, &parser, &config.deps)?;
    }

    dispatch_output(&ir, input, &output_path, config)
}

/// Hand the emitted IR off per `config.emit`: write it directly for
/// `--emit-llvm`, or shell out to `clang`/`llc` for everything else.
fn dispatch_output(
    ir: &str,
    input: &Path,
    output_path: &Path,
    config: &CompilerConfig,
) -> Result<(), String> {
    if config.emit == EmitKind::LlvmIr {
        return fs::write(output_path, ir)
            .map_err(|e| format!("failed to write '{}': {}", output_path.display(), e));
    }

    let ir_path = output_path.with_extension("ll");
    fs::write(&ir_path, ir)
        .map_err(|e| format!("failed to write '{}': {}", ir_path.display(), e))?;

    let result = match config.emit {
        EmitKind::Assembly => run_llc_to_assembly(&ir_path, output_path, config),
        EmitKind::Object => run_clang(&ir_path, output_path, config, &["-c"]),
        EmitKind::Executable => run_clang(&ir_path, output_path, config, &[]),
        EmitKind::LlvmIr => unreachable!("handled above"),
    };

    fs::remove_file(&ir_path).ok();
    result.map_err(|e| format!("{}: {}", input.display(), e))
}

fn run_clang(
    ir_path: &Path,
    output_path: &Path,
    config: &CompilerConfig,
    extra_flags: &[&str],
) -> Result<(), String> {
    let mut clang = Command::new("clang");
    clang
        .arg(config.optimization.clang_flag())
        .arg(ir_path)
        .args(extra_flags)
        .arg("-o")
        .arg(output_path);
    for lib_path in &config.library_paths {
        clang.arg("-L").arg(lib_path);
    }
    for lib in &config.libraries {
        clang.arg("-l").arg(lib);
    }
    let output = clang.output().map_err(|e| format!("failed to run clang: {}", e))?;
    if !output.status.success() {
        return Err(format!(
            "clang failed:\n{}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }
    Ok(())
}

fn run_llc_to_assembly(
    ir_path: &Path,
    output_path: &Path,
    config: &CompilerConfig,
) -> Result<(), String> {
    let mut llc = Command::new("llc");
    llc.arg(config.optimization.clang_flag())
        .arg(ir_path)
        .arg("-o")
        .arg(output_path);
    let output = llc.output().map_err(|e| format!("failed to run llc: {}", e))?;
    if !output.status.success() {
        return Err(format!(
            "llc failed:\n{}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }
    Ok(())
}

/// Write a make-rule dependency file listing the root input and every file
/// actually opened through `@include`, honoring `-MT`/`-MF`/`-MP`.
fn write_deps_file(
    input: &Path,
    output_path: &Path,
    parser: &Parser,
    deps: &DepsConfig,
) -> Result<(), String> {
    let target = deps
        .target
        .clone()
        .unwrap_or_else(|| output_path.display().to_string());
    let deps_path = deps
        .file
        .clone()
        .unwrap_or_else(|| input.with_extension("d"));

    let dependencies = parser.opened_files();
    let mut out = format!("{}:", target);
    for dep in dependencies {
        out.push_str(" \\\n  ");
        out.push_str(&dep.display().to_string());
    }
    out.push('\n');
    if deps.phony {
        for dep in dependencies {
            out.push('\n');
            out.push_str(&dep.display().to_string());
            out.push_str(":\n");
        }
    }
    fs::write(&deps_path, out)
        .map_err(|e| format!("failed to write '{}': {}", deps_path.display(), e))
}

/// Dump a structural view of the parsed program to stdout for `--print-ast`.
/// Debug-pretty-printing rather than a bespoke walker keeps this debugging
/// affordance cheap to maintain as the AST grows.
fn print_program(program: &crate::ast::Program) {
    println!("{:#?}", program);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizationLevel;

    #[test]
    fn default_output_extensions_match_emit_kind() {
        let input = PathBuf::from("a.abc");
        assert_eq!(default_output_path(&input, EmitKind::LlvmIr), PathBuf::from("a.ll"));
        assert_eq!(default_output_path(&input, EmitKind::Assembly), PathBuf::from("a.s"));
        assert_eq!(default_output_path(&input, EmitKind::Object), PathBuf::from("a.o"));
        assert_eq!(default_output_path(&input, EmitKind::Executable), PathBuf::from("a"));
    }

    #[test]
    fn multiple_inputs_rejected_with_single_output_flag() {
        let mut config = CompilerConfig::new();
        config.emit = EmitKind::LlvmIr;
        let inputs = vec![PathBuf::from("a.abc"), PathBuf::from("b.abc")];
        assert!(compile_units(&inputs, &config).is_err());
    }

    #[test]
    fn optimization_flag_is_forwarded_verbatim() {
        assert_eq!(OptimizationLevel::O0.clang_flag(), "-O0");
    }
}
