//! Command-line interface: flat flags on one `abcc` invocation, one or more
//! `.abc` input files as positional arguments.

use abcc::config::{CompilerConfig, DepsConfig, EmitKind, OptimizationLevel};
use abcc::driver;
use clap::{CommandFactory, Parser as ClapParser};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "abcc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "abc compiler - compile .abc programs to executables", long_about = None)]
struct Cli {
    /// Input .abc source file(s). Not required when `--completions` is given.
    inputs: Vec<PathBuf>,

    /// Output path
    #[arg(short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,

    /// Emit an object file
    #[arg(short = 'c')]
    emit_object: bool,

    /// Emit assembly
    #[arg(short = 'S')]
    emit_assembly: bool,

    /// Emit textual LLVM IR (forbids linking)
    #[arg(long = "emit-llvm")]
    emit_llvm: bool,

    /// Add an include-search directory
    #[arg(short = 'I', value_name = "DIR")]
    include_dirs: Vec<PathBuf>,

    /// Add a linker library-search directory
    #[arg(short = 'L', value_name = "DIR")]
    library_dirs: Vec<PathBuf>,

    /// Link against a library
    #[arg(short = 'l', value_name = "LIB")]
    libraries: Vec<String>,

    /// Turn on optimization
    #[arg(short = 'O')]
    optimize: bool,

    /// Write a make-rule dependency file alongside the output
    #[arg(long = "MD")]
    deps_md: bool,

    /// Add a phony rule per dependency (only meaningful with -MD)
    #[arg(long = "MP")]
    deps_mp: bool,

    /// Dependency-file rule target name (defaults to the output path)
    #[arg(long = "MT", value_name = "TARGET")]
    deps_mt: Option<String>,

    /// Dependency-file path (defaults to the input with a .d extension)
    #[arg(long = "MF", value_name = "FILE")]
    deps_mf: Option<PathBuf>,

    /// Pretty-print the parsed program before emitting IR
    #[arg(long = "print-ast")]
    print_ast: bool,

    /// Print a shell completion script for the given shell and exit
    #[arg(long = "completions", value_enum)]
    completions: Option<Shell>,
}

fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "abcc", &mut io::stdout());
        return;
    }

    if cli.inputs.is_empty() {
        eprintln!("error: no input files");
        process::exit(1);
    }

    let emit = match (cli.emit_llvm, cli.emit_assembly, cli.emit_object) {
        (true, _, _) => EmitKind::LlvmIr,
        (_, true, _) => EmitKind::Assembly,
        (_, _, true) => EmitKind::Object,
        _ => EmitKind::Executable,
    };

    let mut config = CompilerConfig::new();
    config.include_paths = cli.include_dirs;
    config.library_paths = cli.library_dirs;
    config.libraries = cli.libraries;
    config.optimization = if cli.optimize {
        OptimizationLevel::O1
    } else {
        OptimizationLevel::O0
    };
    config.emit = emit;
    config.output_path = cli.output;
    config.print_ast = cli.print_ast;
    config.deps = DepsConfig {
        emit_deps: cli.deps_md,
        phony: cli.deps_mp,
        target: cli.deps_mt,
        file: cli.deps_mf,
    };

    if let Err(e) = driver::compile_units(&cli.inputs, &config) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
