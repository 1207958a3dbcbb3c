//! Compiler configuration assembled from the command line.
//!
//! [`CompilerConfig`] is a plain builder-style struct rather than something
//! parsed directly by `clap`: `main.rs` owns the flag grammar and translates
//! parsed flags into this type, which is what [`crate::driver`] actually
//! consumes. Keeping the two separate means the driver can be exercised by
//! tests without going through argument parsing at all.

use std::path::PathBuf;

/// How hard the backend invocation should optimize. Only `-O` is exposed on
/// the command line, which maps to [`OptimizationLevel::O1`]; the absence of
/// `-O` is [`OptimizationLevel::O0`]. There is no pass-by-pass control here —
/// the level is just forwarded to `clang` as `-O0`/`-O1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationLevel {
    #[default]
    O0,
    O1,
}

impl OptimizationLevel {
    pub fn clang_flag(self) -> &'static str {
        match self {
            OptimizationLevel::O0 => "-O0",
            OptimizationLevel::O1 => "-O1",
        }
    }
}

/// What the driver should hand off to the caller: raw IR text, an assembled
/// `.s` file, a linked `.o`, or a finished executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitKind {
    LlvmIr,
    Assembly,
    Object,
    #[default]
    Executable,
}

/// Dependency-file emission settings, mirroring `-MD -MP -MT <target> -MF
/// <file>`. `deps_target`/`deps_file` default from the output path when
/// left unset, so they're only populated here when the user passed `-MT`/
/// `-MF` explicitly.
#[derive(Debug, Clone, Default)]
pub struct DepsConfig {
    pub emit_deps: bool,
    pub phony: bool,
    pub target: Option<String>,
    pub file: Option<PathBuf>,
}

/// Settings assembled from the CLI for one driver invocation. Every input
/// file in a multi-file invocation is compiled against the same config.
#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    /// `-I`: directories searched for `@<file>` includes.
    pub include_paths: Vec<PathBuf>,

    /// `-L`: directories passed through to the linker.
    pub library_paths: Vec<PathBuf>,

    /// `-l`: libraries passed through to the linker.
    pub libraries: Vec<String>,

    pub optimization: OptimizationLevel,

    pub emit: EmitKind,

    /// `-o`. `None` means the driver derives a default from the input file
    /// name and `emit`.
    pub output_path: Option<PathBuf>,

    pub deps: DepsConfig,

    /// `--print-ast`: dump the parsed program before emitting IR.
    pub print_ast: bool,
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_include_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.include_paths.push(path.into());
        self
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_paths.push(path.into());
        self
    }

    pub fn with_library(mut self, lib: impl Into<String>) -> Self {
        self.libraries.push(lib.into());
        self
    }

    /// Whether this config allows more than one `.abc` input per
    /// invocation. Building the default executable from many inputs is
    /// always fine (`-o prog a.abc b.abc` links them together) regardless
    /// of whether `-o` was given; every other emit kind writes one output
    /// file per input, so it only works when no single `-o` path pins all
    /// of them to the same file.
    pub fn allows_multiple_inputs(&self) -> bool {
        self.output_path.is_none() || matches!(self.emit, EmitKind::Executable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimization_level_defaults_to_o0() {
        assert_eq!(OptimizationLevel::default(), OptimizationLevel::O0);
        assert_eq!(OptimizationLevel::O0.clang_flag(), "-O0");
        assert_eq!(OptimizationLevel::O1.clang_flag(), "-O1");
    }

    #[test]
    fn builder_accumulates_paths_and_libs() {
        let config = CompilerConfig::new()
            .with_include_path("/usr/include/abc")
            .with_library_path("/custom/lib")
            .with_library("m");
        assert_eq!(config.include_paths, vec![PathBuf::from("/usr/include/abc")]);
        assert_eq!(config.library_paths, vec![PathBuf::from("/custom/lib")]);
        assert_eq!(config.libraries, vec!["m".to_string()]);
    }

    #[test]
    fn single_output_flag_forbids_multiple_inputs_unless_linking_an_executable() {
        let mut config = CompilerConfig::new();
        assert!(config.allows_multiple_inputs());

        // `-S`/`--emit-llvm` with no `-o`: one output file per input, no
        // conflict.
        config.emit = EmitKind::LlvmIr;
        assert!(config.allows_multiple_inputs());

        // `-o` pins a single-file output kind to one path: multiple inputs
        // would collide.
        config.output_path = Some(PathBuf::from("out.ll"));
        assert!(!config.allows_multiple_inputs());

        config.emit = EmitKind::Object;
        assert!(!config.allows_multiple_inputs());

        // Building the default executable from many inputs with `-o` is
        // exactly the common multi-file-link invocation, and must stay
        // allowed.
        config.emit = EmitKind::Executable;
        assert!(config.allows_multiple_inputs());
    }
}
