//! Compiler capabilities (§6): the out-of-scope collaborator (`create
//! program`, `emit`, diagnostic categories) consumed through a narrow trait
//! boundary, keeping project policy separate from pluggable compiler
//! behavior.

use crate::config::ParsedProject;
use std::path::PathBuf;

/// Diagnostic severity, detached from any particular compiler's diagnostic
/// shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

impl Severity {
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    pub const fn color(&self) -> yansi::Color {
        match self {
            Self::Error => yansi::Color::Red,
            Self::Warning => yansi::Color::Yellow,
            Self::Info => yansi::Color::White,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

/// A single compiler diagnostic, in whatever shape the embedding compiler
/// wants to report it in (file/line is embedder-specific and not modeled
/// here — it is out of scope per §1).
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, message: message.into() }
    }
}

/// A file the compiler wants written as part of emit (§4.E step 7). The
/// driver — not the compiler — decides whether this actually hits disk,
/// since that decision depends on byte-for-byte comparison against what's
/// already there (the declaration-output-stability fast path, §4.D).
#[derive(Clone, Debug)]
pub struct EmittedFile {
    pub path: PathBuf,
    pub contents: Vec<u8>,
    pub is_declaration: bool,
}

/// A created program (§6 "create a program from `{projectReferences,
/// rootNames, options, configFileParsingDiagnostics, host}`").
pub trait CompilerProgram {
    fn options_diagnostics(&self) -> Vec<Diagnostic>;
    fn syntactic_diagnostics(&self) -> Vec<Diagnostic>;
    fn semantic_diagnostics(&self) -> Vec<Diagnostic>;
    fn declaration_diagnostics(&self) -> Vec<Diagnostic>;

    /// Produces the files this compilation would write. Does not touch the
    /// filesystem itself — see [`EmittedFile`].
    fn emit(&self) -> Vec<EmittedFile>;
}

/// The compiler collaborator: creates a [`CompilerProgram`] for a parsed
/// project. Out of scope per §1 — embedders plug in a real frontend here.
pub trait CompilerHost: Send + Sync {
    fn create_program(&self, parsed: &ParsedProject) -> Box<dyn CompilerProgram>;
}
