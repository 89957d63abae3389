//! Data model produced by the (out of scope, §1) configuration parser
//! collaborator, and the trait the config cache drives it through.

use crate::{compiler::Diagnostic, id::ProjectId};
use std::path::PathBuf;

/// Name of the default config file probed by [`crate::id::resolve_project_name`]
/// when a user-typed name turns out to be a directory.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "tsconfig.json";

/// A single project reference (§3): an explicit dependency declaration from
/// one project configuration to another.
#[derive(Clone, Debug)]
pub struct ProjectReference {
    pub id: ProjectId,
    /// Bytes of the upstream's bundled output are concatenated into ours;
    /// defeats the pseudo-up-to-date fast path (§4.D rule 3).
    pub prepend: bool,
    /// This edge is *intentionally* circular and must not trip cycle
    /// detection (§4.C).
    pub circular: bool,
}

/// A directory watched for wildcard source-file discovery (used only by the
/// watcher, §4.E "Watch file wiring").
#[derive(Clone, Debug)]
pub struct WildcardDirectory {
    pub directory: PathBuf,
    pub recursive: bool,
}

/// `jsx` preservation setting, relevant only to output-extension derivation
/// (§6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum JsxEmit {
    #[default]
    None,
    Preserve,
}

/// The compiler options this crate cares about (§3). The parser collaborator
/// may track many more; only the fields that influence output derivation,
/// emit behavior, or scheduling are modeled here.
#[derive(Clone, Debug, Default)]
pub struct CompilerOptions {
    /// `outFile`/`out`: when set, the whole project emits to one bundle
    /// instead of per-input outputs.
    pub out_file: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub declaration_dir: Option<PathBuf>,
    /// Defaults to the config file's directory when unset (§6).
    pub root_dir: Option<PathBuf>,
    pub source_map: bool,
    pub declaration_map: bool,
    pub jsx: JsxEmit,
    pub no_emit: bool,
    emit_declarations: bool,
}

impl CompilerOptions {
    pub fn with_emit_declarations(mut self, emit: bool) -> Self {
        self.emit_declarations = emit;
        self
    }

    /// Whether this project emits declaration (type-surface) outputs. A
    /// project with this set is, per the glossary, a *composite project*.
    pub fn emits_declarations(&self) -> bool {
        self.emit_declarations && !self.no_emit
    }
}

/// A value produced by the external configuration parser (§3).
#[derive(Clone, Debug)]
pub struct ParsedProject {
    pub id: ProjectId,
    /// Directory containing the config file itself; the fallback for
    /// `root_dir`/`out_dir`/`declaration_dir` when those are unset (§6).
    pub config_dir: PathBuf,
    pub input_files: Vec<PathBuf>,
    pub options: CompilerOptions,
    pub references: Vec<ProjectReference>,
    pub wildcard_directories: Vec<WildcardDirectory>,
    /// Diagnostics already produced while parsing (e.g. unknown compiler
    /// option) — merged with options and syntactic diagnostics and checked
    /// together for error severity in `buildSingleProject` step 4.
    pub config_file_parsing_diagnostics: Vec<Diagnostic>,
}

impl ParsedProject {
    pub fn root_dir(&self) -> PathBuf {
        self.options.root_dir.clone().unwrap_or_else(|| self.config_dir.clone())
    }
}

/// A fatal, unrecoverable diagnostic raised while parsing a project's config
/// file (§3 "Config cache entry").
#[derive(Clone, Debug)]
pub struct ConfigParseDiagnostic {
    pub message: String,
}

impl std::fmt::Display for ConfigParseDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// The external configuration parser collaborator (§1, §4.B).
///
/// Implementations may either return a [`ParsedProject`] or raise a single
/// unrecoverable [`ConfigParseDiagnostic`] — the two are alternatives, never
/// both, matching the "Config cache entry" alternative in §3.
pub trait ConfigParser: Send + Sync {
    fn parse(&self, id: &ProjectId) -> core::result::Result<ParsedProject, ConfigParseDiagnostic>;
}

/// How much of a project must be re-derived from disk on the next build
/// (glossary: "Reload level").
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReloadLevel {
    /// Reuse the already-parsed config.
    None,
    /// Re-expand file lists from wildcard directory specs.
    Partial,
    /// Re-parse the config file from disk.
    Full,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_level_orders_none_partial_full() {
        assert!(ReloadLevel::None < ReloadLevel::Partial);
        assert!(ReloadLevel::Partial < ReloadLevel::Full);
    }
}
