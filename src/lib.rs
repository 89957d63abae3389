//! A multi-project incremental build orchestrator for compilers linked by
//! project references — the policy layer TypeScript's `tsc -b` implements,
//! detached from any particular compiler, parser, or filesystem.
//!
//! The crate owns: identifying projects ([`id`]), caching their parsed
//! configuration ([`config`], [`config_cache`]), building and querying their
//! reference graph ([`graph`]), deriving expected output files ([`outputs`]),
//! classifying up-to-date status ([`status`]), driving a build
//! ([`builder`]), and watch mode ([`watch`]). Everything that touches a real
//! compiler, parser, or disk is a collaborator consumed through a trait
//! ([`host`], [`compiler`], [`config::ConfigParser`]).

#[macro_use]
extern crate tracing;

pub mod builder;
pub mod compiler;
pub mod config;
pub mod config_cache;
pub mod error;
pub mod graph;
pub mod host;
pub mod id;
pub mod outputs;
#[cfg(feature = "project-util")]
pub mod project_util;
pub mod report;
pub mod status;
mod utils;
pub mod watch;

pub use builder::{BuildExitCode, BuildOptions, BuildSingleProjectResult, BuildSummary, SolutionBuilder};
pub use compiler::{CompilerHost, CompilerProgram, Diagnostic, EmittedFile, Severity};
pub use config::{CompilerOptions, ConfigParser, JsxEmit, ParsedProject, ProjectReference, ReloadLevel, WildcardDirectory};
pub use config_cache::ConfigCache;
pub use error::{BuildError, Result};
pub use graph::{build_graph, ReferenceGraph};
pub use host::{FileSystemHost, NativeFileSystemHost};
pub use id::{canonicalize, resolve_project_name, ProjectId};
pub use outputs::{expected_outputs, is_project_output_file, is_supported_source_extension, OutputFile};
pub use report::{DiagnosticReporter, StatusReporter, TracingDiagnosticReporter, TracingStatusReporter};
pub use status::{FreshTimestamps, StatusCache, UnchangedOutputsMap, UpToDateStatus};
pub use watch::{SolutionWatcher, WatchHost, DEBOUNCE};

#[cfg(feature = "watch")]
pub use watch::NativeWatchHost;
