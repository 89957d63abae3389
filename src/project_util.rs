//! Utilities for assembling a multi-project workspace on a real temp
//! directory (feature `project-util`). Mirrors the teacher's own
//! `project_util::TempProject` helper — a scratch workspace backed by real
//! files so a [`SolutionBuilder`](crate::builder::SolutionBuilder) can be
//! exercised against [`NativeFileSystemHost`] instead of the in-memory test
//! double the unit tests use internally.
//!
//! Not meant for production embedding; it exists so downstream crates (and
//! this crate's own `tests/`) can build realistic fixtures without hand
//! rolling `tempfile` bookkeeping every time.

use crate::{
    config::{ConfigParseDiagnostic, ConfigParser, ParsedProject},
    id::{canonicalize, ProjectId},
};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tempfile::TempDir;

/// A [`ConfigParser`] backed by a plain map, populated as [`TempProject`]
/// registers each sub-project. Standing in for a real `tsconfig.json` parser
/// the same way `tests/solution_builder.rs`'s `FixtureParser` does.
#[derive(Default)]
pub struct MapConfigParser {
    projects: Mutex<HashMap<ProjectId, ParsedProject>>,
}

impl MapConfigParser {
    pub fn insert(&self, parsed: ParsedProject) {
        self.projects.lock().unwrap().insert(parsed.id.clone(), parsed);
    }
}

impl ConfigParser for MapConfigParser {
    fn parse(&self, id: &ProjectId) -> Result<ParsedProject, ConfigParseDiagnostic> {
        self.projects
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ConfigParseDiagnostic { message: format!("no project registered for {id}") })
    }
}

/// A scratch workspace rooted at a [`tempfile::TempDir`]. Owns the directory
/// for its lifetime — files written through it disappear when dropped.
pub struct TempProject {
    dir: TempDir,
    host: crate::host::NativeFileSystemHost,
    parser: std::sync::Arc<MapConfigParser>,
}

impl TempProject {
    /// Creates a new empty scratch workspace.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
            host: crate::host::NativeFileSystemHost::new()?,
            parser: std::sync::Arc::new(MapConfigParser::default()),
        })
    }

    /// The workspace root directory.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `contents` to `relative_path` under the workspace root,
    /// creating parent directories as needed, and returns the absolute path.
    pub fn write_file(&self, relative_path: impl AsRef<Path>, contents: impl AsRef<str>) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents.as_ref())?;
        Ok(path)
    }

    /// Registers a sub-project's config at `config_relative_path` (e.g.
    /// `"lib/tsconfig.json"`), returning its [`ProjectId`]. `build` receives
    /// the id and the absolute config path so it can finish constructing the
    /// [`ParsedProject`] (input files, references, options) before it's
    /// inserted into the backing [`MapConfigParser`].
    pub fn add_project(
        &self,
        config_relative_path: impl AsRef<Path>,
        build: impl FnOnce(&ProjectId, &Path) -> ParsedProject,
    ) -> std::io::Result<ProjectId> {
        let config_path = self.write_file(config_relative_path, "{}")?;
        let id = canonicalize(&self.host, &config_path).expect("absolute path canonicalizes infallibly");
        let parsed = build(&id, &config_path);
        self.parser.insert(parsed);
        Ok(id)
    }

    /// The real-filesystem host backing this workspace.
    pub fn host(&self) -> crate::host::NativeFileSystemHost {
        self.host.clone()
    }

    /// A [`ConfigParser`] boxed for [`SolutionBuilder`](crate::builder::SolutionBuilder)
    /// construction, sharing the registered projects with this workspace.
    pub fn parser(&self) -> Box<dyn ConfigParser> {
        Box::new(SharedParser(self.parser.clone()))
    }
}

struct SharedParser(std::sync::Arc<MapConfigParser>);

impl ConfigParser for SharedParser {
    fn parse(&self, id: &ProjectId) -> Result<ParsedProject, ConfigParseDiagnostic> {
        self.0.parse(id)
    }
}
