//! Path/ID layer (§4.A).
//!
//! Canonicalizes configuration-file names into stable identifiers that can be
//! used as map keys everywhere else in the crate. Two [`ProjectId`]s compare
//! equal iff they refer to the same file on the host's filesystem, where case
//! sensitivity is a host property (`use_case_sensitive_file_names`).

use crate::{
    error::{BuildError, Result},
    host::FileSystemHost,
};
use std::{
    fmt,
    path::{Path, PathBuf},
};

/// An opaque, normalized absolute path to a project configuration file.
///
/// Equality and hashing are case-folded when the host is configured
/// case-insensitive, so `ProjectId`s can be used directly as `HashMap`/`HashSet`
/// keys without callers having to remember to normalize first.
#[derive(Clone, Debug)]
pub struct ProjectId {
    /// The real, display-friendly absolute path.
    path: PathBuf,
    /// The canonical key used for comparison/hashing.
    key: String,
}

impl ProjectId {
    /// Builds an identifier directly from an already-absolute, already
    /// canonical path. Prefer [`canonicalize`] unless you know the path is
    /// already in normal form (e.g. it came out of another `ProjectId`).
    fn from_absolute(path: PathBuf, case_sensitive: bool) -> Self {
        let key = if case_sensitive { path.to_string_lossy().into_owned() } else { path.to_string_lossy().to_lowercase() };
        Self { path, key }
    }

    /// The absolute path this identifier refers to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl PartialEq for ProjectId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for ProjectId {}

impl std::hash::Hash for ProjectId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state)
    }
}

impl PartialOrd for ProjectId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ProjectId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// Canonicalizes `name` (relative or absolute) against the host's current
/// working directory using the host's case-sensitivity flag.
///
/// Absent files are not an error here: a later `file_exists` check decides
/// whether a project can actually be loaded (see [`resolve_project_name`]).
pub fn canonicalize(host: &dyn FileSystemHost, name: impl AsRef<Path>) -> Result<ProjectId> {
    let name = name.as_ref();
    let absolute = if name.is_absolute() { name.to_path_buf() } else { host.current_directory().join(name) };
    let normalized = normalize_lexically(&absolute);
    Ok(ProjectId::from_absolute(normalized, host.use_case_sensitive_file_names()))
}

/// Lexically collapses `.`/`..` components without touching the filesystem
/// (a project's config file need not exist yet for it to have a stable id).
fn normalize_lexically(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(out.components().next_back(), None | Some(Component::RootDir)) {
                    out.pop();
                } else {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Resolves a user-typed project name the way the host CLI/driver would: if
/// `name` (or `name/tsconfig.json`-equivalent — see [`crate::config::DEFAULT_CONFIG_FILE_NAME`])
/// exists, returns its [`ProjectId`]; otherwise reports [`BuildError::FileNotFound`].
pub fn resolve_project_name(
    host: &dyn FileSystemHost,
    name: impl AsRef<Path>,
    default_config_file_name: &str,
) -> Result<ProjectId> {
    let name = name.as_ref();
    let absolute = if name.is_absolute() { name.to_path_buf() } else { host.current_directory().join(name) };

    if host.file_exists(&absolute) {
        return canonicalize(host, &absolute);
    }

    let as_directory = absolute.join(default_config_file_name);
    if host.file_exists(&as_directory) {
        return canonicalize(host, &as_directory);
    }

    Err(BuildError::FileNotFound(absolute))
}
