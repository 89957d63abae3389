//! Host capability set (§6): filesystem primitives the core is driven through.
//!
//! Everything that touches a real disk or a real compiler process is a
//! collaborator injected through a trait: project graph and status
//! classification (this crate's job) stay separate from compiler and
//! filesystem behavior (the embedder's job).

use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Filesystem primitives consumed by the config cache, classifier, and build
/// driver. A default [`NativeFileSystemHost`] backs this with `std::fs`.
pub trait FileSystemHost: Send + Sync {
    fn file_exists(&self, path: &Path) -> bool;

    /// Returns the file's modification time, or `None` if it doesn't exist or
    /// the host can't report one. Callers substitute
    /// [`crate::utils::MISSING_FILE_MODIFIED_TIME`] for `None`.
    fn modified_time(&self, path: &Path) -> Option<SystemTime>;

    /// Sets the file's modification (and access) time to `time`. Used by the
    /// timestamp-only fast-rebuild path (§4.E).
    fn set_modified_time(&self, path: &Path, time: SystemTime) -> std::io::Result<()>;

    fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>>;

    fn write_file(&self, path: &Path, contents: &[u8]) -> std::io::Result<()>;

    fn delete_file(&self, path: &Path) -> std::io::Result<()>;

    /// Recursively lists the files under `dir` (used to re-expand wildcard
    /// directory specs on a `Partial` reload, and to enumerate a directory
    /// tree when cleaning).
    fn read_directory(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>>;

    fn use_case_sensitive_file_names(&self) -> bool;

    fn current_directory(&self) -> PathBuf;
}

/// The real filesystem, case-sensitivity probed once at construction.
#[derive(Debug, Clone)]
pub struct NativeFileSystemHost {
    case_sensitive: bool,
    cwd: PathBuf,
}

impl NativeFileSystemHost {
    pub fn new() -> std::io::Result<Self> {
        // `dunce` strips the `\\?\` UNC prefix `std::fs::canonicalize` adds on
        // Windows, so `ProjectId` paths stay comparable to whatever a user
        // typed at the command line.
        let cwd = dunce::canonicalize(std::env::current_dir()?)?;
        Ok(Self { case_sensitive: probe_case_sensitivity(), cwd })
    }
}

/// Creates a temp file, then asks whether its upper-cased name also resolves
/// to it. Mirrors the technique TypeScript's host uses (write then stat the
/// differently-cased path) without depending on platform `#[cfg]` guesses,
/// since case sensitivity is a filesystem property, not just an OS one.
fn probe_case_sensitivity() -> bool {
    let dir = std::env::temp_dir();
    let probe = dir.join(".buildref-case-sensitivity-probe");
    if std::fs::write(&probe, b"").is_err() {
        return !cfg!(target_os = "windows") && !cfg!(target_os = "macos");
    }
    let upper = dir.join(".BUILDREF-CASE-SENSITIVITY-PROBE");
    let sensitive = !upper.exists();
    let _ = std::fs::remove_file(&probe);
    sensitive
}

impl FileSystemHost for NativeFileSystemHost {
    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn modified_time(&self, path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).ok()?.modified().ok()
    }

    fn set_modified_time(&self, path: &Path, time: SystemTime) -> std::io::Result<()> {
        let time = filetime::FileTime::from_system_time(time);
        filetime::set_file_mtime(path, time)
    }

    fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
    }

    fn delete_file(&self, path: &Path) -> std::io::Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn read_directory(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() {
                out.push(entry.path().to_path_buf());
            }
        }
        Ok(out)
    }

    fn use_case_sensitive_file_names(&self) -> bool {
        self.case_sensitive
    }

    fn current_directory(&self) -> PathBuf {
        self.cwd.clone()
    }
}

/// In-memory [`FileSystemHost`] used by unit tests throughout the crate, and
/// by the end-to-end scenario tests under `tests/`. Not exported publicly —
/// embedders are expected to either use [`NativeFileSystemHost`] or write
/// their own against real infrastructure (e.g. a remote build cache).
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
        time::Duration,
    };

    #[derive(Debug, Clone)]
    struct Entry {
        contents: Vec<u8>,
        modified: SystemTime,
    }

    #[derive(Clone)]
    pub struct InMemoryHost {
        inner: Arc<Mutex<HashMap<PathBuf, Entry>>>,
        case_sensitive: bool,
        cwd: PathBuf,
        clock: Arc<Mutex<SystemTime>>,
    }

    impl InMemoryHost {
        pub fn new(case_sensitive: bool) -> Self {
            Self {
                inner: Arc::new(Mutex::new(HashMap::new())),
                case_sensitive,
                cwd: PathBuf::from("/work"),
                clock: Arc::new(Mutex::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000))),
            }
        }

        pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
            self.cwd = cwd.into();
            self
        }

        pub fn with_file(self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Self {
            self.write_file(path.as_ref(), contents.as_ref()).unwrap();
            self
        }

        fn key(&self, path: &Path) -> PathBuf {
            if self.case_sensitive {
                path.to_path_buf()
            } else {
                PathBuf::from(path.to_string_lossy().to_lowercase())
            }
        }

        /// Advances the simulated clock and returns the new "now", so tests can
        /// produce strictly increasing modification times without real sleeps.
        pub fn tick(&self) -> SystemTime {
            let mut clock = self.clock.lock().unwrap();
            *clock += Duration::from_secs(1);
            *clock
        }

        pub fn now(&self) -> SystemTime {
            *self.clock.lock().unwrap()
        }

        pub fn touch(&self, path: impl AsRef<Path>) {
            let now = self.tick();
            let mut map = self.inner.lock().unwrap();
            let key = self.key(path.as_ref());
            map.entry(key)
                .and_modify(|e| e.modified = now)
                .or_insert(Entry { contents: Vec::new(), modified: now });
        }

        pub fn write_at(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>, time: SystemTime) {
            let key = self.key(path.as_ref());
            self.inner
                .lock()
                .unwrap()
                .insert(key, Entry { contents: contents.as_ref().to_vec(), modified: time });
        }
    }

    impl FileSystemHost for InMemoryHost {
        fn file_exists(&self, path: &Path) -> bool {
            self.inner.lock().unwrap().contains_key(&self.key(path))
        }

        fn modified_time(&self, path: &Path) -> Option<SystemTime> {
            self.inner.lock().unwrap().get(&self.key(path)).map(|e| e.modified)
        }

        fn set_modified_time(&self, path: &Path, time: SystemTime) -> std::io::Result<()> {
            let mut map = self.inner.lock().unwrap();
            let key = self.key(path);
            match map.get_mut(&key) {
                Some(e) => {
                    e.modified = time;
                    Ok(())
                }
                None => Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no such file")),
            }
        }

        fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>> {
            self.inner
                .lock()
                .unwrap()
                .get(&self.key(path))
                .map(|e| e.contents.clone())
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"))
        }

        fn write_file(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
            let now = self.tick();
            let key = self.key(path);
            self.inner.lock().unwrap().insert(key, Entry { contents: contents.to_vec(), modified: now });
            Ok(())
        }

        fn delete_file(&self, path: &Path) -> std::io::Result<()> {
            self.inner.lock().unwrap().remove(&self.key(path));
            Ok(())
        }

        fn read_directory(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
            let map = self.inner.lock().unwrap();
            Ok(map.keys().filter(|p| p.starts_with(dir)).cloned().collect())
        }

        fn use_case_sensitive_file_names(&self) -> bool {
            self.case_sensitive
        }

        fn current_directory(&self) -> PathBuf {
            self.cwd.clone()
        }
    }
}
