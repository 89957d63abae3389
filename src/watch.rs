//! Watch mode (§4.E): wires config files, wildcard directories, and explicit
//! input files up to a filesystem watcher, debounces the resulting events,
//! and rebuilds only the projects that actually need it.

use crate::{
    builder::{BuildSummary, SolutionBuilder},
    config::ReloadLevel,
    graph::build_graph,
    id::ProjectId,
    outputs::{is_project_output_file, is_supported_source_extension},
};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

/// The debounce window between the first observed change and a rebuild
/// (§4.E, §5).
pub const DEBOUNCE: Duration = Duration::from_millis(250);

/// The watcher collaborator (§6): start/stop watches on files and
/// directories, and report raw change events back to the driver. A real
/// implementation is [`NativeWatchHost`] (behind the `watch` feature).
pub trait WatchHost: Send + Sync {
    fn watch_file(&mut self, path: &Path);
    fn watch_directory(&mut self, dir: &Path, recursive: bool);
    fn unwatch(&mut self, path: &Path);

    /// Returns paths that changed since the last call, blocking up to
    /// `timeout` for at least one event. Returns an empty vector on timeout.
    fn poll(&mut self, timeout: Duration) -> Vec<PathBuf>;
}

#[cfg(feature = "watch")]
pub use native::NativeWatchHost;

#[cfg(feature = "watch")]
mod native {
    use super::*;
    use notify::{RecommendedWatcher, RecursiveMode, Watcher};
    use std::sync::mpsc::{channel, Receiver};

    /// A [`WatchHost`] backed by the `notify` crate's OS-native watcher.
    pub struct NativeWatchHost {
        watcher: RecommendedWatcher,
        rx: Receiver<notify::Result<notify::Event>>,
    }

    impl NativeWatchHost {
        pub fn new() -> notify::Result<Self> {
            let (tx, rx) = channel();
            let watcher = notify::recommended_watcher(move |res| {
                let _ = tx.send(res);
            })?;
            Ok(Self { watcher, rx })
        }
    }

    impl WatchHost for NativeWatchHost {
        fn watch_file(&mut self, path: &Path) {
            let _ = self.watcher.watch(path, RecursiveMode::NonRecursive);
        }

        fn watch_directory(&mut self, dir: &Path, recursive: bool) {
            let mode = if recursive { RecursiveMode::Recursive } else { RecursiveMode::NonRecursive };
            let _ = self.watcher.watch(dir, mode);
        }

        fn unwatch(&mut self, path: &Path) {
            let _ = self.watcher.unwatch(path);
        }

        fn poll(&mut self, timeout: Duration) -> Vec<PathBuf> {
            let mut paths = Vec::new();
            if let Ok(Ok(event)) = self.rx.recv_timeout(timeout) {
                paths.extend(event.paths);
                while let Ok(Ok(event)) = self.rx.try_recv() {
                    paths.extend(event.paths);
                }
            }
            paths
        }
    }
}

/// Classifies a changed path against one known project's parsed config,
/// returning the reload level it demands, or `None` if the path is
/// irrelevant to this project (§4.E "Watch file wiring").
fn classify_change(id: &ProjectId, parsed: &crate::config::ParsedProject, changed: &Path) -> Option<ReloadLevel> {
    if changed == id.path() {
        return Some(ReloadLevel::Full);
    }

    for wildcard in &parsed.wildcard_directories {
        let under = if wildcard.recursive { changed.starts_with(&wildcard.directory) } else { changed.parent() == Some(wildcard.directory.as_path()) };
        if under && is_supported_source_extension(changed) && !is_project_output_file(changed, parsed) {
            return Some(ReloadLevel::Partial);
        }
    }

    if parsed.input_files.iter().any(|f| f == changed) {
        return Some(ReloadLevel::None);
    }

    None
}

/// Drives a [`SolutionBuilder`] through repeated watch-triggered rebuilds.
pub struct SolutionWatcher<W> {
    builder: SolutionBuilder,
    watch_host: W,
    roots: Vec<ProjectId>,
    pending: HashMap<ProjectId, ReloadLevel>,
    first_pending_event: Option<Instant>,
}

impl<W: WatchHost> SolutionWatcher<W> {
    pub fn new(builder: SolutionBuilder, watch_host: W, roots: Vec<ProjectId>) -> Self {
        Self { builder, watch_host, roots, pending: HashMap::new(), first_pending_event: None }
    }

    /// Registers watches for every known project's config file, wildcard
    /// directories, and explicit inputs. Call once after the first
    /// [`SolutionBuilder::build_all`] so every referenced project has been
    /// parsed into the config cache.
    pub fn wire_watches(&mut self) {
        let ids: Vec<ProjectId> = self.builder.config_cache_mut().known_ids().cloned().collect();
        for id in ids {
            let Some(parsed) = self.builder.config_cache_mut().get(&id).cloned() else { continue };
            self.watch_host.watch_file(id.path());
            for input in &parsed.input_files {
                self.watch_host.watch_file(input);
            }
            for wildcard in &parsed.wildcard_directories {
                self.watch_host.watch_directory(&wildcard.directory, wildcard.recursive);
            }
        }
    }

    /// Records that `changed` was observed, updating the reload level of
    /// whichever known projects it's relevant to (merging via the maximum
    /// reload level seen so far for that project, per the glossary's
    /// "monotonic widening" rule).
    fn observe_change(&mut self, changed: &Path) {
        let ids: Vec<ProjectId> = self.builder.config_cache_mut().known_ids().cloned().collect();
        let mut touched = false;
        for id in ids {
            let Some(parsed) = self.builder.config_cache_mut().get(&id).cloned() else { continue };
            if let Some(level) = classify_change(&id, &parsed, changed) {
                self.pending.entry(id).and_modify(|existing| *existing = (*existing).max(level)).or_insert(level);
                touched = true;
            }
        }
        // §8 scenario 7: the debounce window slides on every new relevant
        // change, not just the first — each invalidation pushes the
        // deadline out another `DEBOUNCE` rather than leaving it anchored
        // to whichever change happened to arrive first.
        if touched {
            self.first_pending_event = Some(Instant::now());
        }
    }

    /// Applies every pending invalidation (reparsing `Full`/`Partial`
    /// projects, evicting stale status for the invalidated set and
    /// everything that transitively depends on it) and runs one more full
    /// build. Memoization means untouched projects are re-classified as an
    /// O(1) cache hit rather than re-walked from scratch (§9).
    fn flush(&mut self) -> crate::error::Result<BuildSummary> {
        let pending = std::mem::take(&mut self.pending);
        self.first_pending_event = None;

        let graph = build_graph(self.builder.config_cache_mut(), &self.roots).map(|(_, g)| g);

        for (id, level) in &pending {
            if *level >= ReloadLevel::Partial {
                self.builder.config_cache_mut().invalidate(id);
            }
            self.builder.status_cache_mut().evict(id);
            if let Some(graph) = &graph {
                for dependent in graph.transitive_parents(id) {
                    self.builder.status_cache_mut().evict(&dependent);
                }
            }
        }

        self.builder.build_all(&self.roots)
    }

    /// Runs one poll-debounce-rebuild cycle. Returns `Some(summary)` when a
    /// rebuild actually ran, `None` if the poll timed out with nothing
    /// pending. Callers loop this indefinitely for a real watch session; the
    /// split lets tests drive the state machine deterministically.
    pub fn tick(&mut self, poll_timeout: Duration) -> Option<crate::error::Result<BuildSummary>> {
        for changed in self.watch_host.poll(poll_timeout) {
            self.observe_change(&changed);
        }

        match self.first_pending_event {
            Some(first) if first.elapsed() >= DEBOUNCE => Some(self.flush()),
            _ => None,
        }
    }
}
