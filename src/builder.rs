//! The build driver (§4.E, §6): walks a leaves-first queue, classifies each
//! project, and either skips it, touches its output timestamps (the
//! pseudo-up-to-date fast path), or runs a full compile-and-emit.

use crate::{
    compiler::CompilerHost,
    config::ConfigParser,
    config_cache::ConfigCache,
    error::{BuildError, Result},
    graph::build_graph,
    host::FileSystemHost,
    id::ProjectId,
    outputs::expected_outputs,
    report::{DiagnosticReporter, StatusReporter},
    status::{FreshTimestamps, StatusCache, UnchangedOutputsMap, UpToDateStatus},
};
use bitflags::bitflags;
use std::collections::HashMap;

/// Driver knobs (§6 "Build options"). Mirrors `tsc -b`'s own flag set.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildOptions {
    /// Report what would be built without touching the filesystem.
    pub dry: bool,
    /// Rebuild every project regardless of its up-to-date status.
    pub force: bool,
    /// Log every status decision, not just the ones that lead to a build.
    pub verbose: bool,
    /// Delete expected outputs instead of building.
    pub clean: bool,
    /// Stay resident and rebuild on file changes (driven externally; see
    /// [`crate::watch`]).
    pub watch: bool,
    /// In watch mode, don't clear the terminal between rebuilds.
    pub preserve_watch_output: bool,
}

bitflags! {
    /// Outcome of building one project (§6 "buildSingleProject" result
    /// bitmask). Several flags can be set at once — e.g. a project can have
    /// both `TYPE_ERRORS` and still have emitted (`SUCCESS`) when the
    /// embedding compiler doesn't treat type errors as emit-blocking.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct BuildSingleProjectResult: u32 {
        const SUCCESS                    = 1 << 0;
        const DECLARATION_OUTPUT_UNCHANGED = 1 << 1;
        const CONFIG_FILE_ERRORS         = 1 << 2;
        const SYNTAX_ERRORS              = 1 << 3;
        const TYPE_ERRORS                = 1 << 4;
        const DECLARATION_EMIT_ERRORS    = 1 << 5;
    }
}

impl std::fmt::Display for BuildSingleProjectResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("(no outputs)");
        }
        let names = [
            (Self::SUCCESS, "success"),
            (Self::DECLARATION_OUTPUT_UNCHANGED, "declaration-output-unchanged"),
            (Self::CONFIG_FILE_ERRORS, "config-file-errors"),
            (Self::SYNTAX_ERRORS, "syntax-errors"),
            (Self::TYPE_ERRORS, "type-errors"),
            (Self::DECLARATION_EMIT_ERRORS, "declaration-emit-errors"),
        ];
        let set: Vec<&str> = names.iter().filter(|(flag, _)| self.contains(*flag)).map(|(_, name)| *name).collect();
        f.write_str(&set.join("+"))
    }
}

/// The process-exit-code-shaped summary of a whole `build_all` run (§6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildExitCode {
    Success,
    DiagnosticsPresentOutputsSkipped,
}

/// Result of a full `build_all`/`clean_all` run.
#[derive(Clone, Debug)]
pub struct BuildSummary {
    pub results: HashMap<ProjectId, BuildSingleProjectResult>,
    pub exit_code: BuildExitCode,
}

/// Orchestrates a full solution build. Owns every collaborator (§6):
/// filesystem, compiler, config parser (via [`ConfigCache`]), and the two
/// reporters.
pub struct SolutionBuilder {
    host: Box<dyn FileSystemHost>,
    compiler: Box<dyn CompilerHost>,
    diagnostics: Box<dyn DiagnosticReporter>,
    status_reporter: Box<dyn StatusReporter>,
    config_cache: ConfigCache,
    status_cache: StatusCache,
    unchanged_outputs: UnchangedOutputsMap,
    options: BuildOptions,
}

impl SolutionBuilder {
    pub fn new(
        host: Box<dyn FileSystemHost>,
        compiler: Box<dyn CompilerHost>,
        parser: Box<dyn ConfigParser>,
        diagnostics: Box<dyn DiagnosticReporter>,
        status_reporter: Box<dyn StatusReporter>,
        options: BuildOptions,
    ) -> Self {
        Self {
            host,
            compiler,
            diagnostics,
            status_reporter,
            config_cache: ConfigCache::new(parser),
            status_cache: StatusCache::new(),
            unchanged_outputs: UnchangedOutputsMap::new(),
            options,
        }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn host(&self) -> &dyn FileSystemHost {
        self.host.as_ref()
    }

    pub fn config_cache_mut(&mut self) -> &mut ConfigCache {
        &mut self.config_cache
    }

    pub fn status_cache_mut(&mut self) -> &mut StatusCache {
        &mut self.status_cache
    }

    /// Builds every project reachable from `roots`, leaves first (§4.E).
    #[instrument(level = "debug", skip(self, roots))]
    pub fn build_all(&mut self, roots: &[ProjectId]) -> Result<BuildSummary> {
        let Some((queue, _graph)) = build_graph(&mut self.config_cache, roots) else {
            return Err(BuildError::GraphConstruction);
        };

        let mut results = HashMap::new();
        for id in &queue {
            let result = self.build_single_project(id);
            results.insert(id.clone(), result);
        }

        let exit_code = if results.values().all(|r| r.contains(BuildSingleProjectResult::SUCCESS)) {
            BuildExitCode::Success
        } else {
            BuildExitCode::DiagnosticsPresentOutputsSkipped
        };

        Ok(BuildSummary { results, exit_code })
    }

    /// Deletes every expected output of every project reachable from `roots`
    /// (§4.E `clean`). Relies on output-file-enumeration purity (§9): no
    /// directory scanning, just the derived expected-output paths.
    pub fn clean_all(&mut self, roots: &[ProjectId]) -> Result<()> {
        let Some((queue, _graph)) = build_graph(&mut self.config_cache, roots) else {
            return Err(BuildError::GraphConstruction);
        };

        for id in &queue {
            let Some(parsed) = self.config_cache.get(id).cloned() else { continue };
            self.status_reporter.cleaning(id);
            if self.options.dry {
                continue;
            }
            for output in expected_outputs(&parsed) {
                self.host.delete_file(&output.path).map_err(|e| BuildError::io(e, output.path.clone()))?;
            }
            self.status_cache.evict(id);
        }

        Ok(())
    }

    /// Builds exactly one project, applying the up-to-date decision from
    /// §4.D. Public so [`crate::watch`] can re-run a single invalidated
    /// project without re-walking the whole queue.
    #[instrument(level = "debug", skip(self))]
    pub fn build_single_project(&mut self, id: &ProjectId) -> BuildSingleProjectResult {
        let status = self.status_cache.classify(self.host.as_ref(), &mut self.config_cache, &self.unchanged_outputs, id);

        match &status {
            UpToDateStatus::Unbuildable { reason } => {
                self.diagnostics.report(id, &crate::compiler::Diagnostic::error(reason.clone()));
                return BuildSingleProjectResult::CONFIG_FILE_ERRORS;
            }
            UpToDateStatus::UpstreamBlocked { .. } => {
                // The upstream project itself failed; skip silently (§4.E —
                // verbose logging only, not modeled as a reporter call here).
                return BuildSingleProjectResult::empty();
            }
            UpToDateStatus::ContainerOnly => {
                return BuildSingleProjectResult::SUCCESS;
            }
            _ if status.is_up_to_date() && !self.options.force => {
                self.status_reporter.up_to_date(id, &status);
                return BuildSingleProjectResult::SUCCESS;
            }
            _ => {}
        }

        if matches!(status, UpToDateStatus::UpToDateWithUpstreamTypes(_)) {
            // Pseudo-up-to-date fast path (§4.D): this project's own source
            // didn't change and upstream's declaration surface didn't
            // change either, just upstream's output bytes. No recompile —
            // only refresh our own output timestamps so a later run doesn't
            // see us as stale against upstream's newer `newest_input_time`.
            self.status_reporter.up_to_date(id, &status);
            if !self.options.dry {
                if let Some(parsed) = self.config_cache.get(id).cloned() {
                    let now = std::time::SystemTime::now();
                    for output in expected_outputs(&parsed) {
                        let _ = self.host.set_modified_time(&output.path, now);
                    }
                }
                self.status_cache.evict(id);
            }
            return BuildSingleProjectResult::SUCCESS;
        }

        self.status_reporter.out_of_date(id, &status);
        self.status_reporter.building(id);

        if self.options.dry {
            return BuildSingleProjectResult::SUCCESS;
        }

        // Step 2: parse. `status` already ruled out `Unbuildable`, so this
        // should always hit, but the classifier and the cache are two
        // separate lookups and we don't re-derive through a stale reference.
        let Some(parsed) = self.config_cache.get(id).cloned() else {
            return BuildSingleProjectResult::CONFIG_FILE_ERRORS;
        };

        // Step 3: a project with no inputs at all is solution-only — it
        // would already have classified as `ContainerOnly` above, but stay
        // defensive since that classification is a separate code path.
        if parsed.input_files.is_empty() {
            return BuildSingleProjectResult::empty();
        }

        // Steps 4-6: each stage's diagnostics are reported in full; any
        // error at any stage marks the project `Unbuildable` and skips emit
        // entirely (§7 "project set Unbuildable; build continues to next
        // project" — the failure is per-project, not fatal to the run).
        //
        // Step 4: config-parsing, options, and syntactic diagnostics are
        // merged into one group — every one of them is reported, and the
        // project is `Unbuildable` with `SYNTAX_ERRORS` if any is
        // error-severity, regardless of which of the three produced it.
        let program = self.compiler.create_program(&parsed);

        let mut step4_diagnostics = parsed.config_file_parsing_diagnostics.clone();
        step4_diagnostics.extend(program.options_diagnostics());
        step4_diagnostics.extend(program.syntactic_diagnostics());

        for d in &step4_diagnostics {
            self.diagnostics.report(id, d);
        }
        if step4_diagnostics.iter().any(|d| d.severity.is_error()) {
            self.status_cache.set(id.clone(), UpToDateStatus::Unbuildable { reason: "syntax errors".into() });
            return BuildSingleProjectResult::SYNTAX_ERRORS;
        }

        if parsed.options.emits_declarations() {
            let declaration_diagnostics = program.declaration_diagnostics();
            for d in &declaration_diagnostics {
                self.diagnostics.report(id, d);
            }
            if declaration_diagnostics.iter().any(|d| d.severity.is_error()) {
                self.status_cache.set(id.clone(), UpToDateStatus::Unbuildable { reason: "declaration emit errors".into() });
                return BuildSingleProjectResult::DECLARATION_EMIT_ERRORS;
            }
        }

        let semantic = program.semantic_diagnostics();
        for d in &semantic {
            self.diagnostics.report(id, d);
        }
        if semantic.iter().any(|d| d.severity.is_error()) {
            self.status_cache.set(id.clone(), UpToDateStatus::Unbuildable { reason: "type errors".into() });
            return BuildSingleProjectResult::TYPE_ERRORS;
        }

        // Step 7: emit.
        let mut flags = BuildSingleProjectResult::empty();
        let emitted = program.emit();
        let mut declarations_all_unchanged = true;
        let mut saw_declaration = false;

        for file in &emitted {
            let existing = self.host.read_file(&file.path).ok();
            let unchanged = existing.as_deref() == Some(file.contents.as_slice());

            if file.is_declaration {
                saw_declaration = true;
                if unchanged {
                    // Record the file's pre-write modification time, not
                    // wall-clock now: the write below always touches the
                    // real mtime, so this is the only place the old,
                    // content-stable timestamp survives for downstream
                    // pseudo-up-to-date comparisons (§4.D, §4.E step 7).
                    if let Some(old_mtime) = self.host.modified_time(&file.path) {
                        self.unchanged_outputs.insert(file.path.clone(), old_mtime);
                    }
                } else {
                    declarations_all_unchanged = false;
                    self.unchanged_outputs.remove(&file.path);
                }
            }

            // "Either way, write the file" (§4.E step 7) — even when bytes
            // are unchanged, the file is rewritten so its own mtime reflects
            // this build; only the unchanged-outputs map above preserves the
            // older, content-stable time for declaration outputs.
            if let Err(e) = self.host.write_file(&file.path, &file.contents) {
                self.diagnostics.report(id, &crate::compiler::Diagnostic::error(format!("{}: {e}", file.path.display())));
                flags |= BuildSingleProjectResult::DECLARATION_EMIT_ERRORS;
            }
        }

        if saw_declaration && declarations_all_unchanged {
            flags |= BuildSingleProjectResult::DECLARATION_OUTPUT_UNCHANGED;
        }

        // Step 8: memoize the fresh status instead of just evicting, so a
        // changed declaration's content-change time is pinned to
        // `MAXIMUM_DATE` rather than trusted at face value — otherwise a
        // downstream project built in the same timestamp-resolution window
        // could read our just-written mtime as no newer than its own oldest
        // output and wrongly classify itself pseudo-up-to-date.
        self.status_cache.evict(id);
        let fresh = self.status_cache.classify(self.host.as_ref(), &mut self.config_cache, &self.unchanged_outputs, id);
        let fresh = if saw_declaration && !declarations_all_unchanged {
            match fresh {
                UpToDateStatus::UpToDate(ts) => {
                    UpToDateStatus::UpToDate(FreshTimestamps { newest_declaration_content_change_time: *crate::utils::MAXIMUM_DATE, ..ts })
                }
                other => other,
            }
        } else {
            fresh
        };
        self.status_cache.set(id.clone(), fresh);

        // Reaching here means every diagnostic stage passed cleanly; the
        // only way to still fail is an I/O error while writing an output.
        if !flags.contains(BuildSingleProjectResult::DECLARATION_EMIT_ERRORS) {
            flags |= BuildSingleProjectResult::SUCCESS;
        }

        flags
    }
}
