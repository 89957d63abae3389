//! Output-file name derivation (§6) and enumeration (§4.D, §9).
//!
//! Every function here is a pure function of a [`ParsedProject`] — no
//! filesystem reads — per the "Output-file enumeration purity" design note
//! (§9): both the classifier and the cleaner rely on that purity.

use crate::config::{JsxEmit, ParsedProject};
use once_cell::sync::Lazy;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

/// One file this project is expected to produce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub is_declaration: bool,
}

fn is_declaration_input(path: &Path) -> bool {
    path.to_str().map(|s| s.ends_with(".d.ts")).unwrap_or(false)
}

/// Pure-data inputs (e.g. `.json`) never produce declaration outputs.
fn is_pure_data_input(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

fn with_extension_js(path: &Path, jsx: JsxEmit) -> PathBuf {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "json" => path.to_path_buf(),
        "tsx" if jsx == JsxEmit::Preserve => path.with_extension("jsx"),
        _ => path.with_extension("js"),
    }
}

fn with_extension_dts(path: &Path) -> PathBuf {
    // Replace any trailing extension with `.d.ts`, including double
    // extensions like `.tsx` -> `.d.ts` (not `.d.tsx`).
    let stem = path.file_stem().unwrap_or_default();
    path.with_file_name(stem).with_extension("d.ts")
}

/// Rebase `input` (somewhere under `root`) onto `base`, preserving its
/// relative path, per §6's `base/rel` rule.
fn rebase(input: &Path, root: &Path, base: &Path) -> PathBuf {
    match input.strip_prefix(root) {
        Ok(rel) => base.join(rel),
        Err(_) => base.join(input.file_name().unwrap_or_default()),
    }
}

fn declaration_output(input: &Path, parsed: &ParsedProject) -> PathBuf {
    let root = parsed.root_dir();
    let base = parsed
        .options
        .declaration_dir
        .clone()
        .or_else(|| parsed.options.out_dir.clone())
        .unwrap_or_else(|| parsed.config_dir.clone());
    with_extension_dts(&rebase(input, &root, &base))
}

fn javascript_output(input: &Path, parsed: &ParsedProject) -> PathBuf {
    let root = parsed.root_dir();
    let base = parsed.options.out_dir.clone().unwrap_or_else(|| parsed.config_dir.clone());
    with_extension_js(&rebase(input, &root, &base), parsed.options.jsx)
}

/// Computes the full expected output set for a parsed project (§6).
///
/// Returns an empty vector for a *container/solution* project (no inputs
/// produce outputs) — callers treat that as [`crate::status::UpToDateStatus::ContainerOnly`].
pub fn expected_outputs(parsed: &ParsedProject) -> Vec<OutputFile> {
    let mut outputs = Vec::new();

    if let Some(out_file) = &parsed.options.out_file {
        outputs.push(OutputFile { path: out_file.clone(), is_declaration: false });
        if parsed.options.source_map {
            outputs.push(OutputFile { path: append_ext(out_file, "map"), is_declaration: false });
        }
        if parsed.options.emits_declarations() {
            let dts = with_extension_dts(out_file);
            outputs.push(OutputFile { path: dts.clone(), is_declaration: true });
            if parsed.options.declaration_map {
                outputs.push(OutputFile { path: append_ext(&dts, "map"), is_declaration: true });
            }
        }
        return outputs;
    }

    if parsed.options.no_emit {
        return outputs;
    }

    for input in &parsed.input_files {
        if is_declaration_input(input) {
            continue;
        }

        let js = javascript_output(input, parsed);
        outputs.push(OutputFile { path: js.clone(), is_declaration: false });
        if parsed.options.source_map {
            outputs.push(OutputFile { path: append_ext(&js, "map"), is_declaration: false });
        }

        if parsed.options.emits_declarations() && !is_pure_data_input(input) {
            let dts = declaration_output(input, parsed);
            outputs.push(OutputFile { path: dts.clone(), is_declaration: true });
            if parsed.options.declaration_map {
                outputs.push(OutputFile { path: append_ext(&dts, "map"), is_declaration: true });
            }
        }
    }

    outputs
}

fn append_ext(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

static SOURCE_EXTENSIONS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["ts", "tsx", "js", "jsx"].into_iter().collect());

/// Whether `path` is one of this project's non-declaration `.ts`/`.tsx`
/// sources (§6's "output file" recognizer clause (d)).
fn is_non_declaration_source(path: &Path) -> bool {
    !is_declaration_input(path)
        && matches!(path.extension().and_then(|e| e.to_str()), Some("ts") | Some("tsx"))
}

/// Recognizes whether an existing file on disk is one of this project's
/// output files (§6). Used only by the watcher to decide whether a
/// filesystem event under a wildcard directory should invalidate the
/// project, and by the expected-outputs-derived recognizer used elsewhere.
pub fn is_project_output_file(path: &Path, parsed: &ParsedProject) -> bool {
    if let Some(out_file) = &parsed.options.out_file {
        if path == out_file || path == with_extension_dts(out_file) {
            return true;
        }
    }
    if let Some(decl_dir) = &parsed.options.declaration_dir {
        if path.starts_with(decl_dir) {
            return true;
        }
    }
    if let Some(out_dir) = &parsed.options.out_dir {
        if path.starts_with(out_dir) {
            return true;
        }
    }
    if parsed.input_files.iter().any(|i| i == path) {
        return false;
    }
    !is_non_declaration_source(path)
}

/// The supported source-file extensions the watcher treats as "relevant"
/// under a wildcard directory (§4.E "Watch file wiring").
pub fn is_supported_source_extension(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).map(|e| SOURCE_EXTENSIONS.contains(e)).unwrap_or(false)
}
