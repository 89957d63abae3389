//! Config cache (§4.B): memoizes configuration parses keyed by [`ProjectId`].

use crate::{
    config::{ConfigParseDiagnostic, ConfigParser, ParsedProject},
    id::ProjectId,
};
use std::collections::HashMap;

/// Either a successfully parsed project, or the fatal diagnostic that was
/// raised instead (§3 "Config cache entry" — the two are alternatives).
#[derive(Clone, Debug)]
enum CacheEntry {
    Parsed(ParsedProject),
    Failed(ConfigParseDiagnostic),
}

/// Memoizes configuration parses. On a cache miss, invokes the configured
/// [`ConfigParser`]; the cached entry is whichever of the two alternatives
/// the parser produced.
pub struct ConfigCache {
    parser: Box<dyn ConfigParser>,
    entries: HashMap<ProjectId, CacheEntry>,
}

impl std::fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigCache").field("entries", &self.entries.len()).finish()
    }
}

impl ConfigCache {
    pub fn new(parser: Box<dyn ConfigParser>) -> Self {
        Self { parser, entries: HashMap::new() }
    }

    /// Returns the parsed project for `id`, parsing (and memoizing) on first
    /// access. Returns `None` if the project failed to parse — use
    /// [`Self::parse_diagnostic`] to retrieve the stored diagnostic.
    #[instrument(level = "trace", skip(self))]
    pub fn get(&mut self, id: &ProjectId) -> Option<&ParsedProject> {
        if !self.entries.contains_key(id) {
            trace!("config cache miss for {id}");
            let entry = match self.parser.parse(id) {
                Ok(parsed) => CacheEntry::Parsed(parsed),
                Err(diag) => CacheEntry::Failed(diag),
            };
            self.entries.insert(id.clone(), entry);
        }
        match self.entries.get(id) {
            Some(CacheEntry::Parsed(p)) => Some(p),
            _ => None,
        }
    }

    /// The fatal diagnostic recorded for `id`, if its last parse failed.
    pub fn parse_diagnostic(&self, id: &ProjectId) -> Option<&ConfigParseDiagnostic> {
        match self.entries.get(id) {
            Some(CacheEntry::Failed(d)) => Some(d),
            _ => None,
        }
    }

    /// Evicts `id`'s entry, forcing the next [`Self::get`] to re-parse. Used
    /// by watch mode on a `Full` reload (the config file itself changed).
    pub fn invalidate(&mut self, id: &ProjectId) {
        trace!("invalidating config cache entry for {id}");
        self.entries.remove(id);
    }

    pub fn contains(&self, id: &ProjectId) -> bool {
        self.entries.contains_key(id)
    }

    /// Every project this cache has an entry for, parsed or failed. Used by
    /// the watcher to decide which known projects a changed file belongs to.
    pub fn known_ids(&self) -> impl Iterator<Item = &ProjectId> {
        self.entries.keys()
    }
}
