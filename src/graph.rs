//! Dependency graph builder (§4.C).
//!
//! Produces a topologically ordered build queue (leaves first) and a
//! bidirectional reference map from a set of root project identifiers,
//! detecting illegal reference cycles along the way.

use crate::{config_cache::ConfigCache, id::ProjectId};
use std::collections::{HashMap, HashSet};

/// Bidirectional mapping between projects and the projects they reference.
///
/// Per the design note in §9 ("on any failure, still add all traversed
/// edges"), edges are registered regardless of whether the subtree they lead
/// into ultimately succeeded, so that watch-mode invalidation can still find
/// dependents of a project that failed to parse.
#[derive(Debug, Default, Clone)]
pub struct ReferenceGraph {
    /// parent -> children (projects this project references)
    children: HashMap<ProjectId, Vec<ProjectId>>,
    /// child -> parents (projects that reference this project)
    parents: HashMap<ProjectId, Vec<ProjectId>>,
}

impl ReferenceGraph {
    fn add_edge(&mut self, parent: ProjectId, child: ProjectId) {
        let children = self.children.entry(parent.clone()).or_default();
        if !children.contains(&child) {
            children.push(child.clone());
        }
        let parents = self.parents.entry(child).or_default();
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }

    /// Projects referenced directly by `id`.
    pub fn children_of(&self, id: &ProjectId) -> &[ProjectId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Projects that directly reference `id`.
    pub fn parents_of(&self, id: &ProjectId) -> &[ProjectId] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All transitive dependents of `id` (breadth-first; see §9 "the
    /// descendant-gathering order itself is not observable").
    pub fn transitive_parents(&self, id: &ProjectId) -> Vec<ProjectId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut queue: std::collections::VecDeque<ProjectId> = self.parents_of(id).iter().cloned().collect();
        while let Some(next) = queue.pop_front() {
            if seen.insert(next.clone()) {
                out.push(next.clone());
                for parent in self.parents_of(&next) {
                    queue.push_back(parent.clone());
                }
            }
        }
        out
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Temporary,
    Permanent,
}

/// Builds the build queue and reference graph from `roots`. Returns `None`
/// on any failure — an illegal reference cycle, or any transitively
/// referenced project whose config fails to parse — after still recording
/// every edge it managed to traverse (§9 Open Question: "on any failure,
/// still add all traversed edges and continue marking ... then return no
/// graph at the outer call"). Per-project compiler failures that occur
/// later, during an actual build attempt, are a different and recoverable
/// category (§7) — they don't go through this function at all.
pub fn build_graph(
    config_cache: &mut ConfigCache,
    roots: &[ProjectId],
) -> Option<(Vec<ProjectId>, ReferenceGraph)> {
    let mut marks: HashMap<ProjectId, Mark> = HashMap::new();
    let mut queue = Vec::new();
    let mut graph = ReferenceGraph::default();
    let mut failed = false;

    for root in roots {
        let mut stack = Vec::new();
        if visit(config_cache, root, &mut marks, &mut queue, &mut graph, &mut stack, false).is_err() {
            failed = true;
        }
    }

    if failed {
        None
    } else {
        Some((queue, graph))
    }
}

/// Depth-first visit with three-color marking (unvisited / temporary /
/// permanent). Returns `Err(())` if this subtree (or one further down)
/// failed, but always finishes registering edges and marking nodes first.
fn visit(
    config_cache: &mut ConfigCache,
    id: &ProjectId,
    marks: &mut HashMap<ProjectId, Mark>,
    queue: &mut Vec<ProjectId>,
    graph: &mut ReferenceGraph,
    stack: &mut Vec<ProjectId>,
    in_circular_context: bool,
) -> Result<(), ()> {
    match marks.get(id) {
        Some(Mark::Permanent) => return Ok(()),
        Some(Mark::Temporary) => {
            if in_circular_context {
                // This back-edge was declared `circular = true` somewhere on
                // the path; not an error, just stop recursing here.
                return Ok(());
            }
            let cycle = stack
                .iter()
                .skip_while(|s| *s != id)
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            error!("circular reference detected:\n{cycle}");
            return Err(());
        }
        None => {}
    }

    marks.insert(id.clone(), Mark::Temporary);
    stack.push(id.clone());

    let Some(parsed) = config_cache.get(id).cloned() else {
        // Parse failure: mark permanent so we don't re-enter, propagate
        // failure to the caller so the outer call reports no graph, but
        // still finish visiting every other root (any edges already
        // registered into/out of this node stay registered).
        marks.insert(id.clone(), Mark::Permanent);
        stack.pop();
        return Err(());
    };

    let mut subtree_failed = false;
    for reference in &parsed.references {
        graph.add_edge(id.clone(), reference.id.clone());
        let child_in_circular_context = in_circular_context || reference.circular;
        if visit(config_cache, &reference.id, marks, queue, graph, stack, child_in_circular_context).is_err() {
            subtree_failed = true;
        }
    }

    stack.pop();
    marks.insert(id.clone(), Mark::Permanent);
    queue.push(id.clone());

    if subtree_failed {
        Err(())
    } else {
        Ok(())
    }
}
