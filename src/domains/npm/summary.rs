//! Aggregate statistics over a completed dependency tree.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use super::tree::{DependencyNode, DependencyTree};

/// Totals reported alongside a dependency tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TreeSummary {
    /// Distinct package names in the tree, circular markers excluded.
    pub total_dependencies: usize,
    /// Deepest level reached while building.
    pub tree_depth: usize,
}

/// Summarize `tree`; the depth comes from the builder, the count is computed here.
pub fn summarize(tree: &DependencyTree) -> TreeSummary {
    TreeSummary {
        total_dependencies: count_unique(&tree.dependencies),
        tree_depth: tree.depth,
    }
}

/// Count each non-circular package name once, however many branches hold it.
pub fn count_unique(dependencies: &BTreeMap<String, DependencyNode>) -> usize {
    let mut seen = HashSet::new();
    collect_names(dependencies, &mut seen);
    seen.len()
}

fn collect_names<'a>(nodes: &'a BTreeMap<String, DependencyNode>, seen: &mut HashSet<&'a str>) {
    for node in nodes.values() {
        if node.is_circular() {
            continue;
        }
        seen.insert(node.name.as_str());
        if let Some(children) = node.dependencies() {
            collect_names(children, seen);
        }
    }
}
