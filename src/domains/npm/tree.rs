//! Recursive dependency tree construction.
//!
//! Each declared dependency is fetched at its `latest` version and expanded in
//! turn, one at a time. Cycles are cut using the set of names on the current
//! root-to-node path (not a global visited set), so a package shared by two
//! sibling branches is expanded in both while a package depending on one of
//! its own ancestors becomes a `Circular` leaf.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use super::registry::PackageRegistry;
use super::version::manifest_for;

/// Depth used when the caller does not ask for one.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Ceiling on caller-requested depth.
pub const MAX_DEPTH_LIMIT: usize = 10;

const DEADLINE_EXCEEDED: &str = "dependency tree deadline exceeded";

/// Map a caller-supplied depth onto `1..=MAX_DEPTH_LIMIT`.
///
/// Missing, zero or negative values mean [`DEFAULT_MAX_DEPTH`].
pub fn normalize_max_depth(requested: Option<i64>) -> usize {
    match requested {
        Some(depth) if depth > MAX_DEPTH_LIMIT as i64 => MAX_DEPTH_LIMIT,
        Some(depth) if depth > 0 => depth as usize,
        _ => DEFAULT_MAX_DEPTH,
    }
}

// ============================================================================
// Tree Model
// ============================================================================

/// How a tree position ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutcome {
    /// Fetched and expanded; holds the children keyed by name.
    Expanded(BTreeMap<String, DependencyNode>),
    /// The name is already an ancestor on this path.
    Circular,
    /// The depth ceiling was reached before expanding.
    DepthLimited,
    /// Looking the package up failed.
    Error(String),
}

/// One position in the dependency tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub name: String,
    /// Range exactly as the parent declared it.
    pub version_range: String,
    /// Concrete version analyzed; empty unless expanded.
    pub version: String,
    pub outcome: NodeOutcome,
}

impl DependencyNode {
    fn leaf(name: &str, version_range: &str, outcome: NodeOutcome) -> Self {
        Self {
            name: name.to_string(),
            version_range: version_range.to_string(),
            version: String::new(),
            outcome,
        }
    }

    /// Children, if this node was expanded.
    pub fn dependencies(&self) -> Option<&BTreeMap<String, DependencyNode>> {
        match &self.outcome {
            NodeOutcome::Expanded(children) => Some(children),
            _ => None,
        }
    }

    pub fn is_circular(&self) -> bool {
        matches!(self.outcome, NodeOutcome::Circular)
    }

    pub fn is_depth_limited(&self) -> bool {
        matches!(self.outcome, NodeOutcome::DepthLimited)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            NodeOutcome::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Wire shape of a node: flags only appear when set.
#[derive(Serialize)]
struct NodeRepr<'a> {
    name: &'a str,
    version_range: &'a str,
    version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dependencies: Option<&'a BTreeMap<String, DependencyNode>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    circular: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    depth_limited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl Serialize for DependencyNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        NodeRepr {
            name: &self.name,
            version_range: &self.version_range,
            version: &self.version,
            dependencies: self.dependencies(),
            circular: self.is_circular(),
            depth_limited: self.is_depth_limited(),
            error: self.error(),
        }
        .serialize(serializer)
    }
}

/// The expanded direct dependencies of a root package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyTree {
    pub dependencies: BTreeMap<String, DependencyNode>,
    /// Deepest level holding a node; direct dependencies are level 1.
    pub depth: usize,
}

// ============================================================================
// Builder
// ============================================================================

/// Expands dependency declarations into a [`DependencyTree`].
pub struct TreeBuilder<'a, R: PackageRegistry + ?Sized> {
    registry: &'a R,
    max_depth: usize,
    deadline: Option<Instant>,
    path: HashSet<String>,
}

impl<'a, R: PackageRegistry + ?Sized> TreeBuilder<'a, R> {
    /// Nodes at `max_depth` or deeper are not expanded.
    pub fn new(registry: &'a R, max_depth: usize) -> Self {
        Self {
            registry,
            max_depth,
            deadline: None,
            path: HashSet::new(),
        }
    }

    /// Stop fetching once `deadline` has passed; remaining nodes become errors.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Expand the direct dependencies of `root`.
    pub fn build(mut self, root: &str, dependencies: &BTreeMap<String, String>) -> DependencyTree {
        self.path.insert(root.to_string());
        let (dependencies, depth) = self.expand_children(dependencies, 1);
        self.path.remove(root);

        DependencyTree { dependencies, depth }
    }

    /// Returns the children and the deepest level reached below them.
    fn expand_children(
        &mut self,
        declared: &BTreeMap<String, String>,
        depth: usize,
    ) -> (BTreeMap<String, DependencyNode>, usize) {
        let mut children = BTreeMap::new();
        let mut deepest = 0;

        for (name, range) in declared {
            let (node, reached) = self.expand(name, range, depth);
            deepest = deepest.max(reached);
            children.insert(name.clone(), node);
        }

        (children, deepest)
    }

    fn expand(&mut self, name: &str, range: &str, depth: usize) -> (DependencyNode, usize) {
        if self.path.contains(name) {
            debug!("Circular dependency on {} at depth {}", name, depth);
            return (DependencyNode::leaf(name, range, NodeOutcome::Circular), depth);
        }

        if depth >= self.max_depth {
            return (DependencyNode::leaf(name, range, NodeOutcome::DepthLimited), depth);
        }

        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            warn!("Skipping {}: {}", name, DEADLINE_EXCEEDED);
            return (
                DependencyNode::leaf(name, range, NodeOutcome::Error(DEADLINE_EXCEEDED.to_string())),
                depth,
            );
        }

        self.path.insert(name.to_string());
        let expanded = self.fetch_and_expand(name, range, depth);
        self.path.remove(name);

        expanded
    }

    fn fetch_and_expand(&mut self, name: &str, range: &str, depth: usize) -> (DependencyNode, usize) {
        let resolved = self.registry.fetch(name, None).and_then(|fetched| {
            let manifest = manifest_for(&fetched.metadata, name, &fetched.version)?;
            let declared = manifest.dependencies.clone().unwrap_or_default();
            Ok((fetched.version, declared))
        });

        let (version, declared) = match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("Failed to resolve dependency {}: {}", name, e);
                return (
                    DependencyNode::leaf(name, range, NodeOutcome::Error(e.to_string())),
                    depth,
                );
            }
        };

        debug!("Expanding {}@{} at depth {}", name, version, depth);
        let (children, deepest) = self.expand_children(&declared, depth + 1);

        let node = DependencyNode {
            name: name.to_string(),
            version_range: range.to_string(),
            version,
            outcome: NodeOutcome::Expanded(children),
        };
        (node, depth.max(deepest))
    }
}
