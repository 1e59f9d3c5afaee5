//! Table tree composition
//!
//! Child tables only declare the part of their path past the point where they
//! leave their parent. Composition rebuilds absolute routes by prefixing each
//! child path with every route of its parent, whose terminal step turns into
//! plain navigation.

use crate::error::ConfigError;
use crate::project::registry::TableRegistry;
use crate::types::Route;
use indexmap::IndexMap;

/// A table and the tables nested under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: String,
    pub children: Vec<String>,

    /// Keys kept from mapping-valued fields; None keeps everything
    pub keys: Option<Vec<String>>,
}

/// Declared parent/child relationships between tables
///
/// Nodes live in an arena keyed by table identifier, so declaring the same
/// table in several places merges its children.
#[derive(Debug, Clone, Default)]
pub struct TableTree {
    nodes: IndexMap<String, TreeNode>,
    roots: Vec<String>,
}

impl TableTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn node_mut(&mut self, id: &str) -> &mut TreeNode {
        self.nodes.entry(id.to_string()).or_insert_with(|| TreeNode {
            id: id.to_string(),
            children: Vec::new(),
            keys: None,
        })
    }

    pub fn add_root(&mut self, id: &str) {
        self.node_mut(id);
        if !self.roots.iter().any(|r| r == id) {
            self.roots.push(id.to_string());
        }
    }

    pub fn add_child(&mut self, parent: &str, child: &str) {
        self.node_mut(child);
        let node = self.node_mut(parent);
        if !node.children.iter().any(|c| c == child) {
            node.children.push(child.to_string());
        }
    }

    pub fn set_keys(&mut self, id: &str, keys: Vec<String>) {
        self.node_mut(id).keys = Some(keys);
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn get(&self, id: &str) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn table_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }
}

/// A table instance at one position of the tree, with absolute routes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTable {
    pub id: String,
    pub routes: Vec<Route>,

    /// Whether the table's own paths cross a wildcard, producing a list of rows
    pub repeated: bool,

    pub keys: Option<Vec<String>>,
    pub children: Vec<ResolvedTable>,
}

impl ResolvedTable {
    /// Depth-first walk over this table and its descendants
    pub fn walk(&self) -> Vec<&ResolvedTable> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

/// Every root table with its resolved descendants, ready for extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionPlan {
    pub roots: Vec<ResolvedTable>,
}

impl ProjectionPlan {
    /// Resolve the tree against the registered paths
    pub fn compose(tree: &TableTree, registry: &TableRegistry) -> Result<Self, ConfigError> {
        for id in tree.table_ids() {
            if !registry.contains(id) {
                return Err(ConfigError::UndeclaredTable { table: id.to_string() });
            }
        }

        let mut roots = Vec::with_capacity(tree.roots().len());
        for root in tree.roots() {
            let mut stack = vec![root.clone()];
            roots.push(Self::resolve(root, None, tree, registry, &mut stack)?);
        }

        Ok(ProjectionPlan { roots })
    }

    fn resolve(
        id: &str,
        parent_routes: Option<&[Route]>,
        tree: &TableTree,
        registry: &TableRegistry,
        stack: &mut Vec<String>,
    ) -> Result<ResolvedTable, ConfigError> {
        let spec = registry
            .get(id)
            .ok_or_else(|| ConfigError::UndeclaredTable { table: id.to_string() })?;

        let routes: Vec<Route> = match parent_routes {
            None => spec
                .paths
                .iter()
                .map(|path| Route {
                    path: path.clone(),
                    parent_route: None,
                    inherited: 0,
                })
                .collect(),
            Some(parents) => parents
                .iter()
                .enumerate()
                .flat_map(move |(idx, parent)| {
                    spec.paths.iter().map(move |path| {
                        let (path, inherited) = path.nested_under(&parent.path);
                        Route {
                            path,
                            parent_route: Some(idx),
                            inherited,
                        }
                    })
                })
                .collect(),
        };

        let node = tree.get(id);
        let mut children = Vec::new();
        for child in node.map(|n| n.children.as_slice()).unwrap_or_default() {
            if let Some(pos) = stack.iter().position(|s| s == child) {
                let mut cycle = stack[pos..].to_vec();
                cycle.push(child.clone());
                return Err(ConfigError::CyclicTree { cycle });
            }
            stack.push(child.clone());
            children.push(Self::resolve(child, Some(&routes), tree, registry, stack)?);
            stack.pop();
        }

        Ok(ResolvedTable {
            id: id.to_string(),
            routes,
            repeated: spec.is_repeated(),
            keys: node.and_then(|n| n.keys.clone()),
            children,
        })
    }

    /// Find the first instance of a table anywhere in the plan
    pub fn find(&self, id: &str) -> Option<&ResolvedTable> {
        self.roots
            .iter()
            .flat_map(ResolvedTable::walk)
            .find(|t| t.id == id)
    }
}
