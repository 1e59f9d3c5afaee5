//! Projection configuration loading
//!
//! The configuration is a JSON document with a `TREE` section describing how
//! tables nest, and one entry per table listing its paths:
//!
//! ```json
//! {
//!   "TREE": {"TABLE_A": {}, "TABLE_B": {"TABLE_C": {"KEYS": "key1,key2"}}},
//!   "TABLE_A": ["table,info", "table,metadata"],
//!   "TABLE_B": ["container*,node*,table,info"],
//!   "TABLE_C": ["table,images"]
//! }
//! ```

use crate::error::ConfigError;
use crate::project::{ProjectionPlan, TableRegistry, TableTree};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Identifiers of the reserved configuration entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionKeys {
    /// Entry describing the table tree
    pub tree: String,

    /// Entry inside a tree node selecting the keys a table keeps
    pub keys: String,
}

impl Default for SectionKeys {
    fn default() -> Self {
        SectionKeys {
            tree: String::from("TREE"),
            keys: String::from("KEYS"),
        }
    }
}

/// A validated table tree together with the compiled paths of its tables
#[derive(Debug, Clone)]
pub struct ProjectionConfig {
    pub tree: TableTree,
    pub registry: TableRegistry,
}

impl ProjectionConfig {
    /// Load and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P, sections: &SectionKeys) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value =
            simd_json::serde::from_slice(&mut bytes).map_err(|e| ConfigError::Json(e.to_string()))?;
        Self::from_value(&value, sections)
    }

    /// Parse and validate a configuration held in memory
    pub fn from_json_str(json: &str, sections: &SectionKeys) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        Self::from_value(&value, sections)
    }

    /// Validate an already parsed configuration document
    pub fn from_value(value: &Value, sections: &SectionKeys) -> Result<Self, ConfigError> {
        let Value::Object(doc) = value else {
            return Err(ConfigError::InvalidSection {
                key: String::from("<root>"),
                reason: String::from("configuration must be a JSON object"),
            });
        };

        let tree_value = doc.get(&sections.tree).ok_or_else(|| ConfigError::MissingSection {
            section: sections.tree.clone(),
        })?;
        let Value::Object(tree_map) = tree_value else {
            return Err(ConfigError::InvalidSection {
                key: sections.tree.clone(),
                reason: String::from("expected an object of tables"),
            });
        };

        let mut tree = TableTree::new();
        for (id, children) in tree_map {
            if id == &sections.keys {
                return Err(ConfigError::InvalidSection {
                    key: id.clone(),
                    reason: String::from("key selection must belong to a table"),
                });
            }
            tree.add_root(id);
            Self::read_children(id, children, sections, &mut tree)?;
        }

        let mut registry = TableRegistry::new();
        let declared: Vec<String> = tree.table_ids().map(str::to_string).collect();
        for id in &declared {
            let entry = doc
                .get(id)
                .ok_or_else(|| ConfigError::UndeclaredTable { table: id.clone() })?;
            let paths = Self::read_paths(id, entry)?;
            registry.register(id, paths.as_slice())?;
        }

        for key in doc.keys() {
            if key != &sections.tree && !registry.contains(key) {
                debug!("Table `{}` is not part of the tree, skipping", key);
            }
        }

        // Reject cycles and dangling references before any document is read
        ProjectionPlan::compose(&tree, &registry)?;

        Ok(ProjectionConfig { tree, registry })
    }

    /// Resolve the configuration into absolute routes
    pub fn plan(&self) -> Result<ProjectionPlan, ConfigError> {
        ProjectionPlan::compose(&self.tree, &self.registry)
    }

    fn read_children(
        parent: &str,
        value: &Value,
        sections: &SectionKeys,
        tree: &mut TableTree,
    ) -> Result<(), ConfigError> {
        let children: &Map<String, Value> = match value {
            Value::Object(map) => map,
            Value::Null => return Ok(()),
            _ => {
                return Err(ConfigError::InvalidSection {
                    key: parent.to_string(),
                    reason: String::from("tree nodes must be objects"),
                })
            }
        };

        for (id, nested) in children {
            if id == &sections.keys {
                tree.set_keys(parent, Self::read_keys(parent, nested)?);
                continue;
            }
            if id == parent {
                return Err(ConfigError::CyclicTree {
                    cycle: vec![parent.to_string(), id.clone()],
                });
            }
            tree.add_child(parent, id);
            Self::read_children(id, nested, sections, tree)?;
        }
        Ok(())
    }

    fn read_keys(table: &str, value: &Value) -> Result<Vec<String>, ConfigError> {
        let keys: Vec<String> = match value {
            Value::String(s) => s.split(',').map(|k| k.trim().to_string()).collect(),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(|s| s.trim().to_string()).ok_or_else(|| {
                        ConfigError::InvalidSection {
                            key: table.to_string(),
                            reason: String::from("key selection must hold strings"),
                        }
                    })
                })
                .collect::<Result<_, _>>()?,
            _ => {
                return Err(ConfigError::InvalidSection {
                    key: table.to_string(),
                    reason: String::from("key selection must be a comma separated string"),
                })
            }
        };
        Ok(keys.into_iter().filter(|k| !k.is_empty()).collect())
    }

    fn read_paths(table: &str, value: &Value) -> Result<Vec<String>, ConfigError> {
        match value {
            Value::String(path) => Ok(vec![path.clone()]),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| ConfigError::InvalidSection {
                            key: table.to_string(),
                            reason: String::from("paths must be strings"),
                        })
                })
                .collect(),
            _ => Err(ConfigError::InvalidSection {
                key: table.to_string(),
                reason: String::from("expected a list of paths"),
            }),
        }
    }
}
