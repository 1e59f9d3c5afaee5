//! Compiled path declarations per table

use crate::error::ConfigError;
use crate::project::path::compile;
use crate::types::PathSpec;
use indexmap::IndexMap;

/// The alternative paths feeding one named table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub id: String,
    pub paths: Vec<PathSpec>,
}

impl TableSpec {
    /// Whether the table's own paths fan out into repeated rows
    pub fn is_repeated(&self) -> bool {
        self.paths.iter().any(PathSpec::has_wildcard)
    }
}

/// Table identifier → compiled paths, in registration order
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: IndexMap<String, TableSpec>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and store the paths of a table
    pub fn register<S: AsRef<str>>(&mut self, table_id: &str, paths: &[S]) -> Result<(), ConfigError> {
        if self.tables.contains_key(table_id) {
            return Err(ConfigError::DuplicateTable {
                table: table_id.to_string(),
            });
        }
        if paths.is_empty() {
            return Err(ConfigError::NoPaths {
                table: table_id.to_string(),
            });
        }

        let paths = paths
            .iter()
            .map(|p| compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        self.tables.insert(
            table_id.to_string(),
            TableSpec {
                id: table_id.to_string(),
                paths,
            },
        );
        Ok(())
    }

    pub fn get(&self, table_id: &str) -> Option<&TableSpec> {
        self.tables.get(table_id)
    }

    pub fn contains(&self, table_id: &str) -> bool {
        self.tables.contains_key(table_id)
    }

    pub fn table_ids(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = TableRegistry::new();
        registry.register("TABLE_A", &["table,info", "table,metadata"]).unwrap();
        registry.register("TABLE_B", &["container*,node*,table,info"]).unwrap();

        let a = registry.get("TABLE_A").unwrap();
        assert_eq!(a.paths.len(), 2);
        assert_eq!(a.paths[1].target(), "metadata");
        assert!(!a.is_repeated());
        assert!(registry.get("TABLE_B").unwrap().is_repeated());

        let ids: Vec<_> = registry.table_ids().collect();
        assert_eq!(ids, vec!["TABLE_A", "TABLE_B"]);
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = TableRegistry::new();
        registry.register("TABLE_A", &["table,info"]).unwrap();

        let err = registry.register("TABLE_A", &["table,other"]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateTable { table } if table == "TABLE_A"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_bad_paths() {
        let mut registry = TableRegistry::new();
        assert!(matches!(
            registry.register("TABLE_A", &["table,info", "broken"]),
            Err(ConfigError::TooFewTokens { .. })
        ));
        assert!(matches!(
            registry.register::<&str>("TABLE_B", &[]),
            Err(ConfigError::NoPaths { .. })
        ));
        assert!(registry.is_empty());
    }
}
