//! Route execution against the raw mapping
//!
//! The walker follows one absolute route through the raw document. Repeated
//! siblings fan out into parallel branches; wildcard steps also label each
//! branch so the assembler can group records into rows.

use crate::project::compose::ResolvedTable;
use crate::types::{BranchLabel, KeyConventions, PathSpec, Record, Segment};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Records extracted for one table instance, mirroring the plan's shape
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRecords {
    pub id: String,

    /// Records of every route, concatenated in route order
    pub records: Vec<Record>,

    pub children: Vec<TableRecords>,
}

/// One position reached while walking a route
#[derive(Debug, Clone)]
struct Cursor<'v> {
    node: &'v Value,
    branch: Vec<BranchLabel>,
    order: Vec<usize>,
}

/// An element found under a step, with the tag it was found under
struct Instance<'v> {
    tag: &'v str,
    ordinal: usize,
    node: &'v Value,
}

/// Extracts leaf records from a raw mapping
pub struct TreeWalker<'k> {
    keys: &'k KeyConventions,
}

impl<'k> TreeWalker<'k> {
    pub fn new(keys: &'k KeyConventions) -> Self {
        TreeWalker { keys }
    }

    /// Run every route of a table and its descendants against `root`
    pub fn extract_table(&self, root: &Value, table: &ResolvedTable) -> TableRecords {
        let records = table
            .routes
            .iter()
            .enumerate()
            .flat_map(|(idx, route)| self.extract(root, idx, &route.path))
            .collect();

        TableRecords {
            id: table.id.clone(),
            records,
            children: table
                .children
                .iter()
                .map(|child| self.extract_table(root, child))
                .collect(),
        }
    }

    /// Walk `path` from `root`, tagging every record with `route`
    pub fn extract(&self, root: &Value, route: usize, path: &PathSpec) -> Vec<Record> {
        let Some((terminal, navigation)) = path.segments().split_last() else {
            return Vec::new();
        };

        let mut cursors = vec![Cursor {
            node: root,
            branch: Vec::new(),
            order: Vec::new(),
        }];

        for segment in navigation {
            cursors = cursors
                .iter()
                .flat_map(|cursor| self.step(cursor, segment))
                .collect();

            if cursors.is_empty() {
                debug!("Route `{}` stops at `{}`", path, segment.tag);
                return Vec::new();
            }
        }

        let target = path.target();
        let mut records = Vec::new();
        for cursor in &cursors {
            self.read_terminal(cursor, terminal, target, route, &mut records);
        }

        if records.is_empty() {
            debug!("Route `{}` matched no `{}` field", path, target);
        }
        records
    }

    /// Descend one step, producing a cursor per matched instance
    fn step<'v>(&self, cursor: &Cursor<'v>, segment: &Segment) -> Vec<Cursor<'v>> {
        self.instances(cursor.node, segment)
            .iter()
            .enumerate()
            .map(|(position, instance)| {
                let (branch, order) = self.extend_branch(cursor, segment, instance, position);
                Cursor {
                    node: instance.node,
                    branch,
                    order,
                }
            })
            .collect()
    }

    fn extend_branch(
        &self,
        cursor: &Cursor<'_>,
        segment: &Segment,
        instance: &Instance<'_>,
        position: usize,
    ) -> (Vec<BranchLabel>, Vec<usize>) {
        let mut branch = cursor.branch.clone();
        let mut order = cursor.order.clone();
        if segment.wildcard {
            branch.push(BranchLabel {
                tag: instance.tag.to_string(),
                label: self
                    .name_of(instance.node)
                    .map(str::to_string)
                    .unwrap_or_else(|| instance.ordinal.to_string()),
            });
            order.push(position);
        }
        (branch, order)
    }

    /// Every element under a step's tag, or under any tag for a bare `*`
    fn instances<'v>(&self, node: &'v Value, segment: &Segment) -> Vec<Instance<'v>> {
        let Value::Object(map) = node else {
            return Vec::new();
        };

        if segment.matches_any_tag() {
            map.iter()
                .filter(|(key, _)| !Self::is_meta_key(key))
                .flat_map(|(key, value)| Self::expand(key, value))
                .collect()
        } else {
            map.iter()
                .filter(|(key, _)| key.as_str() == segment.tag)
                .flat_map(|(key, value)| Self::expand(key, value))
                .collect()
        }
    }

    fn expand<'v>(tag: &'v str, value: &'v Value) -> Vec<Instance<'v>> {
        match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(ordinal, node)| Instance { tag, ordinal, node })
                .collect(),
            node => vec![Instance {
                tag,
                ordinal: 0,
                node,
            }],
        }
    }

    /// Attribute and text entries are not child elements
    fn is_meta_key(key: &str) -> bool {
        key.starts_with('@') || key.starts_with('#')
    }

    fn name_of<'v>(&self, node: &'v Value) -> Option<&'v str> {
        node.get(&self.keys.name_key).and_then(Value::as_str)
    }

    /// Read the target field from the instances under the terminal step
    fn read_terminal(
        &self,
        cursor: &Cursor<'_>,
        terminal: &Segment,
        target: &str,
        route: usize,
        records: &mut Vec<Record>,
    ) {
        let instances = self.instances(cursor.node, terminal);
        let named: Vec<(usize, &Instance<'_>)> = instances
            .iter()
            .enumerate()
            .filter(|(_, i)| self.name_of(i.node) == Some(target))
            .collect();

        if !named.is_empty() {
            for (position, instance) in named {
                let (branch, order) = self.extend_branch(cursor, terminal, instance, position);
                records.push(Record {
                    route,
                    branch,
                    order,
                    field: target.to_string(),
                    value: self.read_leaf(instance.node),
                });
            }
            return;
        }

        for (position, instance) in instances.iter().enumerate() {
            let Some(child) = instance.node.get(target) else {
                continue;
            };
            let value = match child {
                Value::Array(items) => Value::Array(items.iter().map(|v| self.read_leaf(v)).collect()),
                other => self.read_leaf(other),
            };
            let (branch, order) = self.extend_branch(cursor, terminal, instance, position);
            records.push(Record {
                route,
                branch,
                order,
                field: target.to_string(),
                value,
            });
        }
    }

    /// Convert a leaf element into its output value
    pub fn read_leaf(&self, node: &Value) -> Value {
        let Value::Object(map) = node else {
            return node.clone();
        };

        if map.contains_key(&self.keys.data_key) {
            return Value::Object(self.read_table(map));
        }

        if let Some(text) = map.get(&self.keys.header_text_key) {
            let only_attributes = map
                .keys()
                .all(|k| k == &self.keys.header_text_key || k.starts_with('@'));
            if only_attributes {
                return text.clone();
            }
        }

        node.clone()
    }

    /// Turn a header/rows element into a mapping of column title to column values
    fn read_table(&self, map: &Map<String, Value>) -> Map<String, Value> {
        let mut table = Map::new();

        let headers: Vec<String> = map
            .get(&self.keys.header_key)
            .and_then(|h| h.get(&self.keys.table_key))
            .map(|th| match th {
                Value::Array(items) => items.iter().map(|i| self.text_of(i)).collect(),
                single => vec![self.text_of(single)],
            })
            .unwrap_or_default();

        let data = map.get(&self.keys.data_key).map(|d| self.text_of(d)).unwrap_or_default();
        let rows: Vec<Vec<&str>> = data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.split(',').map(str::trim).collect())
            .collect();

        if headers.is_empty() || rows.is_empty() {
            return table;
        }

        let width = rows.iter().map(Vec::len).min().unwrap_or(0);
        if width != headers.len() {
            let element = map
                .get(&self.keys.name_key)
                .and_then(Value::as_str)
                .unwrap_or("<unnamed>");
            let incomplete = if width < headers.len() {
                &self.keys.data_key
            } else {
                &self.keys.header_key
            };
            warn!(
                "Header and rows for [{}] do not match, [{}] is incomplete",
                element, incomplete
            );
        }

        for (col, header) in headers.into_iter().enumerate().take(width) {
            let column = rows
                .iter()
                .map(|row| Value::String(row[col].to_string()))
                .collect();
            table.insert(header, Value::Array(column));
        }

        table
    }

    /// Text of a plain string, or of the text key of an attributed element
    fn text_of(&self, node: &Value) -> String {
        match node {
            Value::String(s) => s.clone(),
            Value::Object(map) => map
                .get(&self.keys.header_text_key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}
