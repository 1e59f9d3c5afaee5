//! Result assembly
//!
//! Records are grouped into rows by the wildcard branch they were found under.
//! Child tables are nested into the parent rows whose branch their own records
//! descend from.

use crate::project::compose::{ProjectionPlan, ResolvedTable};
use crate::project::walker::TableRecords;
use crate::types::{BranchLabel, Route};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// The parent row a nested table is being assembled for
#[derive(Clone, Copy)]
struct Scope<'a> {
    branch: &'a [BranchLabel],
    routes: &'a [usize],
}

impl Scope<'_> {
    /// Whether a branch of the nested table descends from this parent row,
    /// returning how many of its labels belong to the parent
    fn admits(&self, route: &Route, branch: &[BranchLabel]) -> Option<usize> {
        let parent_route = route.parent_route?;
        if !self.routes.contains(&parent_route) {
            return None;
        }
        let depth = route.inherited;
        let shared = depth.min(self.branch.len());
        (branch.len() >= depth && branch[..shared] == self.branch[..shared]).then_some(depth)
    }
}

#[derive(Debug, Default)]
struct Row {
    routes: Vec<usize>,
    fields: Map<String, Value>,
}

/// A row about to be opened, with its position in the document
struct Opening<'a> {
    order: &'a [usize],
    branch: &'a [BranchLabel],
    skip: usize,
}

/// Builds the nested output from extracted records
pub struct ResultAssembler;

impl ResultAssembler {
    /// Assemble every root table, keyed by table identifier in tree order
    pub fn assemble(plan: &ProjectionPlan, extracted: &[TableRecords]) -> Map<String, Value> {
        let mut out = Map::new();
        for (table, records) in plan.roots.iter().zip(extracted) {
            out.insert(table.id.clone(), Self::assemble_table(table, records, None));
        }
        out
    }

    fn assemble_table(table: &ResolvedTable, extracted: &TableRecords, scope: Option<Scope<'_>>) -> Value {
        let mut rows = Self::open_rows(table, extracted, scope);

        for record in &extracted.records {
            let Some(route) = table.routes.get(record.route) else {
                continue;
            };
            if scope.is_some_and(|s| s.admits(route, &record.branch).is_none()) {
                continue;
            }
            if let Some(row) = rows.get_mut(&record.branch) {
                row.fields
                    .insert(record.field.clone(), Self::select_keys(table, &record.value));
            }
        }

        // A single mapping always exists, so its children have somewhere to go
        if !table.repeated {
            let live: Vec<usize> = table
                .routes
                .iter()
                .enumerate()
                .filter(|(_, route)| match scope {
                    None => true,
                    Some(s) => route.parent_route.is_some_and(|p| s.routes.contains(&p)),
                })
                .map(|(idx, _)| idx)
                .collect();
            if rows.is_empty() {
                let branch = scope.map(|s| s.branch.to_vec()).unwrap_or_default();
                rows.insert(branch, Row::default());
            }
            for row in rows.values_mut() {
                row.routes.clone_from(&live);
            }
        }

        let mut assembled: Vec<Map<String, Value>> = Vec::with_capacity(rows.len());
        for (branch, mut row) in rows {
            for (child, child_records) in table.children.iter().zip(&extracted.children) {
                let child_scope = Scope {
                    branch: &branch,
                    routes: &row.routes,
                };
                let value = Self::assemble_table(child, child_records, Some(child_scope));
                row.fields.insert(child.id.clone(), value);
            }
            assembled.push(row.fields);
        }

        if table.repeated {
            Value::Array(assembled.into_iter().map(Value::Object).collect())
        } else {
            let mut merged = Map::new();
            for fields in assembled {
                merged.extend(fields);
            }
            Value::Object(merged)
        }
    }

    /// Open the rows of a table route by route, in document order within a route
    ///
    /// Rows come from the table's own records and, for repeated tables, from
    /// child records whose branch has no parent record of its own.
    fn open_rows(
        table: &ResolvedTable,
        extracted: &TableRecords,
        scope: Option<Scope<'_>>,
    ) -> IndexMap<Vec<BranchLabel>, Row> {
        let mut rows: IndexMap<Vec<BranchLabel>, Row> = IndexMap::new();

        for (idx, route) in table.routes.iter().enumerate() {
            let admit = |branch: &[BranchLabel]| match scope {
                None => Some(0),
                Some(scope) => scope.admits(route, branch),
            };

            let mut openings: Vec<Opening<'_>> = Vec::new();
            for record in extracted.records.iter().filter(|r| r.route == idx) {
                if let Some(skip) = admit(&record.branch) {
                    openings.push(Opening {
                        order: &record.order,
                        branch: &record.branch,
                        skip,
                    });
                }
            }

            if table.repeated {
                let depth = route.depth();
                for (child, child_records) in table.children.iter().zip(&extracted.children) {
                    for record in &child_records.records {
                        let Some(child_route) = child.routes.get(record.route) else {
                            continue;
                        };
                        // Only a child sharing every parent label identifies a parent row
                        if child_route.parent_route != Some(idx)
                            || child_route.inherited != depth
                            || record.branch.len() < depth
                        {
                            continue;
                        }
                        let branch = &record.branch[..depth];
                        if let Some(skip) = admit(branch) {
                            openings.push(Opening {
                                order: &record.order[..depth.min(record.order.len())],
                                branch,
                                skip,
                            });
                        }
                    }
                }
            }

            openings.sort_by(|a, b| a.order.cmp(b.order));
            for opening in openings {
                let row = rows
                    .entry(opening.branch.to_vec())
                    .or_insert_with(|| Self::new_row(&opening.branch[opening.skip..]));
                if !row.routes.contains(&idx) {
                    row.routes.push(idx);
                }
            }
        }

        rows
    }

    /// A row starts with one column per wildcard label it was found under
    fn new_row(labels: &[BranchLabel]) -> Row {
        let mut fields = Map::new();
        for label in labels {
            fields.insert(label.tag.clone(), Value::String(label.label.clone()));
        }
        Row {
            routes: Vec::new(),
            fields,
        }
    }

    /// Apply the table's KEYS selection to a mapping-valued field
    fn select_keys(table: &ResolvedTable, value: &Value) -> Value {
        match (&table.keys, value) {
            (Some(keys), Value::Object(map)) => Value::Object(
                map.iter()
                    .filter(|(k, _)| keys.iter().any(|key| key == *k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }
}
