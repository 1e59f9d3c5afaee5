//! Projection engine - turn a raw XML mapping into named tables
//!
//! Paths are compiled once per configuration, composed along the table tree
//! into absolute routes, then executed against each document.
//!
//! ## Pipeline
//!
//! 1. `path`: compile `tag*,tag,target` strings into segments
//! 2. `registry`: collect the compiled paths of every table
//! 3. `compose`: resolve child paths against their parents into a `ProjectionPlan`
//! 4. `walker`: execute the plan's routes against a raw mapping
//! 5. `assemble`: group records into rows and nest child tables

pub mod path;
pub mod registry;
pub mod compose;
pub mod walker;
pub mod assemble;

pub use path::compile;
pub use registry::{TableRegistry, TableSpec};
pub use compose::{ProjectionPlan, ResolvedTable, TableTree, TreeNode};
pub use walker::{TableRecords, TreeWalker};
pub use assemble::ResultAssembler;
