//! # xmltab - Declarative XML Table Projection
//!
//! Parses XML documents into nested mappings and projects them into named
//! tables described by a small path language.
//!
//! ## Modules
//!
//! - **xml**: convert XML markup into a raw nested mapping
//! - **config**: load the table tree and table paths from JSON
//! - **project**: compile paths, compose the table tree, extract and assemble tables
//! - **parser**: the `XmlParser` entry point tying everything together
//!
//! ## Quick Start
//!
//! ### Raw parsing
//!
//! ```rust
//! use xmltab::XmlParser;
//!
//! let parser = XmlParser::raw();
//! let value = parser.parse_str(r#"<root><node name="n1">hi</node></root>"#).unwrap();
//! assert_eq!(value["root"]["node"]["@name"], "n1");
//! ```
//!
//! ### Table projection
//!
//! ```rust
//! use xmltab::{ParserOptions, ProjectionConfig, SectionKeys, XmlParser};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = ProjectionConfig::from_value(
//!     &json!({
//!         "TREE": {"NODES": {"IMAGES": {}}},
//!         "NODES": ["node*,table,info"],
//!         "IMAGES": ["table,images"]
//!     }),
//!     &SectionKeys::default(),
//! )?;
//! let parser = XmlParser::with_config(ParserOptions::default(), &config)?;
//!
//! let out = parser.parse_str(
//!     r#"<root>
//!          <node name="n1">
//!            <table name="info">primary</table>
//!            <table name="images">a.png</table>
//!          </node>
//!        </root>"#,
//! )?;
//!
//! assert_eq!(
//!     out,
//!     json!({"NODES": [{"node": "n1", "info": "primary", "IMAGES": {"images": "a.png"}}]})
//! );
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod parser;
pub mod project;
pub mod types;
pub mod xml;

// Re-export commonly used types for convenience
pub use config::{ProjectionConfig, SectionKeys};
pub use error::{ConfigError, Error, Result, SourceError};
pub use parser::{ParserOptions, XmlParser};
pub use project::{compile, ProjectionPlan, TableRegistry, TableTree};
pub use types::{Encoding, KeyConventions, ParserType, PathSpec, Segment};
