//! Error taxonomy for configuration and document loading
//!
//! Configuration problems surface while a parser is being built, never while a
//! document is being projected. Document problems come from the raw XML
//! collaborator and are passed through unchanged.

use std::path::PathBuf;

/// Raised while compiling paths, registering tables or composing the table tree
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("path is empty")]
    EmptyPath,

    #[error("path `{path}` needs at least one tag and a target field")]
    TooFewTokens { path: String },

    #[error("path `{path}` has an empty token at position {position}")]
    EmptyToken { path: String, position: usize },

    #[error("path `{path}`: token `{token}` may only carry `*` as a trailing marker")]
    MisplacedWildcard { path: String, token: String },

    #[error("path `{path}`: target field `{token}` cannot be a wildcard")]
    WildcardTarget { path: String, token: String },

    #[error("table `{table}` is declared more than once")]
    DuplicateTable { table: String },

    #[error("table `{table}` has no paths")]
    NoPaths { table: String },

    #[error("table `{table}` appears in the tree but has no path declaration")]
    UndeclaredTable { table: String },

    #[error("table tree is cyclic: {}", cycle.join(" -> "))]
    CyclicTree { cycle: Vec<String> },

    #[error("configuration is missing the `{section}` section")]
    MissingSection { section: String },

    #[error("configuration entry `{key}` is malformed: {reason}")]
    InvalidSection { key: String, reason: String },

    #[error("custom parsing requires a projection configuration")]
    MissingConfig,

    #[error("received invalid parser type `{0}`, expected one of [raw, custom]")]
    InvalidParserType(String),

    #[error("unsupported document encoding `{0}`")]
    UnsupportedEncoding(String),

    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration is not valid JSON: {0}")]
    Json(String),
}

/// Raised when an XML document cannot be read, decoded or parsed
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document is not valid {encoding}")]
    Decode { encoding: String },

    #[error("malformed XML at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("element `{tag}` is never closed")]
    Unclosed { tag: String },

    #[error("content found after the root element `{root}`")]
    TrailingContent { root: String },

    #[error("document has no root element")]
    Empty,
}

/// Any failure the parser can report
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

pub type Result<T> = std::result::Result<T, Error>;
