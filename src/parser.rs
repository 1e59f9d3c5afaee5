//! Parser entry point
//!
//! `XmlParser` loads and validates its configuration once, then turns each
//! document into either the raw mapping or the projected tables.

use crate::config::{ProjectionConfig, SectionKeys};
use crate::error::{ConfigError, Result};
use crate::project::{ProjectionPlan, ResultAssembler, TreeWalker};
use crate::types::{Encoding, KeyConventions, ParserType};
use crate::xml;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Options for building an XmlParser
#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    /// Whether to return the raw mapping or project it through a configuration
    pub parser_type: ParserType,

    /// Projection configuration, required for custom parsing
    pub config_file: Option<PathBuf>,

    /// Encoding of the XML documents
    pub encoding: Encoding,

    /// Names of the tree and key-selection entries in the configuration
    pub sections: SectionKeys,

    /// Key names used when reading leaves
    pub keys: KeyConventions,
}

impl ParserOptions {
    pub fn with_parser_type(mut self, parser_type: ParserType) -> Self {
        self.parser_type = parser_type;
        self
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_sections(mut self, sections: SectionKeys) -> Self {
        self.sections = sections;
        self
    }

    pub fn with_keys(mut self, keys: KeyConventions) -> Self {
        self.keys = keys;
        self
    }
}

/// Parses XML documents into raw or projected mappings
///
/// All configuration is validated at construction, so a parser that was built
/// successfully can only fail on documents it cannot read.
#[derive(Debug, Clone)]
pub struct XmlParser {
    options: ParserOptions,
    plan: Option<ProjectionPlan>,
}

impl XmlParser {
    pub fn new(options: ParserOptions) -> Result<Self> {
        let plan = match options.parser_type {
            ParserType::Raw => {
                if options.config_file.is_some() {
                    debug!("Raw parsing ignores the projection configuration");
                }
                None
            }
            ParserType::Custom => {
                let file = options.config_file.as_ref().ok_or(ConfigError::MissingConfig)?;
                let config = ProjectionConfig::from_file(file, &options.sections)?;
                Some(config.plan()?)
            }
        };

        Ok(XmlParser { options, plan })
    }

    /// A parser returning documents as raw mappings
    pub fn raw() -> Self {
        XmlParser {
            options: ParserOptions::default(),
            plan: None,
        }
    }

    /// A custom parser reading its configuration from a file, with default keys
    pub fn custom<P: AsRef<Path>>(config_file: P) -> Result<Self> {
        Self::new(ParserOptions {
            parser_type: ParserType::Custom,
            config_file: Some(config_file.as_ref().to_path_buf()),
            ..ParserOptions::default()
        })
    }

    /// A custom parser from an already loaded configuration
    pub fn with_config(options: ParserOptions, config: &ProjectionConfig) -> Result<Self> {
        let plan = config.plan()?;
        Ok(XmlParser {
            options: ParserOptions {
                parser_type: ParserType::Custom,
                ..options
            },
            plan: Some(plan),
        })
    }

    pub fn parser_type(&self) -> ParserType {
        self.options.parser_type
    }

    pub fn encoding(&self) -> Encoding {
        self.options.encoding
    }

    pub fn keys(&self) -> &KeyConventions {
        &self.options.keys
    }

    pub fn plan(&self) -> Option<&ProjectionPlan> {
        self.plan.as_ref()
    }

    /// Parse an XML file
    pub fn parse<P: AsRef<Path>>(&self, path: P) -> Result<Value> {
        let started = Instant::now();
        let raw = xml::load_file(&path, self.options.encoding)?;
        let out = self.finish(raw);
        info!(
            "Parsed {} ({} mode) in {:.2?}",
            path.as_ref().display(),
            self.options.parser_type,
            started.elapsed()
        );
        Ok(out)
    }

    /// Parse an XML document held in memory
    pub fn parse_str(&self, document: &str) -> Result<Value> {
        let raw = xml::parse_str(document)?;
        Ok(self.finish(raw))
    }

    fn finish(&self, raw: Value) -> Value {
        match self.plan {
            Some(_) => self.project(&raw),
            None => raw,
        }
    }

    /// Project a raw mapping; the raw mapping itself is returned in raw mode
    pub fn project(&self, raw: &Value) -> Value {
        let Some(plan) = &self.plan else {
            return raw.clone();
        };

        // Paths start below the document element
        let anchor = match raw {
            Value::Object(map) if map.len() == 1 => map.values().next().unwrap_or(raw),
            other => other,
        };

        let walker = TreeWalker::new(&self.options.keys);
        let extracted: Vec<_> = plan
            .roots
            .iter()
            .map(|table| walker.extract_table(anchor, table))
            .collect();
        let out = ResultAssembler::assemble(plan, &extracted);

        for (id, table) in &out {
            let empty = match table {
                Value::Array(rows) => rows.is_empty(),
                Value::Object(fields) => fields.is_empty(),
                _ => false,
            };
            if empty {
                warn!("\"{}\" table is empty", id);
            }
        }

        Value::Object(out)
    }
}
