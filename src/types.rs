use crate::error::ConfigError;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// One navigation step of a path, e.g. `node*` or `table` (target `info`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    /// Tag to look up; empty for a bare `*` that matches any child element
    pub tag: String,

    /// Output field read from this step; only set on the last segment of a path
    pub target: Option<String>,

    /// Fan out over every instance under this step instead of merging them
    pub wildcard: bool,
}

impl Segment {
    pub fn new(tag: impl Into<String>) -> Self {
        Segment {
            tag: tag.into(),
            target: None,
            wildcard: false,
        }
    }

    pub fn wildcard(tag: impl Into<String>) -> Self {
        Segment {
            wildcard: true,
            ..Segment::new(tag)
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// A bare `*` step, matching every child element whatever its tag
    pub fn matches_any_tag(&self) -> bool {
        self.wildcard && self.tag.is_empty()
    }
}

/// A compiled path: navigation segments ending in a target field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSpec {
    segments: Vec<Segment>,
}

impl PathSpec {
    /// Callers guarantee a non-empty sequence whose last segment alone has a target
    pub(crate) fn from_segments(segments: Vec<Segment>) -> Self {
        debug_assert!(!segments.is_empty());
        debug_assert!(segments.last().is_some_and(|s| s.target.is_some()));
        PathSpec { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The name of the field this path populates
    pub fn target(&self) -> &str {
        self.segments
            .last()
            .and_then(|s| s.target.as_deref())
            .unwrap_or_default()
    }

    pub fn has_wildcard(&self) -> bool {
        self.segments.iter().any(|s| s.wildcard)
    }

    pub fn wildcard_count(&self) -> usize {
        self.segments.iter().filter(|s| s.wildcard).count()
    }

    /// Resolve a child path below this parent path
    ///
    /// The parent's terminal step stays as plain navigation. A child starting
    /// with the same tag as a non-wildcard terminal step continues from that
    /// step's container instead, so `node*,table,info` under
    /// `table,images` gives `node*,table,images`. Also returns how many
    /// wildcard steps the child shares with the parent.
    pub(crate) fn nested_under(&self, parent: &PathSpec) -> (PathSpec, usize) {
        let Some((terminal, anchor)) = parent.segments.split_last() else {
            return (self.clone(), 0);
        };

        let mut segments = anchor.to_vec();
        let restated = !terminal.wildcard
            && self
                .segments
                .first()
                .is_some_and(|first| first.tag == terminal.tag);
        if !restated {
            segments.push(Segment {
                target: None,
                ..terminal.clone()
            });
        }

        let shared = segments.iter().filter(|s| s.wildcard).count();
        segments.extend(self.segments.iter().cloned());
        (PathSpec { segments }, shared)
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            f.write_str(&segment.tag)?;
            if segment.wildcard {
                f.write_str("*")?;
            }
            if let Some(target) = &segment.target {
                write!(f, ",{}", target)?;
            }
        }
        Ok(())
    }
}

/// A path made absolute by the tree composer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: PathSpec,

    /// Index of the parent table's route this one was derived from
    pub parent_route: Option<usize>,

    /// Leading wildcard labels shared with the parent route's records
    pub inherited: usize,
}

impl Route {
    pub fn depth(&self) -> usize {
        self.path.wildcard_count()
    }
}

/// Identifies which wildcard instance a record was found under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchLabel {
    /// Tag of the wildcard step (the matched tag for a bare `*`)
    pub tag: String,

    /// Name attribute of the instance, or its ordinal if it has none
    pub label: String,
}

/// One extracted leaf value
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Index of the route that produced this record
    pub route: usize,

    pub branch: Vec<BranchLabel>,

    /// Position of each branch instance among its siblings, aligned with `branch`
    pub order: Vec<usize>,

    pub field: String,

    pub value: Value,
}

/// Key names used to read leaves out of the raw mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyConventions {
    /// Attribute naming an element, used to match targets and label branches
    pub name_key: String,

    /// Entry under the header holding one column title
    pub table_key: String,

    /// Element holding the column titles of a table-shaped leaf
    pub header_key: String,

    /// Element holding the comma separated rows of a table-shaped leaf
    pub data_key: String,

    /// Text key of an attributed element
    pub header_text_key: String,
}

impl Default for KeyConventions {
    fn default() -> Self {
        KeyConventions {
            name_key: String::from("@name"),
            table_key: String::from("th"),
            header_key: String::from("header"),
            data_key: String::from("rows"),
            header_text_key: String::from("#text"),
        }
    }
}

/// How `parse` treats a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserType {
    /// Return the raw mapping untouched
    #[default]
    Raw,
    /// Project the document through a table configuration
    Custom,
}

impl FromStr for ParserType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(ParserType::Raw),
            "custom" => Ok(ParserType::Custom),
            other => Err(ConfigError::InvalidParserType(other.to_string())),
        }
    }
}

impl fmt::Display for ParserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserType::Raw => f.write_str("raw"),
            ParserType::Custom => f.write_str("custom"),
        }
    }
}

/// Character encodings the document loader can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Ascii,
    Latin1,
}

impl Encoding {
    /// Decode raw bytes, returning None when they are invalid for this encoding
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                String::from_utf8(bytes.to_vec()).ok()
            }
            Encoding::Ascii => bytes
                .is_ascii()
                .then(|| bytes.iter().map(|&b| b as char).collect()),
            // ISO-8859-1 maps every byte onto the code point of the same value
            Encoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

impl FromStr for Encoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "ascii" | "us-ascii" => Ok(Encoding::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            _ => Err(ConfigError::UnsupportedEncoding(s.to_string())),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Utf8 => f.write_str("utf-8"),
            Encoding::Ascii => f.write_str("ascii"),
            Encoding::Latin1 => f.write_str("iso-8859-1"),
        }
    }
}
