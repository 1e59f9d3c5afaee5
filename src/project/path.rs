//! Path string compilation
//!
//! A path is written `tag,tag*,...,tag,target`: comma separated navigation tags,
//! each optionally followed by `*`, ending in the name of the target field.

use crate::error::ConfigError;
use crate::types::{PathSpec, Segment};
use once_cell::sync::Lazy;
use regex::Regex;

// A navigation token: a tag with no `*` inside it, optionally marked wildcard
static NAV_TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<tag>[^*]*)(?P<wild>\*)?$").unwrap()
});

/// Compile a path string into a PathSpec
///
/// # Example
/// ```rust
/// use xmltab::project::compile;
///
/// let path = compile("container*,table,info").unwrap();
/// assert_eq!(path.len(), 2);
/// assert!(path.segments()[0].wildcard);
/// assert_eq!(path.target(), "info");
/// ```
pub fn compile(path: &str) -> Result<PathSpec, ConfigError> {
    if path.trim().is_empty() {
        return Err(ConfigError::EmptyPath);
    }

    let tokens: Vec<&str> = path.split(',').map(str::trim).collect();
    if tokens.len() < 2 {
        return Err(ConfigError::TooFewTokens { path: path.to_string() });
    }

    if let Some(position) = tokens.iter().position(|t| t.is_empty()) {
        return Err(ConfigError::EmptyToken {
            path: path.to_string(),
            position,
        });
    }

    let (target, navigation) = match tokens.split_last() {
        Some(split) => split,
        None => return Err(ConfigError::EmptyPath),
    };

    if target.contains('*') {
        return Err(ConfigError::WildcardTarget {
            path: path.to_string(),
            token: target.to_string(),
        });
    }

    let mut segments = Vec::with_capacity(navigation.len());
    for token in navigation {
        let Some(caps) = NAV_TOKEN_REGEX.captures(token) else {
            return Err(ConfigError::MisplacedWildcard {
                path: path.to_string(),
                token: token.to_string(),
            });
        };
        let tag = &caps["tag"];
        if caps.name("wild").is_some() {
            segments.push(Segment::wildcard(tag));
        } else {
            segments.push(Segment::new(tag));
        }
    }

    if let Some(last) = segments.last_mut() {
        last.target = Some(target.to_string());
    }

    Ok(PathSpec::from_segments(segments))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_plain_path() {
        let path = compile("a,b,name").unwrap();

        assert_eq!(path.len(), 2);
        assert_eq!(path.segments()[0], Segment::new("a"));
        assert_eq!(path.segments()[1], Segment::new("b").with_target("name"));
        assert!(!path.has_wildcard());
    }

    #[test]
    fn test_compile_is_deterministic() {
        assert_eq!(compile("a*,b,name").unwrap(), compile("a*,b,name").unwrap());
    }

    #[test]
    fn test_compile_wildcards() {
        let path = compile("a*,b,name").unwrap();
        assert!(path.segments()[0].wildcard);
        assert_eq!(path.segments()[0].tag, "a");
        assert!(!path.segments()[1].wildcard);

        let any = compile("*,table,info").unwrap();
        assert!(any.segments()[0].matches_any_tag());
    }

    #[test]
    fn test_compile_preserves_case_and_trims() {
        let path = compile(" Table , Info ").unwrap();
        assert_eq!(path.segments()[0].tag, "Table");
        assert_eq!(path.target(), "Info");
        assert_eq!(path.to_string(), "Table,Info");
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(compile(""), Err(ConfigError::EmptyPath)));
        assert!(matches!(compile("   "), Err(ConfigError::EmptyPath)));
        assert!(matches!(compile("table"), Err(ConfigError::TooFewTokens { .. })));
        assert!(matches!(
            compile("a,,name"),
            Err(ConfigError::EmptyToken { position: 1, .. })
        ));
        assert!(matches!(compile("a*b,name"), Err(ConfigError::MisplacedWildcard { .. })));
        assert!(matches!(compile("a**,name"), Err(ConfigError::MisplacedWildcard { .. })));
        assert!(matches!(compile("a,name*"), Err(ConfigError::WildcardTarget { .. })));
    }
}
