//! Raw XML to mapping conversion
//!
//! Follows the xmltodict layout: attributes become `@name` keys, text next to
//! attributes or children goes under `#text`, text-only elements collapse to a
//! string, empty elements become null and repeated siblings become a list.

use crate::error::SourceError;
use crate::types::Encoding;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use std::path::Path;

pub const ATTRIBUTE_PREFIX: &str = "@";
pub const TEXT_KEY: &str = "#text";

/// An element still waiting for its end tag
struct Frame {
    tag: String,
    map: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, quick_xml::Error> {
        let mut map = Map::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = format!(
                "{}{}",
                ATTRIBUTE_PREFIX,
                String::from_utf8_lossy(attr.key.as_ref())
            );
            map.insert(key, Value::String(attr.unescape_value()?.into_owned()));
        }

        Ok(Frame {
            tag: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            map,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let text = self.text.trim();
        let value = if self.map.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            }
        } else {
            let mut map = self.map;
            if !text.is_empty() {
                map.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
            }
            Value::Object(map)
        };
        (self.tag, value)
    }
}

/// Add a child under its tag, turning repeated tags into a list
fn attach(map: &mut Map<String, Value>, tag: String, value: Value) {
    match map.get_mut(&tag) {
        None => {
            map.insert(tag, value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

/// Parse an XML document into a raw mapping `{root_tag: ...}`
pub fn parse_str(xml: &str) -> Result<Value, SourceError> {
    // Text chunks stay verbatim; Frame::close trims the joined text
    let mut reader = Reader::from_str(xml);

    let mut buf = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    let xml_err = |reader: &Reader<&[u8]>, source: quick_xml::Error| SourceError::Xml {
        position: reader.buffer_position() as u64,
        source,
    };

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_err(&reader, e))?;

        match event {
            Event::Start(e) => {
                if let Some((tag, _)) = &root {
                    return Err(SourceError::TrailingContent { root: tag.clone() });
                }
                stack.push(Frame::open(&e).map_err(|err| xml_err(&reader, err))?);
            }
            Event::Empty(e) => {
                if let Some((tag, _)) = &root {
                    return Err(SourceError::TrailingContent { root: tag.clone() });
                }
                let (tag, value) = Frame::open(&e).map_err(|err| xml_err(&reader, err))?.close();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.map, tag, value),
                    None => root = Some((tag, value)),
                }
            }
            Event::End(_) => {
                // quick-xml verifies that end tags match their start tags
                if let Some(frame) = stack.pop() {
                    let (tag, value) = frame.close();
                    match stack.last_mut() {
                        Some(parent) => attach(&mut parent.map, tag, value),
                        None => root = Some((tag, value)),
                    }
                }
            }
            Event::Text(e) => {
                if let Some(frame) = stack.last_mut() {
                    let text = e.unescape().map_err(|err| xml_err(&reader, err))?;
                    frame.text.push_str(&text);
                }
            }
            Event::CData(e) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => break,
            // declarations, comments, processing instructions and doctypes carry no data
            _ => {}
        }
        buf.clear();
    }

    if let Some(frame) = stack.pop() {
        return Err(SourceError::Unclosed { tag: frame.tag });
    }

    let (tag, value) = root.ok_or(SourceError::Empty)?;
    let mut doc = Map::new();
    doc.insert(tag, value);
    Ok(Value::Object(doc))
}

/// Read, decode and parse an XML file
pub fn load_file<P: AsRef<Path>>(path: P, encoding: Encoding) -> Result<Value, SourceError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let xml = encoding.decode(&bytes).ok_or_else(|| SourceError::Decode {
        encoding: encoding.to_string(),
    })?;
    parse_str(&xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_only_and_empty_elements() {
        let value = parse_str("<root><a>hello</a><b/><c></c></root>").unwrap();
        assert_eq!(value, json!({"root": {"a": "hello", "b": null, "c": null}}));
    }

    #[test]
    fn test_attributes_and_text() {
        let value = parse_str(r#"<root><th type="s">host</th><n id="1"/></root>"#).unwrap();
        assert_eq!(
            value,
            json!({"root": {
                "th": {"@type": "s", "#text": "host"},
                "n": {"@id": "1"}
            }})
        );
    }

    #[test]
    fn test_repeated_siblings_become_list_in_order() {
        let value = parse_str(
            r#"<root>
                <node name="n1"/>
                <other>x</other>
                <node name="n2"/>
                <node name="n3"/>
            </root>"#,
        )
        .unwrap();

        let root = &value["root"];
        let names: Vec<_> = root["node"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["@name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["n1", "n2", "n3"]);

        let keys: Vec<_> = root.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["node", "other"]);
    }

    #[test]
    fn test_cdata_escapes_and_comments() {
        let value = parse_str(
            "<?xml version='1.0'?><!-- note --><root><rows><![CDATA[a,b\nc,d]]></rows><t>&lt;x&gt;</t></root>",
        )
        .unwrap();
        assert_eq!(value, json!({"root": {"rows": "a,b\nc,d", "t": "<x>"}}));
    }

    #[test]
    fn test_mixed_content_keeps_inner_whitespace() {
        let value = parse_str("<root><p>hello <b>x</b> world</p></root>").unwrap();
        assert_eq!(
            value,
            json!({"root": {"p": {"b": "x", "#text": "hello  world"}}})
        );
    }

    #[test]
    fn test_whitespace_between_elements_is_dropped() {
        let value = parse_str("<root>\n  <a> padded </a>\n  <b k=\"v\">\n  </b>\n</root>").unwrap();
        assert_eq!(value, json!({"root": {"a": "padded", "b": {"@k": "v"}}}));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(parse_str(""), Err(SourceError::Empty)));
        assert!(matches!(parse_str("<a><b></a>"), Err(SourceError::Xml { .. })));
        assert!(matches!(parse_str("<a><b>"), Err(SourceError::Unclosed { .. }) | Err(SourceError::Xml { .. })));
        assert!(matches!(parse_str("<a/><b/>"), Err(SourceError::TrailingContent { .. })));
    }
}
