use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use xmltab::{ConfigError, Encoding, Error, ParserOptions, ParserType, SourceError, XmlParser};

const CLUSTER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<cluster>
    <table name="summary">
        <header><th>host</th><th type="int">cpus</th></header>
        <rows>
            alpha, 4
            beta, 8
        </rows>
    </table>
    <container name="c1">
        <node name="n1">
            <table name="info">primary</table>
            <table name="images">a.png</table>
        </node>
        <node name="n2">
            <table name="info">backup</table>
        </node>
    </container>
</cluster>
"#;

fn write(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn custom(dir: &TempDir, config: Value, document: &str) -> Result<Value, Error> {
    let config_path = write(dir, "tables.json", config.to_string().as_bytes());
    let xml_path = write(dir, "doc.xml", document.as_bytes());
    XmlParser::custom(&config_path)?.parse(&xml_path)
}

#[test]
fn raw_file_matches_raw_string() {
    let dir = TempDir::new().unwrap();
    let xml_path = write(&dir, "doc.xml", CLUSTER.as_bytes());

    let parser = XmlParser::raw();
    let from_file = parser.parse(&xml_path).unwrap();
    assert_eq!(from_file, parser.parse_str(CLUSTER).unwrap());
    assert_eq!(from_file["cluster"]["container"]["node"][1]["@name"], "n2");
}

#[test]
fn child_tables_follow_parent_rows() {
    let dir = TempDir::new().unwrap();
    let out = custom(
        &dir,
        json!({
            "TREE": {"NODES": {"IMAGES": {}}},
            "NODES": ["container*,node*,table,info"],
            "IMAGES": ["table,images"]
        }),
        CLUSTER,
    )
    .unwrap();

    assert_eq!(
        out,
        json!({
            "NODES": [
                {"container": "c1", "node": "n1", "info": "primary", "IMAGES": {"images": "a.png"}},
                {"container": "c1", "node": "n2", "info": "backup", "IMAGES": {}}
            ]
        })
    );
}

#[test]
fn header_and_rows_become_columns() {
    let dir = TempDir::new().unwrap();
    let out = custom(
        &dir,
        json!({
            "TREE": {"SUMMARY": {}},
            "SUMMARY": ["table,summary"]
        }),
        CLUSTER,
    )
    .unwrap();

    assert_eq!(
        out,
        json!({"SUMMARY": {"summary": {"host": ["alpha", "beta"], "cpus": ["4", "8"]}}})
    );
}

#[test]
fn keys_selection_filters_columns() {
    let dir = TempDir::new().unwrap();
    let out = custom(
        &dir,
        json!({
            "TREE": {"SUMMARY": {"KEYS": "host"}},
            "SUMMARY": ["table,summary"]
        }),
        CLUSTER,
    )
    .unwrap();

    assert_eq!(out, json!({"SUMMARY": {"summary": {"host": ["alpha", "beta"]}}}));
}

#[test]
fn missing_branches_yield_empty_tables() {
    let dir = TempDir::new().unwrap();
    let out = custom(
        &dir,
        json!({
            "TREE": {"DISKS": {}, "SETTINGS": {}},
            "DISKS": ["container*,disk*,size"],
            "SETTINGS": ["settings,timeout"]
        }),
        CLUSTER,
    )
    .unwrap();

    assert_eq!(out, json!({"DISKS": [], "SETTINGS": {}}));
}

#[test]
fn tables_keep_tree_order() {
    let dir = TempDir::new().unwrap();
    let out = custom(
        &dir,
        json!({
            "TREE": {"Z": {}, "A": {}},
            "Z": ["table,summary"],
            "A": ["container*,node*,table,info"]
        }),
        CLUSTER,
    )
    .unwrap();

    let ids: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
    assert_eq!(ids, vec!["Z", "A"]);
}

#[test]
fn cyclic_configuration_fails_at_construction() {
    let dir = TempDir::new().unwrap();
    let config_path = write(
        &dir,
        "tables.json",
        json!({
            "TREE": {"A": {"B": {}}, "B": {"A": {}}},
            "A": ["x,y"],
            "B": ["x,z"]
        })
        .to_string()
        .as_bytes(),
    );

    let err = XmlParser::custom(&config_path).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::CyclicTree { .. })));
}

#[test]
fn invalid_path_fails_at_construction() {
    let dir = TempDir::new().unwrap();
    let err = custom(
        &dir,
        json!({"TREE": {"A": {}}, "A": ["onlyone"]}),
        CLUSTER,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::TooFewTokens { .. })));
}

#[test]
fn missing_configuration_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let err = XmlParser::custom(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::Io { .. })));
}

#[test]
fn missing_document_is_source_error() {
    let dir = TempDir::new().unwrap();
    let err = XmlParser::raw().parse(dir.path().join("absent.xml")).unwrap_err();
    assert!(matches!(err, Error::Source(SourceError::Io { .. })));
}

#[test]
fn latin1_documents_decode() {
    let dir = TempDir::new().unwrap();
    let xml_path = write(&dir, "doc.xml", b"<root><name>caf\xe9</name></root>");

    let latin1 = XmlParser::new(
        ParserOptions::default()
            .with_parser_type(ParserType::Raw)
            .with_encoding(Encoding::Latin1),
    )
    .unwrap();
    assert_eq!(latin1.parse(&xml_path).unwrap(), json!({"root": {"name": "café"}}));

    let err = XmlParser::raw().parse(&xml_path).unwrap_err();
    assert!(matches!(err, Error::Source(SourceError::Decode { .. })));
}

#[test]
fn key_overrides_apply_to_file_parsing() {
    let dir = TempDir::new().unwrap();
    let config_path = write(
        &dir,
        "tables.json",
        json!({"TABLES": {"HOSTS": {}}, "HOSTS": ["host*,entry,addr"]})
            .to_string()
            .as_bytes(),
    );
    let xml_path = write(
        &dir,
        "doc.xml",
        br#"<root><host id="h1"><entry id="addr">10.0.0.1</entry></host></root>"#,
    );

    let parser = XmlParser::new(
        ParserOptions::default()
            .with_parser_type(ParserType::Custom)
            .with_config_file(&config_path)
            .with_sections(xmltab::SectionKeys {
                tree: String::from("TABLES"),
                ..Default::default()
            })
            .with_keys(xmltab::KeyConventions {
                name_key: String::from("@id"),
                ..Default::default()
            }),
    )
    .unwrap();

    assert_eq!(
        parser.parse(&xml_path).unwrap(),
        json!({"HOSTS": [{"host": "h1", "addr": "10.0.0.1"}]})
    );
}

#[test]
fn raw_mode_keeps_mixed_content_text() {
    let value = XmlParser::raw()
        .parse_str("<root><p>hello <b>x</b> world</p></root>")
        .unwrap();
    assert_eq!(value, json!({"root": {"p": {"b": "x", "#text": "hello  world"}}}));
}

#[test]
fn child_tables_nest_under_wildcard_terminal_steps() {
    let dir = TempDir::new().unwrap();
    let out = custom(
        &dir,
        json!({
            "TREE": {"N": {"C": {}}},
            "N": ["node*,info"],
            "C": ["table,images"]
        }),
        r#"<root>
            <node name="n1"><info>x</info><table name="images">a.png</table></node>
            <node name="n2"><info>y</info><table name="images">b.png</table></node>
        </root>"#,
    )
    .unwrap();

    assert_eq!(
        out,
        json!({"N": [
            {"node": "n1", "info": "x", "C": {"images": "a.png"}},
            {"node": "n2", "info": "y", "C": {"images": "b.png"}}
        ]})
    );
}

#[test]
fn rows_opened_by_children_keep_document_order() {
    let dir = TempDir::new().unwrap();
    let out = custom(
        &dir,
        json!({
            "TREE": {"N": {"C": {}}},
            "N": ["node*,table,info"],
            "C": ["table,images"]
        }),
        r#"<root>
            <node name="n1"><table name="images">a</table></node>
            <node name="n2">
                <table name="info">primary</table>
                <table name="images">b</table>
            </node>
        </root>"#,
    )
    .unwrap();

    assert_eq!(
        out,
        json!({"N": [
            {"node": "n1", "C": {"images": "a"}},
            {"node": "n2", "info": "primary", "C": {"images": "b"}}
        ]})
    );
}

#[test]
fn empty_single_table_keeps_its_children() {
    let dir = TempDir::new().unwrap();
    let out = custom(
        &dir,
        json!({
            "TREE": {"P": {"C": {}}},
            "P": ["site,info"],
            "C": ["site,detail"]
        }),
        "<root><site><detail>d</detail></site></root>",
    )
    .unwrap();

    assert_eq!(out, json!({"P": {"C": {"detail": "d"}}}));
}
