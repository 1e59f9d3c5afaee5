//! xmltab: Project XML documents into JSON tables
//!
//! Usage:
//!   # Raw XML to JSON conversion
//!   xmltab data.xml
//!   cat data.xml | xmltab
//!
//!   # Project tables described by a configuration
//!   xmltab --mode custom --config tables.json data.xml
//!
//!   # Override the key conventions and write compact output to a file
//!   xmltab --mode custom --config tables.json --name-key @id --compact -o out.json data.xml

// Use MiMalloc allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::PathBuf;
use tracing::Level;
use xmltab::{Encoding, ParserOptions, ParserType, SectionKeys, XmlParser};

#[derive(Parser, Debug)]
#[command(name = "xmltab")]
#[command(about = "Project XML documents into JSON tables", long_about = None)]
struct Args {
    /// XML document to parse (reads stdin when omitted)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Parsing mode: raw (plain conversion) or custom (table projection)
    #[arg(long, short = 'm', default_value = "raw")]
    mode: String,

    /// Projection configuration (required for custom mode)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Document encoding (utf-8, ascii, iso-8859-1)
    #[arg(long, default_value = "utf-8")]
    encoding: String,

    /// Write output to this file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,

    /// Log debug details to stderr
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Configuration entry describing the table tree (default: "TREE")
    #[arg(long)]
    tree_key: Option<String>,

    /// Tree entry selecting the keys a table keeps (default: "KEYS")
    #[arg(long)]
    keys_key: Option<String>,

    /// Attribute naming an element (default: "@name")
    #[arg(long)]
    name_key: Option<String>,

    /// Header entry holding a column title (default: "th")
    #[arg(long)]
    table_key: Option<String>,

    /// Element holding the column titles (default: "header")
    #[arg(long)]
    header_key: Option<String>,

    /// Element holding the rows (default: "rows")
    #[arg(long)]
    data_key: Option<String>,

    /// Text key of attributed elements (default: "#text")
    #[arg(long)]
    header_text_key: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    // Build options
    let mut options = ParserOptions {
        parser_type: args.mode.parse::<ParserType>()?,
        config_file: args.config,
        encoding: args.encoding.parse::<Encoding>()?,
        sections: SectionKeys::default(),
        ..ParserOptions::default()
    };
    if let Some(key) = args.tree_key {
        options.sections.tree = key;
    }
    if let Some(key) = args.keys_key {
        options.sections.keys = key;
    }
    if let Some(key) = args.name_key {
        options.keys.name_key = key;
    }
    if let Some(key) = args.table_key {
        options.keys.table_key = key;
    }
    if let Some(key) = args.header_key {
        options.keys.header_key = key;
    }
    if let Some(key) = args.data_key {
        options.keys.data_key = key;
    }
    if let Some(key) = args.header_text_key {
        options.keys.header_text_key = key;
    }

    let parser = XmlParser::new(options).context("Invalid parser configuration")?;
    let value = match &args.input {
        Some(path) => parser
            .parse(path)
            .with_context(|| format!("Failed to parse {}", path.display()))?,
        None => {
            let mut bytes = Vec::new();
            std::io::stdin()
                .read_to_end(&mut bytes)
                .context("Failed to read stdin")?;
            let document = parser
                .encoding()
                .decode(&bytes)
                .with_context(|| format!("stdin is not valid {}", parser.encoding()))?;
            parser.parse_str(&document).context("Failed to parse stdin")?
        }
    };

    let output = if args.compact {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };

    match args.output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            writeln!(writer, "{}", output).context("Failed to write output")?;
            writer.flush().context("Failed to flush output")?;
        }
        None => println!("{}", output),
    }

    Ok(())
}
