//! CFGV hierarchical configuration format.
//!
//! A CFGV document is a tree of named nodes, one per line. Indentation nests
//! a line under the line above it, the first word is the key, and the rest of
//! the line is the node's scalar:
//!
//! ```text
//! server main
//!   port 8080
//!   port 8443
//!   motd "Hello,\tworld"
//! ```
//!
//! # Parsing Pipeline
//!
//! 1. **Scanner**: Splits source text into data lines, extracting the
//!    indentation run, the key and the scalar remainder.
//!
//! 2. **Tree Parser**: Nests lines by indentation into a [`ValueNode`] tree,
//!    validating that sibling lines use identical indentation characters.
//!
//! Scalars are kept as written and tokenized lazily. Path expressions such
//! as `server.port.1` or `list.$0` address nodes inside a tree, and the
//! [`Mapper`] converts trees to and from typed records.

mod encode;
mod error;
pub mod escape;
mod file;
mod mapper;
mod parser;
mod path;
mod scanner;
mod value;

pub use encode::{encode, encode_to_writer, INDENT};
pub use error::{Error, ErrorKind, Result};
pub use file::{from_file, load_file, save_file, save_to_writer, to_file, LoadOptions, MissingFile};
pub use mapper::{
    Codec, Configurable, Descriptor, Element, Field, FieldKind, FieldMeta, Mapper, Registry,
    Schema, Target, TypeKey, COLLECTION_KEY, DEFAULT_MAX_DEPTH,
};
pub use parser::ParseOptions;
pub use path::{parse_path, Segment};
pub use value::{normalize_key, ValueNode};

use tracing::debug;

/// Parse a CFGV document from a string.
///
/// # Example
///
/// ```
/// use libcfgv::parse;
///
/// let tree = parse("key value\n  key inner").unwrap();
/// assert_eq!(tree.get_by_path("key.key").unwrap().unwrap().raw(), Some("inner"));
/// ```
pub fn parse(input: &str) -> Result<ValueNode> {
    parse_with_options(input, &ParseOptions::default())
}

/// Parse a CFGV document from a string with a filename for error messages.
pub fn parse_with_filename(input: &str, filename: Option<&str>) -> Result<ValueNode> {
    let options = ParseOptions {
        filename: filename.map(String::from),
        ..ParseOptions::default()
    };
    parse_with_options(input, &options)
}

/// Parse a CFGV document with explicit settings.
pub fn parse_with_options(input: &str, options: &ParseOptions) -> Result<ValueNode> {
    let ctx = error::ParseContext::new(options.filename.as_deref());

    // Phase 1: Scan source into lines
    let lines = scanner::scan(input);
    debug!(lines = lines.len(), filename = ?options.filename, "scanned document");

    // Phase 2: Nest lines into a tree
    parser::parse_root(&lines, &ctx, options.max_depth)
}

/// Decode a record from a tree with the global registry.
pub fn from_tree<T: Configurable>(tree: &ValueNode) -> Result<T> {
    Mapper::global().decode(tree)
}

/// Parse text and decode a record with the global registry.
pub fn from_str<T: Configurable>(input: &str) -> Result<T> {
    from_tree(&parse(input)?)
}

/// Encode a record into a tree with the global registry.
pub fn to_tree<T: Configurable>(value: &T) -> Result<ValueNode> {
    Mapper::global().encode(value)
}

/// Encode a record to CFGV text with the global registry.
pub fn to_string<T: Configurable>(value: &T) -> Result<String> {
    Ok(encode(&to_tree(value)?))
}

/// Decode a homogeneous list with the global registry.
pub fn list_from_tree<E: 'static>(tree: &ValueNode) -> Result<Vec<E>> {
    Mapper::global().decode_list(tree)
}

/// Encode a list as repeated `item` children with the global registry.
pub fn list_to_tree<E: 'static>(items: &[E]) -> Result<ValueNode> {
    Mapper::global().encode_list(items)
}
