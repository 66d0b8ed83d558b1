//! Loading and saving trees and records on disk.

use crate::encode::encode_to_writer;
use crate::error::{Error, Result};
use crate::mapper::{Configurable, Mapper};
use crate::parser::ParseOptions;
use crate::value::ValueNode;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// What [`load_file`] does when the file does not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingFile {
    /// Return an empty tree.
    #[default]
    Empty,
    /// Return the I/O error.
    Error,
}

/// Settings for [`load_file`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub missing: MissingFile,
    /// Parser settings. The filename defaults to the loaded path.
    pub parse: ParseOptions,
}

impl LoadOptions {
    pub fn require_file(mut self) -> Self {
        self.missing = MissingFile::Error;
        self
    }
}

/// Parse the file at `path`.
pub fn load_file(path: impl AsRef<Path>, options: &LoadOptions) -> Result<ValueNode> {
    let path = path.as_ref();
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound && options.missing == MissingFile::Empty => {
            debug!(path = %path.display(), "config file missing, using empty tree");
            return Ok(ValueNode::new());
        }
        Err(e) => return Err(Error::Io(e)),
    };
    let mut parse = options.parse.clone();
    if parse.filename.is_none() {
        parse.filename = Some(path.display().to_string());
    }
    crate::parse_with_options(&text, &parse)
}

/// Serialize `tree` into the file at `path`, replacing its contents.
pub fn save_file(path: impl AsRef<Path>, tree: &ValueNode) -> Result<()> {
    let path = path.as_ref();
    debug!(path = %path.display(), "saving config file");
    let mut writer = BufWriter::new(File::create(path)?);
    save_to_writer(tree, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Serialize `tree` into `writer`.
pub fn save_to_writer<W: Write>(tree: &ValueNode, writer: W) -> Result<()> {
    encode_to_writer(tree, writer)?;
    Ok(())
}

/// Load and decode a record with the global registry.
pub fn from_file<T: Configurable>(path: impl AsRef<Path>, options: &LoadOptions) -> Result<T> {
    let tree = load_file(path, options)?;
    Mapper::global().decode(&tree)
}

/// Encode a record with the global registry and save it.
pub fn to_file<T: Configurable>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let tree = Mapper::global().encode(value)?;
    save_file(path, &tree)
}
