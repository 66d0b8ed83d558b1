//! Error types for CFGV parsing, path evaluation and object mapping.

use thiserror::Error;

/// Result type for CFGV operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Parse context carrying filename for error reporting.
#[derive(Clone, Debug)]
pub struct ParseContext {
    pub filename: Option<String>,
}

impl ParseContext {
    /// Create a new parse context.
    pub fn new(filename: Option<&str>) -> Self {
        Self {
            filename: filename.map(String::from),
        }
    }

    /// Format a location suffix for error messages.
    pub fn loc_suffix(&self, line: usize, col: usize) -> String {
        match &self.filename {
            Some(name) => format!(" at {}:{} of <{}>", line + 1, col + 1, name),
            None => format!(" at {}:{}", line + 1, col + 1),
        }
    }
}

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed indentation, quoting, path syntax or collection shape.
    Format,
    /// A scalar could not be converted to the requested type.
    Parse,
    /// A polymorphic type name could not be resolved.
    TypeLoad,
    /// No scalar codec or record schema is registered for a type.
    UnsupportedType,
    /// `set_at` addressed a slot that does not exist.
    IndexOutOfRange,
    /// File wrapper I/O failure.
    Io,
}

/// Error type for CFGV operations.
#[derive(Error, Debug)]
pub enum Error {
    /// First data line is indented.
    #[error("Invalid root indentation level ({0}), expected no indentation at the beginning of config{1}")]
    RootIndent(usize, String),

    /// Same indentation width made of different characters.
    #[error("Indentation levels don't match (check spaces and tabs){0}")]
    IndentMismatch(String),

    /// Nesting deeper than the configured limit.
    #[error("Nesting exceeds maximum depth of {0}{1}")]
    TooDeep(usize, String),

    /// Quoted scalar without its closing quote.
    #[error("Unterminated quoted string{0}")]
    UnterminatedString(String),

    /// Unexpected character in a path expression.
    #[error("Unexpected symbol '{0}' ({1}) in path \"{2}\"")]
    PathSymbol(char, u32, String),

    /// Index in a path expression does not fit in usize.
    #[error("Index out of bounds in path \"{0}\"")]
    PathIndex(String),

    /// `$N` token indexation followed by more segments.
    #[error("Indexation must be the last operation in path \"{0}\"")]
    TokenIndexNotLast(String),

    /// Collection decoded from a tree with several distinct keys.
    #[error("Collection can only contain values with the same identifier, found keys {0:?}")]
    MixedCollection(Vec<String>),

    /// Scalar conversion failure.
    #[error("Cannot parse {0:?} as {1}")]
    InvalidValue(String, &'static str),

    /// Conversion requested on a node without a scalar.
    #[error("No value to convert to {0}")]
    EmptyValue(&'static str),

    /// Discriminator names an unknown type.
    #[error("Cannot find type with name '{0}'")]
    TypeNotFound(String),

    /// Polymorphic field without a type name to resolve.
    #[error("Cannot find type name for field '{0}'")]
    MissingTypeName(String),

    /// Encoded value has no registered name for its declared base.
    #[error("Cannot find name for type '{0}'")]
    TypeNameNotFound(&'static str),

    /// No codec or schema registered.
    #[error("Type '{0}' is not supported (no codec or schema registered)")]
    UnsupportedType(&'static str),

    /// Overwrite of a missing slot.
    #[error("Index {index} is out of range for key '{key}' holding {len} value(s)")]
    IndexOutOfRange {
        key: String,
        index: usize,
        len: usize,
    },

    /// File wrapper I/O failure.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::RootIndent(..)
            | Error::IndentMismatch(_)
            | Error::TooDeep(..)
            | Error::UnterminatedString(_)
            | Error::PathSymbol(..)
            | Error::PathIndex(_)
            | Error::TokenIndexNotLast(_)
            | Error::MixedCollection(_) => ErrorKind::Format,
            Error::InvalidValue(..) | Error::EmptyValue(_) => ErrorKind::Parse,
            Error::TypeNotFound(_) | Error::MissingTypeName(_) | Error::TypeNameNotFound(_) => {
                ErrorKind::TypeLoad
            }
            Error::UnsupportedType(_) => ErrorKind::UnsupportedType,
            Error::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Create an error with location information.
    pub fn with_location(self, ctx: &ParseContext, line: usize, col: usize) -> Self {
        let suffix = ctx.loc_suffix(line, col);
        match self {
            Error::RootIndent(n, _) => Error::RootIndent(n, suffix),
            Error::IndentMismatch(_) => Error::IndentMismatch(suffix),
            Error::TooDeep(n, _) => Error::TooDeep(n, suffix),
            Error::UnterminatedString(_) => Error::UnterminatedString(suffix),
            other => other,
        }
    }
}
