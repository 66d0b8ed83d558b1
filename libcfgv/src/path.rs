//! Path expressions.
//!
//! ```text
//! path    := segment ('.'? segment)*
//! segment := KEY | INDEX | '$' INDEX
//! ```
//!
//! `KEY` (letters or `_`, case-insensitive) selects every value stored under
//! that key in the first node of the working set. `INDEX` picks one node of
//! the working set. `$INDEX` picks one token of the first node and must end
//! the path.

use crate::error::{Error, Result};
use crate::escape;
use crate::value::{normalize_key, ValueNode};
use tracing::trace;

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Descend into every value under a (normalized) key.
    Key(String),
    /// Select one node of the working set.
    Index(usize),
    /// Select one token of the current node.
    Token(usize),
}

fn is_key_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Parse a path expression into segments.
pub fn parse_path(path: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut chars = path.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if segments.last().is_some_and(|s| matches!(s, Segment::Token(_))) {
            return Err(Error::TokenIndexNotLast(path.to_string()));
        }

        if c == '.' {
            chars.next();
        } else if is_key_char(c) {
            let mut end = path.len();
            while let Some(&(i, c)) = chars.peek() {
                if !is_key_char(c) {
                    end = i;
                    break;
                }
                chars.next();
            }
            segments.push(Segment::Key(normalize_key(&path[start..end])));
        } else if c.is_ascii_digit() {
            segments.push(Segment::Index(take_index(path, &mut chars)?));
        } else if c == '$' {
            chars.next();
            if !chars.peek().is_some_and(|(_, c)| c.is_ascii_digit()) {
                return Err(Error::PathSymbol('$', '$' as u32, path.to_string()));
            }
            segments.push(Segment::Token(take_index(path, &mut chars)?));
        } else {
            return Err(Error::PathSymbol(c, c as u32, path.to_string()));
        }
    }

    Ok(segments)
}

fn take_index(
    path: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> Result<usize> {
    let mut digits = String::new();
    while let Some((_, c)) = chars.next_if(|(_, c)| c.is_ascii_digit()) {
        digits.push(c);
    }
    digits
        .parse::<usize>()
        .map_err(|_| Error::PathIndex(path.to_string()))
}

impl ValueNode {
    /// Every node matched by `path`. An empty path matches this node; any
    /// failed lookup yields an empty list.
    pub fn get_all_by_path(&self, path: &str) -> Result<Vec<&ValueNode>> {
        let segments = parse_path(path)?;
        let mut targets: Vec<&ValueNode> = vec![self];

        for segment in &segments {
            match segment {
                Segment::Key(key) => {
                    let Some(first) = targets.first().copied() else {
                        return Ok(Vec::new());
                    };
                    targets = first.get_all(key).iter().collect();
                }
                Segment::Index(index) => match targets.get(*index).copied() {
                    Some(target) => targets = vec![target],
                    None => return Ok(Vec::new()),
                },
                Segment::Token(index) => {
                    let Some(first) = targets.first().copied() else {
                        return Ok(Vec::new());
                    };
                    match first.tokens()?.get(*index) {
                        Some(token) => targets = vec![token],
                        None => return Ok(Vec::new()),
                    }
                }
            }
            if targets.is_empty() {
                return Ok(targets);
            }
        }

        Ok(targets)
    }

    /// First node matched by `path`.
    pub fn get_by_path(&self, path: &str) -> Result<Option<&ValueNode>> {
        Ok(self.get_all_by_path(path)?.into_iter().next())
    }

    /// Node at `path`, or a scalar node built from `default`.
    pub fn get_by_path_or(&self, path: &str, default: impl std::fmt::Display) -> Result<ValueNode> {
        Ok(self
            .get_by_path(path)?
            .cloned()
            .unwrap_or_else(|| ValueNode::scalar(default.to_string())))
    }

    /// Whether `path` matches anything. Malformed paths match nothing.
    pub fn contains_path(&self, path: &str) -> bool {
        matches!(self.get_all_by_path(path), Ok(found) if !found.is_empty())
    }

    /// Write `value` at `path`, creating missing keys and padding sibling
    /// lists with empty nodes as needed.
    ///
    /// The node at the end of the path receives `value` through
    /// [`ValueNode::merge`]. A trailing `$N` instead replaces token `N` of
    /// the addressed node with the first token of `value` and re-renders
    /// that node's scalar.
    pub fn set_by_path(&mut self, path: &str, value: ValueNode) -> Result<()> {
        let segments = parse_path(path)?;
        set_in_node(self, &segments, value)
    }
}

fn set_in_node(node: &mut ValueNode, segments: &[Segment], value: ValueNode) -> Result<()> {
    let Some((segment, rest)) = segments.split_first() else {
        node.merge(value);
        return Ok(());
    };

    match segment {
        Segment::Key(key) => {
            let list = node.children_mut().entry(key.clone()).or_default();
            if list.is_empty() {
                trace!(key = %key, "creating missing path key");
                list.push(ValueNode::new());
            }
            set_in_list(key, list, rest, value)
        }
        Segment::Index(0) => set_in_node(node, rest, value),
        Segment::Index(index) => Err(Error::IndexOutOfRange {
            key: String::new(),
            index: *index,
            len: 1,
        }),
        Segment::Token(index) => set_token(node, *index, value),
    }
}

fn set_in_list(
    key: &str,
    list: &mut Vec<ValueNode>,
    segments: &[Segment],
    value: ValueNode,
) -> Result<()> {
    match segments.split_first() {
        Some((Segment::Index(index), rest)) => {
            if list.len() <= *index {
                trace!(key = %key, from = list.len(), to = index + 1, "padding sibling list");
                list.resize_with(index + 1, ValueNode::new);
            }
            set_in_node(&mut list[*index], rest, value)
        }
        _ => set_in_node(&mut list[0], segments, value),
    }
}

fn set_token(node: &mut ValueNode, index: usize, value: ValueNode) -> Result<()> {
    let replacement = match value.tokens()?.first() {
        Some(token) => token.raw().unwrap_or_default().to_string(),
        None => String::new(),
    };
    let mut tokens = node.token_strings()?;
    if tokens.len() <= index {
        tokens.resize(index + 1, String::new());
    }
    tokens[index] = replacement;
    node.set_raw(Some(escape::render_tokens(&tokens)));
    Ok(())
}
