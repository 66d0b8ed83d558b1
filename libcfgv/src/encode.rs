//! Encode CFGV trees back to text.
//!
//! Children are written depth first in key insertion order, then sibling
//! order, one line per node: `<indent><key>[ <scalar>]`.

use crate::escape;
use crate::value::ValueNode;
use std::io::{self, Write};

/// Indentation unit written for each nesting level.
pub const INDENT: &str = "  ";

/// Encode a tree to CFGV text. The root's own scalar is not written.
pub fn encode(tree: &ValueNode) -> String {
    let mut out = String::new();
    encode_children(&mut out, tree, 0);
    out
}

/// Encode a tree into a writer.
pub fn encode_to_writer<W: Write>(tree: &ValueNode, mut writer: W) -> io::Result<()> {
    writer.write_all(encode(tree).as_bytes())
}

fn encode_children(out: &mut String, node: &ValueNode, depth: usize) {
    let pad = INDENT.repeat(depth);
    for (key, values) in node.entries() {
        for value in values {
            out.push_str(&pad);
            out.push_str(key);
            if let Some(scalar) = encode_scalar(value) {
                out.push(' ');
                out.push_str(&scalar);
            }
            out.push('\n');
            encode_children(out, value, depth + 1);
        }
    }
}

/// Scalar text for one line, or `None` when the node has no scalar.
///
/// A raw scalar that tokenizes and stays on one line is kept as written.
/// Otherwise its tokens are re-quoted, or, when it cannot be tokenized, the
/// whole scalar is quoted as one string.
fn encode_scalar(node: &ValueNode) -> Option<String> {
    let raw = node.raw()?;
    let scalar = match node.token_strings() {
        Ok(_) if raw.is_empty() => escape::quote(raw),
        Ok(_) if !raw.contains('\n') && raw.trim_matches([' ', '\t']) == raw => raw.to_string(),
        Ok(tokens) if tokens.is_empty() => escape::quote(raw),
        Ok(tokens) => escape::render_tokens(&tokens),
        Err(_) => escape::quote(raw),
    };
    Some(scalar)
}
