//! Phase 2: Tree Parser
//!
//! The tree parser walks scan lines and builds the node tree. Each nesting
//! level is parsed by one recursive call whose container is the node created
//! by the line just above the indented block:
//! - Equal indentation: a new node is appended under the line's key
//! - Deeper indentation: the last created node becomes the container
//! - Shallower indentation: control returns to the enclosing level
//!
//! Indentation is compared by exact characters, so a tab and a space at the
//! same width are an error rather than a silent mismatch.

use crate::error::{Error, ParseContext, Result};
use crate::scanner::ScanLine;
use crate::value::{normalize_key, ValueNode};

/// Parser settings.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Maximum nesting depth of indented blocks.
    pub max_depth: usize,
    /// Filename used in error locations.
    pub filename: Option<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: 256,
            filename: None,
        }
    }
}

struct Parser<'a> {
    lines: &'a [ScanLine],
    pos: usize,
    ctx: &'a ParseContext,
    max_depth: usize,
}

/// Parse scan lines into a root node.
pub fn parse_root(lines: &[ScanLine], ctx: &ParseContext, max_depth: usize) -> Result<ValueNode> {
    let mut root = ValueNode::new();

    if let Some(first) = lines.first() {
        if !first.indent.is_empty() {
            return Err(Error::RootIndent(first.indent.chars().count(), String::new())
                .with_location(ctx, first.line_num, 0));
        }
    }

    let mut parser = Parser {
        lines,
        pos: 0,
        ctx,
        max_depth,
    };
    parser.parse_level(&mut root, "", 0)?;
    Ok(root)
}

impl<'a> Parser<'a> {
    fn parse_level(&mut self, container: &mut ValueNode, base: &str, depth: usize) -> Result<()> {
        let lines = self.lines;
        let mut last: Option<(String, usize)> = None;

        while let Some(line) = lines.get(self.pos) {
            let indent = line.indent.as_str();
            let width = indent.chars().count();
            let base_width = base.chars().count();

            if width > base_width {
                if depth + 1 > self.max_depth {
                    return Err(Error::TooDeep(self.max_depth, String::new()).with_location(
                        self.ctx,
                        line.line_num,
                        width,
                    ));
                }
                let parent = last
                    .as_ref()
                    .and_then(|(key, index)| container.get_mut(key, *index));
                let Some(parent) = parent else {
                    return Err(Error::IndentMismatch(String::new()).with_location(
                        self.ctx,
                        line.line_num,
                        0,
                    ));
                };
                self.parse_level(parent, indent, depth + 1)?;
                continue;
            }

            if width < base_width {
                return Ok(());
            }

            if indent != base {
                return Err(Error::IndentMismatch(String::new()).with_location(
                    self.ctx,
                    line.line_num,
                    0,
                ));
            }

            let node = match &line.value {
                Some(value) => {
                    let node = ValueNode::with_raw(value.as_str());
                    node.tokens()
                        .map_err(|e| e.with_location(self.ctx, line.line_num, line.value_col))?;
                    node
                }
                None => ValueNode::new(),
            };
            container.set(&line.key, node);
            let key = normalize_key(&line.key);
            let index = container.get_all(&key).len() - 1;
            last = Some((key, index));
            self.pos += 1;
        }

        Ok(())
    }
}
