//! CFGV tree node.

use crate::error::{Error, Result};
use crate::escape;
use crate::mapper::Registry;
use indexmap::IndexMap;
use num_bigint::BigInt;
use std::any::type_name;
use std::cell::OnceCell;
use std::fmt;
use std::str::FromStr;

/// A node of a configuration tree.
///
/// A node holds an optional raw scalar (the text after its key, exactly as
/// written) and an insertion-ordered multimap of children. Keys are stored
/// lowercased; every lookup lowercases its argument the same way.
///
/// The raw scalar is split into tokens on demand (see [`escape::tokenize`]).
/// Token nodes are themselves `ValueNode`s whose only token is the node
/// itself.
#[derive(Clone, Default)]
pub struct ValueNode {
    raw: Option<String>,
    children: IndexMap<String, Vec<ValueNode>>,
    tokens: OnceCell<Vec<ValueNode>>,
    is_token: bool,
}

/// Lowercase a key the way storage and lookup do.
pub fn normalize_key(name: &str) -> String {
    name.to_lowercase()
}

impl ValueNode {
    /// Create a node with no scalar and no children.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node whose raw scalar is `raw`, verbatim.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
            ..Self::default()
        }
    }

    /// Create a node holding `text` as its single token, quoting as needed.
    pub fn scalar(text: impl AsRef<str>) -> Self {
        Self::with_raw(escape::quote_if_needed(text.as_ref()))
    }

    fn token(text: String) -> Self {
        Self {
            raw: Some(text),
            is_token: true,
            ..Self::default()
        }
    }

    // ------------------------------------------------------------------
    // Scalar access
    // ------------------------------------------------------------------

    /// The raw scalar as written, if any.
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Replace the raw scalar.
    pub fn set_raw(&mut self, raw: Option<String>) {
        self.raw = raw;
        self.tokens = OnceCell::new();
        self.is_token = false;
    }

    /// Whether this node carries a raw scalar.
    pub fn has_scalar(&self) -> bool {
        self.raw.is_some()
    }

    /// Token nodes of the raw scalar.
    ///
    /// Empty when there is no scalar or it is blank. Fails when a quoted
    /// token is not terminated.
    pub fn tokens(&self) -> Result<&[ValueNode]> {
        if self.is_token {
            return Ok(std::slice::from_ref(self));
        }
        if let Some(tokens) = self.tokens.get() {
            return Ok(tokens);
        }
        let parsed = match &self.raw {
            Some(raw) => escape::tokenize(raw)?
                .into_iter()
                .map(ValueNode::token)
                .collect(),
            None => Vec::new(),
        };
        Ok(self.tokens.get_or_init(|| parsed))
    }

    /// Text of every token, in order.
    pub fn token_strings(&self) -> Result<Vec<String>> {
        Ok(self
            .tokens()?
            .iter()
            .map(|t| t.raw.clone().unwrap_or_default())
            .collect())
    }

    fn first_token(&self, target: &'static str) -> Result<&str> {
        self.tokens()?
            .first()
            .and_then(|t| t.raw.as_deref())
            .ok_or(Error::EmptyValue(target))
    }

    fn parse_first<T: FromStr>(&self) -> Result<T> {
        let text = self.first_token(type_name::<T>())?;
        text.parse::<T>()
            .map_err(|_| Error::InvalidValue(text.to_string(), type_name::<T>()))
    }

    /// First token, unescaped.
    pub fn as_string(&self) -> Result<String> {
        self.first_token("string").map(String::from)
    }

    /// First token, escaped again.
    pub fn as_escaped_string(&self) -> Result<String> {
        self.first_token("string").map(escape::escape)
    }

    /// First token as a boolean (`true`/`false`, any case).
    pub fn as_bool(&self) -> Result<bool> {
        parse_bool(self.first_token("bool")?)
    }

    pub fn as_int(&self) -> Result<i32> {
        self.parse_first()
    }

    pub fn as_long(&self) -> Result<i64> {
        self.parse_first()
    }

    pub fn as_float(&self) -> Result<f32> {
        self.parse_first()
    }

    pub fn as_double(&self) -> Result<f64> {
        self.parse_first()
    }

    pub fn as_bigint(&self) -> Result<BigInt> {
        self.parse_first()
    }

    /// Token texts as an owned snapshot.
    pub fn as_array(&self) -> Result<Vec<String>> {
        self.token_strings()
    }

    /// Token texts as an iterator; call again to restart.
    pub fn as_list(&self) -> Result<impl Iterator<Item = &str> + '_> {
        Ok(self.tokens()?.iter().filter_map(|t| t.raw.as_deref()))
    }

    /// Decode the first token with the global registry's codec for `T`.
    pub fn as_custom<T: 'static>(&self) -> Result<T> {
        self.as_custom_with(Registry::global())
    }

    /// Decode the whole raw scalar with the global registry's codec for `T`.
    pub fn as_custom_from_raw<T: 'static>(&self) -> Result<T> {
        self.as_custom_from_raw_with(Registry::global())
    }

    pub fn as_custom_with<T: 'static>(&self, registry: &Registry) -> Result<T> {
        registry.decode_text::<T>(self.first_token(type_name::<T>())?)
    }

    pub fn as_custom_from_raw_with<T: 'static>(&self, registry: &Registry) -> Result<T> {
        registry.decode_text::<T>(self.raw.as_deref().unwrap_or_default())
    }

    /// Compare token lists, ignoring how the scalars were quoted.
    pub fn same_scalar(&self, other: &ValueNode) -> bool {
        match (self.token_strings(), other.token_strings()) {
            (Ok(a), Ok(b)) => a == b,
            _ => self.raw == other.raw,
        }
    }

    // ------------------------------------------------------------------
    // Children
    // ------------------------------------------------------------------

    /// Normalized keys in insertion order.
    pub fn keys(&self) -> Vec<&str> {
        self.children.keys().map(String::as_str).collect()
    }

    /// Whether this node has any children.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Iterate `(key, values)` in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[ValueNode])> {
        self.children.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// All values stored under `name`; empty when missing.
    pub fn get_all(&self, name: &str) -> &[ValueNode] {
        self.children
            .get(&normalize_key(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&ValueNode> {
        self.get_at(name, 0)
    }

    /// Value at `index` under `name`.
    pub fn get_at(&self, name: &str, index: usize) -> Option<&ValueNode> {
        self.get_all(name).get(index)
    }

    pub fn get_mut(&mut self, name: &str, index: usize) -> Option<&mut ValueNode> {
        self.children
            .get_mut(&normalize_key(name))
            .and_then(|values| values.get_mut(index))
    }

    /// First value under `name`, or a scalar node built from `default`.
    pub fn get_or_default(&self, name: &str, default: impl fmt::Display) -> ValueNode {
        self.get(name)
            .cloned()
            .unwrap_or_else(|| ValueNode::scalar(default.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(&normalize_key(name))
    }

    /// Append `value` under `name`.
    pub fn set(&mut self, name: &str, value: ValueNode) {
        self.children
            .entry(normalize_key(name))
            .or_default()
            .push(value);
    }

    /// Overwrite the value at `index` under `name`.
    pub fn set_at(&mut self, name: &str, index: usize, value: ValueNode) -> Result<()> {
        let key = normalize_key(name);
        let len = self.children.get(&key).map_or(0, Vec::len);
        match self.children.get_mut(&key).and_then(|v| v.get_mut(index)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfRange { key, index, len }),
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut IndexMap<String, Vec<ValueNode>> {
        &mut self.children
    }

    /// Merge `other` into this node: its scalar replaces ours when present,
    /// its children are appended under their keys.
    pub fn merge(&mut self, other: ValueNode) {
        if other.raw.is_some() {
            self.set_raw(other.raw);
        }
        for (key, values) in other.children {
            self.children.entry(key).or_default().extend(values);
        }
    }

    /// Render the tree in the fixture dump format.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0);
        out
    }

    fn dump_into(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        for (key, values) in &self.children {
            for value in values {
                match &value.raw {
                    Some(raw) => out.push_str(&format!("{}{} = {:?}\n", pad, key, raw)),
                    None => out.push_str(&format!("{}{}\n", pad, key)),
                }
                value.dump_into(out, depth + 1);
            }
        }
    }
}

/// Case-insensitive boolean parse.
pub(crate) fn parse_bool(text: &str) -> Result<bool> {
    if text.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(Error::InvalidValue(text.to_string(), "bool"))
    }
}

impl PartialEq for ValueNode {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.children == other.children
    }
}

impl fmt::Debug for ValueNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(raw) = &self.raw {
            write!(f, "{:?}", raw)?;
            if self.children.is_empty() {
                return Ok(());
            }
            write!(f, " ")?;
        }
        f.debug_map()
            .entries(self.children.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}
