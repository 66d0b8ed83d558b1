//! Transcoding between CFGV trees and other data formats.
//!
//! Every format goes through [`Data`], a plain value model:
//!   - leaf without a scalar      -> Data::Null
//!   - leaf with one token        -> Data::Text
//!   - leaf with several tokens   -> Data::List of Data::Text
//!   - node with children         -> Data::Map, keys in insertion order;
//!                                   a repeated key becomes a Data::List and
//!                                   the node's own scalar is stored under `$`
//!
//! Importing reverses the mapping: a list under a key becomes repeated
//! children, and numbers and booleans from the source format arrive as text.

pub mod cbor;
pub mod toml;
pub mod yaml;

use libcfgv::{escape, ValueNode};

/// Key holding the scalar of a node that also has children.
pub const SCALAR_KEY: &str = "$";

#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Null,
    Text(String),
    List(Vec<Data>),
    Map(Vec<(String, Data)>),
}

/// Export a root tree; the result is always a map.
pub fn from_tree(root: &ValueNode) -> Result<Data, String> {
    export_children(root)
}

fn export_node(node: &ValueNode) -> Result<Data, String> {
    if node.has_children() {
        export_children(node)
    } else {
        export_scalar(node)
    }
}

fn export_children(node: &ValueNode) -> Result<Data, String> {
    let mut pairs = Vec::new();
    if node.has_scalar() {
        pairs.push((SCALAR_KEY.to_string(), export_scalar(node)?));
    }
    for (key, values) in node.entries() {
        let value = match values {
            [single] => export_node(single)?,
            _ => Data::List(values.iter().map(export_node).collect::<Result<_, _>>()?),
        };
        pairs.push((key.to_string(), value));
    }
    Ok(Data::Map(pairs))
}

fn export_scalar(node: &ValueNode) -> Result<Data, String> {
    if !node.has_scalar() {
        return Ok(Data::Null);
    }
    let mut tokens = node.token_strings().map_err(|e| e.to_string())?;
    Ok(match tokens.len() {
        0 => Data::Text(String::new()),
        1 => Data::Text(tokens.remove(0)),
        _ => Data::List(tokens.into_iter().map(Data::Text).collect()),
    })
}

/// Import a root tree; the data must be a map.
pub fn to_tree(data: &Data) -> Result<ValueNode, String> {
    match data {
        Data::Map(pairs) => {
            let mut root = ValueNode::new();
            for (key, value) in pairs {
                if key == SCALAR_KEY {
                    return Err("The top-level map cannot carry a scalar".to_string());
                }
                import_into(&mut root, key, value)?;
            }
            Ok(root)
        }
        _ => Err("The top-level value must be a map".to_string()),
    }
}

fn import_into(parent: &mut ValueNode, key: &str, value: &Data) -> Result<(), String> {
    check_key(key)?;
    match value {
        Data::List(items) => {
            for item in items {
                parent.set(key, import_item(item)?);
            }
        }
        other => parent.set(key, import_item(other)?),
    }
    Ok(())
}

fn import_item(value: &Data) -> Result<ValueNode, String> {
    match value {
        Data::Null => Ok(ValueNode::new()),
        Data::Text(text) => Ok(ValueNode::scalar(text)),
        Data::List(items) => Ok(ValueNode::with_raw(scalar_tokens(items)?)),
        Data::Map(pairs) => {
            let mut node = ValueNode::new();
            for (key, value) in pairs {
                if key == SCALAR_KEY {
                    match value {
                        Data::Null => {}
                        Data::Text(text) => node.set_raw(Some(escape::quote_if_needed(text))),
                        Data::List(items) => node.set_raw(Some(scalar_tokens(items)?)),
                        Data::Map(_) => {
                            return Err(format!("'{}' must hold a scalar, not a map", SCALAR_KEY))
                        }
                    }
                } else {
                    import_into(&mut node, key, value)?;
                }
            }
            Ok(node)
        }
    }
}

fn scalar_tokens(items: &[Data]) -> Result<String, String> {
    let tokens = items
        .iter()
        .map(|item| match item {
            Data::Text(text) => Ok(text.as_str()),
            _ => Err("Nested lists may only contain scalars".to_string()),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(escape::render_tokens(&tokens))
}

fn check_key(key: &str) -> Result<(), String> {
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return Err(format!("Key {:?} cannot be written as a CFGV key", key));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libcfgv::parse;

    #[test]
    fn test_export() {
        let root = parse("name app\nport 80\nport 443\nlist a b\nflag\nserver main\n  host x\n")
            .unwrap();
        let data = from_tree(&root).unwrap();
        assert_eq!(
            data,
            Data::Map(vec![
                ("name".into(), Data::Text("app".into())),
                (
                    "port".into(),
                    Data::List(vec![Data::Text("80".into()), Data::Text("443".into())])
                ),
                (
                    "list".into(),
                    Data::List(vec![Data::Text("a".into()), Data::Text("b".into())])
                ),
                ("flag".into(), Data::Null),
                (
                    "server".into(),
                    Data::Map(vec![
                        ("$".into(), Data::Text("main".into())),
                        ("host".into(), Data::Text("x".into())),
                    ])
                ),
            ])
        );
    }

    #[test]
    fn test_import() {
        let data = Data::Map(vec![
            ("Port".into(), Data::List(vec![Data::Text("80".into()), Data::Text("443".into())])),
            ("motd".into(), Data::Text("hello there".into())),
            (
                "server".into(),
                Data::Map(vec![
                    ("$".into(), Data::Text("main".into())),
                    ("flag".into(), Data::Null),
                ]),
            ),
        ]);
        let tree = to_tree(&data).unwrap();
        assert_eq!(
            libcfgv::encode(&tree),
            "port 80\nport 443\nmotd \"hello there\"\nserver main\n  flag\n"
        );
    }

    #[test]
    fn test_import_errors() {
        assert!(to_tree(&Data::Text("x".into())).is_err());
        let data = Data::Map(vec![("two words".into(), Data::Null)]);
        assert!(to_tree(&data).is_err());
    }
}
