//! TOML transcoding: convert between CFGV data and TOML text.
//!
//! Mapping from TOML to CFGV:
//!   - TOML string         -> Data::Text
//!   - TOML integer        -> Data::Text (decimal form)
//!   - TOML float          -> Data::Text
//!   - TOML boolean        -> Data::Text ("true" / "false")
//!   - TOML datetime       -> Data::Text (ISO 8601 representation)
//!   - TOML array          -> Data::List
//!   - TOML table          -> Data::Map
//!
//! Mapping from CFGV to TOML:
//!   - Data::Null          -> empty table (TOML has no null; an empty table
//!                            imports back as the same bare key)
//!   - Data::Text          -> TOML string
//!   - Data::List          -> TOML array (maps become inline tables)
//!   - Data::Map           -> TOML table
//!
//! TOML requires the top-level value to be a table; CFGV roots always are.

use super::Data;
use toml_edit::DocumentMut;

/// Decode a TOML string into CFGV data.
pub fn decode(input: &str) -> Result<Data, String> {
    let doc: DocumentMut = input
        .parse::<DocumentMut>()
        .map_err(|e| format!("TOML parse error: {}", e))?;
    Ok(toml_table_to_data(doc.as_table()))
}

/// Encode CFGV data as a TOML string.
pub fn encode(data: &Data) -> Result<String, String> {
    match data_to_toml(data)? {
        toml_edit::Item::Table(table) => {
            let mut doc = DocumentMut::new();
            for (key, value) in table.iter() {
                doc[key] = value.clone();
            }
            Ok(doc.to_string())
        }
        _ => Err("TOML requires the top-level value to be a table".to_string()),
    }
}

fn toml_table_to_data(table: &toml_edit::Table) -> Data {
    Data::Map(
        table
            .iter()
            .map(|(key, item)| (key.to_string(), toml_item_to_data(item)))
            .collect(),
    )
}

fn toml_item_to_data(item: &toml_edit::Item) -> Data {
    match item {
        toml_edit::Item::Value(v) => toml_value_to_data(v),
        toml_edit::Item::Table(t) => toml_table_to_data(t),
        toml_edit::Item::ArrayOfTables(arr) => {
            Data::List(arr.iter().map(toml_table_to_data).collect())
        }
        toml_edit::Item::None => Data::Null,
    }
}

fn toml_value_to_data(v: &toml_edit::Value) -> Data {
    match v {
        toml_edit::Value::String(s) => Data::Text(s.value().clone()),
        toml_edit::Value::Integer(i) => Data::Text(i.value().to_string()),
        toml_edit::Value::Float(f) => Data::Text(f.value().to_string()),
        toml_edit::Value::Boolean(b) => Data::Text(b.value().to_string()),
        toml_edit::Value::Datetime(dt) => Data::Text(dt.value().to_string()),
        toml_edit::Value::Array(arr) => Data::List(arr.iter().map(toml_value_to_data).collect()),
        toml_edit::Value::InlineTable(table) => Data::Map(
            table
                .iter()
                .map(|(key, val)| (key.to_string(), toml_value_to_data(val)))
                .collect(),
        ),
    }
}

fn data_to_toml(data: &Data) -> Result<toml_edit::Item, String> {
    match data {
        Data::Null => Ok(toml_edit::Item::Table(toml_edit::Table::new())),
        Data::Text(s) => Ok(toml_edit::Item::Value(toml_edit::Value::String(
            toml_edit::Formatted::new(s.clone()),
        ))),
        Data::List(items) => {
            let mut toml_arr = toml_edit::Array::new();
            for item in items {
                toml_arr.push(data_to_inline(item)?);
            }
            Ok(toml_edit::Item::Value(toml_edit::Value::Array(toml_arr)))
        }
        Data::Map(pairs) => {
            let mut table = toml_edit::Table::new();
            for (k, v) in pairs {
                table.insert(k, data_to_toml(v)?);
            }
            Ok(toml_edit::Item::Table(table))
        }
    }
}

/// Values nested in arrays must be inline.
fn data_to_inline(data: &Data) -> Result<toml_edit::Value, String> {
    match data {
        Data::Null => Ok(toml_edit::Value::InlineTable(toml_edit::InlineTable::new())),
        Data::Text(s) => Ok(toml_edit::Value::String(toml_edit::Formatted::new(s.clone()))),
        Data::List(items) => {
            let mut toml_arr = toml_edit::Array::new();
            for item in items {
                toml_arr.push(data_to_inline(item)?);
            }
            Ok(toml_edit::Value::Array(toml_arr))
        }
        Data::Map(pairs) => {
            let mut inline = toml_edit::InlineTable::new();
            for (k, v) in pairs {
                inline.insert(k.as_str(), data_to_inline(v)?);
            }
            Ok(toml_edit::Value::InlineTable(inline))
        }
    }
}
