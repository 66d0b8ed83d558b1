//! YAML transcoding: convert between CFGV data and YAML text.
//!
//! Mapping from YAML to CFGV:
//!   - YAML null          -> Data::Null
//!   - YAML bool          -> Data::Text ("true" / "false")
//!   - YAML number        -> Data::Text (its decimal form)
//!   - YAML string        -> Data::Text
//!   - YAML sequence      -> Data::List
//!   - YAML mapping       -> Data::Map
//!   - YAML tagged value  -> the inner value (tag dropped)
//!
//! Mapping from CFGV to YAML:
//!   - Data::Null         -> YAML null
//!   - Data::Text         -> YAML string
//!   - Data::List         -> YAML sequence
//!   - Data::Map          -> YAML mapping (insertion order kept)

use super::Data;

/// Decode a YAML string into CFGV data.
pub fn decode(input: &str) -> Result<Data, String> {
    let yaml_value: serde_yaml::Value =
        serde_yaml::from_str(input).map_err(|e| format!("YAML parse error: {}", e))?;
    yaml_to_data(&yaml_value)
}

/// Encode CFGV data as a YAML string.
pub fn encode(data: &Data) -> Result<String, String> {
    serde_yaml::to_string(&data_to_yaml(data)).map_err(|e| format!("YAML encode error: {}", e))
}

fn yaml_to_data(yaml: &serde_yaml::Value) -> Result<Data, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Data::Null),
        serde_yaml::Value::Bool(b) => Ok(Data::Text(b.to_string())),
        serde_yaml::Value::Number(n) => Ok(Data::Text(n.to_string())),
        serde_yaml::Value::String(s) => Ok(Data::Text(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Data>, String> = seq.iter().map(yaml_to_data).collect();
            Ok(Data::List(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut pairs = Vec::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    _ => return Err(format!("Unsupported YAML mapping key type: {:?}", k)),
                };
                pairs.push((key, yaml_to_data(v)?));
            }
            Ok(Data::Map(pairs))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_data(&tagged.value),
    }
}

fn data_to_yaml(data: &Data) -> serde_yaml::Value {
    match data {
        Data::Null => serde_yaml::Value::Null,
        Data::Text(s) => serde_yaml::Value::String(s.clone()),
        Data::List(items) => serde_yaml::Value::Sequence(items.iter().map(data_to_yaml).collect()),
        Data::Map(pairs) => {
            let mut map = serde_yaml::Mapping::new();
            for (k, v) in pairs {
                map.insert(serde_yaml::Value::String(k.clone()), data_to_yaml(v));
            }
            serde_yaml::Value::Mapping(map)
        }
    }
}
