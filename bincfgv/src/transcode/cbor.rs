//! CBOR transcoding: convert between CFGV data and CBOR binary data.
//!
//! Mapping from CBOR to CFGV:
//!   - CBOR null                  -> Data::Null
//!   - CBOR bool                  -> Data::Text ("true" / "false")
//!   - CBOR unsigned/negative int -> Data::Text (decimal form)
//!   - CBOR float                 -> Data::Text
//!   - CBOR text string           -> Data::Text
//!   - CBOR array                 -> Data::List
//!   - CBOR map                   -> Data::Map (text string keys only)
//!   - CBOR byte string, tag      -> error (no CFGV equivalent)
//!
//! Mapping from CFGV to CBOR:
//!   - Data::Null    -> CBOR null (simple value 22)
//!   - Data::Text    -> CBOR text string (determinate length)
//!   - Data::List    -> CBOR array (determinate length)
//!   - Data::Map     -> CBOR map (determinate length, insertion order)

use super::Data;
use ciborium::value::Value as CborValue;

// ---------------------------------------------------------------------------
// Decode (CBOR -> CFGV)
// ---------------------------------------------------------------------------

/// Decode CBOR bytes into CFGV data.
pub fn decode(input: &[u8]) -> Result<Data, String> {
    let cbor_value: CborValue =
        ciborium::de::from_reader(input).map_err(|e| format!("CBOR decode error: {}", e))?;
    cbor_to_data(&cbor_value)
}

fn cbor_to_data(cbor: &CborValue) -> Result<Data, String> {
    match cbor {
        CborValue::Null => Ok(Data::Null),
        CborValue::Bool(b) => Ok(Data::Text(b.to_string())),
        CborValue::Integer(i) => Ok(Data::Text(i128::from(*i).to_string())),
        CborValue::Float(f) => Ok(Data::Text(f.to_string())),
        CborValue::Text(s) => Ok(Data::Text(s.clone())),
        CborValue::Array(arr) => {
            let items: Result<Vec<Data>, String> = arr.iter().map(cbor_to_data).collect();
            Ok(Data::List(items?))
        }
        CborValue::Map(pairs) => {
            let mut out = Vec::with_capacity(pairs.len());
            for (k, v) in pairs {
                let key = match k {
                    CborValue::Text(s) => s.clone(),
                    _ => return Err(format!("CBOR map key must be a text string, got: {:?}", k)),
                };
                out.push((key, cbor_to_data(v)?));
            }
            Ok(Data::Map(out))
        }
        CborValue::Tag(tag, _) => Err(format!(
            "CBOR tagged value (tag {}) has no CFGV equivalent",
            tag
        )),
        _ => Err(format!("CBOR value {:?} has no CFGV equivalent", cbor)),
    }
}

// ---------------------------------------------------------------------------
// Encode (CFGV -> CBOR)
// ---------------------------------------------------------------------------

/// Encode CFGV data as CBOR bytes.
pub fn encode(data: &Data) -> Vec<u8> {
    let mut buf = Vec::new();
    write_data(&mut buf, data);
    buf
}

fn write_data(buf: &mut Vec<u8>, data: &Data) {
    match data {
        // CBOR simple value 22 = null
        Data::Null => buf.push(0xf6),
        Data::Text(s) => write_text(buf, s),
        Data::List(items) => {
            write_head(buf, 4, items.len() as u64);
            for item in items {
                write_data(buf, item);
            }
        }
        Data::Map(pairs) => {
            write_head(buf, 5, pairs.len() as u64);
            for (k, v) in pairs {
                write_text(buf, k);
                write_data(buf, v);
            }
        }
    }
}

fn write_text(buf: &mut Vec<u8>, s: &str) {
    write_head(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Write a CBOR major type with its length argument.
///
/// Arguments below 24 live in the low 5 bits of the initial byte; larger ones
/// follow in 1, 2, 4 or 8 big-endian bytes (additional info 24 to 27).
fn write_head(buf: &mut Vec<u8>, major: u8, val: u64) {
    let high = major << 5;
    if val < 24 {
        buf.push(high | val as u8);
    } else if let Ok(v) = u8::try_from(val) {
        buf.extend_from_slice(&[high | 24, v]);
    } else if let Ok(v) = u16::try_from(val) {
        buf.push(high | 25);
        buf.extend_from_slice(&v.to_be_bytes());
    } else if let Ok(v) = u32::try_from(val) {
        buf.push(high | 26);
        buf.extend_from_slice(&v.to_be_bytes());
    } else {
        buf.push(high | 27);
        buf.extend_from_slice(&val.to_be_bytes());
    }
}

// ---------------------------------------------------------------------------
// Diagnostic Notation (CBOR -> human-readable text, RFC 8949 §8)
// ---------------------------------------------------------------------------

/// Render CBOR bytes as diagnostic notation.
///
/// Rendering works from the CBOR binary rather than from CFGV data, so it
/// shows the actual wire encoding.
pub fn diagnostic(input: &[u8]) -> Result<String, String> {
    let cbor_value: CborValue =
        ciborium::de::from_reader(input).map_err(|e| format!("CBOR decode error: {}", e))?;
    let mut out = String::new();
    diag_value(&mut out, &cbor_value, 0);
    out.push('\n');
    Ok(out)
}

fn diag_value(out: &mut String, val: &CborValue, indent: usize) {
    match val {
        CborValue::Null => out.push_str("null"),
        CborValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        CborValue::Integer(i) => out.push_str(&i128::from(*i).to_string()),
        CborValue::Float(f) => out.push_str(&diag_float(*f)),
        CborValue::Text(s) => out.push_str(&diag_text(s)),
        CborValue::Bytes(b) => {
            let hex: String = b.iter().map(|byte| format!("{:02x}", byte)).collect();
            out.push_str(&format!("h'{}'", hex));
        }
        CborValue::Array(arr) => {
            let inline = arr.len() <= 5 && arr.iter().all(is_simple_value);
            diag_block(out, ('[', ']'), arr, inline, indent, |out, item, indent| {
                diag_value(out, item, indent)
            });
        }
        CborValue::Map(pairs) => {
            diag_block(out, ('{', '}'), pairs, false, indent, |out, (k, v), indent| {
                diag_value(out, k, indent);
                out.push_str(": ");
                diag_value(out, v, indent);
            });
        }
        CborValue::Tag(tag, inner) => {
            out.push_str(&format!("{}(", tag));
            diag_value(out, inner, indent);
            out.push(')');
        }
        _ => out.push_str(&format!("<?unknown {:?}>", val)),
    }
}

/// Write a bracketed sequence, either on one line or one item per line.
fn diag_block<T>(
    out: &mut String,
    (open, close): (char, char),
    items: &[T],
    inline: bool,
    indent: usize,
    item: impl Fn(&mut String, &T, usize),
) {
    out.push(open);
    if items.is_empty() {
        out.push(close);
        return;
    }
    if inline {
        for (i, value) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            item(out, value, indent);
        }
    } else {
        let child = indent + 2;
        for (i, value) in items.iter().enumerate() {
            out.push('\n');
            out.push_str(&" ".repeat(child));
            item(out, value, child);
            if i + 1 < items.len() {
                out.push(',');
            }
        }
        out.push('\n');
        out.push_str(&" ".repeat(indent));
    }
    out.push(close);
}

fn diag_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        String::from(if f > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        let s = format!("{:?}", f);
        if s.contains(['.', 'e', 'E']) {
            s
        } else {
            format!("{}.0", s)
        }
    }
}

fn diag_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn is_simple_value(val: &CborValue) -> bool {
    !matches!(
        val,
        CborValue::Array(_) | CborValue::Map(_) | CborValue::Tag(..)
    )
}
