//! Quoting and escaping of scalar text.
//!
//! A scalar is written bare unless it is empty, contains whitespace, or
//! contains a character that needs a backslash escape (`\`, `"`, line feed,
//! tab). Quoted scalars are delimited by `"`.

use crate::error::{Error, Result};

/// Escape backslash, quote, line feed and tab.
pub fn escape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            c => result.push(c),
        }
    }
    result
}

/// Reverse [`escape`]. Also accepts `\s` for a space; unknown escape pairs
/// are kept as written.
pub fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('s') => result.push(' '),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

/// Whether `text` must be quoted to survive tokenization as one token.
pub fn needs_quoting(text: &str) -> bool {
    text.is_empty() || text.chars().any(char::is_whitespace) || escape(text) != text
}

/// Quote and escape unconditionally.
pub fn quote(text: &str) -> String {
    format!("\"{}\"", escape(text))
}

/// Quote only when [`needs_quoting`] says so.
pub fn quote_if_needed(text: &str) -> String {
    if needs_quoting(text) {
        quote(text)
    } else {
        text.to_string()
    }
}

/// Render tokens back into one raw scalar, quoting where necessary.
pub fn render_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| quote_if_needed(t.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a raw scalar into tokens.
///
/// Tokens are separated by whitespace. A token opening with `"` extends to
/// the next unescaped `"` and is unescaped; bare tokens are taken verbatim.
pub fn tokenize(raw: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = raw.char_indices().peekable();

    loop {
        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        let Some(&(start, first)) = chars.peek() else {
            break;
        };

        if first == '"' {
            chars.next();
            let mut end = None;
            while let Some((i, c)) = chars.next() {
                match c {
                    '\\' => {
                        chars.next();
                    }
                    '"' => {
                        end = Some(i);
                        break;
                    }
                    _ => {}
                }
            }
            let end = end.ok_or_else(|| Error::UnterminatedString(String::new()))?;
            tokens.push(unescape(&raw[start + 1..end]));
        } else {
            let mut end = raw.len();
            while let Some(&(i, c)) = chars.peek() {
                if c.is_whitespace() {
                    end = i;
                    break;
                }
                chars.next();
            }
            tokens.push(raw[start..end].to_string());
        }
    }

    Ok(tokens)
}
