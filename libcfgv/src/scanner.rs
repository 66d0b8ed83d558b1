//! Phase 1: Scanner
//!
//! The scanner converts raw source text into scan lines. It performs:
//! - Line splitting on line feed only (a carriage return stays in the data)
//! - Blank line filtering
//! - Indentation extraction (the leading run of spaces and tabs)
//! - Key / remainder splitting

/// A single data line after the scanning phase.
#[derive(Debug, Clone)]
pub struct ScanLine {
    /// Leading spaces and tabs, verbatim.
    pub indent: String,
    /// Text up to the first whitespace character after the indent.
    pub key: String,
    /// Remainder with surrounding spaces and tabs trimmed; `None` if empty.
    pub value: Option<String>,
    /// Zero-based column where the remainder starts.
    pub value_col: usize,
    /// Zero-based line number for error reporting.
    pub line_num: usize,
}

fn is_indent_char(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Scan source text into data lines.
pub fn scan(source: &str) -> Vec<ScanLine> {
    source
        .split('\n')
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line_num, line)| scan_line(line, line_num))
        .collect()
}

fn scan_line(line: &str, line_num: usize) -> ScanLine {
    let content = line.trim_start_matches(is_indent_char);
    let indent = &line[..line.len() - content.len()];

    let key_len = content
        .find(char::is_whitespace)
        .unwrap_or(content.len());
    let (key, rest) = content.split_at(key_len);
    let value = rest.trim_matches(is_indent_char);
    let value_col = indent.chars().count()
        + key.chars().count()
        + (rest.len() - rest.trim_start_matches(is_indent_char).len());

    ScanLine {
        indent: indent.to_string(),
        key: key.to_string(),
        value: (!value.is_empty()).then(|| value.to_string()),
        value_col,
        line_num,
    }
}
