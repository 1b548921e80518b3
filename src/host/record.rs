//! Parser for AppleScript record literals as printed by `osascript -s s`.
//!
//! ```text
//! record  := "{" [ field { "," field } ] "}"  |  field { "," field }
//! field   := key ":" value
//! value   := string | bare
//! string  := '"' { char | '\"' | '\\' } '"'
//! bare    := anything up to the next top-level comma (numbers, constants,
//!            `missing value`, nested lists kept verbatim)
//! ```
//!
//! Commas and colons inside strings or nested braces are not separators.

use std::collections::BTreeMap;
use thiserror::Error;

const MISSING_VALUE: &str = "missing value";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unbalanced braces")]
    UnbalancedBraces,

    #[error("field without ':' separator: {0:?}")]
    MissingColon(String),

    #[error("field with empty key")]
    EmptyKey,

    #[error("invalid record key {0:?}")]
    InvalidKey(String),

    #[error("duplicate key {0:?}")]
    DuplicateKey(String),

    #[error("unexpected text after string literal in {0:?}")]
    TrailingText(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValue {
    /// A quoted AppleScript string, unescaped
    Text(String),
    /// Anything unquoted: numbers, enumerations, nested lists
    Bare(String),
    Missing,
}

impl RecordValue {
    /// The value as plain text; `None` for `missing value`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RecordValue::Text(text) | RecordValue::Bare(text) => Some(text),
            RecordValue::Missing => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, RecordValue>,
}

impl Record {
    pub fn get(&self, key: &str) -> Option<&RecordValue> {
        self.fields.get(key)
    }

    /// Text of `key`, with absent keys and `missing value` both as `None`.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(RecordValue::as_text)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub fn parse_record(input: &str) -> Result<Record, RecordError> {
    let trimmed = input.trim();
    let body = match trimmed.strip_prefix('{') {
        Some(rest) => rest.strip_suffix('}').ok_or(RecordError::UnbalancedBraces)?,
        None => trimmed,
    };

    let mut record = Record::default();
    for field in split_top_level(body)? {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        let (key, value) = field
            .split_once(':')
            .ok_or_else(|| RecordError::MissingColon(field.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(RecordError::EmptyKey);
        }
        if !is_record_key(key) {
            return Err(RecordError::InvalidKey(key.to_string()));
        }
        let value = parse_value(value.trim())?;
        if record.fields.insert(key.to_string(), value).is_some() {
            return Err(RecordError::DuplicateKey(key.to_string()));
        }
    }
    Ok(record)
}

/// Identifiers, or `|piped keys|` which may contain anything but a pipe.
fn is_record_key(key: &str) -> bool {
    if let Some(piped) = key.strip_prefix('|').and_then(|k| k.strip_suffix('|')) {
        return !piped.contains('|');
    }
    key.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Splits at commas that are outside string literals and nested braces.
fn split_top_level(body: &str) -> Result<Vec<&str>, RecordError> {
    let mut fields = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in body.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => depth = depth.checked_sub(1).ok_or(RecordError::UnbalancedBraces)?,
            ',' if depth == 0 => {
                fields.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_string {
        return Err(RecordError::UnterminatedString);
    }
    if depth != 0 {
        return Err(RecordError::UnbalancedBraces);
    }
    fields.push(&body[start..]);
    Ok(fields)
}

fn parse_value(raw: &str) -> Result<RecordValue, RecordError> {
    if raw == MISSING_VALUE {
        return Ok(RecordValue::Missing);
    }
    let Some(quoted) = raw.strip_prefix('"') else {
        return Ok(RecordValue::Bare(raw.to_string()));
    };

    let mut text = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => text.push('\n'),
                Some('r') => text.push('\r'),
                Some('t') => text.push('\t'),
                Some(other) => text.push(other),
                None => return Err(RecordError::UnterminatedString),
            },
            '"' => {
                let rest: String = chars.collect();
                if !rest.trim().is_empty() {
                    return Err(RecordError::TrailingText(raw.to_string()));
                }
                return Ok(RecordValue::Text(text));
            }
            _ => text.push(c),
        }
    }
    Err(RecordError::UnterminatedString)
}
