//! Reader for the `.properties` key/value format
//!
//! Follows the line format Gradle scripts load through `java.util.Properties`:
//! `#`/`!` comments, `=`, `:` or whitespace separators, backslash escapes
//! including `\uXXXX`, and backslash line continuations. Raw files are
//! decoded as UTF-8 when valid and as ISO-8859-1 otherwise, so Latin-1
//! descriptors that Gradle accepts load the same way here.

use std::borrow::Cow;
use thiserror::Error;
use tracing::debug;

/// Errors raised while parsing a properties document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertiesError {
    /// A `\u` escape without four hex digits or naming an invalid code point
    #[error("malformed \\uxxxx escape '{sequence}' on line {line}")]
    InvalidUnicodeEscape {
        /// 1-based line on which the logical line starts
        line: usize,
        /// The offending escape as written
        sequence: String,
    },
}

/// Parsed properties, in first-appearance order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, String)>,
}

impl Properties {
    /// Parse a properties document
    pub fn parse(text: &str) -> Result<Self, PropertiesError> {
        let mut props = Self::default();
        for (line, logical) in logical_lines(text) {
            let (key, value) = split_entry(&logical, line)?;
            props.insert(key, value);
        }
        Ok(props)
    }

    /// Parse raw file contents: UTF-8 (leading BOM skipped), else ISO-8859-1
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PropertiesError> {
        let text = decode(bytes);
        Self::parse(text.strip_prefix('\u{feff}').unwrap_or(&*text))
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up a value, falling back to `default` when the key is absent
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys were defined
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in first-appearance order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Later definitions of a key replace earlier ones in place
    fn insert(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

fn decode(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(e) => {
            debug!(valid_up_to = e.valid_up_to(), "Not UTF-8, decoding as ISO-8859-1");
            Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())
        }
    }
}

/// Join continuation lines and drop comments/blank lines.
///
/// Yields `(starting line number, raw logical line)`. Escapes are left intact.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let normalized = text.replace("\r\n", "\n");
    let mut lines = normalized.split(['\n', '\r']).enumerate();
    let mut out = Vec::new();

    while let Some((idx, natural)) = lines.next() {
        let trimmed = natural.trim_start_matches(is_blank);
        if trimmed.is_empty() || trimmed.starts_with(['#', '!']) {
            continue;
        }

        let mut logical = String::from(trimmed);
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start_matches(is_blank)),
                None => break,
            }
        }
        out.push((idx + 1, logical));
    }

    out
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Split a logical line into an unescaped key and value
fn split_entry(logical: &str, line: usize) -> Result<(String, String), PropertiesError> {
    let mut key_end = logical.len();
    let mut value_start = logical.len();
    let mut escaped = false;

    for (i, c) in logical.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = i;
                value_start = i + 1;
                break;
            }
            c if is_blank(c) => {
                key_end = i;
                let rest = logical[i..].trim_start_matches(is_blank);
                let mut start = logical.len() - rest.len();
                if rest.starts_with(['=', ':']) {
                    start += 1;
                }
                value_start = start;
                break;
            }
            _ => {}
        }
    }

    let value_raw = logical[value_start..].trim_start_matches(is_blank);
    Ok((
        unescape(&logical[..key_end], line)?,
        unescape(value_raw, line)?,
    ))
}

fn unescape(raw: &str, line: usize) -> Result<String, PropertiesError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let unit = read_hex4(&mut chars, line)?;
                let decoded = if (0xD800..0xDC00).contains(&unit) {
                    // High surrogate: the low half must follow as another \u escape
                    let mut lookahead = chars.clone();
                    let low = match (lookahead.next(), lookahead.next()) {
                        (Some('\\'), Some('u')) => read_hex4(&mut lookahead, line)?,
                        _ => return Err(invalid_escape(unit, line)),
                    };
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(invalid_escape(unit, line));
                    }
                    chars = lookahead;
                    0x10000 + ((u32::from(unit) - 0xD800) << 10) + (u32::from(low) - 0xDC00)
                } else {
                    u32::from(unit)
                };
                let ch = char::from_u32(decoded).ok_or_else(|| invalid_escape(unit, line))?;
                out.push(ch);
            }
            Some(other) => out.push(other),
            // A dangling backslash at the end of the file's last line
            None => {}
        }
    }

    Ok(out)
}

fn read_hex4<I>(chars: &mut I, line: usize) -> Result<u16, PropertiesError>
where
    I: Iterator<Item = char>,
{
    let digits: String = chars.take(4).collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PropertiesError::InvalidUnicodeEscape {
            line,
            sequence: format!("\\u{}", digits),
        });
    }
    u16::from_str_radix(&digits, 16).map_err(|_| PropertiesError::InvalidUnicodeEscape {
        line,
        sequence: format!("\\u{}", digits),
    })
}

fn invalid_escape(unit: u16, line: usize) -> PropertiesError {
    PropertiesError::InvalidUnicodeEscape {
        line,
        sequence: format!("\\u{:04X}", unit),
    }
}
