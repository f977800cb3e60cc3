//! The flat text format of one record file.
//!
//! A record is written as `key=value` segments joined by `|`, in the record
//! type's declared key order, followed by a newline:
//!
//! ```text
//! id=7|employee=1|project=2|minutes=45|date=2024-03-01|details=standup
//! ```
//!
//! Values may contain any text. The characters that would break the line
//! structure are percent-escaped: `%` → `%25`, `|` → `%7C`, `=` → `%3D`,
//! CR → `%0D`, LF → `%0A`. Keys are fixed identifiers and are never escaped.

use punch_types::FieldMap;

/// Separator between `key=value` segments.
pub const SEGMENT_SEPARATOR: char = '|';
/// Separator between a key and its value.
pub const KEY_VALUE_SEPARATOR: char = '=';

/// Render ordered pairs as one line (including the trailing newline).
pub fn encode_line<K: AsRef<str>>(pairs: &[(K, String)]) -> String {
    let mut line = String::new();
    for (index, (key, value)) in pairs.iter().enumerate() {
        if index > 0 {
            line.push(SEGMENT_SEPARATOR);
        }
        line.push_str(key.as_ref());
        line.push(KEY_VALUE_SEPARATOR);
        line.push_str(&escape(value));
    }
    line.push('\n');
    line
}

/// Parse a line produced by [`encode_line`]. A single trailing newline (LF
/// or CRLF) is accepted; the error string describes the first problem found.
pub fn decode_line(text: &str) -> Result<FieldMap, String> {
    let line = text
        .strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(text);

    if line.contains(['\n', '\r']) {
        return Err("record spans more than one line".into());
    }

    let mut fields = FieldMap::new();
    if line.is_empty() {
        return Ok(fields);
    }

    for (index, segment) in line.split(SEGMENT_SEPARATOR).enumerate() {
        let (key, raw) = segment
            .split_once(KEY_VALUE_SEPARATOR)
            .ok_or_else(|| format!("segment {index} ({segment:?}) has no `=`"))?;
        if key.is_empty() {
            return Err(format!("segment {index} has an empty key"));
        }
        let value = unescape(raw).map_err(|e| format!("value of `{key}`: {e}"))?;
        if fields.insert(key, value).is_some() {
            return Err(format!("duplicate key `{key}`"));
        }
    }
    Ok(fields)
}

/// Percent-escape the characters reserved by the line format.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' => out.push_str("%25"),
            '|' => out.push_str("%7C"),
            '=' => out.push_str("%3D"),
            '\r' => out.push_str("%0D"),
            '\n' => out.push_str("%0A"),
            other => out.push(other),
        }
    }
    out
}

/// Reverse [`escape`]. Any well-formed `%XX` sequence is decoded, so files
/// edited by hand may escape other bytes too.
pub fn unescape(value: &str) -> Result<String, String> {
    if !value.contains('%') {
        return Ok(value.to_string());
    }

    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .ok_or_else(|| format!("truncated escape at byte {i}"))?;
            let decoded = std::str::from_utf8(hex)
                .ok()
                .filter(|h| h.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| format!("invalid escape at byte {i}"))?;
            out.push(decoded);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| "escapes decode to invalid UTF-8".to_string())
}
