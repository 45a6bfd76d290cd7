//! Key-token extraction from the key artifact.
//!
//! The artifact is a JSON document holding a base64 string under a known
//! field name, possibly nested. Artifacts that fail to parse as JSON (for
//! example a file caught mid-write) fall back to a lexical search.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::Value;

use crate::error::{CredScanError, Result};

/// Find `field` in `artifact` and return its base64-decoded bytes.
pub fn extract_key_token(artifact: &[u8], field: &str) -> Result<Vec<u8>> {
    let encoded = match serde_json::from_slice::<Value>(artifact) {
        Ok(doc) => find_string_field(&doc, field).map(str::to_owned),
        Err(_) => scan_string_field(artifact, field),
    }
    .ok_or_else(|| CredScanError::Format(format!("field \"{}\" not found in key artifact", field)))?;

    decode_token(&encoded)
}

/// Depth-first search, in document order, for the first string value stored
/// under `field`.
fn find_string_field<'v>(value: &'v Value, field: &str) -> Option<&'v str> {
    match value {
        Value::Object(map) => map.iter().find_map(|(key, v)| match v {
            Value::String(s) if key == field => Some(s.as_str()),
            _ => find_string_field(v, field),
        }),
        Value::Array(items) => items.iter().find_map(|v| find_string_field(v, field)),
        _ => None,
    }
}

/// Lexical search for `"field"` followed by `:` and a quoted value.
///
/// Backslash escapes inside the value are honoured; the value ends at the
/// first unescaped quote. Escaped characters are kept without their backslash.
fn scan_string_field(artifact: &[u8], field: &str) -> Option<String> {
    let needle = format!("\"{}\"", field);
    let needle = needle.as_bytes();

    let mut from = 0;
    while let Some(rel) = find_bytes(&artifact[from..], needle) {
        let mut pos = from + rel + needle.len();
        while matches!(artifact.get(pos), Some(b' ' | b'\t' | b'\r' | b'\n' | b':')) {
            pos += 1;
        }

        if artifact.get(pos) == Some(&b'"') {
            let mut value = Vec::new();
            pos += 1;
            loop {
                match *artifact.get(pos)? {
                    b'"' => return Some(String::from_utf8_lossy(&value).into_owned()),
                    b'\\' => {
                        value.push(*artifact.get(pos + 1)?);
                        pos += 2;
                    }
                    b => {
                        value.push(b);
                        pos += 1;
                    }
                }
            }
        }
        from += rel + 1;
    }
    None
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Standard alphabet, padding optional.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode the alphabet symbols that precede the first `=`, ignoring anything
/// else (whitespace, line breaks, stray characters).
fn decode_token(encoded: &str) -> Result<Vec<u8>> {
    let mut symbols: Vec<u8> = encoded
        .bytes()
        .take_while(|&b| b != b'=')
        .filter(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
        .collect();
    // A lone trailing symbol holds fewer than 8 bits.
    if symbols.len() % 4 == 1 {
        symbols.pop();
    }

    let bytes = LENIENT
        .decode(&symbols)
        .map_err(|e| CredScanError::Format(format!("key token is not valid base64: {}", e)))?;
    if bytes.is_empty() {
        return Err(CredScanError::Format("key token is empty".to_string()));
    }
    Ok(bytes)
}
