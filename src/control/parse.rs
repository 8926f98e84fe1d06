//! Request payload parsing.
//!
//! Integers accept an optional sign (signed parsers only), then a base prefix: `0x`,
//! `0o`, `0b`, or a bare leading `0` for octal. Underscores may separate digits.
//! Surrounding whitespace is ignored. Every failure is a validation error, raised
//! before any actor is involved.

use midikey_core::{Error, Result};

/// Signed integer that fits in `bits` bits.
pub fn parse_int(text: &str, bits: u32) -> Result<i64> {
    let text = text.trim();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = parse_magnitude(text, digits)?;

    let limit = 1u64 << (bits - 1);
    let value = if negative {
        (magnitude <= limit).then(|| -(magnitude as i128) as i64)
    } else {
        (magnitude < limit).then_some(magnitude as i64)
    };
    value.ok_or_else(|| out_of_range(text, bits))
}

/// Unsigned integer that fits in `bits` bits.
pub fn parse_uint(text: &str, bits: u32) -> Result<u64> {
    let text = text.trim();
    let value = parse_magnitude(text, text)?;
    if bits < 64 && value >= 1u64 << bits {
        return Err(out_of_range(text, bits));
    }
    Ok(value)
}

/// Finite float.
pub fn parse_float(text: &str) -> Result<f64> {
    let text = text.trim();
    let value: f64 = text
        .parse()
        .map_err(|_| Error::Validation(format!("invalid number {text:?}")))?;
    if !value.is_finite() {
        return Err(Error::Validation(format!("number {text:?} is not finite")));
    }
    Ok(value)
}

fn parse_magnitude(original: &str, digits: &str) -> Result<u64> {
    let invalid = || Error::Validation(format!("invalid integer {original:?}"));

    let (radix, body, prefixed) = split_radix(digits);
    if !underscores_ok(body, prefixed) {
        return Err(invalid());
    }
    let cleaned: String = body.chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid());
    }
    u64::from_str_radix(&cleaned, radix).map_err(|_| invalid())
}

/// `(radix, digits after prefix, had a prefix)`.
fn split_radix(digits: &str) -> (u32, &str, bool) {
    let bytes = digits.as_bytes();
    if bytes.first() != Some(&b'0') || bytes.len() < 2 {
        return (10, digits, false);
    }
    match bytes[1] {
        b'x' | b'X' => (16, &digits[2..], true),
        b'o' | b'O' => (8, &digits[2..], true),
        b'b' | b'B' => (2, &digits[2..], true),
        _ => (8, &digits[1..], true),
    }
}

/// Underscores only between digits, or right after a base prefix.
fn underscores_ok(body: &str, prefixed: bool) -> bool {
    if body.ends_with('_') || body.contains("__") {
        return false;
    }
    prefixed || !body.starts_with('_')
}

fn out_of_range(text: &str, bits: u32) -> Error {
    Error::Validation(format!("{text:?} out of range for {bits}-bit value"))
}
