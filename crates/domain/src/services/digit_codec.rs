//! Single-character encoding of small integers (months and days).
//!
//! 1..=9 map to their decimal digit, 10..=31 to `A`..=`V`. Anything else
//! is unencodable and yields an empty string; callers that need a usable
//! key segment must check for emptiness.

/// Encode `n` as one character, or `""` when `n` is outside 1..=31.
pub fn encode_digit(n: i64) -> String {
    match n {
        1..=9 => n.to_string(),
        10..=31 => char::from(b'A' + (n - 10) as u8).to_string(),
        _ => String::new(),
    }
}

/// Same as [`encode_digit`] for values that arrive as floating point.
///
/// Non-finite and fractional values are unencodable.
pub fn encode_digit_f64(n: f64) -> String {
    if !n.is_finite() || n.fract() != 0.0 {
        return String::new();
    }
    encode_digit(n as i64)
}
