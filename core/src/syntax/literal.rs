//! Decoding of numeric, character and string literals.

use bumpalo::Bump;
use core::fmt;

/// Errors that can occur when decoding a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralError {
    /// Invalid escape sequence (e.g., `\q`)
    InvalidEscape { pos: usize, seq: char },
    /// Literal text is not terminated by its quote
    Unterminated,
    /// Numeric value does not fit in 64 bits
    OutOfRange,
    /// Empty character literal or a non-digit in a number
    Malformed,
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralError::InvalidEscape { pos, seq } => {
                write!(f, "invalid escape sequence '\\{}' at position {}", seq, pos)
            }
            LiteralError::Unterminated => write!(f, "unterminated literal"),
            LiteralError::OutOfRange => write!(f, "literal out of range"),
            LiteralError::Malformed => write!(f, "malformed literal"),
        }
    }
}

/// Strips the surrounding quotes and decodes escape sequences into the arena.
///
/// Returns the input slice unchanged when there is nothing to unescape.
pub fn unescape<'a>(arena: &'a Bump, quoted: &'a str, quote: char) -> Result<&'a str, LiteralError> {
    let inner = quoted
        .strip_prefix(quote)
        .and_then(|s| s.strip_suffix(quote))
        .ok_or(LiteralError::Unterminated)?;

    if !inner.contains('\\') {
        return Ok(inner);
    }

    let mut output = String::with_capacity(inner.len());
    let mut chars = inner.char_indices();
    while let Some((pos, ch)) = chars.next() {
        if ch != '\\' {
            output.push(ch);
            continue;
        }
        match chars.next() {
            Some((_, 'n')) => output.push('\n'),
            Some((_, 'r')) => output.push('\r'),
            Some((_, 't')) => output.push('\t'),
            Some((_, '0')) => output.push('\0'),
            Some((_, '\\')) => output.push('\\'),
            Some((_, '"')) => output.push('"'),
            Some((_, '\'')) => output.push('\''),
            Some((_, other)) => return Err(LiteralError::InvalidEscape { pos, seq: other }),
            None => return Err(LiteralError::Unterminated),
        }
    }
    Ok(arena.alloc_str(&output))
}

/// Character literal value.
///
/// A single character yields a `char` constant. Longer literals pack up to
/// four UTF-16 units into an integer, first character in the low bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharsValue {
    Char(u16),
    Integer(i64),
}

pub fn decode_chars(arena: &Bump, quoted: &str) -> Result<CharsValue, LiteralError> {
    let text = unescape(arena, quoted, '\'')?;
    let units: Vec<u16> = text.encode_utf16().collect();
    match units.len() {
        0 => Err(LiteralError::Malformed),
        1 => Ok(CharsValue::Char(units[0])),
        n if n <= 4 => {
            let value = units
                .iter()
                .enumerate()
                .fold(0u64, |acc, (i, unit)| acc | (u64::from(*unit) << (16 * i)));
            Ok(CharsValue::Integer(value as i64))
        }
        _ => Err(LiteralError::OutOfRange),
    }
}

/// Parses a number written in `radix`, ignoring `_` separators.
pub fn parse_integer(digits: &str, radix: u32) -> Result<i64, LiteralError> {
    let mut value: u64 = 0;
    let mut seen = false;
    for ch in digits.chars() {
        if ch == '_' {
            continue;
        }
        let digit = ch.to_digit(radix).ok_or(LiteralError::Malformed)?;
        value = value
            .checked_mul(u64::from(radix))
            .and_then(|v| v.checked_add(u64::from(digit)))
            .ok_or(LiteralError::OutOfRange)?;
        seen = true;
    }
    if !seen {
        return Err(LiteralError::Malformed);
    }
    // Binary and hexadecimal literals may spell out the sign bit.
    if radix == 10 && value > i64::MAX as u64 {
        return Err(LiteralError::OutOfRange);
    }
    Ok(value as i64)
}

pub fn parse_real(text: &str) -> Result<f64, LiteralError> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    cleaned.parse::<f64>().map_err(|_| LiteralError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unescape_fast_path_borrows_input() {
        let arena = Bump::new();
        let out = unescape(&arena, "\"plain\"", '"').unwrap();
        assert_eq!(out, "plain");
    }

    #[test]
    fn test_unescape_sequences() {
        let arena = Bump::new();
        let out = unescape(&arena, r#""a\tb\n\"c\"""#, '"').unwrap();
        assert_eq!(out, "a\tb\n\"c\"");
    }

    #[test]
    fn test_unescape_invalid() {
        let arena = Bump::new();
        let err = unescape(&arena, r#""\q""#, '"').unwrap_err();
        assert_eq!(err, LiteralError::InvalidEscape { pos: 0, seq: 'q' });
    }

    #[test]
    fn test_chars() {
        let arena = Bump::new();
        assert_eq!(decode_chars(&arena, "'a'").unwrap(), CharsValue::Char(97));
        assert_eq!(
            decode_chars(&arena, "'ab'").unwrap(),
            CharsValue::Integer(97 | (98 << 16))
        );
        assert_eq!(decode_chars(&arena, "''"), Err(LiteralError::Malformed));
    }

    #[test]
    fn test_integers() {
        assert_eq!(parse_integer("1_000", 10), Ok(1000));
        assert_eq!(parse_integer("ff", 16), Ok(255));
        assert_eq!(parse_integer("1010", 2), Ok(10));
        assert_eq!(
            parse_integer("99999999999999999999", 10),
            Err(LiteralError::OutOfRange)
        );
        assert_eq!(parse_integer("ffffffffffffffff", 16), Ok(-1));
    }
}
