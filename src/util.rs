use libsoc::{Error, Result};
use std::convert::TryFrom;
use std::fmt::Write;

macro_rules! regex_validator {
    ($expression:expr) => ({
        use regex::Regex;
        let ex = Regex::new($expression).unwrap();
        move |val: String| {
            if ex.is_match(val.as_str()) {
                Ok(())
            } else {
                Err(format!("\"{}\" does not match {}", val, ex))
            }
        }
    })
}

/// Matches decimal and `0x` prefixed hexadecimal numbers.
pub const NUMBER: &str = r"^(0x[0-9a-fA-F]+|\d+)$";

/// Matches one or more hex bytes separated by whitespace or commas.
pub const HEX_BYTES: &str = r"^\s*((0x)?[0-9a-fA-F]{1,2}[\s,]*)+$";

/// Parses a number that may be given in hexadecimal with a `0x` prefix.
pub fn parse_number<T>(s: &str) -> Result<T>
where
    T: TryFrom<u64>,
{
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse::<u64>().ok(),
    };
    parsed
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| Error::InvalidArgument(format!("invalid number: \"{}\"", s)))
}

/// Parses bytes written like `01 80 ff`, `0x01,0x80` or `0180ff`.
pub fn parse_bytes<'a, I>(values: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut bytes = Vec::new();
    for value in values {
        for token in value.split(|c: char| c.is_whitespace() || c == ',') {
            let token = token.strip_prefix("0x").unwrap_or(token);
            if token.is_empty() {
                continue;
            }
            if token.len() % 2 != 0 && token.len() > 2 {
                return Err(Error::InvalidArgument(format!("odd number of hex digits: \"{}\"", token)));
            }
            for pair in token.as_bytes().chunks(2) {
                let byte = std::str::from_utf8(pair)
                    .ok()
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                    .ok_or_else(|| Error::InvalidArgument(format!("invalid hex byte: \"{}\"", token)))?;
                bytes.push(byte);
            }
        }
    }
    if bytes.is_empty() {
        return Err(Error::InvalidArgument("no bytes given".to_string()));
    }
    Ok(bytes)
}

/// Formats bytes the way `parse_bytes` reads them.
pub fn format_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:02x}", b);
    }
    out
}
