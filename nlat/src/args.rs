use anyhow::{Context, Result};
use std::time::Duration;

/// Parse an on/off switch the way `atoi` would: a leading integer, non-zero means on.
///
/// Anything without a leading integer is off, so this never fails. The `Result` only matches
/// what clap expects from a `value_parser`.
///
/// # Examples
/// ```rust
/// use nlat::args::parse_switch;
///
/// assert!(parse_switch("1").unwrap());
/// assert!(parse_switch(" 2x").unwrap());
/// assert!(!parse_switch("0").unwrap());
/// assert!(!parse_switch("yes").unwrap());
/// ```
pub fn parse_switch(value: &str) -> Result<bool> {
    Ok(atoi(value) != 0)
}

/// Parse a number of milliseconds, `0` means no wait at all.
pub fn parse_millis(value: &str) -> Result<Duration> {
    let ms = value.trim().parse::<u64>().context(format!(
        "`{}` is not a number of milliseconds",
        value
    ))?;
    Ok(Duration::from_millis(ms))
}

/// Parse a number of microseconds, `0` means no wait at all.
pub fn parse_micros(value: &str) -> Result<Duration> {
    let us = value.trim().parse::<u64>().context(format!(
        "`{}` is not a number of microseconds",
        value
    ))?;
    Ok(Duration::from_micros(us))
}

fn atoi(s: &str) -> i64 {
    let s = s.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    // overflowing values are still non-zero
    digits[..end]
        .parse::<i64>()
        .map(|n| sign * n)
        .unwrap_or(if end > 0 { 1 } else { 0 })
}
