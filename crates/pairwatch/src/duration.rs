//! Duration strings in the `1h30m`, `500ms`, `2s` style.
//!
//! A duration is a sequence of decimal numbers, each with an optional fraction
//! and a unit suffix: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. A bare `0` is
//! also accepted. Negative durations are rejected.

use serde::{Deserialize, Deserializer};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid duration '{input}': {reason}")]
pub struct ParseDurationError {
    pub input: String,
    pub reason: &'static str,
}

const UNITS: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 3600 * 1_000_000_000),
];

pub fn parse_duration(input: &str) -> Result<Duration, ParseDurationError> {
    let err = |reason| ParseDurationError {
        input: input.to_string(),
        reason,
    };

    let s = input.trim();
    if s.is_empty() {
        return Err(err("empty string"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.starts_with('-') {
        return Err(err("negative durations are not allowed"));
    }
    let mut rest = s.strip_prefix('+').unwrap_or(s);

    let mut total_nanos: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(err("expected a number"));
        }
        let number = &rest[..number_len];
        rest = &rest[number_len..];

        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && frac.is_empty()) || frac.contains('.') {
            return Err(err("malformed number"));
        }

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        if unit_len == 0 {
            return Err(err("missing unit"));
        }
        let unit = &rest[..unit_len];
        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| err("unknown unit"))?;
        rest = &rest[unit_len..];

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| err("out of range"))?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(|| err("out of range"))?;
        // Fraction digits beyond nanosecond precision are dropped.
        let mut place = scale;
        for digit in frac.bytes() {
            place /= 10;
            if place == 0 {
                break;
            }
            nanos += u128::from(digit - b'0') * place;
        }
        total_nanos = total_nanos
            .checked_add(nanos)
            .ok_or_else(|| err("out of range"))?;
    }

    let secs = u64::try_from(total_nanos / 1_000_000_000).map_err(|_| err("out of range"))?;
    Ok(Duration::new(secs, (total_nanos % 1_000_000_000) as u32))
}

/// Render a duration in the same style, e.g. `1h30m0s`.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    let millis = d.subsec_millis();
    if total == 0 && millis > 0 {
        return format!("{millis}ms");
    }
    let secs = if millis > 0 {
        format!("{s}.{millis:03}s")
    } else {
        format!("{s}s")
    };
    match (h, m) {
        (0, 0) => secs,
        (0, m) => format!("{m}m{secs}"),
        (h, m) => format!("{h}h{m}m{secs}"),
    }
}

/// serde helper: deserialize a duration string.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}
