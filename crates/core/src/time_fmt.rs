// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duration parsing and formatting shared by config, directives and output.
//!
//! Two input forms are accepted:
//!
//! ```text
//! suffix form:  30s  5m  2h  1d  250ms  90 (bare seconds)
//! clock form:   MM:SS  HH:MM:SS  D-HH:MM:SS   (scheduler wall-time syntax)
//! ```

use std::time::Duration;

/// Parse a duration string in suffix or clock form.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }
    if s.contains(':') {
        return parse_clock(s);
    }

    let (num_str, suffix) = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| (&s[..i], &s[i..]))
        .unwrap_or((s, ""));

    let num: u64 = num_str.parse().map_err(|_| format!("invalid number in duration: {}", s))?;

    let multiplier = match suffix.trim() {
        "ms" | "millis" | "millisecond" | "milliseconds" => {
            return Ok(Duration::from_millis(num));
        }
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3600,
        "d" | "day" | "days" => 86400,
        other => return Err(format!("unknown duration suffix: {}", other)),
    };

    Ok(Duration::from_secs(num * multiplier))
}

/// Parse `MM:SS`, `HH:MM:SS` or `D-HH:MM:SS`.
fn parse_clock(s: &str) -> Result<Duration, String> {
    let (days, rest) = match s.split_once('-') {
        Some((d, rest)) => {
            (d.parse::<u64>().map_err(|_| format!("invalid day count in duration: {}", s))?, rest)
        }
        None => (0, s),
    };

    let parts = rest
        .split(':')
        .map(|p| p.parse::<u64>().map_err(|_| format!("invalid clock duration: {}", s)))
        .collect::<Result<Vec<_>, _>>()?;

    let (h, m, sec) = match parts.as_slice() {
        [m, sec] => (0, *m, *sec),
        [h, m, sec] => (*h, *m, *sec),
        _ => return Err(format!("invalid clock duration: {}", s)),
    };
    if m >= 60 || sec >= 60 {
        return Err(format!("minutes and seconds must be below 60: {}", s));
    }

    Ok(Duration::from_secs(days * 86400 + h * 3600 + m * 60 + sec))
}

/// Format a duration compactly for humans ("45s", "2m30s", "1h5m", "2d3h").
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs == 0 && d.subsec_millis() > 0 {
        return format!("{}ms", d.subsec_millis());
    }
    let (days, hours, mins, s) = (secs / 86400, (secs % 86400) / 3600, (secs % 3600) / 60, secs % 60);
    match (days, hours, mins) {
        (0, 0, 0) => format!("{}s", s),
        (0, 0, _) if s == 0 => format!("{}m", mins),
        (0, 0, _) => format!("{}m{}s", mins, s),
        (0, _, 0) => format!("{}h", hours),
        (0, _, _) => format!("{}h{}m", hours, mins),
        (_, 0, _) => format!("{}d", days),
        _ => format!("{}d{}h", days, hours),
    }
}

/// `HH:MM:SS` with unbounded hours (PBS `walltime`), rounding sub-second up.
pub fn format_hms(d: Duration) -> String {
    let secs = ceil_secs(d);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// `D-HH:MM:SS` once a day or more, else `HH:MM:SS` (Slurm `--time`).
pub fn format_dhms(d: Duration) -> String {
    let secs = ceil_secs(d);
    if secs < 86400 {
        return format_hms(Duration::from_secs(secs));
    }
    let days = secs / 86400;
    let rest = secs % 86400;
    format!("{}-{:02}:{:02}:{:02}", days, rest / 3600, (rest % 3600) / 60, rest % 60)
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// Serde adapter storing durations as human strings (`"5s"`, `"2m"`).
pub mod serde_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
