//! ISO-8601 durations and submission timestamps.
//!
//! Late-submission periods arrive from the grading service as ISO-8601
//! duration strings (`P1D`, `PT12H`, `P1DT6H30M`). Calendar units (years,
//! months) have no fixed length and are rejected.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use thiserror::Error;

const MS_PER_SECOND: f64 = 1_000.0;
const SECONDS_PER_MINUTE: f64 = 60.0;
const SECONDS_PER_HOUR: f64 = 3_600.0;
const SECONDS_PER_DAY: f64 = 86_400.0;
const SECONDS_PER_WEEK: f64 = 604_800.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("duration is empty")]
    Empty,
    #[error("duration must start with 'P': {0}")]
    MissingDesignator(String),
    #[error("unsupported duration unit '{unit}' in {input}")]
    UnsupportedUnit { unit: char, input: String },
    #[error("malformed duration: {0}")]
    Malformed(String),
    #[error("duration out of range: {0}")]
    OutOfRange(String),
    #[error("malformed timestamp: {0}")]
    Timestamp(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Section {
    Date,
    Time,
}

fn unit_seconds(section: Section, unit: char) -> Option<(f64, u8)> {
    // Second tuple member is the position of the unit within its section;
    // components must appear in strictly increasing position.
    match (section, unit) {
        (Section::Date, 'W') => Some((SECONDS_PER_WEEK, 0)),
        (Section::Date, 'D') => Some((SECONDS_PER_DAY, 1)),
        (Section::Time, 'H') => Some((SECONDS_PER_HOUR, 2)),
        (Section::Time, 'M') => Some((SECONDS_PER_MINUTE, 3)),
        (Section::Time, 'S') => Some((1.0, 4)),
        _ => None,
    }
}

/// Parse an ISO-8601 duration such as `P1D`, `PT36H` or `P1DT0.5S`.
pub fn parse_iso8601(input: &str) -> Result<TimeDelta, DurationError> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(DurationError::Empty);
    }
    let upper = raw.to_ascii_uppercase();
    let Some(body) = upper.strip_prefix('P') else {
        return Err(DurationError::MissingDesignator(raw.to_string()));
    };

    let mut section = Section::Date;
    let mut number = String::new();
    let mut last_rank: Option<u8> = None;
    let mut components = 0_usize;
    let mut time_components = 0_usize;
    let mut total_seconds = 0.0_f64;

    for ch in body.chars() {
        if ch.is_ascii_digit() || ch == '.' || ch == ',' {
            number.push(if ch == ',' { '.' } else { ch });
            continue;
        }
        if ch == 'T' {
            if section == Section::Time || !number.is_empty() {
                return Err(DurationError::Malformed(raw.to_string()));
            }
            section = Section::Time;
            continue;
        }
        if matches!((section, ch), (Section::Date, 'Y') | (Section::Date, 'M')) {
            return Err(DurationError::UnsupportedUnit {
                unit: ch,
                input: raw.to_string(),
            });
        }
        let Some((seconds, rank)) = unit_seconds(section, ch) else {
            return Err(DurationError::Malformed(raw.to_string()));
        };
        if number.is_empty() || last_rank.map(|r| rank <= r).unwrap_or(false) {
            return Err(DurationError::Malformed(raw.to_string()));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| DurationError::Malformed(raw.to_string()))?;
        total_seconds += value * seconds;
        number.clear();
        last_rank = Some(rank);
        components += 1;
        if section == Section::Time {
            time_components += 1;
        }
    }

    if !number.is_empty() || components == 0 {
        return Err(DurationError::Malformed(raw.to_string()));
    }
    if section == Section::Time && time_components == 0 {
        return Err(DurationError::Malformed(raw.to_string()));
    }

    let millis = (total_seconds * MS_PER_SECOND).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return Err(DurationError::OutOfRange(raw.to_string()));
    }
    TimeDelta::try_milliseconds(millis as i64)
        .ok_or_else(|| DurationError::OutOfRange(raw.to_string()))
}

/// Render a duration in canonical ISO-8601 form (days and clock units only).
pub fn format_iso8601(delta: &TimeDelta) -> String {
    let total_ms = delta.num_milliseconds();
    if total_ms == 0 {
        return "PT0S".to_string();
    }
    let sign = if total_ms < 0 { "-" } else { "" };
    let mut rest = total_ms.unsigned_abs();

    let ms_per_day = 86_400_000_u64;
    let days = rest / ms_per_day;
    rest %= ms_per_day;
    let hours = rest / 3_600_000;
    rest %= 3_600_000;
    let minutes = rest / 60_000;
    rest %= 60_000;
    let seconds = rest / 1_000;
    let millis = rest % 1_000;

    let mut out = format!("{sign}P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || seconds > 0 || millis > 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if millis > 0 {
            let frac = format!("{millis:03}");
            out.push_str(&format!("{seconds}.{}S", frac.trim_end_matches('0')));
        } else if seconds > 0 {
            out.push_str(&format!("{seconds}S"));
        }
    }
    out
}

/// Parse a submission or due-date timestamp.
///
/// RFC 3339 values keep their offset; naive values (`2024-03-01T12:00:00`,
/// optionally with fractional seconds or a space separator) are taken as UTC,
/// which is how the grading service stores them.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, DurationError> {
    let raw = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(DurationError::Timestamp(raw.to_string()))
}

/// Serde adapter for ISO-8601 duration strings.
pub mod iso8601 {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(delta: &TimeDelta, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_iso8601(delta))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<TimeDelta, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_iso8601(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for lenient timestamps, written back as RFC 3339.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            ts: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(v) => super::serialize(v, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw: Option<String> = Option::deserialize(d)?;
            match raw {
                Some(v) if !v.trim().is_empty() => super::super::parse_timestamp(&v)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}
