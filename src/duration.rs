//! Human-readable durations for configuration values like `lookback = "7d"`
//! or `initial_backoff = "500ms"`.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer, Serializer};

const SECS_PER_DAY: u64 = 24 * 60 * 60;
const SECS_PER_HOUR: u64 = 60 * 60;
const SECS_PER_MINUTE: u64 = 60;

/// Parse a duration string like `"7d"`, `"2w"`, `"24h"`, `"30m"`, `"60s"` or
/// `"250ms"`.
///
/// Input is case-insensitive and surrounding whitespace is trimmed.
///
/// ```
/// use ecbrates::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("7d").unwrap(), Duration::from_secs(7 * 24 * 60 * 60));
/// assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .context("Duration must end with a unit (w, d, h, m, s or ms)")?;
    let (num, unit) = s.split_at(split);
    let num: u64 = num.parse().context("Invalid number in duration")?;

    let duration = match unit {
        "ms" => Duration::from_millis(num),
        "s" => Duration::from_secs(num),
        "m" => Duration::from_secs(num.checked_mul(SECS_PER_MINUTE).context("Duration is too large")?),
        "h" => Duration::from_secs(num.checked_mul(SECS_PER_HOUR).context("Duration is too large")?),
        "d" => Duration::from_secs(num.checked_mul(SECS_PER_DAY).context("Duration is too large")?),
        "w" => Duration::from_secs(
            num.checked_mul(7 * SECS_PER_DAY)
                .context("Duration is too large")?,
        ),
        other => anyhow::bail!("Unknown duration unit {other:?}, expected w, d, h, m, s or ms"),
    };

    Ok(duration)
}

/// Format a duration with the largest unit that divides it evenly.
pub fn format_duration(d: Duration) -> String {
    if d.subsec_millis() != 0 || (d.as_secs() == 0 && !d.is_zero()) {
        return format!("{}ms", d.as_millis());
    }

    let secs = d.as_secs();
    if secs >= SECS_PER_DAY && secs % SECS_PER_DAY == 0 {
        format!("{}d", secs / SECS_PER_DAY)
    } else if secs >= SECS_PER_HOUR && secs % SECS_PER_HOUR == 0 {
        format!("{}h", secs / SECS_PER_HOUR)
    } else if secs >= SECS_PER_MINUTE && secs % SECS_PER_MINUTE == 0 {
        format!("{}m", secs / SECS_PER_MINUTE)
    } else {
        format!("{secs}s")
    }
}

/// Whole days in `d`, rounding down.
pub fn whole_days(d: Duration) -> u32 {
    u32::try_from(d.as_secs() / SECS_PER_DAY).unwrap_or(u32::MAX)
}

/// Use with `#[serde(deserialize_with = "deserialize_duration")]`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}

/// Use with `#[serde(serialize_with = "serialize_duration")]`.
pub fn serialize_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_duration(*d))
}
