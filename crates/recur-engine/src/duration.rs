//! ISO 8601 basic-format durations (the RFC 5545 `dur-value` type).
//!
//! ```text
//! dur-value = ["+" / "-"] "P" (dur-week / [n "D"] ["T" [n "H"] [n "M"] [n "S"]])
//! dur-week  = n "W"
//! ```
//!
//! A [`Duration`] is a magnitude in seconds plus a sign. The week form is
//! remembered so that `P7W` re-serializes as `P7W`; any other input collapses
//! to the day/time form (`PT90M` renders as `PT1H30M`).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::{RecurError, Result};

pub const SECONDS_PER_MINUTE: u64 = 60;
pub const SECONDS_PER_HOUR: u64 = 3_600;
pub const SECONDS_PER_DAY: u64 = 86_400;
pub const SECONDS_PER_WEEK: u64 = 604_800;

/// The fixed set of units a duration can be converted to or built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 5] = [
        TimeUnit::Week,
        TimeUnit::Day,
        TimeUnit::Hour,
        TimeUnit::Minute,
        TimeUnit::Second,
    ];

    /// Number of seconds in one unit.
    pub fn seconds(self) -> u64 {
        match self {
            TimeUnit::Week => SECONDS_PER_WEEK,
            TimeUnit::Day => SECONDS_PER_DAY,
            TimeUnit::Hour => SECONDS_PER_HOUR,
            TimeUnit::Minute => SECONDS_PER_MINUTE,
            TimeUnit::Second => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Week => "week",
            TimeUnit::Day => "day",
            TimeUnit::Hour => "hour",
            TimeUnit::Minute => "minute",
            TimeUnit::Second => "second",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = RecurError;

    fn from_str(s: &str) -> Result<Self> {
        TimeUnit::ALL
            .into_iter()
            .find(|unit| unit.as_str() == s)
            .ok_or_else(|| RecurError::UnknownTimeUnit(s.to_string()))
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signed span of time parsed from, or rendered to, `dur-value` text.
///
/// Equality and hashing compare the signed number of seconds, so `P1W` equals
/// `P7D` even though they render differently. `-PT0S` equals `PT0S`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Duration {
    seconds: u64,
    negative: bool,
    week_form: bool,
}

impl Duration {
    pub const ZERO: Duration = Duration {
        seconds: 0,
        negative: false,
        week_form: false,
    };

    /// A positive duration in day/time form.
    pub fn from_seconds(seconds: u64) -> Self {
        Duration {
            seconds,
            negative: false,
            week_form: false,
        }
    }

    /// A positive duration in week form (`P<n>W`).
    ///
    /// # Errors
    /// Returns `RecurError::MalformedDuration` if the total overflows `u64` seconds.
    pub fn from_weeks(weeks: u64) -> Result<Self> {
        let seconds = weeks
            .checked_mul(SECONDS_PER_WEEK)
            .ok_or_else(|| RecurError::MalformedDuration(format!("P{}W", weeks)))?;
        Ok(Duration {
            seconds,
            negative: false,
            week_form: true,
        })
    }

    /// Build a duration from a count of `unit`s. Weeks keep the week form.
    ///
    /// # Errors
    /// Returns `RecurError::MalformedDuration` if the total overflows `u64` seconds.
    pub fn from_unit(amount: u64, unit: TimeUnit) -> Result<Self> {
        if unit == TimeUnit::Week {
            return Duration::from_weeks(amount);
        }
        amount
            .checked_mul(unit.seconds())
            .map(Duration::from_seconds)
            .ok_or_else(|| RecurError::MalformedDuration(format!("{} {}s", amount, unit)))
    }

    /// The same magnitude with the opposite sign.
    pub fn negated(self) -> Self {
        Duration {
            negative: !self.negative,
            ..self
        }
    }

    /// Magnitude in seconds, ignoring the sign.
    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn is_negative(&self) -> bool {
        self.negative && self.seconds != 0
    }

    pub fn as_signed_seconds(&self) -> i128 {
        let magnitude = i128::from(self.seconds);
        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Convert to a (possibly fractional) number of `unit`s, sign included.
    pub fn to_unit(&self, unit: TimeUnit) -> f64 {
        self.as_signed_seconds() as f64 / unit.seconds() as f64
    }

    /// Convert to a `chrono::TimeDelta`, or `None` if it is out of chrono's range.
    pub fn to_time_delta(&self) -> Option<TimeDelta> {
        i64::try_from(self.as_signed_seconds())
            .ok()
            .and_then(TimeDelta::try_seconds)
    }
}

impl PartialEq for Duration {
    fn eq(&self, other: &Self) -> bool {
        self.as_signed_seconds() == other.as_signed_seconds()
    }
}

impl Eq for Duration {}

impl Hash for Duration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_signed_seconds().hash(state);
    }
}

impl Default for Duration {
    fn default() -> Self {
        Duration::ZERO
    }
}

// Component slots in grammar order: W, D, H, M, S.
const WEEK: usize = 0;
const DAY: usize = 1;
const HOUR: usize = 2;
const MINUTE: usize = 3;
const SECOND: usize = 4;

impl FromStr for Duration {
    type Err = RecurError;

    fn from_str(text: &str) -> Result<Self> {
        let malformed = || RecurError::MalformedDuration(text.to_string());

        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        let body = unsigned.strip_prefix('P').ok_or_else(malformed)?;
        let bytes = body.as_bytes();

        let mut parts: [Option<u64>; 5] = [None; 5];
        let mut in_time = false;
        let mut next_slot = WEEK;
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] == b'T' {
                if in_time {
                    return Err(malformed());
                }
                in_time = true;
                i += 1;
                continue;
            }

            let digits_start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i == digits_start || i == bytes.len() {
                return Err(malformed());
            }
            let value: u64 = body[digits_start..i].parse().map_err(|_| malformed())?;

            let slot = match (in_time, bytes[i]) {
                (false, b'W') => WEEK,
                (false, b'D') => DAY,
                (true, b'H') => HOUR,
                (true, b'M') => MINUTE,
                (true, b'S') => SECOND,
                _ => return Err(malformed()),
            };
            if slot < next_slot {
                return Err(malformed());
            }
            parts[slot] = Some(value);
            next_slot = slot + 1;
            i += 1;
        }

        let has_time = parts[HOUR..].iter().any(Option::is_some);
        if in_time && !has_time {
            return Err(malformed());
        }
        if parts.iter().all(Option::is_none) {
            return Err(malformed());
        }
        if parts[WEEK].is_some() && (parts[DAY].is_some() || in_time) {
            return Err(malformed());
        }

        let units = [
            SECONDS_PER_WEEK,
            SECONDS_PER_DAY,
            SECONDS_PER_HOUR,
            SECONDS_PER_MINUTE,
            1,
        ];
        let mut seconds: u64 = 0;
        for (part, unit) in parts.iter().zip(units) {
            let value = part.unwrap_or(0);
            seconds = value
                .checked_mul(unit)
                .and_then(|s| seconds.checked_add(s))
                .ok_or_else(malformed)?;
        }

        Ok(Duration {
            seconds,
            negative,
            week_form: parts[WEEK].is_some(),
        })
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        f.write_str("P")?;

        if self.week_form && self.seconds % SECONDS_PER_WEEK == 0 {
            return write!(f, "{}W", self.seconds / SECONDS_PER_WEEK);
        }

        let days = self.seconds / SECONDS_PER_DAY;
        let rem = self.seconds % SECONDS_PER_DAY;
        if days > 0 {
            write!(f, "{}D", days)?;
        }
        if rem > 0 || days == 0 {
            f.write_str("T")?;
            let hours = rem / SECONDS_PER_HOUR;
            let minutes = rem % SECONDS_PER_HOUR / SECONDS_PER_MINUTE;
            let seconds = rem % SECONDS_PER_MINUTE;
            if hours > 0 {
                write!(f, "{}H", hours)?;
            }
            if minutes > 0 {
                write!(f, "{}M", minutes)?;
            }
            if seconds > 0 || rem == 0 {
                write!(f, "{}S", seconds)?;
            }
        }
        Ok(())
    }
}

impl TryFrom<String> for Duration {
    type Error = RecurError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Duration> for String {
    fn from(value: Duration) -> Self {
        value.to_string()
    }
}

/// Convert a duration literal into a count of the named time unit.
///
/// The unit is checked first, so an unknown unit is reported even when the
/// duration text is also malformed.
///
/// # Errors
/// Returns `RecurError::UnknownTimeUnit` for a unit outside
/// `week|day|hour|minute|second`, and `RecurError::MalformedDuration` if the
/// text does not match the duration grammar.
pub fn duration_to(text: &str, unit: &str) -> Result<f64> {
    let unit: TimeUnit = unit.parse()?;
    let duration: Duration = text.parse()?;
    Ok(duration.to_unit(unit))
}
