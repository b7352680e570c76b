//! The validated recurrence rule model.
//!
//! A [`RecurrenceRule`] is built once through [`RuleBuilder`] (or parsed from
//! RRULE value text) and is read-only afterwards. Changing a rule means
//! calling [`RecurrenceRule::to_builder`] and building a new one, so a rule is
//! never observable in a partially valid state.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{RecurError, Result};
use crate::expander::{ExpansionWindow, Occurrences};
use crate::grammar::{self, RuleField};

/// The FREQ rule part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub const ALL: [Frequency; 7] = [
        Frequency::Secondly,
        Frequency::Minutely,
        Frequency::Hourly,
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Yearly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Secondly => "SECONDLY",
            Frequency::Minutely => "MINUTELY",
            Frequency::Hourly => "HOURLY",
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

impl FromStr for Frequency {
    type Err = RecurError;

    fn from_str(s: &str) -> Result<Self> {
        Frequency::ALL
            .into_iter()
            .find(|freq| freq.as_str() == s)
            .ok_or_else(|| RecurError::InvalidRule(format!("unknown FREQ value '{}'", s)))
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A day of the week, identified by its two-letter iCalendar code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(rename = "MO")]
    Monday,
    #[serde(rename = "TU")]
    Tuesday,
    #[serde(rename = "WE")]
    Wednesday,
    #[serde(rename = "TH")]
    Thursday,
    #[serde(rename = "FR")]
    Friday,
    #[serde(rename = "SA")]
    Saturday,
    #[serde(rename = "SU")]
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Weekday::Monday => "MO",
            Weekday::Tuesday => "TU",
            Weekday::Wednesday => "WE",
            Weekday::Thursday => "TH",
            Weekday::Friday => "FR",
            Weekday::Saturday => "SA",
            Weekday::Sunday => "SU",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Weekday::ALL.into_iter().find(|day| day.code() == code)
    }

    /// Monday = 0 … Sunday = 6.
    pub fn days_from_monday(self) -> u32 {
        self.to_chrono().num_days_from_monday()
    }

    pub fn to_chrono(self) -> chrono::Weekday {
        match self {
            Weekday::Monday => chrono::Weekday::Mon,
            Weekday::Tuesday => chrono::Weekday::Tue,
            Weekday::Wednesday => chrono::Weekday::Wed,
            Weekday::Thursday => chrono::Weekday::Thu,
            Weekday::Friday => chrono::Weekday::Fri,
            Weekday::Saturday => chrono::Weekday::Sat,
            Weekday::Sunday => chrono::Weekday::Sun,
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        Weekday::ALL[day.num_days_from_monday() as usize]
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A `BYDAY` entry: a weekday, optionally qualified by its nth (or nth from
/// last, when negative) occurrence within the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrdinalWeekday {
    ordinal: Option<i8>,
    weekday: Weekday,
}

impl OrdinalWeekday {
    /// Every occurrence of `weekday` in the period.
    pub fn every(weekday: Weekday) -> Self {
        OrdinalWeekday {
            ordinal: None,
            weekday,
        }
    }

    /// The `n`th occurrence of `weekday` (`-1` is the last). Range checks
    /// happen when the rule is built.
    pub fn nth(n: i8, weekday: Weekday) -> Self {
        OrdinalWeekday {
            ordinal: Some(n),
            weekday,
        }
    }

    pub fn ordinal(&self) -> Option<i8> {
        self.ordinal
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }
}

impl From<Weekday> for OrdinalWeekday {
    fn from(weekday: Weekday) -> Self {
        OrdinalWeekday::every(weekday)
    }
}

impl FromStr for OrdinalWeekday {
    type Err = RecurError;

    fn from_str(s: &str) -> Result<Self> {
        grammar::parse_weekday_token(0, s)
    }
}

impl fmt::Display for OrdinalWeekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ordinal {
            Some(n) => write!(f, "{}{}", n, self.weekday),
            None => write!(f, "{}", self.weekday),
        }
    }
}

/// How a rule terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bound {
    #[default]
    Unbounded,
    Count(u32),
    /// Inclusive end instant.
    Until(NaiveDateTime),
}

/// The by-X constraint lists of a rule. `None` means the rule part is absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ByRules {
    pub by_second: Option<Vec<u8>>,
    pub by_minute: Option<Vec<u8>>,
    pub by_hour: Option<Vec<u8>>,
    pub by_day: Option<Vec<OrdinalWeekday>>,
    pub by_month_day: Option<Vec<i8>>,
    pub by_year_day: Option<Vec<i16>>,
    pub by_week_no: Option<Vec<i8>>,
    pub by_month: Option<Vec<u8>>,
    pub by_set_pos: Option<Vec<i16>>,
}

impl ByRules {
    /// Whether any list other than `BYSETPOS` is present.
    fn has_selector(&self) -> bool {
        self.by_second.is_some()
            || self.by_minute.is_some()
            || self.by_hour.is_some()
            || self.by_day.is_some()
            || self.by_month_day.is_some()
            || self.by_year_day.is_some()
            || self.by_week_no.is_some()
            || self.by_month.is_some()
    }

    fn validate(&self) -> Result<()> {
        fn check<T>(field: RuleField, list: &Option<Vec<T>>) -> Result<()>
        where
            T: Copy + Into<i16> + fmt::Display,
        {
            list.as_deref()
                .map_or(Ok(()), |values| grammar::validate_list(field, values))
        }

        check(RuleField::BySecond, &self.by_second)?;
        check(RuleField::ByMinute, &self.by_minute)?;
        check(RuleField::ByHour, &self.by_hour)?;
        if let Some(days) = &self.by_day {
            grammar::validate_weekday_list(days)?;
        }
        check(RuleField::ByMonthDay, &self.by_month_day)?;
        check(RuleField::ByYearDay, &self.by_year_day)?;
        check(RuleField::ByWeekNo, &self.by_week_no)?;
        check(RuleField::ByMonth, &self.by_month)?;
        check(RuleField::BySetPos, &self.by_set_pos)
    }

    /// Collapse duplicates, keeping the first occurrence. `BYDAY` is kept as declared.
    fn deduplicated(self) -> Self {
        ByRules {
            by_second: self.by_second.map(dedup_ordered),
            by_minute: self.by_minute.map(dedup_ordered),
            by_hour: self.by_hour.map(dedup_ordered),
            by_day: self.by_day,
            by_month_day: self.by_month_day.map(dedup_ordered),
            by_year_day: self.by_year_day.map(dedup_ordered),
            by_week_no: self.by_week_no.map(dedup_ordered),
            by_month: self.by_month.map(dedup_ordered),
            by_set_pos: self.by_set_pos.map(dedup_ordered),
        }
    }
}

fn dedup_ordered<T: PartialEq>(values: Vec<T>) -> Vec<T> {
    let mut unique: Vec<T> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}

/// Collects rule parts and validates them in [`RuleBuilder::build`].
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    frequency: Frequency,
    interval: Option<u32>,
    count: Option<u32>,
    until: Option<NaiveDateTime>,
    by: ByRules,
    week_start: Option<Weekday>,
}

impl RuleBuilder {
    pub fn new(frequency: Frequency) -> Self {
        RuleBuilder {
            frequency,
            interval: None,
            count: None,
            until: None,
            by: ByRules::default(),
            week_start: None,
        }
    }

    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn interval(mut self, interval: u32) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn until(mut self, until: NaiveDateTime) -> Self {
        self.until = Some(until);
        self
    }

    /// Replace any count/until with `bound`.
    pub fn bound(mut self, bound: Bound) -> Self {
        (self.count, self.until) = match bound {
            Bound::Unbounded => (None, None),
            Bound::Count(n) => (Some(n), None),
            Bound::Until(t) => (None, Some(t)),
        };
        self
    }

    pub fn by_second(mut self, seconds: impl Into<Vec<u8>>) -> Self {
        self.by.by_second = Some(seconds.into());
        self
    }

    pub fn by_minute(mut self, minutes: impl Into<Vec<u8>>) -> Self {
        self.by.by_minute = Some(minutes.into());
        self
    }

    pub fn by_hour(mut self, hours: impl Into<Vec<u8>>) -> Self {
        self.by.by_hour = Some(hours.into());
        self
    }

    pub fn by_day(mut self, days: impl Into<Vec<OrdinalWeekday>>) -> Self {
        self.by.by_day = Some(days.into());
        self
    }

    pub fn by_month_day(mut self, days: impl Into<Vec<i8>>) -> Self {
        self.by.by_month_day = Some(days.into());
        self
    }

    pub fn by_year_day(mut self, days: impl Into<Vec<i16>>) -> Self {
        self.by.by_year_day = Some(days.into());
        self
    }

    pub fn by_week_no(mut self, weeks: impl Into<Vec<i8>>) -> Self {
        self.by.by_week_no = Some(weeks.into());
        self
    }

    pub fn by_month(mut self, months: impl Into<Vec<u8>>) -> Self {
        self.by.by_month = Some(months.into());
        self
    }

    pub fn by_set_pos(mut self, positions: impl Into<Vec<i16>>) -> Self {
        self.by.by_set_pos = Some(positions.into());
        self
    }

    pub fn week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = Some(week_start);
        self
    }

    /// Set a by-X list from its RRULE text, e.g. `(RuleField::ByDay, "MO,-1FR")`.
    ///
    /// # Errors
    /// Returns `RecurError::MalformedRuleList` if the text fails the field's grammar.
    pub fn by_list_text(mut self, field: RuleField, text: &str) -> Result<Self> {
        match field {
            RuleField::BySecond => self.by.by_second = Some(grammar::parse_second_list(text)?),
            RuleField::ByMinute => self.by.by_minute = Some(grammar::parse_minute_list(text)?),
            RuleField::ByHour => self.by.by_hour = Some(grammar::parse_hour_list(text)?),
            RuleField::ByDay => self.by.by_day = Some(grammar::parse_weekday_list(text)?),
            RuleField::ByMonthDay => {
                self.by.by_month_day = Some(grammar::parse_month_day_list(text)?)
            }
            RuleField::ByYearDay => self.by.by_year_day = Some(grammar::parse_year_day_list(text)?),
            RuleField::ByWeekNo => self.by.by_week_no = Some(grammar::parse_week_no_list(text)?),
            RuleField::ByMonth => self.by.by_month = Some(grammar::parse_month_list(text)?),
            RuleField::BySetPos => self.by.by_set_pos = Some(grammar::parse_set_pos_list(text)?),
        }
        Ok(self)
    }

    /// Validate the collected parts and produce an immutable rule.
    ///
    /// Checks run in a fixed order and the first failure is reported:
    /// interval, bound, BYWEEKNO frequency, BYSETPOS companion, list domains.
    ///
    /// # Errors
    /// `InvalidRule` for a zero interval, `InvalidBound` for COUNT together with
    /// UNTIL or a zero COUNT, `IncompatibleFrequency` for BYWEEKNO outside
    /// YEARLY, `SetPosRequiresOtherRule` for a lone BYSETPOS, and
    /// `MalformedRuleList` for an empty or out-of-range list.
    pub fn build(self) -> Result<RecurrenceRule> {
        self.validate()
            .inspect_err(|err| tracing::debug!(error = %err, "rejected recurrence rule"))?;

        let bound = match (self.count, self.until) {
            (Some(n), _) => Bound::Count(n),
            (None, Some(t)) => Bound::Until(t),
            (None, None) => Bound::Unbounded,
        };

        Ok(RecurrenceRule {
            frequency: self.frequency,
            interval: self.interval.unwrap_or(1),
            bound,
            by: self.by.deduplicated(),
            week_start: self.week_start.unwrap_or(Weekday::Monday),
        })
    }

    fn validate(&self) -> Result<()> {
        if self.interval == Some(0) {
            return Err(RecurError::InvalidRule(
                "INTERVAL must be a positive integer".to_string(),
            ));
        }
        if self.count.is_some() && self.until.is_some() {
            return Err(RecurError::InvalidBound(
                "COUNT and UNTIL are mutually exclusive".to_string(),
            ));
        }
        if self.count == Some(0) {
            return Err(RecurError::InvalidBound(
                "COUNT must be a positive integer".to_string(),
            ));
        }
        if self.by.by_week_no.is_some() && self.frequency != Frequency::Yearly {
            return Err(RecurError::IncompatibleFrequency(self.frequency));
        }
        if self.by.by_set_pos.is_some() && !self.by.has_selector() {
            return Err(RecurError::SetPosRequiresOtherRule);
        }
        self.by.validate()
    }
}

/// A validated RFC 5545 recurrence rule.
///
/// (De)serializes as its canonical RRULE value text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecurrenceRule {
    frequency: Frequency,
    interval: u32,
    bound: Bound,
    by: ByRules,
    week_start: Weekday,
}

impl RecurrenceRule {
    pub fn builder(frequency: Frequency) -> RuleBuilder {
        RuleBuilder::new(frequency)
    }

    /// A builder pre-filled with this rule's parts, for validated rebuilding.
    pub fn to_builder(&self) -> RuleBuilder {
        RuleBuilder {
            frequency: self.frequency,
            interval: Some(self.interval),
            count: None,
            until: None,
            by: self.by.clone(),
            week_start: Some(self.week_start),
        }
        .bound(self.bound)
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn bound(&self) -> Bound {
        self.bound
    }

    pub fn count(&self) -> Option<u32> {
        match self.bound {
            Bound::Count(n) => Some(n),
            _ => None,
        }
    }

    pub fn until(&self) -> Option<NaiveDateTime> {
        match self.bound {
            Bound::Until(t) => Some(t),
            _ => None,
        }
    }

    pub fn week_start(&self) -> Weekday {
        self.week_start
    }

    pub fn by_rules(&self) -> &ByRules {
        &self.by
    }

    pub fn by_second(&self) -> Option<&[u8]> {
        self.by.by_second.as_deref()
    }

    pub fn by_minute(&self) -> Option<&[u8]> {
        self.by.by_minute.as_deref()
    }

    pub fn by_hour(&self) -> Option<&[u8]> {
        self.by.by_hour.as_deref()
    }

    pub fn by_day(&self) -> Option<&[OrdinalWeekday]> {
        self.by.by_day.as_deref()
    }

    pub fn by_month_day(&self) -> Option<&[i8]> {
        self.by.by_month_day.as_deref()
    }

    pub fn by_year_day(&self) -> Option<&[i16]> {
        self.by.by_year_day.as_deref()
    }

    pub fn by_week_no(&self) -> Option<&[i8]> {
        self.by.by_week_no.as_deref()
    }

    pub fn by_month(&self) -> Option<&[u8]> {
        self.by.by_month.as_deref()
    }

    pub fn by_set_pos(&self) -> Option<&[i16]> {
        self.by.by_set_pos.as_deref()
    }

    /// Canonical text of one by-X list, or `None` if the part is absent.
    pub fn field_text(&self, field: RuleField) -> Option<String> {
        match field {
            RuleField::BySecond => self.by_second().map(grammar::format_list),
            RuleField::ByMinute => self.by_minute().map(grammar::format_list),
            RuleField::ByHour => self.by_hour().map(grammar::format_list),
            RuleField::ByDay => self.by_day().map(grammar::format_list),
            RuleField::ByMonthDay => self.by_month_day().map(grammar::format_list),
            RuleField::ByYearDay => self.by_year_day().map(grammar::format_list),
            RuleField::ByWeekNo => self.by_week_no().map(grammar::format_list),
            RuleField::ByMonth => self.by_month().map(grammar::format_list),
            RuleField::BySetPos => self.by_set_pos().map(grammar::format_list),
        }
    }

    /// Lazily expand this rule from `start` within `window`.
    ///
    /// See [`crate::expander::expand`].
    pub fn occurrences(&self, start: NaiveDateTime, window: ExpansionWindow) -> Occurrences {
        crate::expander::expand(self, start, window)
    }
}

// Order in which by-X parts are written by `Display`.
const DISPLAY_ORDER: [RuleField; 9] = [
    RuleField::ByMonth,
    RuleField::ByWeekNo,
    RuleField::ByYearDay,
    RuleField::ByMonthDay,
    RuleField::ByDay,
    RuleField::ByHour,
    RuleField::ByMinute,
    RuleField::BySecond,
    RuleField::BySetPos,
];

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.frequency)?;
        if self.interval != 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        match self.bound {
            Bound::Unbounded => {}
            Bound::Count(n) => write!(f, ";COUNT={}", n)?,
            Bound::Until(t) => write!(f, ";UNTIL={}", t.format("%Y%m%dT%H%M%S"))?,
        }
        for field in DISPLAY_ORDER {
            if let Some(text) = self.field_text(field) {
                write!(f, ";{}={}", field, text)?;
            }
        }
        if self.week_start != Weekday::Monday {
            write!(f, ";WKST={}", self.week_start)?;
        }
        Ok(())
    }
}

impl FromStr for RecurrenceRule {
    type Err = RecurError;

    /// Parse an RRULE value such as `FREQ=MONTHLY;BYDAY=-1FR;COUNT=6`.
    /// A leading `RRULE:` property name is accepted.
    ///
    /// List tokens are checked while parsing, before the structural checks of
    /// [`RuleBuilder::build`]. `FREQ=DAILY;BYWEEKNO=99` therefore fails with
    /// `MalformedRuleList` rather than `IncompatibleFrequency`.
    fn from_str(text: &str) -> Result<Self> {
        let body = text.strip_prefix("RRULE:").unwrap_or(text);
        if body.is_empty() {
            return Err(RecurError::InvalidRule("empty RRULE string".to_string()));
        }

        let mut seen: Vec<&str> = Vec::new();
        let mut frequency = None;
        let mut interval = None;
        let mut count = None;
        let mut until = None;
        let mut week_start = None;
        let mut lists: Vec<(RuleField, &str)> = Vec::new();

        for part in body.split(';') {
            let (name, value) = part
                .split_once('=')
                .ok_or_else(|| RecurError::InvalidRule(format!("rule part '{}' has no value", part)))?;
            if seen.contains(&name) {
                return Err(RecurError::InvalidRule(format!("duplicate rule part {}", name)));
            }
            seen.push(name);

            match name {
                "FREQ" => frequency = Some(value.parse::<Frequency>()?),
                "INTERVAL" => {
                    interval = Some(parse_digits(value).ok_or_else(|| {
                        RecurError::InvalidRule(format!(
                            "INTERVAL must be a positive integer, got '{}'",
                            value
                        ))
                    })?)
                }
                "COUNT" => {
                    count = Some(parse_digits(value).ok_or_else(|| {
                        RecurError::InvalidBound(format!(
                            "COUNT must be a positive integer, got '{}'",
                            value
                        ))
                    })?)
                }
                "UNTIL" => until = Some(parse_until(value)?),
                "WKST" => {
                    week_start = Some(Weekday::from_code(value).ok_or_else(|| {
                        RecurError::InvalidRule(format!("unknown WKST value '{}'", value))
                    })?)
                }
                other => match RuleField::from_name(other) {
                    Some(field) => lists.push((field, value)),
                    None => {
                        return Err(RecurError::InvalidRule(format!(
                            "unknown rule part '{}'",
                            other
                        )))
                    }
                },
            }
        }

        let frequency =
            frequency.ok_or_else(|| RecurError::InvalidRule("missing FREQ rule part".to_string()))?;

        let mut builder = RuleBuilder::new(frequency);
        builder.interval = interval;
        builder.count = count;
        builder.until = until;
        builder.week_start = week_start;
        for (field, value) in lists {
            builder = builder.by_list_text(field, value)?;
        }
        builder.build()
    }
}

impl TryFrom<String> for RecurrenceRule {
    type Error = RecurError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RecurrenceRule> for String {
    fn from(value: RecurrenceRule) -> Self {
        value.to_string()
    }
}

fn parse_digits(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Parse an UNTIL value: `YYYYMMDD`, `YYYYMMDDTHHMMSS` or `YYYYMMDDTHHMMSSZ`.
///
/// A trailing `Z` is accepted and read in the caller's reference time scale.
/// A date-only value bounds the rule at the last second of that day.
fn parse_until(value: &str) -> Result<NaiveDateTime> {
    let invalid = || RecurError::InvalidBound(format!("malformed UNTIL value '{}'", value));
    let bytes = value.as_bytes();
    let number = |range: std::ops::Range<usize>| -> Option<u32> {
        let digits = value.get(range)?;
        if digits.bytes().all(|b| b.is_ascii_digit()) {
            digits.parse().ok()
        } else {
            None
        }
    };

    let date = match (number(0..4), number(4..6), number(6..8)) {
        (Some(y), Some(m), Some(d)) => {
            NaiveDate::from_ymd_opt(y as i32, m, d).ok_or_else(invalid)?
        }
        _ => return Err(invalid()),
    };

    match bytes.len() {
        8 => date.and_hms_opt(23, 59, 59).ok_or_else(invalid),
        15 | 16 => {
            if bytes[8] != b'T' || (bytes.len() == 16 && bytes[15] != b'Z') {
                return Err(invalid());
            }
            match (number(9..11), number(11..13), number(13..15)) {
                (Some(h), Some(mi), Some(s)) => date.and_hms_opt(h, mi, s).ok_or_else(invalid),
                _ => Err(invalid()),
            }
        }
        _ => Err(invalid()),
    }
}
