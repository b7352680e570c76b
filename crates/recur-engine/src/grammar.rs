//! Text grammar of the RRULE by-X lists.
//!
//! Each list is a comma-separated run of tokens. Numeric fields enforce their
//! own sign rule, digit count and domain; `BYDAY` tokens carry an optional
//! signed ordinal followed by a two-letter weekday code.
//!
//! | Field        | Sign | Digits | Domain        |
//! |--------------|------|--------|---------------|
//! | `BYSECOND`   | no   | 2      | 0..=59        |
//! | `BYMINUTE`   | no   | 2      | 0..=59        |
//! | `BYHOUR`     | no   | 2      | 0..=23        |
//! | `BYMONTH`    | no   | 2      | 1..=12        |
//! | `BYMONTHDAY` | yes  | 2      | ±1..=31       |
//! | `BYYEARDAY`  | yes  | 3      | ±1..=366      |
//! | `BYWEEKNO`   | yes  | 3      | ±1..=53       |
//! | `BYSETPOS`   | yes  | 3      | ±1..=366      |
//! | `BYDAY`      | yes  | 3      | ±1..=53 + day |
//!
//! Parsing keeps list order and duplicates, so [`format_list`] is its exact
//! inverse for canonical text (positive values are written without `+`).

use std::fmt;

use crate::error::{RecurError, Result};
use crate::rule::{OrdinalWeekday, Weekday};

/// The by-X rule parts of an RRULE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleField {
    BySecond,
    ByMinute,
    ByHour,
    ByDay,
    ByMonthDay,
    ByYearDay,
    ByWeekNo,
    ByMonth,
    BySetPos,
}

impl RuleField {
    pub const ALL: [RuleField; 9] = [
        RuleField::BySecond,
        RuleField::ByMinute,
        RuleField::ByHour,
        RuleField::ByDay,
        RuleField::ByMonthDay,
        RuleField::ByYearDay,
        RuleField::ByWeekNo,
        RuleField::ByMonth,
        RuleField::BySetPos,
    ];

    /// The rule-part name as written in RRULE text.
    pub fn name(self) -> &'static str {
        match self {
            RuleField::BySecond => "BYSECOND",
            RuleField::ByMinute => "BYMINUTE",
            RuleField::ByHour => "BYHOUR",
            RuleField::ByDay => "BYDAY",
            RuleField::ByMonthDay => "BYMONTHDAY",
            RuleField::ByYearDay => "BYYEARDAY",
            RuleField::ByWeekNo => "BYWEEKNO",
            RuleField::ByMonth => "BYMONTH",
            RuleField::BySetPos => "BYSETPOS",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        RuleField::ALL.into_iter().find(|field| field.name() == name)
    }

    fn domain(self) -> Domain {
        match self {
            RuleField::BySecond | RuleField::ByMinute => Domain::unsigned(2, 0, 59),
            RuleField::ByHour => Domain::unsigned(2, 0, 23),
            RuleField::ByMonth => Domain::unsigned(2, 1, 12),
            RuleField::ByMonthDay => Domain::signed(2, 31),
            RuleField::ByYearDay | RuleField::BySetPos => Domain::signed(3, 366),
            RuleField::ByWeekNo | RuleField::ByDay => Domain::signed(3, 53),
        }
    }
}

impl fmt::Display for RuleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric domain of a field. Signed fields range over `±1..=max`.
#[derive(Debug, Clone, Copy)]
struct Domain {
    signed: bool,
    max_digits: usize,
    min: i16,
    max: i16,
}

impl Domain {
    const fn unsigned(max_digits: usize, min: i16, max: i16) -> Self {
        Domain {
            signed: false,
            max_digits,
            min,
            max,
        }
    }

    const fn signed(max_digits: usize, max: i16) -> Self {
        Domain {
            signed: true,
            max_digits,
            min: 1,
            max,
        }
    }

    fn contains(&self, value: i16) -> bool {
        if self.signed {
            // `unsigned_abs` keeps i16::MIN from overflowing.
            let magnitude = value.unsigned_abs();
            (self.min.unsigned_abs()..=self.max.unsigned_abs()).contains(&magnitude)
        } else {
            (self.min..=self.max).contains(&value)
        }
    }
}

fn malformed(field: RuleField, index: usize, token: &str, reason: &'static str) -> RecurError {
    RecurError::MalformedRuleList {
        field,
        index,
        token: token.to_string(),
        reason,
    }
}

/// Split a list into `(index, token)` pairs, rejecting an empty list.
fn tokens(field: RuleField, text: &str) -> Result<impl Iterator<Item = (usize, &str)>> {
    if text.is_empty() {
        return Err(malformed(field, 0, text, "is empty"));
    }
    Ok(text.split(',').enumerate())
}

/// Parse a (possibly signed) number inside `token` according to `field`'s domain.
fn parse_number(field: RuleField, index: usize, token: &str, number: &str) -> Result<i16> {
    let domain = field.domain();
    let (sign, digits) = match number.as_bytes().first() {
        Some(b'+') => (1, &number[1..]),
        Some(b'-') => (-1, &number[1..]),
        _ => (0, number),
    };

    if sign != 0 && !domain.signed {
        return Err(malformed(field, index, token, "must not carry a sign"));
    }
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(field, index, token, "is not a number"));
    }
    if digits.len() > domain.max_digits {
        return Err(malformed(field, index, token, "has too many digits"));
    }

    let magnitude: i16 = digits
        .parse()
        .map_err(|_| malformed(field, index, token, "is not a number"))?;
    let value = if sign < 0 { -magnitude } else { magnitude };
    if !domain.contains(value) {
        return Err(malformed(field, index, token, "is out of range"));
    }
    Ok(value)
}

fn parse_numbers(field: RuleField, text: &str) -> Result<Vec<i16>> {
    tokens(field, text)?
        .map(|(index, token)| parse_number(field, index, token, token))
        .collect()
}

// Every domain fits the narrower integer type it is converted to.
fn narrow<T: TryFrom<i16>>(field: RuleField, values: Vec<i16>) -> Result<Vec<T>> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            T::try_from(value).map_err(|_| malformed(field, index, &value.to_string(), "is out of range"))
        })
        .collect()
}

pub fn parse_second_list(text: &str) -> Result<Vec<u8>> {
    narrow(RuleField::BySecond, parse_numbers(RuleField::BySecond, text)?)
}

pub fn parse_minute_list(text: &str) -> Result<Vec<u8>> {
    narrow(RuleField::ByMinute, parse_numbers(RuleField::ByMinute, text)?)
}

pub fn parse_hour_list(text: &str) -> Result<Vec<u8>> {
    narrow(RuleField::ByHour, parse_numbers(RuleField::ByHour, text)?)
}

pub fn parse_month_list(text: &str) -> Result<Vec<u8>> {
    narrow(RuleField::ByMonth, parse_numbers(RuleField::ByMonth, text)?)
}

pub fn parse_month_day_list(text: &str) -> Result<Vec<i8>> {
    narrow(RuleField::ByMonthDay, parse_numbers(RuleField::ByMonthDay, text)?)
}

pub fn parse_week_no_list(text: &str) -> Result<Vec<i8>> {
    narrow(RuleField::ByWeekNo, parse_numbers(RuleField::ByWeekNo, text)?)
}

pub fn parse_year_day_list(text: &str) -> Result<Vec<i16>> {
    parse_numbers(RuleField::ByYearDay, text)
}

pub fn parse_set_pos_list(text: &str) -> Result<Vec<i16>> {
    parse_numbers(RuleField::BySetPos, text)
}

/// Parse a `BYDAY` list such as `MO,+2TU,-1FR`.
pub fn parse_weekday_list(text: &str) -> Result<Vec<OrdinalWeekday>> {
    tokens(RuleField::ByDay, text)?
        .map(|(index, token)| parse_weekday_token(index, token))
        .collect()
}

pub(crate) fn parse_weekday_token(index: usize, token: &str) -> Result<OrdinalWeekday> {
    let field = RuleField::ByDay;
    if token.len() < 2 || !token.is_char_boundary(token.len() - 2) {
        return Err(malformed(field, index, token, "is not a weekday"));
    }
    let (ordinal, code) = token.split_at(token.len() - 2);
    let weekday =
        Weekday::from_code(code).ok_or_else(|| malformed(field, index, token, "has an unknown weekday code"))?;

    if ordinal.is_empty() {
        return Ok(OrdinalWeekday::every(weekday));
    }
    let n = parse_number(field, index, token, ordinal)?;
    // The BYDAY domain is ±1..=53, which always fits an i8.
    let n = i8::try_from(n).map_err(|_| malformed(field, index, token, "is out of range"))?;
    Ok(OrdinalWeekday::nth(n, weekday))
}

/// Check programmatically supplied values against `field`'s domain.
///
/// # Errors
/// Returns `RecurError::MalformedRuleList` naming the first offending value,
/// or index 0 with an empty token if the list is empty.
pub fn validate_list<T>(field: RuleField, values: &[T]) -> Result<()>
where
    T: Copy + Into<i16> + fmt::Display,
{
    if values.is_empty() {
        return Err(malformed(field, 0, "", "is empty"));
    }
    let domain = field.domain();
    match values.iter().position(|&v| !domain.contains(v.into())) {
        Some(index) => Err(malformed(
            field,
            index,
            &values[index].to_string(),
            "is out of range",
        )),
        None => Ok(()),
    }
}

/// Check programmatically supplied `BYDAY` entries (ordinals within ±1..=53).
pub fn validate_weekday_list(values: &[OrdinalWeekday]) -> Result<()> {
    let field = RuleField::ByDay;
    if values.is_empty() {
        return Err(malformed(field, 0, "", "is empty"));
    }
    let domain = field.domain();
    let bad = values
        .iter()
        .position(|wd| wd.ordinal().is_some_and(|n| !domain.contains(i16::from(n))));
    match bad {
        Some(index) => Err(malformed(
            field,
            index,
            &values[index].to_string(),
            "is out of range",
        )),
        None => Ok(()),
    }
}

/// Render a list back to its comma-joined text, in list order.
pub fn format_list<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
