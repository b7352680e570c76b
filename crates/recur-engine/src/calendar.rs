//! Calendar arithmetic on the proleptic Gregorian calendar.
//!
//! Everything here is exact: month and year lengths follow the leap-year rule,
//! and week numbers follow ISO 8601 generalized to an arbitrary week start
//! (week 1 is the first week with at least four days in the year, i.e. the
//! week containing January 4th).

use chrono::{Datelike, Days, NaiveDate};

use crate::rule::Weekday;

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// Length of `month` (1..=12) in `year`.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// First and last day of the month containing `date`.
pub fn month_bounds(date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let first = date.with_day(1)?;
    let last = date.with_day(days_in_month(date.year(), date.month()))?;
    Some((first, last))
}

/// First and last day of the year containing `date`.
pub fn year_bounds(date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(date.year(), 1, 1)?;
    let last = NaiveDate::from_ymd_opt(date.year(), 12, 31)?;
    Some((first, last))
}

/// The most recent `week_start` on or before `date`.
pub fn week_start_on_or_before(date: NaiveDate, week_start: Weekday) -> Option<NaiveDate> {
    let back = (date.weekday().num_days_from_monday() + 7 - week_start.days_from_monday()) % 7;
    date.checked_sub_days(Days::new(u64::from(back)))
}

/// A date's position in a week-numbered year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekNumber {
    /// The week-numbering year, which differs from the calendar year for days
    /// at the very start or end of a year.
    pub year: i32,
    /// 1-based week number.
    pub week: u32,
    /// 52 or 53.
    pub weeks_in_year: u32,
}

fn week_one_start(year: i32, week_start: Weekday) -> Option<NaiveDate> {
    week_start_on_or_before(NaiveDate::from_ymd_opt(year, 1, 4)?, week_start)
}

pub fn week_number(date: NaiveDate, week_start: Weekday) -> Option<WeekNumber> {
    let this_year = week_one_start(date.year(), week_start)?;
    let next_year = week_one_start(date.year() + 1, week_start)?;

    let (year, first, following) = if date < this_year {
        (date.year() - 1, week_one_start(date.year() - 1, week_start)?, this_year)
    } else if date >= next_year {
        (date.year() + 1, next_year, week_one_start(date.year() + 2, week_start)?)
    } else {
        (date.year(), this_year, next_year)
    };

    let week = (date - first).num_days() / 7 + 1;
    let weeks_in_year = (following - first).num_days() / 7;
    Some(WeekNumber {
        year,
        week: u32::try_from(week).ok()?,
        weeks_in_year: u32::try_from(weeks_in_year).ok()?,
    })
}

/// Whether `value` (1-based, or negative counting from the end) names
/// `position` within a run of `len` items.
pub fn signed_index_matches(value: i32, position: u32, len: u32) -> bool {
    let (position, len) = (i64::from(position), i64::from(len));
    let value = i64::from(value);
    if value > 0 {
        value == position
    } else {
        len + 1 + value == position
    }
}

/// 1-based position of `date` among the same weekdays in `[first, last]`,
/// counted from the front and from the back.
pub fn weekday_position(date: NaiveDate, first: NaiveDate, last: NaiveDate) -> (i64, i64) {
    let from_front = (date - first).num_days() / 7 + 1;
    let from_back = (last - date).num_days() / 7 + 1;
    (from_front, from_back)
}
