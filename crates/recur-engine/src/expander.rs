//! Occurrence expansion -- turns a rule, a start instant and a window into the
//! concrete instants the rule denotes.
//!
//! Expansion walks the rule's periods (a year, month, week, day, hour, minute
//! or second, `interval` periods apart). For each period it collects the days
//! that pass every day-level list, pairs them with the times allowed by the
//! time-level lists, applies BYSETPOS, and yields the survivors in order.
//!
//! The result is a lazy iterator: callers bound the work by how many instants
//! they pull, and the sequence always ends at `window.to`, so even unbounded
//! rules are finite.

use std::iter::FusedIterator;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};

use crate::calendar;
use crate::error::{RecurError, Result};
use crate::rule::{Bound, Frequency, OrdinalWeekday, RecurrenceRule, Weekday};

/// Inclusive `[from, to]` range that bounds how far a rule is expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionWindow {
    from: NaiveDateTime,
    to: NaiveDateTime,
}

impl ExpansionWindow {
    /// # Errors
    /// Returns `RecurError::InvalidWindow` if `from` is after `to`.
    pub fn new(from: NaiveDateTime, to: NaiveDateTime) -> Result<Self> {
        if from > to {
            return Err(RecurError::InvalidWindow { from, to });
        }
        Ok(ExpansionWindow { from, to })
    }

    pub fn from(&self) -> NaiveDateTime {
        self.from
    }

    pub fn to(&self) -> NaiveDateTime {
        self.to
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.from <= instant && instant <= self.to
    }
}

/// Parse an instant written as `YYYY-MM-DDTHH:MM:SS`.
///
/// # Errors
/// Returns `RecurError::InvalidInstant` if the text does not match.
pub fn parse_instant(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .map_err(|_| RecurError::InvalidInstant(text.to_string()))
}

/// Expand `rule` from `start` within `window`.
///
/// The start instant's sub-second part is dropped. The start is itself an
/// occurrence (and counts towards COUNT) only when it matches the rule.
/// Instants before `window.from` are not yielded but still count towards COUNT.
pub fn expand(rule: &RecurrenceRule, start: NaiveDateTime, window: ExpansionWindow) -> Occurrences {
    let start = start.with_nanosecond(0).unwrap_or(start);
    let plan = Plan::new(rule, start);

    let mut anchor = plan.first_period(start);
    if rule.count().is_none() && window.from > start {
        anchor = anchor.map(|a| plan.fast_forward(a, window.from));
    }

    tracing::debug!(rule = %rule, %start, from = %window.from, to = %window.to, "expanding recurrence rule");

    Occurrences {
        plan,
        start,
        window,
        anchor,
        batch: Batch::empty(),
        emitted: 0,
        done: false,
    }
}

/// Expand RRULE text between two instants, collecting every occurrence.
///
/// # Arguments
/// - `rrule` -- RRULE value (e.g., "FREQ=MONTHLY;BYDAY=-1FR")
/// - `start` -- start instant (e.g., "2026-01-30T09:00:00")
/// - `from` / `to` -- inclusive window bounds, same format as `start`
///
/// # Errors
/// Returns the rule's parse/validation error, `RecurError::InvalidInstant` for
/// malformed instants, or `RecurError::InvalidWindow` if `from` is after `to`.
pub fn expand_rule_text(rrule: &str, start: &str, from: &str, to: &str) -> Result<Vec<NaiveDateTime>> {
    let rule: RecurrenceRule = rrule.parse()?;
    let start = parse_instant(start)?;
    let window = ExpansionWindow::new(parse_instant(from)?, parse_instant(to)?)?;
    Ok(expand(&rule, start, window).collect())
}

/// Lazy, chronologically increasing sequence of a rule's instants.
///
/// Produced by [`expand`]; holds no reference to the rule.
#[derive(Debug, Clone)]
pub struct Occurrences {
    plan: Plan,
    start: NaiveDateTime,
    window: ExpansionWindow,
    /// Anchor of the next period to expand; `None` once periods run out.
    anchor: Option<NaiveDateTime>,
    batch: Batch,
    /// Occurrences at or after `start` seen so far, including those before the window.
    emitted: u64,
    done: bool,
}

impl Occurrences {
    fn finish(&mut self, reason: &'static str) -> Option<NaiveDateTime> {
        if !self.done {
            tracing::debug!(emitted = self.emitted, reason, "expansion finished");
        }
        self.done = true;
        self.anchor = None;
        self.batch = Batch::empty();
        None
    }
}

impl Iterator for Occurrences {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<NaiveDateTime> {
        loop {
            if self.done {
                return None;
            }
            if self.plan.count.is_some_and(|limit| self.emitted >= u64::from(limit)) {
                return self.finish("count reached");
            }

            match self.batch.next() {
                Some(instant) if instant < self.start => continue,
                Some(instant) => {
                    if self.plan.until.is_some_and(|until| instant > until) {
                        return self.finish("until passed");
                    }
                    if instant > self.window.to {
                        return self.finish("window end passed");
                    }
                    self.emitted = self.emitted.saturating_add(1);
                    if instant >= self.window.from {
                        return Some(instant);
                    }
                }
                None => {
                    let Some(anchor) = self.anchor else {
                        return self.finish("calendar range exhausted");
                    };
                    if anchor > self.window.to {
                        return self.finish("window end passed");
                    }
                    if self.plan.until.is_some_and(|until| anchor > until) {
                        return self.finish("until passed");
                    }
                    self.batch = self.plan.batch(anchor);
                    self.anchor = self.plan.advance(anchor);
                }
            }
        }
    }
}

impl FusedIterator for Occurrences {}

/// The candidates of one period, in chronological order.
#[derive(Debug, Clone)]
enum Batch {
    /// Every day paired with every time, day-major.
    Grid {
        days: Vec<NaiveDate>,
        times: Vec<NaiveTime>,
        next: usize,
    },
    /// Instants picked by BYSETPOS.
    Picked(std::vec::IntoIter<NaiveDateTime>),
}

impl Batch {
    fn empty() -> Self {
        Batch::Picked(Vec::new().into_iter())
    }
}

impl Iterator for Batch {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<NaiveDateTime> {
        match self {
            Batch::Grid { days, times, next } => {
                if *next >= days.len() * times.len() {
                    return None;
                }
                let i = *next;
                *next += 1;
                Some(days[i / times.len()].and_time(times[i % times.len()]))
            }
            Batch::Picked(instants) => instants.next(),
        }
    }
}

/// A rule's lists with the start-derived defaults filled in.
#[derive(Debug, Clone)]
struct Plan {
    frequency: Frequency,
    interval: u32,
    week_start: Weekday,
    count: Option<u32>,
    until: Option<NaiveDateTime>,
    months: Option<Vec<u32>>,
    week_nos: Option<Vec<i32>>,
    year_days: Option<Vec<i32>>,
    month_days: Option<Vec<i32>>,
    weekdays: Option<Vec<OrdinalWeekday>>,
    /// Sorted. `None` only when the frequency is at least as fine as the unit.
    hours: Option<Vec<u32>>,
    minutes: Option<Vec<u32>>,
    seconds: Option<Vec<u32>>,
    set_pos: Option<Vec<i32>>,
    /// Time grid shared by every period of a DAILY-or-coarser rule.
    day_times: Vec<NaiveTime>,
}

fn widen<T: Copy + Into<i32>>(values: &[T]) -> Vec<i32> {
    values.iter().map(|&v| v.into()).collect()
}

fn sorted_u32(values: &[u8]) -> Vec<u32> {
    let mut out: Vec<u32> = values.iter().map(|&v| u32::from(v)).collect();
    out.sort_unstable();
    out
}

impl Plan {
    fn new(rule: &RecurrenceRule, start: NaiveDateTime) -> Self {
        let frequency = rule.frequency();

        let mut months = rule.by_month().map(sorted_u32);
        let mut month_days = rule.by_month_day().map(widen);
        let mut weekdays = rule.by_day().map(<[OrdinalWeekday]>::to_vec);
        let week_nos = rule.by_week_no().map(widen);
        let year_days = rule.by_year_day().map(widen);

        let no_day_lists =
            weekdays.is_none() && month_days.is_none() && year_days.is_none() && week_nos.is_none();
        if no_day_lists {
            match frequency {
                Frequency::Yearly => {
                    month_days = Some(vec![start.day() as i32]);
                    months.get_or_insert_with(|| vec![start.month()]);
                }
                Frequency::Monthly => month_days = Some(vec![start.day() as i32]),
                Frequency::Weekly => {
                    weekdays = Some(vec![OrdinalWeekday::every(start.weekday().into())])
                }
                _ => {}
            }
        }

        let inherit = |list: Option<&[u8]>, unit: Frequency, own: u32| -> Option<Vec<u32>> {
            match list {
                Some(values) => Some(sorted_u32(values)),
                None if frequency > unit => Some(vec![own]),
                None => None,
            }
        };
        let hours = inherit(rule.by_hour(), Frequency::Hourly, start.hour());
        let minutes = inherit(rule.by_minute(), Frequency::Minutely, start.minute());
        let seconds = inherit(rule.by_second(), Frequency::Secondly, start.second());

        let mut plan = Plan {
            frequency,
            interval: rule.interval(),
            week_start: rule.week_start(),
            count: rule.count(),
            until: match rule.bound() {
                Bound::Until(t) => Some(t),
                _ => None,
            },
            months,
            week_nos,
            year_days,
            month_days,
            weekdays,
            hours,
            minutes,
            seconds,
            set_pos: rule.by_set_pos().map(widen),
            day_times: Vec::new(),
        };
        if frequency >= Frequency::Daily {
            plan.day_times = plan.times_at(start.time());
        }
        plan
    }

    /// Anchor of the period containing `start`.
    fn first_period(&self, start: NaiveDateTime) -> Option<NaiveDateTime> {
        let date = start.date();
        let midnight = |d: NaiveDate| d.and_time(NaiveTime::MIN);
        match self.frequency {
            Frequency::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1).map(midnight),
            Frequency::Monthly => date.with_day(1).map(midnight),
            Frequency::Weekly => calendar::week_start_on_or_before(date, self.week_start).map(midnight),
            Frequency::Daily => Some(midnight(date)),
            Frequency::Hourly => start.with_minute(0).and_then(|t| t.with_second(0)),
            Frequency::Minutely => start.with_second(0),
            Frequency::Secondly => Some(start),
        }
    }

    /// Length of one sub-daily step in seconds.
    fn step_seconds(&self) -> i64 {
        let unit = match self.frequency {
            Frequency::Hourly => 3_600,
            Frequency::Minutely => 60,
            _ => 1,
        };
        i64::from(self.interval) * unit
    }

    /// Anchor of the period after `anchor`, or `None` past chrono's range.
    fn advance(&self, anchor: NaiveDateTime) -> Option<NaiveDateTime> {
        let interval = i64::from(self.interval);
        let date = anchor.date();
        match self.frequency {
            Frequency::Yearly => {
                let year = i32::try_from(i64::from(date.year()) + interval).ok()?;
                NaiveDate::from_ymd_opt(year, 1, 1).map(|d| d.and_time(NaiveTime::MIN))
            }
            Frequency::Monthly => {
                let index = i64::from(date.year()) * 12 + i64::from(date.month0()) + interval;
                let year = i32::try_from(index.div_euclid(12)).ok()?;
                let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
                NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.and_time(NaiveTime::MIN))
            }
            Frequency::Weekly => anchor.checked_add_days(Days::new(7 * u64::from(self.interval))),
            Frequency::Daily => anchor.checked_add_days(Days::new(u64::from(self.interval))),
            Frequency::Hourly | Frequency::Minutely | Frequency::Secondly => {
                let step = self.step_seconds();
                let mut steps = 1;
                if !self.day_matches(date) {
                    // Jump straight to the first aligned instant of the next day.
                    let next_day = date.succ_opt()?.and_time(NaiveTime::MIN);
                    let gap = (next_day - anchor).num_seconds();
                    steps = (gap + step - 1) / step;
                }
                anchor.checked_add_signed(TimeDelta::try_seconds(steps.checked_mul(step)?)?)
            }
        }
    }

    /// Skip whole interval-aligned periods that end before `target`.
    ///
    /// Only valid without COUNT, where earlier periods cannot affect later ones.
    fn fast_forward(&self, anchor: NaiveDateTime, target: NaiveDateTime) -> NaiveDateTime {
        let interval = i64::from(self.interval);
        let whole = |periods: i64| if periods > 0 { periods - periods % interval } else { 0 };
        let (a, t) = (anchor.date(), target.date());

        let skipped = match self.frequency {
            Frequency::Yearly => {
                let k = whole(i64::from(t.year()) - i64::from(a.year()));
                i32::try_from(i64::from(a.year()) + k)
                    .ok()
                    .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
                    .map(|d| d.and_time(NaiveTime::MIN))
            }
            Frequency::Monthly => {
                let months = |d: NaiveDate| i64::from(d.year()) * 12 + i64::from(d.month0());
                let index = months(a) + whole(months(t) - months(a));
                let year = i32::try_from(index.div_euclid(12)).ok();
                let month = u32::try_from(index.rem_euclid(12)).ok();
                year.zip(month)
                    .and_then(|(y, m)| NaiveDate::from_ymd_opt(y, m + 1, 1))
                    .map(|d| d.and_time(NaiveTime::MIN))
            }
            Frequency::Weekly => {
                let k = whole((t - a).num_days() / 7);
                u64::try_from(k * 7).ok().and_then(|days| anchor.checked_add_days(Days::new(days)))
            }
            Frequency::Daily => {
                let k = whole((t - a).num_days());
                u64::try_from(k).ok().and_then(|days| anchor.checked_add_days(Days::new(days)))
            }
            Frequency::Hourly | Frequency::Minutely | Frequency::Secondly => {
                let step = self.step_seconds();
                let k = ((target - anchor).num_seconds() / step).max(0);
                k.checked_mul(step)
                    .and_then(TimeDelta::try_seconds)
                    .and_then(|delta| anchor.checked_add_signed(delta))
            }
        };
        skipped.unwrap_or(anchor)
    }

    /// Every calendar day in the period anchored at `anchor`.
    fn period_days(&self, anchor: NaiveDate) -> Vec<NaiveDate> {
        let days = anchor.iter_days();
        match self.frequency {
            Frequency::Yearly => days.take_while(|d| d.year() == anchor.year()).collect(),
            Frequency::Monthly => days.take_while(|d| d.month() == anchor.month()).collect(),
            Frequency::Weekly => days.take(7).collect(),
            _ => vec![anchor],
        }
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        if let Some(months) = &self.months {
            if !months.contains(&date.month()) {
                return false;
            }
        }
        if let Some(weeks) = &self.week_nos {
            let Some(wn) = calendar::week_number(date, self.week_start) else {
                return false;
            };
            if !weeks
                .iter()
                .any(|&n| calendar::signed_index_matches(n, wn.week, wn.weeks_in_year))
            {
                return false;
            }
        }
        if let Some(year_days) = &self.year_days {
            let len = calendar::days_in_year(date.year());
            if !year_days
                .iter()
                .any(|&n| calendar::signed_index_matches(n, date.ordinal(), len))
            {
                return false;
            }
        }
        if let Some(month_days) = &self.month_days {
            let len = calendar::days_in_month(date.year(), date.month());
            if !month_days
                .iter()
                .any(|&n| calendar::signed_index_matches(n, date.day(), len))
            {
                return false;
            }
        }
        if let Some(weekdays) = &self.weekdays {
            if !self.weekday_matches(date, weekdays) {
                return false;
            }
        }
        true
    }

    /// BYDAY matches when any entry matches. Ordinals count within the month
    /// for MONTHLY (and YEARLY with BYMONTH), within the year for YEARLY, and
    /// are ignored for finer frequencies.
    fn weekday_matches(&self, date: NaiveDate, weekdays: &[OrdinalWeekday]) -> bool {
        let weekday = Weekday::from(date.weekday());
        let scope = match self.frequency {
            Frequency::Monthly => calendar::month_bounds(date),
            Frequency::Yearly if self.months.is_some() => calendar::month_bounds(date),
            Frequency::Yearly => calendar::year_bounds(date),
            _ => None,
        };

        weekdays.iter().any(|entry| {
            if entry.weekday() != weekday {
                return false;
            }
            match (entry.ordinal(), scope) {
                (Some(n), Some((first, last))) => {
                    let (front, back) = calendar::weekday_position(date, first, last);
                    let n = i64::from(n);
                    if n > 0 {
                        front == n
                    } else {
                        back == -n
                    }
                }
                _ => true,
            }
        })
    }

    /// Times allowed in a period whose own clock fields are those of `at`.
    ///
    /// Fields at or coarser than the frequency are fixed to `at` and must pass
    /// their list; finer fields expand to their (defaulted) list.
    fn times_at(&self, at: NaiveTime) -> Vec<NaiveTime> {
        let pick = |list: &Option<Vec<u32>>, unit: Frequency, own: u32| -> Vec<u32> {
            match list {
                Some(values) if self.frequency <= unit => {
                    if values.contains(&own) {
                        vec![own]
                    } else {
                        Vec::new()
                    }
                }
                Some(values) => values.clone(),
                None => vec![own],
            }
        };
        let hours = pick(&self.hours, Frequency::Hourly, at.hour());
        let minutes = pick(&self.minutes, Frequency::Minutely, at.minute());
        let seconds = pick(&self.seconds, Frequency::Secondly, at.second());

        let mut times = Vec::with_capacity(hours.len() * minutes.len() * seconds.len());
        for &h in &hours {
            for &m in &minutes {
                times.extend(seconds.iter().filter_map(|&s| NaiveTime::from_hms_opt(h, m, s)));
            }
        }
        times
    }

    fn batch(&self, anchor: NaiveDateTime) -> Batch {
        let days: Vec<NaiveDate> = self
            .period_days(anchor.date())
            .into_iter()
            .filter(|&d| self.day_matches(d))
            .collect();
        let times = if self.frequency >= Frequency::Daily {
            self.day_times.clone()
        } else {
            self.times_at(anchor.time())
        };

        tracing::trace!(period = %anchor, days = days.len(), times = times.len(), "expanded period");

        match &self.set_pos {
            Some(positions) => Batch::Picked(select_positions(&days, &times, positions).into_iter()),
            None => Batch::Grid {
                days,
                times,
                next: 0,
            },
        }
    }
}

/// Pick BYSETPOS positions out of the day × time grid of one period.
fn select_positions(days: &[NaiveDate], times: &[NaiveTime], positions: &[i32]) -> Vec<NaiveDateTime> {
    let total = days.len() * times.len();
    let mut picked: Vec<NaiveDateTime> = positions
        .iter()
        .filter_map(|&pos| {
            let index = if pos > 0 {
                usize::try_from(pos - 1).ok()?
            } else {
                total.checked_sub(usize::try_from(-pos).ok()?)?
            };
            if index >= total {
                return None;
            }
            Some(days[index / times.len()].and_time(times[index % times.len()]))
        })
        .collect();
    picked.sort_unstable();
    picked.dedup();
    picked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(text: &str) -> NaiveDateTime {
        parse_instant(text).unwrap()
    }

    #[test]
    fn emitted_counter_runs_past_u32() {
        let rule: RecurrenceRule = "FREQ=SECONDLY".parse().unwrap();
        let start = t("2026-01-01T00:00:00");
        let window = ExpansionWindow::new(start, t("2026-01-01T00:00:10")).unwrap();
        let mut occurrences = expand(&rule, start, window);
        occurrences.emitted = u64::from(u32::MAX);

        assert_eq!(occurrences.next(), Some(start));
        assert_eq!(occurrences.next(), Some(t("2026-01-01T00:00:01")));
        assert_eq!(occurrences.emitted, u64::from(u32::MAX) + 2);
    }

    #[test]
    fn count_limit_compares_against_wide_counter() {
        let rule: RecurrenceRule = "FREQ=SECONDLY;COUNT=3".parse().unwrap();
        let start = t("2026-01-01T00:00:00");
        let window = ExpansionWindow::new(start, t("2026-01-01T00:01:00")).unwrap();
        assert_eq!(expand(&rule, start, window).count(), 3);
    }
}
