//! RFC 5545 compliance test vectors, derived from the Section 3.8.5.3 examples.
//!
//! The RFC examples are anchored in America/New_York; instants here are read
//! in a single reference scale, so `UNTIL=...Z` values compare directly.

use chrono::{NaiveDate, NaiveDateTime};
use recur_engine::{ExpansionWindow, RecurrenceRule};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn at(text: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").unwrap()
}

/// Expand from `start` through the end of 2100, taking at most `limit` instants.
fn expand(rule: &str, start: &str, limit: usize) -> Vec<NaiveDateTime> {
    let rule: RecurrenceRule = rule
        .parse()
        .unwrap_or_else(|e| panic!("'{}' should parse: {}", rule, e));
    let window = ExpansionWindow::new(at(start), at("2100-12-31T23:59:59")).unwrap();
    rule.occurrences(at(start), window).take(limit).collect()
}

/// `(year, month, day)` of each instant.
fn dates(instants: &[NaiveDateTime]) -> Vec<(i32, u32, u32)> {
    use chrono::Datelike;
    instants
        .iter()
        .map(|t| (t.year(), t.month(), t.day()))
        .collect()
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ===========================================================================
// Daily
// ===========================================================================

#[test]
fn daily_for_10_occurrences() {
    let got = expand("FREQ=DAILY;COUNT=10", "1997-09-02T09:00:00", 100);
    assert_eq!(got.len(), 10);
    assert_eq!(got[0], at("1997-09-02T09:00:00"));
    assert_eq!(got[9], at("1997-09-11T09:00:00"));
}

#[test]
fn daily_until_december_24() {
    let got = expand("FREQ=DAILY;UNTIL=19971224T000000Z", "1997-09-02T09:00:00", 1000);
    assert_eq!(got.len(), 113);
    assert_eq!(got.last(), Some(&at("1997-12-23T09:00:00")));
}

#[test]
fn every_10_days_5_occurrences() {
    let got = expand("FREQ=DAILY;INTERVAL=10;COUNT=5", "1997-09-02T09:00:00", 100);
    assert_eq!(
        dates(&got),
        [(1997, 9, 2), (1997, 9, 12), (1997, 9, 22), (1997, 10, 2), (1997, 10, 12)]
    );
}

#[test]
fn every_day_in_january_for_3_years() {
    let yearly = expand(
        "FREQ=YEARLY;UNTIL=20000131T140000Z;BYMONTH=1;BYDAY=SU,MO,TU,WE,TH,FR,SA",
        "1998-01-01T09:00:00",
        1000,
    );
    let daily = expand("FREQ=DAILY;UNTIL=20000131T140000Z;BYMONTH=1", "1998-01-01T09:00:00", 1000);
    assert_eq!(yearly.len(), 93);
    assert_eq!(yearly, daily);
    assert_eq!(yearly.last(), Some(&at("2000-01-31T09:00:00")));
}

// ===========================================================================
// Weekly
// ===========================================================================

#[test]
fn weekly_for_10_occurrences() {
    let got = expand("FREQ=WEEKLY;COUNT=10", "1997-09-02T09:00:00", 100);
    assert_eq!(got.len(), 10);
    assert_eq!(got[9], at("1997-11-04T09:00:00"));
}

#[test]
fn weekly_on_tuesday_and_thursday_for_five_weeks() {
    let got = expand("FREQ=WEEKLY;COUNT=10;WKST=SU;BYDAY=TU,TH", "1997-09-02T09:00:00", 100);
    assert_eq!(
        dates(&got),
        [
            (1997, 9, 2),
            (1997, 9, 4),
            (1997, 9, 9),
            (1997, 9, 11),
            (1997, 9, 16),
            (1997, 9, 18),
            (1997, 9, 23),
            (1997, 9, 25),
            (1997, 9, 30),
            (1997, 10, 2),
        ]
    );
}

#[test]
fn every_other_week_mon_wed_fri_until_december_24() {
    let got = expand(
        "FREQ=WEEKLY;INTERVAL=2;UNTIL=19971224T000000Z;WKST=SU;BYDAY=MO,WE,FR",
        "1997-09-01T09:00:00",
        1000,
    );
    assert_eq!(got.len(), 25);
    assert_eq!(
        dates(&got[..7]),
        [
            (1997, 9, 1),
            (1997, 9, 3),
            (1997, 9, 5),
            (1997, 9, 15),
            (1997, 9, 17),
            (1997, 9, 19),
            (1997, 9, 29),
        ]
    );
    assert_eq!(got.last(), Some(&at("1997-12-22T09:00:00")));
}

#[test]
fn week_start_changes_biweekly_grouping() {
    let monday = expand("FREQ=WEEKLY;INTERVAL=2;COUNT=4;BYDAY=TU,SU;WKST=MO", "1997-08-05T09:00:00", 10);
    assert_eq!(dates(&monday), [(1997, 8, 5), (1997, 8, 10), (1997, 8, 19), (1997, 8, 24)]);

    let sunday = expand("FREQ=WEEKLY;INTERVAL=2;COUNT=4;BYDAY=TU,SU;WKST=SU", "1997-08-05T09:00:00", 10);
    assert_eq!(dates(&sunday), [(1997, 8, 5), (1997, 8, 17), (1997, 8, 19), (1997, 8, 31)]);
}

// ===========================================================================
// Monthly
// ===========================================================================

#[test]
fn monthly_on_first_friday() {
    let got = expand("FREQ=MONTHLY;COUNT=10;BYDAY=1FR", "1997-09-05T09:00:00", 100);
    assert_eq!(
        dates(&got),
        [
            (1997, 9, 5),
            (1997, 10, 3),
            (1997, 11, 7),
            (1997, 12, 5),
            (1998, 1, 2),
            (1998, 2, 6),
            (1998, 3, 6),
            (1998, 4, 3),
            (1998, 5, 1),
            (1998, 6, 5),
        ]
    );
}

#[test]
fn every_other_month_first_and_last_sunday() {
    let got = expand("FREQ=MONTHLY;INTERVAL=2;COUNT=10;BYDAY=1SU,-1SU", "1997-09-07T09:00:00", 100);
    assert_eq!(
        dates(&got),
        [
            (1997, 9, 7),
            (1997, 9, 28),
            (1997, 11, 2),
            (1997, 11, 30),
            (1998, 1, 4),
            (1998, 1, 25),
            (1998, 3, 1),
            (1998, 3, 29),
            (1998, 5, 3),
            (1998, 5, 31),
        ]
    );
}

#[test]
fn monthly_second_to_last_monday() {
    let got = expand("FREQ=MONTHLY;COUNT=6;BYDAY=-2MO", "1997-09-22T09:00:00", 100);
    assert_eq!(
        dates(&got),
        [(1997, 9, 22), (1997, 10, 20), (1997, 11, 17), (1997, 12, 22), (1998, 1, 19), (1998, 2, 16)]
    );
}

#[test]
fn monthly_third_to_last_day() {
    let got = expand("FREQ=MONTHLY;BYMONTHDAY=-3", "1997-09-28T09:00:00", 6);
    assert_eq!(
        dates(&got),
        [(1997, 9, 28), (1997, 10, 29), (1997, 11, 28), (1997, 12, 29), (1998, 1, 29), (1998, 2, 26)]
    );
}

#[test]
fn monthly_on_2nd_and_15th() {
    let got = expand("FREQ=MONTHLY;COUNT=10;BYMONTHDAY=2,15", "1997-09-02T09:00:00", 100);
    assert_eq!(got.len(), 10);
    assert_eq!(got[1].date(), ymd(1997, 9, 15));
    assert_eq!(got[9].date(), ymd(1998, 1, 15));
}

#[test]
fn monthly_on_first_and_last_day() {
    let got = expand("FREQ=MONTHLY;COUNT=10;BYMONTHDAY=1,-1", "1997-09-30T09:00:00", 100);
    assert_eq!(
        dates(&got),
        [
            (1997, 9, 30),
            (1997, 10, 1),
            (1997, 10, 31),
            (1997, 11, 1),
            (1997, 11, 30),
            (1997, 12, 1),
            (1997, 12, 31),
            (1998, 1, 1),
            (1998, 1, 31),
            (1998, 2, 1),
        ]
    );
}

#[test]
fn every_18_months_10th_through_15th() {
    let got = expand(
        "FREQ=MONTHLY;INTERVAL=18;COUNT=10;BYMONTHDAY=10,11,12,13,14,15",
        "1997-09-10T09:00:00",
        100,
    );
    assert_eq!(got.len(), 10);
    assert_eq!(got[5].date(), ymd(1997, 9, 15));
    assert_eq!(got[6].date(), ymd(1999, 3, 10));
    assert_eq!(got[9].date(), ymd(1999, 3, 13));
}

#[test]
fn friday_the_13th() {
    let got = expand("FREQ=MONTHLY;BYDAY=FR;BYMONTHDAY=13", "1997-09-02T09:00:00", 5);
    assert_eq!(
        dates(&got),
        [(1998, 2, 13), (1998, 3, 13), (1998, 11, 13), (1999, 8, 13), (2000, 10, 13)]
    );
}

#[test]
fn first_saturday_after_first_sunday() {
    let got = expand("FREQ=MONTHLY;BYDAY=SA;BYMONTHDAY=7,8,9,10,11,12,13", "1997-09-13T09:00:00", 6);
    assert_eq!(
        dates(&got),
        [(1997, 9, 13), (1997, 10, 11), (1997, 11, 8), (1997, 12, 13), (1998, 1, 10), (1998, 2, 7)]
    );
}

#[test]
fn third_instance_of_tue_wed_thu() {
    let got = expand("FREQ=MONTHLY;COUNT=3;BYDAY=TU,WE,TH;BYSETPOS=3", "1997-09-04T09:00:00", 10);
    assert_eq!(dates(&got), [(1997, 9, 4), (1997, 10, 7), (1997, 11, 6)]);
}

#[test]
fn second_to_last_weekday() {
    let got = expand("FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-2", "1997-09-29T09:00:00", 7);
    assert_eq!(
        dates(&got),
        [
            (1997, 9, 29),
            (1997, 10, 30),
            (1997, 11, 27),
            (1997, 12, 30),
            (1998, 1, 29),
            (1998, 2, 26),
            (1998, 3, 30),
        ]
    );
}

#[test]
fn invalid_dates_are_skipped() {
    let got = expand("FREQ=MONTHLY;BYMONTHDAY=15,30;COUNT=5", "2007-01-15T09:00:00", 10);
    assert_eq!(
        dates(&got),
        [(2007, 1, 15), (2007, 1, 30), (2007, 2, 15), (2007, 3, 15), (2007, 3, 30)]
    );
}

// ===========================================================================
// Yearly
// ===========================================================================

#[test]
fn yearly_in_june_and_july() {
    let got = expand("FREQ=YEARLY;COUNT=10;BYMONTH=6,7", "1997-06-10T09:00:00", 100);
    assert_eq!(got.len(), 10);
    assert_eq!(got[1].date(), ymd(1997, 7, 10));
    assert_eq!(got[9].date(), ymd(2001, 7, 10));
}

#[test]
fn every_third_year_on_year_days() {
    let got = expand("FREQ=YEARLY;INTERVAL=3;COUNT=10;BYYEARDAY=1,100,200", "1997-01-01T09:00:00", 100);
    assert_eq!(
        dates(&got),
        [
            (1997, 1, 1),
            (1997, 4, 10),
            (1997, 7, 19),
            (2000, 1, 1),
            (2000, 4, 9),
            (2000, 7, 18),
            (2003, 1, 1),
            (2003, 4, 10),
            (2003, 7, 19),
            (2006, 1, 1),
        ]
    );
}

#[test]
fn twentieth_monday_of_the_year() {
    let got = expand("FREQ=YEARLY;BYDAY=20MO", "1997-05-19T09:00:00", 3);
    assert_eq!(dates(&got), [(1997, 5, 19), (1998, 5, 18), (1999, 5, 17)]);
}

#[test]
fn monday_of_week_20() {
    let got = expand("FREQ=YEARLY;BYWEEKNO=20;BYDAY=MO", "1997-05-12T09:00:00", 3);
    assert_eq!(dates(&got), [(1997, 5, 12), (1998, 5, 11), (1999, 5, 17)]);
}

#[test]
fn every_thursday_in_march() {
    let got = expand("FREQ=YEARLY;BYMONTH=3;BYDAY=TH", "1997-03-13T09:00:00", 7);
    assert_eq!(
        dates(&got),
        [
            (1997, 3, 13),
            (1997, 3, 20),
            (1997, 3, 27),
            (1998, 3, 5),
            (1998, 3, 12),
            (1998, 3, 19),
            (1998, 3, 26),
        ]
    );
}

#[test]
fn us_presidential_election_day() {
    let got = expand(
        "FREQ=YEARLY;INTERVAL=4;BYMONTH=11;BYDAY=TU;BYMONTHDAY=2,3,4,5,6,7,8",
        "1996-11-05T09:00:00",
        3,
    );
    assert_eq!(dates(&got), [(1996, 11, 5), (2000, 11, 7), (2004, 11, 2)]);
}

#[test]
fn week_numbers_cross_year_boundaries() {
    // 2026 starts on a Thursday, so its week 1 begins on 2025-12-29 and it has 53 weeks.
    let first = expand("FREQ=YEARLY;BYWEEKNO=1;BYDAY=MO", "2026-01-01T09:00:00", 3);
    assert_eq!(dates(&first), [(2027, 1, 4), (2028, 1, 3), (2029, 1, 1)]);

    let last = expand("FREQ=YEARLY;BYWEEKNO=-1;BYDAY=SU", "2026-01-01T09:00:00", 3);
    assert_eq!(dates(&last), [(2027, 1, 3), (2028, 1, 2), (2028, 12, 31)]);
}

// ===========================================================================
// Sub-daily
// ===========================================================================

#[test]
fn every_3_hours_until_5pm() {
    let got = expand("FREQ=HOURLY;INTERVAL=3;UNTIL=19970902T170000Z", "1997-09-02T09:00:00", 100);
    assert_eq!(
        got,
        [at("1997-09-02T09:00:00"), at("1997-09-02T12:00:00"), at("1997-09-02T15:00:00")]
    );
}

#[test]
fn every_15_minutes_for_6_occurrences() {
    let got = expand("FREQ=MINUTELY;INTERVAL=15;COUNT=6", "1997-09-02T09:00:00", 100);
    assert_eq!(got.len(), 6);
    assert_eq!(got[5], at("1997-09-02T10:15:00"));
}

#[test]
fn every_hour_and_a_half_for_4_occurrences() {
    let got = expand("FREQ=MINUTELY;INTERVAL=90;COUNT=4", "1997-09-02T09:00:00", 100);
    assert_eq!(
        got,
        [
            at("1997-09-02T09:00:00"),
            at("1997-09-02T10:30:00"),
            at("1997-09-02T12:00:00"),
            at("1997-09-02T13:30:00"),
        ]
    );
}

#[test]
fn every_20_minutes_during_office_hours() {
    let daily = expand(
        "FREQ=DAILY;BYHOUR=9,10,11,12,13,14,15,16;BYMINUTE=0,20,40",
        "1997-09-02T09:00:00",
        26,
    );
    let minutely = expand(
        "FREQ=MINUTELY;INTERVAL=20;BYHOUR=9,10,11,12,13,14,15,16",
        "1997-09-02T09:00:00",
        26,
    );
    assert_eq!(daily, minutely);
    assert_eq!(daily[23], at("1997-09-02T16:40:00"));
    assert_eq!(daily[24], at("1997-09-03T09:00:00"));
}
