//! # recur-engine
//!
//! Strict RRULE and ISO 8601 duration parsing with deterministic occurrence
//! expansion for calendar events, to-dos and journal entries.
//!
//! Rules are validated once, at construction, and are immutable afterwards.
//! Expansion is a pure function of a rule, a start instant and an inclusive
//! window, and is exposed as a lazy iterator. All instants are
//! `chrono::NaiveDateTime` values in one reference time scale chosen by the caller.
//!
//! ## Modules
//!
//! - [`duration`] - `P1W`, `PT1H30M` ↔ signed seconds, unit conversion
//! - [`grammar`] - the by-X list grammars (`BYDAY=MO,-1FR`, `BYMONTHDAY=1,-1`, …)
//! - [`rule`] - [`RecurrenceRule`] and its builder, full RRULE text form
//! - [`calendar`] - leap years, month lengths, week numbering
//! - [`expander`] - rule + start + window → ordered instants
//! - [`set`] - inclusion/exclusion rule algebra and the [`RuleBook`]
//! - [`entity`] - events, to-dos and journals with their occurrences
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use recur_engine::{ExpansionWindow, RecurrenceRule};
//!
//! let rule: RecurrenceRule = "FREQ=MONTHLY;BYDAY=-1FR;COUNT=3".parse().unwrap();
//! let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
//! let end = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap().and_hms_opt(23, 59, 59).unwrap();
//! let window = ExpansionWindow::new(start, end).unwrap();
//!
//! let days: Vec<_> = rule.occurrences(start, window).map(|t| t.date().to_string()).collect();
//! assert_eq!(days, ["2026-01-30", "2026-02-27", "2026-03-27"]);
//! ```

pub mod calendar;
pub mod duration;
pub mod entity;
pub mod error;
pub mod expander;
pub mod grammar;
pub mod rule;
pub mod set;

pub use duration::{duration_to, Duration, TimeUnit};
pub use entity::{CalendarEntity, EntityKind, Occurrence};
pub use error::{RecurError, Result};
pub use expander::{expand, expand_rule_text, parse_instant, ExpansionWindow, Occurrences};
pub use grammar::RuleField;
pub use rule::{Bound, ByRules, Frequency, OrdinalWeekday, RecurrenceRule, RuleBuilder, Weekday};
pub use set::{RecurrenceSet, RuleBook, RuleKey};
