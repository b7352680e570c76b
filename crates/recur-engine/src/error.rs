//! Error types for recur-engine operations.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::grammar::RuleField;
use crate::rule::Frequency;
use crate::set::RuleKey;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurError {
    /// The text does not match the duration grammar, mixes the week form with
    /// day/time components, or overflows.
    #[error("Malformed duration: {0}")]
    MalformedDuration(String),

    #[error("Unknown time unit: {0} (expected week, day, hour, minute or second)")]
    UnknownTimeUnit(String),

    /// A by-X token failed its field's grammar or numeric domain.
    /// `index` is the 0-based token position within the list.
    #[error("Malformed {field} list: token {index} ({token:?}) {reason}")]
    MalformedRuleList {
        field: RuleField,
        index: usize,
        token: String,
        reason: &'static str,
    },

    #[error("BYWEEKNO is only valid with FREQ=YEARLY, not FREQ={0}")]
    IncompatibleFrequency(Frequency),

    #[error("BYSETPOS must be combined with at least one other BYxxx rule part")]
    SetPosRequiresOtherRule,

    #[error("Invalid bound: {0}")]
    InvalidBound(String),

    #[error("Invalid RRULE: {0}")]
    InvalidRule(String),

    #[error("Invalid instant '{0}' (expected YYYY-MM-DDTHH:MM:SS)")]
    InvalidInstant(String),

    #[error("Invalid expansion window: {from} is after {to}")]
    InvalidWindow {
        from: NaiveDateTime,
        to: NaiveDateTime,
    },

    #[error("Invalid calendar entity: {0}")]
    InvalidEntity(String),

    #[error("Unknown recurrence rule: {0}")]
    UnknownRule(RuleKey),
}

pub type Result<T> = std::result::Result<T, RecurError>;
