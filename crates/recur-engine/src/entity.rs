//! Calendar entities: events, to-dos and journal entries.
//!
//! An entity carries its own timing (start, and an end or a duration) and
//! refers to its recurrence rules by [`RuleKey`]. Expanding an entity resolves
//! those keys in a [`RuleBook`], evaluates the resulting [`RecurrenceSet`] and
//! attaches an end instant to every occurrence.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::duration::Duration;
use crate::error::{RecurError, Result};
use crate::expander::ExpansionWindow;
use crate::set::{RecurrenceSet, RuleBook, RuleKey};

/// Highest allowed priority value (0 means undefined, 1 is highest).
pub const MAX_PRIORITY: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Event,
    Todo,
    Journal,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Event => "event",
            EntityKind::Todo => "todo",
            EntityKind::Journal => "journal",
        }
    }
}

/// One concrete instance of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntity {
    kind: EntityKind,
    start: NaiveDateTime,
    end: Option<NaiveDateTime>,
    duration: Option<Duration>,
    priority: Option<u8>,
    location: Option<String>,
    resources: Vec<String>,
    transparent: bool,
    inclusions: Vec<RuleKey>,
    exclusions: Vec<RuleKey>,
}

impl CalendarEntity {
    fn new(kind: EntityKind, start: NaiveDateTime) -> Self {
        CalendarEntity {
            kind,
            start,
            end: None,
            duration: None,
            priority: None,
            location: None,
            resources: Vec::new(),
            transparent: false,
            inclusions: Vec::new(),
            exclusions: Vec::new(),
        }
    }

    pub fn event(start: NaiveDateTime) -> Self {
        Self::new(EntityKind::Event, start)
    }

    pub fn todo(start: NaiveDateTime) -> Self {
        Self::new(EntityKind::Todo, start)
    }

    pub fn journal(start: NaiveDateTime) -> Self {
        Self::new(EntityKind::Journal, start)
    }

    /// # Errors
    /// `RecurError::InvalidEntity` if `priority` exceeds [`MAX_PRIORITY`].
    pub fn with_priority(mut self, priority: u8) -> Result<Self> {
        if priority > MAX_PRIORITY {
            return Err(RecurError::InvalidEntity(format!(
                "priority must be between 0 and {}, got {}",
                MAX_PRIORITY, priority
            )));
        }
        self.priority = Some(priority);
        Ok(self)
    }

    /// Set an explicit end instant. Only events have one.
    ///
    /// # Errors
    /// `RecurError::InvalidEntity` for non-events, when a duration is already
    /// set, or when `end` is before the start.
    pub fn with_end(mut self, end: NaiveDateTime) -> Result<Self> {
        if self.kind != EntityKind::Event {
            return Err(self.unsupported("an end instant"));
        }
        if self.duration.is_some() {
            return Err(RecurError::InvalidEntity(
                "end and duration are mutually exclusive".to_string(),
            ));
        }
        if end < self.start {
            return Err(RecurError::InvalidEntity(format!(
                "end {} is before start {}",
                end, self.start
            )));
        }
        self.end = Some(end);
        Ok(self)
    }

    /// # Errors
    /// `RecurError::InvalidEntity` for journals, when an end is already set,
    /// or when the duration is negative or too long for chrono's `TimeDelta`.
    pub fn with_duration(mut self, duration: Duration) -> Result<Self> {
        if self.kind == EntityKind::Journal {
            return Err(self.unsupported("a duration"));
        }
        if self.end.is_some() {
            return Err(RecurError::InvalidEntity(
                "end and duration are mutually exclusive".to_string(),
            ));
        }
        if duration.is_negative() {
            return Err(RecurError::InvalidEntity(format!(
                "duration {} is negative",
                duration
            )));
        }
        if duration.to_time_delta().is_none() {
            return Err(RecurError::InvalidEntity(format!(
                "duration {} is out of range",
                duration
            )));
        }
        self.duration = Some(duration);
        Ok(self)
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources = resources.into_iter().map(Into::into).collect();
        self
    }

    /// # Errors
    /// `RecurError::InvalidEntity` for anything but an event.
    pub fn with_transparent(mut self, transparent: bool) -> Result<Self> {
        if self.kind != EntityKind::Event {
            return Err(self.unsupported("a transparency flag"));
        }
        self.transparent = transparent;
        Ok(self)
    }

    pub fn include(mut self, key: RuleKey) -> Self {
        self.inclusions.push(key);
        self
    }

    pub fn exclude(mut self, key: RuleKey) -> Self {
        self.exclusions.push(key);
        self
    }

    fn unsupported(&self, what: &str) -> RecurError {
        RecurError::InvalidEntity(format!("{} entities cannot carry {}", self.kind.as_str(), what))
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.end
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn priority(&self) -> Option<u8> {
        self.priority
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    pub fn inclusions(&self) -> &[RuleKey] {
        &self.inclusions
    }

    pub fn exclusions(&self) -> &[RuleKey] {
        &self.exclusions
    }

    /// How long each occurrence lasts: the duration, else `end - start`, else zero.
    pub fn span(&self) -> TimeDelta {
        if let Some(delta) = self.duration.and_then(|d| d.to_time_delta()) {
            return delta;
        }
        self.end.map_or(TimeDelta::zero(), |end| end - self.start)
    }

    /// Expand this entity within `window`.
    ///
    /// An entity without inclusion rules has the single occurrence at its start.
    ///
    /// # Errors
    /// `RecurError::UnknownRule` if a referenced key is not in `book`.
    pub fn occurrences(&self, book: &RuleBook, window: ExpansionWindow) -> Result<Vec<Occurrence>> {
        let mut set = RecurrenceSet::new(self.start);
        for &key in &self.inclusions {
            set = set.include(book.resolve(key)?);
        }
        for &key in &self.exclusions {
            set = set.exclude(book.resolve(key)?);
        }

        let span = self.span();
        Ok(set
            .occurrences(window)
            .into_iter()
            .map(|start| Occurrence {
                start,
                end: start.checked_add_signed(span).unwrap_or(NaiveDateTime::MAX),
            })
            .collect())
    }
}
