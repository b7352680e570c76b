//! Inclusion/exclusion algebra over recurrence rules.
//!
//! A [`RecurrenceSet`] starts from a single instant, adds the expansions of its
//! inclusion rules and removes the expansions of its exclusion rules. Every
//! rule is expanded from the same start.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{RecurError, Result};
use crate::expander::{self, ExpansionWindow};
use crate::rule::RecurrenceRule;

/// Opaque handle to a rule stored in a [`RuleBook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleKey(u64);

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule#{}", self.0)
    }
}

/// Owns rules on behalf of the entities that reference them by key.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    rules: HashMap<RuleKey, RecurrenceRule>,
    next: u64,
}

impl RuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a rule and return its key. Keys are never reused.
    pub fn insert(&mut self, rule: RecurrenceRule) -> RuleKey {
        let key = RuleKey(self.next);
        self.next += 1;
        self.rules.insert(key, rule);
        key
    }

    pub fn get(&self, key: RuleKey) -> Option<&RecurrenceRule> {
        self.rules.get(&key)
    }

    /// # Errors
    /// Returns `RecurError::UnknownRule` if nothing is stored under `key`.
    pub fn resolve(&self, key: RuleKey) -> Result<&RecurrenceRule> {
        self.get(key).ok_or(RecurError::UnknownRule(key))
    }

    pub fn remove(&mut self, key: RuleKey) -> Option<RecurrenceRule> {
        self.rules.remove(&key)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// `({start} ∪ inclusions) − exclusions`, evaluated per window.
#[derive(Debug, Clone)]
pub struct RecurrenceSet<'a> {
    start: NaiveDateTime,
    inclusions: Vec<&'a RecurrenceRule>,
    exclusions: Vec<&'a RecurrenceRule>,
}

impl<'a> RecurrenceSet<'a> {
    pub fn new(start: NaiveDateTime) -> Self {
        RecurrenceSet {
            start,
            inclusions: Vec::new(),
            exclusions: Vec::new(),
        }
    }

    pub fn include(mut self, rule: &'a RecurrenceRule) -> Self {
        self.inclusions.push(rule);
        self
    }

    pub fn exclude(mut self, rule: &'a RecurrenceRule) -> Self {
        self.exclusions.push(rule);
        self
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Instants of the set inside `window`, ascending and without duplicates.
    pub fn occurrences(&self, window: ExpansionWindow) -> Vec<NaiveDateTime> {
        let mut instants = BTreeSet::new();
        if window.contains(self.start) {
            instants.insert(self.start);
        }
        for rule in &self.inclusions {
            instants.extend(expander::expand(rule, self.start, window));
        }
        for rule in &self.exclusions {
            for instant in expander::expand(rule, self.start, window) {
                instants.remove(&instant);
            }
        }

        tracing::debug!(
            inclusions = self.inclusions.len(),
            exclusions = self.exclusions.len(),
            instants = instants.len(),
            "evaluated recurrence set"
        );
        instants.into_iter().collect()
    }
}
