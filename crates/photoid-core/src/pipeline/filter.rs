//! File selection: include/exclude patterns and a maximum age.

use regex::Regex;
use std::fmt;
use std::time::{Duration, SystemTime};

use crate::error::ConfigError;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Why an entry was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Directories, symlinks, sockets and the like
    NotRegular,
    /// The base name matched the exclusion pattern
    Excluded,
    /// The base name did not match the inclusion pattern
    NoMatch,
    /// Last modified before the age cutoff
    TooOld,
    /// Passed every check
    Accepted,
}

impl FilterDecision {
    pub fn is_accepted(self) -> bool {
        self == FilterDecision::Accepted
    }
}

impl fmt::Display for FilterDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            FilterDecision::NotRegular => "file is not regular",
            FilterDecision::Excluded => "file excluded via reg expr",
            FilterDecision::NoMatch => "file didn't match",
            FilterDecision::TooOld => "file is too old",
            FilterDecision::Accepted => "file is new enough",
        };
        f.write_str(reason)
    }
}

/// Compiled selection criteria, shared read-only by the walker.
#[derive(Debug, Clone)]
pub struct FilterCriteria {
    include: Regex,
    exclude: Option<Regex>,
    max_age_days: u32,
}

impl FilterCriteria {
    /// Compile the patterns. A malformed pattern is a configuration error.
    pub fn new(
        include: &str,
        exclude: Option<&str>,
        max_age_days: u32,
    ) -> Result<Self, ConfigError> {
        let include = compile(include)?;
        let exclude = exclude.map(compile).transpose()?;
        Ok(Self {
            include,
            exclude,
            max_age_days,
        })
    }

    pub fn include_pattern(&self) -> &str {
        self.include.as_str()
    }

    pub fn exclude_pattern(&self) -> Option<&str> {
        self.exclude.as_ref().map(Regex::as_str)
    }

    pub fn max_age_days(&self) -> u32 {
        self.max_age_days
    }

    /// Classify one directory entry.
    ///
    /// Exclusion is always checked before inclusion. `now` anchors the age
    /// cutoff so callers can pin the clock.
    pub fn classify(
        &self,
        name: &str,
        is_regular: bool,
        modified_at: SystemTime,
        now: SystemTime,
    ) -> FilterDecision {
        if !is_regular {
            return FilterDecision::NotRegular;
        }
        if self.exclude.as_ref().is_some_and(|re| re.is_match(name)) {
            return FilterDecision::Excluded;
        }
        if !self.include.is_match(name) {
            return FilterDecision::NoMatch;
        }
        if self.is_too_old(modified_at, now) {
            return FilterDecision::TooOld;
        }
        FilterDecision::Accepted
    }

    /// Boolean form of [`classify`](Self::classify).
    pub fn accept(
        &self,
        name: &str,
        is_regular: bool,
        modified_at: SystemTime,
        now: SystemTime,
    ) -> bool {
        self.classify(name, is_regular, modified_at, now)
            .is_accepted()
    }

    fn is_too_old(&self, modified_at: SystemTime, now: SystemTime) -> bool {
        if self.max_age_days == 0 {
            return false;
        }
        let max_age = Duration::from_secs(u64::from(self.max_age_days) * SECS_PER_DAY);
        match now.checked_sub(max_age) {
            Some(cutoff) => modified_at < cutoff,
            // Cutoff predates the epoch clock range; nothing can be older.
            None => false,
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
