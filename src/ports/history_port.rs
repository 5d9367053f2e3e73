//! History persistence port traits.
//!
//! The evaluation core never holds state between runs; previous values and
//! the daily tier log live behind these traits and are owned by the caller.

use crate::domain::error::PulseError;
use crate::domain::verdict::Tier;
use chrono::NaiveDate;

/// Key-value store for the previous run's snapshot.
pub trait HistoryStore {
    fn get_previous(&self, key: &str) -> Result<Option<String>, PulseError>;
    fn set_current(&self, key: &str, value: &str) -> Result<(), PulseError>;
}

/// Append-only daily tier log.
pub trait SignalLog {
    /// Record `tier` for `date`. Returns `false` when the date already has an
    /// entry, which is left untouched.
    fn record(&self, date: NaiveDate, tier: Tier) -> Result<bool, PulseError>;

    /// All entries, oldest first.
    fn entries(&self) -> Result<Vec<(NaiveDate, Tier)>, PulseError>;
}
