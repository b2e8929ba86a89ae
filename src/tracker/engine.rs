//! UserData Engine - in-memory event history for one user
//!
//! An engine instance is owned by a single session. Nothing is written until
//! [`UserData::save`] is called, and two instances for the same user are not
//! coordinated: whichever saves last wins. `save` logs a warning when the
//! record file changed on disk since this instance last loaded or saved it.

use chrono::{Duration, NaiveDate};
use std::time::SystemTime;
use tracing::{debug, info, warn};

use super::date;
use super::error::{Result, TrackerError};
use super::registry::UserRegistry;
use super::store::{RecordStore, UserRecord};
use crate::types::ViewLength;

/// Dates kept by [`UserData::trim`]; intervals and averages keep one fewer
pub const TRIM_KEEP_DATES: usize = 6;

/// One user's dates, intervals and rolling averages
#[derive(Debug)]
pub struct UserData {
    user_id: String,
    record: UserRecord,
    store: RecordStore,
    dirty: bool,
    synced_at: Option<SystemTime>,
}

impl UserData {
    /// Load the engine for a registered user
    pub fn open(user_id: &str, registry: &UserRegistry, store: &RecordStore) -> Result<Self> {
        if !registry.has_user(user_id)? {
            return Err(TrackerError::UserNotFound { user: user_id.to_string() });
        }

        let record = store.load(user_id)?;
        Ok(Self {
            user_id: user_id.to_string(),
            record,
            store: store.clone(),
            dirty: false,
            synced_at: store.modified(user_id),
        })
    }

    /// Validate `text` as a date and append it
    ///
    /// Returns the canonical label of the added date, or `None` if the text
    /// is not a recognized date (nothing is changed in that case).
    pub fn add(&mut self, text: &str) -> Option<String> {
        let date = date::validate(text)?;
        Some(self.add_date(date))
    }

    /// Append an already-validated date and update intervals and averages
    pub fn add_date(&mut self, date: NaiveDate) -> String {
        let record = &mut self.record;
        record.dates.push(date);

        if let [.., previous, latest] = record.dates[..] {
            let interval = (latest - previous).num_days();
            record.intervals.push(interval);

            let average = match record.intervals[..] {
                [.., older, newer] => (older + newer) as f64 / 2.0,
                _ => interval as f64,
            };
            record.averages.push(average);
        }

        self.dirty = true;
        debug!("{}: added {}", self.user_id, date);
        date::label(date)
    }

    /// Remove the most recently added date with its interval and average
    ///
    /// Returns `false` if there is nothing to remove.
    pub fn remove_previous(&mut self) -> bool {
        let record = &mut self.record;
        let Some(removed) = record.dates.pop() else {
            return false;
        };
        record.intervals.pop();
        record.averages.pop();

        self.dirty = true;
        debug!("{}: removed {}", self.user_id, removed);
        true
    }

    /// Keep only the most recent [`TRIM_KEEP_DATES`] dates
    ///
    /// Returns `true` if anything was dropped.
    pub fn trim(&mut self) -> bool {
        let record = &mut self.record;
        if record.dates.len() <= TRIM_KEEP_DATES {
            return false;
        }

        keep_last(&mut record.dates, TRIM_KEEP_DATES);
        keep_last(&mut record.intervals, TRIM_KEEP_DATES - 1);
        keep_last(&mut record.averages, TRIM_KEEP_DATES - 1);

        self.dirty = true;
        info!("{}: trimmed history to {} dates", self.user_id, TRIM_KEEP_DATES);
        true
    }

    /// Render the most recent `length` dates with the interval following each,
    /// then a line with the most recent `length` averages
    ///
    /// Returns `Ok(None)` when no dates are recorded.
    pub fn display(&self, length: ViewLength) -> Result<Option<String>> {
        let record = &self.record;
        if record.dates.is_empty() {
            return Ok(None);
        }
        if record.intervals.len() + 1 != record.dates.len() {
            return Err(TrackerError::InvariantViolation {
                dates: record.dates.len(),
                intervals: record.intervals.len(),
            });
        }

        let shown = length.resolve(record.dates.len()).max(1);
        let dates = tail(&record.dates, shown);
        let intervals = tail(&record.intervals, shown - 1);
        let averages = tail(&record.averages, shown);

        let mut lines = Vec::with_capacity(dates.len() * 2 + 1);
        for (day, interval) in dates.iter().zip(intervals) {
            lines.push(date::label(*day));
            lines.push(format!("    {}", days_label(*interval)));
        }
        if let Some(last) = dates.last() {
            lines.push(date::label(*last));
        }

        let averages = if averages.is_empty() {
            "none".to_string()
        } else {
            averages.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(" ")
        };
        lines.push(String::new());
        lines.push(format!("Averages (days): {}", averages));

        Ok(Some(lines.join("\n")))
    }

    /// Predict the next date: last date plus the latest average
    ///
    /// Returns `None` until at least two dates are recorded. Fractional
    /// averages are floored to whole days.
    pub fn predict(&self) -> Option<String> {
        let last = *self.record.dates.last()?;
        let average = *self.record.averages.last()?;

        let days = Duration::try_days(average.floor() as i64)?;
        last.checked_add_signed(days).map(date::label)
    }

    /// Write the current state back to the record store
    pub fn save(&mut self) -> Result<()> {
        if self.changed_on_disk() {
            warn!(
                "Record for {} changed on disk since it was loaded; overwriting",
                self.user_id
            );
        }

        self.store.store(&self.record, &self.user_id)?;
        self.synced_at = self.store.modified(&self.user_id);
        self.dirty = false;

        info!("Saved record for {}", self.user_id);
        Ok(())
    }

    /// Whether the stored record was rewritten since this session last
    /// loaded or saved it
    pub fn changed_on_disk(&self) -> bool {
        let on_disk = self.store.modified(&self.user_id);
        on_disk.is_some() && on_disk != self.synced_at
    }

    /// Whether there are changes not yet written by [`UserData::save`]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.record.dates
    }

    pub fn intervals(&self) -> &[i64] {
        &self.record.intervals
    }

    pub fn averages(&self) -> &[f64] {
        &self.record.averages
    }
}

fn keep_last<T>(items: &mut Vec<T>, n: usize) {
    let excess = items.len().saturating_sub(n);
    items.drain(..excess);
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

fn days_label(days: i64) -> String {
    if days.abs() == 1 {
        format!("{} day", days)
    } else {
        format!("{} days", days)
    }
}
