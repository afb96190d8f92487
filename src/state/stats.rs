//! Daily usage counters

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Counters persisted under the `stats` key. All counters reset when the
/// calendar day of `last_updated` is not today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default)]
    pub total_reminders: u64,
    #[serde(default)]
    pub completed_breaks: u64,
    #[serde(default)]
    pub skipped_breaks: u64,
    #[serde(default)]
    pub message_success: u64,
    #[serde(default)]
    pub message_failures: u64,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub last_updated: i64,
}

/// A single counter in [`Stats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatField {
    TotalReminders,
    CompletedBreaks,
    SkippedBreaks,
    MessageSuccess,
    MessageFailures,
}

impl StatField {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatField::TotalReminders => "totalReminders",
            StatField::CompletedBreaks => "completedBreaks",
            StatField::SkippedBreaks => "skippedBreaks",
            StatField::MessageSuccess => "messageSuccess",
            StatField::MessageFailures => "messageFailures",
        }
    }
}

impl Stats {
    /// Zeroed counters stamped with `now`
    pub fn fresh(now: DateTime<Local>) -> Self {
        Self {
            total_reminders: 0,
            completed_breaks: 0,
            skipped_breaks: 0,
            message_success: 0,
            message_failures: 0,
            last_updated: now.timestamp_millis(),
        }
    }

    pub fn get(&self, field: StatField) -> u64 {
        match field {
            StatField::TotalReminders => self.total_reminders,
            StatField::CompletedBreaks => self.completed_breaks,
            StatField::SkippedBreaks => self.skipped_breaks,
            StatField::MessageSuccess => self.message_success,
            StatField::MessageFailures => self.message_failures,
        }
    }

    fn counter_mut(&mut self, field: StatField) -> &mut u64 {
        match field {
            StatField::TotalReminders => &mut self.total_reminders,
            StatField::CompletedBreaks => &mut self.completed_breaks,
            StatField::SkippedBreaks => &mut self.skipped_breaks,
            StatField::MessageSuccess => &mut self.message_success,
            StatField::MessageFailures => &mut self.message_failures,
        }
    }

    /// Whether `last_updated` falls on a different local calendar day than `now`
    pub fn is_stale(&self, now: DateTime<Local>) -> bool {
        match Local.timestamp_millis_opt(self.last_updated).single() {
            Some(last) => last.date_naive() != now.date_naive(),
            None => true,
        }
    }

    /// Reset the counters if the day changed. Returns true when a reset happened.
    pub fn roll_over(&mut self, now: DateTime<Local>) -> bool {
        if self.is_stale(now) {
            *self = Self::fresh(now);
            true
        } else {
            false
        }
    }

    /// Bump one counter and refresh `last_updated`. A day change since the
    /// last update resets the counters first.
    pub fn increment(&mut self, field: StatField, now: DateTime<Local>) {
        self.roll_over(now);
        let counter = self.counter_mut(field);
        *counter = counter.saturating_add(1);
        self.last_updated = now.timestamp_millis();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn increment_bumps_field_and_timestamp() {
        let start = noon();
        let mut stats = Stats::fresh(start);
        let later = start + Duration::minutes(5);

        stats.increment(StatField::CompletedBreaks, later);

        assert_eq!(stats.completed_breaks, 1);
        assert_eq!(stats.skipped_breaks, 0);
        assert_eq!(stats.last_updated, later.timestamp_millis());
    }

    #[test]
    fn yesterday_resets_on_load() {
        let now = noon();
        let mut stats = Stats::fresh(now - Duration::days(1));
        stats.total_reminders = 7;
        stats.completed_breaks = 4;
        stats.message_failures = 2;

        assert!(stats.roll_over(now));
        assert_eq!(stats, Stats::fresh(now));
    }

    #[test]
    fn same_day_is_kept() {
        let now = noon();
        let mut stats = Stats::fresh(now - Duration::hours(3));
        stats.skipped_breaks = 3;

        assert!(!stats.roll_over(now));
        assert_eq!(stats.skipped_breaks, 3);
    }

    #[test]
    fn same_day_of_month_in_another_month_is_stale() {
        let now = noon();
        let stats = Stats::fresh(Local.with_ymd_and_hms(2026, 2, 14, 12, 0, 0).unwrap());
        assert!(stats.is_stale(now));
    }

    #[test]
    fn counters_reset_exactly_once_across_midnight() {
        let evening = Local.with_ymd_and_hms(2026, 3, 14, 23, 58, 0).unwrap();
        let mut stats = Stats::fresh(evening);
        stats.increment(StatField::TotalReminders, evening);
        stats.increment(StatField::TotalReminders, evening + Duration::minutes(1));
        assert_eq!(stats.total_reminders, 2);

        let after_midnight = evening + Duration::minutes(3);
        stats.increment(StatField::TotalReminders, after_midnight);
        assert_eq!(stats.total_reminders, 1);

        stats.increment(StatField::TotalReminders, after_midnight + Duration::minutes(20));
        assert_eq!(stats.total_reminders, 2);
    }

    #[test]
    fn missing_fields_deserialize_as_zero() {
        let stats: Stats = serde_json::from_str(r#"{"completedBreaks": 2}"#).unwrap();
        assert_eq!(stats.completed_breaks, 2);
        assert_eq!(stats.total_reminders, 0);
        assert_eq!(stats.last_updated, 0);
    }
}
