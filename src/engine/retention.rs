//! Snapshot retention: daily, then weekly, then monthly resolution.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::types::{KsError, KsResult, Snapshot};

/// Which retention band a snapshot's age falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionTier {
    /// Within the daily window (or in the future): always kept.
    Recent,
    /// Within the weekly window: kept on Sundays and on the first of the
    /// month, so month-starts live long enough to reach the monthly band.
    Weekly,
    /// Within the monthly window: kept only on the first of the month.
    Monthly,
    /// Older than the monthly window: always deleted.
    Expired,
}

/// Three-tier decimation policy applied whenever a snapshot is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Keep every snapshot at most this many days old.
    pub daily_days: i64,
    /// Up to this age in days, keep Sunday and first-of-month snapshots.
    pub weekly_days: i64,
    /// Up to this many calendar months back, keep first-of-month snapshots.
    pub monthly_months: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            daily_days: 30,
            weekly_days: 60,
            monthly_months: 13,
        }
    }
}

/// Outcome of evaluating a snapshot history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Ids of snapshots to keep.
    pub keep: Vec<String>,
    /// Ids of snapshots to delete.
    pub delete: Vec<String>,
}

impl RetentionPolicy {
    /// Check that the bands nest.
    pub fn validate(&self) -> KsResult<()> {
        if self.daily_days < 0 || self.weekly_days < self.daily_days {
            return Err(KsError::invalid(format!(
                "retention windows must satisfy 0 <= daily ({}) <= weekly ({})",
                self.daily_days, self.weekly_days
            )));
        }
        Ok(())
    }

    /// Place a snapshot timestamp into its band relative to `now`.
    ///
    /// Ages are counted in whole calendar days (UTC). The monthly band ends
    /// `monthly_months` calendar months before `now`, not a fixed day count.
    pub fn tier(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> RetentionTier {
        let date = timestamp.date_naive();
        let today = now.date_naive();
        let age_days = (today - date).num_days();

        if age_days <= self.daily_days {
            RetentionTier::Recent
        } else if age_days <= self.weekly_days {
            RetentionTier::Weekly
        } else if date >= self.monthly_cutoff(today) {
            RetentionTier::Monthly
        } else {
            RetentionTier::Expired
        }
    }

    /// Whether a snapshot taken at `timestamp` survives at `now`.
    pub fn should_keep(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let date = timestamp.date_naive();
        match self.tier(timestamp, now) {
            RetentionTier::Recent => true,
            RetentionTier::Weekly => date.weekday() == Weekday::Sun || date.day() == 1,
            RetentionTier::Monthly => date.day() == 1,
            RetentionTier::Expired => false,
        }
    }

    /// Split a history into snapshots to keep and to delete.
    pub fn plan(&self, snapshots: &[Snapshot], now: DateTime<Utc>) -> RetentionPlan {
        let mut plan = RetentionPlan::default();
        for snapshot in snapshots {
            if self.should_keep(snapshot.timestamp, now) {
                plan.keep.push(snapshot.id.clone());
            } else {
                plan.delete.push(snapshot.id.clone());
            }
        }
        plan
    }

    fn monthly_cutoff(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_months(Months::new(self.monthly_months))
            .unwrap_or(NaiveDate::MIN)
    }
}
