//! Sleep opportunity prediction ("`AutoSleep`").
//!
//! Predicts when a crew member sleeps given only their duty schedule:
//!
//! 1. Before the first duty: bedtime at 23:00, waking early enough to commute
//!    and get ready.
//! 2. Between duties: sleep after commuting home and winding down, capped at a
//!    full night and cut short so the next commute is made on time.
//!
//! Candidates shorter than the minimum viable sleep are dropped.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::types::{DutyPeriod, SleepPeriod};

/// Configuration for sleep prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSleepConfig {
    /// Travel time between rest facility and duty station.
    /// Default: 60 minutes.
    pub commute_buffer_minutes: i64,

    /// Time between waking and leaving for duty.
    /// Default: 60 minutes.
    pub wake_preparation_minutes: i64,

    /// Extra time after arriving home before falling asleep.
    /// Default: 60 minutes.
    pub wind_down_minutes: i64,

    /// Clock hour of the habitual bedtime before the first duty.
    /// Values past 23 are treated as 23.
    /// Default: 23.
    pub bedtime_hour: u32,

    /// Longest sleep predicted between two duties.
    /// Default: 480 minutes.
    pub max_sleep_minutes: i64,

    /// Shortest sleep worth predicting.
    /// Default: 60 minutes.
    pub min_sleep_minutes: i64,
}

impl Default for AutoSleepConfig {
    fn default() -> Self {
        Self {
            commute_buffer_minutes: 60,
            wake_preparation_minutes: 60,
            wind_down_minutes: 60,
            bedtime_hour: 23,
            max_sleep_minutes: 480, // 8 hours
            min_sleep_minutes: 60,
        }
    }
}

impl AutoSleepConfig {
    /// Time from waking to duty start.
    fn pre_duty_lead(&self) -> Duration {
        Duration::minutes(self.commute_buffer_minutes + self.wake_preparation_minutes)
    }

    /// Time from duty end to falling asleep.
    fn post_duty_lag(&self) -> Duration {
        Duration::minutes(self.commute_buffer_minutes + self.wind_down_minutes)
    }

    fn max_sleep(&self) -> Duration {
        Duration::minutes(self.max_sleep_minutes)
    }

    fn min_sleep(&self) -> Duration {
        Duration::minutes(self.min_sleep_minutes)
    }

    fn bedtime(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.bedtime_hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN)
    }
}

/// Predict sleep opportunities around a duty schedule.
///
/// Duties are expected in chronological order; they are re-sorted by start
/// time regardless. The returned periods are chronological and never overlap
/// any input duty.
pub fn predict_sleep_periods(
    duty_periods: &[DutyPeriod],
    config: &AutoSleepConfig,
) -> Vec<SleepPeriod> {
    let mut duties = duty_periods.to_vec();
    duties.sort_by_key(DutyPeriod::start);

    let Some(first) = duties.first() else {
        return Vec::new();
    };

    let mut candidates = Vec::with_capacity(duties.len());
    candidates.push(pre_trip_sleep(first, config));
    candidates.extend(
        duties
            .windows(2)
            .map(|pair| inter_duty_sleep(&pair[0], &pair[1], config)),
    );

    let sleeps: Vec<SleepPeriod> = candidates
        .into_iter()
        .filter_map(|(start, end)| {
            if end - start < config.min_sleep() {
                tracing::trace!(%start, %end, "discarding short sleep opportunity");
                return None;
            }
            if duties.iter().any(|duty| duty.overlaps(start, end)) {
                tracing::debug!(%start, %end, "discarding sleep opportunity overlapping duty");
                return None;
            }
            SleepPeriod::new(start, end).ok()
        })
        .collect();

    tracing::debug!(
        duties = duties.len(),
        sleeps = sleeps.len(),
        "predicted sleep opportunities"
    );
    sleeps
}

/// Night before the first duty, anchored to the habitual bedtime.
fn pre_trip_sleep(first: &DutyPeriod, config: &AutoSleepConfig) -> (NaiveDateTime, NaiveDateTime) {
    let wake = first.start() - config.pre_duty_lead();
    let bedtime = config.bedtime();
    let bedtime_date = if wake.hour() >= bedtime.hour() {
        wake.date()
    } else {
        wake.date() - Duration::days(1)
    };
    (bedtime_date.and_time(bedtime), wake)
}

/// Rest between two consecutive duties.
fn inter_duty_sleep(
    current: &DutyPeriod,
    next: &DutyPeriod,
    config: &AutoSleepConfig,
) -> (NaiveDateTime, NaiveDateTime) {
    let start = current.end() + config.post_duty_lag();
    let latest_wake = next.start() - config.pre_duty_lead();
    let end = (start + config.max_sleep()).min(latest_wake);
    (start, end)
}
