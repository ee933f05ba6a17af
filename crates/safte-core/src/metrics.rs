//! Fatigue risk metrics over on-duty samples.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{DutyPeriod, SimulationSample};

/// Score contribution per hour spent below the danger threshold.
const DANGER_POINTS_PER_HOUR: f64 = 2.0;

/// Cap on the danger-time contribution.
const MAX_DANGER_POINTS: f64 = 20.0;

/// Effectiveness thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Below this the trip is severely fatiguing. Default: 60.
    pub severe: f64,
    /// Below this a minute counts as danger time. Default: 70.
    pub danger: f64,
    /// Below this a minute counts as warning time. Default: 82.
    pub warning: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            severe: 60.0,
            danger: 70.0,
            warning: 82.0,
        }
    }
}

/// Risk tier of a trip or duty, from its lowest effectiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FatigueRisk {
    Low,
    Moderate,
    High,
    Severe,
}

impl FatigueRisk {
    /// Classify a lowest-effectiveness value.
    pub fn classify(lowest_effectiveness: f64, thresholds: &RiskThresholds) -> Self {
        if lowest_effectiveness < thresholds.severe {
            Self::Severe
        } else if lowest_effectiveness < thresholds.danger {
            Self::High
        } else if lowest_effectiveness < thresholds.warning {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    /// Base of the overall fatigue score for this tier.
    const fn base_score(self) -> f64 {
        match self {
            Self::Severe => 80.0,
            Self::High => 60.0,
            Self::Moderate => 40.0,
            Self::Low => 20.0,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Severe => "severe",
        }
    }
}

impl fmt::Display for FatigueRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no fatigue risk tier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown fatigue risk: {0}")]
pub struct UnknownFatigueRisk(pub String);

impl FromStr for FatigueRisk {
    type Err = UnknownFatigueRisk;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "moderate" => Ok(Self::Moderate),
            "high" => Ok(Self::High),
            "severe" => Ok(Self::Severe),
            _ => Err(UnknownFatigueRisk(s.to_string())),
        }
    }
}

/// Summary of effectiveness over a trip's duty time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatigueMetrics {
    pub lowest_effectiveness: f64,
    pub lowest_effectiveness_time: NaiveDateTime,
    /// Minutes below the danger threshold.
    pub time_below_danger_min: u32,
    /// Minutes below the warning threshold.
    pub time_below_warning_min: u32,
    pub average_effectiveness_on_duty: f64,
    /// Composite risk score in \[0, 100\].
    pub overall_fatigue_score: f64,
}

/// Effectiveness summary for a single duty period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutyFatigue {
    /// Position of the duty in the input slice.
    pub index: usize,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub lowest_effectiveness: f64,
    pub lowest_effectiveness_time: NaiveDateTime,
    pub average_effectiveness: f64,
    pub time_below_danger_min: u32,
    pub time_below_warning_min: u32,
    pub risk: FatigueRisk,
}

/// Effectiveness statistics over a set of samples.
struct Summary {
    lowest: f64,
    lowest_at: NaiveDateTime,
    below_danger: u32,
    below_warning: u32,
    mean: f64,
}

fn summarize<'a, I>(samples: I, thresholds: &RiskThresholds) -> Option<Summary>
where
    I: IntoIterator<Item = &'a SimulationSample>,
{
    let mut iter = samples.into_iter();
    let first = iter.next()?;

    let mut summary = Summary {
        lowest: first.effectiveness,
        lowest_at: first.timestamp,
        below_danger: 0,
        below_warning: 0,
        mean: 0.0,
    };
    let mut total = 0.0;
    let mut count = 0_u32;

    for sample in std::iter::once(first).chain(iter) {
        // Strict comparison keeps the earliest minimum.
        if sample.effectiveness < summary.lowest {
            summary.lowest = sample.effectiveness;
            summary.lowest_at = sample.timestamp;
        }
        if sample.effectiveness < thresholds.danger {
            summary.below_danger += 1;
        }
        if sample.effectiveness < thresholds.warning {
            summary.below_warning += 1;
        }
        total += sample.effectiveness;
        count += 1;
    }

    summary.mean = total / f64::from(count);
    Some(summary)
}

/// Overall fatigue score: tier base plus up to 20 points of danger time.
pub fn fatigue_score(
    lowest_effectiveness: f64,
    danger_minutes: u32,
    thresholds: &RiskThresholds,
) -> f64 {
    let base = FatigueRisk::classify(lowest_effectiveness, thresholds).base_score();
    let danger_hours = f64::from(danger_minutes) / 60.0;
    let penalty = (danger_hours * DANGER_POINTS_PER_HOUR).min(MAX_DANGER_POINTS);
    (base + penalty).clamp(0.0, 100.0)
}

fn on_duty(sample: &SimulationSample, duty_periods: &[DutyPeriod]) -> bool {
    duty_periods.iter().any(|d| d.contains(sample.timestamp))
}

/// Compute fatigue metrics for the samples that fall inside any duty period.
///
/// When no sample is on duty the whole sequence is used instead. Returns
/// `None` only for an empty sample sequence.
pub fn calculate_fatigue_metrics(
    samples: &[SimulationSample],
    duty_periods: &[DutyPeriod],
    thresholds: &RiskThresholds,
) -> Option<FatigueMetrics> {
    let on_duty_summary = summarize(
        samples.iter().filter(|s| on_duty(s, duty_periods)),
        thresholds,
    );
    let summary = match on_duty_summary {
        Some(summary) => summary,
        None => {
            if !samples.is_empty() {
                tracing::debug!("no samples on duty, using the full simulation");
            }
            summarize(samples, thresholds)?
        }
    };

    Some(FatigueMetrics {
        lowest_effectiveness: summary.lowest,
        lowest_effectiveness_time: summary.lowest_at,
        time_below_danger_min: summary.below_danger,
        time_below_warning_min: summary.below_warning,
        average_effectiveness_on_duty: summary.mean,
        overall_fatigue_score: fatigue_score(summary.lowest, summary.below_danger, thresholds),
    })
}

/// Per-duty effectiveness breakdown. Duties without samples are omitted.
pub fn duty_breakdown(
    samples: &[SimulationSample],
    duty_periods: &[DutyPeriod],
    thresholds: &RiskThresholds,
) -> Vec<DutyFatigue> {
    duty_periods
        .iter()
        .enumerate()
        .filter_map(|(index, duty)| {
            let summary = summarize(
                samples.iter().filter(|s| duty.contains(s.timestamp)),
                thresholds,
            )?;
            Some(DutyFatigue {
                index,
                start: duty.start(),
                end: duty.end(),
                lowest_effectiveness: summary.lowest,
                lowest_effectiveness_time: summary.lowest_at,
                average_effectiveness: summary.mean,
                time_below_danger_min: summary.below_danger,
                time_below_warning_min: summary.below_warning,
                risk: FatigueRisk::classify(summary.lowest, thresholds),
            })
        })
        .collect()
}
