//! Trip-level fatigue analysis.
//!
//! Composes the pipeline: schedule adapter → sleep prediction → simulation →
//! metrics. Trips are independent, so batches are analysed in parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::autosleep::{AutoSleepConfig, predict_sleep_periods};
use crate::metrics::{
    DutyFatigue, FatigueMetrics, FatigueRisk, RiskThresholds, calculate_fatigue_metrics,
    duty_breakdown,
};
use crate::params::SafteParams;
use crate::schedule::{ParsedTrip, build_duty_periods};
use crate::simulation::Simulator;
use crate::types::{DutyPeriod, SimulationSample, SleepPeriod};

/// Error reported for trips without a single usable duty day.
pub const NO_DUTY_PERIODS_ERROR: &str = "No valid duty periods found in trip";

/// Everything the analysis pipeline needs besides the trip itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub model: SafteParams,
    pub sleep: AutoSleepConfig,
    pub thresholds: RiskThresholds,
    /// Reservoir level at the start of the simulation window.
    /// Default: 90% of capacity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_reservoir: Option<f64>,
}

/// Result of analysing one trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TripFatigueAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
    pub duty_periods: Vec<DutyPeriod>,
    pub sleep_periods: Vec<SleepPeriod>,
    /// Per-minute model output. Not serialized; it is large.
    #[serde(skip)]
    pub samples: Vec<SimulationSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<FatigueMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<FatigueRisk>,
    pub duty_breakdown: Vec<DutyFatigue>,
    /// User-facing reason the trip could not be analysed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TripFatigueAnalysis {
    /// Overall score, or 0 when the trip could not be analysed.
    pub fn score(&self) -> f64 {
        self.metrics
            .as_ref()
            .map_or(0.0, |m| m.overall_fatigue_score)
    }
}

/// Analyse a single trip.
pub fn analyze_trip_fatigue(trip: &ParsedTrip, config: &AnalysisConfig) -> TripFatigueAnalysis {
    let duty_periods = build_duty_periods(trip);
    analyze_duty_periods(trip.trip_id.clone(), duty_periods, config)
}

/// Analyse an already-resolved duty schedule.
pub fn analyze_duty_periods(
    trip_id: Option<String>,
    duty_periods: Vec<DutyPeriod>,
    config: &AnalysisConfig,
) -> TripFatigueAnalysis {
    if duty_periods.is_empty() {
        tracing::warn!(?trip_id, "no valid duty periods");
        return TripFatigueAnalysis {
            trip_id,
            error: Some(NO_DUTY_PERIODS_ERROR.to_string()),
            ..TripFatigueAnalysis::default()
        };
    }

    let sleep_periods = predict_sleep_periods(&duty_periods, &config.sleep);
    let samples = Simulator::new(&config.model)
        .with_initial_reservoir(config.initial_reservoir)
        .run(&duty_periods, &sleep_periods);
    let metrics = calculate_fatigue_metrics(&samples, &duty_periods, &config.thresholds);
    let breakdown = duty_breakdown(&samples, &duty_periods, &config.thresholds);
    let risk = metrics
        .as_ref()
        .map(|m| FatigueRisk::classify(m.lowest_effectiveness, &config.thresholds));

    tracing::debug!(
        ?trip_id,
        duties = duty_periods.len(),
        sleeps = sleep_periods.len(),
        score = metrics.as_ref().map(|m| m.overall_fatigue_score),
        "analysed trip"
    );

    TripFatigueAnalysis {
        trip_id,
        duty_periods,
        sleep_periods,
        samples,
        metrics,
        risk,
        duty_breakdown: breakdown,
        error: None,
    }
}

/// Analyse many trips in parallel, preserving input order.
pub fn analyze_trips(trips: &[ParsedTrip], config: &AnalysisConfig) -> Vec<TripFatigueAnalysis> {
    trips
        .par_iter()
        .map(|trip| analyze_trip_fatigue(trip, config))
        .collect()
}
