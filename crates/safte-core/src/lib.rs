//! Core domain logic for the SAFTE fatigue engine.
//!
//! This crate contains the fundamental types and logic for:
//! - Model: the SAFTE homeostatic reservoir, circadian process and sleep inertia
//! - Sleep prediction: estimating rest opportunities from a duty schedule
//! - Simulation: minute-by-minute effectiveness over a trip
//! - Metrics: scoring and risk classification of the simulated trip
//! - Schedule adaptation: turning parsed trip text into absolute duty periods

pub mod analysis;
pub mod autosleep;
pub mod metrics;
pub mod model;
pub mod params;
pub mod schedule;
pub mod simulation;
pub mod types;

pub use analysis::{
    AnalysisConfig, NO_DUTY_PERIODS_ERROR, TripFatigueAnalysis, analyze_duty_periods,
    analyze_trip_fatigue, analyze_trips,
};
pub use autosleep::{AutoSleepConfig, predict_sleep_periods};
pub use metrics::{
    DutyFatigue, FatigueMetrics, FatigueRisk, RiskThresholds, UnknownFatigueRisk,
    calculate_fatigue_metrics, duty_breakdown,
};
pub use params::SafteParams;
pub use schedule::{DutyDay, ParsedTrip, TokenError, build_duty_periods};
pub use simulation::{Simulator, simulate};
pub use types::{DutyPeriod, SimulationSample, SleepPeriod, ValidationError};
