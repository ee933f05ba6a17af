//! Stateless SAFTE model components.
//!
//! Every function here is pure: the simulator owns all state and feeds the
//! current reservoir level and clock hour in.

use std::f64::consts::PI;

use chrono::{NaiveDateTime, Timelike};

use crate::params::SafteParams;

// ========== Circadian Oscillator ==========

/// Fractional local clock hour of `at`, in \[0, 24).
pub fn clock_hour(at: NaiveDateTime) -> f64 {
    f64::from(at.hour()) + f64::from(at.minute()) / 60.0 + f64::from(at.second()) / 3600.0
}

/// Circadian rhythm value for a local clock hour.
///
/// `C(T) = cos(2π(T−p)/24) + β·cos(4π(T−p−p′)/24)`
pub fn circadian(hour: f64, params: &SafteParams) -> f64 {
    let p = params.circadian_acrophase;
    let harmonic = 4.0 * PI * (hour - p - params.harmonic_offset) / 24.0;
    (2.0 * PI * (hour - p) / 24.0).cos() + params.harmonic_amplitude * harmonic.cos()
}

// ========== Reservoir Dynamics ==========

/// Reservoir after one awake minute.
pub fn deplete(reservoir: f64, params: &SafteParams) -> f64 {
    (reservoir - params.depletion_rate).max(0.0)
}

/// Sleep accumulation rate for one minute.
///
/// `S = S_max·[1 − exp(−f·(Rc−R))]·[1 + a_s·C]`, clamped to \[0, `S_max`\].
pub fn accumulation_rate(reservoir: f64, circadian: f64, params: &SafteParams) -> f64 {
    let debt = params.reservoir_capacity - reservoir;
    let saturation = 1.0 - (-params.sleep_debt_factor * debt).exp();
    let modulation = 1.0 + params.sleep_circadian_amplitude * circadian;
    (params.max_sleep_accumulation * saturation * modulation)
        .clamp(0.0, params.max_sleep_accumulation)
}

/// Reservoir after one sleeping minute.
pub fn accumulate(reservoir: f64, circadian: f64, params: &SafteParams) -> f64 {
    (reservoir + accumulation_rate(reservoir, circadian, params)).min(params.reservoir_capacity)
}

// ========== Sleep Propensity ==========

/// Sleep propensity `SP = −a_s·C + f·(Rc−R)`.
///
/// Only evaluated at the waking transition; it sets the inertia time scale for
/// the whole wake bout.
pub fn sleep_propensity(reservoir: f64, circadian: f64, params: &SafteParams) -> f64 {
    -params.sleep_circadian_amplitude * circadian
        + params.sleep_debt_factor * (params.reservoir_capacity - reservoir)
}

// ========== Performance Rhythm ==========

/// Circadian contribution to effectiveness, amplified by sleep debt.
pub fn performance_rhythm(reservoir: f64, circadian: f64, params: &SafteParams) -> f64 {
    let debt_fraction = (params.reservoir_capacity - reservoir) / params.reservoir_capacity;
    let amplitude = params.rhythm_base_amplitude + params.rhythm_fatigue_amplitude * debt_fraction;
    amplitude * circadian
}

// ========== Sleep Inertia ==========

/// Sleep inertia `minutes_awake` after waking.
///
/// Non-positive intensity disables inertia.
pub fn sleep_inertia(minutes_awake: f64, intensity: f64, params: &SafteParams) -> f64 {
    if intensity <= 0.0 {
        return 0.0;
    }
    let tau = intensity * params.sleep_inertia_time_constant;
    -params.max_sleep_inertia * (-minutes_awake / tau).exp()
}

// ========== Effectiveness ==========

/// Unclamped effectiveness; may exceed 100 at full reservoir near the circadian peak.
pub fn raw_effectiveness(reservoir: f64, rhythm: f64, inertia: f64, params: &SafteParams) -> f64 {
    100.0 * (reservoir / params.reservoir_capacity) + rhythm + inertia
}

/// Effectiveness as reported, clamped to \[0, 100\].
pub fn effectiveness(reservoir: f64, rhythm: f64, inertia: f64, params: &SafteParams) -> f64 {
    raw_effectiveness(reservoir, rhythm, inertia, params).clamp(0.0, 100.0)
}
