//! SAFTE model constants.
//!
//! Values follow Hursh et al. (2004). [`SafteParams`] bundles them so callers
//! can override individual coefficients from configuration while the engine
//! only ever sees an immutable reference.

use serde::{Deserialize, Serialize};

/// Reservoir capacity (units).
pub const RESERVOIR_CAPACITY: f64 = 2880.0;

/// Reservoir depletion while awake (units per minute).
pub const DEPLETION_RATE: f64 = 0.5;

/// Maximum sleep accumulation rate (units per minute).
pub const MAX_SLEEP_ACCUMULATION: f64 = 3.4;

/// Sleep debt feedback coefficient.
pub const SLEEP_DEBT_FACTOR: f64 = 0.003_12;

/// Circadian amplitude for sleep accumulation and propensity.
pub const SLEEP_CIRCADIAN_AMPLITUDE: f64 = 0.55;

/// Acrophase of the 24h component (clock hour).
pub const CIRCADIAN_ACROPHASE: f64 = 18.0;

/// Phase offset of the 12h harmonic relative to the 24h acrophase (hours).
pub const HARMONIC_OFFSET: f64 = 3.0;

/// Relative amplitude of the 12h harmonic.
pub const HARMONIC_AMPLITUDE: f64 = 0.5;

/// Fixed part of the performance rhythm amplitude.
pub const RHYTHM_BASE_AMPLITUDE: f64 = 7.0;

/// Fatigue-dependent part of the performance rhythm amplitude.
pub const RHYTHM_FATIGUE_AMPLITUDE: f64 = 5.0;

/// Maximum sleep inertia impairment (effectiveness points).
pub const MAX_SLEEP_INERTIA: f64 = 5.0;

/// Sleep inertia time constant (minutes).
pub const SLEEP_INERTIA_TIME_CONSTANT: f64 = 15.0;

/// Fraction of capacity assumed at simulation start.
pub const DEFAULT_INITIAL_FRACTION: f64 = 0.9;

/// Coefficients of the SAFTE model.
///
/// `Default` yields the published values above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafteParams {
    /// Reservoir capacity `Rc`.
    pub reservoir_capacity: f64,
    /// Awake depletion rate `P`.
    pub depletion_rate: f64,
    /// Maximum accumulation rate `S_max`.
    pub max_sleep_accumulation: f64,
    /// Sleep debt factor `f`.
    pub sleep_debt_factor: f64,
    /// Circadian amplitude `a_s`.
    pub sleep_circadian_amplitude: f64,
    /// 24h acrophase `p`.
    pub circadian_acrophase: f64,
    /// 12h harmonic offset `p'`.
    pub harmonic_offset: f64,
    /// 12h harmonic amplitude `beta`.
    pub harmonic_amplitude: f64,
    /// Performance rhythm amplitude `a1`.
    pub rhythm_base_amplitude: f64,
    /// Performance rhythm amplitude `a2`.
    pub rhythm_fatigue_amplitude: f64,
    /// Sleep inertia maximum `I_max`.
    pub max_sleep_inertia: f64,
    /// Sleep inertia time constant `k` (minutes).
    pub sleep_inertia_time_constant: f64,
    /// Initial reservoir as a fraction of capacity.
    pub initial_reservoir_fraction: f64,
}

impl Default for SafteParams {
    fn default() -> Self {
        Self {
            reservoir_capacity: RESERVOIR_CAPACITY,
            depletion_rate: DEPLETION_RATE,
            max_sleep_accumulation: MAX_SLEEP_ACCUMULATION,
            sleep_debt_factor: SLEEP_DEBT_FACTOR,
            sleep_circadian_amplitude: SLEEP_CIRCADIAN_AMPLITUDE,
            circadian_acrophase: CIRCADIAN_ACROPHASE,
            harmonic_offset: HARMONIC_OFFSET,
            harmonic_amplitude: HARMONIC_AMPLITUDE,
            rhythm_base_amplitude: RHYTHM_BASE_AMPLITUDE,
            rhythm_fatigue_amplitude: RHYTHM_FATIGUE_AMPLITUDE,
            max_sleep_inertia: MAX_SLEEP_INERTIA,
            sleep_inertia_time_constant: SLEEP_INERTIA_TIME_CONSTANT,
            initial_reservoir_fraction: DEFAULT_INITIAL_FRACTION,
        }
    }
}

impl SafteParams {
    /// Default initial reservoir level in units.
    pub fn default_initial_reservoir(&self) -> f64 {
        self.initial_reservoir_fraction * self.reservoir_capacity
    }
}
