//! Core type definitions with validation.

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The period ends at or before its start.
    #[error("{kind} must end after it starts ({start} .. {end})")]
    EmptyPeriod {
        kind: &'static str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

/// Wire form shared by every period type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawPeriod {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Generates a validated, immutable time period newtype.
macro_rules! define_period {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "RawPeriod", into = "RawPeriod")]
        pub struct $name {
            start: NaiveDateTime,
            end: NaiveDateTime,
        }

        impl $name {
            /// Creates a new period after checking that it ends after it starts.
            pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, ValidationError> {
                if end <= start {
                    return Err(ValidationError::EmptyPeriod {
                        kind: $kind,
                        start,
                        end,
                    });
                }
                Ok(Self { start, end })
            }

            /// Start of the period.
            pub const fn start(&self) -> NaiveDateTime {
                self.start
            }

            /// End of the period.
            pub const fn end(&self) -> NaiveDateTime {
                self.end
            }

            /// Length of the period.
            pub fn duration(&self) -> Duration {
                self.end - self.start
            }

            /// Whether `at` falls inside the period, both bounds included.
            pub fn contains(&self, at: NaiveDateTime) -> bool {
                self.start <= at && at <= self.end
            }

            /// Whether the two spans share any instant beyond a touching boundary.
            pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
                self.start < end && start < self.end
            }
        }

        impl TryFrom<RawPeriod> for $name {
            type Error = ValidationError;

            fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
                Self::new(raw.start, raw.end)
            }
        }

        impl From<$name> for RawPeriod {
            fn from(period: $name) -> Self {
                Self {
                    start: period.start,
                    end: period.end,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    "{} - {}",
                    self.start.format("%Y-%m-%d %H:%M"),
                    self.end.format("%Y-%m-%d %H:%M")
                )
            }
        }
    };
}

define_period!(
    /// A continuous span of on-duty wakefulness, in local time.
    ///
    /// Midnight-crossing duties carry an `end` on the following day.
    DutyPeriod, "duty period"
);

define_period!(
    /// A predicted sleep opportunity, in local time.
    SleepPeriod, "sleep period"
);

/// Model state for one simulated minute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationSample {
    /// The simulated minute.
    pub timestamp: NaiveDateTime,
    /// Cognitive effectiveness, clamped to \[0, 100\].
    pub effectiveness: f64,
    /// Reservoir level after this minute's update.
    pub reservoir_level: f64,
    /// Circadian contribution to effectiveness.
    pub performance_rhythm: f64,
    /// Post-waking impairment (always <= 0).
    pub sleep_inertia: f64,
    /// Whether the crew member was asleep during this minute.
    pub is_asleep: bool,
}
