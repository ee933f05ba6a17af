//! Minute-resolution SAFTE simulator.
//!
//! # Algorithm Summary
//!
//! 1. Merge duty and sleep boundaries into one chronological timeline
//! 2. Walk from one day before the first boundary to one day after the last,
//!    one minute at a time
//! 3. Each minute: evaluate the circadian oscillator at the wall-clock hour,
//!    apply due boundaries, update the reservoir and emit a sample
//!
//! Waking captures a [`WakeSnapshot`] whose sleep intensity is frozen for the
//! whole wake bout and drives sleep inertia.

use chrono::{Duration, NaiveDateTime, Timelike};

use crate::autosleep::{AutoSleepConfig, predict_sleep_periods};
use crate::model;
use crate::params::SafteParams;
use crate::types::{DutyPeriod, SimulationSample, SleepPeriod};

/// A timeline boundary.
///
/// Variant order breaks ties between boundaries at the same instant: a sleep
/// ending is handled before one starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    SleepEnd,
    DutyEnd,
    DutyStart,
    SleepStart,
}

/// A boundary at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationEvent {
    pub at: NaiveDateTime,
    pub kind: EventKind,
}

/// State captured when waking up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WakeSnapshot {
    /// Sleep propensity at the waking transition.
    pub sleep_intensity: f64,
    /// Minutes elapsed since waking.
    pub minutes_since_wake: u32,
}

impl WakeSnapshot {
    /// Snapshot for the start of a simulation: no preceding sleep, no inertia.
    pub const fn rested() -> Self {
        Self {
            sleep_intensity: 0.0,
            minutes_since_wake: 0,
        }
    }

    /// Snapshot taken at the moment of waking.
    pub fn capture(reservoir: f64, circadian: f64, params: &SafteParams) -> Self {
        Self {
            sleep_intensity: model::sleep_propensity(reservoir, circadian, params),
            minutes_since_wake: 0,
        }
    }

    /// Sleep inertia at the current point of the wake bout.
    pub fn inertia(&self, params: &SafteParams) -> f64 {
        model::sleep_inertia(
            f64::from(self.minutes_since_wake),
            self.sleep_intensity,
            params,
        )
    }
}

/// Sleep/wake phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Awake(WakeSnapshot),
    Asleep,
}

/// Mutable state of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub reservoir: f64,
    pub phase: Phase,
}

impl SimulationState {
    /// Awake, with no pending sleep inertia.
    pub const fn new(reservoir: f64) -> Self {
        Self {
            reservoir,
            phase: Phase::Awake(WakeSnapshot::rested()),
        }
    }

    pub const fn is_asleep(&self) -> bool {
        matches!(self.phase, Phase::Asleep)
    }

    /// Apply a timeline boundary.
    ///
    /// Duty boundaries do not change the phase. Redundant sleep boundaries
    /// (falling asleep while asleep, waking while awake) are ignored so an
    /// existing snapshot is never replaced mid-bout.
    pub fn apply(&mut self, kind: EventKind, circadian: f64, params: &SafteParams) {
        match (kind, self.phase) {
            (EventKind::SleepStart, Phase::Awake(_)) => {
                tracing::trace!(reservoir = self.reservoir, "falling asleep");
                self.phase = Phase::Asleep;
            }
            (EventKind::SleepEnd, Phase::Asleep) => {
                let snapshot = WakeSnapshot::capture(self.reservoir, circadian, params);
                tracing::trace!(
                    reservoir = self.reservoir,
                    sleep_intensity = snapshot.sleep_intensity,
                    "waking up"
                );
                self.phase = Phase::Awake(snapshot);
            }
            _ => {}
        }
    }

    /// Advance one minute and report the resulting sample.
    pub fn step(
        &mut self,
        at: NaiveDateTime,
        due: &[EventKind],
        params: &SafteParams,
    ) -> SimulationSample {
        let circadian = model::circadian(model::clock_hour(at), params);

        for &kind in due {
            self.apply(kind, circadian, params);
        }

        self.reservoir = match self.phase {
            Phase::Asleep => model::accumulate(self.reservoir, circadian, params),
            Phase::Awake(_) => model::deplete(self.reservoir, params),
        };

        let rhythm = model::performance_rhythm(self.reservoir, circadian, params);
        let inertia = match &mut self.phase {
            Phase::Asleep => 0.0,
            Phase::Awake(snapshot) => {
                let inertia = snapshot.inertia(params);
                snapshot.minutes_since_wake = snapshot.minutes_since_wake.saturating_add(1);
                inertia
            }
        };

        SimulationSample {
            timestamp: at,
            effectiveness: model::effectiveness(self.reservoir, rhythm, inertia, params),
            reservoir_level: self.reservoir,
            performance_rhythm: rhythm,
            sleep_inertia: inertia,
            is_asleep: self.is_asleep(),
        }
    }
}

/// Merge duty and sleep boundaries into a chronological timeline.
pub fn build_timeline(
    duty_periods: &[DutyPeriod],
    sleep_periods: &[SleepPeriod],
) -> Vec<SimulationEvent> {
    let duty = duty_periods.iter().flat_map(|d| {
        [
            SimulationEvent {
                at: d.start(),
                kind: EventKind::DutyStart,
            },
            SimulationEvent {
                at: d.end(),
                kind: EventKind::DutyEnd,
            },
        ]
    });
    let sleep = sleep_periods.iter().flat_map(|s| {
        [
            SimulationEvent {
                at: s.start(),
                kind: EventKind::SleepStart,
            },
            SimulationEvent {
                at: s.end(),
                kind: EventKind::SleepEnd,
            },
        ]
    });

    let mut events: Vec<SimulationEvent> = duty.chain(sleep).collect();
    events.sort_by_key(|e| (e.at, e.kind));
    events
}

/// Runs the SAFTE model over a schedule.
#[derive(Debug, Clone)]
pub struct Simulator<'a> {
    params: &'a SafteParams,
    initial_reservoir: f64,
    lead_in: Duration,
    lead_out: Duration,
}

impl<'a> Simulator<'a> {
    /// Simulator with the default initial reservoir and one day of padding on
    /// either side of the schedule.
    pub fn new(params: &'a SafteParams) -> Self {
        Self {
            params,
            initial_reservoir: params.default_initial_reservoir(),
            lead_in: Duration::days(1),
            lead_out: Duration::days(1),
        }
    }

    /// Override the reservoir level at the start of the window.
    ///
    /// Values outside \[0, Rc\] are clamped; NaN keeps the default.
    #[must_use]
    pub fn with_initial_reservoir(mut self, level: Option<f64>) -> Self {
        let Some(level) = level else {
            return self;
        };
        if level.is_nan() {
            tracing::warn!("ignoring NaN initial reservoir");
            return self;
        }
        let clamped = level.clamp(0.0, self.params.reservoir_capacity);
        if (clamped - level).abs() > f64::EPSILON {
            tracing::warn!(level, clamped, "initial reservoir out of range, clamping");
        }
        self.initial_reservoir = clamped;
        self
    }

    /// Override the padding simulated before the first and after the last boundary.
    #[must_use]
    pub fn with_padding(mut self, lead_in: Duration, lead_out: Duration) -> Self {
        self.lead_in = lead_in;
        self.lead_out = lead_out;
        self
    }

    /// Simulate a schedule with explicit sleep periods.
    ///
    /// Returns one sample per minute, or nothing when there are no boundaries.
    pub fn run(
        &self,
        duty_periods: &[DutyPeriod],
        sleep_periods: &[SleepPeriod],
    ) -> Vec<SimulationSample> {
        let timeline = build_timeline(duty_periods, sleep_periods);
        let (Some(first), Some(last)) = (timeline.first(), timeline.last()) else {
            return Vec::new();
        };

        let start = truncate_to_minute(first.at - self.lead_in);
        let end = last.at + self.lead_out;
        let minutes = (end - start).num_minutes().max(0);
        tracing::debug!(
            %start,
            %end,
            minutes,
            events = timeline.len(),
            "running simulation"
        );

        let mut samples = Vec::with_capacity(usize::try_from(minutes + 1).unwrap_or(0));
        let mut state = SimulationState::new(self.initial_reservoir);
        let mut pending = timeline.iter().peekable();
        let mut due = Vec::new();
        let mut at = start;

        while at <= end {
            due.clear();
            while let Some(event) = pending.next_if(|e| e.at <= at) {
                due.push(event.kind);
            }
            samples.push(state.step(at, &due, self.params));
            at += Duration::minutes(1);
        }

        samples
    }
}

fn truncate_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Predict sleep for a duty schedule and simulate it.
///
/// `initial_reservoir` defaults to 90% of capacity.
pub fn simulate(
    duty_periods: &[DutyPeriod],
    initial_reservoir: Option<f64>,
    params: &SafteParams,
    sleep_config: &AutoSleepConfig,
) -> Vec<SimulationSample> {
    let sleep_periods = predict_sleep_periods(duty_periods, sleep_config);
    Simulator::new(params)
        .with_initial_reservoir(initial_reservoir)
        .run(duty_periods, &sleep_periods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn duty(start: NaiveDateTime, end: NaiveDateTime) -> DutyPeriod {
        DutyPeriod::new(start, end).unwrap()
    }

    fn sleep(start: NaiveDateTime, end: NaiveDateTime) -> SleepPeriod {
        SleepPeriod::new(start, end).unwrap()
    }

    fn sample_at(samples: &[SimulationSample], ts: NaiveDateTime) -> SimulationSample {
        *samples.iter().find(|s| s.timestamp == ts).unwrap()
    }

    /// Circadian value recovered from a sample's rhythm and reservoir.
    fn implied_circadian(sample: &SimulationSample, params: &SafteParams) -> f64 {
        let debt = (params.reservoir_capacity - sample.reservoir_level) / params.reservoir_capacity;
        let amplitude = params.rhythm_base_amplitude + params.rhythm_fatigue_amplitude * debt;
        sample.performance_rhythm / amplitude
    }

    // ========== Timeline Tests ==========

    #[test]
    fn timeline_is_chronological() {
        let duties = [duty(at(2, 8, 0), at(2, 16, 0))];
        let sleeps = [sleep(at(1, 23, 0), at(2, 6, 0))];
        let timeline = build_timeline(&duties, &sleeps);

        let kinds: Vec<_> = timeline.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::SleepStart,
                EventKind::SleepEnd,
                EventKind::DutyStart,
                EventKind::DutyEnd
            ]
        );
    }

    #[test]
    fn simultaneous_sleep_boundaries_end_before_start() {
        let sleeps = [
            sleep(at(1, 22, 0), at(2, 2, 0)),
            sleep(at(2, 2, 0), at(2, 5, 0)),
        ];
        let timeline = build_timeline(&[], &sleeps);
        assert_eq!(timeline[1].kind, EventKind::SleepEnd);
        assert_eq!(timeline[2].kind, EventKind::SleepStart);
    }

    // ========== Simulator Tests ==========

    #[test]
    fn empty_schedule_yields_no_samples() {
        let params = SafteParams::default();
        assert!(Simulator::new(&params).run(&[], &[]).is_empty());
        assert!(simulate(&[], None, &params, &AutoSleepConfig::default()).is_empty());
    }

    #[test]
    fn window_pads_one_day_each_side() {
        let params = SafteParams::default();
        let duties = [duty(at(2, 8, 0), at(2, 16, 0))];
        let samples = Simulator::new(&params).run(&duties, &[]);

        assert_eq!(samples.len(), 3361);
        assert_eq!(samples[0].timestamp, at(1, 8, 0));
        assert_eq!(samples.last().unwrap().timestamp, at(3, 16, 0));
        assert!(samples.windows(2).all(|w| w[1].timestamp - w[0].timestamp == Duration::minutes(1)));
    }

    #[test]
    fn day_awake_from_full_reservoir_depletes_720() {
        let params = SafteParams::default();
        let duties = [duty(at(2, 8, 0), at(2, 16, 0))];
        let samples = Simulator::new(&params)
            .with_initial_reservoir(Some(params.reservoir_capacity))
            .run(&duties, &[]);

        let depleted = params.reservoir_capacity - samples[1439].reservoir_level;
        assert!((depleted - 720.0).abs() <= 7.2, "depleted {depleted}");
    }

    #[test]
    fn asleep_flag_follows_sleep_period() {
        let params = SafteParams::default();
        let duties = [duty(at(2, 8, 0), at(2, 16, 0))];
        let sleeps = [sleep(at(1, 23, 0), at(2, 6, 0))];
        let samples = Simulator::new(&params).run(&duties, &sleeps);

        let asleep = samples.iter().filter(|s| s.is_asleep).count();
        assert_eq!(asleep, 420);
        assert!(sample_at(&samples, at(1, 23, 0)).is_asleep);
        assert!(!sample_at(&samples, at(2, 6, 0)).is_asleep);
    }

    #[test]
    fn inertia_peaks_at_waking_and_fades() {
        let params = SafteParams::default();
        let duties = [duty(at(2, 8, 0), at(2, 16, 0))];
        let sleeps = [sleep(at(1, 23, 0), at(2, 6, 0))];
        let samples = Simulator::new(&params).run(&duties, &sleeps);

        let waking = sample_at(&samples, at(2, 6, 0));
        assert!((waking.sleep_inertia + params.max_sleep_inertia).abs() < 1e-9);

        let later = sample_at(&samples, at(2, 8, 0));
        assert!(later.sleep_inertia <= 0.0);
        assert!(later.sleep_inertia.abs() < 0.1, "inertia {}", later.sleep_inertia);

        assert!(
            samples
                .iter()
                .filter(|s| s.is_asleep)
                .all(|s| s.sleep_inertia.abs() < f64::EPSILON)
        );
    }

    #[test]
    fn invariants_hold_over_multi_day_schedule() {
        let params = SafteParams::default();
        let duties = [
            duty(at(2, 5, 0), at(2, 17, 0)),
            duty(at(3, 1, 0), at(3, 13, 0)),
            duty(at(4, 22, 0), at(5, 8, 0)),
        ];
        let samples = simulate(&duties, Some(0.0), &params, &AutoSleepConfig::default());

        assert!(!samples.is_empty());
        for s in &samples {
            assert!((0.0..=params.reservoir_capacity).contains(&s.reservoir_level));
            assert!((0.0..=100.0).contains(&s.effectiveness));
            assert!(s.sleep_inertia <= 0.0);
        }
    }

    #[test]
    fn circadian_phase_anchored_to_wall_clock() {
        let params = SafteParams::default();
        let duties = [duty(at(3, 8, 0), at(3, 16, 0))];
        let short = Simulator::new(&params).run(&duties, &[]);
        let long = Simulator::new(&params)
            .with_padding(
                Duration::days(1) + Duration::hours(7) + Duration::minutes(13),
                Duration::days(1),
            )
            .run(&duties, &[]);

        for ts in [at(2, 9, 0), at(2, 21, 17), at(3, 4, 0), at(3, 12, 45)] {
            let a = implied_circadian(&sample_at(&short, ts), &params);
            let b = implied_circadian(&sample_at(&long, ts), &params);
            let expected = model::circadian(model::clock_hour(ts), &params);
            assert!((a - b).abs() < 1e-9, "{ts}: {a} vs {b}");
            assert!((a - expected).abs() < 1e-9, "{ts}: {a} vs {expected}");
        }
    }

    #[test]
    fn initial_reservoir_override_is_clamped() {
        let params = SafteParams::default();
        let duties = [duty(at(2, 8, 0), at(2, 16, 0))];

        let high = Simulator::new(&params)
            .with_initial_reservoir(Some(10_000.0))
            .run(&duties, &[]);
        assert!((high[0].reservoir_level - (params.reservoir_capacity - 0.5)).abs() < 1e-9);

        let low = Simulator::new(&params)
            .with_initial_reservoir(Some(-50.0))
            .run(&duties, &[]);
        assert!(low[0].reservoir_level.abs() < 1e-9);

        let nan = Simulator::new(&params)
            .with_initial_reservoir(Some(f64::NAN))
            .run(&duties, &[]);
        assert!((nan[0].reservoir_level - 2591.5).abs() < 1e-9);
    }

    // ========== State Machine Tests ==========

    #[test]
    fn wake_snapshot_frozen_for_the_wake_bout() {
        let params = SafteParams::default();
        let mut state = SimulationState::new(2000.0);
        state.step(at(1, 23, 0), &[EventKind::SleepStart], &params);
        for minute in 1..60 {
            state.step(at(1, 23, 0) + Duration::minutes(minute), &[], &params);
        }
        state.step(at(2, 0, 0), &[EventKind::SleepEnd], &params);

        let Phase::Awake(captured) = state.phase else {
            panic!("expected awake phase");
        };
        for minute in 1..=30 {
            state.step(at(2, 0, 0) + Duration::minutes(minute), &[], &params);
        }
        let Phase::Awake(current) = state.phase else {
            panic!("expected awake phase");
        };

        assert!(captured.sleep_intensity > 0.0);
        assert!((current.sleep_intensity - captured.sleep_intensity).abs() < f64::EPSILON);
        assert_eq!(current.minutes_since_wake, 31);
    }

    #[test]
    fn redundant_wake_keeps_existing_snapshot() {
        let params = SafteParams::default();
        let mut state = SimulationState::new(2000.0);
        state.step(at(1, 23, 0), &[EventKind::SleepStart], &params);
        state.step(at(2, 6, 0), &[EventKind::SleepEnd], &params);
        let before = state.phase;

        state.apply(EventKind::SleepEnd, -1.0, &params);
        assert_eq!(state.phase, before);
    }

    #[test]
    fn duty_boundaries_do_not_change_phase() {
        let params = SafteParams::default();
        let mut state = SimulationState::new(2000.0);
        state.apply(EventKind::DutyStart, 0.0, &params);
        assert!(!state.is_asleep());
        state.apply(EventKind::SleepStart, 0.0, &params);
        state.apply(EventKind::DutyEnd, 0.0, &params);
        assert!(state.is_asleep());
    }
}
