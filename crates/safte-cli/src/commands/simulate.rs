//! Simulate command: minute-by-minute samples as JSON Lines.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use safte_core::{AnalysisConfig, DutyPeriod, SimulationSample, build_duty_periods, simulate};
use serde::Serialize;

use crate::trips::load_trips;

/// One output line.
#[derive(Debug, Serialize)]
pub struct SampleLine<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<&'a str>,
    #[serde(flatten)]
    pub sample: &'a SimulationSample,
}

/// Keeps samples inside any duty period when `duty_only` is set.
pub fn select_samples<'a>(
    samples: &'a [SimulationSample],
    duty_periods: &'a [DutyPeriod],
    duty_only: bool,
) -> impl Iterator<Item = &'a SimulationSample> + 'a {
    samples
        .iter()
        .filter(move |s| !duty_only || duty_periods.iter().any(|d| d.contains(s.timestamp)))
}

/// Writes samples as JSON Lines.
pub fn write_samples<'a, W, I>(out: &mut W, trip_id: Option<&str>, samples: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a SimulationSample>,
{
    let mut written = 0;
    for sample in samples {
        let line = SampleLine { trip_id, sample };
        serde_json::to_writer(&mut *out, &line)?;
        out.write_all(b"\n")?;
        written += 1;
    }
    Ok(written)
}

/// Runs the simulate command.
pub fn run(path: &Path, config: &AnalysisConfig, duty_only: bool) -> Result<()> {
    let trips = load_trips(path)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for trip in &trips {
        let duty_periods = build_duty_periods(trip);
        if duty_periods.is_empty() {
            tracing::warn!(
                trip_id = ?trip.trip_id,
                "{}",
                safte_core::NO_DUTY_PERIODS_ERROR
            );
            continue;
        }

        let samples = simulate(
            &duty_periods,
            config.initial_reservoir,
            &config.model,
            &config.sleep,
        );
        let written = write_samples(
            &mut out,
            trip.trip_id.as_deref(),
            select_samples(&samples, &duty_periods, duty_only),
        )?;
        tracing::debug!(trip_id = ?trip.trip_id, written, "wrote samples");
    }

    out.flush().context("failed to flush output")?;
    Ok(())
}
