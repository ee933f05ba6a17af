//! Analyze command for per-trip fatigue reports.
//!
//! This module implements `safte analyze` with human-readable and JSON output.

use std::fmt::Write;
use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use safte_core::{AnalysisConfig, RiskThresholds, TripFatigueAnalysis, analyze_trips};
use serde::Serialize;

use super::{format_duration, format_timestamp};
use crate::trips::{load_trips, trip_label};

// ========== Report Formatting ==========

/// Width of the label column in the summary section.
const LABEL_WIDTH: usize = 22;

/// Formats the human-readable report for one trip.
pub fn format_report(
    analysis: &TripFatigueAnalysis,
    label: &str,
    thresholds: &RiskThresholds,
) -> String {
    let mut output = String::new();

    // Header
    writeln!(output, "FATIGUE REPORT: {label}").unwrap();

    let Some(metrics) = analysis.metrics.as_ref() else {
        let reason = analysis
            .error
            .as_deref()
            .unwrap_or("No simulation samples produced");
        writeln!(output).unwrap();
        writeln!(output, "{reason}.").unwrap();
        return output;
    };

    // SUMMARY section
    let risk = analysis.risk.map_or("-", |r| r.as_str());
    writeln!(output).unwrap();
    writeln!(output, "SUMMARY").unwrap();
    writeln!(output, "───────").unwrap();
    writeln!(output, "{:<LABEL_WIDTH$}{risk}", "Risk:").unwrap();
    writeln!(
        output,
        "{:<LABEL_WIDTH$}{:.1}",
        "Fatigue score:", metrics.overall_fatigue_score
    )
    .unwrap();
    writeln!(
        output,
        "{:<LABEL_WIDTH$}{:.1}% at {}",
        "Lowest effectiveness:",
        metrics.lowest_effectiveness,
        format_timestamp(metrics.lowest_effectiveness_time)
    )
    .unwrap();
    writeln!(
        output,
        "{:<LABEL_WIDTH$}{:.1}%",
        "Average on duty:", metrics.average_effectiveness_on_duty
    )
    .unwrap();
    writeln!(
        output,
        "{:<LABEL_WIDTH$}{}",
        format!("Below {:.0}%:", thresholds.danger),
        format_duration(i64::from(metrics.time_below_danger_min))
    )
    .unwrap();
    writeln!(
        output,
        "{:<LABEL_WIDTH$}{}",
        format!("Below {:.0}%:", thresholds.warning),
        format_duration(i64::from(metrics.time_below_warning_min))
    )
    .unwrap();

    // DUTY PERIODS section
    writeln!(output).unwrap();
    writeln!(output, "DUTY PERIODS").unwrap();
    writeln!(output, "────────────").unwrap();
    for duty in &analysis.duty_breakdown {
        writeln!(
            output,
            "  {:>2}  {} - {}  {:<8}  min {:>5.1}%  avg {:>5.1}%",
            duty.index + 1,
            format_timestamp(duty.start),
            format_timestamp(duty.end),
            duty.risk.as_str(),
            duty.lowest_effectiveness,
            duty.average_effectiveness
        )
        .unwrap();
    }

    // SLEEP OPPORTUNITIES section
    writeln!(output).unwrap();
    writeln!(output, "SLEEP OPPORTUNITIES").unwrap();
    writeln!(output, "───────────────────").unwrap();
    if analysis.sleep_periods.is_empty() {
        writeln!(output, "  (none predicted)").unwrap();
    }
    for sleep in &analysis.sleep_periods {
        writeln!(
            output,
            "  {sleep}  ({})",
            format_duration(sleep.duration().num_minutes())
        )
        .unwrap();
    }

    output
}

// ========== JSON Output ==========

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub generated_at: String,
    pub trips: Vec<JsonTrip<'a>>,
}

#[derive(Debug, Serialize)]
pub struct JsonTrip<'a> {
    pub label: String,
    #[serde(flatten)]
    pub analysis: &'a TripFatigueAnalysis,
}

/// Formats analyses as JSON.
pub fn format_report_json(
    analyses: &[(String, TripFatigueAnalysis)],
    generated_at: chrono::DateTime<Utc>,
) -> Result<String> {
    let report = JsonReport {
        generated_at: generated_at.to_rfc3339(),
        trips: analyses
            .iter()
            .map(|(label, analysis)| JsonTrip {
                label: label.clone(),
                analysis,
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

// ========== Public Interface ==========

/// Runs the analyze command.
pub fn run(path: &Path, config: &AnalysisConfig, json: bool) -> Result<()> {
    let trips = load_trips(path)?;
    let count = trips.len();
    let analyses: Vec<(String, TripFatigueAnalysis)> = analyze_trips(&trips, config)
        .into_iter()
        .enumerate()
        .map(|(index, analysis)| {
            let label = trip_label(analysis.trip_id.as_deref(), path, index, count);
            (label, analysis)
        })
        .collect();

    if json {
        let output = format_report_json(&analyses, Utc::now())?;
        println!("{output}");
        return Ok(());
    }

    if analyses.is_empty() {
        println!("No trips found in {}.", path.display());
        return Ok(());
    }

    for (index, (label, analysis)) in analyses.iter().enumerate() {
        if index > 0 {
            println!();
        }
        print!("{}", format_report(analysis, label, &config.thresholds));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, TimeZone};
    use insta::assert_snapshot;
    use safte_core::{DutyFatigue, DutyPeriod, FatigueMetrics, FatigueRisk, SleepPeriod};

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn make_duty_fatigue(index: usize, day: u32, lowest: f64, average: f64) -> DutyFatigue {
        DutyFatigue {
            index,
            start: at(day, 6, 0),
            end: at(day, 14, 0),
            lowest_effectiveness: lowest,
            lowest_effectiveness_time: at(day, 7, 13),
            average_effectiveness: average,
            time_below_danger_min: 0,
            time_below_warning_min: 0,
            risk: FatigueRisk::classify(lowest, &RiskThresholds::default()),
        }
    }

    fn make_analysis() -> TripFatigueAnalysis {
        TripFatigueAnalysis {
            trip_id: Some("T100".to_string()),
            duty_periods: vec![
                DutyPeriod::new(at(1, 6, 0), at(1, 14, 0)).unwrap(),
                DutyPeriod::new(at(2, 6, 0), at(2, 14, 0)).unwrap(),
            ],
            sleep_periods: vec![
                SleepPeriod::new(
                    NaiveDate::from_ymd_opt(2025, 2, 28)
                        .unwrap()
                        .and_hms_opt(23, 0, 0)
                        .unwrap(),
                    at(1, 4, 0),
                )
                .unwrap(),
            ],
            samples: vec![],
            metrics: Some(FatigueMetrics {
                lowest_effectiveness: 66.04,
                lowest_effectiveness_time: at(2, 7, 13),
                time_below_danger_min: 83,
                time_below_warning_min: 250,
                average_effectiveness_on_duty: 78.44,
                overall_fatigue_score: 62.8,
            }),
            risk: Some(FatigueRisk::High),
            duty_breakdown: vec![
                make_duty_fatigue(0, 1, 84.14, 90.2),
                make_duty_fatigue(1, 2, 66.04, 71.66),
            ],
            error: None,
        }
    }

    // ========== Report Formatting Tests ==========

    #[test]
    fn test_report_full() {
        let output = format_report(&make_analysis(), "T100", &RiskThresholds::default());
        assert_snapshot!(output, @r"
        FATIGUE REPORT: T100

        SUMMARY
        ───────
        Risk:                 high
        Fatigue score:        62.8
        Lowest effectiveness: 66.0% at 2025-03-02 07:13
        Average on duty:      78.4%
        Below 70%:            1h 23m
        Below 82%:            4h 10m

        DUTY PERIODS
        ────────────
           1  2025-03-01 06:00 - 2025-03-01 14:00  low       min  84.1%  avg  90.2%
           2  2025-03-02 06:00 - 2025-03-02 14:00  high      min  66.0%  avg  71.7%

        SLEEP OPPORTUNITIES
        ───────────────────
          2025-02-28 23:00 - 2025-03-01 04:00  (5h 0m)
        ");
    }

    #[test]
    fn test_report_without_duty_periods() {
        let analysis = TripFatigueAnalysis {
            trip_id: Some("T1".to_string()),
            error: Some(safte_core::NO_DUTY_PERIODS_ERROR.to_string()),
            ..TripFatigueAnalysis::default()
        };
        let output = format_report(&analysis, "T1", &RiskThresholds::default());
        assert_snapshot!(output, @r"
        FATIGUE REPORT: T1

        No valid duty periods found in trip.
        ");
    }

    #[test]
    fn test_report_uses_configured_thresholds() {
        let thresholds = RiskThresholds {
            danger: 65.0,
            warning: 80.0,
            ..RiskThresholds::default()
        };
        let output = format_report(&make_analysis(), "T100", &thresholds);
        assert!(output.contains("Below 65%:"));
        assert!(output.contains("Below 80%:"));
    }

    #[test]
    fn test_report_without_sleep() {
        let analysis = TripFatigueAnalysis {
            sleep_periods: vec![],
            ..make_analysis()
        };
        let output = format_report(&analysis, "T100", &RiskThresholds::default());
        assert!(output.ends_with("  (none predicted)\n"));
    }

    // ========== JSON Output Tests ==========

    #[test]
    fn test_report_json_output() {
        let generated_at = Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap();
        let output =
            format_report_json(&[("T100".to_string(), make_analysis())], generated_at).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["generated_at"], "2025-03-05T12:00:00+00:00");
        let trip = &value["trips"][0];
        assert_eq!(trip["label"], "T100");
        assert_eq!(trip["risk"], "high");
        assert_eq!(trip["duty_periods"][0]["start"], "2025-03-01T06:00:00");
        assert_eq!(trip["metrics"]["time_below_danger_min"], 83);
        assert_eq!(trip["duty_breakdown"].as_array().unwrap().len(), 2);
        assert!(trip.get("samples").is_none());
        assert!(trip.get("error").is_none());
    }
}
