//! Rank command for comparing trips by fatigue score.
//!
//! This module implements `safte rank`: every trip in every file is analysed
//! in parallel and listed by descending overall fatigue score.

use std::fmt::Write;
use std::path::PathBuf;

use anyhow::Result;
use safte_core::{AnalysisConfig, FatigueRisk, RiskThresholds, TripFatigueAnalysis, analyze_trips};
use serde::Serialize;

use super::format_duration;
use crate::trips::{load_trips, trip_label};

/// One ranked trip.
#[derive(Debug, Clone)]
pub struct RankedTrip {
    pub label: String,
    pub source: PathBuf,
    pub analysis: TripFatigueAnalysis,
}

impl RankedTrip {
    fn is_flagged(&self) -> bool {
        self.analysis.risk >= Some(FatigueRisk::High)
    }
}

// ========== Ranking ==========

/// Orders trips by descending score, dropping those below `min_risk`.
///
/// Trips that could not be analysed sort last and are dropped whenever a
/// minimum risk is requested.
pub fn rank(mut trips: Vec<RankedTrip>, min_risk: Option<FatigueRisk>) -> Vec<RankedTrip> {
    if let Some(min) = min_risk {
        trips.retain(|t| t.analysis.risk.is_some_and(|r| r >= min));
    }
    // Stable sort keeps file order for ties.
    trips.sort_by(|a, b| {
        let key = |t: &RankedTrip| (t.analysis.metrics.is_some(), t.analysis.score());
        let (a_ok, a_score) = key(a);
        let (b_ok, b_score) = key(b);
        b_ok.cmp(&a_ok).then(b_score.total_cmp(&a_score))
    });
    trips
}

// ========== Report Formatting ==========

/// Formats the human-readable ranking table.
pub fn format_ranking(trips: &[RankedTrip], thresholds: &RiskThresholds) -> String {
    let mut output = String::new();

    let noun = if trips.len() == 1 { "trip" } else { "trips" };
    writeln!(output, "TRIP RANKING ({} {noun})", trips.len()).unwrap();

    if trips.is_empty() {
        writeln!(output).unwrap();
        writeln!(output, "No trips matched.").unwrap();
        return output;
    }

    let below = format!("BELOW {:.0}%", thresholds.danger);
    writeln!(output).unwrap();
    writeln!(
        output,
        "  {:>3}  {:<16}  {:>5}  {:<8}  {:>6}  {below:>9}",
        "#", "TRIP", "SCORE", "RISK", "LOWEST"
    )
    .unwrap();

    for (position, trip) in trips.iter().enumerate() {
        let analysis = &trip.analysis;
        let Some(metrics) = analysis.metrics.as_ref() else {
            let reason = analysis.error.as_deref().unwrap_or("not analysed");
            writeln!(
                output,
                "  {:>3}  {:<16}  {reason}",
                position + 1,
                trip.label
            )
            .unwrap();
            continue;
        };
        let risk = analysis.risk.map_or("-", |r| r.as_str());
        let flag = if trip.is_flagged() { "  !" } else { "" };
        writeln!(
            output,
            "  {:>3}  {:<16}  {:>5.1}  {risk:<8}  {:>5.1}%  {:>9}{flag}",
            position + 1,
            trip.label,
            analysis.score(),
            metrics.lowest_effectiveness,
            format_duration(i64::from(metrics.time_below_danger_min))
        )
        .unwrap();
    }

    let flagged = trips.iter().filter(|t| t.is_flagged()).count();
    if flagged > 0 {
        writeln!(output).unwrap();
        writeln!(
            output,
            "  {flagged} high-risk trip(s) marked with '!'. Run 'safte analyze <file>' for details."
        )
        .unwrap();
    }

    output
}

// ========== JSON Output ==========

#[derive(Debug, Serialize)]
pub struct JsonRanking {
    pub trips: Vec<JsonRankEntry>,
}

#[derive(Debug, Serialize)]
pub struct JsonRankEntry {
    pub rank: usize,
    pub label: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<FatigueRisk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lowest_effectiveness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_below_danger_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Formats the ranking as JSON.
pub fn format_ranking_json(trips: &[RankedTrip]) -> Result<String> {
    let ranking = JsonRanking {
        trips: trips
            .iter()
            .enumerate()
            .map(|(position, trip)| {
                let metrics = trip.analysis.metrics.as_ref();
                JsonRankEntry {
                    rank: position + 1,
                    label: trip.label.clone(),
                    source: trip.source.display().to_string(),
                    trip_id: trip.analysis.trip_id.clone(),
                    score: trip.analysis.score(),
                    risk: trip.analysis.risk,
                    lowest_effectiveness: metrics.map(|m| m.lowest_effectiveness),
                    time_below_danger_min: metrics.map(|m| m.time_below_danger_min),
                    error: trip.analysis.error.clone(),
                }
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&ranking)?)
}

// ========== Public Interface ==========

/// Runs the rank command.
pub fn run(
    paths: &[PathBuf],
    config: &AnalysisConfig,
    json: bool,
    min_risk: Option<FatigueRisk>,
) -> Result<()> {
    let mut trips = Vec::new();
    let mut origins: Vec<(PathBuf, String)> = Vec::new();
    for path in paths {
        let loaded = load_trips(path)?;
        let count = loaded.len();
        for (index, trip) in loaded.into_iter().enumerate() {
            origins.push((
                path.clone(),
                trip_label(trip.trip_id.as_deref(), path, index, count),
            ));
            trips.push(trip);
        }
    }

    tracing::debug!(trips = trips.len(), files = paths.len(), "ranking trips");
    let ranked: Vec<RankedTrip> = analyze_trips(&trips, config)
        .into_iter()
        .zip(origins)
        .map(|(analysis, (source, label))| RankedTrip {
            label,
            source,
            analysis,
        })
        .collect();
    let ranked = rank(ranked, min_risk);

    if json {
        println!("{}", format_ranking_json(&ranked)?);
    } else {
        print!("{}", format_ranking(&ranked, &config.thresholds));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use insta::assert_snapshot;
    use safte_core::FatigueMetrics;

    fn ranked(label: &str, score: Option<f64>, risk: Option<FatigueRisk>) -> RankedTrip {
        let time = NaiveDate::from_ymd_opt(2025, 3, 2)
            .unwrap()
            .and_hms_opt(4, 10, 0)
            .unwrap();
        RankedTrip {
            label: label.to_string(),
            source: PathBuf::from("trips.json"),
            analysis: TripFatigueAnalysis {
                trip_id: Some(label.to_string()),
                metrics: score.map(|s| FatigueMetrics {
                    lowest_effectiveness: 100.0 - s / 2.0,
                    lowest_effectiveness_time: time,
                    time_below_danger_min: if s >= 60.0 { 95 } else { 0 },
                    time_below_warning_min: 300,
                    average_effectiveness_on_duty: 85.0,
                    overall_fatigue_score: s,
                }),
                risk,
                error: score
                    .is_none()
                    .then(|| safte_core::NO_DUTY_PERIODS_ERROR.to_string()),
                ..TripFatigueAnalysis::default()
            },
        }
    }

    fn sample_trips() -> Vec<RankedTrip> {
        vec![
            ranked("T200", Some(40.0), Some(FatigueRisk::Moderate)),
            ranked("T300", None, None),
            ranked("T100", Some(83.2), Some(FatigueRisk::Severe)),
            ranked("T400", Some(20.0), Some(FatigueRisk::Low)),
        ]
    }

    // ========== Ranking Tests ==========

    #[test]
    fn test_rank_orders_by_descending_score() {
        let labels: Vec<_> = rank(sample_trips(), None)
            .into_iter()
            .map(|t| t.label)
            .collect();
        assert_eq!(labels, vec!["T100", "T200", "T400", "T300"]);
    }

    #[test]
    fn test_rank_filters_by_min_risk() {
        let labels: Vec<_> = rank(sample_trips(), Some(FatigueRisk::Moderate))
            .into_iter()
            .map(|t| t.label)
            .collect();
        assert_eq!(labels, vec!["T100", "T200"]);
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let trips = vec![
            ranked("A", Some(40.0), Some(FatigueRisk::Moderate)),
            ranked("B", Some(40.0), Some(FatigueRisk::Moderate)),
        ];
        let labels: Vec<_> = rank(trips, None).into_iter().map(|t| t.label).collect();
        assert_eq!(labels, vec!["A", "B"]);
    }

    // ========== Report Formatting Tests ==========

    #[test]
    fn test_ranking_table() {
        let output = format_ranking(&rank(sample_trips(), None), &RiskThresholds::default());
        assert_snapshot!(output, @r"
        TRIP RANKING (4 trips)

            #  TRIP              SCORE  RISK      LOWEST  BELOW 70%
            1  T100               83.2  severe     58.4%     1h 35m  !
            2  T200               40.0  moderate   80.0%         0m
            3  T400               20.0  low        90.0%         0m
            4  T300              No valid duty periods found in trip

          1 high-risk trip(s) marked with '!'. Run 'safte analyze <file>' for details.
        ");
    }

    #[test]
    fn test_ranking_empty() {
        let output = format_ranking(&[], &RiskThresholds::default());
        assert_snapshot!(output, @r"
        TRIP RANKING (0 trips)

        No trips matched.
        ");
    }

    // ========== JSON Output Tests ==========

    #[test]
    fn test_ranking_json() {
        let output = format_ranking_json(&rank(sample_trips(), None)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        let trips = value["trips"].as_array().unwrap();

        assert_eq!(trips.len(), 4);
        assert_eq!(trips[0]["rank"], 1);
        assert_eq!(trips[0]["label"], "T100");
        assert_eq!(trips[0]["risk"], "severe");
        assert_eq!(trips[0]["time_below_danger_min"], 95);
        assert_eq!(trips[3]["error"], safte_core::NO_DUTY_PERIODS_ERROR);
        assert!(trips[3].get("risk").is_none());
    }
}
