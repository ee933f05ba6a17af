//! Duty schedule adapter.
//!
//! Turns the per-duty-day text handed over by the trip parser into absolute
//! local [`DutyPeriod`]s.
//!
//! # Token format
//!
//! Briefing and debriefing times arrive as `"(LL)ZZ:MM"`: the local hour in
//! parentheses followed by the Zulu time. Local minutes are taken from the
//! Zulu part, which assumes whole-hour timezone offsets.
//!
//! Layovers arrive as free text `"{hours}h{minutes}[ suffix]"`, e.g.
//! `"50h39 HTL"`, and are the only reliable way to place a duty day after a
//! multi-day rest.

use std::sync::LazyLock;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::DutyPeriod;

/// Pre-compiled regex for `"(LL)ZZ:MM"` time tokens.
static TIME_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\((\d{1,2})\)\s*(\d{1,2}):(\d{2})\s*$").unwrap());

/// Pre-compiled regex for `"{hours}h{minutes}"` layover text.
static LAYOVER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(\d{1,3})\s*h\s*(\d{1,2})?(?:\D|$)").unwrap());

/// Minimum rest assumed when the layover text cannot be used.
const FALLBACK_MIN_REST_HOURS: i64 = 2;

/// Errors from schedule text parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The time token does not match `"(LL)ZZ:MM"`.
    #[error("malformed time token: {0:?}")]
    MalformedTime(String),

    /// An hour or minute in the token is out of range.
    #[error("time out of range in token: {0:?}")]
    TimeOutOfRange(String),

    /// The layover text does not start with `"{hours}h"`.
    #[error("malformed layover: {0:?}")]
    MalformedLayover(String),
}

/// One duty day as extracted from the trip document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyDay {
    /// Report time token, e.g. `"(06)11:30"`.
    #[serde(default)]
    pub briefing: String,

    /// Release time token.
    #[serde(default)]
    pub debriefing: String,

    /// Rest following this duty day, e.g. `"14h20 HTL"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layover: Option<String>,
}

/// A trip as produced by the upstream document parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTrip {
    /// Trip identifier, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,

    /// Calendar date of the first duty day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// Duty days in trip order.
    #[serde(default)]
    pub duty_days: Vec<DutyDay>,
}

/// Parse a `"(LL)ZZ:MM"` token into local wall-clock time.
pub fn parse_time_token(token: &str) -> Result<NaiveTime, TokenError> {
    let Some(caps) = TIME_TOKEN_RE.captures(token) else {
        return Err(TokenError::MalformedTime(token.to_string()));
    };

    let out_of_range = || TokenError::TimeOutOfRange(token.to_string());
    let local_hour: u32 = caps[1].parse().map_err(|_| out_of_range())?;
    let zulu_hour: u32 = caps[2].parse().map_err(|_| out_of_range())?;
    let minute: u32 = caps[3].parse().map_err(|_| out_of_range())?;

    if zulu_hour > 23 {
        return Err(out_of_range());
    }
    NaiveTime::from_hms_opt(local_hour, minute, 0).ok_or_else(out_of_range)
}

/// Parse a `"{hours}h{minutes}[ suffix]"` layover into a duration.
pub fn parse_layover(text: &str) -> Result<Duration, TokenError> {
    let malformed = || TokenError::MalformedLayover(text.to_string());
    let caps = LAYOVER_RE.captures(text).ok_or_else(malformed)?;

    let hours: i64 = caps[1].parse().map_err(|_| malformed())?;
    let minutes: i64 = match caps.get(2) {
        Some(m) => m.as_str().parse().map_err(|_| malformed())?,
        None => 0,
    };
    if minutes >= 60 {
        return Err(malformed());
    }
    Ok(Duration::hours(hours) + Duration::minutes(minutes))
}

/// Build duty periods for a trip.
///
/// Falls back to today's local date when the trip carries no start date.
pub fn build_duty_periods(trip: &ParsedTrip) -> Vec<DutyPeriod> {
    let reference_date = trip.start_date.unwrap_or_else(|| {
        let today = Local::now().date_naive();
        tracing::debug!(trip_id = ?trip.trip_id, %today, "trip has no start date, using today");
        today
    });
    resolve_duty_periods(&trip.duty_days, reference_date)
}

/// End of the last resolved duty and the rest text that followed it.
struct Anchor<'a> {
    end: NaiveDateTime,
    layover: Option<&'a str>,
}

/// Resolve duty days into absolute duty periods.
///
/// Days with an unparsable briefing or debriefing token are skipped. A skipped
/// day also invalidates the layover of the day before it, since that rest no
/// longer leads into the next resolved duty.
pub fn resolve_duty_periods(days: &[DutyDay], reference_date: NaiveDate) -> Vec<DutyPeriod> {
    let mut periods = Vec::with_capacity(days.len());
    let mut anchor: Option<Anchor<'_>> = None;

    for (index, day) in days.iter().enumerate() {
        let times = parse_time_token(&day.briefing)
            .and_then(|start| parse_time_token(&day.debriefing).map(|end| (start, end)));
        let (start_time, end_time) = match times {
            Ok(times) => times,
            Err(err) => {
                tracing::debug!(index, %err, "skipping duty day");
                if let Some(anchor) = anchor.as_mut() {
                    anchor.layover = None;
                }
                continue;
            }
        };

        let start = anchor.as_ref().map_or_else(
            || reference_date.and_time(start_time),
            |anchor| resolve_start(anchor, start_time, index),
        );
        let mut end = start.date().and_time(end_time);
        if end <= start {
            end += Duration::days(1);
        }

        let Ok(period) = DutyPeriod::new(start, end) else {
            continue;
        };
        periods.push(period);
        anchor = Some(Anchor {
            end,
            layover: day.layover.as_deref(),
        });
    }

    periods
}

/// Place a duty start after the previous duty.
fn resolve_start(anchor: &Anchor<'_>, start_time: NaiveTime, index: usize) -> NaiveDateTime {
    let layover = anchor.layover.map(parse_layover);

    if let Some(Ok(rest)) = &layover {
        let expected = anchor.end + *rest;
        let candidate = expected.date().and_time(start_time);
        return if candidate < expected {
            candidate + Duration::days(1)
        } else {
            candidate
        };
    }

    match layover {
        Some(Err(err)) => tracing::warn!(index, %err, "falling back to day advancement"),
        _ => tracing::warn!(index, "no layover before duty day, falling back to day advancement"),
    }

    let earliest = anchor.end + Duration::hours(FALLBACK_MIN_REST_HOURS);
    let mut candidate = anchor.end.date().and_time(start_time);
    while candidate <= earliest {
        candidate += Duration::days(1);
    }
    candidate
}
