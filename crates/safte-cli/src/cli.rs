//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use safte_core::FatigueRisk;

/// Crew fatigue analysis for airline duty schedules.
///
/// Predicts sleep around each duty, simulates cognitive effectiveness minute
/// by minute with the SAFTE model and scores the resulting fatigue risk.
#[derive(Debug, Parser)]
#[command(name = "safte", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print a fatigue report for the trips in a file.
    Analyze {
        /// Parsed trip JSON (one trip object or an array of them).
        trip: PathBuf,

        /// Output as JSON.
        #[arg(long)]
        json: bool,

        /// Reservoir level at the start of the simulation (0-2880).
        #[arg(long)]
        initial_reservoir: Option<f64>,
    },

    /// Emit the minute-by-minute simulation as JSON Lines.
    Simulate {
        /// Parsed trip JSON (one trip object or an array of them).
        trip: PathBuf,

        /// Only emit samples that fall inside a duty period.
        #[arg(long)]
        duty_only: bool,

        /// Reservoir level at the start of the simulation (0-2880).
        #[arg(long)]
        initial_reservoir: Option<f64>,
    },

    /// Rank trips by fatigue score, highest first.
    Rank {
        /// Parsed trip JSON files.
        #[arg(required = true)]
        trips: Vec<PathBuf>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,

        /// Only list trips at or above this risk (low, moderate, high, severe).
        #[arg(long)]
        min_risk: Option<FatigueRisk>,
    },
}
