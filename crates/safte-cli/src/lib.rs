//! SAFTE fatigue CLI library.
//!
//! This crate provides the CLI interface for the fatigue engine.

mod cli;
pub mod commands;
mod config;
pub mod trips;

pub use cli::{Cli, Commands};
pub use config::Config;
