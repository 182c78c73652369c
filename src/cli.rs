//! CLI interface for slurmstat
//!
//! Defines the command-line surface using clap: a required reporting window,
//! optional user filters, and `report` / `histogram` subcommands. Omitting
//! the subcommand produces the full report.
//!
//! # Example
//!
//! ```bash
//! # Full report for January 2024
//! slurmstat --start 2024-01-01 --end 2024-01-31
//!
//! # Summary only, for two specific users
//! slurmstat --start 2024-01-01 --end 2024-01-31 -u alice -u bob report --mode summary
//!
//! # Accuracy histogram as JSON
//! slurmstat --start 2024-01-01 --end 2024-01-31 --json histogram --mode accuracy
//! ```

use crate::error::{Result, SlurmstatError};
use crate::sacct::DEFAULT_SACCT_PATH;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Report on job scheduler usage
#[derive(Parser, Debug, Clone)]
#[command(name = "slurmstat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// First day of the reporting window (YYYY-MM-DD)
    #[arg(long, value_parser = parse_report_date)]
    pub start: NaiveDate,

    /// Last day of the reporting window (YYYY-MM-DD), inclusive
    #[arg(long, value_parser = parse_report_date)]
    pub end: NaiveDate,

    /// Restrict the report to specific users (repeatable)
    #[arg(long, short = 'u')]
    pub user: Vec<String>,

    /// Path to the sacct binary
    #[arg(long, env = "SLURMSTAT_SACCT_PATH", default_value = DEFAULT_SACCT_PATH)]
    pub sacct_path: PathBuf,

    /// Cluster-wide cpu count, used for the capacity-percentage column
    #[arg(long, env = "SLURMSTAT_AVAIL_CPUS", default_value = "0")]
    pub avail_cpus: u64,

    /// Title line printed above the summary report
    #[arg(long, env = "SLURMSTAT_REPORT_TITLE", default_value = "Report")]
    pub report_title: String,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Only emit warnings and errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands
///
/// With no subcommand, the summary, per-user, and histogram reports are all
/// produced.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Summary and per-user consumption tables
    Report {
        /// Which report tables to show
        #[arg(long, value_enum, default_value = "all")]
        mode: ReportMode,
    },
    /// Elapsed-time, time-limit, and accuracy histogram tables
    Histogram {
        /// Which histogram tables to show
        #[arg(long, value_enum, default_value = "all")]
        mode: HistogramMode,
    },
}

/// Report table selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    All,
    Summary,
    User,
}

/// Histogram table selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramMode {
    All,
    None,
    Timelimit,
    Elapsed,
    Accuracy,
}

/// Parse and validate a YYYY-MM-DD report date.
pub fn parse_report_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        SlurmstatError::InvalidDate(format!(
            "'{raw}' is not a valid date string, format is YYYY-MM-DD"
        ))
    })
}

/// Cluster capacity over the reporting window, in cpu-hours.
///
/// The window is inclusive of both end dates, so a single-day report covers
/// 24 hours of the configured cpu count.
pub fn window_capacity_cpu_hours(
    avail_cpus: u64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<f64> {
    if end < start {
        return Err(SlurmstatError::InvalidArgument(format!(
            "--end ({end}) precedes --start ({start})"
        )));
    }
    let days = (end - start).num_days() + 1;
    Ok(avail_cpus as f64 * days as f64 * 24.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_date() {
        let date = parse_report_date("2024-01-15").expect("valid date");
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());

        assert!(parse_report_date("15/01/2024").is_err());
        assert!(parse_report_date("2024-13-01").is_err());
        assert!(parse_report_date("yesterday").is_err());
    }

    #[test]
    fn test_window_capacity() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();

        // 100 cpus for 31 days
        let capacity = window_capacity_cpu_hours(100, start, end).expect("valid window");
        assert_eq!(capacity, 100.0 * 31.0 * 24.0);

        // single-day window still counts a full day
        let capacity = window_capacity_cpu_hours(100, start, start).expect("valid window");
        assert_eq!(capacity, 100.0 * 24.0);

        assert!(window_capacity_cpu_hours(100, end, start).is_err());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_subcommand_defaults() {
        let cli = Cli::try_parse_from([
            "slurmstat",
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-31",
            "report",
        ])
        .expect("valid invocation");
        match cli.command {
            Some(Command::Report { mode }) => assert_eq!(mode, ReportMode::All),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
