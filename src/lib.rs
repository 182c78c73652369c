//! slurmstat - Usage reports from SLURM accounting records
//!
//! This library provides functionality to:
//! - Invoke sacct and capture its pipe-delimited accounting output
//! - Parse duration strings and classify job states
//! - Aggregate per-user and cluster-wide consumption statistics
//! - Bucket completed-job samples into duration and accuracy histograms
//! - Generate reports in table and JSON formats
//!
//! # Examples
//!
//! ```no_run
//! use slurmstat::{
//!     aggregation::Aggregator,
//!     output::{ReportContext, get_formatter},
//!     sacct::SacctClient,
//! };
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> slurmstat::Result<()> {
//!     let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//!     let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
//!
//!     let client = SacctClient::new("/usr/bin/sacct", start, end);
//!     let acc = Aggregator::new().aggregate(client.load_records()).await?;
//!
//!     let ctx = ReportContext {
//!         title: "Cluster report".to_string(),
//!         start,
//!         end,
//!         total_avail_cpu_hours: 74_400.0,
//!     };
//!     let formatter = get_formatter(false);
//!     println!("{}", formatter.format_summary(&acc, &ctx));
//!     Ok(())
//! }
//! ```

pub mod aggregation;
pub mod cli;
pub mod duration;
pub mod error;
pub mod histogram;
pub mod output;
pub mod sacct;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SlurmstatError};
pub use types::{JobRecord, JobStatus, Partition, QosName, Username};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
