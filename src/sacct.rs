//! sacct invocation and record capture
//!
//! The accounting command is invoked exactly once per run and its complete
//! output captured before any line is processed — an atomic, all-or-nothing
//! step. A non-zero exit aborts the whole report; no retries are performed
//! here (retry policy, if any, belongs to the caller).
//!
//! # Examples
//!
//! ```no_run
//! use slurmstat::sacct::SacctClient;
//! use chrono::NaiveDate;
//! use futures::StreamExt;
//!
//! # async fn example() -> slurmstat::Result<()> {
//! let client = SacctClient::new(
//!     "/usr/bin/sacct",
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
//! );
//!
//! let lines = client.load_records();
//! tokio::pin!(lines);
//! while let Some(line) = lines.next().await {
//!     println!("{}", line?);
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, SlurmstatError};
use chrono::NaiveDate;
use futures::stream::Stream;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

/// Field list requested from sacct; pipe-delimited, one job per line,
/// in the fixed 9-field order the accumulator expects.
const SACCT_FIELDS: &str = "jobid,user,partition,qos,alloccpus,state,exitcode,elapsed,time";

/// Default location of the sacct binary
pub const DEFAULT_SACCT_PATH: &str = "/usr/bin/sacct";

/// Client for the external accounting command
pub struct SacctClient {
    sacct_path: PathBuf,
    start: NaiveDate,
    end: NaiveDate,
    users: Vec<String>,
}

impl SacctClient {
    /// Create a client covering the inclusive `start..=end` date window.
    pub fn new(sacct_path: impl Into<PathBuf>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            sacct_path: sacct_path.into(),
            start,
            end,
            users: Vec::new(),
        }
    }

    /// Restrict the query to specific users (empty means all users).
    pub fn with_users(mut self, users: Vec<String>) -> Self {
        self.users = users;
        self
    }

    /// Argument vector passed to sacct.
    ///
    /// `--noheader -X -P` yields one parent record per job as a plain
    /// pipe-delimited line with no decoration.
    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-a", "-o", SACCT_FIELDS, "--noheader", "-X", "-P"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        if !self.users.is_empty() {
            args.push(format!("-u{}", self.users.join(",")));
        }
        args.push(format!("-S{}", self.start.format("%Y-%m-%d")));
        args.push(format!("-E{}", self.end.format("%Y-%m-%d")));

        args
    }

    /// The full command line, for logs and error reports.
    pub fn render_command(&self) -> String {
        let mut command = self.sacct_path.display().to_string();
        for arg in self.build_args() {
            command.push(' ');
            command.push_str(&arg);
        }
        command
    }

    /// Run sacct once and capture its complete output.
    ///
    /// # Errors
    ///
    /// Returns [`SlurmstatError::SacctFailed`] with the command line, exit
    /// code, and captured output when the command exits non-zero.
    pub async fn capture(&self) -> Result<String> {
        let args = self.build_args();
        info!(command = %self.render_command(), "invoking accounting command");

        let output = Command::new(&self.sacct_path).args(&args).output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(SlurmstatError::SacctFailed {
                command: self.render_command(),
                code: output.status.code().unwrap_or(-1),
                output: if stderr.trim().is_empty() {
                    stdout.into_owned()
                } else {
                    stderr.into_owned()
                },
            });
        }

        debug!(bytes = output.stdout.len(), "captured accounting output");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Stream the captured accounting lines, one job record per item.
    ///
    /// The command runs to completion before the first line is yielded, so
    /// a failed invocation produces a single `Err` and nothing else.
    pub fn load_records(&self) -> impl Stream<Item = Result<String>> + '_ {
        async_stream::stream! {
            let captured = match self.capture().await {
                Ok(output) => output,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            for line in captured.lines() {
                if !line.is_empty() {
                    yield Ok(line.to_string());
                }
            }
        }
    }
}
