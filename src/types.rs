//! Core domain types for slurmstat
//!
//! This module contains the fundamental types used throughout the library:
//! strongly-typed wrappers for usernames, partitions and QOS names, the
//! per-line `JobRecord`, and the `JobStatus` classifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Strongly-typed username wrapper
///
/// Ensures usernames are consistently handled throughout the application and
/// keeps per-user ledger keys from mixing with partition or QOS names.
///
/// # Examples
/// ```
/// use slurmstat::types::Username;
///
/// let user = Username::new("alice");
/// assert_eq!(user.as_str(), "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    /// Create a new Username from any string-like type
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Strongly-typed partition name wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Partition(String);

impl Partition {
    /// Create a new Partition
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strongly-typed QOS (quality of service) name wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QosName(String);

impl QosName {
    /// Create a new QosName
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QosName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classified job state
///
/// Every record lands in exactly one category. Raw states that match none of
/// the known forms go to `Unknown` so the classification can be audited; they
/// are tallied and surfaced as a warning, never silently dropped.
///
/// `CancelledAuto` (the bare `CANCELLED` state, scheduler policy) is kept
/// distinct from `CancelledByUser` (`CANCELLED by <uid>`, explicit
/// withdrawal); the two have different operational meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    Timeout,
    Failed,
    NodeFail,
    CancelledAuto,
    CancelledByUser,
    Running,
    Requeued,
    Pending,
    Unknown,
}

impl JobStatus {
    /// All categories, in summary-report order.
    pub const ALL: [JobStatus; 10] = [
        JobStatus::Completed,
        JobStatus::Timeout,
        JobStatus::Failed,
        JobStatus::NodeFail,
        JobStatus::CancelledAuto,
        JobStatus::CancelledByUser,
        JobStatus::Pending,
        JobStatus::Requeued,
        JobStatus::Running,
        JobStatus::Unknown,
    ];

    /// Map a raw sacct state string to exactly one category.
    ///
    /// # Examples
    /// ```
    /// use slurmstat::types::JobStatus;
    ///
    /// assert_eq!(JobStatus::classify("COMPLETED"), JobStatus::Completed);
    /// assert_eq!(JobStatus::classify("CANCELLED"), JobStatus::CancelledAuto);
    /// assert_eq!(JobStatus::classify("CANCELLED by 1000"), JobStatus::CancelledByUser);
    /// assert_eq!(JobStatus::classify("OUT_OF_MEMORY"), JobStatus::Unknown);
    /// ```
    pub fn classify(raw: &str) -> Self {
        match raw {
            "COMPLETED" => JobStatus::Completed,
            "TIMEOUT" => JobStatus::Timeout,
            "FAILED" => JobStatus::Failed,
            "NODE_FAIL" => JobStatus::NodeFail,
            "CANCELLED" => JobStatus::CancelledAuto,
            "RUNNING" => JobStatus::Running,
            "REQUEUED" => JobStatus::Requeued,
            "PENDING" => JobStatus::Pending,
            other if is_cancelled_by_user(other) => JobStatus::CancelledByUser,
            _ => JobStatus::Unknown,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Completed => "COMPLETED",
            JobStatus::Timeout => "TIMEOUT",
            JobStatus::Failed => "FAILED",
            JobStatus::NodeFail => "NODE_FAIL",
            JobStatus::CancelledAuto => "CANCELLED_AUTO",
            JobStatus::CancelledByUser => "CANCELLED_BY_USER",
            JobStatus::Running => "RUNNING",
            JobStatus::Requeued => "REQUEUED",
            JobStatus::Pending => "PENDING",
            JobStatus::Unknown => "UNKNOWN",
        };
        write!(f, "{name}")
    }
}

/// Matches `^CANCELLED by \d+$`.
fn is_cancelled_by_user(raw: &str) -> bool {
    raw.strip_prefix("CANCELLED by ")
        .is_some_and(|uid| !uid.is_empty() && uid.bytes().all(|b| b.is_ascii_digit()))
}

/// One accounting record, produced from a pipe-delimited sacct line
///
/// Records are transient: the accumulator consumes them immediately and only
/// the aggregated totals live for the rest of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Scheduler job id
    pub job_id: String,
    /// Submitting user
    pub user: Username,
    /// Partition the job ran in
    pub partition: Partition,
    /// QOS the job was submitted under
    pub qos: QosName,
    /// Allocated cpu count
    pub alloc_cpus: u64,
    /// Raw state string, classified lazily by the accumulator
    pub state: String,
    /// Exit code as reported by sacct (e.g. `0:0`)
    pub exit_code: String,
    /// Elapsed wall time, unparsed duration string
    pub elapsed: String,
    /// Requested time limit, unparsed duration string
    pub time_limit: String,
}

impl JobRecord {
    /// Number of pipe-delimited fields in a well-formed accounting line.
    pub const FIELD_COUNT: usize = 9;

    /// Split one accounting line into a record.
    ///
    /// Returns `None` for malformed lines (fewer than nine fields); fields
    /// past the ninth are ignored. An allocated-cpu field that does not parse
    /// as an integer is treated as 0 cpus, consistent with the duration
    /// parser's defined-zero fallback.
    ///
    /// # Examples
    /// ```
    /// use slurmstat::types::JobRecord;
    ///
    /// let record =
    ///     JobRecord::parse("123|alice|batch|normal|4|COMPLETED|0:0|00:10:00|01:00:00").unwrap();
    /// assert_eq!(record.alloc_cpus, 4);
    /// assert_eq!(record.state, "COMPLETED");
    ///
    /// assert!(JobRecord::parse("123|alice|batch").is_none());
    /// ```
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < Self::FIELD_COUNT {
            return None;
        }

        Some(Self {
            job_id: fields[0].to_string(),
            user: Username::new(fields[1]),
            partition: Partition::new(fields[2]),
            qos: QosName::new(fields[3]),
            alloc_cpus: fields[4].trim().parse().unwrap_or(0),
            state: fields[5].to_string(),
            exit_code: fields[6].to_string(),
            elapsed: fields[7].to_string(),
            time_limit: fields[8].to_string(),
        })
    }
}
