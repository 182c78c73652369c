//! Aggregation engine for accounting records
//!
//! This module folds raw accounting lines into per-run totals: global status
//! counters, compute-hour accounting, per-user ledgers, and the
//! (elapsed, limit, accuracy) sample set retained for completed jobs.
//!
//! The fold is associative and commutative in its running totals: two
//! `UsageAccumulator`s built over disjoint record subsets can be combined
//! with [`UsageAccumulator::merge`] without changing any observable total,
//! which keeps a parallel map-reduce implementation on the table. Sample
//! order is not significant for histogramming.
//!
//! # Examples
//!
//! ```
//! use slurmstat::aggregation::UsageAccumulator;
//!
//! let mut acc = UsageAccumulator::new();
//! acc.ingest_line("123|alice|batch|normal|4|COMPLETED|0:0|00:10:00|01:00:00");
//!
//! assert_eq!(acc.total_entries(), 1);
//! assert_eq!(acc.total_completed(), 1);
//! assert!((acc.total_compute_hours() - 4.0 * 600.0 / 3600.0).abs() < 1e-9);
//! ```

use crate::duration::parse_duration;
use crate::error::Result;
use crate::types::{JobRecord, JobStatus, Partition, QosName, Username};
use futures::stream::{Stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Job count and accumulated cpu-hours for one partition or QOS bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BucketTotals {
    /// Number of jobs recorded in this bucket
    pub jobs: u64,
    /// Cpu-hours accumulated in this bucket
    pub cpu_hours: f64,
}

impl BucketTotals {
    fn add(&mut self, cpu_hours: f64) {
        self.jobs += 1;
        self.cpu_hours += cpu_hours;
    }

    fn merge(&mut self, other: BucketTotals) {
        self.jobs += other.jobs;
        self.cpu_hours += other.cpu_hours;
    }
}

/// Per-user running totals, partitioned by partition and by QOS
///
/// Every record carries both a partition and a QOS, so the two bucket maps
/// always agree on the user's total job count and cpu-hours. Buckets are
/// created lazily on first use and only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserRecord {
    qos_jobs: BTreeMap<QosName, BucketTotals>,
    partition_jobs: BTreeMap<Partition, BucketTotals>,
}

impl UserRecord {
    /// Record one job in both the named partition bucket and QOS bucket.
    pub fn add(&mut self, partition: &Partition, qos: &QosName, cpu_hours: f64) {
        self.qos_jobs.entry(qos.clone()).or_default().add(cpu_hours);
        self.partition_jobs
            .entry(partition.clone())
            .or_default()
            .add(cpu_hours);
    }

    /// Total jobs recorded for this user, summed over the partition buckets.
    pub fn total_jobs(&self) -> u64 {
        self.partition_jobs.values().map(|bucket| bucket.jobs).sum()
    }

    /// Total cpu-hours recorded for this user, summed over the partition buckets.
    pub fn total_cpu_hours(&self) -> f64 {
        self.partition_jobs
            .values()
            .map(|bucket| bucket.cpu_hours)
            .sum()
    }

    /// Per-QOS buckets
    pub fn qos_buckets(&self) -> &BTreeMap<QosName, BucketTotals> {
        &self.qos_jobs
    }

    /// Per-partition buckets
    pub fn partition_buckets(&self) -> &BTreeMap<Partition, BucketTotals> {
        &self.partition_jobs
    }

    fn merge(&mut self, other: UserRecord) {
        for (qos, bucket) in other.qos_jobs {
            self.qos_jobs.entry(qos).or_default().merge(bucket);
        }
        for (partition, bucket) in other.partition_jobs {
            self.partition_jobs
                .entry(partition)
                .or_default()
                .merge(bucket);
        }
    }
}

/// One (elapsed, limit, accuracy) sample retained for a COMPLETED job
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompletedSample {
    /// Elapsed wall time in seconds
    pub elapsed_seconds: u64,
    /// Requested time limit in seconds
    pub limit_seconds: u64,
    /// 100 * elapsed / limit, or 0 when the limit is zero
    pub accuracy_percent: f64,
}

/// One counter per status category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub completed: u64,
    pub timeout: u64,
    pub failed: u64,
    pub node_fail: u64,
    pub cancelled_auto: u64,
    pub cancelled_user: u64,
    pub running: u64,
    pub requeued: u64,
    pub pending: u64,
    pub unknown: u64,
}

impl StatusCounts {
    /// Increment the counter matching `status`.
    pub fn record(&mut self, status: JobStatus) {
        *self.counter_mut(status) += 1;
    }

    /// Read the counter for `status`.
    pub fn get(&self, status: JobStatus) -> u64 {
        match status {
            JobStatus::Completed => self.completed,
            JobStatus::Timeout => self.timeout,
            JobStatus::Failed => self.failed,
            JobStatus::NodeFail => self.node_fail,
            JobStatus::CancelledAuto => self.cancelled_auto,
            JobStatus::CancelledByUser => self.cancelled_user,
            JobStatus::Running => self.running,
            JobStatus::Requeued => self.requeued,
            JobStatus::Pending => self.pending,
            JobStatus::Unknown => self.unknown,
        }
    }

    /// Sum of all category counters; equals the number of classified records.
    pub fn total(&self) -> u64 {
        JobStatus::ALL.iter().map(|&status| self.get(status)).sum()
    }

    fn counter_mut(&mut self, status: JobStatus) -> &mut u64 {
        match status {
            JobStatus::Completed => &mut self.completed,
            JobStatus::Timeout => &mut self.timeout,
            JobStatus::Failed => &mut self.failed,
            JobStatus::NodeFail => &mut self.node_fail,
            JobStatus::CancelledAuto => &mut self.cancelled_auto,
            JobStatus::CancelledByUser => &mut self.cancelled_user,
            JobStatus::Running => &mut self.running,
            JobStatus::Requeued => &mut self.requeued,
            JobStatus::Pending => &mut self.pending,
            JobStatus::Unknown => &mut self.unknown,
        }
    }

    fn merge(&mut self, other: StatusCounts) {
        for status in JobStatus::ALL {
            *self.counter_mut(status) += other.get(status);
        }
    }
}

/// Percentage with a defined-zero guard
///
/// Returns `100.0 * part / whole`, or 0 when `whole` is zero. Division
/// guards report 0, never NaN or an error.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { 100.0 * part / whole } else { 0.0 }
}

/// Per-run accumulator for accounting records
///
/// Owns all state for exactly one reporting invocation; nothing persists
/// across runs. Explicitly instantiated and passed by reference into the
/// renderer so runs stay independent and testable in isolation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageAccumulator {
    total_entries: u64,
    malformed_records: u64,
    status_counts: StatusCounts,
    total_compute_hours: f64,
    completed_samples: Vec<CompletedSample>,
    users: BTreeMap<Username, UserRecord>,
}

impl UsageAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one raw accounting line into the totals.
    ///
    /// Malformed lines (fewer than nine pipe-delimited fields) are counted
    /// and dropped without touching any other counter.
    pub fn ingest_line(&mut self, line: &str) {
        match JobRecord::parse(line) {
            Some(record) => self.ingest(&record),
            None => {
                debug!(line, "dropping malformed accounting record");
                self.malformed_records += 1;
            }
        }
    }

    /// Fold one parsed record into the totals.
    pub fn ingest(&mut self, record: &JobRecord) {
        self.total_entries += 1;

        let elapsed_seconds = parse_duration(&record.elapsed);
        let limit_seconds = parse_duration(&record.time_limit);
        let cpu_hours = elapsed_seconds as f64 * record.alloc_cpus as f64 / 3600.0;

        self.total_compute_hours += cpu_hours;
        self.users
            .entry(record.user.clone())
            .or_default()
            .add(&record.partition, &record.qos, cpu_hours);

        let status = JobStatus::classify(&record.state);
        self.status_counts.record(status);

        if status == JobStatus::Completed {
            let accuracy_percent = if limit_seconds > 0 {
                100.0 * elapsed_seconds as f64 / limit_seconds as f64
            } else {
                0.0
            };
            self.completed_samples.push(CompletedSample {
                elapsed_seconds,
                limit_seconds,
                accuracy_percent,
            });
        }
    }

    /// Field-wise merge of a partial accumulator built over a disjoint
    /// record subset. Completed samples are concatenated; their order is
    /// not significant for histogramming.
    pub fn merge(&mut self, other: UsageAccumulator) {
        self.total_entries += other.total_entries;
        self.malformed_records += other.malformed_records;
        self.status_counts.merge(other.status_counts);
        self.total_compute_hours += other.total_compute_hours;
        self.completed_samples.extend(other.completed_samples);
        for (user, record) in other.users {
            self.users.entry(user).or_default().merge(record);
        }
    }

    /// Number of well-formed records ingested
    pub fn total_entries(&self) -> u64 {
        self.total_entries
    }

    /// Number of malformed lines dropped
    pub fn malformed_records(&self) -> u64 {
        self.malformed_records
    }

    /// Per-status counters
    pub fn status_counts(&self) -> &StatusCounts {
        &self.status_counts
    }

    /// Share of `status` among all entries, as a percentage (0 when empty)
    pub fn status_percentage(&self, status: JobStatus) -> f64 {
        percentage(
            self.status_counts.get(status) as f64,
            self.total_entries as f64,
        )
    }

    /// Total cpu-hours across all records; monotonically non-decreasing
    pub fn total_compute_hours(&self) -> f64 {
        self.total_compute_hours
    }

    /// Number of COMPLETED jobs, the histogram percentage denominator
    pub fn total_completed(&self) -> u64 {
        self.status_counts.completed
    }

    /// Per-user ledgers, keyed by username in ascending lexical order
    pub fn users(&self) -> &BTreeMap<Username, UserRecord> {
        &self.users
    }

    /// Samples retained for completed jobs
    pub fn completed_samples(&self) -> &[CompletedSample] {
        &self.completed_samples
    }

    /// Elapsed times (seconds) of completed jobs, for histogramming
    pub fn elapsed_values(&self) -> Vec<f64> {
        self.completed_samples
            .iter()
            .map(|sample| sample.elapsed_seconds as f64)
            .collect()
    }

    /// Time limits (seconds) of completed jobs, for histogramming
    pub fn timelimit_values(&self) -> Vec<f64> {
        self.completed_samples
            .iter()
            .map(|sample| sample.limit_seconds as f64)
            .collect()
    }

    /// Accuracy percentages of completed jobs, for histogramming
    pub fn accuracy_values(&self) -> Vec<f64> {
        self.completed_samples
            .iter()
            .map(|sample| sample.accuracy_percent)
            .collect()
    }
}

/// Stream driver for the accumulation fold
///
/// Consumes the accounting-line stream produced by the sacct client and
/// folds it into a [`UsageAccumulator`], with an optional progress spinner
/// for interactive runs.
pub struct Aggregator {
    show_progress: bool,
}

impl Aggregator {
    /// Create a new Aggregator
    pub fn new() -> Self {
        Self {
            show_progress: false,
        }
    }

    /// Enable or disable the progress spinner
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Fold every line of the stream into a fresh accumulator.
    pub async fn aggregate(
        &self,
        lines: impl Stream<Item = Result<String>>,
    ) -> Result<UsageAccumulator> {
        let mut accumulator = UsageAccumulator::new();

        let progress = if self.show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg} [{elapsed_precise}] {pos} records processed")
                    .expect("static template is valid"),
            );
            pb.set_message("Aggregating accounting records");
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            Some(pb)
        } else {
            None
        };

        let mut count = 0u64;

        tokio::pin!(lines);
        while let Some(result) = lines.next().await {
            let line = result?;
            if line.is_empty() {
                continue;
            }
            accumulator.ingest_line(&line);

            count += 1;
            if let Some(ref pb) = progress {
                pb.set_position(count);
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message(format!(
                "Aggregated {} records for {} users",
                count,
                accumulator.users.len()
            ));
        }

        Ok(accumulator)
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETED_LINE: &str = "123|alice|batch|normal|4|COMPLETED|0:0|00:10:00|01:00:00";

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_completed_record_scenario() {
        let mut acc = UsageAccumulator::new();
        acc.ingest_line(COMPLETED_LINE);

        assert_eq!(acc.total_entries(), 1);
        assert_eq!(acc.total_completed(), 1);
        assert!(approx(acc.total_compute_hours(), 4.0 * 600.0 / 3600.0));

        let sample = acc.completed_samples()[0];
        assert_eq!(sample.elapsed_seconds, 600);
        assert_eq!(sample.limit_seconds, 3600);
        assert!(approx(sample.accuracy_percent, 100.0 * 600.0 / 3600.0));

        let alice = &acc.users()[&Username::new("alice")];
        assert_eq!(alice.total_jobs(), 1);
        assert!(approx(alice.total_cpu_hours(), 4.0 * 600.0 / 3600.0));
        assert_eq!(
            alice.partition_buckets()[&Partition::new("batch")].jobs,
            1
        );
        assert_eq!(alice.qos_buckets()[&QosName::new("normal")].jobs, 1);
    }

    #[test]
    fn test_malformed_line_is_hard_rejected() {
        let mut acc = UsageAccumulator::new();
        acc.ingest_line("123|alice|batch");

        assert_eq!(acc.malformed_records(), 1);
        assert_eq!(acc.total_entries(), 0);
        assert_eq!(acc.status_counts().total(), 0);
        assert!(acc.users().is_empty());
        assert!(approx(acc.total_compute_hours(), 0.0));
    }

    #[test]
    fn test_cancelled_counters_are_disjoint() {
        let mut acc = UsageAccumulator::new();
        acc.ingest_line("1|a|p|q|1|CANCELLED by 1000|0:0|00:01:00|00:05:00");
        assert_eq!(acc.status_counts().cancelled_user, 1);
        assert_eq!(acc.status_counts().cancelled_auto, 0);

        acc.ingest_line("2|a|p|q|1|CANCELLED|0:0|00:01:00|00:05:00");
        assert_eq!(acc.status_counts().cancelled_user, 1);
        assert_eq!(acc.status_counts().cancelled_auto, 1);
    }

    #[test]
    fn test_every_record_lands_in_exactly_one_bucket() {
        let mut acc = UsageAccumulator::new();
        for state in [
            "COMPLETED",
            "TIMEOUT",
            "FAILED",
            "NODE_FAIL",
            "CANCELLED",
            "CANCELLED by 42",
            "RUNNING",
            "REQUEUED",
            "PENDING",
            "OUT_OF_MEMORY",
        ] {
            acc.ingest_line(&format!("1|a|p|q|1|{state}|0:0|00:01:00|00:05:00"));
        }

        assert_eq!(acc.status_counts().total(), acc.total_entries());
        assert_eq!(acc.status_counts().unknown, 1);
    }

    #[test]
    fn test_partition_and_qos_totals_agree() {
        let mut acc = UsageAccumulator::new();
        acc.ingest_line("1|bob|batch|normal|2|COMPLETED|0:0|00:30:00|01:00:00");
        acc.ingest_line("2|bob|gpu|high|8|FAILED|1:0|00:05:00|01:00:00");
        acc.ingest_line("3|bob|batch|high|1|COMPLETED|0:0|00:02:00|00:10:00");

        let bob = &acc.users()[&Username::new("bob")];
        let via_qos: u64 = bob.qos_buckets().values().map(|b| b.jobs).sum();
        let via_partition: u64 = bob.partition_buckets().values().map(|b| b.jobs).sum();
        assert_eq!(via_qos, via_partition);
        assert_eq!(bob.total_jobs(), 3);

        let qos_hours: f64 = bob.qos_buckets().values().map(|b| b.cpu_hours).sum();
        assert!(approx(qos_hours, bob.total_cpu_hours()));
    }

    #[test]
    fn test_zero_time_limit_accuracy_is_zero() {
        let mut acc = UsageAccumulator::new();
        acc.ingest_line("1|a|p|q|1|COMPLETED|0:0|00:10:00|UNLIMITED");

        let sample = acc.completed_samples()[0];
        assert_eq!(sample.limit_seconds, 0);
        assert_eq!(sample.accuracy_percent, 0.0);
        assert!(sample.accuracy_percent.is_finite());
    }

    #[test]
    fn test_non_completed_jobs_retain_no_sample() {
        let mut acc = UsageAccumulator::new();
        acc.ingest_line("1|a|p|q|1|TIMEOUT|0:0|01:00:00|01:00:00");
        acc.ingest_line("2|a|p|q|1|PENDING|0:0|00:00:00|01:00:00");
        assert!(acc.completed_samples().is_empty());
    }

    #[test]
    fn test_empty_accumulator_percentages_are_zero() {
        let acc = UsageAccumulator::new();
        for status in JobStatus::ALL {
            assert_eq!(acc.status_percentage(status), 0.0);
        }
        assert_eq!(acc.total_entries(), 0);
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let lines = [
            "1|alice|batch|normal|4|COMPLETED|0:0|00:10:00|01:00:00",
            "2|bob|gpu|high|8|TIMEOUT|0:0|02:00:00|02:00:00",
            "3|alice|batch|normal|1|CANCELLED by 1000|0:0|00:01:00|00:30:00",
            "4|carol|debug|low|2|COMPLETED|0:0|00:05:00|00:00:00",
            "bad|line",
        ];

        let mut whole = UsageAccumulator::new();
        for line in &lines {
            whole.ingest_line(line);
        }

        let (left_lines, right_lines) = lines.split_at(2);
        let mut left = UsageAccumulator::new();
        for line in left_lines {
            left.ingest_line(line);
        }
        let mut right = UsageAccumulator::new();
        for line in right_lines {
            right.ingest_line(line);
        }
        left.merge(right);

        assert_eq!(left.total_entries(), whole.total_entries());
        assert_eq!(left.malformed_records(), whole.malformed_records());
        assert_eq!(left.status_counts(), whole.status_counts());
        assert!(approx(
            left.total_compute_hours(),
            whole.total_compute_hours()
        ));
        assert_eq!(left.users(), whole.users());
        assert_eq!(left.completed_samples(), whole.completed_samples());
    }

    #[tokio::test]
    async fn test_aggregate_stream() {
        use futures::stream;

        let lines = vec![
            Ok(COMPLETED_LINE.to_string()),
            Ok(String::new()),
            Ok("2|bob|gpu|high|8|FAILED|1:0|00:05:00|01:00:00".to_string()),
        ];
        let acc = Aggregator::new()
            .aggregate(stream::iter(lines))
            .await
            .expect("stream carries no errors");

        assert_eq!(acc.total_entries(), 2);
        assert_eq!(acc.users().len(), 2);
    }
}
