//! Output formatting for slurmstat reports
//!
//! Provides formatters for displaying the accumulator's totals:
//! - Table format for human-readable terminal output
//! - JSON format for machine-readable output and automation pipelines
//!
//! Exact column widths and labels are a rendering concern only; the
//! correctness contract lives in the aggregation and histogram modules.
//!
//! # Examples
//!
//! ```
//! use slurmstat::aggregation::UsageAccumulator;
//! use slurmstat::output::{ReportContext, get_formatter};
//! use chrono::NaiveDate;
//!
//! let mut acc = UsageAccumulator::new();
//! acc.ingest_line("123|alice|batch|normal|4|COMPLETED|0:0|00:10:00|01:00:00");
//!
//! let ctx = ReportContext {
//!     title: "Cluster report".to_string(),
//!     start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
//!     total_avail_cpu_hours: 74_400.0,
//! };
//!
//! let formatter = get_formatter(false);
//! println!("{}", formatter.format_summary(&acc, &ctx));
//! println!("{}", formatter.format_users(&acc, &ctx));
//! ```

use crate::aggregation::{UsageAccumulator, percentage};
use crate::histogram::Histogram;
use crate::types::JobStatus;
use chrono::NaiveDate;
use prettytable::{Cell, Row, Table, format, row};
use serde_json::json;

/// Caller-supplied report parameters
///
/// The capacity figure is computed by the caller from the window length and
/// the configured cluster size; the core only divides by it.
#[derive(Debug, Clone)]
pub struct ReportContext {
    /// Title line printed above the summary
    pub title: String,
    /// First day of the reporting window
    pub start: NaiveDate,
    /// Last day of the reporting window, inclusive
    pub end: NaiveDate,
    /// Cluster-wide available cpu-hours over the window
    pub total_avail_cpu_hours: f64,
}

/// Statuses shown as summary lines, in report order. `Unknown` is excluded:
/// it surfaces as a warning instead so it is never mistaken for a routine
/// category.
const SUMMARY_ORDER: [JobStatus; 9] = [
    JobStatus::Completed,
    JobStatus::Timeout,
    JobStatus::Failed,
    JobStatus::NodeFail,
    JobStatus::CancelledAuto,
    JobStatus::CancelledByUser,
    JobStatus::Pending,
    JobStatus::Requeued,
    JobStatus::Running,
];

fn status_label(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Completed => "Jobs executed successfully",
        JobStatus::Timeout => "Jobs executed but timed out",
        JobStatus::Failed => "Jobs executed but failed",
        JobStatus::NodeFail => "Jobs where the node failed",
        JobStatus::CancelledAuto => "Jobs cancelled automatically",
        JobStatus::CancelledByUser => "Jobs cancelled by user",
        JobStatus::Pending => "Jobs still pending",
        JobStatus::Requeued => "Jobs requeued",
        JobStatus::Running => "Jobs still running",
        JobStatus::Unknown => "Jobs in unknown state",
    }
}

/// Trait for output formatters
///
/// Implementations provide different renderings of the same accumulator
/// state (plain tables, JSON, ...).
pub trait OutputFormatter {
    /// Format the summary block: per-status counts and percentages,
    /// total jobs, and a warning when any state was unrecognized
    fn format_summary(&self, acc: &UsageAccumulator, ctx: &ReportContext) -> String;

    /// Format the per-user consumption table with a trailing aggregate row
    fn format_users(&self, acc: &UsageAccumulator, ctx: &ReportContext) -> String;

    /// Format one histogram table
    fn format_histogram(&self, title: &str, value_label: &str, histogram: &Histogram) -> String;
}

/// Table formatter for human-readable terminal output
pub struct TableFormatter;

impl TableFormatter {
    const RULE: &'static str =
        "-------------------------------------------------------";

    /// Format the summary with an explicit "generated on" timestamp.
    pub(crate) fn format_summary_with_now(
        &self,
        acc: &UsageAccumulator,
        ctx: &ReportContext,
        now: chrono::DateTime<chrono::Local>,
    ) -> String {
        let mut output = String::new();

        output.push_str(&format!("{}\n", ctx.title));
        output.push_str(&format!(
            "{:<37}{}\n",
            "Report generated on",
            now.format("%Y-%m-%d %H:%M")
        ));
        output.push_str(&format!(
            "{:<37}{} - {}\n",
            "Data gathered between",
            ctx.start.format("%Y-%m-%d"),
            ctx.end.format("%Y-%m-%d")
        ));
        output.push_str(Self::RULE);
        output.push('\n');

        output.push_str(&Self::summary_line(
            "Jobs submitted",
            acc.total_entries(),
            percentage(acc.total_entries() as f64, acc.total_entries() as f64),
        ));
        for status in SUMMARY_ORDER {
            output.push_str(&Self::summary_line(
                status_label(status),
                acc.status_counts().get(status),
                acc.status_percentage(status),
            ));
        }

        let unknown = acc.status_counts().unknown;
        if unknown > 0 {
            output.push_str(&format!("WARNING: jobs in unknown state: {unknown}\n"));
        }
        if acc.malformed_records() > 0 {
            output.push_str(&format!(
                "WARNING: malformed records dropped: {}\n",
                acc.malformed_records()
            ));
        }

        output.push_str(Self::RULE);
        output.push('\n');
        output
    }

    fn summary_line(label: &str, count: u64, percent: f64) -> String {
        format!("{:<37}{:6}  ({:6.2} %)\n", format!("{label}:"), count, percent)
    }
}

impl OutputFormatter for TableFormatter {
    fn format_summary(&self, acc: &UsageAccumulator, ctx: &ReportContext) -> String {
        self.format_summary_with_now(acc, ctx, chrono::Local::now())
    }

    fn format_users(&self, acc: &UsageAccumulator, ctx: &ReportContext) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);

        table.set_titles(row![
            b -> "Username",
            b -> "Jobs",
            b -> "Jobs %",
            b -> "Cpu-hours",
            b -> "Cpu-hours %"
        ]);

        let total_entries = acc.total_entries() as f64;
        let total_hours = acc.total_compute_hours();

        for (username, record) in acc.users() {
            let jobs = record.total_jobs();
            let cpu_hours = record.total_cpu_hours();
            table.add_row(row![
                username.as_str(),
                r -> jobs,
                r -> format!("{:.2} %", percentage(jobs as f64, total_entries)),
                r -> format!("{cpu_hours:.2}"),
                r -> format!("{:.2} %", percentage(cpu_hours, total_hours))
            ]);
        }

        // Separator, then the aggregate row; its percent column is the share
        // of the cluster capacity over the window
        table.add_row(Row::new(vec![Cell::new(""); 5]));
        table.add_row(row![
            b -> "TOTAL",
            b -> acc.total_entries(),
            "",
            b -> format!("{total_hours:.2}"),
            b -> format!(
                "{:.2} % of capacity",
                percentage(total_hours, ctx.total_avail_cpu_hours)
            )
        ]);

        table.to_string()
    }

    fn format_histogram(&self, title: &str, value_label: &str, histogram: &Histogram) -> String {
        let mut output = format!("{title}\n");

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);

        table.set_titles(row![
            b -> value_label,
            b -> "Count",
            b -> "Percent",
            b -> "Cumulative"
        ]);

        for bin in &histogram.bins {
            table.add_row(row![
                format!("{:.0} - {:.0}", bin.lower, bin.upper),
                r -> bin.count,
                r -> format!("{:.2} %", bin.percent),
                r -> format!("{:.2} %", bin.cumulative_percent)
            ]);
        }

        output.push_str(&table.to_string());
        output
    }
}

/// JSON formatter for machine-readable output
///
/// All counters are preserved in raw form alongside the derived percentages
/// so downstream consumers can renormalize if they ever need to.
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_summary(&self, acc: &UsageAccumulator, ctx: &ReportContext) -> String {
        let output = json!({
            "title": ctx.title,
            "start": ctx.start.format("%Y-%m-%d").to_string(),
            "end": ctx.end.format("%Y-%m-%d").to_string(),
            "total_entries": acc.total_entries(),
            "malformed_records": acc.malformed_records(),
            "total_compute_hours": acc.total_compute_hours(),
            "total_avail_cpu_hours": ctx.total_avail_cpu_hours,
            "status_counts": acc.status_counts(),
            "status_percentages": JobStatus::ALL.iter().map(|&status| {
                (status.to_string(), json!(acc.status_percentage(status)))
            }).collect::<serde_json::Map<_, _>>(),
        });

        serde_json::to_string_pretty(&output).unwrap()
    }

    fn format_users(&self, acc: &UsageAccumulator, ctx: &ReportContext) -> String {
        let total_entries = acc.total_entries() as f64;
        let total_hours = acc.total_compute_hours();

        let output = json!({
            "users": acc.users().iter().map(|(username, record)| json!({
                "username": username,
                "jobs": record.total_jobs(),
                "job_percent": percentage(record.total_jobs() as f64, total_entries),
                "cpu_hours": record.total_cpu_hours(),
                "cpu_hours_percent": percentage(record.total_cpu_hours(), total_hours),
                "partitions": record.partition_buckets(),
                "qos": record.qos_buckets(),
            })).collect::<Vec<_>>(),
            "totals": {
                "jobs": acc.total_entries(),
                "cpu_hours": total_hours,
                "capacity_percent": percentage(total_hours, ctx.total_avail_cpu_hours),
            }
        });

        serde_json::to_string_pretty(&output).unwrap()
    }

    fn format_histogram(&self, title: &str, value_label: &str, histogram: &Histogram) -> String {
        let output = json!({
            "title": title,
            "label": value_label,
            "in_range_count": histogram.in_range_count(),
            "bins": histogram.bins,
        });

        serde_json::to_string_pretty(&output).unwrap()
    }
}

/// Factory function to create the appropriate formatter
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(TableFormatter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::TIME_BINS;

    fn context() -> ReportContext {
        ReportContext {
            title: "Cluster report".to_string(),
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            total_avail_cpu_hours: 74_400.0,
        }
    }

    fn accumulator() -> UsageAccumulator {
        let mut acc = UsageAccumulator::new();
        acc.ingest_line("1|alice|batch|normal|4|COMPLETED|0:0|00:10:00|01:00:00");
        acc.ingest_line("2|bob|gpu|high|8|WEIRD_STATE|0:0|00:05:00|01:00:00");
        acc.ingest_line("short|line");
        acc
    }

    #[test]
    fn test_summary_table() {
        let now = chrono::Local::now();
        let summary = TableFormatter.format_summary_with_now(&accumulator(), &context(), now);

        assert!(summary.starts_with("Cluster report\n"));
        assert!(summary.contains("Data gathered between"));
        assert!(summary.contains("2024-01-01 - 2024-01-31"));
        assert!(summary.contains("Jobs submitted:"));
        assert!(summary.contains("Jobs executed successfully:"));
        assert!(summary.contains("( 50.00 %)"));
        assert!(summary.contains("WARNING: jobs in unknown state: 1"));
        assert!(summary.contains("WARNING: malformed records dropped: 1"));
    }

    #[test]
    fn test_summary_without_unknown_has_no_warning() {
        let mut acc = UsageAccumulator::new();
        acc.ingest_line("1|alice|batch|normal|4|COMPLETED|0:0|00:10:00|01:00:00");
        let summary = TableFormatter.format_summary(&acc, &context());
        assert!(!summary.contains("WARNING"));
    }

    #[test]
    fn test_empty_accumulator_renders() {
        let acc = UsageAccumulator::new();
        let summary = TableFormatter.format_summary(&acc, &context());
        assert!(summary.contains("Jobs submitted:"));
        assert!(summary.contains("(  0.00 %)"));

        let users = TableFormatter.format_users(&acc, &context());
        assert!(users.contains("TOTAL"));
    }

    #[test]
    fn test_users_table_sorted_with_total_row() {
        let users = TableFormatter.format_users(&accumulator(), &context());
        let alice = users.find("alice").expect("alice row");
        let bob = users.find("bob").expect("bob row");
        assert!(alice < bob);
        assert!(users.contains("TOTAL"));
        assert!(users.contains("of capacity"));
    }

    #[test]
    fn test_histogram_table() {
        let histogram = Histogram::build(&[600.0], &TIME_BINS, 1);
        let rendered = TableFormatter.format_histogram("Elapsed table", "time (s)", &histogram);
        assert!(rendered.starts_with("Elapsed table\n"));
        assert!(rendered.contains("600 - 1200"));
        assert!(rendered.contains("100.00 %"));
    }

    #[test]
    fn test_json_summary_roundtrips() {
        let rendered = JsonFormatter.format_summary(&accumulator(), &context());
        let value: serde_json::Value =
            serde_json::from_str(&rendered).expect("formatter emits valid JSON");
        assert_eq!(value["total_entries"], 2);
        assert_eq!(value["malformed_records"], 1);
        assert_eq!(value["status_counts"]["unknown"], 1);
        assert_eq!(value["status_percentages"]["COMPLETED"], 50.0);
    }

    #[test]
    fn test_json_users() {
        let rendered = JsonFormatter.format_users(&accumulator(), &context());
        let value: serde_json::Value =
            serde_json::from_str(&rendered).expect("formatter emits valid JSON");
        assert_eq!(value["users"][0]["username"], "alice");
        assert_eq!(value["users"][0]["partitions"]["batch"]["jobs"], 1);
        assert_eq!(value["totals"]["jobs"], 2);
    }

    #[test]
    fn test_get_formatter() {
        let json = get_formatter(true).format_histogram(
            "t",
            "l",
            &Histogram::build(&[], &TIME_BINS, 0),
        );
        assert!(serde_json::from_str::<serde_json::Value>(&json).is_ok());

        let table = get_formatter(false).format_histogram(
            "t",
            "l",
            &Histogram::build(&[], &TIME_BINS, 0),
        );
        assert!(table.starts_with("t\n"));
    }
}
