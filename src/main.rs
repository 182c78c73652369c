//! slurmstat - Usage reports from SLURM accounting records

use clap::Parser;
use slurmstat::{
    aggregation::{Aggregator, UsageAccumulator},
    cli::{Cli, Command, HistogramMode, ReportMode, window_capacity_cpu_hours},
    error::Result,
    histogram::{ACCURACY_BINS, Histogram, TIME_BINS},
    output::{OutputFormatter, ReportContext, get_formatter},
    sacct::SacctClient,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_summary(formatter: &dyn OutputFormatter, acc: &UsageAccumulator, ctx: &ReportContext) {
    println!("{}", formatter.format_summary(acc, ctx));
}

fn print_users(formatter: &dyn OutputFormatter, acc: &UsageAccumulator, ctx: &ReportContext) {
    println!("{}", formatter.format_users(acc, ctx));
}

fn print_histograms(formatter: &dyn OutputFormatter, acc: &UsageAccumulator, mode: HistogramMode) {
    let total_completed = acc.total_completed();

    if matches!(mode, HistogramMode::Elapsed | HistogramMode::All) {
        let histogram = Histogram::build(&acc.elapsed_values(), &TIME_BINS, total_completed);
        println!(
            "{}",
            formatter.format_histogram("Elapsed table", "time (s)", &histogram)
        );
    }
    if matches!(mode, HistogramMode::Timelimit | HistogramMode::All) {
        let histogram = Histogram::build(&acc.timelimit_values(), &TIME_BINS, total_completed);
        println!(
            "{}",
            formatter.format_histogram("Timelimit table", "time (s)", &histogram)
        );
    }
    if matches!(mode, HistogramMode::Accuracy | HistogramMode::All) {
        let histogram = Histogram::build(&acc.accuracy_values(), &ACCURACY_BINS, total_completed);
        println!(
            "{}",
            formatter.format_histogram("Accuracy table", "accuracy (%)", &histogram)
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging. The --quiet flag overrides RUST_LOG.
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("slurmstat=info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let ctx = ReportContext {
        title: cli.report_title.clone(),
        start: cli.start,
        end: cli.end,
        total_avail_cpu_hours: window_capacity_cpu_hours(cli.avail_cpus, cli.start, cli.end)?,
    };

    info!(
        start = %cli.start,
        end = %cli.end,
        "collecting accounting records"
    );

    let client = SacctClient::new(&cli.sacct_path, cli.start, cli.end).with_users(cli.user.clone());

    let show_progress = !cli.json && is_terminal::is_terminal(std::io::stdout());
    let aggregator = Aggregator::new().with_progress(show_progress);
    let acc = aggregator.aggregate(client.load_records()).await?;

    info!(
        entries = acc.total_entries(),
        users = acc.users().len(),
        malformed = acc.malformed_records(),
        "aggregation complete"
    );

    let formatter = get_formatter(cli.json);

    match cli.command {
        Some(Command::Report { mode }) => {
            if matches!(mode, ReportMode::Summary | ReportMode::All) {
                print_summary(formatter.as_ref(), &acc, &ctx);
            }
            if matches!(mode, ReportMode::User | ReportMode::All) {
                print_users(formatter.as_ref(), &acc, &ctx);
            }
        }
        Some(Command::Histogram { mode }) => {
            print_histograms(formatter.as_ref(), &acc, mode);
        }
        None => {
            // Full report: summary, per-user, and all histogram tables
            print_summary(formatter.as_ref(), &acc, &ctx);
            print_users(formatter.as_ref(), &acc, &ctx);
            print_histograms(formatter.as_ref(), &acc, HistogramMode::All);
        }
    }

    Ok(())
}
