//! Histogram builder for completed-job sample sets
//!
//! Buckets a numeric sample set into ordered bins and computes
//! count / percent / cumulative-percent per bin. Bins are right-open
//! `[lower, upper)` except the final bin, which also includes its upper
//! boundary so the maximum representable sample is contained.
//!
//! Percentages are computed against the global completed-job counter, not
//! against the number of in-range samples: samples beyond the configured
//! boundary range are excluded from every bin's count but still weigh in the
//! denominator, so the displayed columns can sum below 100%. That property
//! matches the production reports this tool replaces and is kept as-is.

use crate::aggregation::percentage;
use serde::Serialize;

/// Second-granularity boundaries for the elapsed and time-limit tables:
/// 1m, 2m, 5m, 10m, 20m, 30m, then hourly up to 12h, then 1d, 2d, 3d, 7d.
pub const TIME_BINS: [f64; 23] = [
    0.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 1800.0, 3600.0, 7200.0, 10800.0, 14400.0, 18000.0,
    21600.0, 25200.0, 28800.0, 32400.0, 36000.0, 39600.0, 43200.0, 86400.0, 172800.0, 259200.0,
    604800.0,
];

/// Percentage boundaries for the accuracy table: coarse steps through the
/// low range, 5-point steps to 90, single points through 100, and one
/// overflow bucket to 200 for jobs whose elapsed time exceeds their limit
/// due to scheduler slack.
pub const ACCURACY_BINS: [f64; 23] = [
    0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 75.0, 80.0, 85.0, 90.0, 91.0, 92.0, 93.0, 94.0,
    95.0, 96.0, 97.0, 98.0, 99.0, 100.0, 200.0,
];

/// One histogram bin
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    /// Inclusive lower boundary
    pub lower: f64,
    /// Upper boundary; exclusive except for the final bin
    pub upper: f64,
    /// Samples that fell in this bin
    pub count: u64,
    /// 100 * count / total_completed
    pub percent: f64,
    /// 100 * (running count through this bin) / total_completed
    pub cumulative_percent: f64,
}

/// Ordered sequence of bins over a sample set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// Bins in ascending boundary order
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    /// Bucket `samples` into the bins described by `boundaries`.
    ///
    /// `boundaries` must be strictly increasing; `n` boundaries describe
    /// `n - 1` bins. `total_completed` is the percentage denominator — the
    /// global completed-job counter, deliberately not the in-range sample
    /// count. When it is zero every percent value is 0, never NaN.
    ///
    /// # Examples
    /// ```
    /// use slurmstat::histogram::Histogram;
    ///
    /// let histogram = Histogram::build(&[5.0, 15.0, 25.0], &[0.0, 10.0, 20.0], 4);
    /// assert_eq!(histogram.bins[0].count, 1);
    /// assert_eq!(histogram.bins[1].count, 1); // 25.0 is out of range
    /// assert_eq!(histogram.bins[1].cumulative_percent, 50.0);
    /// ```
    pub fn build(samples: &[f64], boundaries: &[f64], total_completed: u64) -> Self {
        debug_assert!(
            boundaries.windows(2).all(|pair| pair[0] < pair[1]),
            "bin boundaries must be strictly increasing"
        );

        if boundaries.len() < 2 {
            return Self { bins: Vec::new() };
        }

        let bin_count = boundaries.len() - 1;
        let mut counts = vec![0u64; bin_count];
        for &sample in samples {
            if let Some(index) = bin_index(sample, boundaries) {
                counts[index] += 1;
            }
        }

        let denominator = total_completed as f64;
        let mut running = 0u64;
        let bins = counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                running += count;
                HistogramBin {
                    lower: boundaries[i],
                    upper: boundaries[i + 1],
                    count,
                    percent: percentage(count as f64, denominator),
                    cumulative_percent: percentage(running as f64, denominator),
                }
            })
            .collect();

        Self { bins }
    }

    /// Total samples that fell inside the boundary range.
    pub fn in_range_count(&self) -> u64 {
        self.bins.iter().map(|bin| bin.count).sum()
    }
}

/// Index of the bin containing `sample`, or `None` when it falls outside
/// the boundary range. Right-open bins, final bin closed on the right.
fn bin_index(sample: f64, boundaries: &[f64]) -> Option<usize> {
    let last = boundaries.len() - 2;
    (0..=last).find(|&i| {
        sample >= boundaries[i]
            && (sample < boundaries[i + 1] || (i == last && sample == boundaries[i + 1]))
    })
}
