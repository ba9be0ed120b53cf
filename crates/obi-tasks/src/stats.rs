//! Summary statistics of array-valued metrics

use serde::{Deserialize, Serialize};

/// Min, max, median, mean and population standard deviation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub mean: f64,
    pub std: f64,
}

impl SummaryStatistics {
    /// Summarize samples; `None` when there are none
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let mid = n / 2;
        let median = if n % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        let mean = sorted.iter().sum::<f64>() / n as f64;
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;

        Some(Self {
            min: sorted[0],
            max: sorted[n - 1],
            median,
            mean,
            std: variance.sqrt(),
        })
    }
}
