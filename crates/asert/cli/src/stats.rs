//! Block-time statistics of one or more runs

/// Summary of one run's inter-block times
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockTimeStats {
    /// Mean block time
    pub mean: f64,
    /// Sample standard deviation
    pub std_dev: f64,
    /// Upper median
    pub median: i64,
    /// Longest block time
    pub max: i64,
}

impl BlockTimeStats {
    /// Summarize `times`. Needs at least two samples.
    pub fn from_block_times(times: &[i64]) -> Option<Self> {
        if times.len() < 2 {
            return None;
        }
        let values: Vec<f64> = times.iter().map(|&t| t as f64).collect();
        let mut sorted = times.to_vec();
        sorted.sort_unstable();

        Some(Self {
            mean: mean(&values),
            std_dev: sample_std_dev(&values),
            median: sorted[sorted.len() / 2],
            max: sorted[sorted.len() - 1],
        })
    }
}

/// Distribution of one statistic across runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spread {
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Mean
    pub mean: f64,
    /// Sample standard deviation, zero for a single run
    pub std_dev: f64,
    /// Upper median
    pub median: f64,
}

impl Spread {
    /// Spread of `values`, `None` when empty
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let (&min, &max) = (sorted.first()?, sorted.last()?);

        Some(Self {
            min,
            max,
            mean: mean(values),
            std_dev: if values.len() > 1 { sample_std_dev(values) } else { 0.0 },
            median: sorted[sorted.len() / 2],
        })
    }
}

/// One log line for `label`: the bare value for a single run, the spread
/// otherwise
pub fn describe(label: &str, values: &[f64]) -> String {
    match values {
        [] => format!("{label} n/a"),
        [value] => format!("{label} {value}s"),
        _ => match Spread::from_values(values) {
            Some(s) => format!(
                "{label}(s) Range {:.1}-{:.1} Mean {:.1} Std Dev {:.1} Median {:.1}",
                s.min, s.max, s.mean, s.std_dev, s.median
            ),
            None => format!("{label} n/a"),
        },
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}
