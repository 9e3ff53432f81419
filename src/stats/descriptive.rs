//! Descriptive Statistics
//! Distribution summaries for a column of values (lead times, delays).

use serde::Serialize;
use statrs::statistics::Statistics;

/// Summary of one sample. Every field is `0` for an empty sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Descriptive {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
}

impl Descriptive {
    pub fn of(values: &[f64]) -> Self {
        let n = values.len();
        if n == 0 {
            return Self::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        // Sample standard deviation is undefined for a single value
        let std_dev = if n > 1 { values.iter().std_dev() } else { 0.0 };

        Self {
            count: n,
            mean: values.iter().mean(),
            median: percentile(&sorted, 50.0),
            std_dev,
            min: sorted[0],
            max: sorted[n - 1],
            p95: percentile(&sorted, 95.0),
        }
    }
}

/// Percentile by linear interpolation between closest ranks (NumPy compatible).
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    let n = sorted_values.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted_values[0];
    }

    let rank = (p / 100.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (rank.ceil() as usize).min(n - 1);
    let frac = rank - lower as f64;

    if lower == upper {
        sorted_values[lower]
    } else {
        sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sample_is_all_zero() {
        assert_eq!(Descriptive::of(&[]), Descriptive::default());
    }

    #[test]
    fn single_value() {
        let d = Descriptive::of(&[4.0]);
        assert_eq!(d.count, 1);
        assert_eq!(d.mean, 4.0);
        assert_eq!(d.median, 4.0);
        assert_eq!(d.std_dev, 0.0);
        assert_eq!(d.p95, 4.0);
    }

    #[test]
    fn interpolated_percentiles() {
        let d = Descriptive::of(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(d.median, 2.5);
        assert_eq!(d.min, 1.0);
        assert_eq!(d.max, 4.0);
        assert!((d.p95 - 3.85).abs() < 1e-9);
        assert_eq!(d.mean, 2.5);
        assert!((d.std_dev - 1.290_994_448_7).abs() < 1e-6);
    }
}
