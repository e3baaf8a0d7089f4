//! Descriptive statistics over dense `f64` slices.
//!
//! Callers drop missing values first; every function returns `None` when the
//! statistic is undefined for the input (empty slice, or a single value for
//! the sample deviation).

use crate::helpers::simd_helpers::sum_f64;

pub fn sum(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| sum_f64(values))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    sum(values).map(|s| s / values.len() as f64)
}

/// Sample variance, n - 1 denominator
pub fn variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let squared: Vec<f64> = values.iter().map(|v| (v - m) * (v - m)).collect();
    Some(sum_f64(&squared) / (values.len() - 1) as f64)
}

/// Sample standard deviation, n - 1 denominator
pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

/// Type-7 quantile: linear interpolation between order statistics.
/// `p` is a percentage in `[0, 100]`.
pub fn quantile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=100.0).contains(&p) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let h = (sorted.len() - 1) as f64 * (p / 100.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 50.0)
}

/// Interquartile range, q75 - q25
pub fn iqr(values: &[f64]) -> Option<f64> {
    Some(quantile(values, 75.0)? - quantile(values, 25.0)?)
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Five-number summary plus mean and deviation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Describe {
    pub count: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

pub fn describe(values: &[f64]) -> Describe {
    Describe {
        count: values.len(),
        mean: mean(values),
        std_dev: std_dev(values),
        min: min(values),
        q1: quantile(values, 25.0),
        median: median(values),
        q3: quantile(values, 75.0),
        max: max(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLDEN: [f64; 8] = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

    #[test]
    fn test_sample_std_dev_golden_value() {
        let sd = std_dev(&GOLDEN).unwrap();
        assert!((sd - 2.138).abs() < 5e-4, "got {sd}");
        assert!((variance(&GOLDEN).unwrap() - 32.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev_undefined_below_two_values() {
        assert_eq!(std_dev(&[3.0]), None);
        assert_eq!(std_dev(&[]), None);
    }

    #[test]
    fn test_type7_quantiles() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.0), Some(1.0));
        assert_eq!(quantile(&v, 100.0), Some(4.0));
        assert_eq!(quantile(&v, 25.0), Some(1.75));
        assert_eq!(median(&v), Some(2.5));
        assert_eq!(iqr(&v), Some(1.5));
        assert_eq!(quantile(&v, 101.0), None);
    }

    #[test]
    fn test_percentile_50_equals_median() {
        for values in [&GOLDEN[..], &[7.0][..], &[3.0, -1.0, 8.5][..]] {
            assert_eq!(quantile(values, 50.0), median(values));
        }
    }

    #[test]
    fn test_quantile_ignores_input_order() {
        assert_eq!(median(&[9.0, 1.0, 5.0]), Some(5.0));
    }

    #[test]
    fn test_empty_input_is_undefined() {
        assert_eq!(sum(&[]), None);
        assert_eq!(mean(&[]), None);
        assert_eq!(min(&[]), None);
        assert_eq!(describe(&[]).count, 0);
    }

    #[test]
    fn test_describe() {
        let d = describe(&GOLDEN);
        assert_eq!(d.count, 8);
        assert_eq!(d.mean, Some(5.0));
        assert_eq!(d.min, Some(2.0));
        assert_eq!(d.max, Some(9.0));
        assert_eq!(d.median, Some(4.5));
    }
}
