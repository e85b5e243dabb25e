//! Descriptive statistics over per-arm rates.
//! Nearest-rank quartiles, no interpolation.

use serde::Serialize;

/// Rate as a safe division: `None` when the denominator is zero or missing.
pub fn rate(numerator: u64, denominator: Option<u64>) -> Option<f64> {
    match denominator {
        Some(d) if d > 0 => Some(numerator as f64 / d as f64),
        _ => None,
    }
}

/// Values sorted ascending with NaN dropped.
fn sorted(values: &[f64]) -> Vec<f64> {
    let mut vs: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    vs.sort_by(f64::total_cmp);
    vs
}

/// Median: middle element, or mean of the two middle elements.
pub fn median(values: &[f64]) -> Option<f64> {
    let vs = sorted(values);
    let n = vs.len();
    if n == 0 {
        return None;
    }
    if n % 2 == 1 {
        Some(vs[n / 2])
    } else {
        Some((vs[n / 2 - 1] + vs[n / 2]) / 2.0)
    }
}

/// Nearest-rank (Q1, Q3): elements at zero-based indices
/// `floor(0.25·(n−1))` and `floor(0.75·(n−1))`.
pub fn quartiles(values: &[f64]) -> Option<(f64, f64)> {
    let vs = sorted(values);
    let n = vs.len();
    if n == 0 {
        return None;
    }
    let q1 = (n - 1) / 4;
    let q3 = (3 * (n - 1)) / 4;
    Some((vs[q1], vs[q3]))
}

/// Median and IQR of the defined rates in one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RateSummary {
    pub median: Option<f64>,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
}

impl RateSummary {
    pub fn from_rates<I>(rates: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let defined: Vec<f64> = rates.into_iter().flatten().collect();
        let (q1, q3) = match quartiles(&defined) {
            Some((a, b)) => (Some(a), Some(b)),
            None => (None, None),
        };
        Self {
            median: median(&defined),
            q1,
            q3,
        }
    }
}
