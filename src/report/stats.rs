//! Descriptive statistics behind the report artifacts.
//!
//! Quantiles use linear interpolation between closest ranks and the standard
//! deviation is the sample (n - 1) estimate, matching the usual dataframe
//! `describe()` output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Frequency of each distinct label, most frequent first.
///
/// Ties are broken by label so the ordering is deterministic.
pub fn value_counts<I, S>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value.as_ref().to_string()).or_insert(0) += 1;
    }
    let mut ordered: Vec<(String, usize)> = counts.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ordered
}

/// Labels of the `n` most frequent values.
pub fn top_labels(counts: &[(String, usize)], n: usize) -> Vec<String> {
    counts.iter().take(n).map(|(label, _)| label.clone()).collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; zero when fewer than two values.
    pub std: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl Summary {
    /// Summarize `values`, or `None` when there is nothing to summarize.
    pub fn describe(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            var.sqrt()
        } else {
            0.0
        };
        Some(Self {
            count,
            mean,
            std,
            min: sorted[0],
            q1: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            q3: quantile_sorted(&sorted, 0.75),
            max: sorted[count - 1],
        })
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Linear-interpolated quantile of an already sorted, non-empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Box-and-whisker geometry with Tukey fences at 1.5 IQR.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxStats {
    pub summary: Summary,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let summary = Summary::describe(values)?;
        let low_fence = summary.q1 - 1.5 * summary.iqr();
        let high_fence = summary.q3 + 1.5 * summary.iqr();
        let mut outliers = Vec::new();
        let mut whisker_low = summary.median;
        let mut whisker_high = summary.median;
        for &value in values {
            if value < low_fence || value > high_fence {
                outliers.push(value);
                continue;
            }
            whisker_low = whisker_low.min(value);
            whisker_high = whisker_high.max(value);
        }
        outliers.sort_by(f64::total_cmp);
        Some(Self {
            summary,
            whisker_low,
            whisker_high,
            outliers,
        })
    }
}

/// Half-open bin `[start, end)`; the last bin of a histogram also includes its end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width histogram spanning the observed range.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![Bin {
            start: min,
            end: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<Bin> = (0..bins)
        .map(|idx| Bin {
            start: min + width * idx as f64,
            end: if idx + 1 == bins {
                max
            } else {
                min + width * (idx + 1) as f64
            },
            count: 0,
        })
        .collect();
    for &value in values {
        let idx = (((value - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DensityPoint {
    pub x: f64,
    pub y: f64,
}

/// Gaussian kernel density estimate sampled at `points` evenly spaced
/// positions, using Scott's rule for the bandwidth.
///
/// Returns an empty curve when the values have no spread.
pub fn gaussian_kde(values: &[f64], points: usize) -> Vec<DensityPoint> {
    let Some(summary) = Summary::describe(values) else {
        return Vec::new();
    };
    if summary.std == 0.0 || points < 2 {
        return Vec::new();
    }
    let n = values.len() as f64;
    let bandwidth = summary.std * n.powf(-0.2);
    let lo = summary.min - 3.0 * bandwidth;
    let hi = summary.max + 3.0 * bandwidth;
    let step = (hi - lo) / (points - 1) as f64;
    let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());

    (0..points)
        .map(|idx| {
            let x = lo + step * idx as f64;
            let y = values
                .iter()
                .map(|v| (-0.5 * ((x - v) / bandwidth).powi(2)).exp())
                .sum::<f64>()
                * norm;
            DensityPoint { x, y }
        })
        .collect()
}

/// Pearson correlation of paired values, `None` when undefined.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Count co-occurrences of `(row, column)` pairs for the given keys.
///
/// Pairs whose row or column is not among the keys are ignored; the result is
/// indexed `[row][column]` following the key order.
pub fn crosstab<S: AsRef<str>>(
    pairs: &[(S, S)],
    row_keys: &[String],
    column_keys: &[String],
) -> Vec<Vec<u64>> {
    let mut cells = vec![vec![0u64; column_keys.len()]; row_keys.len()];
    for (row, column) in pairs {
        let Some(r) = row_keys.iter().position(|key| key == row.as_ref()) else {
            continue;
        };
        let Some(c) = column_keys.iter().position(|key| key == column.as_ref()) else {
            continue;
        };
        cells[r][c] += 1;
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn value_counts_orders_by_count_then_label() {
        let counts = value_counts(["ME", "EE", "ME", "CHE", "EE", "ME", "ARC"]);
        assert_eq!(
            counts,
            vec![
                ("ME".to_string(), 3),
                ("EE".to_string(), 2),
                ("ARC".to_string(), 1),
                ("CHE".to_string(), 1),
            ]
        );
        assert_eq!(top_labels(&counts, 2), vec!["ME", "EE"]);
    }

    #[test]
    fn describe_matches_linear_quantiles() {
        let summary = Summary::describe(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(summary.count, 4);
        assert!(approx(summary.mean, 2.5));
        assert!(approx(summary.q1, 1.75));
        assert!(approx(summary.median, 2.5));
        assert!(approx(summary.q3, 3.25));
        assert!(approx(summary.std, (5.0f64 / 3.0).sqrt()));
        assert!(Summary::describe(&[]).is_none());
        assert_eq!(Summary::describe(&[2.0]).unwrap().std, 0.0);
    }

    #[test]
    fn box_stats_flags_outliers() {
        let stats = BoxStats::from_values(&[1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 40.0]).unwrap();
        assert_eq!(stats.outliers, vec![40.0]);
        assert!(approx(stats.whisker_low, 1.0));
        assert!(approx(stats.whisker_high, 4.0));
    }

    #[test]
    fn histogram_includes_max_in_last_bin() {
        let bins = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[1].count, 3);
        assert!(approx(bins[1].end, 4.0));

        let flat = histogram(&[5.0, 5.0], 10);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].count, 2);
        assert!(histogram(&[], 5).is_empty());
    }

    #[test]
    fn kde_integrates_to_roughly_one() {
        let values = [2.0, 2.5, 3.0, 3.1, 3.4, 3.9];
        let curve = gaussian_kde(&values, 200);
        let step = curve[1].x - curve[0].x;
        let area: f64 = curve.iter().map(|p| p.y * step).sum();
        assert!((area - 1.0).abs() < 0.02, "area {area}");
        assert!(gaussian_kde(&[1.0, 1.0], 50).is_empty());
    }

    #[test]
    fn pearson_detects_perfect_correlation() {
        let r = pearson(&[(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)]).unwrap();
        assert!(approx(r, 1.0));
        assert!(pearson(&[(1.0, 1.0), (1.0, 2.0)]).is_none());
    }

    #[test]
    fn crosstab_counts_known_pairs() {
        let pairs = vec![("U1", "ME"), ("U1", "ME"), ("U2", "EE"), ("U3", "ME")];
        let rows = vec!["U1".to_string(), "U2".to_string()];
        let cols = vec!["EE".to_string(), "ME".to_string()];
        assert_eq!(crosstab(&pairs, &rows, &cols), vec![vec![0, 2], vec![1, 0]]);
    }
}
