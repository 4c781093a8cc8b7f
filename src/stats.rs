//! Statistics computed by the charts themselves
//!
//! Everything here works on plain `f64` slices that already had missing
//! values removed. Functions never panic on empty input; they return empty
//! results or `None` instead.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Points on an evaluated density curve
const KDE_GRID_POINTS: usize = 200;

/// How far past the data a density curve extends, in bandwidths
const KDE_CUT: f64 = 3.0;

/// Group aggregate for category bar charts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    #[default]
    Mean,
    Sum,
    Count,
}

impl Aggregate {
    pub const ALL: [Aggregate; 3] = [Aggregate::Mean, Aggregate::Sum, Aggregate::Count];

    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Mean => "mean",
            Aggregate::Sum => "sum",
            Aggregate::Count => "count",
        }
    }

    pub fn apply(&self, values: &[f64]) -> f64 {
        match self {
            Aggregate::Mean => mean(values).unwrap_or(0.0),
            Aggregate::Sum => values.iter().sum(),
            Aggregate::Count => values.len() as f64,
        }
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1)
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut iter = values.iter().copied();
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
}

/// Linear-interpolation percentile of already sorted data, `p` in [0, 1]
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted_data[0];
    }

    let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}

/// Five-number summary with Tukey fences
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
    if values.is_empty() {
        return None;
    }
    let ys = sorted(values);

    let q1 = percentile(&ys, 0.25);
    let median = percentile(&ys, 0.50);
    let q3 = percentile(&ys, 0.75);
    let iqr = q3 - q1;

    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    // whiskers reach the most extreme data inside the fences
    let lower_whisker = ys.iter().copied().find(|&v| v >= lower_fence).unwrap_or(q1);
    let upper_whisker = ys.iter().rev().copied().find(|&v| v <= upper_fence).unwrap_or(q3);

    let outliers = ys
        .iter()
        .copied()
        .filter(|&v| v < lower_fence || v > upper_fence)
        .collect();

    Some(BoxStats {
        q1,
        median,
        q3,
        lower_whisker,
        upper_whisker,
        outliers,
    })
}

/// Silverman's rule of thumb for bandwidth selection
pub fn silverman_bandwidth(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    let std_dev = match std_dev(data) {
        Some(s) => s,
        None => return 1.0,
    };

    // IQR-based estimate for robustness
    let ys = sorted(data);
    let iqr = percentile(&ys, 0.75) - percentile(&ys, 0.25);

    // h = 0.9 * min(std, IQR/1.34) * n^(-1/5)
    let scale = if iqr > 0.0 { std_dev.min(iqr / 1.34) } else { std_dev };
    if scale <= 0.0 {
        return 1.0;
    }
    0.9 * scale * n.powf(-0.2)
}

fn gaussian_kernel(u: f64) -> f64 {
    const SQRT_2PI: f64 = 2.5066282746310002;
    (-0.5 * u * u).exp() / SQRT_2PI
}

/// An evaluated curve, `x` ascending
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Curve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Curve {
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn points(&self) -> Vec<(f64, f64)> {
        self.x.iter().copied().zip(self.y.iter().copied()).collect()
    }

    pub fn max_y(&self) -> f64 {
        self.y.iter().copied().fold(0.0, f64::max)
    }
}

/// Gaussian KDE over the data range extended by three bandwidths; integrates to ~1
pub fn kde(data: &[f64]) -> Curve {
    let bandwidth = silverman_bandwidth(data);
    match min_max(data) {
        Some((lo, hi)) => kde_on(data, bandwidth, lo - KDE_CUT * bandwidth, hi + KDE_CUT * bandwidth),
        None => Curve::default(),
    }
}

/// Gaussian KDE evaluated on an explicit grid range
pub fn kde_on(data: &[f64], bandwidth: f64, start: f64, end: f64) -> Curve {
    let n = data.len() as f64;
    if data.is_empty() || !(end > start) || bandwidth <= 0.0 {
        return Curve::default();
    }

    let step = (end - start) / (KDE_GRID_POINTS - 1) as f64;
    let mut curve = Curve {
        x: Vec::with_capacity(KDE_GRID_POINTS),
        y: Vec::with_capacity(KDE_GRID_POINTS),
    };

    for i in 0..KDE_GRID_POINTS {
        let x = start + i as f64 * step;
        let d: f64 = data.iter().map(|&xi| gaussian_kernel((x - xi) / bandwidth)).sum();
        curve.x.push(x);
        curve.y.push(d / (n * bandwidth));
    }

    curve
}

/// Equal-width histogram
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `counts.len() + 1` ascending edges
    pub edges: Vec<f64>,
    pub counts: Vec<f64>,
}

impl Histogram {
    pub fn bin_width(&self) -> f64 {
        if self.edges.len() < 2 {
            0.0
        } else {
            self.edges[1] - self.edges[0]
        }
    }

    /// Rescale counts so the bar areas sum to one
    pub fn into_density(mut self) -> Self {
        let total: f64 = self.counts.iter().sum();
        let width = self.bin_width();
        if total > 0.0 && width > 0.0 {
            for c in &mut self.counts {
                *c /= total * width;
            }
        }
        self
    }
}

/// Bin range shared by every group of a chart; degenerate ranges widen to one unit
pub fn bin_range(values: &[f64]) -> Option<(f64, f64)> {
    let (lo, hi) = min_max(values)?;
    if lo == hi {
        Some((lo - 0.5, hi + 0.5))
    } else {
        Some((lo, hi))
    }
}

/// Count values into `bins` equal bins over `range`; the last bin is closed on the right
pub fn histogram(values: &[f64], bins: usize, range: (f64, f64)) -> Histogram {
    let bins = bins.max(1);
    let (lo, hi) = range;
    let width = (hi - lo) / bins as f64;

    let edges = (0..=bins).map(|i| lo + i as f64 * width).collect();
    let mut counts = vec![0.0; bins];
    for &v in values {
        if v < lo || v > hi {
            continue;
        }
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1.0;
    }

    Histogram { edges, counts }
}

/// Empirical CDF as a step curve: sorted values against cumulative fraction
pub fn ecdf(values: &[f64]) -> Curve {
    let xs = sorted(values);
    let n = xs.len() as f64;
    let y = (1..=xs.len()).map(|i| i as f64 / n).collect();
    Curve { x: xs, y }
}

/// Ordinary least squares fit of `y = intercept + slope * x`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    n: usize,
    x_mean: f64,
    sxx: f64,
    residual_se: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// Half-width of the 95% confidence band for the mean response at `x`
    pub fn band(&self, x: f64) -> f64 {
        if self.n < 3 {
            return 0.0;
        }
        let leverage = 1.0 / self.n as f64 + (x - self.x_mean).powi(2) / self.sxx;
        t_975(self.n - 2) * self.residual_se * leverage.sqrt()
    }
}

/// None with fewer than two points or no spread in x
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let x_mean = mean(&xs[..n])?;
    let y_mean = mean(&ys[..n])?;

    let sxx: f64 = xs[..n].iter().map(|x| (x - x_mean).powi(2)).sum();
    if sxx <= 0.0 {
        return None;
    }
    let sxy: f64 = xs[..n]
        .iter()
        .zip(&ys[..n])
        .map(|(x, y)| (x - x_mean) * (y - y_mean))
        .sum();

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;

    let sse: f64 = xs[..n]
        .iter()
        .zip(&ys[..n])
        .map(|(x, y)| (y - (intercept + slope * x)).powi(2))
        .sum();
    let residual_se = if n > 2 { (sse / (n - 2) as f64).sqrt() } else { 0.0 };

    Some(LinearFit {
        slope,
        intercept,
        n,
        x_mean,
        sxx,
        residual_se,
    })
}

/// Two-sided 95% Student t critical value
fn t_975(df: usize) -> f64 {
    const TABLE: [f64; 30] = [
        12.706, 4.303, 3.182, 2.776, 2.571, 2.447, 2.365, 2.306, 2.262, 2.228, 2.201, 2.179, 2.160, 2.145,
        2.131, 2.120, 2.110, 2.101, 2.093, 2.086, 2.080, 2.074, 2.069, 2.064, 2.060, 2.056, 2.052, 2.048,
        2.045, 2.042,
    ];
    match df {
        0 => f64::NAN,
        1..=30 => TABLE[df - 1],
        31..=60 => 2.000,
        61..=120 => 1.980,
        _ => 1.960,
    }
}

/// Pearson correlation; NaN when either side has no variance
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    let (Some(mx), Some(my)) = (mean(&xs[..n]), mean(&ys[..n])) else {
        return f64::NAN;
    };

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Row indices grouped by key, groups in first-occurrence order
pub fn group_indices<'a, I>(keys: I) -> Vec<(String, Vec<usize>)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for (row, key) in keys.into_iter().enumerate() {
        match index.get(key) {
            Some(&i) => groups[i].1.push(row),
            None => {
                index.insert(key, groups.len());
                groups.push((key.to_string(), vec![row]));
            }
        }
    }

    groups
}

/// Aggregate `values` per category and order groups by the aggregate ascending.
/// Ties keep first-occurrence order.
pub fn aggregate_by(categories: &[&str], values: &[f64], agg: Aggregate) -> Vec<(String, f64)> {
    let mut out: Vec<(String, f64)> = group_indices(categories.iter().copied())
        .into_iter()
        .map(|(key, rows)| {
            let group: Vec<f64> = rows.iter().map(|&r| values[r]).collect();
            (key, agg.apply(&group))
        })
        .collect();

    out.sort_by(|a, b| a.1.total_cmp(&b.1));
    out
}

/// Mean of `y` per distinct `x`, ascending in `x`
pub fn mean_by_x(xs: &[f64], ys: &[f64]) -> Vec<(f64, f64)> {
    let mut pairs: Vec<(f64, f64)> = xs.iter().copied().zip(ys.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut out: Vec<(f64, f64)> = Vec::new();
    let mut i = 0;
    while i < pairs.len() {
        let x = pairs[i].0;
        let mut j = i;
        let mut total = 0.0;
        while j < pairs.len() && pairs[j].0 == x {
            total += pairs[j].1;
            j += 1;
        }
        out.push((x, total / (j - i) as f64));
        i = j;
    }
    out
}

/// Round step to 1, 2, 2.5 or 5 times a power of ten
fn nice_step(span: f64, target: usize) -> f64 {
    let raw = span / target.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 2.5 {
        2.5
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

const MAX_TICKS: usize = 50;

/// Round tick positions inside `[lo, hi]`, roughly `target` of them.
/// Falls back to the two endpoints when the step is below float resolution.
pub fn nice_ticks(lo: f64, hi: f64, target: usize) -> Vec<f64> {
    if !lo.is_finite() || !hi.is_finite() || hi <= lo {
        return vec![lo];
    }
    let step = nice_step(hi - lo, target);
    if !step.is_finite() || step <= 0.0 {
        return vec![lo, hi];
    }
    let first = (lo / step).ceil();
    // snap away float noise such as 0.6000000000000001
    let decimals = (1.0 - step.log10().floor()).max(0.0);
    let scale = 10f64.powf(decimals);

    let mut ticks: Vec<f64> = Vec::new();
    for i in 0..=MAX_TICKS {
        let raw = (first + i as f64) * step;
        if raw > hi + step * 1e-9 {
            if ticks.is_empty() {
                break;
            }
            return ticks;
        }
        let t = (raw * scale).round() / scale;
        let t = if t.is_finite() { t } else { raw };
        if ticks.last().is_some_and(|&prev| t <= prev) {
            break;
        }
        ticks.push(if t == 0.0 { 0.0 } else { t });
    }
    vec![lo, hi]
}

/// Data range padded by `pad` of its span; degenerate ranges widen to one unit
pub fn padded_range(lo: f64, hi: f64, pad: f64) -> (f64, f64) {
    if hi > lo {
        let margin = (hi - lo) * pad;
        (lo - margin, hi + margin)
    } else {
        (lo - 1.0, hi + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&data, 0.0), 1.0);
        assert_eq!(percentile(&data, 1.0), 4.0);
        assert!((percentile(&data, 0.5) - 2.5).abs() < 1e-12);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_box_stats_outliers() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let stats = box_stats(&data).unwrap();
        assert_eq!(stats.outliers, vec![100.0]);
        assert_eq!(stats.upper_whisker, 5.0);
        assert_eq!(stats.lower_whisker, 1.0);
        assert!(box_stats(&[]).is_none());
    }

    #[test]
    fn test_kde_integrates_to_one() {
        let data = [1.0, 2.0, 2.5, 3.0, 7.0];
        let curve = kde(&data);
        assert_eq!(curve.x.len(), KDE_GRID_POINTS);
        let step = curve.x[1] - curve.x[0];
        let area: f64 = curve.y.iter().sum::<f64>() * step;
        assert!((area - 1.0).abs() < 0.02, "area = {}", area);
    }

    #[test]
    fn test_kde_single_value() {
        let curve = kde(&[5.0]);
        assert!(!curve.is_empty());
        assert!(kde(&[]).is_empty());
    }

    #[test]
    fn test_histogram_counts_every_value() {
        let data = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let hist = histogram(&data, 5, bin_range(&data).unwrap());
        assert_eq!(hist.edges.len(), 6);
        assert_eq!(hist.counts.iter().sum::<f64>(), 11.0);
        // max lands in the last bin
        assert_eq!(hist.counts[4], 3.0);
    }

    #[test]
    fn test_histogram_density_area() {
        let data = [1.0, 1.5, 2.0, 4.0];
        let hist = histogram(&data, 3, bin_range(&data).unwrap()).into_density();
        let area: f64 = hist.counts.iter().map(|c| c * hist.bin_width()).sum();
        assert!((area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ecdf_steps() {
        let curve = ecdf(&[3.0, 1.0, 2.0, 2.0]);
        assert_eq!(curve.x, vec![1.0, 2.0, 2.0, 3.0]);
        assert_eq!(curve.y, vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_linear_fit_exact_line() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [3.0, 5.0, 7.0, 9.0];
        let fit = linear_fit(&xs, &ys).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!(fit.band(2.5).abs() < 1e-9);
        assert!(linear_fit(&[1.0, 1.0], &[2.0, 3.0]).is_none());
    }

    #[test]
    fn test_band_widens_away_from_mean() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [1.1, 1.9, 3.2, 3.9, 5.1];
        let fit = linear_fit(&xs, &ys).unwrap();
        assert!(fit.band(5.0) > fit.band(3.0));
    }

    #[test]
    fn test_pearson() {
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) + 1.0).abs() < 1e-12);
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
    }

    #[test]
    fn test_aggregate_by_sorts_ascending_with_stable_ties() {
        let cats = ["b", "a", "c", "a", "b"];
        let vals = [1.0, 2.0, 3.0, 4.0, 5.0];
        let sums = aggregate_by(&cats, &vals, Aggregate::Sum);
        assert_eq!(
            sums,
            vec![("c".to_string(), 3.0), ("b".to_string(), 6.0), ("a".to_string(), 6.0)]
        );

        let counts = aggregate_by(&cats, &vals, Aggregate::Count);
        assert_eq!(counts[0], ("c".to_string(), 1.0));
        assert_eq!(counts[1].0, "b");
        assert_eq!(counts[2].0, "a");
    }

    #[test]
    fn test_mean_by_x() {
        let out = mean_by_x(&[2.0, 1.0, 2.0], &[4.0, 1.0, 6.0]);
        assert_eq!(out, vec![(1.0, 1.0), (2.0, 5.0)]);
    }

    #[test]
    fn test_nice_ticks() {
        assert_eq!(nice_ticks(0.0, 10.0, 5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        let ticks = nice_ticks(0.13, 0.91, 4);
        assert_eq!(ticks, vec![0.2, 0.4, 0.6, 0.8]);
        assert_eq!(nice_ticks(3.0, 3.0, 5), vec![3.0]);
    }

    #[test]
    fn test_nice_ticks_beyond_float_resolution() {
        // 1e16 / 0.5 is past 2^53, so consecutive multiples collapse
        assert_eq!(nice_ticks(1e16, 1e16 + 2.0, 6), vec![1e16, 1e16 + 2.0]);
        let lo = 1.7e18;
        let ticks = nice_ticks(lo, lo + 512.0, 6);
        assert!(ticks.len() <= MAX_TICKS + 1);
        assert!(ticks.windows(2).all(|w| w[0] < w[1]));
    }
}
