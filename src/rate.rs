//! # Binned count rates
//! Time stamps of a detector are turned into a rate curve (events/s) over a
//! fixed window. Bins are half-open `[e_i, e_{i+1})`.
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Absorbs rounding in `(end - start) / width`, e.g. `(80 - 40) / 0.1`.
const EDGE_TOLERANCE: f64 = 1e-9;

/// Upper bound on the number of bins of a single curve.
pub const MAX_BINS: usize = 100_000_000;

/// Bin centres and rates (events/s) of equal length.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RateCurve {
    pub centres: Vec<f64>,
    pub rate: Vec<f64>,
}

impl RateCurve {
    /// Build a curve from already computed points (reference instruments).
    pub fn new(centres: Vec<f64>, rate: Vec<f64>) -> Result<Self> {
        if centres.len() != rate.len() {
            return Err(Error::LengthMismatch {
                centres: centres.len(),
                rate: rate.len(),
            });
        }
        Ok(Self { centres, rate })
    }

    pub fn len(&self) -> usize {
        self.rate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rate.is_empty()
    }

    /// Same curve with centres measured from `origin`.
    pub fn shifted(&self, origin: f64) -> Self {
        Self {
            centres: self.centres.iter().map(|t| t - origin).collect(),
            rate: self.rate.clone(),
        }
    }

    fn scaled(&self, factor: f64) -> Self {
        Self {
            centres: self.centres.clone(),
            rate: self.rate.iter().map(|r| r / factor).collect(),
        }
    }
}

fn check_width(width: f64) -> Result<()> {
    if !(width > 0.0) || !width.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "bin width must be positive and finite, got {width}"
        )));
    }
    Ok(())
}

/// Edges `start + k * width` up to `end`. A trailing partial bin is never
/// produced; `end <= start` gives no edges.
pub fn bin_edges(start: f64, end: f64, width: f64) -> Result<Vec<f64>> {
    check_width(width)?;
    if !start.is_finite() || !end.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "window must be finite, got {start}..{end}"
        )));
    }
    if end <= start {
        return Ok(vec![]);
    }

    let span = ((end - start) / width + EDGE_TOLERANCE).floor();
    if span > MAX_BINS as f64 {
        return Err(Error::InvalidArgument(format!(
            "{start}..{end} in steps of {width} needs {span:e} bins, at most {MAX_BINS} allowed"
        )));
    }

    // the last edge may not pass `end` by more than rounding
    let limit = end + 4.0 * f64::EPSILON * end.abs().max(1.0);
    let mut bins = span as usize;
    while bins > 0 && start + bins as f64 * width > limit {
        bins -= 1;
    }
    if bins == 0 {
        return Ok(vec![]);
    }

    Ok((0..=bins).map(|k| start + k as f64 * width).collect())
}

/// Number of (sorted) `times` in each `[e_i, e_{i+1})`.
pub fn bin_counts(times: &[f64], edges: &[f64]) -> Vec<u64> {
    edges
        .iter()
        .map(|edge| times.partition_point(|t| t < edge))
        .tuple_windows()
        .map(|(lo, hi)| (hi - lo) as u64)
        .collect()
}

/// Count rate of `times` (seconds, non-decreasing) averaged over `width`.
pub fn count_rate(times: &[f64], start: f64, end: f64, width: f64) -> Result<RateCurve> {
    let edges = bin_edges(start, end, width)?;

    let rate = bin_counts(times, &edges)
        .into_iter()
        .map(|counts| counts as f64 / width)
        .collect();

    let centres = edges
        .iter()
        .tuple_windows()
        .map(|(left, right)| (left + right) / 2.0)
        .collect();

    Ok(RateCurve { centres, rate })
}

/// Trapezoidal integral of `y` over sample points `x`.
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .tuple_windows()
        .map(|((x0, y0), (x1, y1))| (x1 - x0) * (y0 + y1) / 2.0)
        .sum()
}

/// Integral of the points whose centres are strictly inside `(start, end)`.
pub fn window_integral(curve: &RateCurve, start: f64, end: f64) -> f64 {
    let (x, y): (Vec<f64>, Vec<f64>) = curve
        .centres
        .iter()
        .zip(&curve.rate)
        .filter(|(t, _)| start < **t && **t < end)
        .map(|(t, r)| (*t, *r))
        .unzip();
    trapezoid(&x, &y)
}

/// Divide the curve by its own integral so it integrates to 1.
pub fn normalize_by_integral(curve: &RateCurve) -> Result<RateCurve> {
    let integral = trapezoid(&curve.centres, &curve.rate);
    if integral == 0.0 || !integral.is_finite() {
        return Err(Error::ZeroIntegral(integral));
    }
    Ok(curve.scaled(integral))
}

/// How a curve is scaled before it is overlaid with other systems.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Normalization {
    #[default]
    None,
    Peak,
    Integral,
    /// integral over the centres inside `(start, end)`
    Window { start: f64, end: f64 },
}

impl Normalization {
    pub fn apply(&self, curve: &RateCurve) -> Result<RateCurve> {
        match *self {
            Normalization::None => Ok(curve.clone()),
            Normalization::Peak => {
                let peak = curve.rate.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                if peak == 0.0 || !peak.is_finite() {
                    return Err(Error::ZeroPeak(peak));
                }
                Ok(curve.scaled(peak))
            }
            Normalization::Integral => normalize_by_integral(curve),
            Normalization::Window { start, end } => {
                let integral = window_integral(curve, start, end);
                if integral == 0.0 || !integral.is_finite() {
                    return Err(Error::ZeroIntegral(integral));
                }
                Ok(curve.scaled(integral))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len(), "{a:?} vs {b:?}");
        a.iter().zip(b).for_each(|(x, y)| {
            assert!((x - y).abs() < 1e-9, "{a:?} vs {b:?}");
        });
    }

    #[test]
    fn counts_unit_bins() {
        let times = [1.0, 1.5, 2.2, 2.3, 3.9];
        let edges = bin_edges(0.0, 4.0, 1.0).unwrap();
        assert_close(&edges, &[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(bin_counts(&times, &edges), vec![0, 2, 2, 1]);

        let curve = count_rate(&times, 0.0, 4.0, 1.0).unwrap();
        assert_close(&curve.rate, &[0.0, 2.0, 2.0, 1.0]);
        assert_close(&curve.centres, &[0.5, 1.5, 2.5, 3.5]);
    }

    #[test]
    fn rate_divides_by_width() {
        let times = [0.1, 0.2, 0.3, 0.6];
        let curve = count_rate(&times, 0.0, 1.0, 0.5).unwrap();
        assert_close(&curve.rate, &[6.0, 2.0]);
        assert_close(&curve.centres, &[0.25, 0.75]);
    }

    #[test]
    fn zero_width_is_rejected() {
        assert!(matches!(
            count_rate(&[1.0], 0.0, 4.0, 0.0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            count_rate(&[1.0], 0.0, 4.0, -1.0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            count_rate(&[1.0], 0.0, 4.0, f64::NAN),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn reversed_window_is_empty() {
        let curve = count_rate(&[1.0, 2.0], 4.0, 0.0, 1.0).unwrap();
        assert!(curve.is_empty());
        assert!(curve.centres.is_empty());

        let curve = count_rate(&[1.0, 2.0], 4.0, 4.0, 1.0).unwrap();
        assert!(curve.is_empty());
    }

    #[test]
    fn no_partial_trailing_bin() {
        let edges = bin_edges(0.0, 4.5, 1.0).unwrap();
        assert_close(&edges, &[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert!(bin_edges(0.0, 0.5, 1.0).unwrap().is_empty());
    }

    #[test]
    fn fractional_width_covers_full_window() {
        // 40..80 in 0.1 s steps has 400 bins despite rounding in the division
        let edges = bin_edges(40.0, 80.0, 0.1).unwrap();
        assert_eq!(edges.len(), 401);
        assert!((edges[400] - 80.0).abs() < 1e-9);
        edges.windows(2).for_each(|w| assert!(w[1] > w[0]));

        let curve = count_rate(&[], 40.0, 80.0, 0.006).unwrap();
        assert_eq!(curve.len(), 6666);
    }

    #[test]
    fn too_many_bins_are_rejected() {
        assert!(matches!(
            bin_edges(0.0, 1.0, 1e-300),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            count_rate(&[1.0], 40.0, 80.0, 1e-12),
            Err(Error::InvalidArgument(_))
        ));
        assert!(bin_edges(0.0, 2.0 * MAX_BINS as f64, 1.0).is_err());
    }

    #[test]
    fn last_edge_stays_inside_window() {
        let end = 4.0 - 1e-10;
        let edges = bin_edges(0.0, end, 1.0).unwrap();
        assert_close(&edges, &[0.0, 1.0, 2.0, 3.0]);

        let curve = count_rate(&[3.99999999995], 0.0, end, 1.0).unwrap();
        assert_close(&curve.rate, &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn empty_times_give_zero_curve() {
        let empty = count_rate(&[], 0.0, 4.0, 1.0).unwrap();
        let full = count_rate(&[1.0, 1.5, 2.2, 2.3, 3.9], 0.0, 4.0, 1.0).unwrap();
        assert_eq!(empty.centres, full.centres);
        assert!(empty.rate.iter().all(|r| *r == 0.0));
    }

    #[test]
    fn total_counts_match_window() {
        let times = [-1.0, 0.0, 0.4, 0.4, 1.7, 2.0, 2.9, 3.0, 3.5];
        let edges = bin_edges(0.0, 3.0, 0.5).unwrap();
        let total: u64 = bin_counts(&times, &edges).iter().sum();
        let inside = times.iter().filter(|t| (0.0..3.0).contains(*t)).count() as u64;
        assert_eq!(total, inside);
    }

    #[test]
    fn trapezoid_of_constant() {
        assert!((trapezoid(&[0.0, 1.0, 2.0], &[3.0, 3.0, 3.0]) - 6.0).abs() < 1e-12);
        assert_eq!(trapezoid(&[1.0], &[5.0]), 0.0);
        assert_eq!(trapezoid(&[], &[]), 0.0);
    }

    #[test]
    fn integral_normalization_is_idempotent() {
        let times = [1.0, 1.5, 2.2, 2.3, 3.9];
        let curve = count_rate(&times, 0.0, 4.0, 1.0).unwrap();

        let once = normalize_by_integral(&curve).unwrap();
        assert!((trapezoid(&once.centres, &once.rate) - 1.0).abs() < 1e-12);

        let twice = normalize_by_integral(&once).unwrap();
        assert_close(&once.rate, &twice.rate);
    }

    #[test]
    fn zero_integral_fails() {
        let curve = count_rate(&[], 0.0, 4.0, 1.0).unwrap();
        assert!(matches!(
            normalize_by_integral(&curve),
            Err(Error::ZeroIntegral(_))
        ));
        assert!(matches!(
            Normalization::Peak.apply(&curve),
            Err(Error::ZeroPeak(_))
        ));
    }

    #[test]
    fn normalization_strategies() {
        let curve = RateCurve::new(vec![0.5, 1.5, 2.5, 3.5], vec![1.0, 4.0, 2.0, 2.0]).unwrap();

        assert_eq!(Normalization::None.apply(&curve).unwrap(), curve);
        assert_close(
            &Normalization::Peak.apply(&curve).unwrap().rate,
            &[0.25, 1.0, 0.5, 0.5],
        );

        // only centres 1.5 and 2.5 are inside, integral (4 + 2) / 2 = 3
        let window = Normalization::Window { start: 1.0, end: 3.0 };
        assert!((window_integral(&curve, 1.0, 3.0) - 3.0).abs() < 1e-12);
        assert_close(
            &window.apply(&curve).unwrap().rate,
            &[1.0 / 3.0, 4.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0],
        );
    }

    #[test]
    fn normalization_from_yaml() {
        let window: Normalization = serde_yaml::from_str("kind: window\nstart: 48.0\nend: 53.0").unwrap();
        assert_eq!(window, Normalization::Window { start: 48.0, end: 53.0 });
        let peak: Normalization = serde_yaml::from_str("kind: peak").unwrap();
        assert_eq!(peak, Normalization::Peak);
    }

    #[test]
    fn mismatched_reference_curve() {
        assert_eq!(
            RateCurve::new(vec![1.0, 2.0], vec![1.0]),
            Err(Error::LengthMismatch { centres: 2, rate: 1 })
        );
    }

    #[test]
    fn shift_to_origin() {
        let curve = RateCurve::new(vec![40.5, 41.5], vec![1.0, 2.0]).unwrap();
        let shifted = curve.shifted(40.0);
        assert_close(&shifted.centres, &[0.5, 1.5]);
        assert_eq!(shifted.rate, curve.rate);
    }
}
