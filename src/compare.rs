//! Rate curves of one detector as seen by TOFu and the original DAQ.
use crate::{
    error::Result,
    rate::{count_rate, window_integral, RateCurve},
    workspace::Workspace,
};

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorRates {
    pub tofu: RateCurve,
    pub tofor: RateCurve,
    /// TOFu/TOFOR integral inside the comparison window, `None` when TOFOR
    /// has no counts there.
    pub ratio: Option<f64>,
}

/// Bin both systems with the detector's width, compare them inside the
/// comparison window and normalize. Curves are relative to the time origin.
/// A curve that can't be normalized (no counts) is kept as is.
pub fn detector_rates(
    workspace: &Workspace,
    detector: &str,
    tofu_times: &[f64],
    tofor_times: &[f64],
) -> Result<DetectorRates> {
    let width = workspace.widths.for_detector(detector);
    let window = workspace.window;

    let tofu = count_rate(tofu_times, window.start, window.end, width)?;
    let tofor = count_rate(tofor_times, window.start, window.end, width)?;

    let comparison = workspace.comparison;
    let tofu_n = window_integral(&tofu, comparison.start, comparison.end);
    let tofor_n = window_integral(&tofor, comparison.start, comparison.end);
    let ratio = if tofor_n > 0.0 {
        Some(tofu_n / tofor_n)
    } else {
        log::warn!(
            "{detector}: no TOFOR counts in {}..{} s, TOFu/TOFOR undefined",
            comparison.start,
            comparison.end
        );
        None
    };

    Ok(DetectorRates {
        tofu: normalized(workspace, detector, "TOFu", tofu),
        tofor: normalized(workspace, detector, "TOFOR", tofor),
        ratio,
    })
}

fn normalized(workspace: &Workspace, detector: &str, system: &str, curve: RateCurve) -> RateCurve {
    let curve = match workspace.normalization.apply(&curve) {
        Ok(normalized) => normalized,
        Err(err) => {
            log::warn!("{detector} {system}: {err}, keeping raw count rate");
            curve
        }
    };
    curve.shifted(workspace.time_origin)
}
