//! plotly figures for manual inspection of the curves.
use std::path::Path;

use eyre::{Result, WrapErr};
use plotly::{
    common::{AxisSide, DashType, Line, LineShape, Mode, Title},
    layout::Axis,
    Layout, Plot, Scatter,
};

use crate::{deadtime::DeltaHistogram, rate::RateCurve};

/// Count rates on the left axis, reference rate (if any) on the right one.
pub fn rate_overlay(title: &str, curves: &[(&str, &RateCurve)], reference: Option<(&str, &RateCurve)>) -> Plot {
    let mut plot = Plot::new();

    curves.iter().enumerate().for_each(|(idx, (label, curve))| {
        let line = if idx == 0 { Line::new() } else { Line::new().dash(DashType::Dash) };
        plot.add_trace(
            Scatter::new(curve.centres.clone(), curve.rate.clone())
                .mode(Mode::Lines)
                .name(*label)
                .line(line),
        );
    });

    let mut layout = Layout::new()
        .title(Title::new(title))
        .x_axis(Axis::new().title(Title::new("t_JET, s")))
        .y_axis(Axis::new().title(Title::new("Counts/s")))
        .height(1000);

    if let Some((label, curve)) = reference {
        plot.add_trace(
            Scatter::new(curve.centres.clone(), curve.rate.clone())
                .mode(Mode::Lines)
                .name(label)
                .y_axis("y2"),
        );
        layout = layout.y_axis2(
            Axis::new()
                .title(Title::new("R_n, 1/s"))
                .overlaying("y")
                .side(AxisSide::Right),
        );
    }

    plot.set_layout(layout);
    plot
}

/// Step plot of delta-t histograms.
pub fn delta_overlay(title: &str, histograms: &[(&str, &DeltaHistogram)]) -> Plot {
    let mut plot = Plot::new();

    histograms.iter().for_each(|(label, hist)| {
        plot.add_trace(
            Scatter::new(hist.centres.clone(), hist.counts.clone())
                .mode(Mode::Lines)
                .name(*label)
                .line(Line::new().shape(LineShape::Hv)),
        );
    });

    let layout = Layout::new()
        .title(Title::new(title))
        .x_axis(Axis::new().title(Title::new("delta t, ns")))
        .y_axis(Axis::new().title(Title::new("counts")))
        .height(1000);

    plot.set_layout(layout);
    plot
}

pub fn save(plot: &Plot, filepath: &Path) -> Result<()> {
    if let Some(dir) = filepath.parent() {
        std::fs::create_dir_all(dir).wrap_err_with(|| format!("can't create {dir:?}"))?;
    }
    plot.write_html(filepath);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_holds_all_traces() {
        let tofu = RateCurve::new(vec![0.5, 1.5], vec![2.0, 3.0]).unwrap();
        let tofor = RateCurve::new(vec![0.5, 1.5], vec![1.0, 1.0]).unwrap();
        let kn1 = RateCurve::new(vec![0.0, 1.0, 2.0], vec![1e15, 2e15, 1e15]).unwrap();

        let plot = rate_overlay("JPN 98005", &[("TOFu", &tofu), ("Original DAQ", &tofor)], Some(("Fission chambers", &kn1)));
        let json = plot.to_json();

        assert!(json.contains("TOFu"));
        assert!(json.contains("Original DAQ"));
        assert!(json.contains("Fission chambers"));
        assert!(json.contains("y2"));
    }

    #[test]
    fn save_html() {
        let dir = tempfile::tempdir().unwrap();
        let hist = DeltaHistogram { edges: vec![0.0, 2.0], centres: vec![1.0], counts: vec![3] };
        let filepath = dir.path().join("nested").join("delta.html");

        save(&delta_overlay("JPN 95776", &[("TOFu", &hist)]), &filepath).unwrap();
        assert!(filepath.exists());
    }
}
