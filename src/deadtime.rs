//! # Dead time
//! Distributions of time between consecutive events. A depleted region at
//! small deltas shows the dead time of the acquisition system.
use itertools::Itertools;

use crate::{error::Result, rate::bin_edges};

#[derive(Debug, Clone, PartialEq)]
pub struct DeltaHistogram {
    pub edges: Vec<f64>,
    pub centres: Vec<f64>,
    pub counts: Vec<u64>,
}

impl DeltaHistogram {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Differences between consecutive time stamps.
pub fn time_deltas(times: &[i64]) -> Vec<i64> {
    times.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Bins are `[e_i, e_{i+1})`, the last one also holds its right edge.
/// Values outside the edges are dropped.
pub fn histogram(values: &[f64], edges: &[f64]) -> Vec<u64> {
    let bins = edges.len().saturating_sub(1);
    let mut counts = vec![0; bins];
    if bins == 0 {
        return counts;
    }

    let (first, last) = (edges[0], edges[bins]);
    for &value in values {
        if !(first..=last).contains(&value) {
            continue;
        }
        let idx = edges.partition_point(|e| *e <= value).saturating_sub(1).min(bins - 1);
        counts[idx] += 1;
    }
    counts
}

/// Pooled histogram of the deltas of every stream over `0..=max` in steps of
/// `width`. Deltas never cross from one stream into the next.
pub fn delta_histogram(streams: &[Vec<i64>], width: f64, max: f64) -> Result<DeltaHistogram> {
    let edges = bin_edges(0.0, max, width)?;

    let deltas = streams
        .iter()
        .flat_map(|times| time_deltas(times))
        .map(|delta| delta as f64)
        .collect::<Vec<_>>();

    let counts = histogram(&deltas, &edges);
    let centres = edges
        .iter()
        .tuple_windows()
        .map(|(left, right)| (left + right) / 2.0)
        .collect();

    Ok(DeltaHistogram { edges, centres, counts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn deltas_of_stream() {
        assert_eq!(time_deltas(&[10, 12, 20, 20]), vec![2, 8, 0]);
        assert!(time_deltas(&[5]).is_empty());
        assert!(time_deltas(&[]).is_empty());
    }

    #[test]
    fn last_bin_is_closed() {
        let edges = [0.0, 2.0, 4.0];
        assert_eq!(histogram(&[0.0, 1.9, 2.0, 4.0, 4.1, -0.1], &edges), vec![2, 2]);
        assert!(histogram(&[1.0], &[0.0]).is_empty());
    }

    #[test]
    fn streams_are_not_joined() {
        // joining the streams would add a negative delta of -1000
        let streams = vec![vec![1000, 1002, 1010], vec![0, 4]];
        let hist = delta_histogram(&streams, 2.0, 260.0).unwrap();

        assert_eq!(hist.edges.len(), 131);
        assert_eq!(hist.centres.len(), 130);
        assert_eq!(hist.total(), 3);
        assert_eq!(hist.counts[1], 1);
        assert_eq!(hist.counts[2], 1);
        assert_eq!(hist.counts[4], 1);
    }

    #[test]
    fn invalid_width() {
        assert!(matches!(
            delta_histogram(&[], 0.0, 260.0),
            Err(Error::InvalidArgument(_))
        ));
    }
}
