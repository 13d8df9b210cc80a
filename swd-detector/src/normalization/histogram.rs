use ndarray::array;
use ndarray_stats::histogram::{self, Bins, Edges, Grid};
use noisy_float::types::N64;
use swd_common::Real;

/// Equal-width histogram over the half-open range `[lower, upper)`.
/// Values outside the range, and non-finite values, are ignored.
#[derive(Debug, Clone)]
pub(crate) struct Histogram {
    centres: Vec<Real>,
    counts: Vec<Real>,
}

pub(crate) fn make_bin_edges(lower: Real, upper: Real, bins: usize) -> Edges<N64> {
    let width = (upper - lower) / bins.max(1) as Real;
    if !(width.is_finite() && width > 0.0) {
        return Edges::from(Vec::new());
    }
    Edges::from(
        (0..=bins.max(1))
            .filter_map(|i| N64::try_new(lower + i as Real * width))
            .collect::<Vec<_>>(),
    )
}

impl Histogram {
    pub(crate) fn new<I>(values: I, lower: Real, upper: Real, bins: usize) -> Self
    where
        I: IntoIterator<Item = Real>,
    {
        let edges = make_bin_edges(lower, upper, bins);
        let bounds: Vec<Real> = edges.as_array_view().iter().map(|e| e.raw()).collect();
        if bounds.len() < 2 {
            return Self {
                centres: Vec::new(),
                counts: Vec::new(),
            };
        }
        let centres = bounds.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();

        let mut histogram = histogram::Histogram::new(Grid::from(vec![Bins::new(edges)]));
        for value in values.into_iter().filter_map(N64::try_new) {
            // out of range
            let _ = histogram.add_observation(&array![value]);
        }
        Self {
            centres,
            counts: histogram.counts().iter().map(|&c| c as Real).collect(),
        }
    }

    pub(crate) fn counts(&self) -> &[Real] {
        &self.counts
    }

    pub(crate) fn centres(&self) -> &[Real] {
        &self.centres
    }

    pub(crate) fn max_count(&self) -> Real {
        self.counts.iter().copied().fold(0.0, Real::max)
    }
}
