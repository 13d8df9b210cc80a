//! Finds spikes in a standardised signal and cross-checks them between
//! the amplitude and slope domains.
//!
//! Typical usage:
//! ```ignore
//! let raw_peaks = find_peaks(&raw, Polarity::Positive, 3.0, windows.raw_min_distance);
//! let derivative_peaks = find_peaks(&derivative, Polarity::Negative, 3.0, windows.derivative_min_distance);
//! let band = Band::new(windows.raw_min_distance, windows.band_upper);
//! let raw_peaks = filter_by_band(&raw_peaks, &band, len);
//! let derivative_peaks = filter_by_band(&derivative_peaks, &band, len);
//! let spikes = reconcile(&raw_peaks, &derivative_peaks, windows.reconciliation_window);
//! ```

mod band_filter;
pub(crate) mod detectors;
mod distance;
pub(crate) mod iterators;
mod reconciler;

pub use band_filter::{Band, filter_by_band};
pub use reconciler::reconcile;

use detectors::local_maximum_detector::LocalMaximumDetector;
use distance::select_by_distance;
use iterators::EventFilter;
use serde::Serialize;
use swd_common::{Real, SampleIndex};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Peak {
    pub index: SampleIndex,
    pub value: Real,
}

/// Negative polarity searches for troughs by negating the series.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    #[default]
    Positive,
    Negative,
}

impl Polarity {
    fn sign(self) -> Real {
        match self {
            Polarity::Positive => 1.0,
            Polarity::Negative => -1.0,
        }
    }
}

/// Strict local maxima of `polarity * series` exceeding `min_height`, no two closer than
/// `min_distance` samples. Of two maxima closer than that, the taller survives, and of
/// two equally tall the earlier one. Reported values carry the polarity.
pub fn find_peaks(
    series: &[Real],
    polarity: Polarity,
    min_height: Real,
    min_distance: usize,
) -> Vec<Peak> {
    let sign = polarity.sign();
    let candidates = series
        .iter()
        .enumerate()
        .map(|(i, &v)| (i, sign * v))
        .events(LocalMaximumDetector::new(min_height))
        .collect();
    select_by_distance(candidates, min_distance)
}
