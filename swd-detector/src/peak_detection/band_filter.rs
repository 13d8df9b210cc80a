use super::Peak;
use swd_common::SampleIndex;

/// An open interval of inter-peak gaps, in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub lower: usize,
    pub upper: usize,
}

impl Band {
    pub fn new(lower: usize, upper: usize) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, gap: usize) -> bool {
        self.lower < gap && gap < self.upper
    }
}

/// Keeps the peaks whose gap to the preceding or to the following peak lies inside the band.
/// The start of the recording acts as a predecessor of the first peak and its end as the
/// successor of the last, so edge peaks can qualify.
/// Order is preserved and the filter is idempotent.
pub fn filter_by_band(peaks: &[Peak], band: &Band, recording_length: usize) -> Vec<Peak> {
    let position = |i: Option<usize>, sentinel: SampleIndex| {
        i.and_then(|i| peaks.get(i)).map_or(sentinel, |p| p.index)
    };
    peaks
        .iter()
        .enumerate()
        .filter(|&(i, peak)| {
            let previous = position(i.checked_sub(1), 0);
            let next = position(Some(i + 1), recording_length);
            band.contains(peak.index.saturating_sub(previous))
                || band.contains(next.saturating_sub(peak.index))
        })
        .map(|(_, peak)| *peak)
        .collect()
}
