use crate::{parameters::SampleWindows, peak_detection::Peak};
use serde::Serialize;
use swd_common::{Real, SampleIndex};
use tracing::debug;

/// A contiguous run of reconciled peaks hypothesised to be one episode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateEvent {
    peaks: Vec<Peak>,
}

impl CandidateEvent {
    /// Returns `None` for an empty run.
    pub fn new(peaks: Vec<Peak>) -> Option<Self> {
        (!peaks.is_empty()).then_some(Self { peaks })
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    pub fn peak_indices(&self) -> impl Iterator<Item = SampleIndex> + '_ {
        self.peaks.iter().map(|p| p.index)
    }

    pub fn peak_values(&self) -> impl Iterator<Item = Real> + '_ {
        self.peaks.iter().map(|p| p.value)
    }

    pub fn first_index(&self) -> SampleIndex {
        self.peaks.first().map(|p| p.index).unwrap_or_default()
    }

    pub fn last_index(&self) -> SampleIndex {
        self.peaks.last().map(|p| p.index).unwrap_or_default()
    }

    pub fn duration_samples(&self) -> usize {
        self.last_index() - self.first_index()
    }

    pub fn midpoint(&self) -> SampleIndex {
        self.first_index() + self.duration_samples() / 2
    }
}

/// A candidate event together with the fixed-length clip of raw signal centred on it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClippedEvent {
    pub event: CandidateEvent,
    pub clip_start: SampleIndex,
    pub clip: Vec<Real>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Segmentation {
    pub events: Vec<ClippedEvent>,
    /// Events dropped for lying too close to either end of the recording.
    pub edge_excluded: usize,
}

#[derive(Debug, Clone)]
pub struct EventSegmenter {
    segment_gap: usize,
    edge_margin: usize,
    clip_length: usize,
}

impl EventSegmenter {
    pub fn new(windows: &SampleWindows) -> Self {
        Self {
            segment_gap: windows.segment_gap,
            edge_margin: windows.edge_margin,
            clip_length: windows.clip_length,
        }
    }

    /// Splits the index-ordered peak stream wherever the gap between
    /// neighbours exceeds the segment gap.
    pub fn group(&self, peaks: &[Peak]) -> Vec<CandidateEvent> {
        peaks
            .chunk_by(|a, b| b.index - a.index <= self.segment_gap)
            .filter_map(|run| CandidateEvent::new(run.to_vec()))
            .collect()
    }

    /// Groups the peaks into events, drops those too close to the recording's edges
    /// and cuts a clip of the un-normalised signal around each survivor.
    #[tracing::instrument(skip_all, fields(num_peaks = peaks.len(), num_events, edge_excluded))]
    pub fn segment(&self, peaks: &[Peak], raw: &[Real]) -> Segmentation {
        let mut segmentation = Segmentation::default();
        for event in self.group(peaks) {
            match self.clip_bounds(&event, raw.len()) {
                Some((start, end)) => segmentation.events.push(ClippedEvent {
                    clip_start: start,
                    clip: raw[start..end].to_vec(),
                    event,
                }),
                None => {
                    debug!(
                        first_peak = event.first_index(),
                        last_peak = event.last_index(),
                        "Event excluded at recording edge"
                    );
                    segmentation.edge_excluded += 1;
                }
            }
        }
        tracing::Span::current().record("num_events", segmentation.events.len());
        tracing::Span::current().record("edge_excluded", segmentation.edge_excluded);
        segmentation
    }

    fn clip_bounds(&self, event: &CandidateEvent, recording_length: usize) -> Option<(usize, usize)> {
        let first = event.first_index();
        if first < self.edge_margin || recording_length.saturating_sub(first) < self.edge_margin {
            return None;
        }
        let start = event.midpoint().checked_sub(self.clip_length / 2)?;
        let end = start + self.clip_length;
        (end <= recording_length).then_some((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter(segment_gap: usize, edge_margin: usize, clip_length: usize) -> EventSegmenter {
        EventSegmenter {
            segment_gap,
            edge_margin,
            clip_length,
        }
    }

    fn peaks(indices: &[usize]) -> Vec<Peak> {
        indices
            .iter()
            .map(|&index| Peak {
                index,
                value: index as Real,
            })
            .collect()
    }

    #[test]
    fn no_peaks_no_events() {
        let segmentation = segmenter(106, 10, 10).segment(&[], &[1.0; 100]);
        assert_eq!(segmentation, Segmentation::default());
    }

    #[test]
    fn large_gaps_split_events() {
        let events = segmenter(106, 0, 0).group(&peaks(&[100, 164, 270, 500, 564]));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].peak_indices().collect::<Vec<_>>(), vec![100, 164, 270]);
        assert_eq!(events[1].peak_values().collect::<Vec<_>>(), vec![500.0, 564.0]);
    }

    #[test]
    fn gap_equal_to_threshold_does_not_split() {
        let events = segmenter(106, 0, 0).group(&peaks(&[100, 206, 313]));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].duration_samples(), 106);
    }

    #[test]
    fn clip_is_centred_on_midpoint() {
        let raw: Vec<Real> = (0..1000).map(|i| i as Real).collect();
        let segmentation = segmenter(106, 100, 200).segment(&peaks(&[400, 464, 528]), &raw);
        assert_eq!(segmentation.edge_excluded, 0);
        let clipped = &segmentation.events[0];
        assert_eq!(clipped.event.midpoint(), 464);
        assert_eq!(clipped.clip_start, 364);
        assert_eq!(clipped.clip.len(), 200);
        assert_eq!(clipped.clip[0], 364.0);
        assert_eq!(clipped.clip[199], 563.0);
    }

    #[test]
    fn events_near_either_edge_are_dropped_whole() {
        let raw = vec![1.0; 1000];
        let segmentation =
            segmenter(106, 100, 100).segment(&peaks(&[50, 114, 178, 500, 920, 960]), &raw);
        assert_eq!(segmentation.edge_excluded, 2);
        assert_eq!(segmentation.events.len(), 1);
        assert_eq!(segmentation.events[0].event.first_index(), 500);
    }

    #[test]
    fn clip_running_past_the_end_is_dropped() {
        let raw = vec![1.0; 1000];
        // first peak is far enough from the end but the event runs to the last sample
        let indices: Vec<usize> = (0..8).map(|k| 500 + 64 * k).collect();
        let segmentation = segmenter(106, 100, 600).segment(&peaks(&indices), &raw);
        assert_eq!(segmentation.edge_excluded, 1);
        assert!(segmentation.events.is_empty());
    }
}
