use super::Detector;
use crate::peak_detection::Peak;
use swd_common::{Real, SampleIndex};

/// Emits every strict local maximum whose value exceeds the threshold.
/// A maximum is only known once the following sample has arrived, so the first
/// and last samples of a series can never be reported.
#[derive(Default, Clone)]
pub(crate) struct LocalMaximumDetector {
    threshold: Real,
    previous: Option<(SampleIndex, Real)>,
    rising: bool,
}

impl LocalMaximumDetector {
    pub(crate) fn new(threshold: Real) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }
}

impl Detector for LocalMaximumDetector {
    type EventPointType = Peak;

    fn signal(&mut self, index: SampleIndex, value: Real) -> Option<Peak> {
        let result = match self.previous {
            Some((previous_index, previous_value))
                if self.rising && previous_value > value && previous_value > self.threshold =>
            {
                Some(Peak {
                    index: previous_index,
                    value: previous_value,
                })
            }
            _ => None,
        };
        self.rising = self
            .previous
            .is_some_and(|(_, previous_value)| value > previous_value);
        self.previous = Some((index, value));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peak_detection::iterators::EventFilter;

    fn detect(data: &[Real], threshold: Real) -> Vec<Peak> {
        data.iter()
            .copied()
            .enumerate()
            .events(LocalMaximumDetector::new(threshold))
            .collect()
    }

    #[test]
    fn zero_data() {
        assert!(detect(&[], 0.0).is_empty());
    }

    #[test]
    fn test_positive_threshold() {
        let data = [4.0, 3.0, 2.0, 5.0, 6.0, 1.0, 5.0, 7.0, 2.0, 4.0];
        let peaks = detect(&data, 2.0);
        assert_eq!(
            peaks,
            vec![
                Peak {
                    index: 4,
                    value: 6.0
                },
                Peak {
                    index: 7,
                    value: 7.0
                }
            ]
        );
    }

    #[test]
    fn threshold_is_exclusive() {
        let data = [0.0, 2.0, 0.0, 2.5, 0.0];
        let peaks = detect(&data, 2.0);
        assert_eq!(
            peaks,
            vec![Peak {
                index: 3,
                value: 2.5
            }]
        );
    }

    #[test]
    fn boundary_samples_are_not_peaks() {
        assert!(detect(&[9.0, 1.0, 9.0], 0.0).is_empty());
    }

    #[test]
    fn plateaus_are_not_strict_maxima() {
        assert!(detect(&[0.0, 3.0, 3.0, 0.0], 0.0).is_empty());
    }
}
