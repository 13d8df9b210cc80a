pub mod local_maximum_detector;

use swd_common::{Real, SampleIndex};

pub(crate) trait Detector: Default + Clone {
    type EventPointType;

    fn signal(&mut self, index: SampleIndex, value: Real) -> Option<Self::EventPointType>;

    /// Called once the source is exhausted, to flush any pending event.
    fn finish(&mut self) -> Option<Self::EventPointType> {
        None
    }
}
