use crate::error::{DetectionError, RecordingError};
use metrics::{Unit, counter, describe_counter};
pub(crate) use swd_common::metrics::{
    failures::{self, FailureKind},
    names::{
        CANDIDATE_EVENTS, EDGE_EXCLUDED_EVENTS, FAILURES, RECORDINGS_PROCESSED, SWD_EVENTS,
    },
};

pub fn describe() {
    describe_counter!(
        RECORDINGS_PROCESSED,
        Unit::Count,
        "Recordings analysed and written"
    );
    describe_counter!(FAILURES, Unit::Count, "Recordings abandoned, by failure kind");
    describe_counter!(
        CANDIDATE_EVENTS,
        Unit::Count,
        "Candidate events passed to the classifier"
    );
    describe_counter!(
        EDGE_EXCLUDED_EVENTS,
        Unit::Count,
        "Candidate events dropped at recording edges"
    );
    describe_counter!(SWD_EVENTS, Unit::Count, "Events classified as SWD");
}

pub(crate) fn failure_kind(error: &RecordingError) -> FailureKind {
    match error {
        RecordingError::Load(_) => FailureKind::LoadFailed,
        RecordingError::Output(_) => FailureKind::WriteFailed,
        RecordingError::Detection(error) => match error {
            DetectionError::PoorSignalFit { .. } => FailureKind::PoorSignalFit,
            DetectionError::InvalidStatistics { .. } => FailureKind::InvalidStatistics,
            DetectionError::RenormalizationMismatch { .. } => FailureKind::RenormalizationMismatch,
            DetectionError::Timeout { .. } => FailureKind::Timeout,
            DetectionError::InvalidTransition { .. } => FailureKind::InvalidTransition,
            DetectionError::Classifier(_) => FailureKind::ClassificationFailed,
        },
    }
}

pub(crate) fn record_failure(error: &RecordingError) {
    counter!(FAILURES, &[failures::get_label(failure_kind(error))]).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::LoaderError, signal::SignalKind};
    use std::path::PathBuf;

    #[test]
    fn failures_are_classified() {
        let poor_fit = RecordingError::from(DetectionError::PoorSignalFit {
            signal: SignalKind::Raw,
            quality: 0.2,
            threshold: 0.85,
        });
        assert_eq!(failure_kind(&poor_fit), FailureKind::PoorSignalFit);

        let missing = RecordingError::from(LoaderError::NotFound(PathBuf::from("a.edf")));
        assert_eq!(failure_kind(&missing), FailureKind::LoadFailed);
        assert_eq!(
            failures::get_label(failure_kind(&missing)),
            ("failure_kind", "load_failed")
        );
    }
}
