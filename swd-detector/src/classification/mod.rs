//! Turns clipped candidate events into labelled, scored events.

mod features;
mod logistic;

pub use features::ClipFeatureExtractor;
pub use logistic::LogisticClassifier;

use crate::{
    error::ClassifierError,
    segmentation::{CandidateEvent, ClippedEvent},
};
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::Serialize;
use strum::Display;
use swd_common::{Real, SampleIndex, SampleRate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventLabel {
    NotSwd,
    Swd,
}

impl EventLabel {
    /// Column of this class in a score matrix.
    pub fn column(self) -> usize {
        match self {
            EventLabel::NotSwd => 0,
            EventLabel::Swd => 1,
        }
    }
}

/// Converts a fixed-length clip of signal into a fixed-width feature vector.
pub trait FeatureExtractor: Send + Sync {
    fn feature_names(&self) -> Vec<String>;

    fn extract(&self, clip: &[Real], sample_rate: SampleRate) -> Vec<Real>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub labels: Vec<EventLabel>,
    /// One row per event, one column per class, see [EventLabel::column].
    pub scores: Array2<Real>,
}

/// A pretrained binary classifier. Implementors are shared between threads and never mutated.
pub trait EventClassifier: Send + Sync {
    fn predict(&self, features: ArrayView2<Real>) -> Result<Prediction, ClassifierError>;
}

/// Folds a two-class score row into one scalar whose sign is the predicted class
/// and whose magnitude is the winning class's score.
pub fn signed_confidence(label: EventLabel, scores: ArrayView1<Real>) -> Real {
    let score = scores.get(label.column()).copied().unwrap_or_default().abs();
    match label {
        EventLabel::Swd => score,
        EventLabel::NotSwd => -score,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredEvent {
    #[serde(flatten)]
    pub event: CandidateEvent,
    pub duration_samples: usize,
    pub clip_start: SampleIndex,
    pub clip: Vec<Real>,
    pub label: EventLabel,
    pub confidence: Real,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub feature_names: Vec<String>,
    pub features: Array2<Real>,
    pub events: Vec<ScoredEvent>,
}

impl Classification {
    pub fn num_swd(&self) -> usize {
        self.events
            .iter()
            .filter(|event| event.label == EventLabel::Swd)
            .count()
    }
}

/// Extracts the features of every clip and applies the classifier to them in one batch.
#[tracing::instrument(skip_all, fields(num_events = events.len(), num_swd))]
pub fn classify(
    events: Vec<ClippedEvent>,
    sample_rate: SampleRate,
    extractor: &dyn FeatureExtractor,
    classifier: &dyn EventClassifier,
) -> Result<Classification, ClassifierError> {
    let feature_names = extractor.feature_names();
    let width = feature_names.len();

    let mut flat = Vec::with_capacity(events.len() * width);
    for clipped in &events {
        let row = extractor.extract(&clipped.clip, sample_rate);
        if row.len() != width {
            return Err(ClassifierError::FeatureWidthMismatch {
                expected: width,
                found: row.len(),
            });
        }
        flat.extend(row);
    }
    let features = Array2::from_shape_vec((events.len(), width), flat).map_err(|_| {
        ClassifierError::FeatureWidthMismatch {
            expected: width,
            found: 0,
        }
    })?;

    let Prediction { labels, scores } = classifier.predict(features.view())?;
    if labels.len() != events.len() || scores.nrows() != events.len() || scores.ncols() != 2 {
        return Err(ClassifierError::ShapeMismatch {
            events: events.len(),
            labels: labels.len(),
            rows: scores.nrows(),
            columns: scores.ncols(),
        });
    }

    let events: Vec<ScoredEvent> = events
        .into_iter()
        .zip(labels)
        .zip(scores.rows())
        .map(|((clipped, label), row)| ScoredEvent {
            duration_samples: clipped.event.duration_samples(),
            clip_start: clipped.clip_start,
            clip: clipped.clip,
            event: clipped.event,
            label,
            confidence: signed_confidence(label, row),
        })
        .collect();

    let classification = Classification {
        feature_names,
        features,
        events,
    };
    tracing::Span::current().record("num_swd", classification.num_swd());
    Ok(classification)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::peak_detection::Peak;
    use ndarray::{arr1, arr2};
    use rand::{Rng, SeedableRng, rngs::StdRng};

    /// Labels every event with a fixed class and score row.
    pub(crate) struct FixedClassifier {
        pub label: EventLabel,
        pub scores: [Real; 2],
    }

    impl EventClassifier for FixedClassifier {
        fn predict(&self, features: ArrayView2<Real>) -> Result<Prediction, ClassifierError> {
            let rows = features.nrows();
            Ok(Prediction {
                labels: vec![self.label; rows],
                scores: Array2::from_shape_fn((rows, 2), |(_, c)| self.scores[c]),
            })
        }
    }

    struct ShortClassifier;

    impl EventClassifier for ShortClassifier {
        fn predict(&self, _: ArrayView2<Real>) -> Result<Prediction, ClassifierError> {
            Ok(Prediction {
                labels: vec![EventLabel::Swd],
                scores: arr2(&[[0.1, 0.9]]),
            })
        }
    }

    fn clipped(first: usize) -> ClippedEvent {
        let peaks = vec![
            Peak {
                index: first,
                value: 5.0,
            },
            Peak {
                index: first + 64,
                value: 6.0,
            },
        ];
        ClippedEvent {
            event: CandidateEvent::new(peaks).expect("non-empty"),
            clip_start: first - 96,
            clip: (0..256).map(|i| ((i % 32) as Real).sin()).collect(),
        }
    }

    #[test]
    fn confidence_sign_matches_label() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let scores = arr1(&[rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)]);
            assert!(signed_confidence(EventLabel::Swd, scores.view()).is_sign_positive());
            assert!(signed_confidence(EventLabel::NotSwd, scores.view()).is_sign_negative());
        }
    }

    #[test]
    fn confidence_sign_for_zero_scores() {
        let scores = arr1(&[0.0, 0.0]);
        assert!(signed_confidence(EventLabel::Swd, scores.view()).is_sign_positive());
        assert!(signed_confidence(EventLabel::NotSwd, scores.view()).is_sign_negative());
    }

    #[test]
    fn confidence_takes_winning_column() {
        let scores = arr1(&[0.3, 0.7]);
        assert_eq!(signed_confidence(EventLabel::Swd, scores.view()), 0.7);
        assert_eq!(signed_confidence(EventLabel::NotSwd, scores.view()), -0.3);
    }

    #[test]
    fn classify_scores_every_event() {
        let classifier = FixedClassifier {
            label: EventLabel::NotSwd,
            scores: [0.8, 0.2],
        };
        let classification = classify(
            vec![clipped(1000), clipped(3000)],
            256,
            &ClipFeatureExtractor,
            &classifier,
        )
        .unwrap();
        assert_eq!(classification.events.len(), 2);
        assert_eq!(classification.num_swd(), 0);
        assert_eq!(
            classification.features.dim(),
            (2, ClipFeatureExtractor.feature_names().len())
        );
        let event = &classification.events[1];
        assert_eq!(event.duration_samples, 64);
        assert_eq!(event.clip_start, 2904);
        assert_eq!(event.confidence, -0.8);
    }

    #[test]
    fn classifier_returning_wrong_shape_is_an_error() {
        let result = classify(
            vec![clipped(1000), clipped(3000)],
            256,
            &ClipFeatureExtractor,
            &ShortClassifier,
        );
        assert!(matches!(
            result,
            Err(ClassifierError::ShapeMismatch {
                events: 2,
                labels: 1,
                rows: 1,
                columns: 2
            })
        ));
    }

    #[test]
    fn label_display() {
        assert_eq!(EventLabel::Swd.to_string(), "swd");
        assert_eq!(EventLabel::NotSwd.to_string(), "not_swd");
    }
}
