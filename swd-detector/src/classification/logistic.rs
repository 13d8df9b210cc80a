use super::{EventClassifier, EventLabel, Prediction};
use crate::error::ClassifierError;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Deserializer};
use std::{fs::File, io::BufReader, path::Path};
use swd_common::Real;
use tracing::info;

fn default_decision_threshold() -> Real {
    0.5
}

/// Reads a plain JSON list of numbers as a one-dimensional array.
fn array_from_list<'de, D>(deserializer: D) -> Result<Array1<Real>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Real>::deserialize(deserializer).map(Array1::from)
}

/// A standardised linear model with a logistic link, trained offline.
///
/// The artifact is a JSON object:
/// ```json
/// {
///   "feature_names": ["mean", "std"],
///   "means": [0.0, 1.0],
///   "scales": [1.0, 2.0],
///   "weights": [0.5, -1.5],
///   "intercept": 0.1,
///   "decision_threshold": 0.5
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticClassifier {
    feature_names: Vec<String>,
    #[serde(deserialize_with = "array_from_list")]
    means: Array1<Real>,
    #[serde(deserialize_with = "array_from_list")]
    scales: Array1<Real>,
    #[serde(deserialize_with = "array_from_list")]
    weights: Array1<Real>,
    intercept: Real,
    #[serde(default = "default_decision_threshold")]
    decision_threshold: Real,
}

impl LogisticClassifier {
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let file = File::open(path).map_err(|source| ClassifierError::ArtifactIo {
            path: path.to_owned(),
            source,
        })?;
        let classifier: Self = serde_json::from_reader(BufReader::new(file))?;
        let classifier = classifier.validated()?;
        info!(
            num_features = classifier.weights.len(),
            decision_threshold = classifier.decision_threshold,
            "Classifier loaded"
        );
        Ok(classifier)
    }

    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        serde_json::from_str::<Self>(json)?.validated()
    }

    fn validated(self) -> Result<Self, ClassifierError> {
        let width = self.weights.len();
        if self.feature_names.len() != width || self.means.len() != width || self.scales.len() != width
        {
            return Err(ClassifierError::ArtifactInconsistent(format!(
                "{} names, {} means, {} scales and {} weights",
                self.feature_names.len(),
                self.means.len(),
                self.scales.len(),
                width
            )));
        }
        if let Some(scale) = self.scales.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(ClassifierError::ArtifactInconsistent(format!(
                "non-positive feature scale {scale}"
            )));
        }
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(ClassifierError::ArtifactInconsistent(format!(
                "decision threshold {} outside [0, 1]",
                self.decision_threshold
            )));
        }
        Ok(self)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Confirms the model was trained on the features, in order, that `names` describes.
    pub fn check_features(&self, names: &[String]) -> Result<(), ClassifierError> {
        if names != self.feature_names.as_slice() {
            return Err(ClassifierError::ArtifactInconsistent(format!(
                "trained on [{}], given [{}]",
                self.feature_names.join(", "),
                names.join(", ")
            )));
        }
        Ok(())
    }
}

impl EventClassifier for LogisticClassifier {
    fn predict(&self, features: ArrayView2<Real>) -> Result<Prediction, ClassifierError> {
        if features.ncols() != self.weights.len() {
            return Err(ClassifierError::FeatureWidthMismatch {
                expected: self.weights.len(),
                found: features.ncols(),
            });
        }
        let standardised = (&features - &self.means) / &self.scales;
        let probabilities = (standardised.dot(&self.weights) + self.intercept)
            .mapv(|z| 1.0 / (1.0 + (-z).exp()));

        let labels = probabilities
            .iter()
            .map(|&p| {
                if p >= self.decision_threshold {
                    EventLabel::Swd
                } else {
                    EventLabel::NotSwd
                }
            })
            .collect();
        let mut scores = Array2::zeros((probabilities.len(), 2));
        for (mut row, &p) in scores.axis_iter_mut(Axis(0)).zip(&probabilities) {
            row[EventLabel::NotSwd.column()] = 1.0 - p;
            row[EventLabel::Swd.column()] = p;
        }
        Ok(Prediction { labels, scores })
    }
}
