use itertools::Itertools;
use serde::Serialize;
use swd_common::{Real, SampleRate};

/// Identifies which of the two analysed series a statistic or error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum SignalKind {
    #[strum(to_string = "raw")]
    #[serde(rename = "raw")]
    Raw,
    #[strum(to_string = "derivative")]
    #[serde(rename = "derivative")]
    Derivative,
}

/// A single channel of a recording.
///
/// Samples which are exactly zero are blanks (recording dropouts). They keep
/// their position but never contribute to any statistic.
#[derive(Debug, Clone)]
pub struct Signal {
    samples: Vec<Real>,
    sample_rate: SampleRate,
}

impl Signal {
    pub fn new(samples: Vec<Real>, sample_rate: SampleRate) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[Real] {
        &self.samples
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn num_blanks(&self) -> usize {
        self.samples.iter().filter(|&&v| is_blank(v)).count()
    }

    /// Forward difference of the signal, the same length as the signal.
    /// A difference touching a blank is itself blank, as is the final sample.
    pub fn derivative(&self) -> Vec<Real> {
        self.samples
            .iter()
            .copied()
            .tuple_windows()
            .map(|(current, next)| {
                if is_blank(current) || is_blank(next) {
                    0.0
                } else {
                    next - current
                }
            })
            .chain(self.samples.last().map(|_| 0.0))
            .collect()
    }
}

pub(crate) fn is_blank(value: Real) -> bool {
    value == 0.0
}
