//! Offline detection of spike-and-wave discharges in single-channel EEG recordings.
//!
//! A recording is normalised against a fitted noise model, spikes are found in both the
//! signal and its derivative, cross-checked, grouped into candidate events and finally
//! scored by a pretrained classifier.

pub mod classification;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod normalization;
pub mod output;
pub mod parameters;
pub mod peak_detection;
pub mod processing;
pub mod segmentation;
pub mod signal;
mod timer;

pub use classification::{
    ClipFeatureExtractor, EventClassifier, EventLabel, FeatureExtractor, LogisticClassifier,
    signed_confidence,
};
pub use error::{DetectionError, RecordingError};
pub use parameters::{DetectorSettings, SampleWindows};
pub use processing::{RecordingAnalysis, RecordingOptions, SwdPipeline, process_recording};
pub use signal::Signal;
