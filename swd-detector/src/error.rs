use crate::{processing::PipelineStage, signal::SignalKind};
use std::{path::PathBuf, time::Duration};
use swd_common::{Channel, Real, SampleRate};
use thiserror::Error;

pub type DetectionResult<T> = Result<T, DetectionError>;
pub type RecordingResult<T> = Result<T, RecordingError>;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Poor fit of the {signal} signal noise model: quality {quality:.4} below threshold {threshold:.4}")]
    PoorSignalFit {
        signal: SignalKind,
        quality: Real,
        threshold: Real,
    },
    #[error("Invalid statistics for the {signal} signal: fitted scale {scale} is not positive")]
    InvalidStatistics { signal: SignalKind, scale: Real },
    #[error("Re-normalised {signal} signal has scale {scale:.4}, expected 1 ± {tolerance}")]
    RenormalizationMismatch {
        signal: SignalKind,
        scale: Real,
        tolerance: Real,
    },
    #[error("Processing reached {stage} after {elapsed:?}, exceeding the limit of {limit:?}")]
    Timeout {
        stage: PipelineStage,
        elapsed: Duration,
        limit: Duration,
    },
    #[error("Pipeline cannot move from {from} to {to}")]
    InvalidTransition {
        from: PipelineStage,
        to: PipelineStage,
    },
    #[error("{0}")]
    Classifier(#[from] ClassifierError),
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Cannot read classifier artifact {path}: {source}")]
    ArtifactIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot parse classifier artifact: {0}")]
    ArtifactUnreadable(#[from] serde_json::Error),
    #[error("Classifier artifact is inconsistent: {0}")]
    ArtifactInconsistent(String),
    #[error("Classifier expects {expected} features, got {found}")]
    FeatureWidthMismatch { expected: usize, found: usize },
    #[error("Classifier returned {labels} labels and {rows}x{columns} scores for {events} events")]
    ShapeMismatch {
        events: usize,
        labels: usize,
        rows: usize,
        columns: usize,
    },
}

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Recording not found: {0}")]
    NotFound(PathBuf),
    #[error("Channel {channel} out of range, recording has {available} channels")]
    ChannelOutOfRange { channel: Channel, available: usize },
    #[error("Recording sample rate {found} Hz does not match the expected {expected} Hz")]
    SampleRateMismatch { expected: SampleRate, found: Real },
    #[error("Unreadable recording: {0}")]
    Unreadable(String),
    #[error("IO Error: {0}")]
    IO(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO Error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Cannot serialise results: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Cannot derive an output name from {0}")]
    InvalidPath(PathBuf),
}

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("{0}")]
    Load(#[from] LoaderError),
    #[error("{0}")]
    Detection(#[from] DetectionError),
    #[error("{0}")]
    Output(#[from] OutputError),
}
