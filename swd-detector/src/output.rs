use crate::{
    classification::ScoredEvent, error::OutputError, normalization::NormalizationResult,
    processing::RecordingAnalysis, signal::Signal,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use swd_common::{Real, SampleRate};
use tracing::info;

const OUTPUT_SUFFIX: &str = "_swd.json";

#[derive(Debug, Serialize)]
pub struct SignalStatistics {
    pub fit: NormalizationResult,
    /// Fit of the standardised signal, whose scale should be close to one.
    pub verification: NormalizationResult,
}

/// Everything learnt about one recording.
#[derive(Debug, Serialize)]
pub struct RecordingReport {
    pub recording: String,
    pub analysed_at: DateTime<Utc>,
    pub sample_rate: SampleRate,
    pub num_samples: usize,
    pub num_blanks: usize,
    pub raw: SignalStatistics,
    pub derivative: SignalStatistics,
    pub num_candidates: usize,
    pub edge_excluded: usize,
    pub num_swd: usize,
    pub feature_names: Vec<String>,
    /// One row per event, in the order of `events`.
    pub features: Vec<Vec<Real>>,
    pub events: Vec<ScoredEvent>,
}

impl RecordingReport {
    pub fn new(recording: &Path, signal: &Signal, analysis: RecordingAnalysis) -> Self {
        let classification = analysis.classification;
        Self {
            recording: recording.display().to_string(),
            analysed_at: Utc::now(),
            sample_rate: signal.sample_rate(),
            num_samples: signal.len(),
            num_blanks: signal.num_blanks(),
            raw: SignalStatistics {
                fit: analysis.raw_statistics,
                verification: analysis.raw_verification,
            },
            derivative: SignalStatistics {
                fit: analysis.derivative_statistics,
                verification: analysis.derivative_verification,
            },
            num_candidates: analysis.num_candidates,
            edge_excluded: analysis.edge_excluded,
            num_swd: classification.num_swd(),
            features: classification
                .features
                .rows()
                .into_iter()
                .map(|row| row.to_vec())
                .collect(),
            feature_names: classification.feature_names,
            events: classification.events,
        }
    }
}

/// `<dir>/<stem>_swd.json`, where `dir` is `output_dir` if given, otherwise the recording's directory.
pub fn output_path(recording: &Path, output_dir: Option<&Path>) -> Result<PathBuf, OutputError> {
    let stem = recording
        .file_stem()
        .ok_or_else(|| OutputError::InvalidPath(recording.to_owned()))?;
    let mut name = stem.to_os_string();
    name.push(OUTPUT_SUFFIX);
    let dir = output_dir
        .or_else(|| recording.parent())
        .unwrap_or(Path::new(""));
    Ok(dir.join(name))
}

#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn write_report(report: &RecordingReport, path: &Path) -> Result<(), OutputError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;
    info!(num_events = report.events.len(), "Report written");
    Ok(())
}
