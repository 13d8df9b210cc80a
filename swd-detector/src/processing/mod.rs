//! Runs one recording through the detection pipeline.

mod stage;

pub use stage::PipelineStage;

use crate::{
    classification::{Classification, EventClassifier, FeatureExtractor, classify},
    error::{DetectionError, DetectionResult, RecordingResult},
    loader::load_recording,
    metrics::{
        CANDIDATE_EVENTS, EDGE_EXCLUDED_EVENTS, RECORDINGS_PROCESSED, SWD_EVENTS, record_failure,
    },
    normalization::{NormalizationResult, SignalNormalizer},
    output::{RecordingReport, output_path, write_report},
    parameters::{DetectorSettings, SampleWindows},
    peak_detection::{Band, Polarity, filter_by_band, find_peaks, reconcile},
    segmentation::EventSegmenter,
    signal::{Signal, SignalKind},
};
use metrics::counter;
use ndarray::Array2;
use stage::StageTracker;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use swd_common::{Channel, Real, SampleRate};
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct RecordingAnalysis {
    pub raw_statistics: NormalizationResult,
    pub raw_verification: NormalizationResult,
    pub derivative_statistics: NormalizationResult,
    pub derivative_verification: NormalizationResult,
    /// Events which survived edge exclusion and were classified.
    pub num_candidates: usize,
    pub edge_excluded: usize,
    pub classification: Classification,
}

/// The detection pipeline for one configuration. The feature extractor and
/// classifier are borrowed immutably, so one pipeline can serve many threads.
pub struct SwdPipeline<'a> {
    settings: &'a DetectorSettings,
    normalizer: SignalNormalizer,
    extractor: &'a dyn FeatureExtractor,
    classifier: &'a dyn EventClassifier,
}

impl<'a> SwdPipeline<'a> {
    pub fn new(
        settings: &'a DetectorSettings,
        extractor: &'a dyn FeatureExtractor,
        classifier: &'a dyn EventClassifier,
    ) -> Self {
        Self {
            settings,
            normalizer: SignalNormalizer::new(&settings.normalization),
            extractor,
            classifier,
        }
    }

    #[tracing::instrument(skip_all, fields(
        num_samples = signal.len(),
        sample_rate = signal.sample_rate(),
        num_raw_peaks = tracing::field::Empty,
        num_derivative_peaks = tracing::field::Empty,
        num_reconciled = tracing::field::Empty,
        num_events = tracing::field::Empty,
    ))]
    pub fn analyse(&self, signal: &Signal) -> DetectionResult<RecordingAnalysis> {
        let windows = SampleWindows::new(self.settings, signal.sample_rate());
        let mut tracker =
            StageTracker::new(self.settings.max_processing_seconds.map(Duration::from_secs));

        let derivative = signal.derivative();
        let raw_statistics = self.normalizer.normalize(signal.samples());
        let derivative_statistics = self.normalizer.normalize(&derivative);
        tracker.advance(PipelineStage::Normalized)?;
        self.gate(&mut tracker, SignalKind::Raw, &raw_statistics)?;
        self.gate(&mut tracker, SignalKind::Derivative, &derivative_statistics)?;

        let raw = raw_statistics.standardize(signal.samples());
        let derivative = derivative_statistics.standardize(&derivative);
        let raw_verification = self.verify(SignalKind::Raw, &raw)?;
        let derivative_verification = self.verify(SignalKind::Derivative, &derivative)?;

        let height = self.settings.bands.peak_height_sigmas;
        let raw_peaks = find_peaks(&raw, Polarity::Positive, height, windows.raw_min_distance);
        let derivative_peaks = find_peaks(
            &derivative,
            Polarity::Negative,
            height,
            windows.derivative_min_distance,
        );
        tracker.advance(PipelineStage::PeaksFound)?;

        let band = Band::new(windows.raw_min_distance, windows.band_upper);
        let raw_peaks = filter_by_band(&raw_peaks, &band, signal.len());
        let derivative_peaks = filter_by_band(&derivative_peaks, &band, signal.len());
        tracing::Span::current().record("num_raw_peaks", raw_peaks.len());
        tracing::Span::current().record("num_derivative_peaks", derivative_peaks.len());
        tracker.advance(PipelineStage::PeaksFiltered)?;

        let spikes = reconcile(&raw_peaks, &derivative_peaks, windows.reconciliation_window);
        tracing::Span::current().record("num_reconciled", spikes.len());
        tracker.advance(PipelineStage::Reconciled)?;

        let segmentation = EventSegmenter::new(&windows).segment(&spikes, signal.samples());
        let num_candidates = segmentation.events.len();
        let edge_excluded = segmentation.edge_excluded;
        tracing::Span::current().record("num_events", num_candidates);
        counter!(CANDIDATE_EVENTS).increment(num_candidates as u64);
        counter!(EDGE_EXCLUDED_EVENTS).increment(edge_excluded as u64);
        tracker.advance(PipelineStage::Segmented)?;

        let classification = if segmentation.events.is_empty() {
            info!(edge_excluded, "No events found");
            self.empty_classification()
        } else {
            let classification = classify(
                segmentation.events,
                signal.sample_rate(),
                self.extractor,
                self.classifier,
            )?;
            counter!(SWD_EVENTS).increment(classification.num_swd() as u64);
            tracker.advance(PipelineStage::Classified)?;
            classification
        };
        tracker.advance(PipelineStage::Done)?;

        Ok(RecordingAnalysis {
            raw_statistics,
            raw_verification,
            derivative_statistics,
            derivative_verification,
            num_candidates,
            edge_excluded,
            classification,
        })
    }

    /// Aborts the recording if the noise model does not explain the signal.
    fn gate(
        &self,
        tracker: &mut StageTracker,
        signal: SignalKind,
        statistics: &NormalizationResult,
    ) -> DetectionResult<()> {
        let threshold = self.settings.normalization.quality_threshold;
        // a NaN quality must fail the gate too
        if !(statistics.quality >= threshold) {
            error!(%signal, quality = statistics.quality, threshold, "Poor signal fit");
            return tracker.reject(
                PipelineStage::RejectedPoorFit,
                DetectionError::PoorSignalFit {
                    signal,
                    quality: statistics.quality,
                    threshold,
                },
            );
        }
        if !statistics.has_valid_scale() {
            error!(%signal, scale = statistics.scale, "Invalid statistics");
            return tracker.reject(
                PipelineStage::RejectedInvalidStatistics,
                DetectionError::InvalidStatistics {
                    signal,
                    scale: statistics.scale,
                },
            );
        }
        Ok(())
    }

    /// Re-fits the standardised signal, whose scale should come out as one.
    fn verify(
        &self,
        signal: SignalKind,
        standardised: &[Real],
    ) -> DetectionResult<NormalizationResult> {
        let verification = self.normalizer.normalize(standardised);
        let tolerance = self.settings.normalization.renormalization_tolerance;
        if (verification.scale - 1.0).abs() > tolerance {
            if self.settings.normalization.strict_renormalization {
                error!(%signal, scale = verification.scale, tolerance, "Re-normalisation mismatch");
                return Err(DetectionError::RenormalizationMismatch {
                    signal,
                    scale: verification.scale,
                    tolerance,
                });
            }
            warn!(
                %signal,
                scale = verification.scale,
                tolerance,
                "Re-normalised scale differs from one"
            );
        }
        Ok(verification)
    }

    fn empty_classification(&self) -> Classification {
        let feature_names = self.extractor.feature_names();
        Classification {
            features: Array2::zeros((0, feature_names.len())),
            feature_names,
            events: Vec::new(),
        }
    }
}

/// Where and how recordings are read and their reports written.
#[derive(Debug, Clone)]
pub struct RecordingOptions {
    pub channel: Channel,
    pub sample_rate: SampleRate,
    pub output_dir: Option<PathBuf>,
}

/// Loads, analyses and reports one recording, returning the path of the report.
/// Nothing is written unless the whole analysis succeeds.
#[tracing::instrument(skip_all, fields(recording = %path.display()))]
pub fn process_recording(
    pipeline: &SwdPipeline,
    path: &Path,
    options: &RecordingOptions,
) -> RecordingResult<PathBuf> {
    let result = analyse_and_write(pipeline, path, options);
    match &result {
        Ok(report_path) => {
            counter!(RECORDINGS_PROCESSED).increment(1);
            info!(report = %report_path.display(), "Recording processed");
        }
        Err(e) => {
            record_failure(e);
            error!("{e}");
        }
    }
    result
}

fn analyse_and_write(
    pipeline: &SwdPipeline,
    path: &Path,
    options: &RecordingOptions,
) -> RecordingResult<PathBuf> {
    let signal = load_recording(path, options.channel, options.sample_rate)?;
    let analysis = pipeline.analyse(&signal)?;
    let report_path = output_path(path, options.output_dir.as_deref())?;
    write_report(&RecordingReport::new(path, &signal, analysis), &report_path)?;
    Ok(report_path)
}
