use anyhow::{Result, anyhow};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use rayon::prelude::*;
use std::{net::SocketAddr, path::PathBuf};
use swd_common::{
    Channel, SampleRate,
    metrics::component_info_metric,
    tracer::{TracerEngine, TracerOptions},
};
use swd_detector::{
    ClipFeatureExtractor, DetectorSettings, FeatureExtractor, LogisticClassifier,
    RecordingOptions, SwdPipeline, process_recording,
};
use tracing::{debug, info, level_filters::LevelFilter};

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// EDF recordings to analyse
    #[clap(required = true)]
    recordings: Vec<PathBuf>,

    /// Pretrained classifier artifact (JSON)
    #[clap(long)]
    classifier: PathBuf,

    /// Sample rate, in Hz, every recording is expected to have
    #[clap(long)]
    sample_rate: SampleRate,

    /// Index of the channel to analyse
    #[clap(long, default_value_t = 0)]
    channel: Channel,

    /// Directory reports are written to, defaults to each recording's own directory
    #[clap(long)]
    output_dir: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,

    /// If set, Prometheus metrics are served on this address
    #[clap(long, env)]
    observability_address: Option<SocketAddr>,

    #[command(flatten)]
    settings: DetectorSettings,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let tracer = TracerEngine::new(TracerOptions {
        default_level: args.log_level,
        ..Default::default()
    })?;
    debug!(default_level = %tracer.default_level(), "Tracer initialised");

    if let Some(address) = args.observability_address {
        PrometheusBuilder::new()
            .with_http_listener(address)
            .install()?;
    }
    swd_detector::metrics::describe();
    component_info_metric("swd-detector");

    let extractor = ClipFeatureExtractor;
    let classifier = LogisticClassifier::load(&args.classifier)?;
    classifier.check_features(&extractor.feature_names())?;

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)?;
    }
    let options = RecordingOptions {
        channel: args.channel,
        sample_rate: args.sample_rate,
        output_dir: args.output_dir.clone(),
    };
    let pipeline = SwdPipeline::new(&args.settings, &extractor, &classifier);

    let num_failed = args
        .recordings
        .par_iter()
        .map(|path| process_recording(&pipeline, path, &options))
        .filter(Result::is_err)
        .count();

    info!(
        num_recordings = args.recordings.len(),
        num_failed, "All recordings processed"
    );
    if num_failed > 0 {
        return Err(anyhow!(
            "{num_failed} of {} recordings failed",
            args.recordings.len()
        ));
    }
    Ok(())
}
