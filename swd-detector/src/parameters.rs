use clap::Args;
use swd_common::{Real, SampleRate, hz_to_period_samples, seconds_to_samples};

pub const DEFAULT_QUALITY_THRESHOLD: Real = 0.85;
pub const DEFAULT_PEAK_HEIGHT_SIGMAS: Real = 3.0;
pub const DEFAULT_RAW_PEAK_CEILING_HZ: Real = 11.13;
pub const DEFAULT_DERIVATIVE_PEAK_CEILING_HZ: Real = 21.33;
pub const DEFAULT_BAND_FLOOR_HZ: Real = 3.16;
pub const DEFAULT_RECONCILIATION_HZ: Real = 17.0;
pub const DEFAULT_SEGMENT_GAP_HZ: Real = 10.24;
pub const DEFAULT_EDGE_EXCLUSION_SECONDS: Real = 8.0;
pub const DEFAULT_CLIP_SECONDS: Real = 8.0;
pub const DEFAULT_HISTOGRAM_BINS: usize = 100;
pub const DEFAULT_HISTOGRAM_SPAN: Real = 6.0;
pub const DEFAULT_FIT_MAX_ITERATIONS: usize = 200;
pub const DEFAULT_RENORMALIZATION_TOLERANCE: Real = 0.05;

/// Settings of the noise model fitted by the signal normaliser.
#[derive(Debug, Clone, Args)]
pub struct NormalizationParameters {
    /// Minimum goodness of fit of the noise model; recordings below this are rejected
    #[clap(long, default_value_t = DEFAULT_QUALITY_THRESHOLD)]
    pub quality_threshold: Real,

    /// Number of histogram bins the noise model is fitted to
    #[clap(long, default_value_t = DEFAULT_HISTOGRAM_BINS)]
    pub histogram_bins: usize,

    /// Half-width of the histogram, in robust standard deviations about the median
    #[clap(long, default_value_t = DEFAULT_HISTOGRAM_SPAN)]
    pub histogram_span: Real,

    /// Maximum number of Levenberg-Marquardt iterations
    #[clap(long, default_value_t = DEFAULT_FIT_MAX_ITERATIONS)]
    pub fit_max_iterations: usize,

    /// Treat a verification scale outside 1 ± tolerance as an error rather than a warning
    #[clap(long, default_value_t = false)]
    pub strict_renormalization: bool,

    /// Allowed deviation from 1 of the scale of a re-normalised signal
    #[clap(long, default_value_t = DEFAULT_RENORMALIZATION_TOLERANCE)]
    pub renormalization_tolerance: Real,
}

impl Default for NormalizationParameters {
    fn default() -> Self {
        Self {
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            histogram_span: DEFAULT_HISTOGRAM_SPAN,
            fit_max_iterations: DEFAULT_FIT_MAX_ITERATIONS,
            strict_renormalization: false,
            renormalization_tolerance: DEFAULT_RENORMALIZATION_TOLERANCE,
        }
    }
}

/// Empirically tuned frequency limits of the peak pipeline.
#[derive(Debug, Clone, Args)]
pub struct BandParameters {
    /// Peak height threshold in standard deviations of the normalised signal
    #[clap(long, default_value_t = DEFAULT_PEAK_HEIGHT_SIGMAS)]
    pub peak_height_sigmas: Real,

    /// Highest spike rate accepted in the raw signal; also the lower band limit
    #[clap(long, default_value_t = DEFAULT_RAW_PEAK_CEILING_HZ)]
    pub raw_peak_ceiling_hz: Real,

    /// Highest trough rate accepted in the derivative signal
    #[clap(long, default_value_t = DEFAULT_DERIVATIVE_PEAK_CEILING_HZ)]
    pub derivative_peak_ceiling_hz: Real,

    /// Lowest spike rate accepted within an episode; the upper band limit
    #[clap(long, default_value_t = DEFAULT_BAND_FLOOR_HZ)]
    pub band_floor_hz: Real,

    /// Frequency whose period is the forward window used to pair raw and derivative peaks
    #[clap(long, default_value_t = DEFAULT_RECONCILIATION_HZ)]
    pub reconciliation_hz: Real,

    /// Frequency whose period, added to the upper band limit, separates two events
    #[clap(long, default_value_t = DEFAULT_SEGMENT_GAP_HZ)]
    pub segment_gap_hz: Real,
}

impl Default for BandParameters {
    fn default() -> Self {
        Self {
            peak_height_sigmas: DEFAULT_PEAK_HEIGHT_SIGMAS,
            raw_peak_ceiling_hz: DEFAULT_RAW_PEAK_CEILING_HZ,
            derivative_peak_ceiling_hz: DEFAULT_DERIVATIVE_PEAK_CEILING_HZ,
            band_floor_hz: DEFAULT_BAND_FLOOR_HZ,
            reconciliation_hz: DEFAULT_RECONCILIATION_HZ,
            segment_gap_hz: DEFAULT_SEGMENT_GAP_HZ,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct DetectorSettings {
    #[command(flatten)]
    pub normalization: NormalizationParameters,

    #[command(flatten)]
    pub bands: BandParameters,

    /// Events whose first peak lies closer than this to either end of the recording are dropped
    #[clap(long, default_value_t = DEFAULT_EDGE_EXCLUSION_SECONDS)]
    pub edge_exclusion_seconds: Real,

    /// Length of the signal clip extracted around each event
    #[clap(long, default_value_t = DEFAULT_CLIP_SECONDS)]
    pub clip_seconds: Real,

    /// Abort the analysis of a recording once it has run for this long
    #[clap(long)]
    pub max_processing_seconds: Option<u64>,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            normalization: NormalizationParameters::default(),
            bands: BandParameters::default(),
            edge_exclusion_seconds: DEFAULT_EDGE_EXCLUSION_SECONDS,
            clip_seconds: DEFAULT_CLIP_SECONDS,
            max_processing_seconds: None,
        }
    }
}

/// The frequency and time settings converted to sample counts for one sample rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleWindows {
    /// Minimum spacing of raw signal peaks, and the exclusive lower band limit.
    pub raw_min_distance: usize,
    /// Minimum spacing of derivative peaks.
    pub derivative_min_distance: usize,
    /// Exclusive upper band limit.
    pub band_upper: usize,
    /// Length of the forward reconciliation window.
    pub reconciliation_window: usize,
    /// Inter-peak gaps larger than this start a new event.
    pub segment_gap: usize,
    pub edge_margin: usize,
    pub clip_length: usize,
}

impl SampleWindows {
    pub fn new(settings: &DetectorSettings, sample_rate: SampleRate) -> Self {
        let bands = &settings.bands;
        let band_upper = hz_to_period_samples(bands.band_floor_hz, sample_rate);
        Self {
            raw_min_distance: hz_to_period_samples(bands.raw_peak_ceiling_hz, sample_rate),
            derivative_min_distance: hz_to_period_samples(
                bands.derivative_peak_ceiling_hz,
                sample_rate,
            ),
            band_upper,
            reconciliation_window: hz_to_period_samples(bands.reconciliation_hz, sample_rate),
            segment_gap: band_upper + hz_to_period_samples(bands.segment_gap_hz, sample_rate),
            edge_margin: seconds_to_samples(settings.edge_exclusion_seconds, sample_rate),
            clip_length: seconds_to_samples(settings.clip_seconds, sample_rate),
        }
    }
}
