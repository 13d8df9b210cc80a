use super::FeatureExtractor;
use realfft::RealFftPlanner;
use swd_common::{Real, SampleRate};

/// Frequency bands, in Hz, whose share of the clip's spectral power is reported.
const BANDS: [(&str, Real, Real); 5] = [
    ("delta_power", 1.0, 4.0),
    ("theta_power", 4.0, 8.0),
    ("swd_power", 5.0, 9.0),
    ("alpha_power", 8.0, 13.0),
    ("beta_power", 13.0, 30.0),
];

const SCALAR_FEATURES: [&str; 8] = [
    "mean",
    "std",
    "skewness",
    "kurtosis",
    "line_length",
    "peak_to_peak",
    "zero_crossing_rate",
    "dominant_frequency",
];

/// Time-domain moments and spectral band powers of a clip.
#[derive(Default, Debug, Clone, Copy)]
pub struct ClipFeatureExtractor;

impl FeatureExtractor for ClipFeatureExtractor {
    fn feature_names(&self) -> Vec<String> {
        SCALAR_FEATURES
            .iter()
            .copied()
            .chain(BANDS.iter().map(|(name, _, _)| *name))
            .map(ToOwned::to_owned)
            .collect()
    }

    fn extract(&self, clip: &[Real], sample_rate: SampleRate) -> Vec<Real> {
        let moments = Moments::new(clip);
        let spectrum = power_spectrum(clip, moments.mean, sample_rate);
        let total_power: Real = spectrum.iter().map(|(_, p)| p).sum();

        let mut features = vec![
            moments.mean,
            moments.std,
            moments.skewness,
            moments.kurtosis,
            line_length(clip),
            peak_to_peak(clip),
            zero_crossing_rate(clip, moments.mean, sample_rate),
            dominant_frequency(&spectrum),
        ];
        features.extend(BANDS.iter().map(|&(_, lower, upper)| {
            if total_power > 0.0 {
                spectrum
                    .iter()
                    .filter(|(f, _)| (lower..upper).contains(f))
                    .map(|(_, p)| p)
                    .sum::<Real>()
                    / total_power
            } else {
                0.0
            }
        }));
        features
    }
}

struct Moments {
    mean: Real,
    std: Real,
    skewness: Real,
    kurtosis: Real,
}

impl Moments {
    fn new(clip: &[Real]) -> Self {
        if clip.is_empty() {
            return Self {
                mean: 0.0,
                std: 0.0,
                skewness: 0.0,
                kurtosis: 0.0,
            };
        }
        let n = clip.len() as Real;
        let mean = clip.iter().sum::<Real>() / n;
        let central = |k: i32| clip.iter().map(|v| (v - mean).powi(k)).sum::<Real>() / n;
        let variance = central(2);
        if variance <= 0.0 {
            return Self {
                mean,
                std: 0.0,
                skewness: 0.0,
                kurtosis: 0.0,
            };
        }
        Self {
            mean,
            std: variance.sqrt(),
            skewness: central(3) / variance.powf(1.5),
            kurtosis: central(4) / variance.powi(2),
        }
    }
}

fn line_length(clip: &[Real]) -> Real {
    clip.windows(2).map(|w| (w[1] - w[0]).abs()).sum()
}

fn peak_to_peak(clip: &[Real]) -> Real {
    let (min, max) = clip
        .iter()
        .fold((Real::INFINITY, Real::NEG_INFINITY), |(min, max), &v| {
            (min.min(v), max.max(v))
        });
    if clip.is_empty() { 0.0 } else { max - min }
}

/// Crossings of the mean, per second.
fn zero_crossing_rate(clip: &[Real], mean: Real, sample_rate: SampleRate) -> Real {
    if clip.len() < 2 {
        return 0.0;
    }
    let crossings = clip
        .windows(2)
        .filter(|w| (w[0] - mean) * (w[1] - mean) < 0.0)
        .count();
    crossings as Real * sample_rate as Real / clip.len() as Real
}

/// One-sided power spectrum of the mean-removed clip as `(frequency, power)` pairs,
/// excluding the DC bin.
fn power_spectrum(clip: &[Real], mean: Real, sample_rate: SampleRate) -> Vec<(Real, Real)> {
    let n = clip.len();
    if n < 2 {
        return Vec::new();
    }
    let fft = RealFftPlanner::<Real>::new().plan_fft_forward(n);
    let mut input: Vec<Real> = clip.iter().map(|v| v - mean).collect();
    let mut spectrum = fft.make_output_vec();
    if fft.process(&mut input, &mut spectrum).is_err() {
        return Vec::new();
    }
    let resolution = sample_rate as Real / n as Real;
    spectrum
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, bin)| (k as Real * resolution, bin.norm_sqr()))
        .collect()
}

fn dominant_frequency(spectrum: &[(Real, Real)]) -> Real {
    spectrum
        .iter()
        .filter(|(_, p)| *p > 0.0)
        .fold(None, |best: Option<(Real, Real)>, &(f, p)| match best {
            Some((_, best_power)) if best_power >= p => best,
            _ => Some((f, p)),
        })
        .map(|(f, _)| f)
        .unwrap_or_default()
}
