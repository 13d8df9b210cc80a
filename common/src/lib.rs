pub mod metrics;
pub mod tracer;

/// Scalar type used for all signal arithmetic.
pub type Real = f64;

/// Position of a sample within a recording.
pub type SampleIndex = usize;

/// Sample rate in Hz.
pub type SampleRate = u32;

/// Index of a channel within a multi-channel recording.
pub type Channel = usize;

/// Converts a duration in seconds to a whole number of samples, rounding down.
pub fn seconds_to_samples(seconds: Real, sample_rate: SampleRate) -> usize {
    (seconds * sample_rate as Real).floor().max(0.0) as usize
}

/// Converts a frequency ceiling in Hz to the corresponding period in samples, rounding down.
/// This is the `floor(fs / f)` convention used for all band limits.
pub fn hz_to_period_samples(frequency: Real, sample_rate: SampleRate) -> usize {
    if frequency > 0.0 {
        (sample_rate as Real / frequency).floor() as usize
    } else {
        0
    }
}
