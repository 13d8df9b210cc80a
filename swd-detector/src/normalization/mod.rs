//! Fits a Gaussian noise model to the amplitude distribution of a signal.
//!
//! The fit yields the offset and scale used to standardise the signal, and a
//! goodness-of-fit `quality` which gates whether the recording is analysed at all.
//! Blank (exactly zero) samples are excluded from every statistic.

mod gaussian_fit;
mod histogram;

use crate::{parameters::NormalizationParameters, signal::is_blank};
use gaussian_fit::{Gaussian, fit_gaussian};
use histogram::Histogram;
use ndarray::Array1;
use ndarray_stats::{Quantile1dExt, interpolate::Midpoint};
use noisy_float::types::{N64, n64};
use serde::Serialize;
use swd_common::Real;
use tracing::trace;

/// Scale of the median absolute deviation of a normal distribution.
const MAD_TO_SIGMA: Real = 1.4826;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizationResult {
    /// Coefficient of determination of the fitted noise model.
    pub quality: Real,
    /// Fitted standard deviation.
    pub scale: Real,
    /// Fitted mean.
    pub offset: Real,
}

impl NormalizationResult {
    fn degenerate(offset: Real) -> Self {
        Self {
            quality: 0.0,
            scale: 0.0,
            offset,
        }
    }

    pub fn has_valid_scale(&self) -> bool {
        self.scale.is_finite() && self.scale > 0.0
    }

    /// Z-scores the samples with these statistics. Blanks stay exactly zero.
    pub fn standardize(&self, samples: &[Real]) -> Vec<Real> {
        samples
            .iter()
            .map(|&v| {
                if is_blank(v) {
                    0.0
                } else {
                    (v - self.offset) / self.scale
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SignalNormalizer {
    bins: usize,
    span: Real,
    max_iterations: usize,
}

impl SignalNormalizer {
    pub fn new(parameters: &NormalizationParameters) -> Self {
        Self {
            bins: parameters.histogram_bins,
            span: parameters.histogram_span,
            max_iterations: parameters.fit_max_iterations,
        }
    }

    #[tracing::instrument(skip_all, level = "trace", fields(num_samples = samples.len()))]
    pub fn normalize(&self, samples: &[Real]) -> NormalizationResult {
        let values: Vec<Real> = samples.iter().copied().filter(|&v| !is_blank(v)).collect();
        if values.len() < 2 {
            return NormalizationResult::degenerate(values.first().copied().unwrap_or_default());
        }

        let centre = median(&values);
        let spread = robust_sigma(&values, centre);
        if spread <= 0.0 || !spread.is_finite() {
            return NormalizationResult::degenerate(centre);
        }

        let histogram = Histogram::new(
            values.iter().copied(),
            centre - self.span * spread,
            centre + self.span * spread,
            self.bins,
        );
        let centres = histogram.centres();
        let counts = histogram.counts();

        let fit = fit_gaussian(
            centres,
            counts,
            Gaussian {
                amplitude: histogram.max_count(),
                mean: centre,
                sigma: spread,
            },
            self.max_iterations,
        );
        trace!(iterations = fit.iterations, curve = ?fit.curve, "Noise model fitted");

        NormalizationResult {
            quality: coefficient_of_determination(counts, fit.residual_sum_of_squares),
            scale: fit.curve.sigma.abs(),
            offset: fit.curve.mean,
        }
    }
}

fn coefficient_of_determination(observed: &[Real], residual_sum_of_squares: Real) -> Real {
    if observed.is_empty() {
        return 0.0;
    }
    let mean = observed.iter().sum::<Real>() / observed.len() as Real;
    let total: Real = observed.iter().map(|y| (y - mean).powi(2)).sum();
    if total > 0.0 {
        1.0 - residual_sum_of_squares / total
    } else {
        0.0
    }
}

/// Robust estimate of the standard deviation, falling back to the
/// sample standard deviation when more than half the values coincide.
fn robust_sigma(values: &[Real], centre: Real) -> Real {
    let deviations: Vec<Real> = values.iter().map(|v| (v - centre).abs()).collect();
    let mad = median(&deviations);
    if mad > 0.0 {
        MAD_TO_SIGMA * mad
    } else {
        let mean = values.iter().sum::<Real>() / values.len() as Real;
        (values.iter().map(|v| (v - mean).powi(2)).sum::<Real>() / values.len() as Real).sqrt()
    }
}

/// Median of the finite values, zero if there are none.
fn median(values: &[Real]) -> Real {
    let mut values: Array1<N64> = values.iter().copied().filter_map(N64::try_new).collect();
    values
        .quantile_mut(n64(0.5), &Midpoint)
        .map(N64::raw)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{SeedableRng, rngs::StdRng};
    use rand_distr::{Distribution, Normal};

    fn normalizer() -> SignalNormalizer {
        SignalNormalizer::new(&NormalizationParameters::default())
    }

    fn gaussian_noise(mean: Real, sigma: Real, len: usize, seed: u64) -> Vec<Real> {
        let distr = Normal::new(mean, sigma).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len).map(|_| distr.sample(&mut rng)).collect()
    }

    #[test]
    fn median_of_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
        assert_eq!(median(&[Real::NAN, 1.0]), 1.0);
    }

    #[test]
    fn gaussian_noise_fits_well() {
        let samples = gaussian_noise(5.0, 2.0, 5000, 1);
        let result = normalizer().normalize(&samples);
        assert!(result.quality > 0.95, "quality {}", result.quality);
        assert_approx_eq!(result.scale, 2.0, 0.15);
        assert_approx_eq!(result.offset, 5.0, 0.15);
    }

    #[test]
    fn constant_signal_is_degenerate() {
        let result = normalizer().normalize(&vec![3.0; 1000]);
        assert_eq!(result.quality, 0.0);
        assert!(!result.has_valid_scale());
        assert_eq!(result.offset, 3.0);
    }

    #[test]
    fn flat_zero_signal_is_degenerate() {
        let result = normalizer().normalize(&vec![0.0; 1000]);
        assert_eq!(result.quality, 0.0);
        assert!(!result.has_valid_scale());
    }

    #[test]
    fn bimodal_signal_fits_poorly() {
        let samples: Vec<Real> = (0..5000)
            .map(|i| if (i / 10) % 2 == 1 { 1.0 } else { -1.0 })
            .collect();
        let result = normalizer().normalize(&samples);
        assert!(result.quality < 0.5, "quality {}", result.quality);
    }

    #[test]
    fn blanks_do_not_influence_statistics() {
        let samples = gaussian_noise(5.0, 2.0, 5000, 2);
        let mut with_blanks = samples.clone();
        with_blanks.extend(std::iter::repeat_n(0.0, 20_000));
        let without = normalizer().normalize(&samples);
        let with = normalizer().normalize(&with_blanks);
        assert_eq!(without, with);
    }

    #[test]
    fn renormalised_signal_has_unit_scale() {
        let samples = gaussian_noise(-3.0, 7.5, 5000, 3);
        let first = normalizer().normalize(&samples);
        let second = normalizer().normalize(&first.standardize(&samples));
        assert_approx_eq!(second.scale, 1.0, 1e-3);
        assert_approx_eq!(second.offset, 0.0, 1e-3);
    }

    #[test]
    fn standardize_keeps_blanks() {
        let stats = NormalizationResult {
            quality: 1.0,
            scale: 2.0,
            offset: 1.0,
        };
        assert_eq!(stats.standardize(&[5.0, 0.0, -1.0]), vec![2.0, 0.0, -1.0]);
    }
}
