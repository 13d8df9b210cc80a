use nalgebra::{Dyn, Matrix3, OMatrix, OVector, U3, Vector3};
use swd_common::Real;

const CONVERGENCE_TOLERANCE: Real = 1e-10;
const INITIAL_DAMPING: Real = 1e-3;
const MIN_DAMPING: Real = 1e-12;
const MAX_DAMPING: Real = 1e12;

/// Parameters of `amplitude * exp(-(x - mean)^2 / (2 * sigma^2))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Gaussian {
    pub(crate) amplitude: Real,
    pub(crate) mean: Real,
    pub(crate) sigma: Real,
}

impl Gaussian {
    pub(crate) fn evaluate(&self, x: Real) -> Real {
        self.amplitude * self.kernel(x)
    }

    fn kernel(&self, x: Real) -> Real {
        (-(x - self.mean).powi(2) / (2.0 * self.sigma.powi(2))).exp()
    }

    /// Partial derivative with respect to amplitude (0), mean (1) or sigma (2).
    fn partial(&self, x: Real, parameter: usize) -> Real {
        let kernel = self.kernel(x);
        let offset = x - self.mean;
        match parameter {
            0 => kernel,
            1 => self.amplitude * kernel * offset / self.sigma.powi(2),
            _ => self.amplitude * kernel * offset.powi(2) / self.sigma.powi(3),
        }
    }

    fn shifted(&self, step: &Vector3<Real>) -> Self {
        Self {
            amplitude: self.amplitude + step[0],
            mean: self.mean + step[1],
            sigma: (self.sigma + step[2]).abs(),
        }
    }

    fn sum_of_squares(&self, xs: &[Real], ys: &[Real]) -> Real {
        xs.iter()
            .zip(ys)
            .map(|(&x, &y)| (y - self.evaluate(x)).powi(2))
            .sum()
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct GaussianFit {
    pub(crate) curve: Gaussian,
    pub(crate) residual_sum_of_squares: Real,
    pub(crate) iterations: usize,
}

/// Fits a Gaussian to the points `(xs, ys)` by Levenberg-Marquardt least squares,
/// starting from `initial`.
pub(crate) fn fit_gaussian(
    xs: &[Real],
    ys: &[Real],
    initial: Gaussian,
    max_iterations: usize,
) -> GaussianFit {
    let mut curve = initial;
    let mut current = curve.sum_of_squares(xs, ys);
    let mut damping = INITIAL_DAMPING;
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;
        let (normal, gradient) = normal_equations(&curve, xs, ys);

        let mut improved = None;
        while damping <= MAX_DAMPING {
            let damped = normal + Matrix3::from_diagonal(&(normal.diagonal() * damping));
            if let Some(step) = solve_step(damped, &gradient) {
                let candidate = curve.shifted(&step);
                let candidate_ss = candidate.sum_of_squares(xs, ys);
                if candidate_ss.is_finite() && candidate_ss < current {
                    improved = Some((candidate, candidate_ss));
                    damping = (damping / 10.0).max(MIN_DAMPING);
                    break;
                }
            }
            damping *= 10.0;
        }

        match improved {
            Some((candidate, candidate_ss)) => {
                let converged = current - candidate_ss <= CONVERGENCE_TOLERANCE * current;
                curve = candidate;
                current = candidate_ss;
                if converged {
                    break;
                }
            }
            None => break,
        }
    }

    GaussianFit {
        curve,
        residual_sum_of_squares: current,
        iterations,
    }
}

/// Returns `(J^T J, J^T r)` for the residuals `r = y - f(x)`.
fn normal_equations(curve: &Gaussian, xs: &[Real], ys: &[Real]) -> (Matrix3<Real>, Vector3<Real>) {
    let jacobian = OMatrix::<Real, Dyn, U3>::from_fn(xs.len(), |row, parameter| {
        curve.partial(xs[row], parameter)
    });
    let residuals = OVector::<Real, Dyn>::from_iterator(
        xs.len(),
        xs.iter().zip(ys).map(|(&x, &y)| y - curve.evaluate(x)),
    );
    let transposed = jacobian.transpose();
    (&transposed * &jacobian, &transposed * &residuals)
}

/// Solves the damped normal equations by LU decomposition.
fn solve_step(matrix: Matrix3<Real>, rhs: &Vector3<Real>) -> Option<Vector3<Real>> {
    matrix
        .lu()
        .solve(rhs)
        .filter(|step| step.iter().all(|v| v.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn solves_linear_system() {
        let solution = solve_step(
            Matrix3::new(2.0, 1.0, -1.0, -3.0, -1.0, 2.0, -2.0, 1.0, 2.0),
            &Vector3::new(8.0, -11.0, -3.0),
        )
        .unwrap();
        assert_approx_eq!(solution[0], 2.0, 1e-12);
        assert_approx_eq!(solution[1], 3.0, 1e-12);
        assert_approx_eq!(solution[2], -1.0, 1e-12);
    }

    #[test]
    fn singular_system_has_no_solution() {
        let singular = Matrix3::new(1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 0.0, 0.0);
        assert!(solve_step(singular, &Vector3::new(1.0, 2.0, 0.0)).is_none());
    }

    #[test]
    fn recovers_exact_gaussian() {
        let truth = Gaussian {
            amplitude: 120.0,
            mean: 1.5,
            sigma: 0.8,
        };
        let xs: Vec<Real> = (0..80).map(|i| -2.0 + i as Real * 0.1).collect();
        let ys: Vec<Real> = xs.iter().map(|&x| truth.evaluate(x)).collect();
        let fit = fit_gaussian(
            &xs,
            &ys,
            Gaussian {
                amplitude: 100.0,
                mean: 1.0,
                sigma: 1.2,
            },
            200,
        );
        assert_approx_eq!(fit.curve.amplitude, 120.0, 1e-4);
        assert_approx_eq!(fit.curve.mean, 1.5, 1e-6);
        assert_approx_eq!(fit.curve.sigma, 0.8, 1e-6);
        assert!(fit.residual_sum_of_squares < 1e-6);
    }

    #[test]
    fn zero_iterations_keeps_initial_curve() {
        let initial = Gaussian {
            amplitude: 1.0,
            mean: 0.0,
            sigma: 1.0,
        };
        let fit = fit_gaussian(&[0.0, 1.0], &[2.0, 1.0], initial, 0);
        assert_eq!(fit.curve, initial);
        assert_eq!(fit.iterations, 0);
    }
}
