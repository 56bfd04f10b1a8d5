//! Gaussian Mixture Regression.
//!
//! Splits each component over input dimensions `[0, D-P)` and output
//! dimensions `[D-P, D)`:
//!
//! ```text
//! μₖ = [μₖⁱ; μₖᵒ]      Σₖ = [Σₖⁱⁱ Σₖⁱᵒ; Σₖᵒⁱ Σₖᵒᵒ]
//! ```
//!
//! and predicts the output as the mixture of per-component conditionals:
//!
//! ```text
//! hₖ(x)  = πₖ N(x | μₖⁱ, Σₖⁱⁱ) / Σⱼ πⱼ N(x | μⱼⁱ, Σⱼⁱⁱ)
//! mₖ(x)  = μₖᵒ + Σₖᵒⁱ (Σₖⁱⁱ)⁻¹ (x - μₖⁱ)
//! Cₖ     = Σₖᵒᵒ - Σₖᵒⁱ (Σₖⁱⁱ)⁻¹ Σₖⁱᵒ
//! E[y|x] = Σₖ hₖ(x) mₖ(x)
//! ```

use ndarray::{s, Array1, Array2, Axis};

use crate::error::{Error, Result};
use crate::gaussian::{Component, Gaussian};
use crate::linalg::{self, Cholesky};
use crate::mixture::GaussianMixture;

/// Conditional prediction from a trained model.
pub trait Regression {
    /// Number of input dimensions.
    fn input_dim(&self) -> usize;

    /// Number of output dimensions.
    fn output_dim(&self) -> usize;

    /// Expected output given `input`.
    fn predict(&self, input: &[f64]) -> Result<Array1<f64>>;
}

/// Gaussian Mixture Regression over a borrowed mixture.
///
/// Reads the mixture's current parameters on every prediction; nothing is
/// copied at construction.
#[derive(Debug, Clone)]
pub struct Gmr<'a, const D: usize, const P: usize, G = Gaussian<D>> {
    model: &'a GaussianMixture<D, G>,
}

/// One component's conditional over the outputs.
struct Conditional {
    log_weight: f64,
    mean: Array1<f64>,
    covariance: Array2<f64>,
}

impl<'a, const D: usize, const P: usize, G: Component<D>> Gmr<'a, D, P, G> {
    /// Bind to `model`. Panics if `P > D`.
    pub fn new(model: &'a GaussianMixture<D, G>) -> Self {
        assert!(P <= D, "output dimension {P} exceeds model dimension {D}");
        Self { model }
    }

    /// The bound model.
    pub fn model(&self) -> &'a GaussianMixture<D, G> {
        self.model
    }

    fn conditionals(&self, input: &[f64]) -> Result<Vec<Conditional>> {
        let m = D - P;
        if input.len() != m {
            return Err(Error::DimensionMismatch {
                expected: m,
                found: input.len(),
            });
        }
        if !self.model.is_initialized() || self.model.num_states() == 0 {
            return Err(Error::NotInitialized);
        }
        let x = Array1::from(input.to_vec());

        self.model
            .components()
            .iter()
            .zip(self.model.priors().iter())
            .map(|(g, &prior)| {
                let mean = g.mean();
                let cov = g.covariance();
                let (mean_in, mean_out) = (mean.slice(s![..m]), mean.slice(s![m..]));
                let cov_in = cov.slice(s![..m, ..m]);
                let cov_out_in = cov.slice(s![m.., ..m]);
                let cov_out = cov.slice(s![m.., m..]);

                if m == 0 {
                    return Ok(Conditional {
                        log_weight: prior.ln(),
                        mean: mean_out.to_owned(),
                        covariance: cov_out.to_owned(),
                    });
                }

                let chol = Cholesky::new(cov_in).ok_or(Error::SingularMatrix)?;
                let diff = &x - &mean_in;
                let log_weight = prior.ln() + chol.log_density(diff.view());

                let z = chol.solve(diff.view());
                let mean = &mean_out + &cov_out_in.dot(&z);

                // Σᵒⁱ (Σⁱⁱ)⁻¹ Σⁱᵒ, one output column at a time.
                let mut explained = Array2::<f64>::zeros((P, P));
                for (j, row) in cov_out_in.axis_iter(Axis(0)).enumerate() {
                    let solved = chol.solve(row);
                    explained.column_mut(j).assign(&cov_out_in.dot(&solved));
                }
                let covariance = &cov_out - &explained;

                Ok(Conditional {
                    log_weight,
                    mean,
                    covariance,
                })
            })
            .collect()
    }

    fn weights(conditionals: &[Conditional]) -> Result<Vec<f64>> {
        let log_weights: Vec<f64> = conditionals.iter().map(|c| c.log_weight).collect();
        let log_total = linalg::logsumexp(&log_weights);
        if log_total.is_infinite() {
            return Err(Error::ZeroLikelihood);
        }
        Ok(log_weights.iter().map(|&w| (w - log_total).exp()).collect())
    }

    /// Expected output and its covariance given `input`.
    ///
    /// The covariance combines each component's conditional covariance with
    /// the spread of the component means.
    pub fn predict_with_covariance(&self, input: &[f64]) -> Result<(Array1<f64>, Array2<f64>)> {
        let conditionals = self.conditionals(input)?;
        let weights = Self::weights(&conditionals)?;

        let mut mean = Array1::<f64>::zeros(P);
        let mut second_moment = Array2::<f64>::zeros((P, P));
        for (c, &h) in conditionals.iter().zip(&weights) {
            mean.scaled_add(h, &c.mean);
            let column = c.mean.view().insert_axis(Axis(1));
            second_moment.scaled_add(h, &(&c.covariance + &column.dot(&column.t())));
        }
        let column = mean.view().insert_axis(Axis(1));
        let covariance = second_moment - column.dot(&column.t());
        Ok((mean, covariance))
    }
}

impl<const D: usize, const P: usize, G: Component<D>> Regression for Gmr<'_, D, P, G> {
    fn input_dim(&self) -> usize {
        D - P
    }

    fn output_dim(&self) -> usize {
        P
    }

    fn predict(&self, input: &[f64]) -> Result<Array1<f64>> {
        let conditionals = self.conditionals(input)?;
        let weights = Self::weights(&conditionals)?;
        let mut mean = Array1::<f64>::zeros(P);
        for (c, &h) in conditionals.iter().zip(&weights) {
            mean.scaled_add(h, &c.mean);
        }
        Ok(mean)
    }
}
