//! Expectation-Maximization refinement.
//!
//! Refines an initialized mixture in place to increase data likelihood.
//!
//! **E-step**: compute "responsibilities" (soft assignments):
//! ```text
//! γₙₖ = πₖ N(xₙ | μₖ, Σₖ) / Σⱼ πⱼ N(xₙ | μⱼ, Σⱼ)
//! ```
//!
//! **M-step**: update parameters using responsibilities:
//! - Nₖ = Σₙ γₙₖ
//! - πₖ = Nₖ / N
//! - μₖ = Σₙ γₙₖ xₙ / Nₖ
//! - Σₖ = Σₙ γₙₖ (xₙ - μₖ)(xₙ - μₖ)ᵀ / Nₖ + λI
//!
//! The ridge λ (`reg_covar`) keeps small clusters from collapsing onto a
//! singular covariance.
//!
//! # Failure Modes
//!
//! - **Local optima**: EM converges to a local maximum; initialization matters,
//!   which is why the model is seeded (usually by k-means) first
//! - **Empty components**: a state with negligible responsibility keeps its
//!   previous mean and covariance

use ndarray::{aview1, Array1, Array2, Axis};
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::gaussian::{Component, Gaussian};
use crate::linalg;
use crate::mixture::GaussianMixture;

/// Refinement of a mixture from training data.
pub trait Refinement<const D: usize> {
    /// Run one refinement iteration, returning the mean log-likelihood of
    /// the data under the parameters before the update.
    fn step(&mut self, data: &[[f64; D]]) -> Result<f64>;

    /// Iterate until convergence or the iteration budget is spent.
    fn run(&mut self, data: &[[f64; D]]) -> Result<EmReport>;
}

/// Summary of an EM run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmReport {
    /// Iterations performed.
    pub iterations: usize,
    /// Mean log-likelihood measured by the final iteration.
    pub log_likelihood: f64,
    /// Whether the improvement dropped below the tolerance.
    pub converged: bool,
}

/// Expectation-Maximization bound to a mixture.
///
/// Holds the model by mutable reference: every step rewrites its priors,
/// means and covariances in place.
#[derive(Debug)]
pub struct Em<'a, const D: usize, G = Gaussian<D>> {
    model: &'a mut GaussianMixture<D, G>,
    /// Maximum EM iterations.
    max_iter: usize,
    /// Convergence tolerance on the mean log-likelihood.
    tol: f64,
    /// Regularization for covariance.
    reg_covar: f64,
}

impl<'a, const D: usize, G: Component<D>> Em<'a, D, G> {
    /// Bind EM to `model`.
    pub fn new(model: &'a mut GaussianMixture<D, G>) -> Self {
        Self {
            model,
            max_iter: 100,
            tol: 1e-3,
            reg_covar: 1e-6,
        }
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the ridge added to every covariance diagonal.
    pub fn with_reg_covar(mut self, reg_covar: f64) -> Self {
        self.reg_covar = reg_covar;
        self
    }

    /// The bound model.
    pub fn model(&self) -> &GaussianMixture<D, G> {
        &*self.model
    }

    fn validate(&self, data: &[[f64; D]]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::EmptyInput);
        }
        if self.model.num_states() == 0 {
            return Err(Error::InvalidClusterCount {
                requested: 0,
                n_items: data.len(),
            });
        }
        if !self.model.is_initialized() {
            return Err(Error::NotInitialized);
        }
        if !(self.reg_covar >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "reg_covar",
                message: "must be >= 0",
            });
        }
        Ok(())
    }

    /// E-step: responsibilities (n × k) and the summed log-likelihood.
    ///
    /// Fails when no pattern has positive likelihood under any state.
    fn expectation(&self, data: &[[f64; D]]) -> Result<(Array2<f64>, f64)> {
        let n = data.len();
        let k = self.model.num_states();
        let mut resp = Array2::zeros((n, k));
        let mut log_likelihood = 0.0;
        let mut unexplained = 0usize;

        let mut log_probs = vec![0.0; k];
        for (i, point) in data.iter().enumerate() {
            let x = aview1(point);
            for (c, (g, &prior)) in self
                .model
                .components
                .iter()
                .zip(self.model.priors.iter())
                .enumerate()
            {
                log_probs[c] = prior.ln() + g.log_pdf(x);
            }

            let log_sum = linalg::logsumexp(&log_probs);
            if log_sum.is_infinite() {
                // No state explains this point: spread it evenly.
                unexplained += 1;
                resp.row_mut(i).fill(1.0 / k as f64);
                continue;
            }
            log_likelihood += log_sum;
            for c in 0..k {
                resp[[i, c]] = (log_probs[c] - log_sum).exp();
            }
        }

        if unexplained == n {
            error!(patterns = n, "no pattern has positive likelihood under any state");
            return Err(Error::ZeroLikelihood);
        }
        if unexplained > 0 {
            warn!(unexplained, "patterns with zero likelihood under every state");
        }
        Ok((resp, log_likelihood))
    }

    /// M-step: re-estimate priors, means and covariances.
    fn maximization(&mut self, data: &[[f64; D]], resp: &Array2<f64>) {
        let n = data.len();
        let resp_sum = resp.sum_axis(Axis(0));

        // Update weights
        for (prior, &sum) in self.model.priors.iter_mut().zip(resp_sum.iter()) {
            *prior = sum / n as f64;
        }

        for (c, g) in self.model.components.iter_mut().enumerate() {
            if resp_sum[c] <= 1e-10 {
                debug!(state = c, "state lost all responsibility, keeping parameters");
                continue;
            }

            // Update means
            let mut mean = Array1::<f64>::zeros(D);
            for (i, point) in data.iter().enumerate() {
                mean.scaled_add(resp[[i, c]], &aview1(point));
            }
            mean /= resp_sum[c];

            // Update covariances
            let mut covariance = Array2::<f64>::zeros((D, D));
            for (i, point) in data.iter().enumerate() {
                let diff = &aview1(point) - &mean;
                let column = diff.view().insert_axis(Axis(1));
                covariance.scaled_add(resp[[i, c]], &column.dot(&column.t()));
            }
            covariance /= resp_sum[c];
            covariance.diag_mut().mapv_inplace(|v| v + self.reg_covar);

            g.set_mean(mean.view());
            g.set_covariance(covariance.view());
        }
    }
}

impl<const D: usize, G: Component<D>> Refinement<D> for Em<'_, D, G> {
    fn step(&mut self, data: &[[f64; D]]) -> Result<f64> {
        self.validate(data)?;
        let (resp, log_likelihood) = self.expectation(data)?;
        self.maximization(data, &resp);
        Ok(log_likelihood / data.len() as f64)
    }

    fn run(&mut self, data: &[[f64; D]]) -> Result<EmReport> {
        self.validate(data)?;

        let mut previous = f64::NEG_INFINITY;
        let mut report = EmReport {
            iterations: 0,
            log_likelihood: f64::NEG_INFINITY,
            converged: false,
        };

        for iter in 0..self.max_iter {
            let log_likelihood = self.step(data)?;
            report.iterations = iter + 1;
            report.log_likelihood = log_likelihood;
            debug!(iteration = iter, log_likelihood, "em iteration");

            if (log_likelihood - previous).abs() < self.tol {
                report.converged = true;
                break;
            }
            previous = log_likelihood;
        }

        debug!(
            iterations = report.iterations,
            log_likelihood = report.log_likelihood,
            converged = report.converged,
            "em finished"
        );
        Ok(report)
    }
}
