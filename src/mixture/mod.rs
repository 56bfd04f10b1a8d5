//! Gaussian Mixture Models.
//!
//! A mixture models data as a weighted sum of `K` Gaussians:
//!
//! ```text
//! P(x) = Σₖ πₖ × N(x | μₖ, Σₖ)
//! ```
//!
//! Where:
//! - πₖ = prior (mixing weight) of state k
//! - μₖ = mean of state k
//! - Σₖ = covariance of state k
//!
//! # Lifecycle
//!
//! 1. [`GaussianMixture::new`] creates an empty model (0 states, uninitialized)
//! 2. [`GaussianMixture::set_num_states`] allocates `K` default components at
//!    uniform priors `1/K`
//! 3. One initialization strategy populates the parameters:
//!    - [`init_random`](GaussianMixture::init_random): means picked from the data
//!    - [`init_uniform_along_axis`](GaussianMixture::init_uniform_along_axis):
//!      means spread evenly along one coordinate
//!    - [`init_kmeans`](GaussianMixture::init_kmeans): random seeding refined
//!      by k-means, which also estimates covariances
//! 4. Optionally refine with EM ([`GaussianMixture::em`]) or derive a
//!    regression model ([`GaussianMixture::regression_model`])
//!
//! Queries on a model that was never initialized are not errors: density is
//! zero, the most likely state is 0 and no sample is drawn.
//!
//! Priors are expected to sum to one, but the model never renormalizes them;
//! that is up to whoever sets them.

mod init;
pub(crate) mod kmeans;

use ndarray::{aview1, Array1, ArrayView1, ArrayView2};
use rand::prelude::*;

use crate::em::Em;
use crate::gaussian::{to_matrix, Component, Gaussian};
use crate::gmr::Gmr;
use crate::linalg;

/// Gaussian Mixture Model over a `D`-dimensional space.
#[derive(Debug, Clone)]
pub struct GaussianMixture<const D: usize, G = Gaussian<D>> {
    pub(crate) components: Vec<G>,
    pub(crate) priors: Array1<f64>,
    pub(crate) initialized: bool,
    /// Random seed for the seeding strategies.
    seed: Option<u64>,
}

impl<const D: usize, G: Component<D>> GaussianMixture<D, G> {
    /// Create an empty, uninitialized model.
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            priors: Array1::zeros(0),
            initialized: false,
            seed: None,
        }
    }

    /// Set random seed used by the initialization strategies.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Dimension of the modeled space.
    pub fn dim(&self) -> usize {
        D
    }

    /// Resize to `num` states with uniform priors `1/num`.
    ///
    /// Existing components are kept, new ones start at their default
    /// (zero mean, identity covariance). The initialized flag is left as is.
    pub fn set_num_states(&mut self, num: usize) -> &mut Self {
        self.components.resize_with(num, G::default);
        self.priors = Array1::from_elem(num, 1.0 / num as f64);
        self
    }

    /// Number of mixture states.
    pub fn num_states(&self) -> usize {
        self.components.len()
    }

    /// Whether an initialization strategy ran (or was forced).
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Mark the model as usable without running an initialization strategy,
    /// e.g. after setting every parameter by hand.
    pub fn force_initialize(&mut self) -> &mut Self {
        self.initialized = true;
        self
    }

    /// Set the mean of `state`.
    pub fn set_mean(&mut self, state: usize, mean: &[f64; D]) -> &mut Self {
        self.component_mut(state).set_mean(aview1(mean));
        self
    }

    /// Set the covariance of `state`.
    pub fn set_covariance(&mut self, state: usize, covariance: &[[f64; D]; D]) -> &mut Self {
        let covariance = to_matrix(covariance);
        self.component_mut(state).set_covariance(covariance.view());
        self
    }

    /// Set the prior of `state`.
    pub fn set_prior(&mut self, state: usize, prior: f64) -> &mut Self {
        self.check_state(state);
        self.priors[state] = prior;
        self
    }

    /// Replace all priors. Panics unless `priors.len() == num_states()`.
    pub fn set_priors(&mut self, priors: &[f64]) -> &mut Self {
        assert_eq!(
            priors.len(),
            self.num_states(),
            "expected {} priors",
            self.num_states()
        );
        self.priors = Array1::from(priors.to_vec());
        self
    }

    /// Prior of `state`.
    pub fn prior(&self, state: usize) -> f64 {
        self.check_state(state);
        self.priors[state]
    }

    /// All priors.
    pub fn priors(&self) -> ArrayView1<'_, f64> {
        self.priors.view()
    }

    /// Mean of `state`.
    pub fn mean(&self, state: usize) -> ArrayView1<'_, f64> {
        self.component(state).mean()
    }

    /// Covariance of `state`.
    pub fn covariance(&self, state: usize) -> ArrayView2<'_, f64> {
        self.component(state).covariance()
    }

    /// Component of `state`.
    pub fn component(&self, state: usize) -> &G {
        self.check_state(state);
        &self.components[state]
    }

    /// Mutable component of `state`.
    pub fn component_mut(&mut self, state: usize) -> &mut G {
        self.check_state(state);
        &mut self.components[state]
    }

    /// All components in state order.
    pub fn components(&self) -> &[G] {
        &self.components
    }

    fn check_state(&self, state: usize) {
        assert!(
            state < self.num_states(),
            "state {state} out of range for {} states",
            self.num_states()
        );
    }

    /// RNG for the seeding strategies.
    fn rng(&self) -> Box<dyn RngCore> {
        match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        }
    }

    /// Mixture density at `x`. Zero if the model is not initialized.
    pub fn pdf(&self, x: &[f64; D]) -> f64 {
        if !self.initialized {
            return 0.0;
        }
        let x = aview1(x);
        self.components
            .iter()
            .zip(self.priors.iter())
            .map(|(g, &prior)| prior * g.pdf(x))
            .sum()
    }

    /// Log of the mixture density, computed with log-sum-exp.
    /// Negative infinity if the model is not initialized.
    pub fn log_pdf(&self, x: &[f64; D]) -> f64 {
        if !self.initialized {
            return f64::NEG_INFINITY;
        }
        linalg::logsumexp(&self.weighted_log_densities(x))
    }

    /// State maximizing `prior × density` at `x`.
    ///
    /// The first state wins ties; 0 is returned when the model is not
    /// initialized or every state has zero weighted density.
    pub fn most_likely_state(&self, x: &[f64; D]) -> usize {
        if !self.initialized {
            return 0;
        }
        let x = aview1(x);
        let mut best = 0;
        let mut best_likelihood = 0.0;
        for (state, (g, &prior)) in self.components.iter().zip(self.priors.iter()).enumerate() {
            let likelihood = prior * g.pdf(x);
            if likelihood > best_likelihood {
                best_likelihood = likelihood;
                best = state;
            }
        }
        best
    }

    /// Posterior probability of each state given `x`.
    ///
    /// `None` if the model is not initialized or no state explains `x`.
    pub fn responsibilities(&self, x: &[f64; D]) -> Option<Array1<f64>> {
        if !self.initialized || self.components.is_empty() {
            return None;
        }
        let log_weighted = self.weighted_log_densities(x);
        let log_total = linalg::logsumexp(&log_weighted);
        if log_total.is_infinite() {
            return None;
        }
        Some(log_weighted.iter().map(|&v| (v - log_total).exp()).collect())
    }

    fn weighted_log_densities(&self, x: &[f64; D]) -> Vec<f64> {
        let x = aview1(x);
        self.components
            .iter()
            .zip(self.priors.iter())
            .map(|(g, &prior)| prior.ln() + g.log_pdf(x))
            .collect()
    }

    /// Draw a sample using the thread-local RNG.
    pub fn draw(&self) -> Option<[f64; D]> {
        self.draw_with(&mut rand::rng())
    }

    /// Draw a sample: pick a state by its prior, then sample that state.
    ///
    /// `None` if the model is not initialized or has no states.
    pub fn draw_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<[f64; D]> {
        if !self.initialized || self.components.is_empty() {
            return None;
        }
        let threshold: f64 = rng.random();
        let state = self.select_state(threshold);
        let sample = self.components[state].draw(rng);

        let mut point = [0.0; D];
        point.iter_mut().zip(sample.iter()).for_each(|(p, &v)| *p = v);
        Some(point)
    }

    /// Walk the cumulative priors until they exceed `threshold`.
    ///
    /// Priors that do not sum to one can exhaust the walk; the last state is
    /// returned in that case.
    pub(crate) fn select_state(&self, threshold: f64) -> usize {
        let mut accum = 0.0;
        for (state, &prior) in self.priors.iter().enumerate() {
            accum += prior;
            if accum > threshold {
                return state;
            }
        }
        self.num_states().saturating_sub(1)
    }

    /// EM refinement bound to this model.
    pub fn em(&mut self) -> Em<'_, D, G> {
        Em::new(self)
    }

    /// Regression model predicting the last `P` dimensions from the first
    /// `D - P`. Panics if `P > D`.
    pub fn regression_model<const P: usize>(&self) -> Gmr<'_, D, P, G> {
        Gmr::new(self)
    }
}

impl<const D: usize, G: Component<D>> Default for GaussianMixture<D, G> {
    fn default() -> Self {
        Self::new()
    }
}
