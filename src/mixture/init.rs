//! Initialization strategies.
//!
//! Each strategy places the component means (k-means also estimates
//! covariances) and marks the model initialized. Exactly one should run
//! before the model is queried or refined further.

use ndarray::aview1;
use rand::Rng;
use tracing::debug;

use super::GaussianMixture;
use crate::error::{Error, Result};
use crate::gaussian::Component;

impl<const D: usize, G: Component<D>> GaussianMixture<D, G> {
    fn check_training_data(&self, data: &[[f64; D]]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::EmptyInput);
        }
        if self.num_states() == 0 {
            return Err(Error::InvalidClusterCount {
                requested: 0,
                n_items: data.len(),
            });
        }
        Ok(())
    }

    /// Set every mean to a data point drawn uniformly with replacement.
    /// Covariances are left untouched.
    pub fn init_random(&mut self, data: &[[f64; D]]) -> Result<&mut Self> {
        let mut rng = self.rng();
        self.init_random_with(data, &mut rng)
    }

    /// [`init_random`](Self::init_random) with a caller-supplied RNG.
    pub fn init_random_with<R: Rng + ?Sized>(
        &mut self,
        data: &[[f64; D]],
        rng: &mut R,
    ) -> Result<&mut Self> {
        self.check_training_data(data)?;
        let n = data.len();
        for g in self.components.iter_mut() {
            let next = rng.random_range(0..n);
            g.set_mean(aview1(&data[next]));
        }
        self.initialized = true;
        Ok(self)
    }

    /// Spread the means evenly along coordinate `axis`.
    ///
    /// State `i` gets the data point whose `axis` coordinate is closest to
    /// `min + (max - min) * i / num_states`, the first such point on ties.
    /// Deterministic for a given dataset. Panics if `axis >= D`.
    pub fn init_uniform_along_axis(&mut self, data: &[[f64; D]], axis: usize) -> Result<&mut Self> {
        assert!(axis < D, "axis {axis} out of range for dimension {D}");
        self.check_training_data(data)?;

        let (min, max) = data
            .iter()
            .map(|p| p[axis])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });

        let k = self.num_states();
        for (i, g) in self.components.iter_mut().enumerate() {
            let desired = (max - min) * i as f64 / k as f64 + min;
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (j, point) in data.iter().enumerate() {
                let dist = (desired - point[axis]).abs();
                if dist < best_dist {
                    best_dist = dist;
                    best = j;
                }
            }
            g.set_mean(aview1(&data[best]));
        }
        self.initialized = true;
        Ok(self)
    }

    /// Random seeding followed by up to `max_iter` rounds of k-means.
    ///
    /// Besides the means, k-means sets each covariance to the sample
    /// covariance of the patterns assigned to that state.
    pub fn init_kmeans(&mut self, data: &[[f64; D]], max_iter: usize) -> Result<&mut Self> {
        let mut rng = self.rng();
        self.init_kmeans_with(data, max_iter, &mut rng)
    }

    /// [`init_kmeans`](Self::init_kmeans) with a caller-supplied RNG.
    pub fn init_kmeans_with<R: Rng + ?Sized>(
        &mut self,
        data: &[[f64; D]],
        max_iter: usize,
        rng: &mut R,
    ) -> Result<&mut Self> {
        self.init_random_with(data, rng)?;
        let rounds = self.refine_kmeans(data, max_iter);
        self.initialized = true;

        for (state, g) in self.components.iter().enumerate() {
            debug!(
                state,
                rounds,
                mean = ?g.mean().to_vec(),
                covariance = ?g.covariance().iter().collect::<Vec<_>>(),
                "state after k-means"
            );
        }
        Ok(self)
    }
}
