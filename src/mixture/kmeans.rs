//! K-means refinement of mixture parameters.
//!
//! Lloyd's algorithm over the component means, used to seed a mixture
//! before any finer refinement:
//!
//! 1. **Assign**: each pattern → nearest component mean (squared Euclidean)
//! 2. **Update**: each mean → average of its patterns; each covariance →
//!    sample covariance of the same patterns
//! 3. Repeat until no assignment changes, or the round budget runs out
//!
//! ```text
//! μₖ = (1/|Cₖ|) Σᵢ∈Cₖ xᵢ
//! Σₖ = (1/|Cₖ|) Σᵢ∈Cₖ (xᵢ - μₖ)(xᵢ - μₖ)ᵀ
//! ```
//!
//! # Label Buffers
//!
//! Two label buffers alternate between "current" and "previous" so no round
//! allocates. The previous buffer starts out as all `None`, so the first
//! assignment always counts as changed.
//!
//! # Empty Clusters
//!
//! A state that attracts no patterns keeps its mean and gets an identity
//! covariance. This is a stability fallback, not an error: the next
//! assignment round usually pulls patterns back toward it.

use ndarray::{aview1, Array2, Axis};
use tracing::debug;

use super::GaussianMixture;
use crate::gaussian::Component;

/// Outcome of one assignment round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Assignment {
    /// Total squared distance of every pattern to its assigned mean.
    pub inertia: f64,
    /// Whether any label differs from the previous round.
    pub changed: bool,
}

/// Compute squared Euclidean distance.
fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

impl<const D: usize, G: Component<D>> GaussianMixture<D, G> {
    /// Assign every pattern to its nearest component mean.
    ///
    /// Writes into `labels` and compares against `previous`. The first
    /// state wins ties.
    pub(crate) fn assign(
        &self,
        data: &[[f64; D]],
        labels: &mut [Option<usize>],
        previous: &[Option<usize>],
    ) -> Assignment {
        let mut inertia = 0.0;

        for (point, label) in data.iter().zip(labels.iter_mut()) {
            let mut best_state = 0;
            let mut best_dist = f64::MAX;

            for (state, g) in self.components.iter().enumerate() {
                let mean = g.mean();
                let dist = match mean.as_slice() {
                    Some(mean) => squared_distance(point, mean),
                    None => squared_distance(point, &mean.to_vec()),
                };
                if dist < best_dist {
                    best_dist = dist;
                    best_state = state;
                }
            }
            *label = Some(best_state);
            inertia += best_dist;
        }

        let changed = labels.iter().zip(previous).any(|(a, b)| a != b);
        Assignment { inertia, changed }
    }

    /// Recompute every mean and covariance from the current labels.
    pub(crate) fn update_clusters(&mut self, data: &[[f64; D]], labels: &[Option<usize>]) {
        let k = self.num_states();
        let mut counts = vec![0usize; k];
        let mut means = Array2::<f64>::zeros((k, D));

        for (point, label) in data.iter().zip(labels) {
            let Some(state) = *label else { continue };
            counts[state] += 1;
            let mut row = means.row_mut(state);
            row += &aview1(point);
        }
        for (mut row, &count) in means.axis_iter_mut(Axis(0)).zip(&counts) {
            if count > 0 {
                row /= count as f64;
            }
        }

        let mut scatter = vec![Array2::<f64>::zeros((D, D)); k];
        for (point, label) in data.iter().zip(labels) {
            let Some(state) = *label else { continue };
            let diff = &aview1(point) - &means.row(state);
            let column = diff.view().insert_axis(Axis(1));
            scatter[state] += &column.dot(&column.t());
        }

        for (state, (g, mut covariance)) in self.components.iter_mut().zip(scatter).enumerate() {
            if counts[state] > 0 {
                covariance /= counts[state] as f64;
                g.set_mean(means.row(state));
            } else {
                debug!(state, "empty cluster, resetting covariance to identity");
                covariance = Array2::eye(D);
            }
            g.set_covariance(covariance.view());
        }
    }

    /// Alternate assignment and update for at most `max_iter` rounds.
    ///
    /// Stops as soon as an assignment round changes no label. Returns the
    /// number of rounds run.
    pub(crate) fn refine_kmeans(&mut self, data: &[[f64; D]], max_iter: usize) -> usize {
        let mut labels = vec![None; data.len()];
        let mut previous = vec![None; data.len()];

        let first = self.assign(data, &mut labels, &previous);
        debug!(inertia = first.inertia, "initial k-means assignment");

        let mut rounds = 1;
        for iter in 1..max_iter {
            self.update_clusters(data, &labels);
            std::mem::swap(&mut labels, &mut previous);
            let round = self.assign(data, &mut labels, &previous);
            rounds = iter + 1;
            if !round.changed {
                debug!(iterations = iter, inertia = round.inertia, "no assignment changed, k-means finished");
                break;
            }
        }
        rounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<[f64; 2]> {
        vec![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [10.0, 10.0], [10.0, 11.0], [11.0, 10.0]]
    }

    fn seeded_model(means: &[[f64; 2]]) -> GaussianMixture<2> {
        let mut gmm = GaussianMixture::<2>::new();
        gmm.set_num_states(means.len());
        for (s, m) in means.iter().enumerate() {
            gmm.set_mean(s, m);
        }
        gmm
    }

    #[test]
    fn test_first_assignment_always_changed() {
        let data = two_blobs();
        let gmm = seeded_model(&[[0.0, 0.0], [10.0, 10.0]]);
        let mut labels = vec![None; data.len()];
        let previous = vec![None; data.len()];
        let a = gmm.assign(&data, &mut labels, &previous);
        assert!(a.changed);
        assert_eq!(
            labels,
            vec![Some(0), Some(0), Some(0), Some(1), Some(1), Some(1)]
        );
        // 0 + 1 + 1 + 0 + 1 + 1
        assert!((a.inertia - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_assignment_ties_go_to_first_state() {
        let data = [[5.0, 0.0]];
        let gmm = seeded_model(&[[0.0, 0.0], [10.0, 0.0]]);
        let mut labels = vec![None];
        gmm.assign(&data, &mut labels, &[None]);
        assert_eq!(labels[0], Some(0));
    }

    #[test]
    fn test_fixed_point_idempotence() {
        let data = two_blobs();
        let mut gmm = seeded_model(&[[3.0, 3.0], [7.0, 7.0]]);
        let mut labels = vec![None; data.len()];
        let mut previous = vec![None; data.len()];

        // Run to a fixed point.
        let mut changed = gmm.assign(&data, &mut labels, &previous).changed;
        while changed {
            gmm.update_clusters(&data, &labels);
            std::mem::swap(&mut labels, &mut previous);
            changed = gmm.assign(&data, &mut labels, &previous).changed;
        }

        // Another round against unchanged means changes nothing.
        std::mem::swap(&mut labels, &mut previous);
        let again = gmm.assign(&data, &mut labels, &previous);
        assert!(!again.changed);
        assert_eq!(labels, previous);
    }

    #[test]
    fn test_update_means_and_covariances() {
        let data = two_blobs();
        let mut gmm = seeded_model(&[[0.0, 0.0], [10.0, 10.0]]);
        let labels = vec![Some(0), Some(0), Some(0), Some(1), Some(1), Some(1)];
        gmm.update_clusters(&data, &labels);

        let m0 = gmm.mean(0);
        assert!((m0[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((m0[1] - 1.0 / 3.0).abs() < 1e-12);

        // Population covariance of {(0,0), (0,1), (1,0)}.
        let c0 = gmm.covariance(0);
        assert!((c0[[0, 0]] - 2.0 / 9.0).abs() < 1e-12);
        assert!((c0[[1, 1]] - 2.0 / 9.0).abs() < 1e-12);
        assert!((c0[[0, 1]] + 1.0 / 9.0).abs() < 1e-12);
        assert!((c0[[1, 0]] - c0[[0, 1]]).abs() < 1e-15);
    }

    #[test]
    fn test_empty_cluster_gets_identity_covariance() {
        let data = two_blobs();
        let mut gmm = seeded_model(&[[0.0, 0.0], [10.0, 10.0], [50.0, 50.0]]);
        gmm.set_covariance(2, &[[9.0, 1.0], [1.0, 9.0]]);
        let labels = vec![Some(0), Some(0), Some(0), Some(1), Some(1), Some(1)];
        gmm.update_clusters(&data, &labels);

        assert_eq!(gmm.covariance(2), Array2::<f64>::eye(2).view());
        assert_eq!(gmm.mean(2).to_vec(), vec![50.0, 50.0]);
    }

    #[test]
    fn test_refine_stops_early() {
        let data = two_blobs();
        let mut gmm = seeded_model(&[[0.0, 0.0], [10.0, 10.0]]);
        let rounds = gmm.refine_kmeans(&data, 100);
        // assign, update + assign (unchanged)
        assert_eq!(rounds, 2);
    }

    #[test]
    fn test_refine_respects_round_budget() {
        let data = two_blobs();
        let mut gmm = seeded_model(&[[3.0, 3.0], [4.0, 4.0]]);
        assert_eq!(gmm.refine_kmeans(&data, 1), 1);
        // Only the assignment ran: means unchanged.
        assert_eq!(gmm.mean(0).to_vec(), vec![3.0, 3.0]);
    }
}
