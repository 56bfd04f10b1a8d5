//! Message conversion.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{Error, Result};
use crate::gaussian::Component;
use crate::mixture::GaussianMixture;

/// Serialized form of a single Gaussian component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianMessage {
    /// Dimension of the component.
    pub dim: i32,
    /// Mean vector.
    pub mean: Vec<f64>,
    /// Covariance matrix, row-major.
    pub covariance: Vec<f64>,
}

/// Serialized form of a whole mixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureMessage {
    /// Dimension of the modeled space.
    pub dim: i32,
    /// Number of mixture states.
    pub num_states: i32,
    /// Whether the model was initialized.
    pub initialized: bool,
    /// Prior weight per state.
    pub priors: Vec<f64>,
    /// Component per state.
    pub gaussians: Vec<GaussianMessage>,
}

impl<const D: usize, G: Component<D>> GaussianMixture<D, G> {
    /// Convert the model to a message. Fails for a model without states.
    pub fn to_message(&self) -> Result<MixtureMessage> {
        if self.num_states() < 1 {
            error!("cannot write model with 0 states to message");
            return Err(Error::InvalidParameter {
                name: "num_states",
                message: "must be > 0",
            });
        }

        let gaussians = self
            .components
            .iter()
            .map(|g| g.to_message())
            .collect::<Result<Vec<_>>>()?;

        Ok(MixtureMessage {
            dim: D as i32,
            num_states: self.num_states() as i32,
            initialized: self.initialized,
            priors: self.priors.to_vec(),
            gaussians,
        })
    }

    /// Overwrite the model from a message.
    ///
    /// Rejects messages of another dimension, with fewer than one state, or
    /// whose prior and component arrays disagree with the state count.
    pub fn from_message(&mut self, msg: &MixtureMessage) -> Result<()> {
        if msg.dim != D as i32 {
            error!(stored = msg.dim, expected = D, "cannot initialize gaussian mixture from message of another dimension");
            return Err(Error::DimensionMismatch {
                expected: D,
                found: usize::try_from(msg.dim).unwrap_or(0),
            });
        }
        if msg.num_states < 1 {
            error!(num_states = msg.num_states, "cannot read model with 0 states from message");
            return Err(Error::InvalidParameter {
                name: "num_states",
                message: "must be > 0",
            });
        }
        let num_states = msg.num_states as usize;
        if msg.priors.len() != num_states || msg.gaussians.len() != num_states {
            error!(
                num_states,
                priors = msg.priors.len(),
                gaussians = msg.gaussians.len(),
                "message arrays disagree with state count"
            );
            return Err(Error::Corrupt(format!(
                "{num_states} states but {} priors and {} gaussians",
                msg.priors.len(),
                msg.gaussians.len()
            )));
        }

        self.set_num_states(num_states);
        self.initialized = msg.initialized;
        self.priors
            .iter_mut()
            .zip(&msg.priors)
            .for_each(|(p, &m)| *p = m);

        for (g, m) in self.components.iter_mut().zip(&msg.gaussians) {
            g.from_message(m)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> GaussianMixture<2> {
        let mut gmm = GaussianMixture::<2>::new();
        gmm.set_num_states(2)
            .set_priors(&[0.4, 0.6])
            .set_mean(1, &[3.0, 4.0])
            .set_covariance(0, &[[1.5, 0.0], [0.0, 0.5]]);
        gmm.force_initialize();
        gmm
    }

    #[test]
    fn test_message_roundtrip() {
        let gmm = sample_model();
        let msg = gmm.to_message().unwrap();
        assert_eq!(msg.dim, 2);
        assert_eq!(msg.num_states, 2);
        assert_eq!(msg.gaussians[1].mean, vec![3.0, 4.0]);

        let mut back = GaussianMixture::<2>::new();
        back.from_message(&msg).unwrap();
        assert_eq!(back.priors(), gmm.priors());
        assert_eq!(back.component(0), gmm.component(0));
        assert_eq!(back.component(1), gmm.component(1));
        assert!(back.is_initialized());
    }

    #[test]
    fn test_message_survives_json() {
        let msg = sample_model().to_message().unwrap();
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: MixtureMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_empty_model_to_message_fails() {
        let gmm = GaussianMixture::<2>::new();
        assert!(gmm.to_message().is_err());
    }

    #[test]
    fn test_from_message_rejections() {
        let good = sample_model().to_message().unwrap();
        let mut gmm = GaussianMixture::<2>::new();

        let mut wrong_dim = good.clone();
        wrong_dim.dim = 3;
        assert!(matches!(
            gmm.from_message(&wrong_dim),
            Err(Error::DimensionMismatch { .. })
        ));

        let mut no_states = good.clone();
        no_states.num_states = 0;
        assert!(gmm.from_message(&no_states).is_err());

        let mut short_priors = good.clone();
        short_priors.priors.pop();
        assert!(matches!(gmm.from_message(&short_priors), Err(Error::Corrupt(_))));

        let mut bad_component = good;
        bad_component.gaussians[1].covariance.pop();
        assert!(gmm.from_message(&bad_component).is_err());
    }
}
