//! # gaussmix
//!
//! Gaussian Mixture Models over fixed-dimension spaces: construction,
//! seeding (random, axis-uniform, k-means), density queries, sampling,
//! EM refinement, Gaussian Mixture Regression and persistence.
//!
//! ```
//! use gaussmix::GaussianMixture;
//!
//! let mut gmm = GaussianMixture::<2>::new();
//! gmm.set_num_states(2)
//!     .set_priors(&[0.4, 0.6])
//!     .set_mean(0, &[0.0, 0.0])
//!     .set_mean(1, &[10.0, 10.0])
//!     .force_initialize();
//!
//! assert!(gmm.pdf(&[0.0, 0.5]) > gmm.pdf(&[5.0, 5.0]));
//! assert_eq!(gmm.most_likely_state(&[9.0, 9.5]), 1);
//! assert!(gmm.draw().is_some());
//!
//! // Or learn the parameters from data.
//! let data = [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [10.0, 10.0], [10.0, 11.0], [11.0, 10.0]];
//! let mut learned = GaussianMixture::<2>::new().with_seed(7);
//! learned.set_num_states(2);
//! learned.init_kmeans(&data, 10).unwrap();
//! assert!(learned.is_initialized());
//! ```
//!
//! Models persist to a compact binary layout
//! ([`GaussianMixture::write_binary`]), to a serializable message
//! ([`GaussianMixture::to_message`]) or to a single-model JSON container
//! ([`GaussianMixture::to_bag`]).

pub mod em;
/// Error types used across `gaussmix`.
pub mod error;
pub mod gaussian;
pub mod gmr;
mod linalg;
pub mod mixture;
pub mod persist;

pub use em::{Em, EmReport, Refinement};
pub use error::{Error, Result};
pub use gaussian::{Component, Gaussian};
pub use gmr::{Gmr, Regression};
pub use mixture::GaussianMixture;
pub use persist::{BagRecord, GaussianMessage, MixtureMessage, ModelBag, MODEL_TOPIC};
