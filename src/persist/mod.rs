//! Model persistence.
//!
//! Three forms, all reproducing the full model state (dimension, state
//! count, initialization flag, priors, every component):
//!
//! - **Binary stream** ([`GaussianMixture::write_binary`] /
//!   [`GaussianMixture::read_binary`], plus file wrappers). Little-endian:
//!
//! ```text
//! i32  dimension
//! i32  num_states
//! u8   initialized
//! f64  priors[num_states]
//! per component: f64 mean[D], f64 covariance[D*D] (row-major)
//! ```
//!
//! - **Messages** ([`MixtureMessage`]): a structured mirror of the binary
//!   layout for exchange with other processes.
//! - **Containers** ([`ModelBag`]): a file of topic-tagged messages holding
//!   exactly one model.
//!
//! Failures are logged with `tracing` at the boundary and returned as
//! [`Error`](crate::Error); nothing here panics on bad input.
//!
//! [`GaussianMixture::write_binary`]: crate::GaussianMixture::write_binary
//! [`GaussianMixture::read_binary`]: crate::GaussianMixture::read_binary

mod binary;
mod container;
mod message;

pub use container::{BagRecord, ModelBag, MODEL_TOPIC};
pub use message::{GaussianMessage, MixtureMessage};
