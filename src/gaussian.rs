//! Multivariate Gaussian components.
//!
//! A mixture is a weighted sum of these:
//!
//! ```text
//! N(x | μ, Σ) = (2π)^(-d/2) |Σ|^(-1/2) exp(-½ (x - μ)ᵀ Σ⁻¹ (x - μ))
//! ```
//!
//! The mixture only talks to its components through [`Component`], so tests
//! (or alternative parameterizations) can substitute their own type.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{Error, Result};
use crate::linalg::{self, Cholesky};
use crate::persist::GaussianMessage;

/// A single mixture component of fixed dimension `D`.
pub trait Component<const D: usize>: Clone + Default {
    /// Mean vector (length `D`).
    fn mean(&self) -> ArrayView1<'_, f64>;

    /// Covariance matrix (`D`×`D`).
    fn covariance(&self) -> ArrayView2<'_, f64>;

    /// Replace the mean. Panics if `mean.len() != D`.
    fn set_mean(&mut self, mean: ArrayView1<'_, f64>);

    /// Replace the covariance. Panics if the shape is not `D`×`D`.
    fn set_covariance(&mut self, covariance: ArrayView2<'_, f64>);

    /// Log density at `x`.
    fn log_pdf(&self, x: ArrayView1<'_, f64>) -> f64;

    /// Density at `x`.
    fn pdf(&self, x: ArrayView1<'_, f64>) -> f64 {
        self.log_pdf(x).exp()
    }

    /// Draw one sample.
    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f64>;

    /// Write the raw binary form: mean, then covariance row-major, as
    /// little-endian `f64`.
    fn write_binary<W: Write>(&self, out: &mut W) -> Result<()>;

    /// Read the form produced by [`Component::write_binary`].
    fn read_binary<R: Read>(&mut self, input: &mut R) -> Result<()>;

    /// Convert to a message.
    fn to_message(&self) -> Result<GaussianMessage>;

    /// Overwrite parameters from a message.
    fn from_message(&mut self, msg: &GaussianMessage) -> Result<()>;
}

/// Multivariate normal distribution with full covariance.
///
/// Equality compares mean and covariance; the cached factorization is
/// derived from them.
#[derive(Debug, Clone)]
pub struct Gaussian<const D: usize> {
    mean: Array1<f64>,
    covariance: Array2<f64>,
    /// Cholesky factorization of `covariance`; `None` when it is not
    /// positive definite, in which case the density is zero everywhere.
    factor: Option<Cholesky>,
}

impl<const D: usize> Gaussian<D> {
    /// Create a Gaussian from a mean and covariance.
    pub fn new(mean: &[f64; D], covariance: &[[f64; D]; D]) -> Self {
        let mut g = Self::default();
        g.set_mean(ArrayView1::from(&mean[..]));
        g.set_covariance(to_matrix(covariance).view());
        g
    }

    /// Create a Gaussian with identity covariance.
    pub fn with_identity(mean: &[f64; D]) -> Self {
        let mut g = Self::default();
        g.set_mean(ArrayView1::from(&mean[..]));
        g
    }

    /// Whether the covariance admits a density (positive definite).
    pub fn is_regular(&self) -> bool {
        self.factor.is_some()
    }

    fn refactor(&mut self) {
        self.factor = Cholesky::new(self.covariance.view());
    }
}

impl<const D: usize> PartialEq for Gaussian<D> {
    fn eq(&self, other: &Self) -> bool {
        self.mean == other.mean && self.covariance == other.covariance
    }
}

impl<const D: usize> Default for Gaussian<D> {
    fn default() -> Self {
        let covariance = Array2::eye(D);
        Self {
            mean: Array1::zeros(D),
            factor: Cholesky::new(covariance.view()),
            covariance,
        }
    }
}

impl<const D: usize> Component<D> for Gaussian<D> {
    fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean.view()
    }

    fn covariance(&self) -> ArrayView2<'_, f64> {
        self.covariance.view()
    }

    fn set_mean(&mut self, mean: ArrayView1<'_, f64>) {
        assert_eq!(mean.len(), D, "mean must have length {D}");
        self.mean.assign(&mean);
    }

    fn set_covariance(&mut self, covariance: ArrayView2<'_, f64>) {
        assert_eq!(covariance.dim(), (D, D), "covariance must be {D}x{D}");
        self.covariance.assign(&covariance);
        self.refactor();
    }

    fn log_pdf(&self, x: ArrayView1<'_, f64>) -> f64 {
        match &self.factor {
            Some(chol) => {
                let diff = &x - &self.mean;
                chol.log_density(diff.view())
            }
            None => f64::NEG_INFINITY,
        }
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f64> {
        let z: Array1<f64> = (0..D).map(|_| rng.sample::<f64, _>(StandardNormal)).collect();
        // x = μ + S z with S Sᵀ = Σ
        let root = match &self.factor {
            Some(chol) => chol.lower(),
            None => linalg::sqrt_semidefinite(self.covariance.view()),
        };
        &self.mean + &root.dot(&z)
    }

    fn write_binary<W: Write>(&self, out: &mut W) -> Result<()> {
        for &v in self.mean.iter() {
            out.write_f64::<LittleEndian>(v)?;
        }
        for &v in self.covariance.iter() {
            out.write_f64::<LittleEndian>(v)?;
        }
        Ok(())
    }

    fn read_binary<R: Read>(&mut self, input: &mut R) -> Result<()> {
        for v in self.mean.iter_mut() {
            *v = input.read_f64::<LittleEndian>()?;
        }
        for v in self.covariance.iter_mut() {
            *v = input.read_f64::<LittleEndian>()?;
        }
        self.refactor();
        Ok(())
    }

    fn to_message(&self) -> Result<GaussianMessage> {
        Ok(GaussianMessage {
            dim: D as i32,
            mean: self.mean.to_vec(),
            covariance: self.covariance.iter().copied().collect(),
        })
    }

    fn from_message(&mut self, msg: &GaussianMessage) -> Result<()> {
        if msg.dim != D as i32 {
            return Err(Error::DimensionMismatch {
                expected: D,
                found: usize::try_from(msg.dim).unwrap_or(0),
            });
        }
        if msg.mean.len() != D || msg.covariance.len() != D * D {
            return Err(Error::Corrupt(format!(
                "gaussian message carries {} mean and {} covariance entries for dimension {D}",
                msg.mean.len(),
                msg.covariance.len()
            )));
        }
        self.mean.assign(&ArrayView1::from(&msg.mean[..]));
        let covariance = ArrayView2::from_shape((D, D), &msg.covariance[..])
            .map_err(|e| Error::Corrupt(e.to_string()))?;
        self.covariance.assign(&covariance);
        self.refactor();
        Ok(())
    }
}

/// Copy a fixed-size row-major matrix into an `ndarray` matrix.
pub(crate) fn to_matrix<const D: usize>(m: &[[f64; D]; D]) -> Array2<f64> {
    Array2::from_shape_fn((D, D), |(i, j)| m[i][j])
}
