use core::fmt;
use std::io;

/// Result alias for `gaussmix`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by mixture fitting, inference and persistence.
///
/// Contract violations (a state index out of range, a prior vector of the
/// wrong length) are not represented here: they panic.
#[derive(Debug)]
pub enum Error {
    /// Training data was empty.
    EmptyInput,

    /// Vector or model dimension mismatch.
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Invalid number of mixture states for the requested operation.
    InvalidClusterCount {
        /// Requested count.
        requested: usize,
        /// Number of training patterns.
        n_items: usize,
    },

    /// Invalid parameter value.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// The model has not been initialized.
    NotInitialized,

    /// A covariance block was not positive definite.
    SingularMatrix,

    /// Every component assigned zero likelihood to the query.
    ZeroLikelihood,

    /// A stored model or message is malformed.
    Corrupt(String),

    /// A model container holds no usable entry, or too many.
    Container(String),

    /// Underlying stream or file failure.
    Io(io::Error),

    /// Message (de)serialization failure.
    Serialization(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty input provided"),
            Error::DimensionMismatch { expected, found } => {
                write!(f, "dimension mismatch: expected {expected}, found {found}")
            }
            Error::InvalidClusterCount { requested, n_items } => {
                write!(f, "cannot fit {requested} states to {n_items} patterns")
            }
            Error::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
            Error::NotInitialized => write!(f, "gaussian mixture model is not initialized"),
            Error::SingularMatrix => write!(f, "covariance matrix is not positive definite"),
            Error::ZeroLikelihood => write!(f, "all components have zero likelihood"),
            Error::Corrupt(msg) => write!(f, "corrupt model data: {msg}"),
            Error::Container(msg) => write!(f, "model container: {msg}"),
            Error::Io(e) => write!(f, "i/o error: {e}"),
            Error::Serialization(e) => write!(f, "serialization error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e)
    }
}
