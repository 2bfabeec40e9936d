use crate::atom::AtomType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Type mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch { expected: AtomType, found: AtomType },
    #[error("Invalid value format")]
    InvalidValueFormat,
    #[error("Incomparable types {0:?} and {1:?}")]
    Incomparable(AtomType, AtomType),
}

impl From<std::num::ParseIntError> for Error {
    fn from(_: std::num::ParseIntError) -> Self {
        Error::InvalidValueFormat
    }
}

impl From<std::num::ParseFloatError> for Error {
    fn from(_: std::num::ParseFloatError) -> Self {
        Error::InvalidValueFormat
    }
}
