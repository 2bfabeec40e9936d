use crate::id::NodeID;
use crate::op::OpTy;
use smol_str::SmolStr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub trait ToResult {
    type Output;

    fn must_ok(self) -> Result<Self::Output>;
}

impl<T> ToResult for Option<T> {
    type Output = T;

    fn must_ok(self) -> Result<Self::Output> {
        self.ok_or(Error::MustOK)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Node {0} not found")]
    NodeNotFound(NodeID),
    #[error("Column '{0}' not exists in input of {1:?}")]
    ColumnNotExists(SmolStr, OpTy),
    #[error("Duplicated column '{0}' in output of {1:?}")]
    DuplicatedColumn(SmolStr, OpTy),
    #[error("Schema mismatch between inputs of {0:?}")]
    SchemaMismatch(OpTy),
    #[error("Row width mismatch in literal table, expected {expected}, found {found}")]
    RowWidthMismatch { expected: usize, found: usize },
    #[error("Empty projection list")]
    EmptyProjection,
    #[error("Resource exhausted while allocating plan node")]
    ResourceExhausted,
    #[error("Internal error MustOK")]
    MustOK,
    #[error("Internal error: {0}")]
    InternalError(String),
    #[error(transparent)]
    DataType(#[from] rela_datatype::Error),
}

impl Error {
    /// Resource errors are the only errors escaping from the optimizer.
    #[inline]
    pub fn is_resource(&self) -> bool {
        matches!(self, Error::ResourceExhausted)
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::ResourceExhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_plan_error_size() {
        assert!(std::mem::size_of::<Error>() <= 64);
    }

    #[test]
    fn test_must_ok() {
        assert!(matches!(None::<u32>.must_ok(), Err(Error::MustOK)));
        assert_eq!(1, Some(1).must_ok().unwrap());
        assert!(Error::ResourceExhausted.is_resource());
        assert!(!Error::MustOK.is_resource());
    }
}
