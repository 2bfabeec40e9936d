use rela_plan::col::ColName;
use rela_plan::op::OpTy;
use rela_plan::NodeID;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Operator {0:?} not supported by evaluation")]
    Unsupported(OpTy),
    #[error("Column '{0}' not found")]
    ColumnNotFound(ColName),
    #[error("Node {0} not found")]
    NodeNotFound(NodeID),
    #[error(transparent)]
    DataType(#[from] rela_datatype::Error),
    #[error(transparent)]
    Plan(#[from] rela_plan::error::Error),
}
