//! This crate defines the operator DAG of relational algebra plans,
//! the properties inferred over it, and the property-driven peephole
//! optimizer with its post-pass.
pub mod col;
pub mod dag;
pub mod error;
pub mod explain;
pub mod icol;
pub mod id;
pub mod op;
pub mod optimize;
pub mod prop;
pub mod rule;

pub use crate::dag::Dag;
pub use crate::id::NodeID;
pub use crate::optimize::{optimize_algebra_plan, OptimizeOptions, Optimizer, RewriteStats};
pub use crate::rule::RuleSet;

#[cfg(test)]
pub(crate) mod tests;
