//! Reference evaluation of relational algebra plans on literal tables.
//!
//! Evaluation is row based and keeps every intermediate result, so it
//! is only meant to check plans before and after rewriting.
pub mod error;
pub mod eval;
pub mod table;

pub use crate::eval::{eval, Evaluator};
pub use crate::table::Table;
