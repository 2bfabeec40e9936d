//! Properties of the algebra DAG.
//!
//! Properties are inferred once for the whole DAG before rewriting
//! starts, and read by the rules via the `PropOracle` trait.
//! Nodes created during rewriting are not annotated, so every query
//! on them returns the unknown default.
use crate::id::NodeID;
use rela_datatype::Atom;
use std::fmt;

pub mod dom;
pub mod infer;
pub mod snapshot;

pub use dom::{DomID, DomStore};
pub use infer::{infer_props, infer_props_with};
pub use snapshot::{NodeProps, PropSnapshot};

/// Plan-wide unique name of a column.
/// Two columns share the unique name if one is a copy of the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnqName(u32);

impl From<u32> for UnqName {
    #[inline]
    fn from(src: u32) -> Self {
        UnqName(src)
    }
}

impl fmt::Display for UnqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

/// PropOracle provides read-only access to node properties.
pub trait PropOracle {
    /// Exact number of rows, if known.
    fn card(&self, id: NodeID) -> Option<u64>;

    /// Returns true if given columns together form a key of the node.
    fn is_key(&self, id: NodeID, cols: &[&str]) -> bool;

    fn dom(&self, id: NodeID, col: &str) -> Option<DomID>;

    /// Returns true if every value of domain `sub` is contained in `sup`.
    fn is_subdom(&self, sub: DomID, sup: DomID) -> bool;

    /// Returns true if all consumers of the node ignore duplicate rows.
    fn is_set(&self, id: NodeID) -> bool;

    /// Returns true if the column is required by some ancestor.
    fn is_icol(&self, id: NodeID, col: &str) -> bool;

    fn icols_count(&self, id: NodeID) -> usize;

    /// Boolean value the column is required to have by all consumers.
    fn req_val(&self, id: NodeID, col: &str) -> Option<bool>;

    fn const_val(&self, id: NodeID, col: &str) -> Option<&Atom>;

    fn unq_name(&self, id: NodeID, col: &str) -> Option<UnqName>;

    /// Document level of the nodes in given column.
    fn level(&self, id: NodeID, col: &str) -> Option<i32>;

    /// Number of distinct parents.
    fn ref_count(&self, id: NodeID) -> u32;

    /// Returns true if column `sub` of one node is a subdomain of
    /// column `sup` of another node. Unknown domains never match.
    #[inline]
    fn col_subdom(&self, sub: (NodeID, &str), sup: (NodeID, &str)) -> bool {
        match (self.dom(sub.0, sub.1), self.dom(sup.0, sup.1)) {
            (Some(a), Some(b)) => self.is_subdom(a, b),
            _ => false,
        }
    }
}
