use crate::col::ColName;
use crate::id::NodeID;
use crate::prop::{DomID, DomStore, PropOracle, UnqName};
use fnv::{FnvHashMap, FnvHashSet};
use rela_datatype::Atom;

/// Properties of a single node.
#[derive(Debug, Clone, Default)]
pub struct NodeProps {
    pub card: Option<u64>,
    /// Single-column keys.
    pub keys: FnvHashSet<ColName>,
    pub doms: FnvHashMap<ColName, DomID>,
    pub set: bool,
    pub icols: FnvHashSet<ColName>,
    pub req_vals: FnvHashMap<ColName, bool>,
    pub consts: FnvHashMap<ColName, Atom>,
    pub unq: FnvHashMap<ColName, UnqName>,
    pub levels: FnvHashMap<ColName, i32>,
    pub ref_count: u32,
}

/// PropSnapshot stores properties of all nodes of one DAG.
///
/// It is usually built by property inference, but can also be
/// annotated manually.
#[derive(Debug, Clone, Default)]
pub struct PropSnapshot {
    nodes: FnvHashMap<NodeID, NodeProps>,
    doms: DomStore,
}

impl PropSnapshot {
    #[inline]
    pub fn new() -> Self {
        PropSnapshot::default()
    }

    #[inline]
    pub(crate) fn from_parts(nodes: FnvHashMap<NodeID, NodeProps>, doms: DomStore) -> Self {
        PropSnapshot { nodes, doms }
    }

    #[inline]
    pub fn get(&self, id: NodeID) -> Option<&NodeProps> {
        self.nodes.get(&id)
    }

    /// Returns mutable properties of the node, creating empty
    /// annotation if not exists.
    #[inline]
    pub fn node_mut(&mut self, id: NodeID) -> &mut NodeProps {
        self.nodes.entry(id).or_default()
    }

    #[inline]
    pub fn doms(&self) -> &DomStore {
        &self.doms
    }

    #[inline]
    pub fn doms_mut(&mut self) -> &mut DomStore {
        &mut self.doms
    }

    /// Number of annotated nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl PropOracle for PropSnapshot {
    #[inline]
    fn card(&self, id: NodeID) -> Option<u64> {
        self.get(id).and_then(|p| p.card)
    }

    #[inline]
    fn is_key(&self, id: NodeID, cols: &[&str]) -> bool {
        match self.get(id) {
            // any superset of a key is also a key
            Some(p) => cols.iter().any(|c| p.keys.contains(*c)),
            None => false,
        }
    }

    #[inline]
    fn dom(&self, id: NodeID, col: &str) -> Option<DomID> {
        self.get(id).and_then(|p| p.doms.get(col).copied())
    }

    #[inline]
    fn is_subdom(&self, sub: DomID, sup: DomID) -> bool {
        self.doms.is_subdom(sub, sup)
    }

    #[inline]
    fn is_set(&self, id: NodeID) -> bool {
        self.get(id).map(|p| p.set).unwrap_or_default()
    }

    #[inline]
    fn is_icol(&self, id: NodeID, col: &str) -> bool {
        self.get(id)
            .map(|p| p.icols.contains(col))
            .unwrap_or_default()
    }

    #[inline]
    fn icols_count(&self, id: NodeID) -> usize {
        self.get(id).map(|p| p.icols.len()).unwrap_or_default()
    }

    #[inline]
    fn req_val(&self, id: NodeID, col: &str) -> Option<bool> {
        self.get(id).and_then(|p| p.req_vals.get(col).copied())
    }

    #[inline]
    fn const_val(&self, id: NodeID, col: &str) -> Option<&Atom> {
        self.get(id).and_then(|p| p.consts.get(col))
    }

    #[inline]
    fn unq_name(&self, id: NodeID, col: &str) -> Option<UnqName> {
        self.get(id).and_then(|p| p.unq.get(col).copied())
    }

    #[inline]
    fn level(&self, id: NodeID, col: &str) -> Option<i32> {
        self.get(id).and_then(|p| p.levels.get(col).copied())
    }

    #[inline]
    fn ref_count(&self, id: NodeID) -> u32 {
        self.get(id).map(|p| p.ref_count).unwrap_or_default()
    }
}
