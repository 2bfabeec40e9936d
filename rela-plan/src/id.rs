use std::fmt;
use std::ops::Deref;

/// NodeID wraps u32 to be the identifier of operator nodes in single DAG.
/// It is an index into the arena, so it stays valid when the node content
/// is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeID(u32);

impl From<u32> for NodeID {
    fn from(src: u32) -> Self {
        debug_assert!(src != !0, "Constructing NodeID from !0 is not allowed");
        NodeID(src)
    }
}

impl Deref for NodeID {
    type Target = u32;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl NodeID {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
