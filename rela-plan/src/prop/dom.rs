use fnv::FnvHashSet;
use rela_datatype::Atom;
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a value domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomID(u32);

impl DomID {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DomID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
struct DomInfo {
    // domains containing this one
    sups: SmallVec<[DomID; 2]>,
    // domains contained in this one
    subs: SmallVec<[DomID; 2]>,
    // exact value set, only known for literal values
    values: Option<BTreeSet<Atom>>,
}

/// DomStore keeps all value domains of one plan and the
/// inclusion relationship between them.
///
/// The relationship forms a DAG: every domain created by a filtering
/// operator is a subdomain of its source, every domain created by
/// a union is a superdomain of both sources. Domains with known
/// exact value sets are additionally compared by their values.
#[derive(Debug, Clone)]
pub struct DomStore {
    doms: Vec<DomInfo>,
}

impl Default for DomStore {
    #[inline]
    fn default() -> Self {
        DomStore::new()
    }
}

impl DomStore {
    /// The domain without any value.
    pub const EMPTY: DomID = DomID(0);

    #[inline]
    pub fn new() -> Self {
        DomStore {
            doms: vec![DomInfo {
                values: Some(BTreeSet::new()),
                ..Default::default()
            }],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.doms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.doms.is_empty()
    }

    /// Create a domain unrelated to all others.
    #[inline]
    pub fn fresh(&mut self) -> DomID {
        let id = DomID(self.doms.len() as u32);
        self.doms.push(DomInfo::default());
        id
    }

    /// Create a domain with exact value set.
    #[inline]
    pub fn fresh_exact(&mut self, values: BTreeSet<Atom>) -> DomID {
        if values.is_empty() {
            return DomStore::EMPTY;
        }
        let id = self.fresh();
        self.doms[id.index()].values = Some(values);
        id
    }

    /// Create a domain contained in all given domains.
    #[inline]
    pub fn fresh_sub(&mut self, sups: &[DomID]) -> DomID {
        let id = self.fresh();
        for &sup in sups {
            self.add_subdom(id, sup);
        }
        id
    }

    /// Create a domain containing all given domains.
    /// If all of them have exact values, the new domain has
    /// the union of them as exact values.
    pub fn fresh_sup(&mut self, subs: &[DomID]) -> DomID {
        let mut values = Some(BTreeSet::new());
        for sub in subs {
            values = match (values, self.values(*sub)) {
                (Some(mut vs), Some(sub_vs)) => {
                    vs.extend(sub_vs.iter().cloned());
                    Some(vs)
                }
                _ => None,
            };
        }
        let id = self.fresh();
        self.doms[id.index()].values = values;
        for &sub in subs {
            self.add_subdom(sub, id);
        }
        id
    }

    /// Record that `sub` is contained in `sup`.
    #[inline]
    pub fn add_subdom(&mut self, sub: DomID, sup: DomID) {
        if sub == sup || sub.index() >= self.doms.len() || sup.index() >= self.doms.len() {
            return;
        }
        self.doms[sub.index()].sups.push(sup);
        self.doms[sup.index()].subs.push(sub);
    }

    #[inline]
    pub fn values(&self, id: DomID) -> Option<&BTreeSet<Atom>> {
        self.doms.get(id.index()).and_then(|d| d.values.as_ref())
    }

    /// Returns true if every value of `sub` is also a value of `sup`.
    pub fn is_subdom(&self, sub: DomID, sup: DomID) -> bool {
        if sub == sup {
            return true;
        }
        let ups = self.closure(sub, |d| &d.sups);
        if ups.contains(&sup) {
            return true;
        }
        // an empty domain is contained in every domain
        if ups
            .iter()
            .any(|d| self.values(*d).map(BTreeSet::is_empty).unwrap_or_default())
        {
            return true;
        }
        let downs = self.closure(sup, |d| &d.subs);
        for up in &ups {
            if let Some(up_vs) = self.values(*up) {
                for down in &downs {
                    if let Some(down_vs) = self.values(*down) {
                        if up_vs.is_subset(down_vs) {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }

    // reflexive and transitive closure along given edges
    fn closure<F>(&self, start: DomID, edges: F) -> FnvHashSet<DomID>
    where
        F: Fn(&DomInfo) -> &SmallVec<[DomID; 2]>,
    {
        let mut res = FnvHashSet::default();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !res.insert(id) {
                continue;
            }
            if let Some(info) = self.doms.get(id.index()) {
                stack.extend(edges(info).iter().copied());
            }
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nats(vs: &[u64]) -> BTreeSet<Atom> {
        vs.iter().map(|v| Atom::nat(*v)).collect()
    }

    #[test]
    fn test_subdom_edges() {
        let mut ds = DomStore::new();
        let a = ds.fresh();
        let b = ds.fresh_sub(&[a]);
        let c = ds.fresh_sub(&[b]);
        assert!(ds.is_subdom(c, a));
        assert!(ds.is_subdom(b, a));
        assert!(!ds.is_subdom(a, c));
        let d = ds.fresh();
        let u = ds.fresh_sup(&[a, d]);
        assert!(ds.is_subdom(c, u));
        assert!(ds.is_subdom(d, u));
        assert!(!ds.is_subdom(u, a));
        assert!(ds.values(u).is_none());
    }

    #[test]
    fn test_subdom_values() {
        let mut ds = DomStore::new();
        let small = ds.fresh_exact(nats(&[1, 2, 3]));
        let large = ds.fresh_exact(nats(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10]));
        assert!(ds.is_subdom(small, large));
        assert!(!ds.is_subdom(large, small));
        // filtered domain of small is still contained in large
        let filtered = ds.fresh_sub(&[small]);
        assert!(ds.is_subdom(filtered, large));
        // but a filtered large domain is unknown
        let filtered_large = ds.fresh_sub(&[large]);
        assert!(!ds.is_subdom(small, filtered_large));
        let u = ds.fresh_sup(&[small, large]);
        assert_eq!(11, ds.values(u).unwrap().len());
        assert!(ds.is_subdom(u, large));
    }

    #[test]
    fn test_subdom_empty() {
        let mut ds = DomStore::new();
        let a = ds.fresh();
        assert!(ds.is_subdom(DomStore::EMPTY, a));
        assert!(!ds.is_subdom(a, DomStore::EMPTY));
        let e = ds.fresh_exact(BTreeSet::new());
        assert_eq!(DomStore::EMPTY, e);
        let sub = ds.fresh_sub(&[e]);
        assert!(ds.is_subdom(sub, a));
    }
}
