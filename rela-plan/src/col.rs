use indexmap::IndexSet;
use smol_str::SmolStr;
use std::fmt;

/// Column name. Names are unique within the output schema of one node.
pub type ColName = SmolStr;

/// Schema is the ordered set of output column names of a node.
/// The order is kept for display only, all operators use set semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema(IndexSet<ColName>);

impl Schema {
    #[inline]
    pub fn new() -> Self {
        Schema(IndexSet::new())
    }

    /// Insert a column, returns false if the name already exists.
    #[inline]
    pub fn insert(&mut self, col: ColName) -> bool {
        self.0.insert(col)
    }

    #[inline]
    pub fn contains(&self, col: &str) -> bool {
        self.0.contains(col)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<&ColName> {
        self.0.get_index(idx)
    }

    #[inline]
    pub fn index_of(&self, col: &str) -> Option<usize> {
        self.0.get_index_of(col)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ColName> {
        self.0.iter()
    }

    /// Returns true if both schemas contain the same names,
    /// regardless of order.
    #[inline]
    pub fn same_names(&self, other: &Schema) -> bool {
        self.len() == other.len() && self.iter().all(|c| other.contains(c))
    }
}

impl<'a> FromIterator<&'a str> for Schema {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Schema(iter.into_iter().map(SmolStr::new).collect())
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, c) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(c)?;
        }
        f.write_str(")")
    }
}

/// Single item of projection list.
/// The projection outputs column `new` with the values of input column `old`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjItem {
    pub new: ColName,
    pub old: ColName,
}

impl ProjItem {
    #[inline]
    pub fn new(new: &str, old: &str) -> Self {
        ProjItem {
            new: SmolStr::new(new),
            old: SmolStr::new(old),
        }
    }

    /// Item that keeps the input column as is.
    #[inline]
    pub fn keep(col: &str) -> Self {
        ProjItem::new(col, col)
    }

    #[inline]
    pub fn is_rename(&self) -> bool {
        self.new != self.old
    }
}

/// Single sort criterion of rank operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortItem {
    pub col: ColName,
    pub desc: bool,
}

impl SortItem {
    #[inline]
    pub fn asc(col: &str) -> Self {
        SortItem {
            col: SmolStr::new(col),
            desc: false,
        }
    }

    #[inline]
    pub fn desc(col: &str) -> Self {
        SortItem {
            col: SmolStr::new(col),
            desc: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_set_semantics() {
        let mut s: Schema = ["a", "b"].into_iter().collect();
        assert!(!s.insert(SmolStr::new("a")));
        assert!(s.insert(SmolStr::new("c")));
        assert_eq!(3, s.len());
        assert_eq!(Some(2), s.index_of("c"));
        let t: Schema = ["c", "b", "a"].into_iter().collect();
        assert!(s.same_names(&t));
        // equality ignores column order
        assert_eq!(s, t);
        assert_eq!("(a, b, c)", s.to_string());
    }
}
