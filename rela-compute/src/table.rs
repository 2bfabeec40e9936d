use crate::error::{Error, Result};
use rela_datatype::Atom;
use rela_plan::col::ColName;
use std::fmt;

/// Table is a bag of rows with named columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub cols: Vec<ColName>,
    pub rows: Vec<Vec<Atom>>,
}

impl Table {
    #[inline]
    pub fn new(cols: Vec<ColName>, rows: Vec<Vec<Atom>>) -> Self {
        Table { cols, rows }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn col_idx(&self, col: &str) -> Result<usize> {
        self.cols
            .iter()
            .position(|c| c == col)
            .ok_or_else(|| Error::ColumnNotFound(ColName::new(col)))
    }

    /// Returns rows with columns arranged in given order.
    pub fn reorder(&self, cols: &[ColName]) -> Result<Vec<Vec<Atom>>> {
        let idxs = cols
            .iter()
            .map(|c| self.col_idx(c))
            .collect::<Result<Vec<_>>>()?;
        Ok(self
            .rows
            .iter()
            .map(|r| idxs.iter().map(|i| r[*i].clone()).collect())
            .collect())
    }

    /// Compare two tables as bags of rows, ignoring column order.
    pub fn bag_eq(&self, other: &Table) -> Result<bool> {
        if self.cols.len() != other.cols.len() || self.len() != other.len() {
            return Ok(false);
        }
        if self.cols.iter().any(|c| !other.cols.contains(c)) {
            return Ok(false);
        }
        let mut lhs = self.rows.clone();
        let mut rhs = other.reorder(&self.cols)?;
        lhs.sort();
        rhs.sort();
        Ok(lhs == rhs)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.cols.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        writeln!(f, ")")?;
        for row in &self.rows {
            write!(f, "[")?;
            for (i, v) in row.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", v)?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}
