//! Helpers to match small structures around a node.
use crate::col::{ColName, ProjItem, Schema};
use crate::dag::Dag;
use crate::id::NodeID;
use crate::op::Op;

/// Node reached by looking through at most one projection.
#[derive(Debug, Clone)]
pub struct Through {
    pub node: NodeID,
    /// Items of the skipped projection, None if nothing skipped.
    pub items: Option<Vec<ProjItem>>,
}

impl Through {
    /// Map a column name above the projection to the name below it.
    #[inline]
    pub fn map(&self, col: &str) -> Option<ColName> {
        match &self.items {
            None => Some(ColName::new(col)),
            Some(items) => items.iter().find(|i| i.new == col).map(|i| i.old.clone()),
        }
    }
}

/// Skip zero or one projection at given node.
/// If `rename` is false, a renaming projection is not skipped.
pub fn skip_proj(dag: &Dag, id: NodeID, rename: bool) -> Option<Through> {
    match dag.op(id)? {
        Op::Proj { input, cols } if rename || cols.iter().all(|c| !c.is_rename()) => {
            Some(Through {
                node: *input,
                items: Some(cols.clone()),
            })
        }
        _ => Some(Through {
            node: id,
            items: None,
        }),
    }
}

/// Follow the chain of projections below given node and column,
/// returns the first non-projection node and the column name there.
pub fn chase_proj(dag: &Dag, mut id: NodeID, col: &ColName) -> (NodeID, ColName) {
    let mut col = col.clone();
    while let Some((input, cols)) = dag.op(id).and_then(Op::as_proj) {
        match cols.iter().find(|i| i.new == col) {
            Some(item) => {
                col = item.old.clone();
                id = input;
            }
            None => break,
        }
    }
    (id, col)
}

/// Projection items keeping all columns of the schema.
#[inline]
pub fn keep_all(schema: &Schema) -> impl Iterator<Item = ProjItem> + '_ {
    schema.iter().map(|c| ProjItem {
        new: c.clone(),
        old: c.clone(),
    })
}

/// Projection items renaming given column to all columns of the schema.
#[inline]
pub fn alias_all<'a>(schema: &'a Schema, old: &'a ColName) -> impl Iterator<Item = ProjItem> + 'a {
    schema.iter().map(move |c| ProjItem {
        new: c.clone(),
        old: old.clone(),
    })
}
