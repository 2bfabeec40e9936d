//! Post-pass that cuts columns and operators nobody reads.
//!
//! Rewrites may leave columns which are still computed but no longer
//! consumed, e.g. aliases of an eliminated join side. Required columns
//! are inferred again on the rewritten DAG, then every projection is
//! reduced to its required items, operators generating an unused column
//! are removed, and pass-through nodes are bypassed.
use crate::col::ProjItem;
use crate::dag::Dag;
use crate::error::Result;
use crate::id::NodeID;
use crate::op::{Binary, Op};
use crate::prop::{infer_props, PropOracle};

/// Remove unused columns below root, returns the new root.
pub fn fix_icols(dag: &mut Dag, root: NodeID) -> Result<NodeID> {
    let root = skip_dummies(dag, root);
    let props = infer_props(dag, root)?;
    for id in dag.post_order(root) {
        let mut op = dag.node(id)?.op.clone();
        if op.is_dummy() {
            continue;
        }
        let mut changed = false;
        for input in op.inputs_mut() {
            let target = skip_dummies(dag, *input);
            if target != *input {
                *input = target;
                changed = true;
            }
        }
        if let Op::Proj { input, cols } = &mut op {
            let mut kept: Vec<ProjItem> = cols
                .iter()
                .filter(|c| props.is_icol(id, &c.new))
                .cloned()
                .collect();
            if kept.is_empty() {
                // projection must output at least one column
                let src = dag.node(*input)?;
                if let Some(c) = cols.iter().find(|c| src.schema.contains(&c.old)) {
                    kept.push(c.clone());
                } else if let (Some(first), Some(old)) = (cols.first(), src.schema.get(0)) {
                    // source column was pruned, keep the output name on a surviving column
                    kept.push(ProjItem::new(&first.new, old));
                }
            }
            if kept != *cols {
                log::debug!(
                    "Prune {} columns of projection {}",
                    cols.len() - kept.len(),
                    id
                );
                *cols = kept;
                changed = true;
            }
        }
        let unused = match &op {
            Op::Attach { input, res, .. }
            | Op::Rank { input, res, .. }
            | Op::Number { input, res }
            | Op::BoolAnd(Binary { input, res, .. })
            | Op::BoolOr(Binary { input, res, .. })
                if !props.is_icol(id, res) =>
            {
                log::debug!("Remove unused column {} of node {}", res, id);
                Some(*input)
            }
            _ => None,
        };
        if let Some(input) = unused {
            op = Op::Dummy { input };
            changed = true;
        }
        if changed {
            dag.set_op(id, op)?;
        } else {
            // inputs may have lost columns
            dag.refresh_schema(id)?;
        }
    }
    Ok(root)
}

/// Follow the chain of pass-through nodes.
#[inline]
fn skip_dummies(dag: &Dag, mut id: NodeID) -> NodeID {
    // bounded by arena size to stop on cyclic chains
    for _ in 0..dag.len() {
        match dag.op(id) {
            Some(Op::Dummy { input }) => id = *input,
            _ => break,
        }
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::OpTy;
    use crate::tests::{nat_rows, print_plan};
    use rela_datatype::Atom;

    #[test]
    fn test_fix_icols_prune_proj() {
        let mut dag = Dag::new();
        let t1 = dag
            .lit_tbl(&["a", "b", "c"], nat_rows(&[&[1, 2, 3]]))
            .unwrap();
        let p1 = dag
            .project(
                t1,
                vec![ProjItem::keep("a"), ProjItem::keep("b"), ProjItem::new("x", "c")],
            )
            .unwrap();
        let p2 = dag.project(p1, vec![ProjItem::keep("a")]).unwrap();
        let root = fix_icols(&mut dag, p2).unwrap();
        print_plan(&dag, root);
        assert_eq!(p2, root);
        assert_eq!(
            Some((t1, &[ProjItem::keep("a")][..])),
            dag.op(p1).and_then(Op::as_proj)
        );
        assert_eq!(1, dag.schema(p1).unwrap().len());
    }

    #[test]
    fn test_fix_icols_remove_unused_ops() {
        let mut dag = Dag::new();
        let t1 = dag.lit_tbl(&["a"], nat_rows(&[&[1], &[2]])).unwrap();
        let at = dag.attach(t1, "c", Atom::nat(9)).unwrap();
        let n = dag.number(at, "n").unwrap();
        let p = dag.project(n, vec![ProjItem::keep("a")]).unwrap();
        fix_icols(&mut dag, p).unwrap();
        assert_eq!(vec![OpTy::Proj, OpTy::LitTbl], dag.shape(p));
    }

    #[test]
    fn test_fix_icols_dummies() {
        let mut dag = Dag::new();
        let t1 = dag.lit_tbl(&["a"], nat_rows(&[&[1]])).unwrap();
        let t2 = dag.lit_tbl(&["b"], nat_rows(&[&[2]])).unwrap();
        let d1 = dag.dummy(t1).unwrap();
        let d2 = dag.dummy(d1).unwrap();
        let c = dag.cross(d2, t2).unwrap();
        let root = dag.dummy(c).unwrap();
        let root = fix_icols(&mut dag, root).unwrap();
        assert_eq!(c, root);
        assert_eq!(vec![OpTy::Cross, OpTy::LitTbl, OpTy::LitTbl], dag.shape(c));
    }

    #[test]
    fn test_fix_icols_keep_column_of_removed_op() {
        let mut dag = Dag::new();
        let t1 = dag.lit_tbl(&["a"], nat_rows(&[&[1], &[2]])).unwrap();
        let t2 = dag.lit_tbl(&["b"], nat_rows(&[&[3], &[4]])).unwrap();
        let at = dag.attach(t2, "x", Atom::nat(1)).unwrap();
        let pr = dag.project(at, vec![ProjItem::keep("x")]).unwrap();
        let c = dag.cross(t1, pr).unwrap();
        let p = dag.project(c, vec![ProjItem::keep("a")]).unwrap();
        let root = fix_icols(&mut dag, p).unwrap();
        assert_eq!(p, root);
        // attach is removed, its output name now reads the table column
        assert_eq!(
            Some((t2, &[ProjItem::new("x", "b")][..])),
            dag.op(pr).and_then(Op::as_proj)
        );
        assert!(dag
            .schema(c)
            .unwrap()
            .same_names(&["a", "x"].into_iter().collect()));
    }

    #[test]
    fn test_fix_icols_keep_one_column() {
        let mut dag = Dag::new();
        let t1 = dag.lit_tbl(&["a"], nat_rows(&[&[1]])).unwrap();
        let t2 = dag.lit_tbl(&["b"], nat_rows(&[&[2]])).unwrap();
        let at = dag.attach(t2, "x", Atom::nat(1)).unwrap();
        let pr = dag
            .project(at, vec![ProjItem::keep("x"), ProjItem::keep("b")])
            .unwrap();
        let c = dag.cross(t1, pr).unwrap();
        let p = dag.project(c, vec![ProjItem::keep("a")]).unwrap();
        fix_icols(&mut dag, p).unwrap();
        // attach is removed, so the projection keeps the table column
        assert_eq!(
            Some((t2, &[ProjItem::keep("b")][..])),
            dag.op(pr).and_then(Op::as_proj)
        );
        assert!(dag
            .schema(c)
            .unwrap()
            .same_names(&["a", "b"].into_iter().collect()));
    }
}
