use crate::col::{ColName, ProjItem};
use crate::error::Result;
use crate::id::NodeID;
use crate::op::{Binary, Join, Op};
use crate::prop::PropOracle;
use crate::rule::pattern::skip_proj;
use crate::rule::RuleCtx;

/// Split a selection on disjunction of predicates from both sides of
/// an equi-join into a union of two selections.
///
/// ```text
/// select(s)                        proj(x:j, s:j)
///   |                                |
/// [proj]                           distinct
///   |                                |
/// or(s: p1, p2)          =>        union
///   |                             /     \
/// [proj]                   proj(j:l)   proj(j:r)
///   |                          |           |
/// eqjoin(l, r)             select(p1)  select(p2)
///  /     \                     |           |
/// L(p1)  R(p2)                 L           R
/// ```
///
/// Only the join column may be required above the selection, and
/// duplicates must not matter.
pub fn select_or<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<bool> {
    let dag = &*ctx.dag;
    let props = ctx.props;
    let (input, sel) = match dag.op(id) {
        Some(Op::Select { input, col }) => (*input, col.clone()),
        _ => return Ok(false),
    };
    let schema = match dag.schema(id) {
        Some(schema) if schema.len() == 2 => schema,
        _ => return Ok(false),
    };
    if props.icols_count(id) != 1 || props.is_icol(id, &sel) || !props.is_set(id) {
        return Ok(false);
    }
    let out = match schema.iter().find(|c| **c != sel) {
        Some(c) => c.clone(),
        None => return Ok(false),
    };
    // look through projection above the disjunction
    let th = match skip_proj(dag, input, true) {
        Some(th) => th,
        None => return Ok(false),
    };
    let (sel, jcol) = match (th.map(&sel), th.map(&out)) {
        (Some(s), Some(j)) => (s, j),
        _ => return Ok(false),
    };
    let or = match dag.op(th.node) {
        Some(Op::BoolOr(b)) if b.res == sel => b.clone(),
        _ => return Ok(false),
    };
    let Binary {
        input: or_input,
        lcol: p1,
        rcol: p2,
        ..
    } = or;
    // look through projection above the join
    let th = match skip_proj(dag, or_input, true) {
        Some(th) => th,
        None => return Ok(false),
    };
    let (jcol, p1, p2) = match (th.map(&jcol), th.map(&p1), th.map(&p2)) {
        (Some(j), Some(p1), Some(p2)) => (j, p1, p2),
        _ => return Ok(false),
    };
    let join = match dag.op(th.node) {
        Some(Op::Eqjoin(j)) if j.lcol == jcol || j.rcol == jcol => j.clone(),
        _ => return Ok(false),
    };
    let Join {
        left,
        right,
        lcol,
        rcol,
    } = join;
    let (ls, rs) = match (dag.schema(left), dag.schema(right)) {
        (Some(ls), Some(rs)) => (ls, rs),
        _ => return Ok(false),
    };
    // predicate of each side
    let (lp, rp) = if ls.contains(&p1) && rs.contains(&p2) {
        (p1, p2)
    } else if ls.contains(&p2) && rs.contains(&p1) {
        (p2, p1)
    } else {
        return Ok(false);
    };
    // every selected row must find its join partner
    let (l, r) = ((left, lcol.as_str()), (right, rcol.as_str()));
    if !props.col_subdom(l, r) || !props.col_subdom(r, l) {
        return Ok(false);
    }
    let top: Vec<ProjItem> = schema
        .iter()
        .map(|c| ProjItem {
            new: c.clone(),
            old: out.clone(),
        })
        .collect();
    let dag = &mut *ctx.dag;
    let lsel = dag.add(Op::Select {
        input: left,
        col: lp,
    })?;
    let lproj = dag.add(Op::Proj {
        input: lsel,
        cols: vec![item(&out, &lcol)],
    })?;
    let rsel = dag.add(Op::Select {
        input: right,
        col: rp,
    })?;
    let rproj = dag.add(Op::Proj {
        input: rsel,
        cols: vec![item(&out, &rcol)],
    })?;
    let union = dag.add(Op::Union {
        left: lproj,
        right: rproj,
    })?;
    let distinct = dag.add(Op::Distinct { input: union })?;
    dag.set_op(
        id,
        Op::Proj {
            input: distinct,
            cols: top,
        },
    )?;
    Ok(true)
}

#[inline]
fn item(new: &ColName, old: &ColName) -> ProjItem {
    ProjItem {
        new: new.clone(),
        old: old.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Dag;
    use crate::op::OpTy;
    use crate::rule::RuleSet;
    use crate::tests::run_rules;
    use rela_datatype::Atom;

    fn row(k: u64, p: bool) -> Vec<Atom> {
        vec![Atom::nat(k), Atom::bool(p)]
    }

    // select(proj(or(eqjoin(L, R))))
    fn build(dag: &mut Dag, rdom: u64) -> (NodeID, NodeID) {
        let l = dag
            .lit_tbl(&["a", "p"], vec![row(1, true), row(2, false)])
            .unwrap();
        let r = dag
            .lit_tbl(&["b", "q"], vec![row(1, false), row(rdom, true)])
            .unwrap();
        let j = dag.eqjoin(l, r, "a", "b").unwrap();
        let or = dag.bool_or(j, "s", "q", "p").unwrap();
        let pr = dag
            .project(or, vec![ProjItem::new("x", "a"), ProjItem::keep("s")])
            .unwrap();
        let sel = dag.select(pr, "s").unwrap();
        (sel, dag.project(sel, vec![ProjItem::keep("x")]).unwrap())
    }

    #[test]
    fn test_select_or() {
        let mut dag = Dag::new();
        let (sel, p) = build(&mut dag, 2);
        let root = dag.distinct(p).unwrap();
        let opt = run_rules(&mut dag, root, RuleSet::SELECT_OR);
        assert_eq!(RuleSet::SELECT_OR, opt.stats().fired_on(sel));
        assert_eq!(
            vec![
                OpTy::Proj,
                OpTy::Distinct,
                OpTy::Union,
                OpTy::Proj,
                OpTy::Select,
                OpTy::LitTbl,
                OpTy::Proj,
                OpTy::Select,
                OpTy::LitTbl
            ],
            dag.shape(sel)
        );
        let (_, cols) = dag.op(sel).and_then(Op::as_proj).unwrap();
        assert!(cols.iter().all(|c| c.old == "x"));
        assert!(dag
            .schema(sel)
            .unwrap()
            .same_names(&["x", "s"].into_iter().collect()));
    }

    #[test]
    fn test_select_or_requires_set() {
        let mut dag = Dag::new();
        let (sel, p) = build(&mut dag, 2);
        let opt = run_rules(&mut dag, p, RuleSet::SELECT_OR);
        assert!(opt.stats().fired.is_empty());
        assert_eq!(OpTy::Select, dag.op(sel).unwrap().ty());
    }

    #[test]
    fn test_select_or_requires_join_domains() {
        let mut dag = Dag::new();
        // right join column has value without partner
        let (sel, p) = build(&mut dag, 5);
        let root = dag.distinct(p).unwrap();
        let opt = run_rules(&mut dag, root, RuleSet::SELECT_OR);
        assert!(opt.stats().fired.is_empty());
        assert_eq!(OpTy::Select, dag.op(sel).unwrap().ty());
    }
}
