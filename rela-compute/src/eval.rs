use crate::error::{Error, Result};
use crate::table::Table;
use fnv::{FnvHashMap, FnvHashSet};
use rela_datatype::Atom;
use rela_plan::col::SortItem;
use rela_plan::op::{Binary, Join, Op};
use rela_plan::{Dag, NodeID};
use smallvec::{smallvec, SmallVec};
use std::cmp::Ordering;

/// Evaluate the plan below root.
#[inline]
pub fn eval(dag: &Dag, root: NodeID) -> Result<Table> {
    Evaluator::new(dag).eval(root)
}

/// Evaluator keeps results of all evaluated nodes, so shared nodes
/// are computed only once.
pub struct Evaluator<'a> {
    dag: &'a Dag,
    cache: FnvHashMap<NodeID, Table>,
}

impl<'a> Evaluator<'a> {
    #[inline]
    pub fn new(dag: &'a Dag) -> Self {
        Evaluator {
            dag,
            cache: FnvHashMap::default(),
        }
    }

    pub fn eval(&mut self, root: NodeID) -> Result<Table> {
        let dag = self.dag;
        let mut stack: Vec<(NodeID, usize)> = vec![(root, 0)];
        while let Some(&(id, idx)) = stack.last() {
            if self.cache.contains_key(&id) {
                stack.pop();
                continue;
            }
            let op = &dag.node(id)?.op;
            match data_inputs(op).get(idx) {
                Some(&child) => {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    if !self.cache.contains_key(&child) {
                        stack.push((child, 0));
                    }
                }
                None => {
                    stack.pop();
                    let table = self.compute(op)?;
                    log::trace!("Evaluated node {} with {} rows", id, table.len());
                    self.cache.insert(id, table);
                }
            }
        }
        self.cache
            .get(&root)
            .cloned()
            .ok_or(Error::NodeNotFound(root))
    }

    #[inline]
    fn input(&self, id: NodeID) -> Result<&Table> {
        self.cache.get(&id).ok_or(Error::NodeNotFound(id))
    }

    fn compute(&self, op: &Op) -> Result<Table> {
        let res = match op {
            Op::LitTbl { cols, rows } => Table::new(cols.clone(), rows.clone()),
            Op::EmptyTbl { cols } => Table::new(cols.clone(), vec![]),
            Op::Attach { input, res, value } => {
                let t = self.input(*input)?;
                extend(t, res, t.rows.iter().map(|_| Ok(value.clone())))?
            }
            Op::Proj { input, cols } => {
                let t = self.input(*input)?;
                let old: Vec<_> = cols.iter().map(|c| c.old.clone()).collect();
                Table::new(cols.iter().map(|c| c.new.clone()).collect(), t.reorder(&old)?)
            }
            Op::Select { input, col } => {
                let t = self.input(*input)?;
                let i = t.col_idx(col)?;
                let mut rows = vec![];
                for r in &t.rows {
                    if r[i].as_bool()? {
                        rows.push(r.clone());
                    }
                }
                Table::new(t.cols.clone(), rows)
            }
            Op::Eqjoin(Join {
                left,
                right,
                lcol,
                rcol,
            }) => {
                let (l, r) = (self.input(*left)?, self.input(*right)?);
                let (li, ri) = (l.col_idx(lcol)?, r.col_idx(rcol)?);
                let mut rows = vec![];
                for lr in &l.rows {
                    for rr in r.rows.iter().filter(|rr| rr[ri] == lr[li]) {
                        rows.push(lr.iter().chain(rr.iter()).cloned().collect());
                    }
                }
                Table::new(concat_cols(l, r), rows)
            }
            Op::Semijoin(Join {
                left,
                right,
                lcol,
                rcol,
            }) => {
                let (l, r) = (self.input(*left)?, self.input(*right)?);
                let (li, ri) = (l.col_idx(lcol)?, r.col_idx(rcol)?);
                let values: FnvHashSet<&Atom> = r.rows.iter().map(|rr| &rr[ri]).collect();
                let rows = l
                    .rows
                    .iter()
                    .filter(|lr| values.contains(&lr[li]))
                    .cloned()
                    .collect();
                Table::new(l.cols.clone(), rows)
            }
            Op::Cross { left, right } => {
                let (l, r) = (self.input(*left)?, self.input(*right)?);
                let mut rows = Vec::with_capacity(l.len() * r.len());
                for lr in &l.rows {
                    for rr in &r.rows {
                        rows.push(lr.iter().chain(rr.iter()).cloned().collect());
                    }
                }
                Table::new(concat_cols(l, r), rows)
            }
            Op::Distinct { input } => {
                let t = self.input(*input)?;
                let mut seen = FnvHashSet::default();
                let rows = t
                    .rows
                    .iter()
                    .filter(|r| seen.insert(*r))
                    .cloned()
                    .collect();
                Table::new(t.cols.clone(), rows)
            }
            Op::Union { left, right } => {
                let (l, r) = (self.input(*left)?, self.input(*right)?);
                let mut rows = l.rows.clone();
                rows.extend(r.reorder(&l.cols)?);
                Table::new(l.cols.clone(), rows)
            }
            Op::Difference { left, right } => {
                let (l, r) = (self.input(*left)?, self.input(*right)?);
                let excluded: FnvHashSet<Vec<Atom>> = r.reorder(&l.cols)?.into_iter().collect();
                let rows = l
                    .rows
                    .iter()
                    .filter(|lr| !excluded.contains(*lr))
                    .cloned()
                    .collect();
                Table::new(l.cols.clone(), rows)
            }
            Op::BoolAnd(Binary {
                input,
                res,
                lcol,
                rcol,
            })
            | Op::BoolOr(Binary {
                input,
                res,
                lcol,
                rcol,
            }) => {
                let t = self.input(*input)?;
                let (li, ri) = (t.col_idx(lcol)?, t.col_idx(rcol)?);
                let is_and = matches!(op, Op::BoolAnd(_));
                extend(
                    t,
                    res,
                    t.rows.iter().map(|r| {
                        let (a, b) = (r[li].as_bool()?, r[ri].as_bool()?);
                        Ok(Atom::bool(if is_and { a && b } else { a || b }))
                    }),
                )?
            }
            Op::Rank { input, res, sortby } => {
                let t = self.input(*input)?;
                dense_rank(t, res, sortby)?
            }
            Op::Number { input, res } => {
                let t = self.input(*input)?;
                extend(
                    t,
                    res,
                    (1..=t.len() as u64).map(|n| Ok(Atom::nat(n))),
                )?
            }
            Op::Serialize {
                input, pos, item, ..
            } => {
                let t = self.input(*input)?;
                let (pi, ii) = (t.col_idx(pos)?, t.col_idx(item)?);
                let mut rows: Vec<&Vec<Atom>> = t.rows.iter().collect();
                rows.sort_by(|a, b| a[pi].cmp(&b[pi]));
                // positions are renumbered densely
                let rows = rows
                    .into_iter()
                    .enumerate()
                    .map(|(n, r)| vec![Atom::nat(n as u64 + 1), r[ii].clone()])
                    .collect();
                Table::new(vec![pos.clone(), item.clone()], rows)
            }
            Op::Dummy { input } => self.input(*input)?.clone(),
            other => return Err(Error::Unsupported(other.ty())),
        };
        Ok(res)
    }
}

/// Inputs whose rows contribute to the result. Fragments of
/// serialization are not evaluated.
#[inline]
fn data_inputs(op: &Op) -> SmallVec<[NodeID; 2]> {
    match op {
        Op::Serialize { input, .. } => smallvec![*input],
        other => other.inputs(),
    }
}

#[inline]
fn concat_cols(l: &Table, r: &Table) -> Vec<rela_plan::col::ColName> {
    l.cols.iter().chain(r.cols.iter()).cloned().collect()
}

/// Append one computed column to every row.
#[inline]
fn extend<I>(t: &Table, res: &rela_plan::col::ColName, values: I) -> Result<Table>
where
    I: Iterator<Item = Result<Atom>>,
{
    let mut cols = t.cols.clone();
    cols.push(res.clone());
    let mut rows = Vec::with_capacity(t.len());
    for (r, v) in t.rows.iter().zip(values) {
        let mut row = Vec::with_capacity(r.len() + 1);
        row.extend_from_slice(r);
        row.push(v?);
        rows.push(row);
    }
    Ok(Table::new(cols, rows))
}

/// Dense rank starting from 1, equal sort keys share the rank.
fn dense_rank(t: &Table, res: &rela_plan::col::ColName, sortby: &[SortItem]) -> Result<Table> {
    let idxs = sortby
        .iter()
        .map(|si| Ok((t.col_idx(&si.col)?, si.desc)))
        .collect::<Result<Vec<_>>>()?;
    let key = |r: &Vec<Atom>| -> Vec<Atom> { idxs.iter().map(|(i, _)| r[*i].clone()).collect() };
    let cmp = |a: &Vec<Atom>, b: &Vec<Atom>| -> Ordering {
        for ((x, y), (_, desc)) in a.iter().zip(b.iter()).zip(idxs.iter()) {
            let ord = if *desc { y.cmp(x) } else { x.cmp(y) };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    };
    let mut keys: Vec<Vec<Atom>> = t.rows.iter().map(key).collect();
    keys.sort_by(cmp);
    keys.dedup();
    extend(
        t,
        res,
        t.rows.iter().map(|r| {
            let k = key(r);
            let rank = keys.binary_search_by(|probe| cmp(probe, &k)).unwrap_or_default();
            Ok(Atom::nat(rank as u64 + 1))
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rela_plan::col::ProjItem;
    use rela_plan::op::OpTy;

    fn nat_rows(rows: &[&[u64]]) -> Vec<Vec<Atom>> {
        rows.iter()
            .map(|r| r.iter().map(|v| Atom::nat(*v)).collect())
            .collect()
    }

    fn col_values(t: &Table, col: &str) -> Vec<Atom> {
        let i = t.col_idx(col).unwrap();
        t.rows.iter().map(|r| r[i].clone()).collect()
    }

    #[test]
    fn test_eval_joins() {
        let mut dag = Dag::new();
        let l = dag
            .lit_tbl(&["a", "b"], nat_rows(&[&[1, 10], &[2, 20], &[2, 21]]))
            .unwrap();
        let r = dag.lit_tbl(&["c"], nat_rows(&[&[2], &[2], &[3]])).unwrap();
        let j = dag.eqjoin(l, r, "a", "c").unwrap();
        assert_eq!(4, eval(&dag, j).unwrap().len());
        let s = dag.semijoin(l, r, "a", "c").unwrap();
        let t = eval(&dag, s).unwrap();
        assert_eq!(vec![Atom::nat(20), Atom::nat(21)], col_values(&t, "b"));
        let x = dag.cross(l, r).unwrap();
        assert_eq!(9, eval(&dag, x).unwrap().len());
    }

    #[test]
    fn test_eval_set_ops() {
        let mut dag = Dag::new();
        let l = dag
            .lit_tbl(&["a", "b"], nat_rows(&[&[1, 2], &[1, 2], &[3, 4]]))
            .unwrap();
        let r = dag.lit_tbl(&["b", "a"], nat_rows(&[&[2, 1]])).unwrap();
        let d = dag.distinct(l).unwrap();
        assert_eq!(2, eval(&dag, d).unwrap().len());
        let u = dag.union(l, r).unwrap();
        let t = eval(&dag, u).unwrap();
        assert_eq!(4, t.len());
        assert_eq!(vec![Atom::nat(1), Atom::nat(2)], t.rows[3]);
        let m = dag.difference(l, r).unwrap();
        let t = eval(&dag, m).unwrap();
        assert_eq!(vec![vec![Atom::nat(3), Atom::nat(4)]], t.rows);
    }

    #[test]
    fn test_eval_generated_cols() {
        let mut dag = Dag::new();
        let t1 = dag
            .lit_tbl(&["k", "v"], nat_rows(&[&[5, 1], &[3, 1], &[5, 2]]))
            .unwrap();
        let rk = dag
            .rank(t1, "r", vec![SortItem::desc("k")])
            .unwrap();
        let t = eval(&dag, rk).unwrap();
        assert_eq!(
            vec![Atom::nat(1), Atom::nat(2), Atom::nat(1)],
            col_values(&t, "r")
        );
        let n = dag.number(t1, "n").unwrap();
        let t = eval(&dag, n).unwrap();
        assert_eq!(
            vec![Atom::nat(1), Atom::nat(2), Atom::nat(3)],
            col_values(&t, "n")
        );
        let at = dag.attach(t1, "c", Atom::str("x")).unwrap();
        let p = dag
            .project(at, vec![ProjItem::new("y", "c"), ProjItem::keep("k")])
            .unwrap();
        let t = eval(&dag, p).unwrap();
        assert_eq!(vec![Atom::str("x"); 3], col_values(&t, "y"));
    }

    #[test]
    fn test_eval_bool_and_select() {
        let mut dag = Dag::new();
        let rows = vec![
            vec![Atom::bool(true), Atom::bool(true)],
            vec![Atom::bool(true), Atom::bool(false)],
            vec![Atom::bool(false), Atom::bool(false)],
        ];
        let t1 = dag.lit_tbl(&["p", "q"], rows).unwrap();
        let and = dag.bool_and(t1, "r", "p", "q").unwrap();
        let or = dag.bool_or(and, "s", "p", "q").unwrap();
        let sel = dag.select(or, "s").unwrap();
        let t = eval(&dag, sel).unwrap();
        assert_eq!(2, t.len());
        assert_eq!(
            vec![Atom::bool(true), Atom::bool(false)],
            col_values(&t, "r")
        );
        // selection on non-boolean column
        let t2 = dag.lit_tbl(&["a"], nat_rows(&[&[1]])).unwrap();
        let sel = dag.select(t2, "a").unwrap();
        assert!(matches!(eval(&dag, sel), Err(Error::DataType(_))));
    }

    #[test]
    fn test_eval_serialize_and_unsupported() {
        let mut dag = Dag::new();
        let frag = dag.empty_frag().unwrap();
        let t1 = dag
            .lit_tbl(&["pos", "item"], nat_rows(&[&[9, 1], &[4, 2]]))
            .unwrap();
        let s = dag.serialize(frag, t1, "pos", "item").unwrap();
        let t = eval(&dag, s).unwrap();
        assert_eq!(nat_rows(&[&[1, 2], &[2, 1]]), t.rows);
        let doc = dag.doc_tbl(t1, "pos", "item", "res").unwrap();
        assert!(matches!(
            eval(&dag, doc),
            Err(Error::Unsupported(OpTy::DocTbl))
        ));
    }
}
