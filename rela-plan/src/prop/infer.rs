//! Property inference over the whole DAG.
//!
//! Bottom-up properties (cardinality, keys, domains, constants, unique
//! names, levels) are computed in post-order, so every input is annotated
//! before its parents. Top-down properties (required columns, set
//! property, required values) are computed in reverse post-order, and
//! combined over all parents of a shared node.
use crate::col::ColName;
use crate::dag::Dag;
use crate::error::{Error, Result};
use crate::id::NodeID;
use crate::op::{Axis, Binary, Join, Op};
use crate::prop::{DomID, DomStore, NodeProps, PropSnapshot, UnqName};
use fnv::{FnvHashMap, FnvHashSet};
use rela_datatype::Atom;
use smallvec::{smallvec, SmallVec};
use smol_str::SmolStr;
use std::collections::BTreeSet;

/// Infer properties of all nodes reachable from root.
/// All output columns of root are required.
#[inline]
pub fn infer_props(dag: &Dag, root: NodeID) -> Result<PropSnapshot> {
    let cols = dag.node(root)?.schema.iter().cloned().collect();
    infer(dag, root, cols)
}

/// Infer properties with given required columns of root.
pub fn infer_props_with(dag: &Dag, root: NodeID, root_cols: &[&str]) -> Result<PropSnapshot> {
    let node = dag.node(root)?;
    let mut cols = Vec::with_capacity(root_cols.len());
    for c in root_cols {
        if !node.schema.contains(c) {
            return Err(Error::ColumnNotExists(SmolStr::new(c), node.op.ty()));
        }
        cols.push(SmolStr::new(c));
    }
    infer(dag, root, cols)
}

fn infer(dag: &Dag, root: NodeID, root_cols: Vec<ColName>) -> Result<PropSnapshot> {
    let order = dag.post_order(root);
    let mut inf = Infer {
        dag,
        nodes: FnvHashMap::default(),
        doms: DomStore::new(),
        next_unq: 0,
    };
    for &id in &order {
        inf.bottom_up(id)?;
    }
    inf.ref_counts(&order)?;
    inf.top_down(root, &order, root_cols)?;
    Ok(PropSnapshot::from_parts(inf.nodes, inf.doms))
}

struct Infer<'a> {
    dag: &'a Dag,
    nodes: FnvHashMap<NodeID, NodeProps>,
    doms: DomStore,
    next_unq: u32,
}

impl<'a> Infer<'a> {
    fn bottom_up(&mut self, id: NodeID) -> Result<()> {
        let dag = self.dag;
        let node = dag.node(id)?;
        let mut p = NodeProps::default();
        match &node.op {
            Op::LitTbl { cols, rows } => {
                p.card = Some(rows.len() as u64);
                for (i, c) in cols.iter().enumerate() {
                    let values: BTreeSet<Atom> =
                        rows.iter().filter_map(|r| r.get(i).cloned()).collect();
                    if values.len() == rows.len() {
                        p.keys.insert(c.clone());
                    }
                    if values.len() == 1 {
                        if let Some(v) = values.iter().next() {
                            p.consts.insert(c.clone(), v.clone());
                        }
                    }
                    p.doms.insert(c.clone(), self.doms.fresh_exact(values));
                    p.unq.insert(c.clone(), self.fresh_unq());
                }
            }
            Op::EmptyTbl { cols } => {
                p.card = Some(0);
                for c in cols {
                    p.keys.insert(c.clone());
                    p.doms.insert(c.clone(), DomStore::EMPTY);
                    p.unq.insert(c.clone(), self.fresh_unq());
                }
            }
            Op::Attach { input, res, value } => {
                p = self.child(*input)?;
                let exact = self.doms.fresh_exact(std::iter::once(value.clone()).collect());
                let dom = match p.card {
                    Some(n) if n > 0 => exact,
                    // input may be empty, the exact set is only an upper bound
                    _ => self.doms.fresh_sub(&[exact]),
                };
                if matches!(p.card, Some(0 | 1)) {
                    p.keys.insert(res.clone());
                }
                p.doms.insert(res.clone(), dom);
                p.consts.insert(res.clone(), value.clone());
                p.unq.insert(res.clone(), self.fresh_unq());
            }
            Op::Proj { input, cols } => {
                let c = self.child(*input)?;
                p.card = c.card;
                for item in cols {
                    if c.keys.contains(&item.old) {
                        p.keys.insert(item.new.clone());
                    }
                    copy_col(&mut p, &c, &item.old, &item.new);
                }
            }
            Op::Select { input, col } => {
                let c = self.child(*input)?;
                p.card = match (c.card, c.consts.get(col)) {
                    (Some(0), _) => Some(0),
                    (card, Some(Atom::Bool(true))) => card,
                    (_, Some(Atom::Bool(false))) => Some(0),
                    _ => None,
                };
                p.keys = c.keys.clone();
                for name in node.schema.iter() {
                    self.inherit_sub(&mut p, &c, name);
                }
                p.consts.insert(col.clone(), Atom::Bool(true));
            }
            Op::Eqjoin(Join {
                left,
                right,
                lcol,
                rcol,
            }) => {
                let (l, r) = (self.child(*left)?, self.child(*right)?);
                p.card = empty_card(&[l.card, r.card]);
                if r.keys.contains(rcol) {
                    p.keys.extend(l.keys.iter().cloned());
                }
                if l.keys.contains(lcol) {
                    p.keys.extend(r.keys.iter().cloned());
                }
                for name in dag.node(*left)?.schema.iter() {
                    self.inherit_sub(&mut p, &l, name);
                }
                for name in dag.node(*right)?.schema.iter() {
                    self.inherit_sub(&mut p, &r, name);
                }
                let sups: SmallVec<[DomID; 2]> = [l.doms.get(lcol), r.doms.get(rcol)]
                    .into_iter()
                    .flatten()
                    .copied()
                    .collect();
                let jd = self.doms.fresh_sub(&sups);
                p.doms.insert(lcol.clone(), jd);
                p.doms.insert(rcol.clone(), jd);
                if let Some(u) = l.unq.get(lcol) {
                    p.unq.insert(rcol.clone(), *u);
                }
                // join columns share their values
                match (l.consts.get(lcol), r.consts.get(rcol)) {
                    (Some(v), None) => {
                        p.consts.insert(rcol.clone(), v.clone());
                    }
                    (None, Some(v)) => {
                        p.consts.insert(lcol.clone(), v.clone());
                    }
                    _ => (),
                }
            }
            Op::Semijoin(Join {
                left,
                right,
                lcol,
                rcol,
            }) => {
                let (l, r) = (self.child(*left)?, self.child(*right)?);
                p.card = empty_card(&[l.card, r.card]);
                p.keys = l.keys.clone();
                for name in node.schema.iter() {
                    self.inherit_sub(&mut p, &l, name);
                }
                let sups: SmallVec<[DomID; 2]> = [l.doms.get(lcol), r.doms.get(rcol)]
                    .into_iter()
                    .flatten()
                    .copied()
                    .collect();
                let jd = self.doms.fresh_sub(&sups);
                p.doms.insert(lcol.clone(), jd);
            }
            Op::Cross { left, right } => {
                let (l, r) = (self.child(*left)?, self.child(*right)?);
                p.card = match (l.card, r.card) {
                    (Some(a), Some(b)) => a.checked_mul(b),
                    _ => empty_card(&[l.card, r.card]),
                };
                if r.card == Some(1) {
                    p.keys.extend(l.keys.iter().cloned());
                }
                if l.card == Some(1) {
                    p.keys.extend(r.keys.iter().cloned());
                }
                for (side, other, child) in [(&l, &r, *left), (&r, &l, *right)] {
                    for name in dag.node(child)?.schema.iter() {
                        if matches!(other.card, Some(n) if n > 0) {
                            copy_col(&mut p, side, name, name);
                        } else {
                            self.inherit_sub(&mut p, side, name);
                        }
                    }
                }
            }
            Op::Distinct { input } => {
                let c = self.child(*input)?;
                p = c;
                if !matches!(p.card, Some(0 | 1)) {
                    p.card = None;
                }
                if node.schema.len() == 1 {
                    p.keys.extend(node.schema.iter().cloned());
                }
            }
            Op::Union { left, right } => {
                let (l, r) = (self.child(*left)?, self.child(*right)?);
                p.card = match (l.card, r.card) {
                    (Some(a), Some(b)) => a.checked_add(b),
                    _ => None,
                };
                for name in node.schema.iter() {
                    let dom = match (l.doms.get(name), r.doms.get(name)) {
                        (Some(a), Some(b)) => self.doms.fresh_sup(&[*a, *b]),
                        _ => self.doms.fresh(),
                    };
                    p.doms.insert(name.clone(), dom);
                    p.unq.insert(name.clone(), self.fresh_unq());
                    if let (Some(a), Some(b)) = (l.consts.get(name), r.consts.get(name)) {
                        if a == b {
                            p.consts.insert(name.clone(), a.clone());
                        }
                    }
                    if let (Some(a), Some(b)) = (l.levels.get(name), r.levels.get(name)) {
                        if a == b {
                            p.levels.insert(name.clone(), *a);
                        }
                    }
                }
            }
            Op::Difference { left, .. } => {
                let l = self.child(*left)?;
                p.card = empty_card(&[l.card]);
                p.keys = l.keys.clone();
                for name in node.schema.iter() {
                    self.inherit_sub(&mut p, &l, name);
                }
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
                p = self.child(*input)?;
                self.fresh_col(&mut p, res);
                let is_and = matches!(node.op, Op::BoolAnd(_));
                if let (Some(Atom::Bool(a)), Some(Atom::Bool(b))) =
                    (p.consts.get(lcol), p.consts.get(rcol))
                {
                    let v = if is_and { *a && *b } else { *a || *b };
                    p.consts.insert(res.clone(), Atom::Bool(v));
                }
                if matches!(p.card, Some(0 | 1)) {
                    p.keys.insert(res.clone());
                }
            }
            Op::Rank { input, res, sortby } => {
                p = self.child(*input)?;
                let key_sort = sortby.iter().any(|si| p.keys.contains(&si.col));
                self.fresh_col(&mut p, res);
                if key_sort || matches!(p.card, Some(0 | 1)) {
                    p.keys.insert(res.clone());
                }
            }
            Op::Number { input, res } => {
                p = self.child(*input)?;
                self.fresh_col(&mut p, res);
                p.keys.insert(res.clone());
            }
            Op::Step(step) => {
                let c = self.child(step.ctx)?;
                p.card = empty_card(&[c.card]);
                self.inherit_sub(&mut p, &c, &step.iter);
                self.fresh_col(&mut p, &step.item_res);
                if let Some(level) = step
                    .level
                    .or_else(|| step_level(step.axis, c.levels.get(&step.item).copied()))
                {
                    p.levels.insert(step.item_res.clone(), level);
                }
            }
            Op::StepJoin(step) => {
                let c = self.child(step.input)?;
                p.card = empty_card(&[c.card]);
                for name in dag.node(step.input)?.schema.iter() {
                    self.inherit_sub(&mut p, &c, name);
                }
                self.fresh_col(&mut p, &step.item_res);
                if let Some(level) = step
                    .level
                    .or_else(|| step_level(step.axis, c.levels.get(&step.item).copied()))
                {
                    p.levels.insert(step.item_res.clone(), level);
                }
            }
            Op::DocTbl {
                input,
                iter,
                item_res,
                ..
            } => {
                let c = self.child(*input)?;
                p.card = c.card;
                if c.keys.contains(iter) {
                    p.keys.insert(iter.clone());
                }
                copy_col(&mut p, &c, iter, iter);
                self.fresh_col(&mut p, item_res);
                // document nodes are roots
                p.levels.insert(item_res.clone(), 0);
            }
            Op::Roots { input } | Op::Dummy { input } => {
                p = self.child(*input)?;
            }
            Op::Fcns { left, .. } => {
                p = self.child(*left)?;
            }
            Op::Twig { input, iter, item } => {
                let c = self.child(*input)?;
                self.inherit_sub(&mut p, &c, iter);
                self.fresh_col(&mut p, item);
            }
            Op::Content {
                input, iter, item, ..
            } => {
                let c = self.child(*input)?;
                self.inherit_sub(&mut p, &c, iter);
                self.fresh_col(&mut p, item);
            }
            Op::Serialize {
                input, pos, item, ..
            } => {
                let c = self.child(*input)?;
                p.card = c.card;
                for col in [pos, item] {
                    if c.keys.contains(col) {
                        p.keys.insert(col.clone());
                    }
                    copy_col(&mut p, &c, col, col);
                }
            }
            Op::Fragment { .. } | Op::EmptyFrag | Op::FragUnion { .. } | Op::Nil => (),
        }
        // top-down properties are computed afterwards
        p.icols.clear();
        p.req_vals.clear();
        p.set = false;
        p.ref_count = 0;
        self.nodes.insert(id, p);
        Ok(())
    }

    fn ref_counts(&mut self, order: &[NodeID]) -> Result<()> {
        for &id in order {
            let mut inputs = self.dag.node(id)?.op.inputs();
            inputs.sort();
            inputs.dedup();
            for input in inputs {
                if let Some(p) = self.nodes.get_mut(&input) {
                    p.ref_count += 1;
                }
            }
        }
        Ok(())
    }

    fn top_down(&mut self, root: NodeID, order: &[NodeID], root_cols: Vec<ColName>) -> Result<()> {
        let dag = self.dag;
        let mut downs: FnvHashMap<NodeID, Down> = FnvHashMap::default();
        downs.insert(
            root,
            Down {
                icols: root_cols.into_iter().collect(),
                set: Some(false),
                req_vals: Some(FnvHashMap::default()),
            },
        );
        for &id in order.iter().rev() {
            let down = downs.remove(&id).unwrap_or_default();
            let icols = down.icols;
            let set = down.set.unwrap_or_default();
            let req_vals = down.req_vals.unwrap_or_default();
            let node = dag.node(id)?;
            for (child, contrib) in contributions(dag, &node.op, &icols, set, &req_vals)? {
                let schema = &dag.node(child)?.schema;
                let entry = downs.entry(child).or_default();
                entry
                    .icols
                    .extend(contrib.icols.into_iter().filter(|c| schema.contains(c)));
                entry.set = Some(entry.set.unwrap_or(true) && contrib.set);
                entry.req_vals = Some(match entry.req_vals.take() {
                    None => contrib.req_vals,
                    Some(mut prev) => {
                        prev.retain(|c, v| contrib.req_vals.get(c) == Some(&*v));
                        prev
                    }
                });
            }
            let p = self.nodes.entry(id).or_default();
            p.icols = icols;
            p.set = set;
            p.req_vals = req_vals;
        }
        Ok(())
    }

    #[inline]
    fn child(&self, id: NodeID) -> Result<NodeProps> {
        self.nodes.get(&id).cloned().ok_or(Error::NodeNotFound(id))
    }

    #[inline]
    fn fresh_unq(&mut self) -> UnqName {
        let u = UnqName::from(self.next_unq);
        self.next_unq += 1;
        u
    }

    /// Annotate a newly generated column.
    #[inline]
    fn fresh_col(&mut self, p: &mut NodeProps, col: &ColName) {
        let dom = self.doms.fresh();
        p.doms.insert(col.clone(), dom);
        let unq = self.fresh_unq();
        p.unq.insert(col.clone(), unq);
        p.consts.remove(col);
        p.levels.remove(col);
    }

    /// Annotate a column whose values are a subset of the source column.
    #[inline]
    fn inherit_sub(&mut self, p: &mut NodeProps, src: &NodeProps, col: &ColName) {
        let dom = match src.doms.get(col) {
            Some(d) => self.doms.fresh_sub(&[*d]),
            None => self.doms.fresh(),
        };
        p.doms.insert(col.clone(), dom);
        if let Some(u) = src.unq.get(col) {
            p.unq.insert(col.clone(), *u);
        }
        if let Some(v) = src.consts.get(col) {
            p.consts.insert(col.clone(), v.clone());
        }
        if let Some(l) = src.levels.get(col) {
            p.levels.insert(col.clone(), *l);
        }
    }
}

/// Copy column annotation from source, possibly renamed.
#[inline]
fn copy_col(p: &mut NodeProps, src: &NodeProps, old: &ColName, new: &ColName) {
    if let Some(d) = src.doms.get(old) {
        p.doms.insert(new.clone(), *d);
    }
    if let Some(u) = src.unq.get(old) {
        p.unq.insert(new.clone(), *u);
    }
    if let Some(v) = src.consts.get(old) {
        p.consts.insert(new.clone(), v.clone());
    }
    if let Some(l) = src.levels.get(old) {
        p.levels.insert(new.clone(), *l);
    }
}

/// Cardinality is only known to be zero if any input is empty.
#[inline]
fn empty_card(cards: &[Option<u64>]) -> Option<u64> {
    if cards.iter().any(|c| *c == Some(0)) {
        Some(0)
    } else {
        None
    }
}

#[inline]
fn step_level(axis: Axis, ctx_level: Option<i32>) -> Option<i32> {
    let level = ctx_level?;
    match axis {
        Axis::Child | Axis::Attribute => Some(level + 1),
        Axis::Parent if level > 0 => Some(level - 1),
        Axis::SelfAxis => Some(level),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct Down {
    icols: FnvHashSet<ColName>,
    // None until the first parent contributes
    set: Option<bool>,
    req_vals: Option<FnvHashMap<ColName, bool>>,
}

#[derive(Debug, Default)]
struct Contrib {
    icols: FnvHashSet<ColName>,
    set: bool,
    req_vals: FnvHashMap<ColName, bool>,
}

/// Top-down properties passed from the operator to each of its inputs.
fn contributions(
    dag: &Dag,
    op: &Op,
    icols: &FnvHashSet<ColName>,
    set: bool,
    req_vals: &FnvHashMap<ColName, bool>,
) -> Result<SmallVec<[(NodeID, Contrib); 2]>> {
    let full = |id: NodeID| -> Result<FnvHashSet<ColName>> {
        Ok(dag.node(id)?.schema.iter().cloned().collect())
    };
    let split = |id: NodeID| -> Result<(FnvHashSet<ColName>, FnvHashMap<ColName, bool>)> {
        let schema = &dag.node(id)?.schema;
        let ic = icols.iter().filter(|c| schema.contains(c)).cloned().collect();
        let rv = req_vals
            .iter()
            .filter(|(c, _)| schema.contains(c))
            .map(|(c, v)| (c.clone(), *v))
            .collect();
        Ok((ic, rv))
    };
    let without = |col: &ColName| -> (FnvHashSet<ColName>, FnvHashMap<ColName, bool>) {
        let mut ic = icols.clone();
        ic.remove(col);
        let mut rv = req_vals.clone();
        rv.remove(col);
        (ic, rv)
    };
    let res = match op {
        Op::LitTbl { .. } | Op::EmptyTbl { .. } | Op::EmptyFrag | Op::Nil => smallvec![],
        Op::Attach { input, res, .. } => {
            let (ic, rv) = without(res);
            smallvec![(*input, contrib(ic, set, rv))]
        }
        Op::Number { input, res } => {
            // numbers depend on every input row, duplicates included
            let (ic, _) = without(res);
            smallvec![(*input, contrib(ic, false, FnvHashMap::default()))]
        }
        Op::Proj { input, cols } => {
            let mut ic = FnvHashSet::default();
            let mut rv = FnvHashMap::default();
            let mut conflicts = FnvHashSet::default();
            for item in cols {
                if icols.contains(&item.new) {
                    ic.insert(item.old.clone());
                }
                if let Some(v) = req_vals.get(&item.new) {
                    if let Some(prev) = rv.insert(item.old.clone(), *v) {
                        if prev != *v {
                            conflicts.insert(item.old.clone());
                        }
                    }
                }
            }
            for c in conflicts {
                rv.remove(&c);
            }
            smallvec![(*input, contrib(ic, set, rv))]
        }
        Op::Select { input, col } => {
            let mut ic = icols.clone();
            ic.insert(col.clone());
            let mut rv = req_vals.clone();
            rv.insert(col.clone(), true);
            smallvec![(*input, contrib(ic, set, rv))]
        }
        Op::Eqjoin(Join {
            left,
            right,
            lcol,
            rcol,
        }) => {
            let (mut lic, lrv) = split(*left)?;
            let (mut ric, rrv) = split(*right)?;
            lic.insert(lcol.clone());
            ric.insert(rcol.clone());
            smallvec![
                (*left, contrib(lic, set, lrv)),
                (*right, contrib(ric, set, rrv))
            ]
        }
        Op::Semijoin(Join {
            left,
            right,
            lcol,
            rcol,
        }) => {
            let mut lic = icols.clone();
            lic.insert(lcol.clone());
            let ric = std::iter::once(rcol.clone()).collect();
            smallvec![
                (*left, contrib(lic, set, req_vals.clone())),
                (*right, contrib(ric, true, FnvHashMap::default()))
            ]
        }
        Op::Cross { left, right } => {
            let (lic, lrv) = split(*left)?;
            let (ric, rrv) = split(*right)?;
            smallvec![
                (*left, contrib(lic, set, lrv)),
                (*right, contrib(ric, set, rrv))
            ]
        }
        Op::Distinct { input } => {
            smallvec![(*input, contrib(full(*input)?, true, req_vals.clone()))]
        }
        Op::Union { left, right } => smallvec![
            (*left, contrib(full(*left)?, set, req_vals.clone())),
            (*right, contrib(full(*right)?, set, req_vals.clone()))
        ],
        Op::Difference { left, right } => smallvec![
            (*left, contrib(full(*left)?, set, req_vals.clone())),
            (*right, contrib(full(*right)?, true, FnvHashMap::default()))
        ],
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
            let (mut ic, rv) = without(res);
            if icols.contains(res) || req_vals.contains_key(res) {
                ic.insert(lcol.clone());
                ic.insert(rcol.clone());
            }
            smallvec![(*input, contrib(ic, set, rv))]
        }
        Op::Rank { input, res, sortby } => {
            // ranks depend on every input row, so no row may be dropped early
            let (mut ic, _) = without(res);
            if icols.contains(res) {
                ic.extend(sortby.iter().map(|si| si.col.clone()));
            }
            smallvec![(*input, contrib(ic, set, FnvHashMap::default()))]
        }
        Op::Step(step) => smallvec![
            (step.doc, contrib(FnvHashSet::default(), true, FnvHashMap::default())),
            (
                step.ctx,
                contrib(
                    [step.iter.clone(), step.item.clone()].into_iter().collect(),
                    true,
                    FnvHashMap::default()
                )
            )
        ],
        Op::StepJoin(step) => {
            let (mut ic, rv) = without(&step.item_res);
            ic.insert(step.item.clone());
            smallvec![
                (step.doc, contrib(FnvHashSet::default(), true, FnvHashMap::default())),
                (step.input, contrib(ic, set, rv))
            ]
        }
        Op::DocTbl {
            input, iter, item, ..
        } => smallvec![(
            *input,
            contrib(
                [iter.clone(), item.clone()].into_iter().collect(),
                false,
                FnvHashMap::default()
            )
        )],
        Op::Roots { input } | Op::Dummy { input } => {
            smallvec![(*input, contrib(icols.clone(), set, req_vals.clone()))]
        }
        Op::Fragment { input } => {
            smallvec![(*input, contrib(full(*input)?, false, FnvHashMap::default()))]
        }
        Op::FragUnion { left, right } => smallvec![
            (*left, Contrib::default()),
            (*right, Contrib::default())
        ],
        Op::Twig { input, iter, item } => smallvec![(
            *input,
            contrib(
                [iter.clone(), item.clone()].into_iter().collect(),
                false,
                FnvHashMap::default()
            )
        )],
        Op::Content {
            frag,
            input,
            iter,
            pos,
            item,
        } => smallvec![
            (*frag, Contrib::default()),
            (
                *input,
                contrib(
                    [iter.clone(), pos.clone(), item.clone()]
                        .into_iter()
                        .collect(),
                    false,
                    FnvHashMap::default()
                )
            )
        ],
        Op::Fcns { left, right } => smallvec![
            (*left, contrib(full(*left)?, false, FnvHashMap::default())),
            (*right, contrib(full(*right)?, false, FnvHashMap::default()))
        ],
        Op::Serialize {
            frag,
            input,
            pos,
            item,
        } => smallvec![
            (*frag, Contrib::default()),
            (
                *input,
                contrib(
                    [pos.clone(), item.clone()].into_iter().collect(),
                    false,
                    FnvHashMap::default()
                )
            )
        ],
    };
    Ok(res)
}

#[inline]
fn contrib(icols: FnvHashSet<ColName>, set: bool, req_vals: FnvHashMap<ColName, bool>) -> Contrib {
    Contrib {
        icols,
        set,
        req_vals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::col::{ProjItem, SortItem};
    use crate::prop::PropOracle;
    use crate::tests::{bool_rows, nat_rows};

    #[test]
    fn test_infer_card_and_keys() {
        let mut dag = Dag::new();
        let t1 = dag
            .lit_tbl(&["a", "b"], nat_rows(&[&[1, 5], &[2, 5], &[3, 5]]))
            .unwrap();
        let t2 = dag.lit_tbl(&["c"], nat_rows(&[&[7]])).unwrap();
        let x = dag.cross(t1, t2).unwrap();
        let n = dag.number(x, "n").unwrap();
        let d = dag.project(n, vec![ProjItem::new("z", "b")]).unwrap();
        let d = dag.distinct(d).unwrap();
        let props = infer_props(&dag, d).unwrap();
        assert_eq!(Some(3), props.card(t1));
        assert!(props.is_key(t1, &["a"]));
        assert!(!props.is_key(t1, &["b"]));
        assert_eq!(Some(&Atom::nat(5)), props.const_val(t1, "b"));
        assert_eq!(Some(3), props.card(x));
        // left keys survive cross product with single row
        assert!(props.is_key(x, &["a"]));
        assert!(props.is_key(n, &["n"]));
        assert!(props.is_key(d, &["z"]));
        assert_eq!(Some(&Atom::nat(5)), props.const_val(d, "z"));
        assert_eq!(1, props.ref_count(t1));
        assert_eq!(0, props.ref_count(d));
    }

    #[test]
    fn test_infer_domains() {
        let mut dag = Dag::new();
        let t1 = dag.lit_tbl(&["a"], nat_rows(&[&[1], &[2]])).unwrap();
        let t2 = dag
            .lit_tbl(&["b"], nat_rows(&[&[1], &[2], &[3]]))
            .unwrap();
        let j = dag.eqjoin(t1, t2, "a", "b").unwrap();
        let p = dag.project(j, vec![ProjItem::keep("a")]).unwrap();
        let u = dag.union(p, t1).unwrap();
        let props = infer_props(&dag, u).unwrap();
        assert!(props.col_subdom((t1, "a"), (t2, "b")));
        assert!(!props.col_subdom((t2, "b"), (t1, "a")));
        assert!(props.col_subdom((j, "a"), (t1, "a")));
        assert!(props.col_subdom((j, "b"), (t2, "b")));
        assert!(props.col_subdom((p, "a"), (u, "a")));
        assert!(props.col_subdom((t1, "a"), (u, "a")));
        // join columns share unique name
        assert_eq!(props.unq_name(j, "a"), props.unq_name(j, "b"));
        assert_eq!(props.unq_name(t1, "a"), props.unq_name(p, "a"));
        assert_ne!(props.unq_name(t2, "b"), props.unq_name(j, "b"));
    }

    #[test]
    fn test_infer_icols_and_set() {
        let mut dag = Dag::new();
        let t1 = dag
            .lit_tbl(&["a", "b", "c"], nat_rows(&[&[1, 2, 3]]))
            .unwrap();
        let r = dag
            .rank(t1, "r", vec![SortItem::asc("b")])
            .unwrap();
        let p1 = dag.project(r, vec![ProjItem::new("x", "a")]).unwrap();
        let p2 = dag
            .project(r, vec![ProjItem::new("y", "c"), ProjItem::keep("r")])
            .unwrap();
        let p2 = dag.project(p2, vec![ProjItem::keep("y")]).unwrap();
        let d = dag.distinct(p2).unwrap();
        let p3 = dag.project(d, vec![ProjItem::new("x", "y")]).unwrap();
        let u = dag.union(p1, p3).unwrap();
        let props = infer_props(&dag, u).unwrap();
        // union of requirements from both parents
        assert!(props.is_icol(r, "a"));
        assert!(props.is_icol(r, "c"));
        assert!(!props.is_icol(r, "r"));
        assert!(!props.is_icol(t1, "b"));
        assert_eq!(2, props.icols_count(t1));
        // set property only under distinct
        assert!(props.is_set(p2));
        assert!(!props.is_set(p1));
        // conjunction over parents
        assert!(!props.is_set(r));
        assert_eq!(2, props.ref_count(r));
    }

    #[test]
    fn test_infer_req_vals() {
        let mut dag = Dag::new();
        let t1 = dag
            .lit_tbl(&["p", "q"], bool_rows(&[&[true, false], &[true, true]]))
            .unwrap();
        let a = dag.bool_and(t1, "r", "p", "q").unwrap();
        let p = dag
            .project(a, vec![ProjItem::new("s", "r"), ProjItem::keep("p")])
            .unwrap();
        let s = dag.select(p, "s").unwrap();
        let props = infer_props_with(&dag, s, &["p"]).unwrap();
        assert_eq!(Some(true), props.req_val(p, "s"));
        assert_eq!(Some(true), props.req_val(a, "r"));
        assert_eq!(None, props.req_val(t1, "r"));
        assert!(props.is_icol(t1, "q"));
        assert!(!props.is_icol(s, "s"));
        assert!(infer_props_with(&dag, s, &["zz"]).is_err());
    }

    #[test]
    fn test_infer_req_vals_stop_at_rank() {
        let mut dag = Dag::new();
        let rows = vec![
            vec![Atom::nat(1), Atom::bool(false), Atom::bool(true)],
            vec![Atom::nat(2), Atom::bool(true), Atom::bool(true)],
        ];
        let t1 = dag.lit_tbl(&["k", "p", "q"], rows).unwrap();
        let a = dag.bool_and(t1, "r", "p", "q").unwrap();
        let rk = dag.rank(a, "rk", vec![SortItem::asc("k")]).unwrap();
        let n = dag.number(rk, "n").unwrap();
        let s = dag.select(n, "r").unwrap();
        let p = dag.project(s, vec![ProjItem::keep("rk")]).unwrap();
        let d = dag.distinct(p).unwrap();
        let props = infer_props(&dag, d).unwrap();
        assert_eq!(Some(true), props.req_val(n, "r"));
        // filtering below rank or number renumbers the surviving rows
        assert_eq!(None, props.req_val(rk, "r"));
        assert_eq!(None, props.req_val(a, "r"));
        assert!(props.is_icol(a, "r"));
    }

    #[test]
    fn test_infer_levels() {
        let mut dag = Dag::new();
        let t1 = dag
            .lit_tbl(&["iter", "item"], nat_rows(&[&[1, 1]]))
            .unwrap();
        let doc = dag.doc_tbl(t1, "iter", "item", "res").unwrap();
        let frag = dag.fragment(doc).unwrap();
        let ctx = dag
            .project(doc, vec![ProjItem::keep("iter"), ProjItem::new("item", "res")])
            .unwrap();
        let st = crate::tests::step(&mut dag, frag, ctx, Axis::Child, "res");
        let ctx2 = dag
            .project(st, vec![ProjItem::keep("iter"), ProjItem::new("item", "res")])
            .unwrap();
        let st2 = crate::tests::step(&mut dag, frag, ctx2, Axis::Parent, "res");
        let props = infer_props(&dag, st2).unwrap();
        assert_eq!(Some(0), props.level(doc, "res"));
        assert_eq!(Some(1), props.level(st, "res"));
        assert_eq!(Some(0), props.level(st2, "res"));
        assert_eq!(Some(&Atom::nat(1)), props.const_val(st, "iter"));
        assert_eq!(props.unq_name(t1, "iter"), props.unq_name(st2, "iter"));
    }
}
