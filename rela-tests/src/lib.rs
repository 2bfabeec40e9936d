use rand::Rng;
use rela_compute::{eval, Table};
use rela_datatype::Atom;
use rela_plan::col::{ProjItem, SortItem};
use rela_plan::{Dag, NodeID, OptimizeOptions, Optimizer, RewriteStats};

/// Plan of the regression corpus.
pub struct Case {
    pub name: &'static str,
    pub dag: Dag,
    pub root: NodeID,
    /// Node expected to be rewritten.
    pub target: NodeID,
}

#[inline]
pub fn nat_rows(rows: &[&[u64]]) -> Vec<Vec<Atom>> {
    rows.iter()
        .map(|r| r.iter().map(|v| Atom::nat(*v)).collect())
        .collect()
}

#[inline]
pub fn bool_rows(rows: &[&[bool]]) -> Vec<Vec<Atom>> {
    rows.iter()
        .map(|r| r.iter().map(|v| Atom::bool(*v)).collect())
        .collect()
}

/// Random rows of natural numbers, with at most `max_rows` rows and
/// values up to `max_val`. Empty result is possible.
pub fn random_nat_rows<R: Rng>(
    rng: &mut R,
    ncols: usize,
    max_rows: usize,
    max_val: u64,
) -> Vec<Vec<Atom>> {
    let n = rng.gen_range(0..=max_rows);
    let mut rows = Vec::with_capacity(n);
    for _ in 0..n {
        let mut row = Vec::with_capacity(ncols);
        for _ in 0..ncols {
            row.push(Atom::nat(rng.gen_range(0..=max_val)));
        }
        rows.push(row);
    }
    rows
}

/// Random rows of a natural number and a boolean.
pub fn random_nat_bool_rows<R: Rng>(rng: &mut R, max_rows: usize, max_val: u64) -> Vec<Vec<Atom>> {
    let n = rng.gen_range(0..=max_rows);
    let mut rows = Vec::with_capacity(n);
    for _ in 0..n {
        let k = rng.gen_range(0..=max_val);
        let p: bool = rng.gen();
        rows.push(vec![Atom::nat(k), Atom::bool(p)]);
    }
    rows
}

pub fn explain(dag: &Dag, root: NodeID) -> String {
    let mut s = String::new();
    dag.explain(root, &mut s).unwrap();
    s
}

/// Optimize the plan and check the result is unchanged.
/// Returns new root and statistics of the pass.
pub fn optimize_checked(
    dag: &mut Dag,
    root: NodeID,
    opts: OptimizeOptions,
) -> (NodeID, RewriteStats) {
    let before = dag.clone();
    let expected: Table = eval(&before, root).unwrap();
    let mut opt = Optimizer::new(opts);
    let new_root = opt.optimize_algebra_plan(dag, root).unwrap();
    let actual = eval(dag, new_root).unwrap();
    assert!(
        expected.bag_eq(&actual).unwrap(),
        "Result changed by rewrite\nbefore:\n{}{}\nafter:\n{}{}",
        explain(&before, root),
        expected,
        explain(dag, new_root),
        actual
    );
    (new_root, opt.stats().clone())
}

/// proj(a) over cross of a 3-row table and a 1-row table.
pub fn cross_elim() -> Case {
    let mut dag = Dag::new();
    let l = dag
        .lit_tbl(&["a"], nat_rows(&[&[1], &[2], &[3]]))
        .unwrap();
    let r = dag.lit_tbl(&["b"], nat_rows(&[&[7]])).unwrap();
    let c = dag.cross(l, r).unwrap();
    let root = dag.project(c, vec![ProjItem::keep("a")]).unwrap();
    Case {
        name: "cross_elim",
        dag,
        root,
        target: c,
    }
}

/// Difference of a ∈ {1,2,3} and a ∈ [0,10].
pub fn diff_empty() -> Case {
    let mut dag = Dag::new();
    let l = dag
        .lit_tbl(&["a"], nat_rows(&[&[1], &[2], &[3]]))
        .unwrap();
    let r = dag
        .lit_tbl(&["a"], (0..=10).map(|v| vec![Atom::nat(v)]).collect())
        .unwrap();
    let root = dag.difference(l, r).unwrap();
    Case {
        name: "diff_empty",
        dag,
        root,
        target: root,
    }
}

/// Conjunction which is selected and only consumed as a set.
pub fn and_split() -> Case {
    let mut dag = Dag::new();
    let x = dag
        .lit_tbl(
            &["p1", "p2"],
            bool_rows(&[&[true, true], &[true, false], &[false, true]]),
        )
        .unwrap();
    let and = dag.bool_and(x, "r", "p1", "p2").unwrap();
    let sel = dag.select(and, "r").unwrap();
    let p = dag.project(sel, vec![ProjItem::keep("p1")]).unwrap();
    let root = dag.distinct(p).unwrap();
    Case {
        name: "and_split",
        dag,
        root,
        target: and,
    }
}

/// Rank by (r1 asc, k2) over rank r1 by (k1).
pub fn rank_merge() -> Case {
    let mut dag = Dag::new();
    let x = dag
        .lit_tbl(&["k1", "k2"], nat_rows(&[&[1, 5], &[1, 4], &[2, 4]]))
        .unwrap();
    let inner = dag.rank(x, "r1", vec![SortItem::asc("k1")]).unwrap();
    let outer = dag
        .rank(inner, "r2", vec![SortItem::asc("r1"), SortItem::asc("k2")])
        .unwrap();
    let root = dag
        .project(outer, vec![ProjItem::keep("r2"), ProjItem::keep("k2")])
        .unwrap();
    Case {
        name: "rank_merge",
        dag,
        root,
        target: outer,
    }
}

/// Equi-join whose left side is keyed and covers the right side.
pub fn eqjoin_elim() -> Case {
    let mut dag = Dag::new();
    let l = dag
        .lit_tbl(&["a", "b"], nat_rows(&[&[1, 9], &[2, 9], &[3, 9]]))
        .unwrap();
    let r = dag
        .lit_tbl(&["c", "d"], nat_rows(&[&[1, 10], &[1, 11], &[3, 12]]))
        .unwrap();
    let j = dag.eqjoin(l, r, "a", "c").unwrap();
    let root = dag
        .project(j, vec![ProjItem::new("x", "a"), ProjItem::keep("d")])
        .unwrap();
    Case {
        name: "eqjoin_elim",
        dag,
        root,
        target: j,
    }
}

/// Equi-join whose keyed left side only filters the right side.
pub fn eqjoin_semijoin() -> Case {
    let mut dag = Dag::new();
    let l = dag.lit_tbl(&["a"], nat_rows(&[&[1], &[2]])).unwrap();
    let r = dag
        .lit_tbl(&["c", "d"], nat_rows(&[&[1, 10], &[5, 11]]))
        .unwrap();
    let j = dag.eqjoin(l, r, "a", "c").unwrap();
    let root = dag.project(j, vec![ProjItem::keep("d")]).unwrap();
    Case {
        name: "eqjoin_semijoin",
        dag,
        root,
        target: j,
    }
}

/// Numbering of a single row.
pub fn number_const() -> Case {
    let mut dag = Dag::new();
    let t = dag.lit_tbl(&["a"], nat_rows(&[&[4]])).unwrap();
    let n = dag.number(t, "n").unwrap();
    let root = dag
        .project(n, vec![ProjItem::keep("a"), ProjItem::keep("n")])
        .unwrap();
    Case {
        name: "number_const",
        dag,
        root,
        target: n,
    }
}

/// Selection on disjunction of predicates of both join sides.
pub fn select_or() -> Case {
    let mut dag = Dag::new();
    let l = dag
        .lit_tbl(
            &["a", "p"],
            vec![
                vec![Atom::nat(1), Atom::bool(true)],
                vec![Atom::nat(2), Atom::bool(false)],
            ],
        )
        .unwrap();
    let r = dag
        .lit_tbl(
            &["b", "q"],
            vec![
                vec![Atom::nat(1), Atom::bool(false)],
                vec![Atom::nat(2), Atom::bool(true)],
            ],
        )
        .unwrap();
    let (sel, root) = select_or_plan(&mut dag, l, r);
    Case {
        name: "select_or",
        dag,
        root,
        target: sel,
    }
}

/// distinct(proj(x) over select(s) over or(s: q, p) over join of
/// L(a, p) and R(b, q)). Returns the selection and the root.
pub fn select_or_plan(dag: &mut Dag, l: NodeID, r: NodeID) -> (NodeID, NodeID) {
    let j = dag.eqjoin(l, r, "a", "b").unwrap();
    let or = dag.bool_or(j, "s", "q", "p").unwrap();
    let pr = dag
        .project(or, vec![ProjItem::new("x", "a"), ProjItem::keep("s")])
        .unwrap();
    let sel = dag.select(pr, "s").unwrap();
    let p = dag.project(sel, vec![ProjItem::keep("x")]).unwrap();
    (sel, dag.distinct(p).unwrap())
}

/// Serialization of a single row.
pub fn serialize_pos() -> Case {
    let mut dag = Dag::new();
    let frag = dag.empty_frag().unwrap();
    let t = dag
        .lit_tbl(&["pos", "item"], nat_rows(&[&[5, 10]]))
        .unwrap();
    let root = dag.serialize(frag, t, "pos", "item").unwrap();
    Case {
        name: "serialize_pos",
        dag,
        root,
        target: root,
    }
}

/// All plans of the regression corpus.
pub fn regression_corpus() -> Vec<Case> {
    vec![
        cross_elim(),
        diff_empty(),
        and_split(),
        rank_merge(),
        eqjoin_elim(),
        eqjoin_semijoin(),
        number_const(),
        select_or(),
        serialize_pos(),
    ]
}
