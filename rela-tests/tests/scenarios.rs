use rela_datatype::Atom;
use rela_plan::col::{ProjItem, SortItem};
use rela_plan::op::{Op, OpTy};
use rela_plan::{OptimizeOptions, RuleSet};
use rela_tests::*;

#[test]
fn test_scenario_cross_elim() {
    let Case {
        mut dag,
        root,
        target,
        ..
    } = cross_elim();
    let (root, stats) = optimize_checked(&mut dag, root, OptimizeOptions::default());
    assert_eq!(RuleSet::CROSS_ELIM, stats.fired_on(target));
    assert_eq!(vec![OpTy::Proj, OpTy::LitTbl], dag.shape(root));
    assert!(dag
        .schema(root)
        .unwrap()
        .same_names(&["a"].into_iter().collect()));
}

#[test]
fn test_scenario_diff_empty() {
    let Case { mut dag, root, .. } = diff_empty();
    let (root, stats) = optimize_checked(&mut dag, root, OptimizeOptions::default());
    assert_eq!(RuleSet::DIFF_EMPTY, stats.fired_on(root));
    match dag.op(root) {
        Some(Op::EmptyTbl { cols }) => {
            assert_eq!(1, cols.len());
            assert_eq!("a", cols[0].as_str());
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_scenario_and_split() {
    let Case {
        mut dag,
        root,
        target,
        ..
    } = and_split();
    let (_, stats) = optimize_checked(&mut dag, root, OptimizeOptions::default());
    assert_eq!(RuleSet::AND_SPLIT, stats.fired_on(target));
    assert_eq!(
        vec![OpTy::Attach, OpTy::Select, OpTy::Select, OpTy::LitTbl],
        dag.shape(target)
    );
    match dag.op(target) {
        Some(Op::Attach { res, value, .. }) => {
            assert_eq!("r", res.as_str());
            assert_eq!(&Atom::bool(true), value);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_scenario_rank_merge() {
    let Case {
        mut dag,
        root,
        target,
        ..
    } = rank_merge();
    let (_, stats) = optimize_checked(&mut dag, root, OptimizeOptions::default());
    assert_eq!(RuleSet::RANK_MERGE, stats.fired_on(target));
    let (rank, cols) = dag.op(target).and_then(Op::as_proj).unwrap();
    // outer result name is kept
    assert!(cols.contains(&ProjItem::new("r2", "r1")));
    match dag.op(rank) {
        Some(Op::Rank { input, sortby, .. }) => {
            assert_eq!(
                &[SortItem::asc("k1"), SortItem::asc("k2")][..],
                &sortby[..]
            );
            assert_eq!(vec![OpTy::LitTbl], dag.shape(*input));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_scenario_eqjoin_elim() {
    let Case {
        mut dag,
        root,
        target,
        ..
    } = eqjoin_elim();
    let (_, stats) = optimize_checked(&mut dag, root, OptimizeOptions::default());
    assert_eq!(RuleSet::EQJOIN_ELIM, stats.fired_on(target));
    let (input, cols) = dag.op(target).and_then(Op::as_proj).unwrap();
    assert_eq!(vec![OpTy::LitTbl], dag.shape(input));
    // consumers of the left join column read the right one
    assert!(cols.contains(&ProjItem::new("a", "c")));
    assert!(cols.contains(&ProjItem::keep("d")));
}

#[test]
fn test_scenario_eqjoin_semijoin() {
    let Case {
        mut dag,
        root,
        target,
        ..
    } = eqjoin_semijoin();
    let (root, stats) = optimize_checked(&mut dag, root, OptimizeOptions::default());
    assert_eq!(RuleSet::EQJOIN_SEMIJOIN, stats.fired_on(target));
    assert_eq!(
        vec![OpTy::Proj, OpTy::Proj, OpTy::Semijoin, OpTy::LitTbl, OpTy::LitTbl],
        dag.shape(root)
    );
}

#[test]
fn test_scenario_number_const() {
    let Case {
        mut dag,
        root,
        target,
        ..
    } = number_const();
    let (_, stats) = optimize_checked(&mut dag, root, OptimizeOptions::default());
    assert_eq!(RuleSet::NUMBER_CONST, stats.fired_on(target));
    assert!(matches!(
        dag.op(target),
        Some(Op::Attach {
            value: Atom::Nat(1),
            ..
        })
    ));
}

#[test]
fn test_scenario_select_or() {
    let Case {
        mut dag,
        root,
        target,
        ..
    } = select_or();
    let (_, stats) = optimize_checked(&mut dag, root, OptimizeOptions::default());
    assert_eq!(RuleSet::SELECT_OR, stats.fired_on(target));
    assert!(dag.shape(target).contains(&OpTy::Union));
    assert!(!dag.shape(target).contains(&OpTy::Eqjoin));
}

#[test]
fn test_scenario_serialize_pos() {
    let Case { mut dag, root, .. } = serialize_pos();
    let (root, stats) = optimize_checked(&mut dag, root, OptimizeOptions::default());
    assert_eq!(RuleSet::SERIALIZE_POS, stats.fired_on(root));
    assert_eq!(
        vec![OpTy::Serialize, OpTy::EmptyFrag, OpTy::Attach, OpTy::Proj, OpTy::LitTbl],
        dag.shape(root)
    );
}

#[test]
fn test_scenario_all_rules_disabled() {
    for Case {
        name,
        mut dag,
        root,
        ..
    } in regression_corpus()
    {
        let shape = dag.shape(root);
        let opts = OptimizeOptions::default()
            .with_rules(RuleSet::empty())
            .with_post_pass(false);
        let (new_root, stats) = optimize_checked(&mut dag, root, opts);
        assert_eq!(root, new_root, "{}", name);
        assert!(stats.fired.is_empty(), "{}", name);
        assert_eq!(shape, dag.shape(root), "{}", name);
    }
}

#[test]
fn test_scenario_unused_generated_column() {
    let mut dag = rela_plan::Dag::new();
    let t1 = dag.lit_tbl(&["a"], nat_rows(&[&[1], &[2]])).unwrap();
    let t2 = dag.lit_tbl(&["b"], nat_rows(&[&[3], &[4]])).unwrap();
    let at = dag.attach(t2, "x", Atom::nat(1)).unwrap();
    let pr = dag.project(at, vec![ProjItem::keep("x")]).unwrap();
    let c = dag.cross(t1, pr).unwrap();
    let root = dag.project(c, vec![ProjItem::keep("a")]).unwrap();
    let (root, _) = optimize_checked(&mut dag, root, OptimizeOptions::default());
    assert!(dag
        .schema(root)
        .unwrap()
        .same_names(&["a"].into_iter().collect()));
}
