use crate::dag::Dag;
use crate::id::NodeID;
use crate::op::{Axis, Step};
use crate::optimize::{OptimizeOptions, Optimizer};
use crate::prop::{infer_props, PropSnapshot};
use crate::rule::RuleSet;
use rela_datatype::Atom;
use smol_str::SmolStr;

pub(crate) fn nat_rows(rows: &[&[u64]]) -> Vec<Vec<Atom>> {
    rows.iter()
        .map(|r| r.iter().map(|v| Atom::nat(*v)).collect())
        .collect()
}

pub(crate) fn bool_rows(rows: &[&[bool]]) -> Vec<Vec<Atom>> {
    rows.iter()
        .map(|r| r.iter().map(|v| Atom::bool(*v)).collect())
        .collect()
}

pub(crate) fn print_plan(dag: &Dag, root: NodeID) {
    let mut s = String::new();
    let _ = dag.explain(root, &mut s);
    println!("{}", s)
}

/// Build a non-guided wildcard step over (iter, item) context.
pub(crate) fn step(dag: &mut Dag, doc: NodeID, ctx: NodeID, axis: Axis, item_res: &str) -> NodeID {
    dag.step(Step {
        doc,
        ctx,
        axis,
        test: SmolStr::new("*"),
        level: None,
        iter: SmolStr::new("iter"),
        item: SmolStr::new("item"),
        item_res: SmolStr::new(item_res),
        guided: false,
    })
    .unwrap()
}

/// Run only given rules on the plan with inferred properties,
/// without the post-pass. Returns optimizer for inspection.
pub(crate) fn run_rules(dag: &mut Dag, root: NodeID, rules: RuleSet) -> Optimizer {
    let props = infer_props(dag, root).unwrap();
    run_rules_with(dag, root, rules, &props)
}

pub(crate) fn run_rules_with(
    dag: &mut Dag,
    root: NodeID,
    rules: RuleSet,
    props: &PropSnapshot,
) -> Optimizer {
    print_plan(dag, root);
    let mut opt = Optimizer::new(
        OptimizeOptions::default()
            .with_rules(rules)
            .with_post_pass(false),
    );
    let root = opt.optimize(dag, root, props).unwrap();
    print_plan(dag, root);
    opt
}
