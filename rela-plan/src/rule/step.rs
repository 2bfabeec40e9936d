use crate::col::{ColName, ProjItem};
use crate::error::Result;
use crate::id::NodeID;
use crate::op::{Op, Step};
use crate::prop::PropOracle;
use crate::rule::RuleCtx;

/// Resolve the document level of step results from properties.
pub fn step_level<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<bool> {
    let mut op = match ctx.dag.op(id) {
        Some(op @ (Op::Step(_) | Op::StepJoin(_))) => op.clone(),
        _ => return Ok(false),
    };
    let (level, item_res) = match &mut op {
        Op::Step(step) => (&mut step.level, &step.item_res),
        Op::StepJoin(step) => (&mut step.level, &step.item_res),
        _ => return Ok(false),
    };
    if level.is_some() {
        return Ok(false);
    }
    match ctx.props.level(id, item_res) {
        Some(l) => *level = Some(l),
        None => return Ok(false),
    }
    ctx.dag.set_op(id, op)?;
    Ok(true)
}

/// Fuse a step with the step producing its context through a
/// projection that only renames the context columns.
pub fn step_merge<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<bool> {
    let dag = &*ctx.dag;
    let outer = match dag.op(id) {
        Some(Op::Step(step)) if !step.guided => step,
        _ => return Ok(false),
    };
    let (input, items) = match dag.op(outer.ctx).and_then(Op::as_proj) {
        Some((input, items)) if items.len() == 2 => (input, items),
        _ => return Ok(false),
    };
    let inner = match dag.op(input) {
        Some(Op::Step(step)) if !step.guided => step,
        _ => return Ok(false),
    };
    let maps = |new: &ColName, old: &ColName| items.iter().any(|i| i.new == *new && i.old == *old);
    if !maps(&outer.item, &inner.item_res) || !maps(&outer.iter, &inner.iter) {
        return Ok(false);
    }
    let merged = Step {
        doc: outer.doc,
        ctx: input,
        axis: outer.axis,
        test: outer.test.clone(),
        level: outer.level,
        iter: inner.iter.clone(),
        item: inner.item_res.clone(),
        item_res: inner.item_res.clone(),
        guided: false,
    };
    let cols = vec![
        ProjItem {
            new: outer.iter.clone(),
            old: inner.iter.clone(),
        },
        ProjItem {
            new: outer.item_res.clone(),
            old: inner.item_res.clone(),
        },
    ];
    let merged = ctx.dag.step(merged)?;
    ctx.dag.set_op(
        id,
        Op::Proj {
            input: merged,
            cols,
        },
    )?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Dag;
    use crate::op::{Axis, OpTy, StepJoin};
    use crate::rule::RuleSet;
    use crate::tests::{nat_rows, run_rules, step};
    use smol_str::SmolStr;

    // document table and fragment with (iter, item) context on it
    fn doc_ctx(dag: &mut Dag) -> (NodeID, NodeID) {
        let t1 = dag
            .lit_tbl(&["iter", "item"], nat_rows(&[&[1, 1], &[2, 1]]))
            .unwrap();
        let doc = dag.doc_tbl(t1, "iter", "item", "res").unwrap();
        let frag = dag.fragment(doc).unwrap();
        let ctx = dag
            .project(doc, vec![ProjItem::keep("iter"), ProjItem::new("item", "res")])
            .unwrap();
        (frag, ctx)
    }

    fn level_of(dag: &Dag, id: NodeID) -> Option<i32> {
        match dag.op(id) {
            Some(Op::Step(step)) => step.level,
            Some(Op::StepJoin(step)) => step.level,
            _ => None,
        }
    }

    #[test]
    fn test_step_level() {
        let mut dag = Dag::new();
        let (frag, ctx) = doc_ctx(&mut dag);
        let s1 = step(&mut dag, frag, ctx, Axis::Child, "r1");
        let sj = dag
            .step_join(StepJoin {
                doc: frag,
                input: ctx,
                axis: Axis::Attribute,
                test: SmolStr::new("id"),
                level: None,
                item: SmolStr::new("item"),
                item_res: SmolStr::new("r1"),
                guided: true,
            })
            .unwrap();
        let s2 = step(&mut dag, frag, ctx, Axis::Descendant, "r1");
        let u1 = dag.union(s1, s2).unwrap();
        let p = dag
            .project(sj, vec![ProjItem::keep("iter"), ProjItem::keep("r1")])
            .unwrap();
        let u2 = dag.union(u1, p).unwrap();
        let opt = run_rules(&mut dag, u2, RuleSet::STEP_LEVEL);
        assert_eq!(Some(1), level_of(&dag, s1));
        assert_eq!(Some(1), level_of(&dag, sj));
        // descendant level is unknown
        assert_eq!(None, level_of(&dag, s2));
        assert_eq!(RuleSet::empty(), opt.stats().fired_on(s2));
    }

    #[test]
    fn test_step_merge() {
        let mut dag = Dag::new();
        let (frag, ctx) = doc_ctx(&mut dag);
        let inner = step(&mut dag, frag, ctx, Axis::Child, "r1");
        let pr = dag
            .project(inner, vec![ProjItem::new("item", "r1"), ProjItem::keep("iter")])
            .unwrap();
        let outer = step(&mut dag, frag, pr, Axis::Descendant, "r2");
        let opt = run_rules(&mut dag, outer, RuleSet::STEP_MERGE | RuleSet::STEP_LEVEL);
        assert!(opt.stats().fired_on(outer).contains(RuleSet::STEP_MERGE));
        let (merged, cols) = dag.op(outer).and_then(Op::as_proj).unwrap();
        assert_eq!(
            &[ProjItem::keep("iter"), ProjItem::new("r2", "r1")][..],
            cols
        );
        match dag.op(merged) {
            Some(Op::Step(step)) => {
                assert_eq!(inner, step.ctx);
                assert_eq!(Axis::Descendant, step.axis);
                assert_eq!("r1", step.item.as_str());
                assert_eq!("r1", step.item_res.as_str());
            }
            other => panic!("unexpected {:?}", other),
        }
        // inner step got its level before merging
        assert_eq!(Some(1), level_of(&dag, inner));
        assert!(dag
            .schema(outer)
            .unwrap()
            .same_names(&["iter", "r2"].into_iter().collect()));
    }

    #[test]
    fn test_step_merge_needs_context_mapping() {
        let mut dag = Dag::new();
        let (frag, ctx) = doc_ctx(&mut dag);
        let inner = step(&mut dag, frag, ctx, Axis::Child, "r1");
        // iteration column is taken from the step result
        let pr = dag
            .project(inner, vec![ProjItem::new("item", "r1"), ProjItem::new("iter", "r1")])
            .unwrap();
        let outer = step(&mut dag, frag, pr, Axis::Child, "r2");
        let opt = run_rules(&mut dag, outer, RuleSet::STEP_MERGE);
        assert!(opt.stats().fired.is_empty());
        assert_eq!(OpTy::Step, dag.op(outer).unwrap().ty());
    }
}
