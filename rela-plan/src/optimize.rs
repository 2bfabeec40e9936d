//! Driver of the peephole optimizer.
//!
//! Every node reachable from root is visited exactly once in post-order,
//! so inputs are rewritten before their parents. Subtrees created by a
//! rewrite are not visited again in the same pass.
use crate::dag::Dag;
use crate::error::Result;
use crate::icol::fix_icols;
use crate::id::NodeID;
use crate::prop::{infer_props, PropOracle};
use crate::rule::{self, RuleCtx, RuleSet};
use fnv::FnvHashMap;

/// Optimize the plan with all rules enabled, returns the new root.
#[inline]
pub fn optimize_algebra_plan(dag: &mut Dag, root: NodeID) -> Result<NodeID> {
    Optimizer::new(OptimizeOptions::default()).optimize_algebra_plan(dag, root)
}

#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    pub rules: RuleSet,
    /// Whether to remove unused columns after rewriting.
    pub post_pass: bool,
    /// Maximum number of nodes one pass can allocate.
    pub node_budget: Option<usize>,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        OptimizeOptions {
            rules: RuleSet::all(),
            post_pass: true,
            node_budget: None,
        }
    }
}

impl OptimizeOptions {
    #[inline]
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    #[inline]
    pub fn with_post_pass(mut self, post_pass: bool) -> Self {
        self.post_pass = post_pass;
        self
    }

    #[inline]
    pub fn with_node_budget(mut self, budget: usize) -> Self {
        self.node_budget = Some(budget);
        self
    }
}

/// Statistics of the last pass.
#[derive(Debug, Clone, Default)]
pub struct RewriteStats {
    /// Number of rule applications per node.
    pub visits: FnvHashMap<NodeID, u32>,
    /// Fired rules in order of application.
    pub fired: Vec<(NodeID, RuleSet)>,
}

impl RewriteStats {
    /// Returns all rules fired on given node.
    #[inline]
    pub fn fired_on(&self, id: NodeID) -> RuleSet {
        self.fired
            .iter()
            .filter(|(n, _)| *n == id)
            .fold(RuleSet::empty(), |acc, (_, rules)| acc | *rules)
    }

    #[inline]
    pub fn max_visits(&self) -> u32 {
        self.visits.values().copied().max().unwrap_or_default()
    }
}

pub struct Optimizer {
    opts: OptimizeOptions,
    stats: RewriteStats,
}

impl Optimizer {
    #[inline]
    pub fn new(opts: OptimizeOptions) -> Self {
        Optimizer {
            opts,
            stats: RewriteStats::default(),
        }
    }

    #[inline]
    pub fn stats(&self) -> &RewriteStats {
        &self.stats
    }

    /// Infer properties, rewrite the plan and run the post-pass
    /// if enabled. Returns the new root.
    pub fn optimize_algebra_plan(&mut self, dag: &mut Dag, root: NodeID) -> Result<NodeID> {
        let props = infer_props(dag, root)?;
        let root = self.optimize(dag, root, &props)?;
        if self.opts.post_pass {
            fix_icols(dag, root)
        } else {
            Ok(root)
        }
    }

    /// Rewrite the plan with given properties.
    ///
    /// On error, the node being rewritten keeps its content, while
    /// rewrites of other nodes done before stay in effect.
    pub fn optimize<P: PropOracle>(
        &mut self,
        dag: &mut Dag,
        root: NodeID,
        props: &P,
    ) -> Result<NodeID> {
        self.stats = RewriteStats::default();
        dag.node(root)?;
        let limit = dag.limit();
        if let Some(budget) = self.opts.node_budget {
            let cap = dag.len().saturating_add(budget);
            dag.set_limit(Some(limit.map_or(cap, |l| l.min(cap))));
        }
        let res = self.walk(dag, root, props);
        dag.reset_visited();
        dag.set_limit(limit);
        res.map(|_| root)
    }

    fn walk<P: PropOracle>(&mut self, dag: &mut Dag, root: NodeID, props: &P) -> Result<()> {
        let mut stack: Vec<(NodeID, usize)> = Vec::new();
        if dag.mark_visited(root) {
            stack.push((root, 0));
        }
        while let Some(&(id, idx)) = stack.last() {
            match dag.op(id).and_then(|op| op.input(idx)) {
                Some(child) => {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    if dag.mark_visited(child) {
                        stack.push((child, 0));
                    }
                }
                None => {
                    stack.pop();
                    *self.stats.visits.entry(id).or_default() += 1;
                    log::trace!("Apply rules on node {}", id);
                    let mut ctx = RuleCtx::new(dag, props, self.opts.rules);
                    let fired = rule::apply(&mut ctx, id)?;
                    if !fired.is_empty() {
                        log::debug!("Rule {:?} fired on node {}", fired, id);
                        self.stats.fired.push((id, fired));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::col::ProjItem;
    use crate::error::Error;
    use crate::op::{Op, OpTy};
    use crate::tests::{nat_rows, print_plan};
    use rela_datatype::Atom;

    #[test]
    fn test_optimize_cross_elim() {
        let mut dag = Dag::new();
        let l = dag
            .lit_tbl(&["a"], nat_rows(&[&[1], &[2], &[3]]))
            .unwrap();
        let r = dag.lit_tbl(&["b"], nat_rows(&[&[7]])).unwrap();
        let c = dag.cross(l, r).unwrap();
        let p = dag.project(c, vec![ProjItem::keep("a")]).unwrap();
        let root = optimize_algebra_plan(&mut dag, p).unwrap();
        print_plan(&dag, root);
        assert_eq!(p, root);
        assert_eq!(vec![OpTy::Proj, OpTy::LitTbl], dag.shape(root));
        assert_eq!(Some(l), dag.op(root).and_then(Op::left));
    }

    #[test]
    fn test_optimize_single_visit() {
        let mut dag = Dag::new();
        let t1 = dag.lit_tbl(&["a"], nat_rows(&[&[1]])).unwrap();
        let n = dag.number(t1, "n").unwrap();
        // shared by both sides of the union and the cross product
        let p1 = dag.project(n, vec![ProjItem::keep("n")]).unwrap();
        let p2 = dag.project(n, vec![ProjItem::keep("n")]).unwrap();
        let u = dag.union(p1, p2).unwrap();
        let mut opt = Optimizer::new(OptimizeOptions::default().with_post_pass(false));
        opt.optimize_algebra_plan(&mut dag, u).unwrap();
        assert_eq!(1, opt.stats().max_visits());
        assert_eq!(dag.post_order(u).len(), opt.stats().visits.len());
        assert_eq!(RuleSet::NUMBER_CONST, opt.stats().fired_on(n));
        // both parents observe the rewritten node
        assert_eq!(Some(n), dag.op(p1).and_then(Op::left));
        assert_eq!(Some(n), dag.op(p2).and_then(Op::left));
        assert_eq!(OpTy::Attach, dag.op(n).unwrap().ty());
        assert!(!dag.is_visited(n));
    }

    #[test]
    fn test_optimize_node_budget() {
        let mut dag = Dag::new();
        let t1 = dag
            .lit_tbl(&["a"], nat_rows(&[&[1], &[2], &[3]]))
            .unwrap();
        let at = dag.attach(t1, "c", Atom::nat(7)).unwrap();
        let p = dag.project(at, vec![ProjItem::keep("c")]).unwrap();
        let before = dag.op(at).cloned();
        let mut opt = Optimizer::new(OptimizeOptions::default().with_node_budget(0));
        let res = opt.optimize_algebra_plan(&mut dag, p);
        assert!(matches!(res, Err(Error::ResourceExhausted)));
        assert_eq!(before.as_ref(), dag.op(at));
        assert!(!dag.is_visited(at));
        assert_eq!(None, dag.limit());
        // enough budget for the literal table
        let mut opt = Optimizer::new(OptimizeOptions::default().with_node_budget(1));
        opt.optimize_algebra_plan(&mut dag, p).unwrap();
        assert_eq!(RuleSet::ATTACH_LIT, opt.stats().fired_on(at));
    }

    #[test]
    fn test_optimize_disabled_rules() {
        let mut dag = Dag::new();
        let t1 = dag.lit_tbl(&["a"], nat_rows(&[&[1]])).unwrap();
        let n = dag.number(t1, "n").unwrap();
        let mut opt = Optimizer::new(
            OptimizeOptions::default()
                .with_rules(RuleSet::all() - RuleSet::NUMBER_CONST)
                .with_post_pass(false),
        );
        let root = opt.optimize_algebra_plan(&mut dag, n).unwrap();
        assert_eq!(n, root);
        assert!(opt.stats().fired.is_empty());
        assert_eq!(OpTy::Number, dag.op(n).unwrap().ty());
    }
}
