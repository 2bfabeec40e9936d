//! This module defines the peephole rules that rewrite a single node
//! of the DAG, conditioned on the properties of the node and its close
//! neighborhood. Every rule either rewrites the node completely or
//! leaves it untouched.
//!
//! Rules never free nodes: a rewrite builds the replacement subtree as
//! new nodes and then overwrites the content of the current node, so
//! all parents of the node observe the replacement.
use crate::dag::Dag;
use crate::error::Result;
use crate::id::NodeID;
use crate::op::OpTy;
use crate::prop::PropOracle;
use bitflags::bitflags;

pub mod attach;
pub mod frag;
pub mod join;
pub mod logic;
pub mod pattern;
pub mod rank;
pub mod select;
pub mod setop;
pub mod step;

bitflags! {
    /// Set of rules, used to enable rules and report fired ones.
    pub struct RuleSet: u32 {
        const SERIALIZE_POS = 0x0001; // attach position to single-row result
        const ATTACH_LIT = 0x0002; // constant-only attach to literal table
        const ATTACH_PRUNE = 0x0004; // remove attach over constant step iteration
        const EQJOIN_ELIM = 0x0008;
        const EQJOIN_SEMIJOIN = 0x0010;
        const SEMIJOIN_ELIM = 0x0020;
        const SEMIJOIN_DISTINCT = 0x0040;
        const CROSS_ELIM = 0x0080;
        const SELECT_OR = 0x0100;
        const DIFF_EMPTY = 0x0200;
        const AND_SPLIT = 0x0400;
        const RANK_MERGE = 0x0800;
        const NUMBER_CONST = 0x1000;
        const STEP_LEVEL = 0x2000;
        const STEP_MERGE = 0x4000;
        const FCNS_UNWRAP = 0x8000;
    }
}

/// Context shared by all rules during one pass.
pub struct RuleCtx<'a, P> {
    pub dag: &'a mut Dag,
    pub props: &'a P,
    pub rules: RuleSet,
}

impl<'a, P: PropOracle> RuleCtx<'a, P> {
    #[inline]
    pub fn new(dag: &'a mut Dag, props: &'a P, rules: RuleSet) -> Self {
        RuleCtx { dag, props, rules }
    }

    #[inline]
    fn enabled(&self, rule: RuleSet) -> bool {
        self.rules.contains(rule)
    }
}

/// Apply the rules of the node kind to given node.
/// Returns the fired rules, empty if the node is unchanged.
///
/// Only resource errors are returned. Other errors raised while
/// building the replacement mean the rule does not match.
pub fn apply<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<RuleSet> {
    let ty = match ctx.dag.op(id) {
        Some(op) => op.ty(),
        None => return Ok(RuleSet::empty()),
    };
    macro_rules! try_rule {
        ($rule:expr, $f:expr) => {
            if ctx.enabled($rule) && fired(id, $rule, $f(ctx, id))? {
                return Ok($rule);
            }
        };
    }
    match ty {
        OpTy::Serialize => try_rule!(RuleSet::SERIALIZE_POS, frag::serialize_pos),
        OpTy::Attach => {
            try_rule!(RuleSet::ATTACH_LIT, attach::attach_lit);
            try_rule!(RuleSet::ATTACH_PRUNE, attach::attach_prune);
        }
        OpTy::Eqjoin => {
            try_rule!(RuleSet::EQJOIN_ELIM, join::eqjoin_elim);
            try_rule!(RuleSet::EQJOIN_SEMIJOIN, join::eqjoin_semijoin);
        }
        OpTy::Semijoin => {
            try_rule!(RuleSet::SEMIJOIN_ELIM, join::semijoin_elim);
            try_rule!(RuleSet::SEMIJOIN_DISTINCT, join::semijoin_distinct);
        }
        OpTy::Cross => try_rule!(RuleSet::CROSS_ELIM, join::cross_elim),
        OpTy::Select => try_rule!(RuleSet::SELECT_OR, select::select_or),
        OpTy::Difference => try_rule!(RuleSet::DIFF_EMPTY, setop::diff_empty),
        OpTy::BoolAnd => try_rule!(RuleSet::AND_SPLIT, logic::and_split),
        OpTy::Rank => try_rule!(RuleSet::RANK_MERGE, rank::rank_merge),
        OpTy::Number => try_rule!(RuleSet::NUMBER_CONST, rank::number_const),
        OpTy::Step | OpTy::StepJoin => {
            // level resolution does not change the shape, so merging
            // is still tried on the same node
            let mut res = RuleSet::empty();
            if ctx.enabled(RuleSet::STEP_LEVEL)
                && fired(id, RuleSet::STEP_LEVEL, step::step_level(ctx, id))?
            {
                res |= RuleSet::STEP_LEVEL;
            }
            if ctx.enabled(RuleSet::STEP_MERGE)
                && fired(id, RuleSet::STEP_MERGE, step::step_merge(ctx, id))?
            {
                res |= RuleSet::STEP_MERGE;
            }
            return Ok(res);
        }
        OpTy::Fcns => try_rule!(RuleSet::FCNS_UNWRAP, frag::fcns_unwrap),
        _ => (),
    }
    Ok(RuleSet::empty())
}

#[inline]
fn fired(id: NodeID, rule: RuleSet, res: Result<bool>) -> Result<bool> {
    match res {
        Ok(fired) => Ok(fired),
        Err(e) if e.is_resource() => Err(e),
        Err(e) => {
            log::debug!("Rule {:?} does not match node {}: {}", rule, id, e);
            Ok(false)
        }
    }
}
