use crate::col::ProjItem;
use crate::error::{Error, Result};
use crate::id::NodeID;
use crate::op::Op;
use crate::prop::PropOracle;
use crate::rule::pattern::alias_all;
use crate::rule::RuleCtx;
use rela_datatype::Atom;
use std::cmp::Ordering;

/// Replace an attach whose constant column is the only required column
/// with a literal table of the same cardinality.
///
/// All other output columns are kept as aliases of the constant column,
/// their values are never read.
pub fn attach_lit<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<bool> {
    let (res, value) = match ctx.dag.op(id) {
        Some(Op::Attach { res, value, .. }) => (res.clone(), value.clone()),
        _ => return Ok(false),
    };
    let props = ctx.props;
    if props.icols_count(id) != 1 || !props.is_icol(id, &res) {
        return Ok(false);
    }
    let n = match props.card(id) {
        Some(n) if n > 0 => usize::try_from(n).map_err(|_| Error::ResourceExhausted)?,
        _ => return Ok(false),
    };
    let mut rows = Vec::new();
    rows.try_reserve(n)?;
    rows.extend(std::iter::repeat(vec![value]).take(n));
    let schema = ctx.dag.node(id)?.schema.clone();
    let lit = ctx.dag.add(Op::LitTbl {
        cols: vec![res.clone()],
        rows,
    })?;
    ctx.dag.set_op(
        id,
        Op::Proj {
            input: lit,
            cols: alias_all(&schema, &res).collect(),
        },
    )?;
    Ok(true)
}

/// Remove an attach that re-attaches the constant iteration value of
/// a step, or of the roots of a document table, below a single-column
/// projection.
pub fn attach_prune<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<bool> {
    let dag = &*ctx.dag;
    let props = ctx.props;
    let (input, res, value) = match dag.op(id) {
        Some(Op::Attach { input, res, value }) => (*input, res.clone(), value.clone()),
        _ => return Ok(false),
    };
    let (below, item) = match dag.op(input) {
        Some(Op::Proj { input, cols }) if cols.len() == 1 => (*input, cols[0].clone()),
        _ => return Ok(false),
    };
    let op = match dag.op(below) {
        Some(Op::Step(step)) => {
            if !const_eq(props.const_val(below, &step.iter), &value) || item.old != step.item_res {
                return Ok(false);
            }
            if res == step.iter && item.new == step.item_res {
                Op::Dummy { input: below }
            } else {
                Op::Proj {
                    input: below,
                    cols: vec![
                        ProjItem {
                            new: res,
                            old: step.iter.clone(),
                        },
                        item,
                    ],
                }
            }
        }
        Some(Op::Roots { input: doc }) => match dag.op(*doc) {
            Some(Op::DocTbl { iter, item_res, .. })
                if res == *iter
                    && item.new == *item_res
                    && item.old == *item_res
                    && const_eq(props.const_val(*doc, iter), &value) =>
            {
                Op::Dummy { input: below }
            }
            _ => return Ok(false),
        },
        _ => return Ok(false),
    };
    ctx.dag.set_op(id, op)?;
    Ok(true)
}

/// Constants are only compared if they are comparable.
#[inline]
fn const_eq(c: Option<&Atom>, value: &Atom) -> bool {
    c.and_then(|c| c.try_cmp(value)) == Some(Ordering::Equal)
}
