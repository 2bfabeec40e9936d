use crate::col::{ProjItem, SortItem};
use crate::error::{Result, ToResult};
use crate::id::NodeID;
use crate::op::Op;
use crate::prop::PropOracle;
use crate::rule::pattern::skip_proj;
use crate::rule::RuleCtx;
use rela_datatype::Atom;

/// Merge a rank with the nested rank its sort criteria refer to.
///
/// The dense rank of the inner criteria orders rows exactly as the
/// criteria themselves, so the inner rank column can be replaced by
/// the inner criteria at the same position.
pub fn rank_merge<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<bool> {
    let dag = &*ctx.dag;
    let (input, res, sortby) = match dag.op(id) {
        Some(Op::Rank {
            input,
            res,
            sortby,
        }) => (*input, res, sortby),
        _ => return Ok(false),
    };
    let th = match skip_proj(dag, input, false) {
        Some(th) => th,
        None => return Ok(false),
    };
    let (x, ires, isort) = match dag.op(th.node) {
        Some(Op::Rank {
            input,
            res,
            sortby,
        }) => (*input, res, sortby),
        _ => return Ok(false),
    };
    if ctx.props.is_icol(id, ires) {
        return Ok(false);
    }
    let mut refs = sortby.iter().enumerate().filter(|(_, si)| si.col == *ires);
    let pos = match (refs.next(), refs.next()) {
        (Some((pos, si)), None) if !si.desc => pos,
        _ => return Ok(false),
    };
    let mut merged: Vec<SortItem> = Vec::with_capacity(sortby.len() + isort.len() - 1);
    merged.extend_from_slice(&sortby[..pos]);
    merged.extend_from_slice(isort);
    merged.extend_from_slice(&sortby[pos + 1..]);
    let rank = Op::Rank {
        input: x,
        res: ires.clone(),
        sortby: merged,
    };
    // new rank generates the inner column name, which cannot collide
    // with columns below it, and is renamed back on top
    let cols: Vec<ProjItem> = dag
        .schema(id)
        .must_ok()?
        .iter()
        .map(|c| ProjItem {
            new: c.clone(),
            old: if c == res { ires.clone() } else { c.clone() },
        })
        .collect();
    let rank = ctx.dag.add(rank)?;
    ctx.dag.set_op(id, Op::Proj { input: rank, cols })?;
    Ok(true)
}

/// Number of a single row is always 1.
pub fn number_const<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<bool> {
    let (input, res) = match ctx.dag.op(id) {
        Some(Op::Number { input, res }) => (*input, res.clone()),
        _ => return Ok(false),
    };
    if ctx.props.card(id) != Some(1) {
        return Ok(false);
    }
    ctx.dag.set_op(
        id,
        Op::Attach {
            input,
            res,
            value: Atom::nat(1),
        },
    )?;
    Ok(true)
}
