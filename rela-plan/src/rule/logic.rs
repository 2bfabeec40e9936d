use crate::error::Result;
use crate::id::NodeID;
use crate::op::{Binary, Op};
use crate::prop::PropOracle;
use crate::rule::RuleCtx;
use rela_datatype::Atom;

/// Split a conjunction whose result is required to be true into
/// two selections, each filtering on one operand.
pub fn and_split<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<bool> {
    let Binary {
        input,
        res,
        lcol,
        rcol,
    } = match ctx.dag.op(id) {
        Some(Op::BoolAnd(b)) => b.clone(),
        _ => return Ok(false),
    };
    if ctx.props.req_val(id, &res) != Some(true) || !ctx.props.is_set(id) {
        return Ok(false);
    }
    let s1 = ctx.dag.add(Op::Select { input, col: lcol })?;
    let s2 = ctx.dag.add(Op::Select {
        input: s1,
        col: rcol,
    })?;
    ctx.dag.set_op(
        id,
        Op::Attach {
            input: s2,
            res,
            value: Atom::bool(true),
        },
    )?;
    Ok(true)
}
