use crate::error::Result;
use crate::id::NodeID;
use crate::op::Op;
use crate::prop::PropOracle;
use crate::rule::RuleCtx;

/// Replace a difference with an empty table if all left values
/// occur in the right input.
///
/// Domain inclusion is checked per column, which only implies row
/// inclusion for single-column inputs.
pub fn diff_empty<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<bool> {
    let (left, right) = match ctx.dag.op(id) {
        Some(Op::Difference { left, right }) => (*left, *right),
        _ => return Ok(false),
    };
    let col = match ctx.dag.schema(id) {
        Some(schema) if schema.len() == 1 => match schema.get(0) {
            Some(col) => col.clone(),
            None => return Ok(false),
        },
        _ => return Ok(false),
    };
    if !ctx.props.col_subdom((left, col.as_str()), (right, col.as_str())) {
        return Ok(false);
    }
    ctx.dag.set_op(id, Op::EmptyTbl { cols: vec![col] })?;
    Ok(true)
}
