use crate::col::{ColName, ProjItem, Schema};
use crate::dag::Dag;
use crate::error::Result;
use crate::id::NodeID;
use crate::op::{Join, Op};
use crate::prop::PropOracle;
use crate::rule::pattern::{alias_all, chase_proj, keep_all};
use crate::rule::RuleCtx;

/// Eliminate one side of an equi-join.
///
/// Side S can be eliminated if every row of the other side finds
/// exactly one partner in S (key on join column of S, or duplicates
/// do not matter), and S outputs no required column other than
/// copies of its join column.
pub fn eqjoin_elim<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<bool> {
    let (j, ls, rs) = match eqjoin_parts(ctx.dag, id) {
        Some(parts) => parts,
        None => return Ok(false),
    };
    let props = ctx.props;
    let set = props.is_set(id);
    if (props.is_key(j.left, &[j.lcol.as_str()]) || set)
        && props.col_subdom((j.right, j.rcol.as_str()), (j.left, j.lcol.as_str()))
        && !side_required(props, id, j.left, &ls, &j.lcol)
    {
        let cols = alias_all(&ls, &j.rcol).chain(keep_all(&rs)).collect();
        ctx.dag.set_op(
            id,
            Op::Proj {
                input: j.right,
                cols,
            },
        )?;
        return Ok(true);
    }
    if (props.is_key(j.right, &[j.rcol.as_str()]) || set)
        && props.col_subdom((j.left, j.lcol.as_str()), (j.right, j.rcol.as_str()))
        && !side_required(props, id, j.right, &rs, &j.rcol)
    {
        let cols = keep_all(&ls).chain(alias_all(&rs, &j.lcol)).collect();
        ctx.dag.set_op(
            id,
            Op::Proj {
                input: j.left,
                cols,
            },
        )?;
        return Ok(true);
    }
    Ok(false)
}

/// Degrade an equi-join to a semi-join if one side only filters
/// the other side.
pub fn eqjoin_semijoin<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<bool> {
    let (j, ls, rs) = match eqjoin_parts(ctx.dag, id) {
        Some(parts) => parts,
        None => return Ok(false),
    };
    let props = ctx.props;
    let set = props.is_set(id);
    if (props.is_key(j.left, &[j.lcol.as_str()]) || set)
        && !side_required(props, id, j.left, &ls, &j.lcol)
    {
        let cols: Vec<ProjItem> = alias_all(&ls, &j.rcol).chain(keep_all(&rs)).collect();
        let input = filter_by(ctx.dag, j.right, &j.rcol, j.left, &j.lcol)?;
        ctx.dag.set_op(id, Op::Proj { input, cols })?;
        return Ok(true);
    }
    if (props.is_key(j.right, &[j.rcol.as_str()]) || set)
        && !side_required(props, id, j.right, &rs, &j.rcol)
    {
        let cols: Vec<ProjItem> = keep_all(&ls).chain(alias_all(&rs, &j.lcol)).collect();
        let input = filter_by(ctx.dag, j.left, &j.lcol, j.right, &j.rcol)?;
        ctx.dag.set_op(id, Op::Proj { input, cols })?;
        return Ok(true);
    }
    Ok(false)
}

/// Remove a semi-join whose join columns contain the same values.
pub fn semijoin_elim<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<bool> {
    let j = match ctx.dag.op(id) {
        Some(Op::Semijoin(j)) => j.clone(),
        _ => return Ok(false),
    };
    let props = ctx.props;
    let (l, r) = ((j.left, j.lcol.as_str()), (j.right, j.rcol.as_str()));
    if props.col_subdom(l, r) && props.col_subdom(r, l) {
        ctx.dag.set_op(id, Op::Dummy { input: j.left })?;
        return Ok(true);
    }
    Ok(false)
}

/// Fuse a semi-join with the duplicate elimination on its right side.
///
/// If left join column is a key and contains all right values, the
/// distinct values of the right side are exactly the left join column
/// of the semi-join result. So the semi-join reads the input of the
/// distinct directly, and the distinct node is rewritten as projection
/// of the semi-join.
pub fn semijoin_distinct<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<bool> {
    let dag = &*ctx.dag;
    let props = ctx.props;
    let j = match dag.op(id) {
        Some(Op::Semijoin(j)) => j.clone(),
        _ => return Ok(false),
    };
    if !props.is_key(j.left, &[j.lcol.as_str()])
        || !props.col_subdom((j.right, j.rcol.as_str()), (j.left, j.lcol.as_str()))
    {
        return Ok(false);
    }
    // nodes to be rewritten as projections of the semi-join, with
    // their output column
    let mut rewrites: Vec<(NodeID, ColName)> = Vec::with_capacity(2);
    let (input, rcol) = match dag.op(j.right) {
        Some(Op::Distinct { input }) if single_col(dag, j.right).is_some() => {
            rewrites.push((j.right, j.rcol.clone()));
            (*input, j.rcol.clone())
        }
        Some(Op::Proj { input: d, cols }) if cols.len() == 1 && cols[0].new == j.rcol => {
            let dcol = match (dag.op(*d), single_col(dag, *d)) {
                (Some(Op::Distinct { .. }), Some(dcol)) => dcol,
                _ => return Ok(false),
            };
            let x = match dag.op(*d) {
                Some(Op::Distinct { input }) => *input,
                _ => return Ok(false),
            };
            rewrites.push((j.right, j.rcol.clone()));
            rewrites.push((*d, dcol.clone()));
            (x, dcol)
        }
        _ => return Ok(false),
    };
    // rewritten nodes must not be inputs of the semi-join afterwards
    if rewrites.iter().any(|(n, _)| dag.reaches(j.left, *n)) {
        return Ok(false);
    }
    let semijoin = Op::Semijoin(Join {
        left: j.left,
        right: input,
        lcol: j.lcol.clone(),
        rcol,
    });
    let mut projs = Vec::with_capacity(rewrites.len());
    for (n, col) in rewrites {
        let proj = Op::Proj {
            input: id,
            cols: vec![ProjItem {
                new: col,
                old: j.lcol.clone(),
            }],
        };
        // validate all replacements before changing anything
        dag.derive_schema(&proj)?;
        projs.push((n, proj));
    }
    dag.derive_schema(&semijoin)?;
    ctx.dag.set_op(id, semijoin)?;
    for (n, proj) in projs {
        ctx.dag.set_op(n, proj)?;
    }
    Ok(true)
}

/// Remove cross product with single-row side that outputs no
/// required column.
pub fn cross_elim<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<bool> {
    let (left, right) = match ctx.dag.op(id) {
        Some(Op::Cross { left, right }) => (*left, *right),
        _ => return Ok(false),
    };
    let props = ctx.props;
    let input = if props.card(left) == Some(1) && props.icols_count(left) == 0 {
        right
    } else if props.card(right) == Some(1) && props.icols_count(right) == 0 {
        left
    } else {
        return Ok(false);
    };
    ctx.dag.set_op(id, Op::Dummy { input })?;
    Ok(true)
}

#[inline]
fn eqjoin_parts(dag: &Dag, id: NodeID) -> Option<(Join, Schema, Schema)> {
    match dag.op(id)? {
        Op::Eqjoin(j) => {
            let ls = dag.schema(j.left)?.clone();
            let rs = dag.schema(j.right)?.clone();
            Some((j.clone(), ls, rs))
        }
        _ => None,
    }
}

#[inline]
fn single_col(dag: &Dag, id: NodeID) -> Option<ColName> {
    match dag.schema(id) {
        Some(schema) if schema.len() == 1 => schema.get(0).cloned(),
        _ => None,
    }
}

/// Returns true if side of the join outputs a required column which
/// is not a copy of its join column.
fn side_required<P: PropOracle>(
    props: &P,
    id: NodeID,
    side: NodeID,
    schema: &Schema,
    jcol: &ColName,
) -> bool {
    let jname = props.unq_name(id, jcol);
    schema.iter().any(|c| {
        c != jcol
            && props.is_icol(id, c)
            && match (props.unq_name(side, c), jname) {
                (Some(a), Some(b)) => a != b,
                _ => true,
            }
    })
}

/// Keep rows of `input` whose join value occurs in `filter`.
/// If both come from the same column of the same node, the filter
/// is a no-op.
fn filter_by(
    dag: &mut Dag,
    input: NodeID,
    icol: &ColName,
    filter: NodeID,
    fcol: &ColName,
) -> Result<NodeID> {
    if chase_proj(dag, input, icol) == chase_proj(dag, filter, fcol) {
        return Ok(input);
    }
    dag.add(Op::Semijoin(Join {
        left: input,
        right: filter,
        lcol: icol.clone(),
        rcol: fcol.clone(),
    }))
}
