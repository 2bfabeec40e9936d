use crate::col::ProjItem;
use crate::error::Result;
use crate::id::NodeID;
use crate::op::Op;
use crate::prop::PropOracle;
use crate::rule::RuleCtx;
use rela_datatype::Atom;

/// A single serialized item is always at position 1.
pub fn serialize_pos<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<bool> {
    let dag = &*ctx.dag;
    let (frag, input, pos, item) = match dag.op(id) {
        Some(Op::Serialize {
            frag,
            input,
            pos,
            item,
        }) => (*frag, *input, pos.clone(), item.clone()),
        _ => return Ok(false),
    };
    if ctx.props.card(input) != Some(1) {
        return Ok(false);
    }
    // already wrapped
    if let Some(Op::Attach {
        input: below,
        res,
        value: Atom::Nat(1),
    }) = dag.op(input)
    {
        if *res == pos {
            if let Some((_, [only])) = dag.op(*below).and_then(Op::as_proj) {
                if only.new == item && only.old == item {
                    return Ok(false);
                }
            }
        }
    }
    let proj = ctx.dag.add(Op::Proj {
        input,
        cols: vec![ProjItem {
            new: item.clone(),
            old: item.clone(),
        }],
    })?;
    let input = ctx.dag.add(Op::Attach {
        input: proj,
        res: pos.clone(),
        value: Atom::nat(1),
    })?;
    ctx.dag.set_op(
        id,
        Op::Serialize {
            frag,
            input,
            pos,
            item,
        },
    )?;
    Ok(true)
}

/// Remove the fragment bookkeeping of a constructor wrapped by
/// a function call.
///
/// ```text
///        fcns
///       /    \
///   content   ...
///   /     \
/// frag_union  attach
///  /    \        |
/// empty  frag  roots
///          \   /
///          twig
/// ```
///
/// The wrapper reads the input of the twig directly.
pub fn fcns_unwrap<P: PropOracle>(ctx: &mut RuleCtx<'_, P>, id: NodeID) -> Result<bool> {
    let dag = &*ctx.dag;
    let props = ctx.props;
    let (content, right) = match dag.op(id) {
        Some(Op::Fcns { left, right }) => (*left, *right),
        _ => return Ok(false),
    };
    let (fu, attach, citer, citem) = match dag.op(content) {
        Some(Op::Content {
            frag,
            input,
            iter,
            item,
            ..
        }) => (*frag, *input, iter, item),
        _ => return Ok(false),
    };
    let roots = match dag.op(attach) {
        Some(Op::Attach { input, .. }) => *input,
        _ => return Ok(false),
    };
    let twig = match dag.op(roots) {
        Some(Op::Roots { input }) => *input,
        _ => return Ok(false),
    };
    let twig_input = match dag.op(twig) {
        Some(Op::Twig { input, iter, item }) if iter == citer && item == citem => *input,
        _ => return Ok(false),
    };
    let frag = match dag.op(fu) {
        Some(Op::FragUnion { left, right }) if matches!(dag.op(*left), Some(Op::EmptyFrag)) => {
            *right
        }
        _ => return Ok(false),
    };
    match dag.op(frag) {
        Some(Op::Fragment { input }) if *input == twig => (),
        _ => return Ok(false),
    }
    if props.ref_count(attach) != 1 || props.ref_count(roots) != 1 {
        return Ok(false);
    }
    match (dag.schema(twig_input), dag.schema(id)) {
        (Some(a), Some(b)) if a.same_names(b) => (),
        _ => return Ok(false),
    }
    ctx.dag.set_op(
        id,
        Op::Fcns {
            left: twig_input,
            right,
        },
    )?;
    Ok(true)
}
