//! Arena of algebra operators.
//!
//! All nodes of one plan live in a single `Dag` and refer to each other
//! by `NodeID`. Rewriting a node overwrites its slot in the arena, so every
//! parent holding the id observes the new content. Nodes are never freed
//! individually, the whole arena is dropped with the plan.
use crate::col::{ColName, ProjItem, Schema, SortItem};
use crate::error::{Error, Result};
use crate::id::NodeID;
use crate::op::{Binary, Join, Op, OpTy, Step, StepJoin};
use rela_datatype::Atom;
use smol_str::SmolStr;
use std::ops::ControlFlow;

#[derive(Debug, Clone)]
pub struct Node {
    pub op: Op,
    pub schema: Schema,
    visited: bool,
}

impl Node {
    #[inline]
    pub fn is_visited(&self) -> bool {
        self.visited
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dag {
    nodes: Vec<Node>,
    // maximum number of nodes the arena may hold
    limit: Option<usize>,
}

impl Dag {
    #[inline]
    pub fn new() -> Self {
        Dag::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn get(&self, id: NodeID) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    #[inline]
    pub fn node(&self, id: NodeID) -> Result<&Node> {
        self.get(id).ok_or(Error::NodeNotFound(id))
    }

    #[inline]
    pub fn op(&self, id: NodeID) -> Option<&Op> {
        self.get(id).map(|n| &n.op)
    }

    #[inline]
    pub fn schema(&self, id: NodeID) -> Option<&Schema> {
        self.get(id).map(|n| &n.schema)
    }

    /// Returns current node limit of the arena.
    #[inline]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Set maximum number of nodes the arena can hold.
    /// Allocation beyond the limit fails with resource error.
    #[inline]
    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
    }

    /// Add a new operator into the arena, returns its id.
    /// Schema of the operator is derived and validated against its inputs.
    pub fn add(&mut self, op: Op) -> Result<NodeID> {
        let schema = self.derive_schema(&op)?;
        if let Some(limit) = self.limit {
            if self.nodes.len() >= limit {
                return Err(Error::ResourceExhausted);
            }
        }
        self.nodes.try_reserve(1)?;
        let id = NodeID::from(self.nodes.len() as u32);
        self.nodes.push(Node {
            op,
            schema,
            visited: false,
        });
        Ok(id)
    }

    /// Replace content of given node in place.
    ///
    /// The identity of the node is kept, so all parents observe the
    /// new content. Schema is derived before any change is made, so
    /// on error the node is left untouched.
    pub fn set_op(&mut self, id: NodeID, op: Op) -> Result<()> {
        let schema = self.derive_schema(&op)?;
        let node = self.nodes.get_mut(id.index()).ok_or(Error::NodeNotFound(id))?;
        node.op = op;
        node.schema = schema;
        Ok(())
    }

    /// Re-derive schema of given node from its current inputs.
    pub fn refresh_schema(&mut self, id: NodeID) -> Result<()> {
        let schema = self.derive_schema(&self.node(id)?.op)?;
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.schema = schema;
        }
        Ok(())
    }

    /// Mark node as visited, returns false if it was already visited
    /// or does not exist.
    #[inline]
    pub fn mark_visited(&mut self, id: NodeID) -> bool {
        match self.nodes.get_mut(id.index()) {
            Some(node) if !node.visited => {
                node.visited = true;
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn is_visited(&self, id: NodeID) -> bool {
        self.get(id).map(Node::is_visited).unwrap_or_default()
    }

    #[inline]
    pub fn reset_visited(&mut self) {
        for node in &mut self.nodes {
            node.visited = false;
        }
    }

    /// Returns all nodes reachable from root, each exactly once,
    /// inputs always before their parents.
    pub fn post_order(&self, root: NodeID) -> Vec<NodeID> {
        let mut seen = vec![false; self.nodes.len()];
        let mut res = Vec::new();
        let mut stack: Vec<(NodeID, usize)> = Vec::new();
        if let Some(s) = seen.get_mut(root.index()) {
            *s = true;
            stack.push((root, 0));
        }
        while let Some(&(id, idx)) = stack.last() {
            match self.op(id).and_then(|op| op.input(idx)) {
                Some(child) => {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    if let Some(s) = seen.get_mut(child.index()) {
                        if !*s {
                            *s = true;
                            stack.push((child, 0));
                        }
                    }
                }
                None => {
                    stack.pop();
                    res.push(id);
                }
            }
        }
        res
    }

    /// Returns true if `target` is `from` itself or one of its descendants.
    pub fn reaches(&self, from: NodeID, target: NodeID) -> bool {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            match seen.get_mut(id.index()) {
                Some(s) if !*s => *s = true,
                _ => continue,
            }
            if let Some(op) = self.op(id) {
                stack.extend(op.inputs());
            }
        }
        false
    }

    /// Walk the DAG from root in depth-first order, shared nodes are
    /// entered once per reference. Visitor decides whether to descend.
    pub fn walk<V: DagVisitor>(&self, root: NodeID, visitor: &mut V) -> ControlFlow<V::Break> {
        let mut stack: Vec<(NodeID, usize)> = Vec::new();
        if visitor.enter(self, root)? {
            stack.push((root, 0));
        } else {
            return visitor.leave(self, root);
        }
        while let Some(&(id, idx)) = stack.last() {
            match self.op(id).and_then(|op| op.input(idx)) {
                Some(child) => {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    if visitor.enter(self, child)? {
                        stack.push((child, 0));
                    } else {
                        visitor.leave(self, child)?
                    }
                }
                None => {
                    stack.pop();
                    visitor.leave(self, id)?
                }
            }
        }
        ControlFlow::Continue(())
    }

    /// Returns operator types of the plan in pre-order, shared nodes
    /// are expanded at every reference.
    pub fn shape(&self, root: NodeID) -> Vec<OpTy> {
        let mut res = Vec::new();
        let _ = self.walk(root, &mut preorder(|dag: &Dag, id| {
            if let Some(op) = dag.op(id) {
                res.push(op.ty())
            }
        }));
        res
    }

    /// Derive output schema of the operator, validating column references
    /// against schemas of its inputs.
    pub fn derive_schema(&self, op: &Op) -> Result<Schema> {
        let ty = op.ty();
        let schema = match op {
            Op::LitTbl { cols, rows } => {
                for row in rows {
                    if row.len() != cols.len() {
                        return Err(Error::RowWidthMismatch {
                            expected: cols.len(),
                            found: row.len(),
                        });
                    }
                }
                new_schema(cols.iter().cloned(), ty)?
            }
            Op::EmptyTbl { cols } => new_schema(cols.iter().cloned(), ty)?,
            Op::Attach { input, res, .. } | Op::Number { input, res } => {
                extend(self.input_schema(*input)?, res, ty)?
            }
            Op::Proj { input, cols } => {
                if cols.is_empty() {
                    return Err(Error::EmptyProjection);
                }
                let src = self.input_schema(*input)?;
                for item in cols {
                    require(src, &item.old, ty)?;
                }
                new_schema(cols.iter().map(|item| item.new.clone()), ty)?
            }
            Op::Select { input, col } => {
                let src = self.input_schema(*input)?;
                require(src, col, ty)?;
                src.clone()
            }
            Op::Eqjoin(Join {
                left,
                right,
                lcol,
                rcol,
            }) => {
                let (l, r) = (self.input_schema(*left)?, self.input_schema(*right)?);
                require(l, lcol, ty)?;
                require(r, rcol, ty)?;
                concat(l, r, ty)?
            }
            Op::Semijoin(Join {
                left,
                right,
                lcol,
                rcol,
            }) => {
                let (l, r) = (self.input_schema(*left)?, self.input_schema(*right)?);
                require(l, lcol, ty)?;
                require(r, rcol, ty)?;
                l.clone()
            }
            Op::Cross { left, right } => {
                concat(self.input_schema(*left)?, self.input_schema(*right)?, ty)?
            }
            Op::Distinct { input } | Op::Roots { input } | Op::Dummy { input } => {
                self.input_schema(*input)?.clone()
            }
            Op::Union { left, right } | Op::Difference { left, right } => {
                let (l, r) = (self.input_schema(*left)?, self.input_schema(*right)?);
                if !l.same_names(r) {
                    return Err(Error::SchemaMismatch(ty));
                }
                l.clone()
            }
            Op::BoolAnd(Binary {
                input,
                res,
                lcol,
                rcol,
            })
            | Op::BoolOr(Binary {
                input,
                res,
                lcol,
                rcol,
            }) => {
                let src = self.input_schema(*input)?;
                require(src, lcol, ty)?;
                require(src, rcol, ty)?;
                extend(src, res, ty)?
            }
            Op::Rank { input, res, sortby } => {
                let src = self.input_schema(*input)?;
                for si in sortby {
                    require(src, &si.col, ty)?;
                }
                extend(src, res, ty)?
            }
            Op::Step(step) => {
                self.input_schema(step.doc)?;
                let ctx = self.input_schema(step.ctx)?;
                require(ctx, &step.iter, ty)?;
                require(ctx, &step.item, ty)?;
                new_schema([step.iter.clone(), step.item_res.clone()], ty)?
            }
            Op::StepJoin(step) => {
                self.input_schema(step.doc)?;
                let src = self.input_schema(step.input)?;
                require(src, &step.item, ty)?;
                extend(src, &step.item_res, ty)?
            }
            Op::DocTbl {
                input,
                iter,
                item,
                item_res,
            } => {
                let src = self.input_schema(*input)?;
                require(src, iter, ty)?;
                require(src, item, ty)?;
                new_schema([iter.clone(), item_res.clone()], ty)?
            }
            Op::Fragment { input } => {
                self.input_schema(*input)?;
                Schema::new()
            }
            Op::FragUnion { left, right } => {
                self.input_schema(*left)?;
                self.input_schema(*right)?;
                Schema::new()
            }
            Op::EmptyFrag | Op::Nil => Schema::new(),
            Op::Twig { input, iter, item } => {
                let src = self.input_schema(*input)?;
                require(src, iter, ty)?;
                require(src, item, ty)?;
                new_schema([iter.clone(), item.clone()], ty)?
            }
            Op::Content {
                frag,
                input,
                iter,
                pos,
                item,
            } => {
                self.input_schema(*frag)?;
                let src = self.input_schema(*input)?;
                require(src, iter, ty)?;
                require(src, pos, ty)?;
                require(src, item, ty)?;
                new_schema([iter.clone(), item.clone()], ty)?
            }
            Op::Fcns { left, right } => {
                self.input_schema(*right)?;
                self.input_schema(*left)?.clone()
            }
            Op::Serialize {
                frag,
                input,
                pos,
                item,
            } => {
                self.input_schema(*frag)?;
                let src = self.input_schema(*input)?;
                require(src, pos, ty)?;
                require(src, item, ty)?;
                new_schema([pos.clone(), item.clone()], ty)?
            }
        };
        Ok(schema)
    }

    #[inline]
    fn input_schema(&self, id: NodeID) -> Result<&Schema> {
        self.schema(id).ok_or(Error::NodeNotFound(id))
    }
}

/* Constructors of all operators */

impl Dag {
    #[inline]
    pub fn lit_tbl(&mut self, cols: &[&str], rows: Vec<Vec<Atom>>) -> Result<NodeID> {
        self.add(Op::LitTbl {
            cols: names(cols),
            rows,
        })
    }

    #[inline]
    pub fn empty_tbl(&mut self, cols: &[&str]) -> Result<NodeID> {
        self.add(Op::EmptyTbl { cols: names(cols) })
    }

    #[inline]
    pub fn attach(&mut self, input: NodeID, res: &str, value: Atom) -> Result<NodeID> {
        self.add(Op::Attach {
            input,
            res: SmolStr::new(res),
            value,
        })
    }

    #[inline]
    pub fn project(&mut self, input: NodeID, cols: Vec<ProjItem>) -> Result<NodeID> {
        self.add(Op::Proj { input, cols })
    }

    #[inline]
    pub fn select(&mut self, input: NodeID, col: &str) -> Result<NodeID> {
        self.add(Op::Select {
            input,
            col: SmolStr::new(col),
        })
    }

    #[inline]
    pub fn eqjoin(&mut self, left: NodeID, right: NodeID, lcol: &str, rcol: &str) -> Result<NodeID> {
        self.add(Op::Eqjoin(Join {
            left,
            right,
            lcol: SmolStr::new(lcol),
            rcol: SmolStr::new(rcol),
        }))
    }

    #[inline]
    pub fn semijoin(
        &mut self,
        left: NodeID,
        right: NodeID,
        lcol: &str,
        rcol: &str,
    ) -> Result<NodeID> {
        self.add(Op::Semijoin(Join {
            left,
            right,
            lcol: SmolStr::new(lcol),
            rcol: SmolStr::new(rcol),
        }))
    }

    #[inline]
    pub fn cross(&mut self, left: NodeID, right: NodeID) -> Result<NodeID> {
        self.add(Op::Cross { left, right })
    }

    #[inline]
    pub fn distinct(&mut self, input: NodeID) -> Result<NodeID> {
        self.add(Op::Distinct { input })
    }

    #[inline]
    pub fn union(&mut self, left: NodeID, right: NodeID) -> Result<NodeID> {
        self.add(Op::Union { left, right })
    }

    #[inline]
    pub fn difference(&mut self, left: NodeID, right: NodeID) -> Result<NodeID> {
        self.add(Op::Difference { left, right })
    }

    #[inline]
    pub fn bool_and(&mut self, input: NodeID, res: &str, lcol: &str, rcol: &str) -> Result<NodeID> {
        self.add(Op::BoolAnd(binary(input, res, lcol, rcol)))
    }

    #[inline]
    pub fn bool_or(&mut self, input: NodeID, res: &str, lcol: &str, rcol: &str) -> Result<NodeID> {
        self.add(Op::BoolOr(binary(input, res, lcol, rcol)))
    }

    #[inline]
    pub fn rank(&mut self, input: NodeID, res: &str, sortby: Vec<SortItem>) -> Result<NodeID> {
        self.add(Op::Rank {
            input,
            res: SmolStr::new(res),
            sortby,
        })
    }

    #[inline]
    pub fn number(&mut self, input: NodeID, res: &str) -> Result<NodeID> {
        self.add(Op::Number {
            input,
            res: SmolStr::new(res),
        })
    }

    #[inline]
    pub fn step(&mut self, step: Step) -> Result<NodeID> {
        self.add(Op::Step(Box::new(step)))
    }

    #[inline]
    pub fn step_join(&mut self, step: StepJoin) -> Result<NodeID> {
        self.add(Op::StepJoin(Box::new(step)))
    }

    #[inline]
    pub fn doc_tbl(&mut self, input: NodeID, iter: &str, item: &str, item_res: &str) -> Result<NodeID> {
        self.add(Op::DocTbl {
            input,
            iter: SmolStr::new(iter),
            item: SmolStr::new(item),
            item_res: SmolStr::new(item_res),
        })
    }

    #[inline]
    pub fn roots(&mut self, input: NodeID) -> Result<NodeID> {
        self.add(Op::Roots { input })
    }

    #[inline]
    pub fn fragment(&mut self, input: NodeID) -> Result<NodeID> {
        self.add(Op::Fragment { input })
    }

    #[inline]
    pub fn empty_frag(&mut self) -> Result<NodeID> {
        self.add(Op::EmptyFrag)
    }

    #[inline]
    pub fn frag_union(&mut self, left: NodeID, right: NodeID) -> Result<NodeID> {
        self.add(Op::FragUnion { left, right })
    }

    #[inline]
    pub fn twig(&mut self, input: NodeID, iter: &str, item: &str) -> Result<NodeID> {
        self.add(Op::Twig {
            input,
            iter: SmolStr::new(iter),
            item: SmolStr::new(item),
        })
    }

    #[inline]
    pub fn content(
        &mut self,
        frag: NodeID,
        input: NodeID,
        iter: &str,
        pos: &str,
        item: &str,
    ) -> Result<NodeID> {
        self.add(Op::Content {
            frag,
            input,
            iter: SmolStr::new(iter),
            pos: SmolStr::new(pos),
            item: SmolStr::new(item),
        })
    }

    #[inline]
    pub fn fcns(&mut self, left: NodeID, right: NodeID) -> Result<NodeID> {
        self.add(Op::Fcns { left, right })
    }

    #[inline]
    pub fn nil(&mut self) -> Result<NodeID> {
        self.add(Op::Nil)
    }

    #[inline]
    pub fn serialize(&mut self, frag: NodeID, input: NodeID, pos: &str, item: &str) -> Result<NodeID> {
        self.add(Op::Serialize {
            frag,
            input,
            pos: SmolStr::new(pos),
            item: SmolStr::new(item),
        })
    }

    #[inline]
    pub fn dummy(&mut self, input: NodeID) -> Result<NodeID> {
        self.add(Op::Dummy { input })
    }
}

pub trait DagVisitor {
    type Break;

    /// Returns true if the inputs of the node should be visited.
    #[inline]
    fn enter(&mut self, _dag: &Dag, _id: NodeID) -> ControlFlow<Self::Break, bool> {
        ControlFlow::Continue(true)
    }

    #[inline]
    fn leave(&mut self, _dag: &Dag, _id: NodeID) -> ControlFlow<Self::Break> {
        ControlFlow::Continue(())
    }
}

/// Helper function to generate a visitor to
/// traverse the DAG in preorder.
pub fn preorder<F: FnMut(&Dag, NodeID)>(f: F) -> impl DagVisitor {
    struct Preorder<F>(F);
    impl<F: FnMut(&Dag, NodeID)> DagVisitor for Preorder<F> {
        type Break = ();
        #[inline]
        fn enter(&mut self, dag: &Dag, id: NodeID) -> ControlFlow<(), bool> {
            (self.0)(dag, id);
            ControlFlow::Continue(true)
        }
    }
    Preorder(f)
}

#[inline]
fn names(cols: &[&str]) -> Vec<ColName> {
    cols.iter().map(|c| SmolStr::new(c)).collect()
}

#[inline]
fn binary(input: NodeID, res: &str, lcol: &str, rcol: &str) -> Binary {
    Binary {
        input,
        res: SmolStr::new(res),
        lcol: SmolStr::new(lcol),
        rcol: SmolStr::new(rcol),
    }
}

#[inline]
fn require(schema: &Schema, col: &ColName, ty: OpTy) -> Result<()> {
    if schema.contains(col) {
        Ok(())
    } else {
        Err(Error::ColumnNotExists(col.clone(), ty))
    }
}

#[inline]
fn new_schema<I: IntoIterator<Item = ColName>>(cols: I, ty: OpTy) -> Result<Schema> {
    let mut schema = Schema::new();
    for c in cols {
        if !schema.insert(c.clone()) {
            return Err(Error::DuplicatedColumn(c, ty));
        }
    }
    Ok(schema)
}

#[inline]
fn extend(src: &Schema, col: &ColName, ty: OpTy) -> Result<Schema> {
    let mut schema = src.clone();
    if !schema.insert(col.clone()) {
        return Err(Error::DuplicatedColumn(col.clone(), ty));
    }
    Ok(schema)
}

#[inline]
fn concat(left: &Schema, right: &Schema, ty: OpTy) -> Result<Schema> {
    new_schema(left.iter().chain(right.iter()).cloned(), ty)
}
