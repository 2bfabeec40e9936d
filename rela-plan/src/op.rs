//! This module defines the operators of the algebra DAG.
//!
//! Each operator refers to its inputs by NodeID, which is the index of
//! the input node in the arena. Multiple operators may refer to the same
//! input, so the plan forms a directed acyclic graph instead of a tree.
use crate::col::{ColName, ProjItem, SortItem};
use crate::id::NodeID;
use rela_datatype::Atom;
use smallvec::{smallvec, SmallVec};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpTy {
    LitTbl,
    EmptyTbl,
    Attach,
    Proj,
    Select,
    Eqjoin,
    Semijoin,
    Cross,
    Distinct,
    Union,
    Difference,
    BoolAnd,
    BoolOr,
    Rank,
    Number,
    Step,
    StepJoin,
    DocTbl,
    Roots,
    Fragment,
    EmptyFrag,
    FragUnion,
    Twig,
    Content,
    Fcns,
    Nil,
    Serialize,
    Dummy,
}

/// Op stands for algebra operator.
/// This is the general enum containing all node kinds of the DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Literal table with fixed rows.
    LitTbl {
        cols: Vec<ColName>,
        rows: Vec<Vec<Atom>>,
    },
    /// Table without any row.
    EmptyTbl { cols: Vec<ColName> },
    /// Attach a constant column to every row of input.
    Attach {
        input: NodeID,
        res: ColName,
        value: Atom,
    },
    /// Projection node, only renames or drops columns.
    Proj { input: NodeID, cols: Vec<ProjItem> },
    /// Keep rows whose boolean column is true.
    Select { input: NodeID, col: ColName },
    /// Equi-join on single column pair.
    Eqjoin(Join),
    /// Semi-join, keeps left rows having a join partner in right.
    Semijoin(Join),
    /// Cartesian product.
    Cross { left: NodeID, right: NodeID },
    /// Duplicate elimination.
    Distinct { input: NodeID },
    /// Disjoint union of two inputs with same column names.
    Union { left: NodeID, right: NodeID },
    /// Left rows not occurring in right.
    Difference { left: NodeID, right: NodeID },
    /// Boolean conjunction of two columns into new column.
    BoolAnd(Binary),
    /// Boolean disjunction of two columns into new column.
    BoolOr(Binary),
    /// Dense rank of rows according to sort criteria.
    Rank {
        input: NodeID,
        res: ColName,
        sortby: Vec<SortItem>,
    },
    /// Row numbering, assigns distinct numbers in arbitrary order.
    Number { input: NodeID, res: ColName },
    /// Path step evaluated on context (iter, item) pairs.
    Step(Box<Step>),
    /// Path step that keeps all input columns.
    StepJoin(Box<StepJoin>),
    /// Document access, maps (iter, item) to document nodes.
    DocTbl {
        input: NodeID,
        iter: ColName,
        item: ColName,
        item_res: ColName,
    },
    /// Root nodes of the constructed fragment.
    Roots { input: NodeID },
    /// Fragment of constructed nodes.
    Fragment { input: NodeID },
    /// Fragment without any node.
    EmptyFrag,
    /// Union of two fragments.
    FragUnion { left: NodeID, right: NodeID },
    /// Root of a constructed tree.
    Twig {
        input: NodeID,
        iter: ColName,
        item: ColName,
    },
    /// Content of constructed node.
    Content {
        frag: NodeID,
        input: NodeID,
        iter: ColName,
        pos: ColName,
        item: ColName,
    },
    /// Function wrapper of constructor sequence.
    Fcns { left: NodeID, right: NodeID },
    /// End of constructor sequence.
    Nil,
    /// Serialization of the final result.
    Serialize {
        frag: NodeID,
        input: NodeID,
        pos: ColName,
        item: ColName,
    },
    /// Pass-through node, outputs its input unchanged.
    Dummy { input: NodeID },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub left: NodeID,
    pub right: NodeID,
    pub lcol: ColName,
    pub rcol: ColName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    pub input: NodeID,
    pub res: ColName,
    pub lcol: ColName,
    pub rcol: ColName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    SelfAxis,
    Attribute,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
}

impl Axis {
    #[inline]
    pub fn to_lower(&self) -> &'static str {
        match self {
            Axis::Child => "child",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Parent => "parent",
            Axis::Ancestor => "ancestor",
            Axis::AncestorOrSelf => "ancestor-or-self",
            Axis::SelfAxis => "self",
            Axis::Attribute => "attribute",
            Axis::FollowingSibling => "following-sibling",
            Axis::PrecedingSibling => "preceding-sibling",
            Axis::Following => "following",
            Axis::Preceding => "preceding",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_lower())
    }
}

/// Path step. Outputs (iter, item_res) for every node reachable
/// from context node in column item via the axis and name test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub doc: NodeID,
    pub ctx: NodeID,
    pub axis: Axis,
    pub test: ColName,
    /// Level of result nodes in the document. None if not resolved yet.
    pub level: Option<i32>,
    pub iter: ColName,
    pub item: ColName,
    pub item_res: ColName,
    /// Whether the step is guided by a data guide.
    pub guided: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepJoin {
    pub doc: NodeID,
    pub input: NodeID,
    pub axis: Axis,
    pub test: ColName,
    pub level: Option<i32>,
    pub item: ColName,
    pub item_res: ColName,
    pub guided: bool,
}

impl Op {
    #[inline]
    pub fn ty(&self) -> OpTy {
        match self {
            Op::LitTbl { .. } => OpTy::LitTbl,
            Op::EmptyTbl { .. } => OpTy::EmptyTbl,
            Op::Attach { .. } => OpTy::Attach,
            Op::Proj { .. } => OpTy::Proj,
            Op::Select { .. } => OpTy::Select,
            Op::Eqjoin(_) => OpTy::Eqjoin,
            Op::Semijoin(_) => OpTy::Semijoin,
            Op::Cross { .. } => OpTy::Cross,
            Op::Distinct { .. } => OpTy::Distinct,
            Op::Union { .. } => OpTy::Union,
            Op::Difference { .. } => OpTy::Difference,
            Op::BoolAnd(_) => OpTy::BoolAnd,
            Op::BoolOr(_) => OpTy::BoolOr,
            Op::Rank { .. } => OpTy::Rank,
            Op::Number { .. } => OpTy::Number,
            Op::Step(_) => OpTy::Step,
            Op::StepJoin(_) => OpTy::StepJoin,
            Op::DocTbl { .. } => OpTy::DocTbl,
            Op::Roots { .. } => OpTy::Roots,
            Op::Fragment { .. } => OpTy::Fragment,
            Op::EmptyFrag => OpTy::EmptyFrag,
            Op::FragUnion { .. } => OpTy::FragUnion,
            Op::Twig { .. } => OpTy::Twig,
            Op::Content { .. } => OpTy::Content,
            Op::Fcns { .. } => OpTy::Fcns,
            Op::Nil => OpTy::Nil,
            Op::Serialize { .. } => OpTy::Serialize,
            Op::Dummy { .. } => OpTy::Dummy,
        }
    }

    /// Returns inputs of current operator, left first.
    #[inline]
    pub fn inputs(&self) -> SmallVec<[NodeID; 2]> {
        match self {
            Op::LitTbl { .. } | Op::EmptyTbl { .. } | Op::EmptyFrag | Op::Nil => smallvec![],
            Op::Attach { input, .. }
            | Op::Proj { input, .. }
            | Op::Select { input, .. }
            | Op::Distinct { input }
            | Op::BoolAnd(Binary { input, .. })
            | Op::BoolOr(Binary { input, .. })
            | Op::Rank { input, .. }
            | Op::Number { input, .. }
            | Op::DocTbl { input, .. }
            | Op::Roots { input }
            | Op::Fragment { input }
            | Op::Twig { input, .. }
            | Op::Dummy { input } => smallvec![*input],
            Op::Eqjoin(Join { left, right, .. })
            | Op::Semijoin(Join { left, right, .. })
            | Op::Cross { left, right }
            | Op::Union { left, right }
            | Op::Difference { left, right }
            | Op::FragUnion { left, right }
            | Op::Fcns { left, right } => smallvec![*left, *right],
            Op::Step(step) => smallvec![step.doc, step.ctx],
            Op::StepJoin(step) => smallvec![step.doc, step.input],
            Op::Content { frag, input, .. } | Op::Serialize { frag, input, .. } => {
                smallvec![*frag, *input]
            }
        }
    }

    #[inline]
    pub fn inputs_mut(&mut self) -> SmallVec<[&mut NodeID; 2]> {
        match self {
            Op::LitTbl { .. } | Op::EmptyTbl { .. } | Op::EmptyFrag | Op::Nil => smallvec![],
            Op::Attach { input, .. }
            | Op::Proj { input, .. }
            | Op::Select { input, .. }
            | Op::Distinct { input }
            | Op::BoolAnd(Binary { input, .. })
            | Op::BoolOr(Binary { input, .. })
            | Op::Rank { input, .. }
            | Op::Number { input, .. }
            | Op::DocTbl { input, .. }
            | Op::Roots { input }
            | Op::Fragment { input }
            | Op::Twig { input, .. }
            | Op::Dummy { input } => smallvec![input],
            Op::Eqjoin(Join { left, right, .. })
            | Op::Semijoin(Join { left, right, .. })
            | Op::Cross { left, right }
            | Op::Union { left, right }
            | Op::Difference { left, right }
            | Op::FragUnion { left, right }
            | Op::Fcns { left, right } => smallvec![left, right],
            Op::Step(step) => {
                let Step { doc, ctx, .. } = step.as_mut();
                smallvec![doc, ctx]
            }
            Op::StepJoin(step) => {
                let StepJoin { doc, input, .. } = step.as_mut();
                smallvec![doc, input]
            }
            Op::Content { frag, input, .. } | Op::Serialize { frag, input, .. } => {
                smallvec![frag, input]
            }
        }
    }

    /// Returns the input at given position.
    #[inline]
    pub fn input(&self, idx: usize) -> Option<NodeID> {
        self.inputs().get(idx).copied()
    }

    /// Returns the first input, which is the only input of unary operators.
    #[inline]
    pub fn left(&self) -> Option<NodeID> {
        self.input(0)
    }

    /// Returns the second input of binary operators.
    #[inline]
    pub fn right(&self) -> Option<NodeID> {
        self.input(1)
    }

    #[inline]
    pub fn is_dummy(&self) -> bool {
        matches!(self, Op::Dummy { .. })
    }

    /// Returns input and projection list if current operator is projection.
    #[inline]
    pub fn as_proj(&self) -> Option<(NodeID, &[ProjItem])> {
        match self {
            Op::Proj { input, cols } => Some((*input, &cols[..])),
            _ => None,
        }
    }

    /// Returns the column generated by current operator, if any.
    #[inline]
    pub fn generated_col(&self) -> Option<&ColName> {
        match self {
            Op::Attach { res, .. }
            | Op::BoolAnd(Binary { res, .. })
            | Op::BoolOr(Binary { res, .. })
            | Op::Rank { res, .. }
            | Op::Number { res, .. } => Some(res),
            Op::StepJoin(step) => Some(&step.item_res),
            _ => None,
        }
    }
}
