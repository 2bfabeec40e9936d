use crate::col::{ProjItem, SortItem};
use crate::dag::{Dag, DagVisitor};
use crate::id::NodeID;
use crate::op::{Binary, Join, Op, Step, StepJoin};
use fnv::FnvHashSet;
use std::fmt::{self, Write};
use std::ops::{ControlFlow, Deref};

const INDENT: usize = 4;
const BRANCH_1: char = '└';
const BRANCH_N: char = '├';
const BRANCH_V: char = '│';
const LINE: char = '─';

/// Explain defines how to explain an operator or a plan.
pub trait Explain {
    fn explain<F: Write>(&self, f: &mut F) -> fmt::Result;
}

impl Dag {
    /// Print the plan rooted at given node as a tree.
    /// Shared nodes are printed once, later references only show the id.
    pub fn explain<F: Write>(&self, root: NodeID, f: &mut F) -> fmt::Result {
        let mut pe = PlanExplain {
            f,
            levels: vec![],
            opened: vec![],
            printed: FnvHashSet::default(),
        };
        match self.walk(root, &mut pe) {
            ControlFlow::Continue(_) => Ok(()),
            ControlFlow::Break(e) => Err(e),
        }
    }
}

/* Implements Explain for all operators */

impl Explain for Op {
    fn explain<F: Write>(&self, f: &mut F) -> fmt::Result {
        match self {
            Op::LitTbl { cols, rows } => {
                f.write_str("LitTbl{[")?;
                write_strs(f, cols, ", ")?;
                write!(f, "], rows={}}}", rows.len())
            }
            Op::EmptyTbl { cols } => {
                f.write_str("EmptyTbl{")?;
                write_strs(f, cols, ", ")?;
                f.write_char('}')
            }
            Op::Attach { res, value, .. } => write!(f, "Attach{{{}={}}}", res, value),
            Op::Proj { cols, .. } => {
                f.write_str("Proj{")?;
                write_refs(f, cols, ", ")?;
                f.write_char('}')
            }
            Op::Select { col, .. } => write!(f, "Select{{{}}}", col),
            Op::Eqjoin(Join { lcol, rcol, .. }) => write!(f, "Eqjoin{{{}={}}}", lcol, rcol),
            Op::Semijoin(Join { lcol, rcol, .. }) => write!(f, "Semijoin{{{}={}}}", lcol, rcol),
            Op::Cross { .. } => f.write_str("Cross"),
            Op::Distinct { .. } => f.write_str("Distinct"),
            Op::Union { .. } => f.write_str("Union"),
            Op::Difference { .. } => f.write_str("Difference"),
            Op::BoolAnd(Binary {
                res, lcol, rcol, ..
            }) => write!(f, "And{{{}={} and {}}}", res, lcol, rcol),
            Op::BoolOr(Binary {
                res, lcol, rcol, ..
            }) => write!(f, "Or{{{}={} or {}}}", res, lcol, rcol),
            Op::Rank { res, sortby, .. } => {
                write!(f, "Rank{{{}=[", res)?;
                write_refs(f, sortby, ", ")?;
                f.write_str("]}")
            }
            Op::Number { res, .. } => write!(f, "Number{{{}}}", res),
            Op::Step(step) => step.explain(f),
            Op::StepJoin(step) => step.explain(f),
            Op::DocTbl {
                iter,
                item,
                item_res,
                ..
            } => write!(f, "DocTbl{{{}, {}->{}}}", iter, item, item_res),
            Op::Roots { .. } => f.write_str("Roots"),
            Op::Fragment { .. } => f.write_str("Fragment"),
            Op::EmptyFrag => f.write_str("EmptyFrag"),
            Op::FragUnion { .. } => f.write_str("FragUnion"),
            Op::Twig { iter, item, .. } => write!(f, "Twig{{{}, {}}}", iter, item),
            Op::Content {
                iter, pos, item, ..
            } => write!(f, "Content{{{}, {}, {}}}", iter, pos, item),
            Op::Fcns { .. } => f.write_str("Fcns"),
            Op::Nil => f.write_str("Nil"),
            Op::Serialize { pos, item, .. } => write!(f, "Serialize{{{}, {}}}", pos, item),
            Op::Dummy { .. } => f.write_str("Dummy"),
        }
    }
}

impl Explain for ProjItem {
    fn explain<F: Write>(&self, f: &mut F) -> fmt::Result {
        if self.is_rename() {
            write!(f, "{}:{}", self.new, self.old)
        } else {
            f.write_str(&self.new)
        }
    }
}

impl Explain for SortItem {
    fn explain<F: Write>(&self, f: &mut F) -> fmt::Result {
        f.write_str(&self.col)?;
        if self.desc {
            f.write_str(" desc")?
        }
        Ok(())
    }
}

impl Explain for Step {
    fn explain<F: Write>(&self, f: &mut F) -> fmt::Result {
        f.write_str(if self.guided { "GuideStep{" } else { "Step{" })?;
        write!(f, "{}::{}", self.axis, self.test)?;
        if let Some(level) = self.level {
            write!(f, ", level={}", level)?
        }
        write!(f, ", {}, {}->{}}}", self.iter, self.item, self.item_res)
    }
}

impl Explain for StepJoin {
    fn explain<F: Write>(&self, f: &mut F) -> fmt::Result {
        f.write_str(if self.guided {
            "GuideStepJoin{"
        } else {
            "StepJoin{"
        })?;
        write!(f, "{}::{}", self.axis, self.test)?;
        if let Some(level) = self.level {
            write!(f, ", level={}", level)?
        }
        write!(f, ", {}->{}}}", self.item, self.item_res)
    }
}

fn write_refs<'i, F, E: 'i, I>(f: &mut F, exprs: I, delimiter: &str) -> fmt::Result
where
    F: Write,
    E: Explain,
    I: IntoIterator<Item = &'i E>,
{
    let mut exprs = exprs.into_iter();
    if let Some(head) = exprs.next() {
        head.explain(f)?
    }
    for e in exprs {
        f.write_str(delimiter)?;
        e.explain(f)?
    }
    Ok(())
}

fn write_strs<F: Write, S: Deref<Target = str>>(
    f: &mut F,
    strs: &[S],
    delimiter: &str,
) -> fmt::Result {
    for (i, s) in strs.iter().enumerate() {
        if i > 0 {
            f.write_str(delimiter)?
        }
        f.write_str(s)?
    }
    Ok(())
}

struct PlanExplain<'a, F> {
    f: &'a mut F,
    // remaining children of each open level
    levels: Vec<u16>,
    // whether each entered node opened a level
    opened: Vec<bool>,
    printed: FnvHashSet<NodeID>,
}

impl<F: Write> PlanExplain<'_, F> {
    fn write_line(&mut self, dag: &Dag, id: NodeID, shared: bool) -> fmt::Result {
        if let Some((last, init)) = self.levels.split_last_mut() {
            for n in init.iter() {
                if *n > 0 {
                    self.f.write_char(BRANCH_V)?;
                } else {
                    self.f.write_char(' ')?;
                }
                for _ in 1..INDENT {
                    self.f.write_char(' ')?
                }
            }
            self.f
                .write_char(if *last > 1 { BRANCH_N } else { BRANCH_1 })?;
            for _ in 2..INDENT {
                self.f.write_char(LINE)?
            }
            self.f.write_char(' ')?;
            *last = last.saturating_sub(1);
        }
        write!(self.f, "{} ", id)?;
        match dag.get(id) {
            Some(node) if !shared => {
                node.op.explain(self.f)?;
                write!(self.f, " -> {}", node.schema)?
            }
            Some(_) => self.f.write_str("(shared)")?,
            None => self.f.write_str("(missing)")?,
        }
        self.f.write_char('\n')
    }
}

impl<F: Write> DagVisitor for PlanExplain<'_, F> {
    type Break = fmt::Error;

    #[inline]
    fn enter(&mut self, dag: &Dag, id: NodeID) -> ControlFlow<fmt::Error, bool> {
        let shared = !self.printed.insert(id);
        if let Err(e) = self.write_line(dag, id, shared) {
            return ControlFlow::Break(e);
        }
        let child_cnt = if shared {
            0
        } else {
            dag.op(id).map(|op| op.inputs().len()).unwrap_or_default()
        };
        if child_cnt > 0 {
            self.levels.push(child_cnt as u16);
        }
        self.opened.push(child_cnt > 0);
        ControlFlow::Continue(!shared)
    }

    #[inline]
    fn leave(&mut self, _dag: &Dag, _id: NodeID) -> ControlFlow<fmt::Error> {
        if let Some(true) = self.opened.pop() {
            self.levels.pop();
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use crate::col::ProjItem;
    use crate::dag::Dag;
    use crate::tests::nat_rows;

    #[test]
    fn test_explain_plan() {
        let mut dag = Dag::new();
        let t1 = dag.lit_tbl(&["a", "b"], nat_rows(&[&[1, 2]])).unwrap();
        let p1 = dag.project(t1, vec![ProjItem::new("c", "a")]).unwrap();
        let j = dag.eqjoin(t1, p1, "a", "c").unwrap();
        let mut s = String::new();
        dag.explain(j, &mut s).unwrap();
        println!("Explain plan:\n{}", s);
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(4, lines.len());
        assert_eq!("#2 Eqjoin{a=c} -> (a, b, c)", lines[0]);
        assert_eq!("├── #0 LitTbl{[a, b], rows=1} -> (a, b)", lines[1]);
        assert_eq!("└── #1 Proj{c:a} -> (c)", lines[2]);
        assert_eq!("    └── #0 (shared)", lines[3]);
    }

    #[test]
    fn test_explain_empty_tbl() {
        let mut dag = Dag::new();
        let t1 = dag.empty_tbl(&["a", "b"]).unwrap();
        let mut s = String::new();
        dag.explain(t1, &mut s).unwrap();
        assert_eq!(Some("#0 EmptyTbl{a, b} -> (a, b)"), s.lines().next());
    }
}
