//! Statements.

use espresso_core::{Idx, SourceRange};

use crate::decl::DeclId;
use crate::expr::ExprId;

pub type StmtId = Idx<Stmt>;

#[derive(Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub range: SourceRange,
}

#[derive(Debug)]
pub enum StmtKind {
    Block(Vec<StmtId>),
    /// A local variable declaration; the variable's initializer lives on
    /// the `VarDecl`.
    Decl(DeclId),
    Expr(ExprId),
    If {
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    While {
        cond: ExprId,
        body: StmtId,
    },
    For {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        update: Option<StmtId>,
        body: StmtId,
    },
    Return(Option<ExprId>),
    Empty,
}
