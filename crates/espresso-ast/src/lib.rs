//! The typed AST: declarations, statements, types, and expressions in
//! reverse-Polish form.
//!
//! All nodes live in the [`Ast`] arena and refer to each other by index.
//! After lowering, the tree is immutable except for two monotonic updates:
//! name resolution fills in [`ty::UnresolvedType`] targets, and the type
//! resolver caches result types on expression op nodes. Both go through
//! `Cell`s so the resolution passes can share the arena immutably.

pub mod decl;
pub mod eval;
pub mod expr;
pub mod lower;
pub mod scope;
pub mod stmt;
pub mod ty;

mod store;

pub use decl::{
    ClassDecl, CompilationUnit, ContextRef, Decl, DeclId, DeclKind, FieldDecl,
    ImportDecl, InterfaceDecl, MethodDecl, Modifier, Modifiers, UnitId, VarDecl,
    VarKind,
};
pub use eval::{evaluate, EvalAbort, EvalResult, ExprEvaluator};
pub use expr::{
    BinOp, Expr, ExprId, ExprNode, ExprNodeKind, LiteralValue, UnaryOp,
};
pub use scope::{ScopeId, ScopeTable};
pub use stmt::{Stmt, StmtId, StmtKind};
pub use store::Ast;
pub use ty::{BuiltInKind, Type, TypeId, UnresolvedType};
