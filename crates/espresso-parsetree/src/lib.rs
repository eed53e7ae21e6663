//! The parse tree handed to AST lowering.
//!
//! A tree is a flat arena of type-tagged N-ary nodes. Five leaf kinds carry
//! payloads (literals, identifiers, operators, modifiers, basic types); all
//! other kinds are pure interior nodes. Trees are immutable once the parser
//! has finished: lowering only reads them.
//!
//! A node of kind [`NodeKind::Poison`] marks a subtree the parser could not
//! recover; a poisoned tree produces no AST and the parser's diagnostic
//! stands.

mod node;
mod tree;

pub use node::{
    BasicTypeKind, LiteralKind, ModifierKind, NodeKind, OperatorKind, Payload,
};
pub use tree::{parse_integer_literal, Node, NodeId, Tree, TreeBuilder};
