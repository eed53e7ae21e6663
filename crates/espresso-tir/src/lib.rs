//! The typed IR the middle-end lowers to.
//!
//! Values live in a per-module arena and refer to each other by id, so
//! use/def links form a graph without ownership cycles. Registering an
//! operand on an instruction appends the instruction to the operand's
//! user list. The printed form (`%name.id`, `@function`) is parseable by
//! [`parse_module`], and [`structurally_equal`] checks print/parse
//! round-trips.

pub mod builder;
pub mod display;
pub mod module;
pub mod parse;
pub mod ty;

pub use builder::Builder;
pub use module::{
    BinOp, Block, CastOp, Function, Instr, IntrinsicKind, Module, Opcode, Predicate,
    ValueData, ValueId, ValueKind,
};
pub use parse::{parse_module, structurally_equal, ParseError};
pub use ty::{Context, Ty, TyId};
