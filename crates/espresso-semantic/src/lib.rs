//! Semantic analysis: symbol tables, name resolution, expression typing,
//! and static-use checking.
//!
//! Passes run in phase order over the whole linking unit:
//!
//! 1. [`NameResolver::build`] constructs the package tree from every
//!    compilation unit, publishes the predefined-class cache, and
//!    synthesises the array prototype.
//! 2. [`NameResolver::resolve`] builds each unit's import scope and
//!    resolves every declaration-level type name.
//! 3. [`analyze_exprs`] walks every expression three times over the same
//!    RPN list: value names, then types, then static-use rules.

pub mod analysis;
pub mod expr_name;
pub mod hierarchy;
pub mod resolver;
pub mod static_check;
pub mod symbols;
pub mod typeck;

pub use analysis::{analyze, analyze_exprs};
pub use resolver::{Builtin, NameResolver, Shadow};
pub use static_check::StaticChecker;
pub use symbols::{PackageTree, PkgChild, PkgId};
pub use typeck::TypeChecker;
