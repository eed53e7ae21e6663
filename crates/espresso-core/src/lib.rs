//! Shared, dependency-minimized core types used across espresso.

pub mod arena;
pub mod diag;
pub mod name;
pub mod span;

pub use arena::{Arena, Idx};
pub use diag::{Diagnostic, DiagnosticSink, Severity};
pub use name::{InternedStr, Name, NameInterner};
pub use span::{SourceFile, SourceLocation, SourceRange};
