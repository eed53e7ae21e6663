//! AST-level types.

use std::cell::Cell;

use espresso_core::{Idx, Name, SourceRange};

use crate::decl::DeclId;

pub type TypeId = Idx<Type>;

/// Primitive kinds plus the two special cases the type checker needs:
/// `String` (so concatenation typing does not depend on resolution) and
/// `NoneType`, the type of the `null` literal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BuiltInKind {
    Byte,
    Short,
    Int,
    Char,
    Boolean,
    String,
    NoneType,
}

impl BuiltInKind {
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            BuiltInKind::Byte | BuiltInKind::Short | BuiltInKind::Int | BuiltInKind::Char
        )
    }

    /// Width of the value representation, in bits.
    #[must_use]
    pub fn size_bits(self) -> u32 {
        match self {
            BuiltInKind::Boolean => 1,
            BuiltInKind::Byte => 8,
            BuiltInKind::Short | BuiltInKind::Char => 16,
            BuiltInKind::Int => 32,
            BuiltInKind::String | BuiltInKind::NoneType => 32,
        }
    }
}

impl std::fmt::Display for BuiltInKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            BuiltInKind::Byte => "byte",
            BuiltInKind::Short => "short",
            BuiltInKind::Int => "int",
            BuiltInKind::Char => "char",
            BuiltInKind::Boolean => "boolean",
            BuiltInKind::String => "String",
            BuiltInKind::NoneType => "null",
        };
        f.write_str(text)
    }
}

/// A dotted type name waiting for the name resolver.
///
/// Resolution is monotonic: `resolve` may be called once; afterwards the
/// type behaves like a reference to the resolved declaration. The lock bit
/// freezes a type that must no longer be resolved differently (package
/// names, for example, are locked by the symbol-table build).
#[derive(Debug)]
pub struct UnresolvedType {
    pub parts: Vec<Name>,
    pub range: SourceRange,
    resolved: Cell<Option<DeclId>>,
    locked: Cell<bool>,
}

impl UnresolvedType {
    pub fn new(parts: Vec<Name>, range: SourceRange) -> Self {
        Self {
            parts,
            range,
            resolved: Cell::new(None),
            locked: Cell::new(false),
        }
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    #[inline]
    pub fn resolved_decl(&self) -> Option<DeclId> {
        self.resolved.get()
    }

    pub fn resolve(&self, decl: DeclId) {
        assert!(
            self.resolved.get().is_none(),
            "type resolved twice: {}",
            self.dotted()
        );
        self.resolved.set(Some(decl));
    }

    #[inline]
    pub fn lock(&self) {
        self.locked.set(true);
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }

    pub fn dotted(&self) -> String {
        self.parts
            .iter()
            .map(Name::as_str)
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug)]
pub enum Type {
    BuiltIn(BuiltInKind),
    Array(TypeId),
    Reference(DeclId),
    Unresolved(UnresolvedType),
}

impl Type {
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::BuiltIn(k) if k.is_numeric())
    }

    #[must_use]
    pub fn is_boolean(&self) -> bool {
        matches!(self, Type::BuiltIn(BuiltInKind::Boolean))
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Type::BuiltIn(BuiltInKind::NoneType))
    }

    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self, Type::BuiltIn(BuiltInKind::String))
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    /// The declaration this type refers to, if it is (or has resolved to) a
    /// reference type.
    #[must_use]
    pub fn as_decl(&self) -> Option<DeclId> {
        match self {
            Type::Reference(decl) => Some(*decl),
            Type::Unresolved(u) => u.resolved_decl(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.as_decl().is_some()
    }
}
