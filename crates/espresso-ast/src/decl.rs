//! Declarations and declaration contexts.

use std::cell::OnceCell;

use espresso_core::{Idx, Name, SourceRange};

use crate::expr::ExprId;
use crate::scope::ScopeId;
use crate::stmt::StmtId;
use crate::ty::TypeId;

pub type DeclId = Idx<Decl>;
pub type UnitId = Idx<CompilationUnit>;

/// A declaration context a decl can be contained in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContextRef {
    /// The root context owning all compilation units.
    LinkingUnit,
    Unit(UnitId),
    /// A class, interface, or method declaration.
    Decl(DeclId),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Modifier {
    Public = 0,
    Protected = 1,
    Static = 2,
    Final = 3,
    Abstract = 4,
    Native = 5,
}

const NUM_MODIFIERS: usize = 6;

/// A modifier bitset that remembers where each modifier was written.
#[derive(Clone, Debug, Default)]
pub struct Modifiers {
    bits: u8,
    ranges: [SourceRange; NUM_MODIFIERS],
}

impl Modifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `modifier`; returns true if it was already set (a repeated
    /// modifier, which the builder reports).
    pub fn set(&mut self, modifier: Modifier, range: SourceRange) -> bool {
        let bit = 1u8 << modifier as u8;
        let was_set = self.bits & bit != 0;
        self.bits |= bit;
        self.ranges[modifier as usize] = range;
        was_set
    }

    #[inline]
    pub fn has(&self, modifier: Modifier) -> bool {
        self.bits & (1 << modifier as u8) != 0
    }

    pub fn range_of(&self, modifier: Modifier) -> SourceRange {
        self.ranges[modifier as usize]
    }

    #[inline]
    pub fn is_public(&self) -> bool {
        self.has(Modifier::Public)
    }

    #[inline]
    pub fn is_protected(&self) -> bool {
        self.has(Modifier::Protected)
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.has(Modifier::Static)
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.has(Modifier::Final)
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.has(Modifier::Abstract)
    }

    #[inline]
    pub fn is_native(&self) -> bool {
        self.has(Modifier::Native)
    }
}

/// A named declaration.
///
/// The parent context is assigned exactly once, when the decl is inserted
/// into its context; inserting it a second time is an internal invariant
/// violation and panics. The canonical (fully-qualified) name is derived
/// from the parent chain and cached on first use; see
/// [`crate::Ast::canonical_name`].
#[derive(Debug)]
pub struct Decl {
    name: Name,
    range: SourceRange,
    parent: OnceCell<ContextRef>,
    pub(crate) canonical: OnceCell<String>,
    pub kind: DeclKind,
}

impl Decl {
    pub fn new(name: Name, range: SourceRange, kind: DeclKind) -> Self {
        Self {
            name,
            range,
            parent: OnceCell::new(),
            canonical: OnceCell::new(),
            kind,
        }
    }

    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    #[inline]
    pub fn range(&self) -> SourceRange {
        self.range
    }

    #[inline]
    pub fn parent(&self) -> Option<ContextRef> {
        self.parent.get().copied()
    }

    pub(crate) fn set_parent(&self, parent: ContextRef) {
        assert!(
            self.parent.set(parent).is_ok(),
            "parent of `{}` set twice",
            self.name
        );
    }

    #[must_use]
    pub fn is_context(&self) -> bool {
        matches!(
            self.kind,
            DeclKind::Class(_) | DeclKind::Interface(_) | DeclKind::Method(_)
        )
    }

    pub fn modifiers(&self) -> Option<&Modifiers> {
        match &self.kind {
            DeclKind::Class(c) => Some(&c.modifiers),
            DeclKind::Interface(i) => Some(&i.modifiers),
            DeclKind::Method(m) => Some(&m.modifiers),
            DeclKind::Field(f) => Some(&f.modifiers),
            DeclKind::Var(_) => None,
        }
    }
}

#[derive(Debug)]
pub enum DeclKind {
    Class(ClassDecl),
    Interface(InterfaceDecl),
    Method(MethodDecl),
    Field(FieldDecl),
    Var(VarDecl),
}

#[derive(Debug)]
pub struct ClassDecl {
    pub modifiers: Modifiers,
    /// Two super slots; either may be empty. An entirely empty pair means
    /// the implicit `Object` superclass.
    pub super_classes: [Option<TypeId>; 2],
    pub interfaces: Vec<TypeId>,
    pub fields: Vec<DeclId>,
    pub methods: Vec<DeclId>,
    pub constructors: Vec<DeclId>,
}

#[derive(Debug)]
pub struct InterfaceDecl {
    pub modifiers: Modifiers,
    pub extends: Vec<TypeId>,
    pub methods: Vec<DeclId>,
}

#[derive(Debug)]
pub struct MethodDecl {
    pub modifiers: Modifiers,
    /// `None` is `void`; void is not a type.
    pub return_ty: Option<TypeId>,
    pub params: Vec<DeclId>,
    /// Locals collected from the statement tree, in declaration order.
    pub locals: Vec<DeclId>,
    pub is_constructor: bool,
    pub body: Option<StmtId>,
}

#[derive(Debug)]
pub struct FieldDecl {
    pub modifiers: Modifiers,
    pub ty: TypeId,
    pub init: Option<ExprId>,
    /// Position in the class body, for the forward-reference check.
    pub scope: ScopeId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VarKind {
    Param,
    Local,
}

#[derive(Debug)]
pub struct VarDecl {
    pub ty: TypeId,
    pub init: Option<ExprId>,
    pub kind: VarKind,
    pub scope: ScopeId,
}

#[derive(Debug)]
pub struct ImportDecl {
    /// Always an unresolved type naming the imported package or decl.
    pub ty: TypeId,
    pub is_on_demand: bool,
    pub range: SourceRange,
}

/// One source file: package, imports, and at most one top-level type.
#[derive(Debug)]
pub struct CompilationUnit {
    /// The package as an unresolved dotted name; empty parts mean the
    /// default package.
    pub package: TypeId,
    pub imports: Vec<ImportDecl>,
    pub body: Option<DeclId>,
    pub range: SourceRange,
}
