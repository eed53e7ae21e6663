//! The arena tying the AST together.

use std::collections::HashMap;

use espresso_core::{Arena, Name};

use crate::decl::{
    ClassDecl, CompilationUnit, ContextRef, Decl, DeclId, DeclKind, FieldDecl,
    InterfaceDecl, MethodDecl, UnitId, VarDecl,
};
use crate::expr::{Expr, ExprId};
use crate::scope::ScopeTable;
use crate::stmt::{Stmt, StmtId, StmtKind};
use crate::ty::{BuiltInKind, Type, TypeId};

/// Owns every AST node of a compilation, including all compilation units
/// of the linking unit. Dropped wholesale when the compilation ends.
#[derive(Debug, Default)]
pub struct Ast {
    pub decls: Arena<Decl>,
    pub stmts: Arena<Stmt>,
    pub exprs: Arena<Expr>,
    pub types: Arena<Type>,
    pub units: Arena<CompilationUnit>,
    pub scopes: ScopeTable,
    /// Compilation units in input order; this is the linking unit.
    linking_unit: Vec<UnitId>,
    builtin_cache: HashMap<BuiltInKind, TypeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    // --- allocation ------------------------------------------------------

    pub fn alloc_decl(&mut self, decl: Decl) -> DeclId {
        self.decls.alloc(decl)
    }

    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        self.stmts.alloc(stmt)
    }

    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        self.exprs.alloc(expr)
    }

    pub fn alloc_type(&mut self, ty: Type) -> TypeId {
        self.types.alloc(ty)
    }

    /// Built-in types are uniqued so they compare cheaply and print once.
    pub fn builtin(&mut self, kind: BuiltInKind) -> TypeId {
        if let Some(&id) = self.builtin_cache.get(&kind) {
            return id;
        }
        let id = self.types.alloc(Type::BuiltIn(kind));
        self.builtin_cache.insert(kind, id);
        id
    }

    pub fn push_unit(&mut self, unit: CompilationUnit) -> UnitId {
        let id = self.units.alloc(unit);
        self.linking_unit.push(id);
        id
    }

    // --- accessors -------------------------------------------------------

    #[must_use]
    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id]
    }

    #[must_use]
    pub fn unit(&self, id: UnitId) -> &CompilationUnit {
        &self.units[id]
    }

    /// Compilation units in input order.
    pub fn linking_unit(&self) -> &[UnitId] {
        &self.linking_unit
    }

    #[must_use]
    pub fn class(&self, id: DeclId) -> &ClassDecl {
        match &self.decls[id].kind {
            DeclKind::Class(class) => class,
            other => panic!("expected class decl, found {other:?}"),
        }
    }

    #[must_use]
    pub fn interface(&self, id: DeclId) -> &InterfaceDecl {
        match &self.decls[id].kind {
            DeclKind::Interface(iface) => iface,
            other => panic!("expected interface decl, found {other:?}"),
        }
    }

    #[must_use]
    pub fn method(&self, id: DeclId) -> &MethodDecl {
        match &self.decls[id].kind {
            DeclKind::Method(method) => method,
            other => panic!("expected method decl, found {other:?}"),
        }
    }

    #[must_use]
    pub fn field(&self, id: DeclId) -> &FieldDecl {
        match &self.decls[id].kind {
            DeclKind::Field(field) => field,
            other => panic!("expected field decl, found {other:?}"),
        }
    }

    #[must_use]
    pub fn var(&self, id: DeclId) -> &VarDecl {
        match &self.decls[id].kind {
            DeclKind::Var(var) => var,
            other => panic!("expected var decl, found {other:?}"),
        }
    }

    #[must_use]
    pub fn ty(&self, id: TypeId) -> &Type {
        &self.types[id]
    }

    #[must_use]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }

    #[must_use]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id]
    }

    /// The package parts of a compilation unit (empty for the default
    /// package).
    pub fn unit_package_parts(&self, unit: UnitId) -> &[Name] {
        match self.ty(self.units[unit].package) {
            Type::Unresolved(u) => &u.parts,
            other => panic!("package is not an unresolved name: {other:?}"),
        }
    }

    // --- context wiring --------------------------------------------------

    /// Inserts `decl` into `parent`. Panics if the decl already has a
    /// parent.
    pub fn set_parent(&self, decl: DeclId, parent: ContextRef) {
        self.decls[decl].set_parent(parent);
    }

    /// The fully qualified name of a decl, for the kinds that have one
    /// (types, methods, fields; not locals). `None` until the decl's
    /// full parent chain is wired; cached once computable.
    pub fn canonical_name(&self, decl: DeclId) -> Option<String> {
        let d = &self.decls[decl];
        if matches!(d.kind, DeclKind::Var(_)) {
            return None;
        }
        if let Some(cached) = d.canonical.get() {
            return Some(cached.clone());
        }
        let parent = d.parent()?;
        let prefix = match parent {
            ContextRef::LinkingUnit => None,
            ContextRef::Unit(unit) => {
                let parts = self.unit_package_parts(unit);
                if parts.is_empty() {
                    None
                } else {
                    Some(
                        parts
                            .iter()
                            .map(Name::as_str)
                            .collect::<Vec<_>>()
                            .join("."),
                    )
                }
            }
            // An incomplete owner chain means "not yet"; do not cache.
            ContextRef::Decl(owner) => Some(self.canonical_name(owner)?),
        };
        let canonical = match prefix {
            Some(prefix) => format!("{prefix}.{}", d.name()),
            None => d.name().to_string(),
        };
        let _ = d.canonical.set(canonical.clone());
        Some(canonical)
    }

    /// Enumerates the child declarations of a context.
    pub fn context_decls(&self, ctx: ContextRef) -> Vec<DeclId> {
        match ctx {
            ContextRef::LinkingUnit => self
                .linking_unit
                .iter()
                .filter_map(|&unit| self.units[unit].body)
                .collect(),
            ContextRef::Unit(unit) => self.units[unit].body.into_iter().collect(),
            ContextRef::Decl(decl) => match &self.decls[decl].kind {
                DeclKind::Class(class) => class
                    .fields
                    .iter()
                    .chain(&class.methods)
                    .chain(&class.constructors)
                    .copied()
                    .collect(),
                DeclKind::Interface(iface) => iface.methods.clone(),
                DeclKind::Method(method) => method
                    .params
                    .iter()
                    .chain(&method.locals)
                    .copied()
                    .collect(),
                DeclKind::Field(_) | DeclKind::Var(_) => Vec::new(),
            },
        }
    }

    // --- types -----------------------------------------------------------

    /// Structural type equality. Resolved unresolved types behave like the
    /// reference type they resolved to.
    pub fn types_equal(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        match (self.ty(a), self.ty(b)) {
            (Type::BuiltIn(ka), Type::BuiltIn(kb)) => ka == kb,
            (Type::Array(ea), Type::Array(eb)) => self.types_equal(*ea, *eb),
            (ta, tb) => match (ta.as_decl(), tb.as_decl()) {
                (Some(da), Some(db)) => da == db,
                _ => false,
            },
        }
    }

    /// A printable form for diagnostics.
    pub fn type_string(&self, id: TypeId) -> String {
        match self.ty(id) {
            Type::BuiltIn(kind) => kind.to_string(),
            Type::Array(elem) => format!("{}[]", self.type_string(*elem)),
            Type::Reference(decl) => self.type_string_of_decl(*decl),
            Type::Unresolved(u) => match u.resolved_decl() {
                Some(decl) => self.type_string_of_decl(decl),
                None => u.dotted(),
            },
        }
    }

    fn type_string_of_decl(&self, decl: DeclId) -> String {
        self.canonical_name(decl)
            .unwrap_or_else(|| self.decl(decl).name().to_string())
    }

    // --- traversal -------------------------------------------------------

    /// Collects every expression under `stmt`, including local variable
    /// initializers.
    pub fn stmt_exprs(&self, stmt: StmtId, out: &mut Vec<ExprId>) {
        match &self.stmts[stmt].kind {
            StmtKind::Block(stmts) => {
                for &s in stmts {
                    self.stmt_exprs(s, out);
                }
            }
            StmtKind::Decl(var) => {
                if let Some(init) = self.var(*var).init {
                    out.push(init);
                }
            }
            StmtKind::Expr(expr) => out.push(*expr),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                out.push(*cond);
                self.stmt_exprs(*then_branch, out);
                if let Some(else_branch) = else_branch {
                    self.stmt_exprs(*else_branch, out);
                }
            }
            StmtKind::While { cond, body } => {
                out.push(*cond);
                self.stmt_exprs(*body, out);
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.stmt_exprs(*init, out);
                }
                if let Some(cond) = cond {
                    out.push(*cond);
                }
                if let Some(update) = update {
                    self.stmt_exprs(*update, out);
                }
                self.stmt_exprs(*body, out);
            }
            StmtKind::Return(expr) => {
                if let Some(expr) = expr {
                    out.push(*expr);
                }
            }
            StmtKind::Empty => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use espresso_core::SourceRange;

    use super::*;
    use crate::ty::UnresolvedType;

    #[test]
    fn builtins_are_uniqued() {
        let mut ast = Ast::new();
        let a = ast.builtin(BuiltInKind::Int);
        let b = ast.builtin(BuiltInKind::Int);
        assert_eq!(a, b);
        assert!(ast.types_equal(a, b));
    }

    #[test]
    #[should_panic(expected = "set twice")]
    fn parent_set_once_is_fatal() {
        let mut ast = Ast::new();
        let pkg = ast.alloc_type(Type::Unresolved(UnresolvedType::new(
            Vec::new(),
            SourceRange::default(),
        )));
        let unit = ast.push_unit(CompilationUnit {
            package: pkg,
            imports: Vec::new(),
            body: None,
            range: SourceRange::default(),
        });
        let decl = ast.alloc_decl(Decl::new(
            Name::from("C"),
            SourceRange::default(),
            DeclKind::Class(ClassDecl {
                modifiers: Default::default(),
                super_classes: [None, None],
                interfaces: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                constructors: Vec::new(),
            }),
        ));
        ast.set_parent(decl, ContextRef::Unit(unit));
        ast.set_parent(decl, ContextRef::Unit(unit));
    }

    #[test]
    fn canonical_name_includes_package() {
        let mut ast = Ast::new();
        let pkg = ast.alloc_type(Type::Unresolved(UnresolvedType::new(
            vec![Name::from("com"), Name::from("example")],
            SourceRange::default(),
        )));
        let unit = ast.push_unit(CompilationUnit {
            package: pkg,
            imports: Vec::new(),
            body: None,
            range: SourceRange::default(),
        });
        let decl = ast.alloc_decl(Decl::new(
            Name::from("C"),
            SourceRange::default(),
            DeclKind::Class(ClassDecl {
                modifiers: Default::default(),
                super_classes: [None, None],
                interfaces: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                constructors: Vec::new(),
            }),
        ));
        ast.set_parent(decl, ContextRef::Unit(unit));
        assert_eq!(ast.canonical_name(decl).as_deref(), Some("com.example.C"));
    }
}
