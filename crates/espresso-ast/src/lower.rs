//! Parse tree → AST lowering.
//!
//! A switch over parse-tree node kinds. Every visitor first asserts the
//! node kind and an allowed child-count range; a mismatch is a fatal
//! builder error attached to the offending node, and the compilation unit
//! produces no AST. Recoverable problems (an out-of-range literal, a
//! repeated modifier) are reported and lowering continues.
//!
//! Lists in the grammar are recursive in their first child; the
//! [`LowerCtx::visit_list`] pattern flattens them.

mod expr;

use espresso_core::{DiagnosticSink, Name, SourceRange};
use espresso_parsetree::{
    BasicTypeKind, ModifierKind, NodeId, NodeKind, Payload, Tree,
};
use thiserror::Error;

use crate::decl::{
    ClassDecl, CompilationUnit, ContextRef, Decl, DeclId, DeclKind, FieldDecl,
    ImportDecl, InterfaceDecl, MethodDecl, Modifier, Modifiers, UnitId, VarDecl,
    VarKind,
};
use crate::scope::ScopeId;
use crate::stmt::{Stmt, StmtId, StmtKind};
use crate::store::Ast;
use crate::ty::{BuiltInKind, Type, TypeId, UnresolvedType};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LowerError {
    /// The parser already reported the problem; no AST is produced.
    #[error("compilation unit is poisoned")]
    Poisoned,
    #[error("parse tree did not match the expected shape")]
    Shape,
}

/// Lowers one compilation unit's parse tree into `ast`.
pub fn lower_unit(
    tree: &Tree,
    root: NodeId,
    ast: &mut Ast,
    sink: &mut DiagnosticSink,
) -> Result<UnitId, LowerError> {
    if tree.is_poisoned(root) {
        return Err(LowerError::Poisoned);
    }
    LowerCtx { tree, ast, sink }.unit(root)
}

/// State for one method or constructor body.
struct BodyState {
    scope: ScopeId,
    locals: Vec<DeclId>,
}

pub(crate) struct LowerCtx<'a> {
    pub(crate) tree: &'a Tree,
    pub(crate) ast: &'a mut Ast,
    pub(crate) sink: &'a mut DiagnosticSink,
}

impl LowerCtx<'_> {
    // --- shape helpers ---------------------------------------------------

    pub(crate) fn check_kind(&mut self, id: NodeId, kind: NodeKind) -> Result<(), LowerError> {
        let node = self.tree.node(id);
        if node.kind() != kind {
            self.sink.report_error(
                "builder",
                format!(
                    "expected {:?} node, found {:?}",
                    kind,
                    node.kind()
                ),
                node.range(),
            );
            return Err(LowerError::Shape);
        }
        Ok(())
    }

    pub(crate) fn check_children(
        &mut self,
        id: NodeId,
        min: usize,
        max: usize,
    ) -> Result<(), LowerError> {
        let node = self.tree.node(id);
        let n = node.num_children();
        if n < min || n > max {
            self.sink.report_error(
                "builder",
                format!(
                    "{:?} node has {n} children, expected {min} to {max}",
                    node.kind()
                ),
                node.range(),
            );
            return Err(LowerError::Shape);
        }
        Ok(())
    }

    pub(crate) fn require_child(&mut self, id: NodeId, i: usize) -> Result<NodeId, LowerError> {
        match self.tree.node(id).child(i) {
            Some(child) => Ok(child),
            None => {
                let node = self.tree.node(id);
                self.sink.report_error(
                    "builder",
                    format!("{:?} node is missing child {i}", node.kind()),
                    node.range(),
                );
                Err(LowerError::Shape)
            }
        }
    }

    pub(crate) fn range(&self, id: NodeId) -> SourceRange {
        self.tree.node(id).range()
    }

    /// Flattens a list node that is recursive in its first child. `node`
    /// may be absent for an empty list.
    fn visit_list<T>(
        &mut self,
        node: Option<NodeId>,
        kind: NodeKind,
        out: &mut Vec<T>,
        f: &mut impl FnMut(&mut Self, NodeId) -> Result<T, LowerError>,
    ) -> Result<(), LowerError> {
        let Some(id) = node else { return Ok(()) };
        self.check_kind(id, kind)?;
        self.check_children(id, 1, 2)?;
        if self.tree.node(id).num_children() == 2 {
            let head = self.tree.node(id).child(0);
            self.visit_list(head, kind, out, f)?;
            let last = self.require_child(id, 1)?;
            out.push(f(self, last)?);
        } else {
            let only = self.require_child(id, 0)?;
            out.push(f(self, only)?);
        }
        Ok(())
    }

    // --- compilation unit ------------------------------------------------

    fn unit(&mut self, root: NodeId) -> Result<UnitId, LowerError> {
        self.check_kind(root, NodeKind::CompilationUnit)?;
        self.check_children(root, 3, 3)?;

        let package = match self.tree.node(root).child(0) {
            Some(pkg) => {
                self.check_kind(pkg, NodeKind::PackageDeclaration)?;
                self.check_children(pkg, 1, 1)?;
                let name = self.require_child(pkg, 0)?;
                let parts = self.qualified_parts(name)?;
                self.ast.alloc_type(Type::Unresolved(UnresolvedType::new(
                    parts,
                    self.range(pkg),
                )))
            }
            // The default (unnamed) package.
            None => self.ast.alloc_type(Type::Unresolved(UnresolvedType::new(
                Vec::new(),
                SourceRange::default(),
            ))),
        };

        let mut imports = Vec::new();
        let import_list = self.tree.node(root).child(1);
        self.visit_list(
            import_list,
            NodeKind::ImportDeclarationList,
            &mut imports,
            &mut |this, id| this.import_decl(id),
        )?;

        let body = match self.tree.node(root).child(2) {
            Some(body) => Some(match self.tree.node(body).kind() {
                NodeKind::ClassDeclaration => self.class_decl(body)?,
                NodeKind::InterfaceDeclaration => self.interface_decl(body)?,
                other => {
                    self.sink.report_error(
                        "builder",
                        format!("expected a type declaration, found {other:?}"),
                        self.range(body),
                    );
                    return Err(LowerError::Shape);
                }
            }),
            None => None,
        };

        let unit = self.ast.push_unit(CompilationUnit {
            package,
            imports,
            body,
            range: self.range(root),
        });
        if let Some(body) = body {
            self.ast.set_parent(body, ContextRef::Unit(unit));
        }
        Ok(unit)
    }

    fn import_decl(&mut self, id: NodeId) -> Result<ImportDecl, LowerError> {
        let kind = self.tree.node(id).kind();
        let is_on_demand = match kind {
            NodeKind::SingleTypeImportDeclaration => false,
            NodeKind::TypeImportOnDemandDeclaration => true,
            other => {
                self.sink.report_error(
                    "builder",
                    format!("expected an import declaration, found {other:?}"),
                    self.range(id),
                );
                return Err(LowerError::Shape);
            }
        };
        self.check_children(id, 1, 1)?;
        let name = self.require_child(id, 0)?;
        let parts = self.qualified_parts(name)?;
        let range = self.range(id);
        let ty = self
            .ast
            .alloc_type(Type::Unresolved(UnresolvedType::new(parts, range)));
        Ok(ImportDecl {
            ty,
            is_on_demand,
            range,
        })
    }

    // --- classes & interfaces --------------------------------------------

    fn class_decl(&mut self, id: NodeId) -> Result<DeclId, LowerError> {
        self.check_kind(id, NodeKind::ClassDeclaration)?;
        self.check_children(id, 5, 5)?;

        let modifiers = self.modifier_list(self.tree.node(id).child(0))?;
        let name_node = self.require_child(id, 1)?;
        let name = self.identifier(name_node)?;

        let super_class = match self.tree.node(id).child(2) {
            Some(sup) => {
                self.check_kind(sup, NodeKind::SuperOpt)?;
                self.check_children(sup, 1, 1)?;
                let ty = self.require_child(sup, 0)?;
                Some(self.type_name(ty)?)
            }
            None => None,
        };

        let mut interfaces = Vec::new();
        let iface_list = self.tree.node(id).child(3);
        self.visit_list(
            iface_list,
            NodeKind::InterfaceTypeList,
            &mut interfaces,
            &mut |this, node| this.type_name(node),
        )?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        let mut constructors = Vec::new();
        let mut members = Vec::new();
        let body_list = self.tree.node(id).child(4);
        self.visit_list(
            body_list,
            NodeKind::ClassBodyDeclarationList,
            &mut members,
            &mut |_this, node| Ok(node),
        )?;

        // Fields take lexical positions in body order; the static checker
        // uses them for the forward-reference rule.
        let mut field_scope: Option<ScopeId> = None;
        for member in members {
            match self.tree.node(member).kind() {
                NodeKind::FieldDeclaration => {
                    let scope = match field_scope {
                        Some(prev) => self.ast.scopes.next(prev),
                        None => self.ast.scopes.fresh(None),
                    };
                    field_scope = Some(scope);
                    fields.push(self.field_decl(member, scope)?);
                }
                NodeKind::MethodDeclaration | NodeKind::AbstractMethodDeclaration => {
                    methods.push(self.method_decl(member)?);
                }
                NodeKind::ConstructorDeclaration => {
                    constructors.push(self.constructor_decl(member)?);
                }
                other => {
                    self.sink.report_error(
                        "builder",
                        format!("unexpected class member {other:?}"),
                        self.range(member),
                    );
                    return Err(LowerError::Shape);
                }
            }
        }

        let class = self.ast.alloc_decl(Decl::new(
            name,
            self.range(id),
            DeclKind::Class(ClassDecl {
                modifiers,
                super_classes: [super_class, None],
                interfaces,
                fields: fields.clone(),
                methods: methods.clone(),
                constructors: constructors.clone(),
            }),
        ));
        for member in fields.iter().chain(&methods).chain(&constructors) {
            self.ast.set_parent(*member, ContextRef::Decl(class));
        }
        Ok(class)
    }

    fn interface_decl(&mut self, id: NodeId) -> Result<DeclId, LowerError> {
        self.check_kind(id, NodeKind::InterfaceDeclaration)?;
        self.check_children(id, 4, 4)?;

        let modifiers = self.modifier_list(self.tree.node(id).child(0))?;
        let name_node = self.require_child(id, 1)?;
        let name = self.identifier(name_node)?;

        let mut extends = Vec::new();
        self.visit_list(
            self.tree.node(id).child(2),
            NodeKind::InterfaceTypeList,
            &mut extends,
            &mut |this, node| this.type_name(node),
        )?;

        let mut methods = Vec::new();
        let mut members = Vec::new();
        self.visit_list(
            self.tree.node(id).child(3),
            NodeKind::InterfaceMemberDeclarationList,
            &mut members,
            &mut |_this, node| Ok(node),
        )?;
        for member in members {
            methods.push(self.method_decl(member)?);
        }

        let iface = self.ast.alloc_decl(Decl::new(
            name,
            self.range(id),
            DeclKind::Interface(InterfaceDecl {
                modifiers,
                extends,
                methods: methods.clone(),
            }),
        ));
        for method in &methods {
            self.ast.set_parent(*method, ContextRef::Decl(iface));
        }
        Ok(iface)
    }

    fn field_decl(&mut self, id: NodeId, scope: ScopeId) -> Result<DeclId, LowerError> {
        self.check_kind(id, NodeKind::FieldDeclaration)?;
        self.check_children(id, 3, 3)?;
        let modifiers = self.modifier_list(self.tree.node(id).child(0))?;
        let ty_node = self.require_child(id, 1)?;
        let ty = self.visit_type(ty_node)?;
        let declarator = self.require_child(id, 2)?;
        let (name, init) = self.variable_declarator(declarator)?;
        Ok(self.ast.alloc_decl(Decl::new(
            name,
            self.range(id),
            DeclKind::Field(FieldDecl {
                modifiers,
                ty,
                init,
                scope,
            }),
        )))
    }

    fn method_decl(&mut self, id: NodeId) -> Result<DeclId, LowerError> {
        let (header, body_node) = match self.tree.node(id).kind() {
            NodeKind::MethodDeclaration => {
                self.check_children(id, 2, 2)?;
                (self.require_child(id, 0)?, self.tree.node(id).child(1))
            }
            NodeKind::AbstractMethodDeclaration => {
                self.check_children(id, 1, 1)?;
                (self.require_child(id, 0)?, None)
            }
            other => {
                self.sink.report_error(
                    "builder",
                    format!("expected a method declaration, found {other:?}"),
                    self.range(id),
                );
                return Err(LowerError::Shape);
            }
        };

        self.check_kind(header, NodeKind::MethodHeader)?;
        self.check_children(header, 4, 4)?;
        let modifiers = self.modifier_list(self.tree.node(header).child(0))?;
        let return_ty = match self.tree.node(header).child(1) {
            Some(ty) => Some(self.visit_type(ty)?),
            None => None, // void
        };
        let name_node = self.require_child(header, 2)?;
        let name = self.identifier(name_node)?;
        let params_node = self.tree.node(header).child(3);

        self.finish_method(id, name, modifiers, return_ty, params_node, body_node, false)
    }

    fn constructor_decl(&mut self, id: NodeId) -> Result<DeclId, LowerError> {
        self.check_kind(id, NodeKind::ConstructorDeclaration)?;
        self.check_children(id, 4, 4)?;
        let modifiers = self.modifier_list(self.tree.node(id).child(0))?;
        let name_node = self.require_child(id, 1)?;
        let name = self.identifier(name_node)?;
        let params_node = self.tree.node(id).child(2);
        let body = self.require_child(id, 3)?;
        self.finish_method(id, name, modifiers, None, params_node, Some(body), true)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_method(
        &mut self,
        node: NodeId,
        name: Name,
        modifiers: Modifiers,
        return_ty: Option<TypeId>,
        params_node: Option<NodeId>,
        body_node: Option<NodeId>,
        is_constructor: bool,
    ) -> Result<DeclId, LowerError> {
        let root = self.ast.scopes.fresh(None);
        let mut body_state = BodyState {
            scope: root,
            locals: Vec::new(),
        };

        let mut param_specs = Vec::new();
        self.visit_list(
            params_node,
            NodeKind::FormalParameterList,
            &mut param_specs,
            &mut |this, node| {
                this.check_kind(node, NodeKind::FormalParameter)?;
                this.check_children(node, 2, 2)?;
                let ty_node = this.require_child(node, 0)?;
                let ty = this.visit_type(ty_node)?;
                let name_node = this.require_child(node, 1)?;
                let name = this.identifier(name_node)?;
                Ok((ty, name, this.range(node)))
            },
        )?;
        let mut params = Vec::new();
        for (ty, name, range) in param_specs {
            let scope = self.ast.scopes.next(body_state.scope);
            body_state.scope = scope;
            params.push(self.ast.alloc_decl(Decl::new(
                name,
                range,
                DeclKind::Var(VarDecl {
                    ty,
                    init: None,
                    kind: VarKind::Param,
                    scope,
                }),
            )));
        }

        let body = match body_node {
            Some(body) => Some(self.visit_block(body, &mut body_state)?),
            None => None,
        };

        let method = self.ast.alloc_decl(Decl::new(
            name,
            self.range(node),
            DeclKind::Method(MethodDecl {
                modifiers,
                return_ty,
                params: params.clone(),
                locals: body_state.locals.clone(),
                is_constructor,
                body,
            }),
        ));
        for var in params.iter().chain(&body_state.locals) {
            self.ast.set_parent(*var, ContextRef::Decl(method));
        }
        Ok(method)
    }

    // --- statements ------------------------------------------------------

    fn visit_block(&mut self, id: NodeId, body: &mut BodyState) -> Result<StmtId, LowerError> {
        self.check_kind(id, NodeKind::Block)?;
        let outer = body.scope;
        body.scope = self.ast.scopes.fresh(Some(outer));

        let children: Vec<Option<NodeId>> = self.tree.node(id).children().collect();
        let mut stmts = Vec::new();
        for child in children.into_iter().flatten() {
            stmts.push(self.visit_stmt(child, body)?);
        }

        body.scope = outer;
        Ok(self.ast.alloc_stmt(Stmt {
            kind: StmtKind::Block(stmts),
            range: self.range(id),
        }))
    }

    fn visit_stmt(&mut self, id: NodeId, body: &mut BodyState) -> Result<StmtId, LowerError> {
        match self.tree.node(id).kind() {
            NodeKind::Statement => {
                self.check_children(id, 1, 1)?;
                match self.tree.node(id).child(0) {
                    Some(inner) => self.visit_stmt(inner, body),
                    None => Ok(self.ast.alloc_stmt(Stmt {
                        kind: StmtKind::Empty,
                        range: self.range(id),
                    })),
                }
            }
            NodeKind::Block => self.visit_block(id, body),
            NodeKind::LocalVariableDeclaration => self.visit_local_decl(id, body),
            NodeKind::StatementExpression => {
                self.check_children(id, 1, 1)?;
                let expr_node = self.require_child(id, 0)?;
                let expr = self.lower_expr(expr_node)?;
                Ok(self.ast.alloc_stmt(Stmt {
                    kind: StmtKind::Expr(expr),
                    range: self.range(id),
                }))
            }
            NodeKind::IfThenStatement => {
                self.check_children(id, 2, 3)?;
                let cond_node = self.require_child(id, 0)?;
                let cond = self.lower_expr(cond_node)?;
                let then_node = self.require_child(id, 1)?;
                let then_branch = self.visit_stmt(then_node, body)?;
                let else_branch = match self.tree.node(id).num_children() {
                    3 => {
                        let else_node = self.require_child(id, 2)?;
                        Some(self.visit_stmt(else_node, body)?)
                    }
                    _ => None,
                };
                Ok(self.ast.alloc_stmt(Stmt {
                    kind: StmtKind::If {
                        cond,
                        then_branch,
                        else_branch,
                    },
                    range: self.range(id),
                }))
            }
            NodeKind::WhileStatement => {
                self.check_children(id, 2, 2)?;
                let cond_node = self.require_child(id, 0)?;
                let cond = self.lower_expr(cond_node)?;
                let body_node = self.require_child(id, 1)?;
                let loop_body = self.visit_stmt(body_node, body)?;
                Ok(self.ast.alloc_stmt(Stmt {
                    kind: StmtKind::While {
                        cond,
                        body: loop_body,
                    },
                    range: self.range(id),
                }))
            }
            NodeKind::ForStatement => {
                self.check_children(id, 4, 4)?;
                // For-init locals are scoped to the whole statement.
                let outer = body.scope;
                body.scope = self.ast.scopes.fresh(Some(outer));

                let init = match self.tree.node(id).child(0) {
                    Some(init) => Some(self.visit_stmt(init, body)?),
                    None => None,
                };
                let cond = match self.tree.node(id).child(1) {
                    Some(cond) => Some(self.lower_expr(cond)?),
                    None => None,
                };
                let update = match self.tree.node(id).child(2) {
                    Some(update) => Some(self.visit_stmt(update, body)?),
                    None => None,
                };
                let body_node = self.require_child(id, 3)?;
                let loop_body = self.visit_stmt(body_node, body)?;

                body.scope = outer;
                Ok(self.ast.alloc_stmt(Stmt {
                    kind: StmtKind::For {
                        init,
                        cond,
                        update,
                        body: loop_body,
                    },
                    range: self.range(id),
                }))
            }
            NodeKind::ReturnStatement => {
                self.check_children(id, 0, 1)?;
                let expr = match self.tree.node(id).num_children() {
                    1 => {
                        let expr_node = self.require_child(id, 0)?;
                        Some(self.lower_expr(expr_node)?)
                    }
                    _ => None,
                };
                Ok(self.ast.alloc_stmt(Stmt {
                    kind: StmtKind::Return(expr),
                    range: self.range(id),
                }))
            }
            other => {
                self.sink.report_error(
                    "builder",
                    format!("unexpected statement {other:?}"),
                    self.range(id),
                );
                Err(LowerError::Shape)
            }
        }
    }

    fn visit_local_decl(&mut self, id: NodeId, body: &mut BodyState) -> Result<StmtId, LowerError> {
        self.check_kind(id, NodeKind::LocalVariableDeclaration)?;
        self.check_children(id, 2, 2)?;
        let ty_node = self.require_child(id, 0)?;
        let ty = self.visit_type(ty_node)?;
        let declarator = self.require_child(id, 1)?;
        let (name, init) = self.variable_declarator(declarator)?;

        let scope = self.ast.scopes.next(body.scope);
        body.scope = scope;
        let var = self.ast.alloc_decl(Decl::new(
            name,
            self.range(id),
            DeclKind::Var(VarDecl {
                ty,
                init,
                kind: VarKind::Local,
                scope,
            }),
        ));
        body.locals.push(var);
        Ok(self.ast.alloc_stmt(Stmt {
            kind: StmtKind::Decl(var),
            range: self.range(id),
        }))
    }

    fn variable_declarator(
        &mut self,
        id: NodeId,
    ) -> Result<(Name, Option<crate::expr::ExprId>), LowerError> {
        self.check_kind(id, NodeKind::VariableDeclarator)?;
        self.check_children(id, 1, 2)?;
        let name_node = self.require_child(id, 0)?;
        let name = self.identifier(name_node)?;
        let init = match self.tree.node(id).num_children() {
            2 => {
                let init_node = self.require_child(id, 1)?;
                Some(self.lower_expr(init_node)?)
            }
            _ => None,
        };
        Ok((name, init))
    }

    // --- names, types, modifiers -----------------------------------------

    pub(crate) fn identifier(&mut self, id: NodeId) -> Result<Name, LowerError> {
        self.check_kind(id, NodeKind::Identifier)?;
        match self.tree.identifier_text(id) {
            Some(text) => Ok(Name::from(text)),
            None => {
                self.sink.report_error(
                    "builder",
                    "identifier node has no text",
                    self.range(id),
                );
                Err(LowerError::Shape)
            }
        }
    }

    pub(crate) fn qualified_parts(&mut self, id: NodeId) -> Result<Vec<Name>, LowerError> {
        self.check_kind(id, NodeKind::QualifiedIdentifier)?;
        self.check_children(id, 1, 2)?;
        if self.tree.node(id).num_children() == 2 {
            let head = self.require_child(id, 0)?;
            let mut parts = self.qualified_parts(head)?;
            let last = self.require_child(id, 1)?;
            parts.push(self.identifier(last)?);
            Ok(parts)
        } else {
            let only = self.require_child(id, 0)?;
            Ok(vec![self.identifier(only)?])
        }
    }

    /// A (possibly qualified) class or interface name in a type position.
    fn type_name(&mut self, id: NodeId) -> Result<TypeId, LowerError> {
        let parts = self.qualified_parts(id)?;
        let range = self.range(id);
        Ok(self
            .ast
            .alloc_type(Type::Unresolved(UnresolvedType::new(parts, range))))
    }

    pub(crate) fn visit_type(&mut self, id: NodeId) -> Result<TypeId, LowerError> {
        match self.tree.node(id).kind() {
            NodeKind::BasicType => {
                let kind = match self.tree.node(id).payload() {
                    Payload::BasicType(kind) => basic_type_kind(kind),
                    other => {
                        self.sink.report_error(
                            "builder",
                            format!("basic type node carries {other:?}"),
                            self.range(id),
                        );
                        return Err(LowerError::Shape);
                    }
                };
                Ok(self.ast.builtin(kind))
            }
            NodeKind::QualifiedIdentifier => self.type_name(id),
            NodeKind::Type => {
                self.check_children(id, 1, 1)?;
                let inner = self.require_child(id, 0)?;
                self.visit_type(inner)
            }
            NodeKind::ArrayType | NodeKind::ArrayCastType => {
                self.check_children(id, 1, 1)?;
                let inner = self.require_child(id, 0)?;
                let elem = self.visit_type(inner)?;
                Ok(self.ast.alloc_type(Type::Array(elem)))
            }
            other => {
                self.sink.report_error(
                    "builder",
                    format!("expected a type, found {other:?}"),
                    self.range(id),
                );
                Err(LowerError::Shape)
            }
        }
    }

    fn modifier_list(&mut self, node: Option<NodeId>) -> Result<Modifiers, LowerError> {
        let mut leaves = Vec::new();
        self.visit_list(node, NodeKind::ModifierList, &mut leaves, &mut |this, id| {
            this.check_kind(id, NodeKind::Modifier)?;
            match this.tree.node(id).payload() {
                Payload::Modifier(kind) => Ok((kind, this.range(id))),
                other => {
                    this.sink.report_error(
                        "builder",
                        format!("modifier node carries {other:?}"),
                        this.range(id),
                    );
                    Err(LowerError::Shape)
                }
            }
        })?;

        let mut modifiers = Modifiers::new();
        for (kind, range) in leaves {
            let modifier = match kind {
                ModifierKind::Public => Modifier::Public,
                ModifierKind::Protected => Modifier::Protected,
                ModifierKind::Static => Modifier::Static,
                ModifierKind::Abstract => Modifier::Abstract,
                ModifierKind::Final => Modifier::Final,
                ModifierKind::Native => Modifier::Native,
            };
            if modifiers.set(modifier, range) {
                self.sink
                    .report_error("builder", format!("repeated modifier {kind:?}"), range);
            }
        }
        Ok(modifiers)
    }
}

fn basic_type_kind(kind: BasicTypeKind) -> BuiltInKind {
    match kind {
        BasicTypeKind::Byte => BuiltInKind::Byte,
        BasicTypeKind::Short => BuiltInKind::Short,
        BasicTypeKind::Int => BuiltInKind::Int,
        BasicTypeKind::Char => BuiltInKind::Char,
        BasicTypeKind::Boolean => BuiltInKind::Boolean,
    }
}
