//! Linking-unit level tests for name resolution, typing, and static use.
//!
//! The ASTs here are assembled directly (the parser is out of scope), the
//! same way the lowering pass would produce them.

use espresso_ast::{
    Ast, BinOp, ClassDecl, CompilationUnit, ContextRef, Decl, DeclId, DeclKind, Expr, ExprId,
    ExprNode, ExprNodeKind, FieldDecl, ImportDecl, LiteralValue, MethodDecl, Modifier, Modifiers,
    Stmt, StmtKind, Type, TypeId, UnitId, UnresolvedType, VarDecl, VarKind,
};
use espresso_core::{DiagnosticSink, Name, Severity, SourceRange};
use espresso_semantic::analyze;
use pretty_assertions::assert_eq;

fn unresolved(ast: &mut Ast, parts: &[&str]) -> TypeId {
    let parts = parts.iter().map(|p| Name::from(*p)).collect();
    ast.alloc_type(Type::Unresolved(UnresolvedType::new(
        parts,
        SourceRange::default(),
    )))
}

fn add_unit(
    ast: &mut Ast,
    pkg: &[&str],
    imports: Vec<ImportDecl>,
    body: Option<DeclId>,
) -> UnitId {
    let package = unresolved(ast, pkg);
    let unit = ast.push_unit(CompilationUnit {
        package,
        imports,
        body,
        range: SourceRange::default(),
    });
    if let Some(body) = body {
        ast.set_parent(body, ContextRef::Unit(unit));
    }
    unit
}

fn class_decl(name: &str, class: ClassDecl) -> Decl {
    Decl::new(Name::from(name), SourceRange::default(), DeclKind::Class(class))
}

fn empty_class(ast: &mut Ast, name: &str) -> DeclId {
    let ctor = trivial_ctor(ast, name);
    ast.alloc_decl(class_decl(
        name,
        ClassDecl {
            modifiers: Modifiers::new(),
            super_classes: [None, None],
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: vec![ctor],
        },
    ))
}

fn trivial_ctor(ast: &mut Ast, name: &str) -> DeclId {
    let mut mods = Modifiers::new();
    mods.set(Modifier::Public, SourceRange::default());
    ast.alloc_decl(Decl::new(
        Name::from(name),
        SourceRange::default(),
        DeclKind::Method(MethodDecl {
            modifiers: mods,
            return_ty: None,
            params: Vec::new(),
            locals: Vec::new(),
            is_constructor: true,
            body: None,
        }),
    ))
}

fn wire_members(ast: &mut Ast, class: DeclId) {
    let members: Vec<DeclId> = {
        let c = ast.class(class);
        c.fields
            .iter()
            .chain(&c.methods)
            .chain(&c.constructors)
            .copied()
            .collect()
    };
    for member in members {
        ast.set_parent(member, ContextRef::Decl(class));
    }
}

fn int_literal(ast: &mut Ast, value: i32) -> ExprNode {
    let node = ExprNode::new(
        ExprNodeKind::Literal(LiteralValue::Int(value)),
        SourceRange::default(),
    );
    node.resolve_ty(ast.builtin(espresso_ast::BuiltInKind::Int));
    node
}

fn expr(ast: &mut Ast, nodes: Vec<ExprNode>) -> ExprId {
    ast.alloc_expr(Expr::new(nodes, SourceRange::default()))
}

/// `new Name()` in RPN.
fn new_object(ast: &mut Ast, name: &str) -> ExprId {
    let ty = unresolved(ast, &[name]);
    expr(
        ast,
        vec![
            ExprNode::new(ExprNodeKind::TypeRef(ty), SourceRange::default()),
            ExprNode::new(
                ExprNodeKind::ClassCreation { nargs: 1 },
                SourceRange::default(),
            ),
        ],
    )
}

fn errors(sink: &DiagnosticSink) -> Vec<String> {
    sink.diagnostics()
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.message.clone())
        .collect()
}

/// `A x = new B();` type-checks when `B extends A`, while
/// `B y = new A();` errors naming both types.
#[test]
fn assignability_widens_to_superclass_only() {
    let mut ast = Ast::new();

    let class_a = empty_class(&mut ast, "A");
    wire_members(&mut ast, class_a);

    let super_a = unresolved(&mut ast, &["A"]);
    let ctor_b = trivial_ctor(&mut ast, "B");

    // void m() { A x = new B(); B y = new A(); }
    let x_ty = unresolved(&mut ast, &["A"]);
    let x_init = new_object(&mut ast, "B");
    let scope_root = ast.scopes.fresh(None);
    let x_scope = ast.scopes.next(scope_root);
    let x = ast.alloc_decl(Decl::new(
        Name::from("x"),
        SourceRange::default(),
        DeclKind::Var(VarDecl {
            ty: x_ty,
            init: Some(x_init),
            kind: VarKind::Local,
            scope: x_scope,
        }),
    ));
    let y_ty = unresolved(&mut ast, &["B"]);
    let y_init = new_object(&mut ast, "A");
    let y_scope = ast.scopes.next(x_scope);
    let y = ast.alloc_decl(Decl::new(
        Name::from("y"),
        SourceRange::default(),
        DeclKind::Var(VarDecl {
            ty: y_ty,
            init: Some(y_init),
            kind: VarKind::Local,
            scope: y_scope,
        }),
    ));
    let stmt_x = ast.alloc_stmt(Stmt {
        kind: StmtKind::Decl(x),
        range: SourceRange::default(),
    });
    let stmt_y = ast.alloc_stmt(Stmt {
        kind: StmtKind::Decl(y),
        range: SourceRange::default(),
    });
    let block = ast.alloc_stmt(Stmt {
        kind: StmtKind::Block(vec![stmt_x, stmt_y]),
        range: SourceRange::default(),
    });
    let method = ast.alloc_decl(Decl::new(
        Name::from("m"),
        SourceRange::default(),
        DeclKind::Method(MethodDecl {
            modifiers: Modifiers::new(),
            return_ty: None,
            params: Vec::new(),
            locals: vec![x, y],
            is_constructor: false,
            body: Some(block),
        }),
    ));
    ast.set_parent(x, ContextRef::Decl(method));
    ast.set_parent(y, ContextRef::Decl(method));

    let class_b = ast.alloc_decl(class_decl(
        "B",
        ClassDecl {
            modifiers: Modifiers::new(),
            super_classes: [Some(super_a), None],
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: vec![method],
            constructors: vec![ctor_b],
        },
    ));
    wire_members(&mut ast, class_b);

    add_unit(&mut ast, &[], Vec::new(), Some(class_a));
    add_unit(&mut ast, &[], Vec::new(), Some(class_b));

    let mut sink = DiagnosticSink::new();
    analyze(&mut ast, &mut sink);

    let errors = errors(&sink);
    assert_eq!(errors.len(), 1, "diagnostics: {errors:?}");
    assert!(
        errors[0].contains('A') && errors[0].contains('B'),
        "error must name both types: {}",
        errors[0]
    );
}

/// Two import-on-demand declarations pulling in the same simple name
/// make that name ambiguous.
#[test]
fn ambiguous_import_on_demand() {
    let mut ast = Ast::new();

    let x_in_p = empty_class(&mut ast, "X");
    wire_members(&mut ast, x_in_p);
    add_unit(&mut ast, &["p"], Vec::new(), Some(x_in_p));

    let x_in_q = empty_class(&mut ast, "X");
    wire_members(&mut ast, x_in_q);
    add_unit(&mut ast, &["q"], Vec::new(), Some(x_in_q));

    // class C { X f; } with import p.*; import q.*;
    let field_ty = unresolved(&mut ast, &["X"]);
    let scope = ast.scopes.fresh(None);
    let field = ast.alloc_decl(Decl::new(
        Name::from("f"),
        SourceRange::default(),
        DeclKind::Field(FieldDecl {
            modifiers: Modifiers::new(),
            ty: field_ty,
            init: None,
            scope,
        }),
    ));
    let ctor = trivial_ctor(&mut ast, "C");
    let class_c = ast.alloc_decl(class_decl(
        "C",
        ClassDecl {
            modifiers: Modifiers::new(),
            super_classes: [None, None],
            interfaces: Vec::new(),
            fields: vec![field],
            methods: Vec::new(),
            constructors: vec![ctor],
        },
    ));
    wire_members(&mut ast, class_c);

    let import_p = ImportDecl {
        ty: unresolved(&mut ast, &["p"]),
        is_on_demand: true,
        range: SourceRange::default(),
    };
    let import_q = ImportDecl {
        ty: unresolved(&mut ast, &["q"]),
        is_on_demand: true,
        range: SourceRange::default(),
    };
    add_unit(&mut ast, &[], vec![import_p, import_q], Some(class_c));

    let mut sink = DiagnosticSink::new();
    analyze(&mut ast, &mut sink);

    let errors = errors(&sink);
    assert!(
        errors.iter().any(|e| e.contains("ambiguous import")),
        "expected an ambiguous import error, got {errors:?}"
    );
}

/// `class C { int a = b + 1; int b = 2; }` is a forward reference.
#[test]
fn forward_reference_in_field_initializer() {
    let mut ast = Ast::new();

    let int_ty = ast.builtin(espresso_ast::BuiltInKind::Int);

    // int a = b + 1;
    let lit_one = int_literal(&mut ast, 1);
    let a_init = expr(
        &mut ast,
        vec![
            ExprNode::new(
                ExprNodeKind::MemberName {
                    name: Name::from("b"),
                },
                SourceRange::default(),
            ),
            lit_one,
            ExprNode::new(ExprNodeKind::Binary(BinOp::Add), SourceRange::default()),
        ],
    );
    let a_scope = ast.scopes.fresh(None);
    let a = ast.alloc_decl(Decl::new(
        Name::from("a"),
        SourceRange::default(),
        DeclKind::Field(FieldDecl {
            modifiers: Modifiers::new(),
            ty: int_ty,
            init: Some(a_init),
            scope: a_scope,
        }),
    ));

    // int b = 2;
    let lit_two = int_literal(&mut ast, 2);
    let b_init = expr(&mut ast, vec![lit_two]);
    let b_scope = ast.scopes.next(a_scope);
    let b = ast.alloc_decl(Decl::new(
        Name::from("b"),
        SourceRange::default(),
        DeclKind::Field(FieldDecl {
            modifiers: Modifiers::new(),
            ty: int_ty,
            init: Some(b_init),
            scope: b_scope,
        }),
    ));

    let ctor = trivial_ctor(&mut ast, "C");
    let class_c = ast.alloc_decl(class_decl(
        "C",
        ClassDecl {
            modifiers: Modifiers::new(),
            super_classes: [None, None],
            interfaces: Vec::new(),
            fields: vec![a, b],
            methods: Vec::new(),
            constructors: vec![ctor],
        },
    ));
    wire_members(&mut ast, class_c);
    add_unit(&mut ast, &[], Vec::new(), Some(class_c));

    let mut sink = DiagnosticSink::new();
    analyze(&mut ast, &mut sink);

    let errors = errors(&sink);
    assert!(
        errors.iter().any(|e| e.contains("forward reference")),
        "expected a forward reference error, got {errors:?}"
    );
}

/// `this` inside a static method is a static-use error.
#[test]
fn this_in_static_context() {
    let mut ast = Ast::new();

    let int_ty = ast.builtin(espresso_ast::BuiltInKind::Int);
    let scope = ast.scopes.fresh(None);
    let field = ast.alloc_decl(Decl::new(
        Name::from("x"),
        SourceRange::default(),
        DeclKind::Field(FieldDecl {
            modifiers: Modifiers::new(),
            ty: int_ty,
            init: None,
            scope,
        }),
    ));

    // static int f() { return this.x; }
    let ret_expr = expr(
        &mut ast,
        vec![
            ExprNode::new(ExprNodeKind::This, SourceRange::default()),
            ExprNode::new(
                ExprNodeKind::MemberName {
                    name: Name::from("x"),
                },
                SourceRange::default(),
            ),
            ExprNode::new(ExprNodeKind::MemberAccess, SourceRange::default()),
        ],
    );
    let ret = ast.alloc_stmt(Stmt {
        kind: StmtKind::Return(Some(ret_expr)),
        range: SourceRange::default(),
    });
    let block = ast.alloc_stmt(Stmt {
        kind: StmtKind::Block(vec![ret]),
        range: SourceRange::default(),
    });
    let mut mods = Modifiers::new();
    mods.set(Modifier::Static, SourceRange::default());
    let method = ast.alloc_decl(Decl::new(
        Name::from("f"),
        SourceRange::default(),
        DeclKind::Method(MethodDecl {
            modifiers: mods,
            return_ty: Some(int_ty),
            params: Vec::new(),
            locals: Vec::new(),
            is_constructor: false,
            body: Some(block),
        }),
    ));

    let ctor = trivial_ctor(&mut ast, "C");
    let class_c = ast.alloc_decl(class_decl(
        "C",
        ClassDecl {
            modifiers: Modifiers::new(),
            super_classes: [None, None],
            interfaces: Vec::new(),
            fields: vec![field],
            methods: vec![method],
            constructors: vec![ctor],
        },
    ));
    wire_members(&mut ast, class_c);
    add_unit(&mut ast, &[], Vec::new(), Some(class_c));

    let mut sink = DiagnosticSink::new();
    analyze(&mut ast, &mut sink);

    let errors = errors(&sink);
    assert!(
        errors.iter().any(|e| e.contains("'this' in a static context")),
        "expected a static-use error, got {errors:?}"
    );
}

/// Running the name resolver twice is equivalent to running it once:
/// resolution is monotonic and reports nothing new.
#[test]
fn resolution_is_idempotent() {
    let mut ast = Ast::new();
    let class_a = empty_class(&mut ast, "A");
    wire_members(&mut ast, class_a);
    add_unit(&mut ast, &["p"], Vec::new(), Some(class_a));

    let field_ty = unresolved(&mut ast, &["p", "A"]);

    let mut sink = DiagnosticSink::new();
    let mut resolver = espresso_semantic::NameResolver::build(&mut ast, &mut sink);
    resolver.resolve(&ast, &mut sink);

    let unit = ast.linking_unit()[0];
    resolver.resolve_type(&ast, &mut sink, unit, field_ty);
    let resolved = ast.ty(field_ty).as_decl();
    assert_eq!(resolved, Some(class_a));
    let count = sink.diagnostics().len();

    resolver.resolve(&ast, &mut sink);
    resolver.resolve_type(&ast, &mut sink, unit, field_ty);
    assert_eq!(ast.ty(field_ty).as_decl(), resolved);
    assert_eq!(sink.diagnostics().len(), count, "second run reported diagnostics");
}

/// The type resolver caches op result types: the second walk returns the
/// same type without re-deriving it.
#[test]
fn op_result_types_are_cached() {
    use espresso_semantic::TypeChecker;

    let mut ast = Ast::new();
    let class_c = empty_class(&mut ast, "C");
    wire_members(&mut ast, class_c);
    add_unit(&mut ast, &[], Vec::new(), Some(class_c));

    let one = int_literal(&mut ast, 1);
    let two = int_literal(&mut ast, 2);
    let sum = expr(
        &mut ast,
        vec![
            one,
            two,
            ExprNode::new(ExprNodeKind::Binary(BinOp::Add), SourceRange::default()),
        ],
    );

    let mut sink = DiagnosticSink::new();
    let mut resolver = espresso_semantic::NameResolver::build(&mut ast, &mut sink);
    resolver.resolve(&ast, &mut sink);
    let cached = espresso_semantic::expr_name::CachedTypes::new(&mut ast);

    let first = {
        let mut checker = TypeChecker::new(&resolver, &mut sink, cached);
        checker.check(&ast, ast.expr(sum)).unwrap()
    };
    let node = &ast.expr(sum).nodes()[2];
    assert_eq!(node.result_ty(), first);

    let second = {
        let mut checker = TypeChecker::new(&resolver, &mut sink, cached);
        checker.check(&ast, ast.expr(sum)).unwrap()
    };
    assert_eq!(first, second);
    assert!(sink.diagnostics().is_empty());
}
