//! Lowering scenarios: short-circuit control flow and array bounds
//! checks, asserted against the emitted IR structure.

use espresso_ast::{
    Ast, BinOp, BuiltInKind, ClassDecl, CompilationUnit, ContextRef, Decl, DeclId, DeclKind,
    Expr, ExprId, ExprNode, ExprNodeKind, FieldDecl, MethodDecl, Modifier, Modifiers, Stmt,
    StmtId, StmtKind, Type, TypeId, VarDecl, VarKind,
};
use espresso_core::{DiagnosticSink, Name, SourceRange};
use espresso_semantic::analyze;
use espresso_tir::{parse_module, structurally_equal, Module, Opcode, Ty, ValueId};

fn range() -> SourceRange {
    SourceRange::default()
}

fn name_node(name: &str) -> ExprNode {
    ExprNode::new(
        ExprNodeKind::MemberName {
            name: Name::from(name),
        },
        range(),
    )
}

fn static_bool_field(ast: &mut Ast, name: &str, scope: espresso_ast::ScopeId) -> DeclId {
    let ty = ast.builtin(BuiltInKind::Boolean);
    let mut mods = Modifiers::new();
    mods.set(Modifier::Static, range());
    ast.alloc_decl(Decl::new(
        Name::from(name),
        range(),
        DeclKind::Field(FieldDecl {
            modifiers: mods,
            ty,
            init: None,
            scope,
        }),
    ))
}

fn finish_class(ast: &mut Ast, name: &str, class: ClassDecl) -> DeclId {
    let decl = ast.alloc_decl(Decl::new(Name::from(name), range(), DeclKind::Class(class)));
    let members: Vec<DeclId> = {
        let c = ast.class(decl);
        c.fields
            .iter()
            .chain(&c.methods)
            .chain(&c.constructors)
            .copied()
            .collect()
    };
    for member in members {
        ast.set_parent(member, ContextRef::Decl(decl));
    }
    let package = ast.alloc_type(Type::Unresolved(espresso_ast::UnresolvedType::new(
        Vec::new(),
        range(),
    )));
    let unit = ast.push_unit(CompilationUnit {
        package,
        imports: Vec::new(),
        body: Some(decl),
        range: range(),
    });
    ast.set_parent(decl, ContextRef::Unit(unit));
    decl
}

fn expr(ast: &mut Ast, nodes: Vec<ExprNode>) -> ExprId {
    ast.alloc_expr(Expr::new(nodes, range()))
}

fn stmt(ast: &mut Ast, kind: StmtKind) -> StmtId {
    ast.alloc_stmt(Stmt { kind, range: range() })
}

fn static_method(
    ast: &mut Ast,
    name: &str,
    return_ty: Option<TypeId>,
    params: Vec<DeclId>,
    locals: Vec<DeclId>,
    body: StmtId,
) -> DeclId {
    let mut mods = Modifiers::new();
    mods.set(Modifier::Static, range());
    let method = ast.alloc_decl(Decl::new(
        Name::from(name),
        range(),
        DeclKind::Method(MethodDecl {
            modifiers: mods,
            return_ty,
            params: params.clone(),
            locals: locals.clone(),
            is_constructor: false,
            body: Some(body),
        }),
    ));
    for var in params.iter().chain(&locals) {
        ast.set_parent(*var, ContextRef::Decl(method));
    }
    method
}

fn emit(ast: &mut Ast) -> Module {
    let mut sink = DiagnosticSink::new();
    let resolver = analyze(ast, &mut sink);
    assert!(
        !sink.has_errors(),
        "semantic analysis failed: {:?}",
        sink.diagnostics()
    );
    espresso_codegen::emit_module(ast, &resolver)
}

fn function_instrs(m: &Module, function: ValueId) -> Vec<ValueId> {
    m.function(function)
        .blocks
        .iter()
        .flat_map(|&bb| m.block(bb).instrs.iter().copied())
        .collect()
}

/// `r = p && q;` lowers to one scratch `alloca i1`, two branches, and
/// two stores into the scratch slot.
#[test]
fn short_circuit_and_lowering() {
    let mut ast = Ast::new();

    let s0 = ast.scopes.fresh(None);
    let p = static_bool_field(&mut ast, "p", s0);
    let s1 = ast.scopes.next(s0);
    let q = static_bool_field(&mut ast, "q", s1);
    let s2 = ast.scopes.next(s1);
    let r = static_bool_field(&mut ast, "r", s2);

    // r = p && q;
    let assign = expr(
        &mut ast,
        vec![
            name_node("r"),
            name_node("p"),
            name_node("q"),
            ExprNode::new(ExprNodeKind::Binary(BinOp::And), range()),
            ExprNode::new(ExprNodeKind::Binary(BinOp::Assignment), range()),
        ],
    );
    let body = stmt(&mut ast, StmtKind::Expr(assign));
    let block = stmt(&mut ast, StmtKind::Block(vec![body]));
    let method = static_method(&mut ast, "f", None, Vec::new(), Vec::new(), block);

    finish_class(
        &mut ast,
        "C",
        ClassDecl {
            modifiers: Modifiers::new(),
            super_classes: [None, None],
            interfaces: Vec::new(),
            fields: vec![p, q, r],
            methods: vec![method],
            constructors: Vec::new(),
        },
    );

    let m = emit(&mut ast);
    let f = m.find_function("C.f").expect("function emitted");
    assert_eq!(m.function(f).blocks.len(), 3, "{}", m.display());

    let instrs = function_instrs(&m, f);
    let allocas: Vec<ValueId> = instrs
        .iter()
        .copied()
        .filter(|&i| matches!(m.instr(i).opcode, Opcode::Alloca { .. }))
        .collect();
    assert_eq!(allocas.len(), 1, "{}", m.display());
    let scratch = allocas[0];
    let Opcode::Alloca { alloc_ty } = m.instr(scratch).opcode else {
        unreachable!()
    };
    assert!(matches!(m.ctx.ty(alloc_ty), Ty::Integer(1)));

    let branches = instrs
        .iter()
        .filter(|&&i| matches!(m.instr(i).opcode, Opcode::Br))
        .count();
    assert_eq!(branches, 2, "{}", m.display());

    let stores_to_scratch = instrs
        .iter()
        .filter(|&&i| {
            matches!(m.instr(i).opcode, Opcode::Store)
                && m.instr(i).operands[1] == scratch
        })
        .count();
    assert_eq!(stores_to_scratch, 2, "{}", m.display());

    let text = m.display().to_string();
    assert!(text.contains("%and.true."), "{text}");
    assert!(text.contains("%and.false."), "{text}");
}

/// `a[i]` loads the length, compares `i` against it, and calls
/// `__exception` in the out-of-bounds block before the in-bounds load.
#[test]
fn array_access_emits_bounds_check() {
    let mut ast = Ast::new();

    let int_ty = ast.builtin(BuiltInKind::Int);
    let arr_ty = ast.alloc_type(Type::Array(int_ty));
    let s0 = ast.scopes.fresh(None);
    let a = ast.alloc_decl(Decl::new(
        Name::from("a"),
        range(),
        DeclKind::Var(VarDecl {
            ty: arr_ty,
            init: None,
            kind: VarKind::Param,
            scope: s0,
        }),
    ));
    let s1 = ast.scopes.next(s0);
    let i = ast.alloc_decl(Decl::new(
        Name::from("i"),
        range(),
        DeclKind::Var(VarDecl {
            ty: int_ty,
            init: None,
            kind: VarKind::Param,
            scope: s1,
        }),
    ));

    // return a[i];
    let access = expr(
        &mut ast,
        vec![
            name_node("a"),
            name_node("i"),
            ExprNode::new(ExprNodeKind::ArrayAccess, range()),
        ],
    );
    let ret = stmt(&mut ast, StmtKind::Return(Some(access)));
    let block = stmt(&mut ast, StmtKind::Block(vec![ret]));
    let method = static_method(&mut ast, "g", Some(int_ty), vec![a, i], Vec::new(), block);

    finish_class(
        &mut ast,
        "C",
        ClassDecl {
            modifiers: Modifiers::new(),
            super_classes: [None, None],
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: vec![method],
            constructors: Vec::new(),
        },
    );

    let m = emit(&mut ast);
    let g = m.find_function("C.g").expect("function emitted");
    let text = m.display().to_string();

    let instrs = function_instrs(&m, g);
    let cmps = instrs
        .iter()
        .filter(|&&i| {
            matches!(
                m.instr(i).opcode,
                Opcode::Cmp(espresso_tir::Predicate::Lt)
            )
        })
        .count();
    assert_eq!(cmps, 1, "{text}");

    // The out-of-bounds block calls the exception intrinsic, then joins
    // the in-bounds path.
    let oob = m
        .function(g)
        .blocks
        .iter()
        .copied()
        .find(|&bb| m.value(bb).name.as_deref() == Some("array.oob"))
        .expect("out-of-bounds block");
    let oob_instrs = &m.block(oob).instrs;
    assert!(matches!(m.instr(oob_instrs[0]).opcode, Opcode::Call));
    assert!(matches!(m.instr(oob_instrs[1]).opcode, Opcode::Br));
    assert!(text.contains("call @__exception() noreturn"), "{text}");

    // The element load happens in the in-bounds block.
    let inbounds = m
        .function(g)
        .blocks
        .iter()
        .copied()
        .find(|&bb| m.value(bb).name.as_deref() == Some("array.inbounds"))
        .expect("in-bounds block");
    assert!(m.block(inbounds)
        .instrs
        .iter()
        .any(|&i| matches!(m.instr(i).opcode, Opcode::Load { .. })));
}

/// Emitted IR survives a print/parse round-trip (§printable form).
#[test]
fn emitted_ir_round_trips_through_text() {
    let mut ast = Ast::new();

    let int_ty = ast.builtin(BuiltInKind::Int);
    let s0 = ast.scopes.fresh(None);
    let x = ast.alloc_decl(Decl::new(
        Name::from("x"),
        range(),
        DeclKind::Var(VarDecl {
            ty: int_ty,
            init: None,
            kind: VarKind::Param,
            scope: s0,
        }),
    ));
    let one = {
        let node = ExprNode::new(
            ExprNodeKind::Literal(espresso_ast::LiteralValue::Int(1)),
            range(),
        );
        node.resolve_ty(int_ty);
        node
    };
    let sum = expr(
        &mut ast,
        vec![
            name_node("x"),
            one,
            ExprNode::new(ExprNodeKind::Binary(BinOp::Add), range()),
        ],
    );
    let ret = stmt(&mut ast, StmtKind::Return(Some(sum)));
    let block = stmt(&mut ast, StmtKind::Block(vec![ret]));
    let method = static_method(&mut ast, "inc", Some(int_ty), vec![x], Vec::new(), block);

    finish_class(
        &mut ast,
        "C",
        ClassDecl {
            modifiers: Modifiers::new(),
            super_classes: [None, None],
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: vec![method],
            constructors: Vec::new(),
        },
    );

    let m = emit(&mut ast);
    let text = m.display().to_string();
    let reparsed = parse_module(&text).expect("emitted IR parses");
    assert!(
        structurally_equal(&m, &reparsed),
        "round trip changed the module:\n{text}"
    );
}
