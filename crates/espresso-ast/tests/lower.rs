//! Parse-tree → AST lowering: shapes, linearisation, and failure modes.

use espresso_ast::lower::{lower_unit, LowerError};
use espresso_ast::{Ast, BinOp, ExprNodeKind, LiteralValue, StmtKind, UnaryOp};
use espresso_core::{DiagnosticSink, SourceRange};
use espresso_parsetree::{
    BasicTypeKind, LiteralKind, NodeId, NodeKind, OperatorKind, TreeBuilder,
};
use pretty_assertions::assert_eq;

fn r() -> SourceRange {
    SourceRange::default()
}

fn expr1(b: &mut TreeBuilder, child: NodeId) -> NodeId {
    b.node(NodeKind::Expression, r(), vec![Some(child)])
}

fn binary(b: &mut TreeBuilder, lhs: NodeId, op: OperatorKind, rhs: NodeId) -> NodeId {
    let op = b.operator(op, r());
    b.node(NodeKind::Expression, r(), vec![Some(lhs), Some(op), Some(rhs)])
}

fn unary(b: &mut TreeBuilder, op: OperatorKind, operand: NodeId) -> NodeId {
    let op = b.operator(op, r());
    b.node(NodeKind::Expression, r(), vec![Some(op), Some(operand)])
}

fn int_type(b: &mut TreeBuilder) -> NodeId {
    let basic = b.basic_type(BasicTypeKind::Int, r());
    b.node(NodeKind::Type, r(), vec![Some(basic)])
}

/// `class C { int f; void m(int x) { int y = -2147483648; y = x + 1; } }`
fn build_class_tree(b: &mut TreeBuilder) -> NodeId {
    // int f;
    let f_ty = int_type(b);
    let f_name = b.identifier("f", r());
    let f_declarator = b.node(NodeKind::VariableDeclarator, r(), vec![Some(f_name)]);
    let field = b.node(
        NodeKind::FieldDeclaration,
        r(),
        vec![None, Some(f_ty), Some(f_declarator)],
    );

    // int y = -2147483648;
    let min_literal = b.literal(LiteralKind::Integer, "2147483648", r());
    let y_init = unary(b, OperatorKind::Minus, min_literal);
    let y_ty = int_type(b);
    let y_name = b.identifier("y", r());
    let y_declarator = b.node(
        NodeKind::VariableDeclarator,
        r(),
        vec![Some(y_name), Some(y_init)],
    );
    let y_decl = b.node(
        NodeKind::LocalVariableDeclaration,
        r(),
        vec![Some(y_ty), Some(y_declarator)],
    );

    // y = x + 1;
    let x_ref = b.identifier("x", r());
    let one = b.literal(LiteralKind::Integer, "1", r());
    let sum = binary(b, x_ref, OperatorKind::Add, one);
    let y_ref = b.identifier("y", r());
    let assign = binary(b, y_ref, OperatorKind::Assign, sum);
    let assign_stmt = b.node(NodeKind::StatementExpression, r(), vec![Some(assign)]);

    let block = b.node(NodeKind::Block, r(), vec![Some(y_decl), Some(assign_stmt)]);

    // void m(int x)
    let x_ty = int_type(b);
    let x_name = b.identifier("x", r());
    let param = b.node(NodeKind::FormalParameter, r(), vec![Some(x_ty), Some(x_name)]);
    let params = b.node(NodeKind::FormalParameterList, r(), vec![Some(param)]);
    let m_name = b.identifier("m", r());
    let header = b.node(
        NodeKind::MethodHeader,
        r(),
        vec![None, None, Some(m_name), Some(params)],
    );
    let method = b.node(
        NodeKind::MethodDeclaration,
        r(),
        vec![Some(header), Some(block)],
    );

    let body_list = {
        let first = b.node(NodeKind::ClassBodyDeclarationList, r(), vec![Some(field)]);
        b.node(
            NodeKind::ClassBodyDeclarationList,
            r(),
            vec![Some(first), Some(method)],
        )
    };
    let class_name = b.identifier("C", r());
    b.node(
        NodeKind::ClassDeclaration,
        r(),
        vec![None, Some(class_name), None, None, Some(body_list)],
    )
}

fn node_kinds(ast: &Ast, expr: espresso_ast::ExprId) -> Vec<ExprNodeKind> {
    ast.expr(expr).nodes().iter().map(|n| n.kind.clone()).collect()
}

#[test]
fn lowers_a_class_with_field_and_method() {
    let mut b = TreeBuilder::new();
    let class = build_class_tree(&mut b);
    let unit = b.node(NodeKind::CompilationUnit, r(), vec![None, None, Some(class)]);
    let tree = b.finish();

    let mut ast = Ast::new();
    let mut sink = DiagnosticSink::new();
    let unit = lower_unit(&tree, unit, &mut ast, &mut sink).expect("lowering succeeds");
    assert!(sink.diagnostics().is_empty(), "{:?}", sink.diagnostics());

    let body = ast.unit(unit).body.expect("unit has a class");
    let class = ast.class(body);
    assert_eq!(class.fields.len(), 1);
    assert_eq!(class.methods.len(), 1);
    assert!(class.constructors.is_empty());

    let method = ast.method(class.methods[0]);
    assert_eq!(method.params.len(), 1);
    assert_eq!(method.locals.len(), 1);
    assert!(method.return_ty.is_none());

    // The local's initializer folded the sign into the literal.
    let local = ast.var(method.locals[0]);
    let init = local.init.expect("y has an initializer");
    let kinds = node_kinds(&ast, init);
    assert_eq!(kinds.len(), 1);
    assert!(matches!(
        kinds[0],
        ExprNodeKind::Literal(LiteralValue::Int(i32::MIN))
    ));

    // y = x + 1  ==>  y x 1 + =
    let root = method.body.expect("method body");
    let StmtKind::Block(stmts) = &ast.stmt(root).kind else {
        panic!("method body is a block");
    };
    let StmtKind::Expr(assign) = &ast.stmt(stmts[1]).kind else {
        panic!("second statement is an expression");
    };
    let kinds = node_kinds(&ast, *assign);
    assert!(matches!(&kinds[0], ExprNodeKind::MemberName { name } if name == "y"));
    assert!(matches!(&kinds[1], ExprNodeKind::MemberName { name } if name == "x"));
    assert!(matches!(kinds[2], ExprNodeKind::Literal(LiteralValue::Int(1))));
    assert!(matches!(kinds[3], ExprNodeKind::Binary(BinOp::Add)));
    assert!(matches!(kinds[4], ExprNodeKind::Binary(BinOp::Assignment)));

    // Parents were wired exactly once, to the right contexts.
    let class_parent = ast.decl(body).parent();
    assert!(matches!(class_parent, Some(espresso_ast::ContextRef::Unit(u)) if u == unit));
    assert_eq!(ast.canonical_name(class.methods[0]).as_deref(), Some("C.m"));
}

#[test]
fn method_invocation_linearises_receiver_then_args() {
    let mut b = TreeBuilder::new();
    // o.m(a);
    let receiver = b.identifier("o", r());
    let method = b.identifier("m", r());
    let arg = b.identifier("a", r());
    let arg = expr1(&mut b, arg);
    let args = b.node(NodeKind::ArgumentList, r(), vec![Some(arg)]);
    let call = b.node(
        NodeKind::MethodInvocation,
        r(),
        vec![Some(receiver), Some(method), Some(args)],
    );
    let call = expr1(&mut b, call);
    let call_stmt = b.node(NodeKind::StatementExpression, r(), vec![Some(call)]);
    let block = b.node(NodeKind::Block, r(), vec![Some(call_stmt)]);
    let name = b.identifier("f", r());
    let header = b.node(NodeKind::MethodHeader, r(), vec![None, None, Some(name), None]);
    let method = b.node(NodeKind::MethodDeclaration, r(), vec![Some(header), Some(block)]);
    let body_list = b.node(NodeKind::ClassBodyDeclarationList, r(), vec![Some(method)]);
    let class_name = b.identifier("C", r());
    let class = b.node(
        NodeKind::ClassDeclaration,
        r(),
        vec![None, Some(class_name), None, None, Some(body_list)],
    );
    let unit = b.node(NodeKind::CompilationUnit, r(), vec![None, None, Some(class)]);
    let tree = b.finish();

    let mut ast = Ast::new();
    let mut sink = DiagnosticSink::new();
    let unit = lower_unit(&tree, unit, &mut ast, &mut sink).expect("lowering succeeds");

    let body = ast.unit(unit).body.unwrap();
    let method = ast.class(body).methods[0];
    let root = ast.method(method).body.unwrap();
    let mut exprs = Vec::new();
    ast.stmt_exprs(root, &mut exprs);
    let kinds = node_kinds(&ast, exprs[0]);

    assert!(matches!(&kinds[0], ExprNodeKind::MemberName { name } if name == "o"));
    assert!(matches!(&kinds[1], ExprNodeKind::MethodName { name } if name == "m"));
    assert!(matches!(kinds[2], ExprNodeKind::MemberAccess));
    assert!(matches!(&kinds[3], ExprNodeKind::MemberName { name } if name == "a"));
    assert!(matches!(
        kinds[4],
        ExprNodeKind::MethodInvocation { nargs: 2 }
    ));
}

#[test]
fn poisoned_tree_produces_no_ast() {
    let mut b = TreeBuilder::new();
    let bad = b.poison(r());
    let unit = b.node(NodeKind::CompilationUnit, r(), vec![None, None, Some(bad)]);
    let tree = b.finish();

    let mut ast = Ast::new();
    let mut sink = DiagnosticSink::new();
    let result = lower_unit(&tree, unit, &mut ast, &mut sink);
    assert_eq!(result.unwrap_err(), LowerError::Poisoned);
    // The parser's diagnostic stands; lowering adds nothing.
    assert!(sink.diagnostics().is_empty());
    assert!(ast.linking_unit().is_empty());
}

#[test]
fn shape_mismatch_is_a_fatal_builder_error() {
    let mut b = TreeBuilder::new();
    // A compilation unit with too few children.
    let unit = b.node(NodeKind::CompilationUnit, r(), vec![None]);
    let tree = b.finish();

    let mut ast = Ast::new();
    let mut sink = DiagnosticSink::new();
    let result = lower_unit(&tree, unit, &mut ast, &mut sink);
    assert_eq!(result.unwrap_err(), LowerError::Shape);
    assert_eq!(sink.error_count(), 1);
    assert_eq!(sink.diagnostics()[0].code, "builder");
}

#[test]
fn unary_minus_on_non_literal_stays_an_op() {
    let mut b = TreeBuilder::new();
    // -x
    let x = b.identifier("x", r());
    let neg = unary(&mut b, OperatorKind::Minus, x);
    let stmt = b.node(NodeKind::StatementExpression, r(), vec![Some(neg)]);
    let block = b.node(NodeKind::Block, r(), vec![Some(stmt)]);
    let name = b.identifier("f", r());
    let header = b.node(NodeKind::MethodHeader, r(), vec![None, None, Some(name), None]);
    let method = b.node(NodeKind::MethodDeclaration, r(), vec![Some(header), Some(block)]);
    let members = b.node(NodeKind::ClassBodyDeclarationList, r(), vec![Some(method)]);
    let class_name = b.identifier("C", r());
    let class = b.node(
        NodeKind::ClassDeclaration,
        r(),
        vec![None, Some(class_name), None, None, Some(members)],
    );
    let unit = b.node(NodeKind::CompilationUnit, r(), vec![None, None, Some(class)]);
    let tree = b.finish();

    let mut ast = Ast::new();
    let mut sink = DiagnosticSink::new();
    let unit = lower_unit(&tree, unit, &mut ast, &mut sink).unwrap();

    let body = ast.unit(unit).body.unwrap();
    let method = ast.class(body).methods[0];
    let root = ast.method(method).body.unwrap();
    let mut exprs = Vec::new();
    ast.stmt_exprs(root, &mut exprs);
    let kinds = node_kinds(&ast, exprs[0]);
    assert_eq!(kinds.len(), 2);
    assert!(matches!(&kinds[0], ExprNodeKind::MemberName { name } if name == "x"));
    assert!(matches!(kinds[1], ExprNodeKind::Unary(UnaryOp::Minus)));
}
