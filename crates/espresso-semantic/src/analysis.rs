//! The pass driver.
//!
//! Runs the phases of §semantic analysis in order over a whole linking
//! unit, short-circuiting the expression passes when name resolution
//! already failed. Statement-level rules (initializer assignability,
//! boolean conditions, return typing) live here because they sit between
//! two expression walks.

use espresso_ast::{
    Ast, DeclId, DeclKind, ExprId, StmtId, StmtKind, TypeId, UnitId,
};
use espresso_core::{DiagnosticSink, SourceRange};

use crate::expr_name::{CachedTypes, ExprContext, ExprNameResolver};
use crate::resolver::NameResolver;
use crate::static_check::StaticChecker;
use crate::typeck::TypeChecker;

/// Runs every semantic phase. Returns the resolver so later phases (code
/// generation) can reuse the symbol table, built-ins, and array
/// prototype.
pub fn analyze(ast: &mut Ast, sink: &mut DiagnosticSink) -> NameResolver {
    let mut resolver = NameResolver::build(ast, sink);
    resolver.resolve(ast, sink);
    if !sink.has_errors() {
        analyze_exprs(ast, &resolver, sink);
    }
    resolver
}

/// Name-resolves, types, and static-checks every expression in the
/// linking unit.
pub fn analyze_exprs(ast: &mut Ast, resolver: &NameResolver, sink: &mut DiagnosticSink) {
    let cached = CachedTypes::new(ast);
    let units: Vec<UnitId> = ast.linking_unit().to_vec();
    for unit in units {
        let Some(body) = ast.unit(unit).body else {
            continue;
        };
        let DeclKind::Class(class) = &ast.decl(body).kind else {
            // Interface methods are abstract; nothing to check.
            continue;
        };
        let fields = class.fields.clone();
        let methods: Vec<DeclId> =
            class.methods.iter().chain(&class.constructors).copied().collect();

        for field in fields {
            let data = ast.field(field);
            let Some(init) = data.init else { continue };
            let is_static = data.modifiers.is_static();
            let field_init = (!is_static).then_some((body, data.scope));
            let ctx = ExprContext {
                unit,
                class: body,
                method: None,
            };
            let declared = data.ty;
            let range = ast.decl(field).range();
            check_initializer(
                ast, resolver, sink, cached, ctx, is_static, field_init, init, declared, range,
            );
        }

        for method in methods {
            let data = ast.method(method);
            let Some(root) = data.body else { continue };
            let is_static = data.modifiers.is_static();
            let return_ty = data.return_ty;
            let ctx = ExprContext {
                unit,
                class: body,
                method: Some(method),
            };
            check_stmt(ast, resolver, sink, cached, ctx, is_static, return_ty, root);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn check_stmt(
    ast: &Ast,
    resolver: &NameResolver,
    sink: &mut DiagnosticSink,
    cached: CachedTypes,
    ctx: ExprContext,
    is_static: bool,
    return_ty: Option<TypeId>,
    stmt: StmtId,
) {
    let range = ast.stmt(stmt).range;
    match &ast.stmt(stmt).kind {
        StmtKind::Block(stmts) => {
            for &s in stmts {
                check_stmt(ast, resolver, sink, cached, ctx, is_static, return_ty, s);
            }
        }
        StmtKind::Decl(var) => {
            let data = ast.var(*var);
            if let Some(init) = data.init {
                check_initializer(
                    ast, resolver, sink, cached, ctx, is_static, None, init, data.ty,
                    ast.decl(*var).range(),
                );
            }
        }
        StmtKind::Expr(expr) => {
            run_expr(ast, resolver, sink, cached, ctx, is_static, None, *expr);
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            check_condition(ast, resolver, sink, cached, ctx, is_static, *cond);
            check_stmt(
                ast, resolver, sink, cached, ctx, is_static, return_ty, *then_branch,
            );
            if let Some(else_branch) = else_branch {
                check_stmt(
                    ast, resolver, sink, cached, ctx, is_static, return_ty, *else_branch,
                );
            }
        }
        StmtKind::While { cond, body } => {
            check_condition(ast, resolver, sink, cached, ctx, is_static, *cond);
            check_stmt(ast, resolver, sink, cached, ctx, is_static, return_ty, *body);
        }
        StmtKind::For {
            init,
            cond,
            update,
            body,
        } => {
            if let Some(init) = init {
                check_stmt(ast, resolver, sink, cached, ctx, is_static, return_ty, *init);
            }
            if let Some(cond) = cond {
                check_condition(ast, resolver, sink, cached, ctx, is_static, *cond);
            }
            if let Some(update) = update {
                check_stmt(
                    ast, resolver, sink, cached, ctx, is_static, return_ty, *update,
                );
            }
            check_stmt(ast, resolver, sink, cached, ctx, is_static, return_ty, *body);
        }
        StmtKind::Return(expr) => match (expr, return_ty) {
            (Some(expr), Some(return_ty)) => {
                let Some(ty) = run_expr(ast, resolver, sink, cached, ctx, is_static, None, *expr)
                else {
                    return;
                };
                let checker = TypeChecker::new(resolver, sink, cached);
                let assignable =
                    ty.is_some_and(|ty| checker.is_assignable_to(ast, return_ty, ty));
                if !assignable {
                    let found = ty.map_or_else(|| "void".to_string(), |t| ast.type_string(t));
                    sink.report_error(
                        "type",
                        format!(
                            "invalid return, {found} is not assignable to {}",
                            ast.type_string(return_ty)
                        ),
                        range,
                    );
                }
            }
            (Some(expr), None) => {
                run_expr(ast, resolver, sink, cached, ctx, is_static, None, *expr);
                sink.report_error("type", "cannot return a value from a void method", range);
            }
            (None, Some(_)) => {
                sink.report_error("type", "missing return value", range);
            }
            (None, None) => {}
        },
        StmtKind::Empty => {}
    }
}

#[allow(clippy::too_many_arguments)]
fn check_condition(
    ast: &Ast,
    resolver: &NameResolver,
    sink: &mut DiagnosticSink,
    cached: CachedTypes,
    ctx: ExprContext,
    is_static: bool,
    cond: ExprId,
) {
    let range = ast.expr(cond).range();
    let Some(ty) = run_expr(ast, resolver, sink, cached, ctx, is_static, None, cond) else {
        return;
    };
    let boolean = ty.is_some_and(|ty| ast.ty(ty).is_boolean());
    if !boolean {
        sink.report_error("type", "condition must be a boolean", range);
    }
}

#[allow(clippy::too_many_arguments)]
fn check_initializer(
    ast: &Ast,
    resolver: &NameResolver,
    sink: &mut DiagnosticSink,
    cached: CachedTypes,
    ctx: ExprContext,
    is_static: bool,
    field_init: Option<(DeclId, espresso_ast::ScopeId)>,
    init: ExprId,
    declared: TypeId,
    range: SourceRange,
) {
    let Some(ty) = run_expr(ast, resolver, sink, cached, ctx, is_static, field_init, init) else {
        return;
    };
    let checker = TypeChecker::new(resolver, sink, cached);
    let assignable = ty.is_some_and(|ty| checker.is_assignable_to(ast, declared, ty));
    if !assignable {
        let found = ty.map_or_else(|| "void".to_string(), |t| ast.type_string(t));
        sink.report_error(
            "type",
            format!(
                "invalid initializer, {found} is not assignable to {}",
                ast.type_string(declared)
            ),
            range,
        );
    }
}

/// Runs the three expression passes over one expression. Returns the
/// expression's type (`Some(None)` for void) unless a pass aborted.
#[allow(clippy::too_many_arguments)]
fn run_expr(
    ast: &Ast,
    resolver: &NameResolver,
    sink: &mut DiagnosticSink,
    cached: CachedTypes,
    ctx: ExprContext,
    is_static: bool,
    field_init: Option<(DeclId, espresso_ast::ScopeId)>,
    expr: ExprId,
) -> Option<Option<TypeId>> {
    let expr = ast.expr(expr);
    let mut names = ExprNameResolver::new(resolver, sink, ctx, cached);
    names.resolve(ast, expr).ok()?;

    let mut types = TypeChecker::new(resolver, sink, cached);
    let ty = types.check(ast, expr).ok()?;

    let mut statics = StaticChecker::new(sink, is_static, field_init);
    statics.check(ast, expr).ok()?;

    Some(ty)
}
