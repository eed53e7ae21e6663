//! Static-use checking.
//!
//! Runs after type resolution over the same RPN lists, tracking per-value
//! `{decl, type, is_value, is_instance_var}`. Enforces:
//! - no `this` in a static context,
//! - no instance member access or invocation in a static context,
//! - no static field access through an instance,
//! - the forward-reference rule inside instance field initializers.

use espresso_ast::{
    evaluate, Ast, BinOp, DeclId, DeclKind, EvalAbort, EvalResult, Expr, ExprEvaluator,
    ExprNode, ExprNodeKind, ScopeId, TypeId, UnaryOp,
};
use espresso_core::{DiagnosticSink, SourceRange};

#[derive(Clone, Debug)]
pub struct StaticValue {
    pub decl: Option<DeclId>,
    pub ty: Option<TypeId>,
    pub is_value: bool,
    pub is_instance_var: bool,
    /// Set on a method name that was reached through an explicit receiver.
    pub has_receiver: bool,
    /// A simple-name reference that would reach forward in the enclosing
    /// initializer. Reported only if the value is *used* as a value: the
    /// field position of `this.b` is resolved by the access op instead,
    /// where the rule does not apply (JLS 8.3.2.3).
    pub forward_ref: Option<espresso_core::Name>,
}

impl StaticValue {
    fn value(ty: Option<TypeId>) -> Self {
        Self {
            decl: None,
            ty,
            is_value: true,
            is_instance_var: false,
            has_receiver: false,
            forward_ref: None,
        }
    }

    fn type_name(ty: Option<TypeId>, decl: Option<DeclId>) -> Self {
        Self {
            decl,
            ty,
            is_value: false,
            is_instance_var: false,
            has_receiver: false,
            forward_ref: None,
        }
    }
}

pub struct StaticChecker<'a> {
    sink: &'a mut DiagnosticSink,
    is_static_context: bool,
    /// When checking an instance field initializer: the enclosing class
    /// and the initializer's lexical position.
    field_init: Option<(DeclId, ScopeId)>,
}

impl<'a> StaticChecker<'a> {
    pub fn new(
        sink: &'a mut DiagnosticSink,
        is_static_context: bool,
        field_init: Option<(DeclId, ScopeId)>,
    ) -> Self {
        Self {
            sink,
            is_static_context,
            field_init,
        }
    }

    pub fn check(&mut self, ast: &Ast, expr: &Expr) -> EvalResult<()> {
        let single = evaluate(self, ast, expr)?;
        // A lone member access still needs its instance-use check.
        self.check_instance_var(expr.range(), &single)
    }

    fn error(&mut self, message: impl Into<String>, range: SourceRange) -> EvalAbort {
        self.sink.report_error("static-use", message.into(), range);
        EvalAbort
    }

    fn check_instance_var(&mut self, range: SourceRange, v: &StaticValue) -> EvalResult<()> {
        if let Some(name) = &v.forward_ref {
            let message = format!("forward reference to field \"{name}\" in initializer");
            return Err(self.error(message, range));
        }
        if !v.is_instance_var {
            return Ok(());
        }
        if self.is_static_context {
            return Err(self.error(
                "cannot access or invoke instance members in a static context",
                range,
            ));
        }
        Ok(())
    }
}

fn is_decl_static(ast: &Ast, decl: DeclId) -> bool {
    ast.decl(decl)
        .modifiers()
        .is_some_and(|mods| mods.is_static())
}

/// A member declaration whose parent is a class, without `static`, is an
/// instance member.
fn is_instance_member(ast: &Ast, decl: DeclId) -> bool {
    let parent_is_class = matches!(
        ast.decl(decl).parent(),
        Some(espresso_ast::ContextRef::Decl(parent))
            if matches!(ast.decl(parent).kind, DeclKind::Class(_))
    );
    parent_is_class && !is_decl_static(ast, decl)
}

impl ExprEvaluator for StaticChecker<'_> {
    type Value = StaticValue;

    fn map_value(&mut self, ast: &Ast, node: &ExprNode) -> EvalResult<StaticValue> {
        match &node.kind {
            ExprNodeKind::This => {
                if self.is_static_context {
                    return Err(self.error("cannot use 'this' in a static context", node.range));
                }
                Ok(StaticValue::value(node.ty()))
            }
            ExprNodeKind::Literal(_) => Ok(StaticValue::value(node.ty())),
            ExprNodeKind::TypeRef(ty) => Ok(StaticValue::type_name(Some(*ty), None)),
            ExprNodeKind::MethodName { .. } => Ok(StaticValue::value(None)),
            ExprNodeKind::MemberName { .. } => {
                let Some(decl) = node.decl() else {
                    // Field position of a member access; checked at the op.
                    return Ok(StaticValue::value(None));
                };
                // A simple name that resolved to a type.
                if matches!(
                    ast.decl(decl).kind,
                    DeclKind::Class(_) | DeclKind::Interface(_)
                ) {
                    return Ok(StaticValue::type_name(node.ty(), Some(decl)));
                }

                // Simple-name references to fields of the enclosing class
                // must not reach forward in an initializer (JLS 8.3.2.3).
                // Flagged here, reported when the value is consumed.
                let mut forward_ref = None;
                if let (Some((class, init_scope)), DeclKind::Field(field)) =
                    (self.field_init, &ast.decl(decl).kind)
                {
                    let same_class = matches!(
                        ast.decl(decl).parent(),
                        Some(espresso_ast::ContextRef::Decl(parent)) if parent == class
                    );
                    if same_class && !ast.scopes.can_view(init_scope, field.scope) {
                        forward_ref = Some(ast.decl(decl).name().clone());
                    }
                }

                Ok(StaticValue {
                    decl: Some(decl),
                    ty: node.ty(),
                    is_value: true,
                    is_instance_var: is_instance_member(ast, decl),
                    has_receiver: false,
                    forward_ref,
                })
            }
            op => unreachable!("op node {op:?} in map_value"),
        }
    }

    fn eval_member_access(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        lhs: StaticValue,
        _field: StaticValue,
    ) -> EvalResult<StaticValue> {
        self.check_instance_var(range, &lhs)?;

        let Some(member) = node.decl() else {
            // Method position; the invocation op holds the decl.
            let mut v = StaticValue::value(None);
            v.has_receiver = true;
            return Ok(v);
        };

        // A package-qualified type name is not a value.
        if matches!(
            ast.decl(member).kind,
            DeclKind::Class(_) | DeclKind::Interface(_)
        ) {
            return Ok(StaticValue::type_name(node.ty(), Some(member)));
        }

        if lhs.is_value {
            if is_decl_static(ast, member) {
                return Err(self.error(
                    "cannot access a static field through an instance variable",
                    range,
                ));
            }
        } else if is_instance_member(ast, member) {
            return Err(self.error(
                format!(
                    "cannot access instance field \"{}\" through a type name",
                    ast.decl(member).name()
                ),
                range,
            ));
        }

        Ok(StaticValue {
            decl: Some(member),
            ty: node.ty(),
            is_value: true,
            // The access result is a plain value; only the *simple name*
            // form of an instance field counts as an instance-var use.
            is_instance_var: false,
            has_receiver: false,
            forward_ref: None,
        })
    }

    fn eval_method_call(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        method: StaticValue,
        args: &[StaticValue],
    ) -> EvalResult<StaticValue> {
        for arg in args {
            self.check_instance_var(range, arg)?;
        }
        if let Some(decl) = node.decl() {
            let instance = is_instance_member(ast, decl);
            if instance && !method.has_receiver && self.is_static_context {
                return Err(self.error(
                    "cannot access or invoke instance members in a static context",
                    range,
                ));
            }
        }
        Ok(StaticValue::value(node.result_ty()))
    }

    fn eval_new_object(
        &mut self,
        _ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        ty: StaticValue,
        args: &[StaticValue],
    ) -> EvalResult<StaticValue> {
        assert!(!ty.is_value, "operand of new is not a type");
        for arg in args {
            self.check_instance_var(range, arg)?;
        }
        Ok(StaticValue::value(node.result_ty()))
    }

    fn eval_new_array(
        &mut self,
        _ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        ty: StaticValue,
        size: StaticValue,
    ) -> EvalResult<StaticValue> {
        assert!(!ty.is_value, "operand of new[] is not a type");
        self.check_instance_var(range, &size)?;
        Ok(StaticValue::value(node.result_ty()))
    }

    fn eval_array_access(
        &mut self,
        _ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        array: StaticValue,
        index: StaticValue,
    ) -> EvalResult<StaticValue> {
        self.check_instance_var(range, &array)?;
        self.check_instance_var(range, &index)?;
        Ok(StaticValue::value(node.result_ty()))
    }

    fn eval_cast(
        &mut self,
        _ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        ty: StaticValue,
        value: StaticValue,
    ) -> EvalResult<StaticValue> {
        assert!(!ty.is_value, "cast target is not a type");
        self.check_instance_var(range, &value)?;
        Ok(StaticValue::value(node.result_ty()))
    }

    fn eval_binary_op(
        &mut self,
        _ast: &Ast,
        node: &ExprNode,
        _op: BinOp,
        range: SourceRange,
        lhs: StaticValue,
        rhs: StaticValue,
    ) -> EvalResult<StaticValue> {
        self.check_instance_var(range, &lhs)?;
        self.check_instance_var(range, &rhs)?;
        Ok(StaticValue::value(node.result_ty()))
    }

    fn eval_unary_op(
        &mut self,
        _ast: &Ast,
        node: &ExprNode,
        _op: UnaryOp,
        range: SourceRange,
        operand: StaticValue,
    ) -> EvalResult<StaticValue> {
        self.check_instance_var(range, &operand)?;
        Ok(StaticValue::value(node.result_ty()))
    }
}
