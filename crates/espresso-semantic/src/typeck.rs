//! Expression type resolution.
//!
//! Second user of the generic RPN walk; yields the AST type of each
//! subexpression, caching every op's result type on the op node so
//! repeated passes are idempotent. A `None` value is the type of a void
//! method call; using one as an operand is a type error.

use espresso_ast::{
    evaluate, Ast, BinOp, DeclKind, EvalAbort, EvalResult, Expr, ExprEvaluator, ExprNode,
    ExprNodeKind, Type, TypeId, UnaryOp,
};
use espresso_core::{DiagnosticSink, SourceRange};

use crate::expr_name::CachedTypes;
use crate::resolver::{Builtin, NameResolver};

pub struct TypeChecker<'a> {
    resolver: &'a NameResolver,
    sink: &'a mut DiagnosticSink,
    cached: CachedTypes,
}

impl<'a> TypeChecker<'a> {
    pub fn new(
        resolver: &'a NameResolver,
        sink: &'a mut DiagnosticSink,
        cached: CachedTypes,
    ) -> Self {
        Self {
            resolver,
            sink,
            cached,
        }
    }

    /// Resolves the type of `expr`. `None` means void.
    pub fn check(&mut self, ast: &Ast, expr: &Expr) -> EvalResult<Option<TypeId>> {
        evaluate(self, ast, expr)
    }

    fn error(&mut self, message: String, range: SourceRange) -> EvalAbort {
        self.sink.report_error("type", message, range);
        EvalAbort
    }

    fn need(&mut self, v: Option<TypeId>, range: SourceRange) -> EvalResult<TypeId> {
        match v {
            Some(ty) => Ok(ty),
            None => Err(self.error("void expression used as a value".into(), range)),
        }
    }

    // --- conversions -----------------------------------------------------

    /// JLS 5.1.2 widening between the primitive subset: byte widens to
    /// short and int; short and char widen to int.
    fn is_wider_than(&self, ast: &Ast, lhs: TypeId, rhs: TypeId) -> bool {
        use espresso_ast::BuiltInKind as K;
        let (Type::BuiltIn(lhs), Type::BuiltIn(rhs)) = (ast.ty(lhs), ast.ty(rhs)) else {
            return false;
        };
        match *rhs {
            K::Char | K::Short => *lhs == K::Int,
            K::Byte => matches!(*lhs, K::Short | K::Int),
            _ => false,
        }
    }

    /// Whether a value of type `rhs` may be assigned to a slot of type
    /// `lhs` (identity, widening primitive, or widening reference
    /// conversion).
    pub fn is_assignable_to(&self, ast: &Ast, lhs: TypeId, rhs: TypeId) -> bool {
        if ast.types_equal(lhs, rhs) {
            return true;
        }
        // The string literal type and the String class are one type.
        if self.resolver.is_string_type(ast, lhs) && self.resolver.is_string_type(ast, rhs) {
            return true;
        }

        if self.is_wider_than(ast, lhs, rhs) {
            return true;
        }

        // null widens to any reference or array type.
        if ast.ty(rhs).is_null() {
            return ast.ty(lhs).is_reference() || ast.ty(lhs).is_array();
        }

        let lhs_decl = ast.ty(lhs).as_decl();
        let rhs_decl = ast.ty(rhs).as_decl();
        if let (Some(lhs_decl), Some(rhs_decl)) = (lhs_decl, rhs_decl) {
            let lhs_is_class = matches!(ast.decl(lhs_decl).kind, DeclKind::Class(_));
            let rhs_is_class = matches!(ast.decl(rhs_decl).kind, DeclKind::Class(_));
            return match (lhs_is_class, rhs_is_class) {
                // class to superclass
                (true, true) => self.resolver.is_super_class(ast, lhs_decl, rhs_decl),
                // class to implemented interface
                (false, true) => self.resolver.is_super_interface(ast, lhs_decl, rhs_decl),
                // interface to Object
                (true, false) => Some(lhs_decl) == self.resolver.builtin(Builtin::Object),
                // interface to super-interface
                (false, false) => self.resolver.is_super_interface(ast, lhs_decl, rhs_decl),
            };
        }

        if let Type::Array(rhs_elem) = ast.ty(rhs) {
            if let Type::Array(lhs_elem) = ast.ty(lhs) {
                // array to array, both elements references and assignable
                return ast.ty(*lhs_elem).is_reference()
                    && ast.ty(*rhs_elem).is_reference()
                    && self.is_assignable_to(ast, *lhs_elem, *rhs_elem);
            }
            if let Some(lhs_decl) = lhs_decl {
                // array to Object, Cloneable, java.io.Serializable
                return [Builtin::Object, Builtin::Cloneable, Builtin::Serializable]
                    .iter()
                    .any(|&b| self.resolver.builtin(b) == Some(lhs_decl));
            }
        }
        false
    }

    /// JLS 5.5 casts for this subset: identity, primitive widening in
    /// either direction, interface/interface, interface with a non-final
    /// class either way, arrays with the reference-element rule.
    pub fn is_valid_cast(&self, ast: &Ast, expr_ty: TypeId, cast_ty: TypeId) -> bool {
        if ast.types_equal(expr_ty, cast_ty) {
            return true;
        }
        if let (Type::BuiltIn(a), Type::BuiltIn(b)) = (ast.ty(expr_ty), ast.ty(cast_ty)) {
            return a.is_numeric() && b.is_numeric();
        }
        if ast.ty(expr_ty).is_null() {
            return ast.ty(cast_ty).is_reference() || ast.ty(cast_ty).is_array();
        }

        let expr_decl = ast.ty(expr_ty).as_decl();
        let cast_decl = ast.ty(cast_ty).as_decl();
        if let (Some(expr_decl), Some(cast_decl)) = (expr_decl, cast_decl) {
            let expr_iface = matches!(ast.decl(expr_decl).kind, DeclKind::Interface(_));
            let cast_iface = matches!(ast.decl(cast_decl).kind, DeclKind::Interface(_));
            let is_final = |decl| {
                matches!(&ast.decl(decl).kind, DeclKind::Class(c) if c.modifiers.is_final())
            };
            if expr_iface && cast_iface {
                return true;
            }
            if expr_iface && !is_final(cast_decl) {
                return true;
            }
            if cast_iface && !is_final(expr_decl) {
                return true;
            }
            return self.is_assignable_to(ast, expr_ty, cast_ty)
                || self.is_assignable_to(ast, cast_ty, expr_ty);
        }

        if let (Type::Array(expr_elem), Type::Array(cast_elem)) =
            (ast.ty(expr_ty), ast.ty(cast_ty))
        {
            return ast.ty(*expr_elem).is_reference()
                && ast.ty(*cast_elem).is_reference()
                && self.is_valid_cast(ast, *expr_elem, *cast_elem);
        }

        // Arrays cast to/from Object and the array interfaces.
        if ast.ty(expr_ty).is_array() || ast.ty(cast_ty).is_array() {
            return self.is_assignable_to(ast, expr_ty, cast_ty)
                || self.is_assignable_to(ast, cast_ty, expr_ty);
        }
        false
    }
}

impl ExprEvaluator for TypeChecker<'_> {
    type Value = Option<TypeId>;

    fn map_value(&mut self, _ast: &Ast, node: &ExprNode) -> EvalResult<Option<TypeId>> {
        match &node.kind {
            // Method names have no type of their own; pending member
            // names are typed at the access op.
            ExprNodeKind::MethodName { .. } => Ok(None),
            ExprNodeKind::TypeRef(ty) => Ok(Some(*ty)),
            _ => Ok(node.ty()),
        }
    }

    fn eval_binary_op(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        op: BinOp,
        range: SourceRange,
        lhs: Option<TypeId>,
        rhs: Option<TypeId>,
    ) -> EvalResult<Option<TypeId>> {
        if let Some(cached) = node.result_ty() {
            return Ok(Some(cached));
        }
        let lhs = self.need(lhs, range)?;
        let rhs = self.need(rhs, range)?;
        let numeric = |ty: TypeId| ast.ty(ty).is_numeric();
        let boolean = |ty: TypeId| ast.ty(ty).is_boolean();
        let reference =
            |ty: TypeId| ast.ty(ty).is_reference() || ast.ty(ty).is_array() || ast.ty(ty).is_null();

        let result = match op {
            BinOp::Assignment => {
                if !self.is_assignable_to(ast, lhs, rhs) {
                    return Err(self.error(
                        format!(
                            "invalid assignment, {} is not assignable to {}",
                            ast.type_string(rhs),
                            ast.type_string(lhs)
                        ),
                        range,
                    ));
                }
                lhs
            }
            BinOp::GreaterThan
            | BinOp::GreaterThanOrEqual
            | BinOp::LessThan
            | BinOp::LessThanOrEqual => {
                if !(numeric(lhs) && numeric(rhs)) {
                    return Err(self.error(
                        format!("invalid types for {op}, operands are non-numeric"),
                        range,
                    ));
                }
                self.cached.boolean
            }
            BinOp::Equal | BinOp::NotEqual => {
                let ok = (numeric(lhs) && numeric(rhs))
                    || (boolean(lhs) && boolean(rhs))
                    || (reference(lhs)
                        && reference(rhs)
                        && (self.is_valid_cast(ast, lhs, rhs)
                            || self.is_valid_cast(ast, rhs, lhs)));
                if !ok {
                    return Err(self.error(
                        format!(
                            "invalid types for {op}, {} and {} cannot be compared",
                            ast.type_string(lhs),
                            ast.type_string(rhs)
                        ),
                        range,
                    ));
                }
                self.cached.boolean
            }
            BinOp::Add => {
                if self.resolver.is_string_type(ast, lhs)
                    || self.resolver.is_string_type(ast, rhs)
                {
                    self.cached.string
                } else if numeric(lhs) && numeric(rhs) {
                    self.cached.int
                } else {
                    return Err(self.error(
                        format!("invalid types for arithmetic {op}"),
                        range,
                    ));
                }
            }
            BinOp::Subtract | BinOp::Multiply | BinOp::Divide | BinOp::Modulo => {
                if !(numeric(lhs) && numeric(rhs)) {
                    return Err(self.error(
                        format!("invalid types for {op}, operands are non-numeric"),
                        range,
                    ));
                }
                self.cached.int
            }
            BinOp::And | BinOp::Or | BinOp::BitwiseAnd | BinOp::BitwiseOr | BinOp::BitwiseXor => {
                if !(boolean(lhs) && boolean(rhs)) {
                    return Err(self.error(
                        format!("invalid types for {op}, operands are non-boolean"),
                        range,
                    ));
                }
                self.cached.boolean
            }
            BinOp::InstanceOf => {
                let ok = reference(lhs)
                    && !ast.ty(rhs).is_null()
                    && (ast.ty(rhs).is_reference() || ast.ty(rhs).is_array())
                    && self.is_valid_cast(ast, rhs, lhs);
                if !ok {
                    return Err(self.error(
                        format!(
                            "invalid instanceof, {} cannot be tested against {}",
                            ast.type_string(lhs),
                            ast.type_string(rhs)
                        ),
                        range,
                    ));
                }
                self.cached.boolean
            }
        };
        Ok(Some(node.resolve_result_ty(result)))
    }

    fn eval_unary_op(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        op: UnaryOp,
        range: SourceRange,
        operand: Option<TypeId>,
    ) -> EvalResult<Option<TypeId>> {
        if let Some(cached) = node.result_ty() {
            return Ok(Some(cached));
        }
        let operand = self.need(operand, range)?;
        let result = match op {
            UnaryOp::Plus | UnaryOp::Minus | UnaryOp::BitwiseNot => {
                if !ast.ty(operand).is_numeric() {
                    return Err(
                        self.error(format!("invalid type for unary {op:?}, non-numeric"), range)
                    );
                }
                self.cached.int
            }
            UnaryOp::Not => {
                if !ast.ty(operand).is_boolean() {
                    return Err(self.error("invalid type for unary not, non-boolean".into(), range));
                }
                self.cached.boolean
            }
        };
        Ok(Some(node.resolve_result_ty(result)))
    }

    fn eval_member_access(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        _lhs: Option<TypeId>,
        _field: Option<TypeId>,
    ) -> EvalResult<Option<TypeId>> {
        if let Some(cached) = node.result_ty() {
            return Ok(Some(cached));
        }
        let _ = range;
        // Field accesses carry the resolved field on the op node; method
        // accesses type at the invocation; a package-qualified type name
        // carries the class and types as that class.
        match node.decl() {
            Some(decl) => match &ast.decl(decl).kind {
                DeclKind::Field(field) => Ok(Some(node.resolve_result_ty(field.ty))),
                DeclKind::Class(_) | DeclKind::Interface(_) => Ok(node.ty()),
                other => panic!("member access resolved to {other:?}"),
            },
            None => Ok(None),
        }
    }

    fn eval_method_call(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        _method: Option<TypeId>,
        args: &[Option<TypeId>],
    ) -> EvalResult<Option<TypeId>> {
        if let Some(cached) = node.result_ty() {
            return Ok(Some(cached));
        }
        let Some(decl) = node.decl() else {
            // Name resolution failed and already reported.
            return Err(EvalAbort);
        };
        let method = ast.method(decl);
        assert_eq!(
            method.params.len(),
            args.len(),
            "method params and args size mismatch"
        );
        for (i, arg) in args.iter().enumerate() {
            let arg = self.need(*arg, range)?;
            let param_ty = ast.var(method.params[i]).ty;
            if !self.is_assignable_to(ast, param_ty, arg) {
                return Err(self.error(
                    format!(
                        "invalid argument, {} is not assignable to parameter of type {}",
                        ast.type_string(arg),
                        ast.type_string(param_ty)
                    ),
                    range,
                ));
            }
        }
        match method.return_ty {
            Some(ret) => Ok(Some(node.resolve_result_ty(ret))),
            None => Ok(None),
        }
    }

    fn eval_new_object(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        ty: Option<TypeId>,
        args: &[Option<TypeId>],
    ) -> EvalResult<Option<TypeId>> {
        if let Some(cached) = node.result_ty() {
            return Ok(Some(cached));
        }
        let ty = self.need(ty, range)?;
        let Some(ctor) = node.decl() else {
            return Err(EvalAbort);
        };
        let ctor = ast.method(ctor);
        assert_eq!(
            ctor.params.len(),
            args.len(),
            "constructor params and args size mismatch"
        );
        for (i, arg) in args.iter().enumerate() {
            let arg = self.need(*arg, range)?;
            let param_ty = ast.var(ctor.params[i]).ty;
            if !self.is_assignable_to(ast, param_ty, arg) {
                return Err(self.error(
                    format!(
                        "invalid argument, {} is not assignable to parameter of type {}",
                        ast.type_string(arg),
                        ast.type_string(param_ty)
                    ),
                    range,
                ));
            }
        }
        Ok(Some(node.resolve_result_ty(ty)))
    }

    fn eval_new_array(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        _ty: Option<TypeId>,
        size: Option<TypeId>,
    ) -> EvalResult<Option<TypeId>> {
        if let Some(cached) = node.result_ty() {
            return Ok(Some(cached));
        }
        let size = self.need(size, range)?;
        if !ast.ty(size).is_numeric() {
            return Err(self.error("invalid type for array size, non-numeric".into(), range));
        }
        let array_ty = node.ty().expect("array type pre-allocated at lowering");
        Ok(Some(node.resolve_result_ty(array_ty)))
    }

    fn eval_array_access(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        array: Option<TypeId>,
        index: Option<TypeId>,
    ) -> EvalResult<Option<TypeId>> {
        if let Some(cached) = node.result_ty() {
            return Ok(Some(cached));
        }
        let array = self.need(array, range)?;
        let index = self.need(index, range)?;
        let Type::Array(elem) = ast.ty(array) else {
            return Err(self.error(
                format!("cannot index non-array type {}", ast.type_string(array)),
                range,
            ));
        };
        if !ast.ty(index).is_numeric() {
            return Err(self.error("invalid type for array index, non-numeric".into(), range));
        }
        Ok(Some(node.resolve_result_ty(*elem)))
    }

    fn eval_cast(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        ty: Option<TypeId>,
        value: Option<TypeId>,
    ) -> EvalResult<Option<TypeId>> {
        if let Some(cached) = node.result_ty() {
            return Ok(Some(cached));
        }
        let ty = self.need(ty, range)?;
        let value = self.need(value, range)?;
        if !self.is_valid_cast(ast, value, ty) {
            return Err(self.error(
                format!(
                    "invalid cast from {} to {}",
                    ast.type_string(value),
                    ast.type_string(ty)
                ),
                range,
            ));
        }
        Ok(Some(node.resolve_result_ty(ty)))
    }
}
