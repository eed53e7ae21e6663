//! Expression name resolution.
//!
//! Third user of the generic RPN walk. Value nodes resolve to
//! declarations: simple names against locals, then fields of the
//! enclosing class (including inherited ones), then the unit's import
//! scope; qualified names resolve step by step through member accesses.
//! Results are recorded on the expression nodes so the type resolver and
//! code generator can read them back without redoing the lookup.
//!
//! Method names cannot resolve in isolation (overloads are picked by
//! arity), so they travel as pending values and are pinned down at the
//! invocation op, which stores the chosen method on the op node.

use espresso_ast::{
    evaluate, Ast, BinOp, DeclId, DeclKind, EvalAbort, EvalResult, Expr, ExprEvaluator,
    ExprNode, ExprNodeKind, Type, TypeId, UnaryOp, UnitId,
};
use espresso_core::{DiagnosticSink, Name, SourceRange};

use crate::resolver::{Builtin, NameResolver};
use crate::symbols::{PkgChild, PkgId};

/// Where an expression occurs.
#[derive(Copy, Clone, Debug)]
pub struct ExprContext {
    pub unit: UnitId,
    pub class: DeclId,
    /// The enclosing method or constructor; `None` in field initializers.
    pub method: Option<DeclId>,
}

/// Pre-fetched built-in type ids, allocated once so the read-only passes
/// never touch the arena mutably.
#[derive(Copy, Clone, Debug)]
pub struct CachedTypes {
    pub boolean: TypeId,
    pub int: TypeId,
    pub string: TypeId,
}

impl CachedTypes {
    pub fn new(ast: &mut Ast) -> Self {
        Self {
            boolean: ast.builtin(espresso_ast::BuiltInKind::Boolean),
            int: ast.builtin(espresso_ast::BuiltInKind::Int),
            string: ast.builtin(espresso_ast::BuiltInKind::String),
        }
    }
}

/// Partial resolution state flowing through the RPN walk.
#[derive(Clone, Debug)]
pub enum NameRes {
    /// A computed value. `name` is kept when the value came from a simple
    /// name, so a following member access can re-resolve it as a field.
    Value {
        ty: Option<TypeId>,
        name: Option<Name>,
    },
    /// A class or interface name.
    TypeName(DeclId),
    /// A type operand (of `new`, cast, `instanceof`).
    TypeVal(TypeId),
    Package(PkgId),
    /// A method name awaiting its receiver and arity.
    Method { owner: Option<DeclId>, name: Name },
    /// A name that did not resolve on its own; legal only as the field
    /// operand of a member access.
    Pending(Name),
}

pub struct ExprNameResolver<'a> {
    resolver: &'a NameResolver,
    sink: &'a mut DiagnosticSink,
    ctx: ExprContext,
    cached: CachedTypes,
}

impl<'a> ExprNameResolver<'a> {
    pub fn new(
        resolver: &'a NameResolver,
        sink: &'a mut DiagnosticSink,
        ctx: ExprContext,
        cached: CachedTypes,
    ) -> Self {
        Self {
            resolver,
            sink,
            ctx,
            cached,
        }
    }

    pub fn resolve(&mut self, ast: &Ast, expr: &Expr) -> EvalResult<()> {
        evaluate(self, ast, expr).map(|_| ())
    }

    fn error(&mut self, message: String, range: SourceRange) -> EvalAbort {
        self.sink.report_error("resolve", message, range);
        EvalAbort
    }

    /// A value operand, or abort: pending names and packages are not
    /// values.
    fn as_value(&mut self, v: NameRes, range: SourceRange) -> EvalResult<Option<TypeId>> {
        match v {
            NameRes::Value { ty, .. } => Ok(ty),
            NameRes::TypeName(_) | NameRes::TypeVal(_) => {
                Err(self.error("type name used as a value".into(), range))
            }
            NameRes::Package(_) => Err(self.error("package name used as a value".into(), range)),
            NameRes::Method { name, .. } => {
                Err(self.error(format!("method \"{name}\" used as a value"), range))
            }
            NameRes::Pending(name) => {
                Err(self.error(format!("cannot resolve name \"{name}\""), range))
            }
        }
    }

    /// The class backing a receiver type: reference types resolve to
    /// their declaration, arrays to the synthesised prototype, the
    /// built-in string to the predefined `String` class.
    fn receiver_class(
        &mut self,
        ast: &Ast,
        ty: TypeId,
        range: SourceRange,
    ) -> EvalResult<DeclId> {
        if let Some(decl) = ast.ty(ty).as_decl() {
            return Ok(decl);
        }
        if ast.ty(ty).is_array() {
            return Ok(self.resolver.array_prototype());
        }
        if ast.ty(ty).is_string() {
            if let Some(string) = self.resolver.builtin(Builtin::String) {
                return Ok(string);
            }
        }
        Err(self.error(
            format!(
                "member access on non-reference type {}",
                ast.type_string(ty)
            ),
            range,
        ))
    }
}

/// Searches `class` and its superclasses for a field named `name`.
pub(crate) fn find_field(
    resolver: &NameResolver,
    ast: &Ast,
    class: DeclId,
    name: &Name,
) -> Option<DeclId> {
    let object = resolver.builtin(Builtin::Object);
    let mut cur = Some(class);
    let mut hops = 0usize;
    while let Some(decl) = cur {
        // Inheritance cycles are reported elsewhere; just stop looking.
        if hops > ast.decls.len() {
            return None;
        }
        hops += 1;
        let DeclKind::Class(class) = &ast.decl(decl).kind else {
            return None;
        };
        for &field in &class.fields {
            if ast.decl(field).name() == name {
                return Some(field);
            }
        }
        let explicit = class
            .super_classes
            .into_iter()
            .flatten()
            .find_map(|ty| ast.ty(ty).as_decl());
        cur = match explicit {
            Some(parent) => Some(parent),
            None => object.filter(|&object| decl != object),
        };
    }
    None
}

/// Searches `owner` (class or interface), its supertypes, and `Object`
/// for a method with the given name and arity. Constructors are looked up
/// on the class itself.
pub(crate) fn find_method(
    resolver: &NameResolver,
    ast: &Ast,
    owner: DeclId,
    name: &Name,
    arity: usize,
) -> Option<DeclId> {
    let object = resolver.builtin(Builtin::Object);
    let mut work = vec![owner];
    let mut seen = std::collections::HashSet::new();
    while let Some(decl) = work.pop() {
        if !seen.insert(decl) {
            continue;
        }
        let methods: &[DeclId] = match &ast.decl(decl).kind {
            DeclKind::Class(class) => {
                if let Some(parent) = class
                    .super_classes
                    .into_iter()
                    .flatten()
                    .find_map(|ty| ast.ty(ty).as_decl())
                {
                    work.push(parent);
                } else if let Some(object) = object {
                    if decl != object {
                        work.push(object);
                    }
                }
                work.extend(class.interfaces.iter().filter_map(|&ty| ast.ty(ty).as_decl()));
                &class.methods
            }
            DeclKind::Interface(iface) => {
                work.extend(iface.extends.iter().filter_map(|&ty| ast.ty(ty).as_decl()));
                if let Some(object) = object {
                    work.push(object);
                }
                &iface.methods
            }
            _ => return None,
        };
        for &method in methods {
            if ast.decl(method).name() == name && ast.method(method).params.len() == arity {
                return Some(method);
            }
        }
    }
    None
}

impl ExprEvaluator for ExprNameResolver<'_> {
    type Value = NameRes;

    fn map_value(&mut self, ast: &Ast, node: &ExprNode) -> EvalResult<NameRes> {
        match &node.kind {
            ExprNodeKind::Literal(_) => Ok(NameRes::Value {
                ty: node.ty(),
                name: None,
            }),
            ExprNodeKind::This => {
                let ty = self
                    .resolver
                    .class_type(self.ctx.class)
                    .expect("enclosing class has no reference type");
                node.resolve_ty(ty);
                node.resolve_decl(self.ctx.class);
                Ok(NameRes::Value {
                    ty: Some(ty),
                    name: None,
                })
            }
            ExprNodeKind::TypeRef(ty) => {
                self.resolver
                    .resolve_type(ast, self.sink, self.ctx.unit, *ty);
                if matches!(ast.ty(*ty), Type::Unresolved(u) if !u.is_resolved()) {
                    // The resolver already reported why.
                    return Err(EvalAbort);
                }
                node.resolve_ty(*ty);
                Ok(NameRes::TypeVal(*ty))
            }
            ExprNodeKind::MethodName { name } => Ok(NameRes::Method {
                owner: None,
                name: name.clone(),
            }),
            ExprNodeKind::MemberName { name } => {
                // Locals and parameters of the enclosing method first.
                if let Some(method) = self.ctx.method {
                    let method = ast.method(method);
                    for &var in method.params.iter().chain(&method.locals) {
                        if ast.decl(var).name() == name {
                            let ty = ast.var(var).ty;
                            node.resolve_decl(var);
                            node.resolve_ty(ty);
                            return Ok(NameRes::Value {
                                ty: Some(ty),
                                name: Some(name.clone()),
                            });
                        }
                    }
                }
                // Fields of the enclosing class, inherited included.
                if let Some(field) =
                    find_field(self.resolver, ast, self.ctx.class, name)
                {
                    let ty = ast.field(field).ty;
                    node.resolve_decl(field);
                    node.resolve_ty(ty);
                    return Ok(NameRes::Value {
                        ty: Some(ty),
                        name: Some(name.clone()),
                    });
                }
                // Types and packages from the unit's import scope.
                if let Some(scope) = self.resolver.import_scope(self.ctx.unit) {
                    match scope.get(name) {
                        Some(crate::resolver::Shadow::Decl(decl)) => {
                            node.resolve_decl(*decl);
                            if let Some(ty) = self.resolver.class_type(*decl) {
                                node.resolve_ty(ty);
                            }
                            return Ok(NameRes::TypeName(*decl));
                        }
                        Some(crate::resolver::Shadow::Package(pkg)) => {
                            return Ok(NameRes::Package(*pkg));
                        }
                        Some(crate::resolver::Shadow::Ambiguous) => {
                            return Err(self.error(
                                format!("ambiguous import for \"{name}\""),
                                node.range,
                            ));
                        }
                        None => {}
                    }
                }
                // May still be a field of a member-access receiver.
                Ok(NameRes::Pending(name.clone()))
            }
            op => unreachable!("op node {op:?} in map_value"),
        }
    }

    fn eval_member_access(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        lhs: NameRes,
        field: NameRes,
    ) -> EvalResult<NameRes> {
        // Method position: remember the receiver class, resolve at the call.
        if let NameRes::Method { name, .. } = &field {
            let name = name.clone();
            let owner = match &lhs {
                NameRes::Value { ty: Some(ty), .. } => self.receiver_class(ast, *ty, range)?,
                NameRes::TypeName(decl) => *decl,
                NameRes::Value { ty: None, .. } => {
                    return Err(self.error("method call on a void value".into(), range));
                }
                other => {
                    return Err(self.error(
                        format!("cannot call a method through {other:?}"),
                        range,
                    ));
                }
            };
            return Ok(NameRes::Method {
                owner: Some(owner),
                name,
            });
        }

        let name = match &field {
            NameRes::Pending(name) => name.clone(),
            NameRes::Value { name: Some(name), .. } => name.clone(),
            other => {
                return Err(self.error(
                    format!("member access field is not a name: {other:?}"),
                    range,
                ));
            }
        };

        match lhs {
            NameRes::Package(pkg) => match self.resolver.package_tree().child(pkg, &name) {
                Some(PkgChild::Package(sub)) => Ok(NameRes::Package(sub)),
                Some(PkgChild::Decl(decl)) => {
                    node.resolve_decl(decl);
                    if let Some(ty) = self.resolver.class_type(decl) {
                        node.resolve_ty(ty);
                    }
                    Ok(NameRes::TypeName(decl))
                }
                None => Err(self.error(
                    format!("cannot resolve \"{name}\" in package"),
                    range,
                )),
            },
            // Static access through the class name.
            NameRes::TypeName(class) => {
                let Some(field_decl) = find_field(self.resolver, ast, class, &name) else {
                    return Err(self.error(
                        format!(
                            "no field named \"{name}\" in {}",
                            ast.decl(class).name()
                        ),
                        range,
                    ));
                };
                let ty = ast.field(field_decl).ty;
                node.resolve_decl(field_decl);
                node.resolve_ty(ty);
                Ok(NameRes::Value {
                    ty: Some(ty),
                    name: None,
                })
            }
            NameRes::Value { ty: Some(ty), .. } => {
                let class = self.receiver_class(ast, ty, range)?;
                let Some(field_decl) = find_field(self.resolver, ast, class, &name) else {
                    return Err(self.error(
                        format!(
                            "no field named \"{name}\" in {}",
                            ast.decl(class).name()
                        ),
                        range,
                    ));
                };
                let field_ty = ast.field(field_decl).ty;
                node.resolve_decl(field_decl);
                node.resolve_ty(field_ty);
                Ok(NameRes::Value {
                    ty: Some(field_ty),
                    name: None,
                })
            }
            NameRes::Value { ty: None, .. } => {
                Err(self.error("member access on a void value".into(), range))
            }
            NameRes::Pending(prefix) => Err(self.error(
                format!("cannot resolve name \"{prefix}\""),
                range,
            )),
            NameRes::Method { name: prefix, .. } => Err(self.error(
                format!("method \"{prefix}\" used as a value"), range,
            )),
            NameRes::TypeVal(ty) => Err(self.error(
                format!("member access on type {}", ast.type_string(ty)),
                range,
            )),
        }
    }

    fn eval_method_call(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        method: NameRes,
        args: &[NameRes],
    ) -> EvalResult<NameRes> {
        let NameRes::Method { owner, name } = method else {
            return Err(self.error("expression is not a method".into(), range));
        };
        for arg in args.iter().cloned() {
            self.as_value(arg, range)?;
        }
        let owner = owner.unwrap_or(self.ctx.class);
        let Some(decl) = find_method(self.resolver, ast, owner, &name, args.len()) else {
            return Err(self.error(
                format!(
                    "no method named \"{name}\" with {} argument(s) in {}",
                    args.len(),
                    ast.decl(owner).name()
                ),
                range,
            ));
        };
        node.resolve_decl(decl);
        Ok(NameRes::Value {
            ty: ast.method(decl).return_ty,
            name: None,
        })
    }

    fn eval_new_object(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        ty: NameRes,
        args: &[NameRes],
    ) -> EvalResult<NameRes> {
        let NameRes::TypeVal(ty) = ty else {
            return Err(self.error("operand of new is not a type".into(), range));
        };
        for arg in args.iter().cloned() {
            self.as_value(arg, range)?;
        }
        let Some(class) = ast.ty(ty).as_decl() else {
            return Err(self.error(
                format!("cannot instantiate {}", ast.type_string(ty)),
                range,
            ));
        };
        let DeclKind::Class(class_decl) = &ast.decl(class).kind else {
            return Err(self.error(
                format!("cannot instantiate interface {}", ast.decl(class).name()),
                range,
            ));
        };
        let ctor = class_decl
            .constructors
            .iter()
            .copied()
            .find(|&ctor| ast.method(ctor).params.len() == args.len());
        let Some(ctor) = ctor else {
            return Err(self.error(
                format!(
                    "no constructor of {} takes {} argument(s)",
                    ast.decl(class).name(),
                    args.len()
                ),
                range,
            ));
        };
        node.resolve_decl(ctor);
        node.resolve_ty(ty);
        Ok(NameRes::Value {
            ty: Some(ty),
            name: None,
        })
    }

    fn eval_new_array(
        &mut self,
        _ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        ty: NameRes,
        size: NameRes,
    ) -> EvalResult<NameRes> {
        let NameRes::TypeVal(_) = ty else {
            return Err(self.error("operand of new[] is not a type".into(), range));
        };
        self.as_value(size, range)?;
        // The array type was allocated at lowering time.
        Ok(NameRes::Value {
            ty: node.ty(),
            name: None,
        })
    }

    fn eval_array_access(
        &mut self,
        ast: &Ast,
        _node: &ExprNode,
        range: SourceRange,
        array: NameRes,
        index: NameRes,
    ) -> EvalResult<NameRes> {
        let array_ty = self.as_value(array, range)?;
        self.as_value(index, range)?;
        let elem = array_ty.and_then(|ty| match ast.ty(ty) {
            Type::Array(elem) => Some(*elem),
            _ => None,
        });
        Ok(NameRes::Value {
            ty: elem,
            name: None,
        })
    }

    fn eval_cast(
        &mut self,
        _ast: &Ast,
        _node: &ExprNode,
        range: SourceRange,
        ty: NameRes,
        value: NameRes,
    ) -> EvalResult<NameRes> {
        let NameRes::TypeVal(ty) = ty else {
            return Err(self.error("cast target is not a type".into(), range));
        };
        self.as_value(value, range)?;
        Ok(NameRes::Value {
            ty: Some(ty),
            name: None,
        })
    }

    fn eval_binary_op(
        &mut self,
        ast: &Ast,
        _node: &ExprNode,
        op: BinOp,
        range: SourceRange,
        lhs: NameRes,
        rhs: NameRes,
    ) -> EvalResult<NameRes> {
        // `instanceof` takes a type on the right; everything else wants
        // plain values. Precise typing comes later; member lookups only
        // need a best-effort result type here.
        let lhs_ty = self.as_value(lhs, range)?;
        let rhs_ty = match (op, rhs) {
            (BinOp::InstanceOf, NameRes::TypeVal(_)) => None,
            (_, rhs) => self.as_value(rhs, range)?,
        };
        let ty = match op {
            BinOp::Assignment => lhs_ty,
            BinOp::Add => {
                let stringish = |ty: Option<TypeId>| {
                    ty.is_some_and(|ty| self.resolver.is_string_type(ast, ty))
                };
                if stringish(lhs_ty) || stringish(rhs_ty) {
                    Some(self.cached.string)
                } else {
                    Some(self.cached.int)
                }
            }
            BinOp::Subtract | BinOp::Multiply | BinOp::Divide | BinOp::Modulo => {
                Some(self.cached.int)
            }
            _ => Some(self.cached.boolean),
        };
        Ok(NameRes::Value { ty, name: None })
    }

    fn eval_unary_op(
        &mut self,
        _ast: &Ast,
        _node: &ExprNode,
        op: UnaryOp,
        range: SourceRange,
        operand: NameRes,
    ) -> EvalResult<NameRes> {
        let operand_ty = self.as_value(operand, range)?;
        let ty = match op {
            UnaryOp::Not => Some(self.cached.boolean),
            UnaryOp::Plus | UnaryOp::Minus => operand_ty.or(Some(self.cached.int)),
            UnaryOp::BitwiseNot => Some(self.cached.int),
        };
        Ok(NameRes::Value { ty, name: None })
    }
}
