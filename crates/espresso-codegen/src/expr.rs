//! The code-generating expression evaluator.
//!
//! Fourth user of the generic RPN walk. Its value distinguishes storage
//! locations from computed values and carries both the AST type (for
//! conversion decisions) and the IR type, per §l-value/r-value. Semantic
//! analysis has already accepted the expression, so every hook is
//! infallible; violated expectations are internal invariants and panic.

use espresso_ast::{
    evaluate, Ast, BinOp as AstBinOp, BuiltInKind, DeclId, DeclKind, EvalResult, ExprId,
    ExprEvaluator, ExprNode, ExprNodeKind, LiteralValue, Type, TypeId, UnaryOp,
};
use espresso_core::SourceRange;
use espresso_tir::{BinOp, CastOp, IntrinsicKind, Predicate, TyId, ValueId};

use crate::CodeGen;

#[derive(Clone, Debug)]
pub enum CgValue {
    /// A storage location; reading requires a load.
    LValue {
        ast_ty: TypeId,
        ir_ty: TyId,
        ptr: ValueId,
    },
    /// A computed value.
    RValue {
        ast_ty: TypeId,
        ir_ty: TyId,
        value: ValueId,
    },
    /// A type operand (of `new`, cast, `instanceof`).
    AstType(TypeId),
    /// An instance field named through the implicit `this`. Deferred: the
    /// GEP is emitted only when the value is actually read or written, so
    /// a name that turns out to be the field position of a member access
    /// costs nothing.
    Field { decl: DeclId, ast_ty: TypeId },
    /// A method position; the receiver is captured for the invocation.
    MethodRecv { receiver: Option<Box<CgValue>> },
    /// The result of a void call.
    Void,
}

impl CgValue {
    fn ast_ty(&self) -> TypeId {
        match self {
            CgValue::LValue { ast_ty, .. }
            | CgValue::RValue { ast_ty, .. }
            | CgValue::Field { ast_ty, .. } => *ast_ty,
            CgValue::AstType(ty) => *ty,
            other => panic!("value has no AST type: {other:?}"),
        }
    }
}

impl<'a> CodeGen<'a> {
    pub(crate) fn emit_expr(&mut self, expr: ExprId) -> CgValue {
        let ast = self.ast;
        let expr = ast.expr(expr);
        let mut eval = CgExprEvaluator { cg: self };
        evaluate(&mut eval, ast, expr).expect("codegen hooks are infallible")
    }

    pub(crate) fn emit_expr_rvalue(&mut self, expr: ExprId) -> ValueId {
        let value = self.emit_expr(expr);
        self.rvalue(&value)
    }

    /// Reads a value: loads l-values, passes r-values through.
    fn rvalue(&mut self, value: &CgValue) -> ValueId {
        match value {
            CgValue::LValue { ir_ty, ptr, .. } => {
                self.builder.create_load(&mut self.module, *ir_ty, *ptr)
            }
            CgValue::RValue { value, .. } => *value,
            CgValue::Field { decl, .. } => {
                let (_, ir_ty, ptr) = self.field_lvalue(*decl);
                self.builder.create_load(&mut self.module, ir_ty, ptr)
            }
            other => panic!("not a value: {other:?}"),
        }
    }

    /// The address of a value, spilling r-values to a stack slot.
    fn lvalue_ptr(&mut self, value: &CgValue) -> ValueId {
        match value {
            CgValue::LValue { ptr, .. } => *ptr,
            CgValue::RValue { ir_ty, value, .. } => {
                let function = self.cur_fn.expect("inside a function");
                let slot = self.module.create_entry_alloca(function, *ir_ty);
                self.builder.create_store(&mut self.module, *value, slot);
                slot
            }
            CgValue::Field { decl, .. } => self.field_lvalue(*decl).2,
            other => panic!("not a value: {other:?}"),
        }
    }

    /// The address of an implicit-`this` instance field.
    fn field_lvalue(&mut self, decl: DeclId) -> (TypeId, TyId, ValueId) {
        let ast_ty = self.ast.field(decl).ty;
        let ir_ty = self.emit_type(ast_ty);
        let owner = self.field_owner(decl);
        let layout = self.class_layout(owner);
        let index = self.module.const_i32(layout.fields[&decl] as i32);
        let this = self.this_value();
        let ptr = self
            .builder
            .create_gep(&mut self.module, this, layout.ty, &[index]);
        (ast_ty, ir_ty, ptr)
    }

    /// Integer conversion: truncate when narrowing, sign- or zero-extend
    /// when widening (`char` is the unsigned one), identity otherwise.
    fn cast_integer(&mut self, result_ast: TypeId, to: TyId, value: CgValue) -> CgValue {
        let Type::BuiltIn(src_kind) = self.ast.ty(value.ast_ty()) else {
            panic!("integer cast of non-builtin {}", self.ast.type_string(value.ast_ty()));
        };
        let src_bits = src_kind.size_bits();
        let dst_bits = self.module.ctx.size_in_bits(to);
        let src_signed = *src_kind != BuiltInKind::Char;

        let op = if dst_bits < src_bits {
            CastOp::Trunc
        } else if dst_bits > src_bits && src_signed {
            CastOp::SExt
        } else if dst_bits > src_bits {
            CastOp::ZExt
        } else {
            return value;
        };
        let raw = self.rvalue(&value);
        let cast = self.builder.create_icast(&mut self.module, op, raw, to);
        CgValue::RValue {
            ast_ty: result_ast,
            ir_ty: to,
            value: cast,
        }
    }
}

pub(crate) struct CgExprEvaluator<'c, 'a> {
    pub(crate) cg: &'c mut CodeGen<'a>,
}

fn bin_op(op: AstBinOp) -> BinOp {
    match op {
        AstBinOp::Add => BinOp::Add,
        AstBinOp::Subtract => BinOp::Sub,
        AstBinOp::Multiply => BinOp::Mul,
        AstBinOp::Divide => BinOp::Div,
        AstBinOp::Modulo => BinOp::Rem,
        AstBinOp::BitwiseAnd => BinOp::And,
        AstBinOp::BitwiseOr => BinOp::Or,
        AstBinOp::BitwiseXor => BinOp::Xor,
        other => panic!("{other} is not an arithmetic operator"),
    }
}

fn predicate(op: AstBinOp) -> Predicate {
    match op {
        AstBinOp::GreaterThan => Predicate::Gt,
        AstBinOp::GreaterThanOrEqual => Predicate::Ge,
        AstBinOp::LessThan => Predicate::Lt,
        AstBinOp::LessThanOrEqual => Predicate::Le,
        AstBinOp::Equal => Predicate::Eq,
        AstBinOp::NotEqual => Predicate::Ne,
        other => panic!("{other} is not a comparison"),
    }
}

impl ExprEvaluator for CgExprEvaluator<'_, '_> {
    type Value = CgValue;

    fn map_value(&mut self, ast: &Ast, node: &ExprNode) -> EvalResult<CgValue> {
        let cg = &mut *self.cg;
        Ok(match &node.kind {
            ExprNodeKind::Literal(literal) => {
                let ast_ty = node.ty().expect("literal type set at lowering");
                let ir_ty = cg.emit_type(ast_ty);
                let value = match literal {
                    LiteralValue::Int(v) => cg.module.const_int(ir_ty, *v as i64),
                    LiteralValue::Bool(v) => cg.module.const_bool(*v),
                    LiteralValue::Char(v) => cg.module.const_int(ir_ty, *v as i64),
                    // Strings are pointers; the runtime representation is
                    // outside this layer.
                    LiteralValue::String(_) | LiteralValue::Null => cg.module.const_null(),
                };
                CgValue::RValue {
                    ast_ty,
                    ir_ty,
                    value,
                }
            }
            ExprNodeKind::This => {
                let ast_ty = node.ty().expect("this is typed after resolution");
                let ir_ty = cg.module.ctx.ptr_ty();
                CgValue::RValue {
                    ast_ty,
                    ir_ty,
                    value: cg.this_value(),
                }
            }
            ExprNodeKind::TypeRef(ty) => CgValue::AstType(*ty),
            ExprNodeKind::MethodName { .. } => CgValue::MethodRecv { receiver: None },
            ExprNodeKind::MemberName { .. } => {
                let Some(decl) = node.decl() else {
                    // Field position of a member access; the op resolves it.
                    return Ok(CgValue::MethodRecv { receiver: None });
                };
                match &ast.decl(decl).kind {
                    DeclKind::Var(var) => CgValue::LValue {
                        ast_ty: var.ty,
                        ir_ty: cg.emit_type(var.ty),
                        ptr: cg.locals[&decl],
                    },
                    DeclKind::Field(field) => {
                        let ast_ty = field.ty;
                        if field.modifiers.is_static() {
                            let ir_ty = cg.emit_type(ast_ty);
                            CgValue::LValue {
                                ast_ty,
                                ir_ty,
                                ptr: cg.globals[&decl],
                            }
                        } else {
                            // Implicit `this` access, materialised on use.
                            CgValue::Field { decl, ast_ty }
                        }
                    }
                    DeclKind::Class(_) | DeclKind::Interface(_) => {
                        CgValue::AstType(node.ty().expect("class name has a reference type"))
                    }
                    other => panic!("unexpected member decl {other:?}"),
                }
            }
            op => unreachable!("op node {op:?} in map_value"),
        })
    }

    fn eval_member_access(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        _range: SourceRange,
        lhs: CgValue,
        field: CgValue,
    ) -> EvalResult<CgValue> {
        let cg = &mut *self.cg;
        // No decl on the op means this is the method position of an
        // invocation; capture the receiver for the call.
        let Some(decl) = node.decl() else {
            let _ = field;
            return Ok(CgValue::MethodRecv {
                receiver: Some(Box::new(lhs)),
            });
        };
        // A package-qualified type name; nothing to emit.
        if matches!(
            ast.decl(decl).kind,
            DeclKind::Class(_) | DeclKind::Interface(_)
        ) {
            return Ok(CgValue::AstType(
                node.ty().expect("class name has a reference type"),
            ));
        }
        let ast_ty = ast.field(decl).ty;
        let ir_ty = cg.emit_type(ast_ty);

        // array.length reads the first slot of the array struct.
        if decl == cg.resolver.array_length_field() {
            let base = cg.lvalue_ptr(&lhs);
            let arr_ty = cg.array_struct_ty();
            let zero = cg.module.const_i32(0);
            let len_ptr = cg.builder.create_gep(&mut cg.module, base, arr_ty, &[zero]);
            let i32_ty = cg.module.ctx.i32_ty();
            let len = cg.builder.create_load(&mut cg.module, i32_ty, len_ptr);
            cg.module.set_name(len, "arr.sz");
            return Ok(CgValue::RValue {
                ast_ty,
                ir_ty,
                value: len,
            });
        }

        if ast.field(decl).modifiers.is_static() {
            return Ok(CgValue::LValue {
                ast_ty,
                ir_ty,
                ptr: cg.globals[&decl],
            });
        }

        let owner = cg.field_owner(decl);
        let layout = cg.class_layout(owner);
        let receiver = cg.rvalue(&lhs);
        let index = cg.module.const_i32(layout.fields[&decl] as i32);
        let ptr = cg
            .builder
            .create_gep(&mut cg.module, receiver, layout.ty, &[index]);
        Ok(CgValue::LValue { ast_ty, ir_ty, ptr })
    }

    fn eval_method_call(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        _range: SourceRange,
        method: CgValue,
        args: &[CgValue],
    ) -> EvalResult<CgValue> {
        let cg = &mut *self.cg;
        let decl = node.decl().expect("invocation resolved");
        let CgValue::MethodRecv { receiver } = method else {
            panic!("method operand is not a method: {method:?}");
        };
        let data = ast.method(decl);
        let callee = cg.globals[&decl];
        let is_instance = !data.modifiers.is_static();

        let mut call_args = Vec::new();
        if is_instance {
            let this = match receiver {
                Some(receiver) => cg.rvalue(&receiver),
                None => cg.this_value(),
            };
            call_args.push(this);
        }
        let params = data.params.clone();
        for (i, arg) in args.iter().enumerate() {
            call_args.push(cg.pass_argument(ast, params[i], arg.clone()));
        }

        let call = cg.builder.create_call(&mut cg.module, callee, &call_args);
        Ok(match data.return_ty {
            Some(ret) => CgValue::RValue {
                ast_ty: ret,
                ir_ty: cg.emit_type(ret),
                value: call,
            },
            None => CgValue::Void,
        })
    }

    fn eval_new_object(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        _range: SourceRange,
        ty: CgValue,
        args: &[CgValue],
    ) -> EvalResult<CgValue> {
        let cg = &mut *self.cg;
        let class_ty = ty.ast_ty();
        let class = ast.ty(class_ty).as_decl().expect("instantiable class");
        let ctor = node.decl().expect("constructor resolved");

        let layout = cg.class_layout(class);
        let bytes = (cg.module.ctx.size_in_bits(layout.ty) + 7) / 8;
        let size = cg.module.const_i32(bytes.max(1) as i32);
        let malloc = cg.module.intrinsic(IntrinsicKind::Malloc);
        let raw = cg.builder.create_call(&mut cg.module, malloc, &[size]);
        cg.module.set_name(raw, "new.ptr");

        let mut call_args = vec![raw];
        let params = ast.method(ctor).params.clone();
        for (i, arg) in args.iter().enumerate() {
            call_args.push(cg.pass_argument(ast, params[i], arg.clone()));
        }
        let ctor_fn = cg.globals[&ctor];
        cg.builder.create_call(&mut cg.module, ctor_fn, &call_args);

        Ok(CgValue::RValue {
            ast_ty: class_ty,
            ir_ty: cg.module.ctx.ptr_ty(),
            value: raw,
        })
    }

    fn eval_new_array(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        _range: SourceRange,
        ty: CgValue,
        size: CgValue,
    ) -> EvalResult<CgValue> {
        let cg = &mut *self.cg;
        let elem_ast = ty.ast_ty();
        let elem_ir = cg.emit_type(elem_ast);
        let elem_bytes = ((cg.module.ctx.size_in_bits(elem_ir) + 7) / 8).max(1);
        let arr_ast = node.result_ty().or(node.ty()).expect("array type known");
        let arr_ty = cg.array_struct_ty();

        let int_ast = size.ast_ty();
        let i32_ty = cg.module.ctx.i32_ty();
        let len_value = cg.cast_integer(int_ast, i32_ty, size);
        let len = cg.rvalue(&len_value);
        let elem_size = cg.module.const_i32(elem_bytes as i32);
        let total = cg
            .builder
            .create_binary(&mut cg.module, BinOp::Mul, len, elem_size);
        cg.module.set_name(total, "arr.sz");

        let malloc = cg.module.intrinsic(IntrinsicKind::Malloc);
        let raw = cg.builder.create_call(&mut cg.module, malloc, &[total]);
        cg.module.set_name(raw, "arr.ptr");

        let function = cg.cur_fn.expect("inside a function");
        let slot = cg.module.create_entry_alloca(function, arr_ty);
        cg.module.set_name(slot, "arr.alloca");
        let zero = cg.module.const_i32(0);
        let len_slot = cg.builder.create_gep(&mut cg.module, slot, arr_ty, &[zero]);
        cg.module.set_name(len_slot, "arr.gep.sz");
        cg.builder.create_store(&mut cg.module, len, len_slot);
        let one = cg.module.const_i32(1);
        let data_slot = cg.builder.create_gep(&mut cg.module, slot, arr_ty, &[one]);
        cg.module.set_name(data_slot, "arr.gep.ptr");
        cg.builder.create_store(&mut cg.module, raw, data_slot);

        Ok(CgValue::LValue {
            ast_ty: arr_ast,
            ir_ty: arr_ty,
            ptr: slot,
        })
    }

    fn eval_array_access(
        &mut self,
        _ast: &Ast,
        node: &ExprNode,
        _range: SourceRange,
        array: CgValue,
        index: CgValue,
    ) -> EvalResult<CgValue> {
        let cg = &mut *self.cg;
        let elem_ast = node.result_ty().expect("element type resolved");
        let elem_ir = cg.emit_type(elem_ast);
        let arr_ty = cg.array_struct_ty();
        let i32_ty = cg.module.ctx.i32_ty();
        let ptr_ty = cg.module.ctx.ptr_ty();

        let base = cg.lvalue_ptr(&array);
        let zero = cg.module.const_i32(0);
        let sz_gep = cg.builder.create_gep(&mut cg.module, base, arr_ty, &[zero]);
        let one = cg.module.const_i32(1);
        let ptr_gep = cg.builder.create_gep(&mut cg.module, base, arr_ty, &[one]);
        let len = cg.builder.create_load(&mut cg.module, i32_ty, sz_gep);
        cg.module.set_name(len, "arr.sz");
        let data = cg.builder.create_load(&mut cg.module, ptr_ty, ptr_gep);
        cg.module.set_name(data, "arr.ptr");

        let idx_ast = index.ast_ty();
        let idx_value = cg.cast_integer(idx_ast, i32_ty, index);
        let idx = cg.rvalue(&idx_value);
        let in_range = cg
            .builder
            .create_cmp(&mut cg.module, Predicate::Lt, idx, len);

        let function = cg.cur_fn.expect("inside a function");
        let oob = cg.module.create_block(function);
        cg.module.set_name(oob, "array.oob");
        let inbounds = cg.module.create_block(function);
        cg.module.set_name(inbounds, "array.inbounds");
        cg.builder
            .create_cond_branch(&mut cg.module, in_range, inbounds, oob);

        cg.builder.set_insert_point(oob);
        let exception = cg.module.intrinsic(IntrinsicKind::Exception);
        cg.builder.create_call(&mut cg.module, exception, &[]);
        cg.builder.create_branch(&mut cg.module, inbounds);

        cg.builder.set_insert_point(inbounds);
        let elem_ptr = cg.builder.create_gep(&mut cg.module, data, arr_ty, &[idx]);
        Ok(CgValue::LValue {
            ast_ty: elem_ast,
            ir_ty: elem_ir,
            ptr: elem_ptr,
        })
    }

    fn eval_cast(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        _range: SourceRange,
        ty: CgValue,
        value: CgValue,
    ) -> EvalResult<CgValue> {
        let cg = &mut *self.cg;
        let cast_ast = ty.ast_ty();
        let result_ast = node.result_ty().expect("cast typed");
        if ast.ty(cast_ast).is_numeric() {
            let to = cg.emit_type(cast_ast);
            return Ok(cg.cast_integer(result_ast, to, value));
        }
        // Boolean casts are identity; reference and array casts reuse the
        // representation (no runtime check at this layer).
        let value = match value {
            CgValue::Field { decl, .. } => {
                let (ast_ty, ir_ty, ptr) = cg.field_lvalue(decl);
                CgValue::LValue { ast_ty, ir_ty, ptr }
            }
            other => other,
        };
        Ok(match value {
            CgValue::LValue { ir_ty, ptr, .. } => CgValue::LValue {
                ast_ty: result_ast,
                ir_ty,
                ptr,
            },
            CgValue::RValue { ir_ty, value, .. } => CgValue::RValue {
                ast_ty: result_ast,
                ir_ty,
                value,
            },
            other => panic!("cast of non-value {other:?}"),
        })
    }

    fn eval_binary_op(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        op: AstBinOp,
        _range: SourceRange,
        lhs: CgValue,
        rhs: CgValue,
    ) -> EvalResult<CgValue> {
        let cg = &mut *self.cg;
        let result_ast = node.result_ty().expect("binary op typed");
        match op {
            AstBinOp::Assignment => {
                let value = cg.coerced_rvalue(lhs.ast_ty(), rhs);
                let ptr = cg.lvalue_ptr(&lhs);
                cg.builder.create_store(&mut cg.module, value, ptr);
                Ok(lhs)
            }
            AstBinOp::GreaterThan
            | AstBinOp::GreaterThanOrEqual
            | AstBinOp::LessThan
            | AstBinOp::LessThanOrEqual
            | AstBinOp::Equal
            | AstBinOp::NotEqual => {
                let numeric = ast.ty(lhs.ast_ty()).is_numeric();
                let (lv, rv) = if numeric {
                    let i32_ty = cg.module.ctx.i32_ty();
                    let lp = cg.cast_integer(lhs.ast_ty(), i32_ty, lhs);
                    let rp = cg.cast_integer(rhs.ast_ty(), i32_ty, rhs);
                    (cg.rvalue(&lp), cg.rvalue(&rp))
                } else {
                    (cg.rvalue(&lhs), cg.rvalue(&rhs))
                };
                let cmp = cg
                    .builder
                    .create_cmp(&mut cg.module, predicate(op), lv, rv);
                Ok(CgValue::RValue {
                    ast_ty: result_ast,
                    ir_ty: cg.module.ctx.i1(),
                    value: cmp,
                })
            }
            AstBinOp::And | AstBinOp::Or => {
                //   v0 = eval(lhs); store v0, tmp; br v0, bb.true, bb.after
                // bb.true:
                //   v1 = eval(rhs); store v1, tmp; br bb.after
                // bb.after:
                //   result is tmp as an l-value
                // `||` swaps the branch targets.
                let i1 = cg.module.ctx.i1();
                let function = cg.cur_fn.expect("inside a function");
                let tmp = cg.module.create_entry_alloca(function, i1);
                let (first, second) = match op {
                    AstBinOp::And => ("and.true", "and.false"),
                    _ => ("or.true", "or.false"),
                };
                let rhs_bb = cg.module.create_block(function);
                cg.module.set_name(rhs_bb, first);
                let join_bb = cg.module.create_block(function);
                cg.module.set_name(join_bb, second);

                let v0 = cg.rvalue(&lhs);
                cg.builder.create_store(&mut cg.module, v0, tmp);
                match op {
                    AstBinOp::And => {
                        cg.builder
                            .create_cond_branch(&mut cg.module, v0, rhs_bb, join_bb);
                    }
                    _ => {
                        cg.builder
                            .create_cond_branch(&mut cg.module, v0, join_bb, rhs_bb);
                    }
                }
                cg.builder.set_insert_point(rhs_bb);
                let v1 = cg.rvalue(&rhs);
                cg.builder.create_store(&mut cg.module, v1, tmp);
                cg.builder.create_branch(&mut cg.module, join_bb);
                cg.builder.set_insert_point(join_bb);
                Ok(CgValue::LValue {
                    ast_ty: result_ast,
                    ir_ty: i1,
                    ptr: tmp,
                })
            }
            AstBinOp::Add
            | AstBinOp::Subtract
            | AstBinOp::Multiply
            | AstBinOp::Divide
            | AstBinOp::Modulo
            | AstBinOp::BitwiseAnd
            | AstBinOp::BitwiseOr
            | AstBinOp::BitwiseXor => {
                if cg.resolver.is_string_type(ast, result_ast) {
                    // String concatenation is a runtime concern; the IR
                    // placeholder is a null pointer.
                    let value = cg.module.const_null();
                    let ir_ty = cg.module.ctx.ptr_ty();
                    return Ok(CgValue::RValue {
                        ast_ty: result_ast,
                        ir_ty,
                        value,
                    });
                }
                // Compute in i32, then narrow back to the result type.
                let i32_ty = cg.module.ctx.i32_ty();
                let lp = cg.cast_integer(lhs.ast_ty(), i32_ty, lhs);
                let rp = cg.cast_integer(rhs.ast_ty(), i32_ty, rhs);
                let (lv, rv) = (cg.rvalue(&lp), cg.rvalue(&rp));
                let raw = cg.builder.create_binary(&mut cg.module, bin_op(op), lv, rv);
                let result_ir = cg.emit_type(result_ast);
                let wide = CgValue::RValue {
                    ast_ty: result_ast,
                    ir_ty: i32_ty,
                    value: raw,
                };
                Ok(cg.cast_integer(result_ast, result_ir, wide))
            }
            AstBinOp::InstanceOf => {
                // Type tests need runtime class metadata; the machine
                // layer fills this in.
                let value = cg.module.const_bool(false);
                Ok(CgValue::RValue {
                    ast_ty: result_ast,
                    ir_ty: cg.module.ctx.i1(),
                    value,
                })
            }
        }
    }

    fn eval_unary_op(
        &mut self,
        _ast: &Ast,
        node: &ExprNode,
        op: UnaryOp,
        _range: SourceRange,
        operand: CgValue,
    ) -> EvalResult<CgValue> {
        let cg = &mut *self.cg;
        let result_ast = node.result_ty().expect("unary op typed");
        match op {
            UnaryOp::Plus => Ok(operand),
            UnaryOp::Not | UnaryOp::BitwiseNot => {
                let value = cg.rvalue(&operand);
                let ty = cg.module.ty_of(value);
                let ones = cg.module.const_all_ones(ty);
                let result = cg
                    .builder
                    .create_binary(&mut cg.module, BinOp::Xor, value, ones);
                Ok(CgValue::RValue {
                    ast_ty: result_ast,
                    ir_ty: ty,
                    value: result,
                })
            }
            UnaryOp::Minus => {
                let value = cg.rvalue(&operand);
                let ty = cg.module.ty_of(value);
                let zero = cg.module.const_int(ty, 0);
                let result = cg
                    .builder
                    .create_binary(&mut cg.module, BinOp::Sub, zero, value);
                Ok(CgValue::RValue {
                    ast_ty: result_ast,
                    ir_ty: ty,
                    value: result,
                })
            }
        }
    }
}

impl CodeGen<'_> {
    /// Reads `value`, applying the widening conversion to `target_ast`
    /// when both sides are numeric.
    pub(crate) fn coerced_rvalue(&mut self, target_ast: TypeId, value: CgValue) -> ValueId {
        if self.ast.ty(target_ast).is_numeric() && self.ast.ty(value.ast_ty()).is_numeric() {
            let to = self.emit_type(target_ast);
            let cast = self.cast_integer(target_ast, to, value);
            self.rvalue(&cast)
        } else {
            self.rvalue(&value)
        }
    }

    fn pass_argument(&mut self, ast: &Ast, param: DeclId, arg: CgValue) -> ValueId {
        let param_ty = ast.var(param).ty;
        self.coerced_rvalue(param_ty, arg)
    }
}
