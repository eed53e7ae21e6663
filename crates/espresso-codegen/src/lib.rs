//! Lowering from the analyzed AST to the typed IR.
//!
//! Classes become struct layouts, static fields become globals, methods
//! and constructors become functions (instance ones take `this` as the
//! first argument). Statements lower to basic blocks; expressions go
//! through the code-generating RPN evaluator in [`expr`].

mod expr;
mod stmt;

use std::collections::HashMap;

use espresso_ast::{
    Ast, BuiltInKind, ContextRef, DeclId, DeclKind, Type, TypeId,
};
use espresso_semantic::NameResolver;
use espresso_tir::{Builder, Context, Module, TyId, ValueId};

pub use expr::CgValue;

/// Per-class IR layout: the struct type and each field's index into it.
/// Inherited fields come first, in superclass-to-subclass order.
#[derive(Clone, Debug)]
struct ClassLayout {
    ty: TyId,
    fields: HashMap<DeclId, u32>,
}

pub struct CodeGen<'a> {
    ast: &'a Ast,
    resolver: &'a NameResolver,
    pub module: Module,
    builder: Builder,
    /// Static fields, methods and constructors to their IR globals.
    globals: HashMap<DeclId, ValueId>,
    /// Locals and parameters to their stack slots, per current function.
    locals: HashMap<DeclId, ValueId>,
    layouts: HashMap<DeclId, ClassLayout>,
    cur_fn: Option<ValueId>,
}

impl<'a> CodeGen<'a> {
    pub fn new(ast: &'a Ast, resolver: &'a NameResolver) -> Self {
        Self {
            ast,
            resolver,
            module: Module::new(Context::new()),
            builder: Builder::new(),
            globals: HashMap::new(),
            locals: HashMap::new(),
            layouts: HashMap::new(),
            cur_fn: None,
        }
    }

    /// Lowers the whole linking unit and returns the finished module.
    pub fn emit(mut self) -> Module {
        let classes: Vec<DeclId> = self
            .ast
            .linking_unit()
            .iter()
            .filter_map(|&unit| self.ast.unit(unit).body)
            .filter(|&body| matches!(self.ast.decl(body).kind, DeclKind::Class(_)))
            .collect();

        // Declare everything first so bodies can call across classes.
        for &class in &classes {
            self.declare_class(class);
        }
        for &class in &classes {
            let methods: Vec<DeclId> = {
                let c = self.ast.class(class);
                c.methods.iter().chain(&c.constructors).copied().collect()
            };
            for method in methods {
                if self.ast.method(method).body.is_some() {
                    self.emit_function(method);
                }
            }
        }
        self.module
    }

    fn declare_class(&mut self, class: DeclId) {
        let fields: Vec<DeclId> = self.ast.class(class).fields.clone();
        for field in fields {
            if self.ast.field(field).modifiers.is_static() {
                let name = self.global_name(field);
                let ty = self.emit_type(self.ast.field(field).ty);
                let gv = self
                    .module
                    .create_global_variable(ty, &name)
                    .expect("static field names are unique");
                self.globals.insert(field, gv);
            }
        }

        let methods: Vec<DeclId> = {
            let c = self.ast.class(class);
            c.methods.iter().chain(&c.constructors).copied().collect()
        };
        for method in methods {
            self.declare_method(method);
        }
    }

    fn declare_method(&mut self, method: DeclId) {
        let data = self.ast.method(method);
        let is_instance = data.is_constructor || !data.modifiers.is_static();
        let ret = match data.return_ty {
            Some(ty) => self.emit_type(ty),
            None => self.module.ctx.void_ty(),
        };
        let param_decls = data.params.clone();
        let mut params = Vec::new();
        if is_instance {
            params.push(self.module.ctx.ptr_ty());
        }
        for &param in &param_decls {
            let ty = self.ast.var(param).ty;
            params.push(self.emit_type(ty));
        }

        let base = self.global_name(method);
        let function = match self.module.create_function(&base, ret, &params) {
            Some(f) => f,
            // Overloads share a simple name; disambiguate by arity.
            None => {
                let name = format!("{base}${}", param_decls.len());
                self.module
                    .create_function(&name, ret, &params)
                    .expect("mangled function name is unique")
            }
        };
        self.globals.insert(method, function);
    }

    fn global_name(&self, decl: DeclId) -> String {
        self.ast
            .canonical_name(decl)
            .unwrap_or_else(|| self.ast.decl(decl).name().to_string())
    }

    fn emit_function(&mut self, method: DeclId) {
        let function = self.globals[&method];
        let data = self.ast.method(method);
        let is_instance = data.is_constructor || !data.modifiers.is_static();
        let params = data.params.clone();
        let method_locals = data.locals.clone();
        let body = data.body.expect("function has a body");

        let entry = self.module.create_block(function);
        self.builder.set_insert_point(entry);
        self.cur_fn = Some(function);
        self.locals.clear();

        // Parameters spill to stack slots so they are ordinary l-values;
        // `this` stays a raw argument.
        let args = self.module.function(function).args.clone();
        let first_param = usize::from(is_instance);
        for (i, &param) in params.iter().enumerate() {
            let ty = self.ast.var(param).ty;
            let ir_ty = self.emit_type(ty);
            let slot = self.builder.create_alloca(&mut self.module, ir_ty);
            self.module.set_name(slot, self.ast.decl(param).name().as_str());
            self.builder
                .create_store(&mut self.module, args[first_param + i], slot);
            self.locals.insert(param, slot);
        }
        for &local in &method_locals {
            let ty = self.ast.var(local).ty;
            let ir_ty = self.emit_type(ty);
            let slot = self.builder.create_alloca(&mut self.module, ir_ty);
            self.module.set_name(slot, self.ast.decl(local).name().as_str());
            self.locals.insert(local, slot);
        }

        let terminated = self.emit_stmt(body);
        if !terminated {
            self.builder.create_ret(&mut self.module, None);
        }
        self.cur_fn = None;
    }

    /// The argument holding `this` in the current (instance) function.
    fn this_value(&self) -> ValueId {
        let function = self.cur_fn.expect("inside a function");
        *self
            .module
            .function(function)
            .args
            .first()
            .expect("instance function has a this argument")
    }

    // --- types -----------------------------------------------------------

    /// AST type → IR type. Arrays are `{i32, ptr}` (length, data);
    /// references are pointers.
    fn emit_type(&mut self, ty: TypeId) -> TyId {
        match self.ast.ty(ty) {
            Type::BuiltIn(kind) => match kind {
                BuiltInKind::Boolean => self.module.ctx.i1(),
                BuiltInKind::Byte => self.module.ctx.int_ty(8),
                BuiltInKind::Short | BuiltInKind::Char => self.module.ctx.int_ty(16),
                BuiltInKind::Int => self.module.ctx.i32_ty(),
                BuiltInKind::String | BuiltInKind::NoneType => self.module.ctx.ptr_ty(),
            },
            Type::Array(_) => self.array_struct_ty(),
            Type::Reference(_) | Type::Unresolved(_) => self.module.ctx.ptr_ty(),
        }
    }

    fn array_struct_ty(&mut self) -> TyId {
        let i32_ty = self.module.ctx.i32_ty();
        let ptr = self.module.ctx.ptr_ty();
        self.module.ctx.struct_ty(vec![i32_ty, ptr])
    }

    /// The struct layout of a class: superclass fields first, then its
    /// own instance fields in declaration order.
    fn class_layout(&mut self, class: DeclId) -> ClassLayout {
        if let Some(layout) = self.layouts.get(&class) {
            return layout.clone();
        }
        let mut chain = Vec::new();
        let mut cur = Some(class);
        while let Some(decl) = cur {
            if chain.contains(&decl) {
                break;
            }
            chain.push(decl);
            let DeclKind::Class(data) = &self.ast.decl(decl).kind else {
                break;
            };
            cur = data
                .super_classes
                .into_iter()
                .flatten()
                .find_map(|ty| self.ast.ty(ty).as_decl());
        }

        let mut field_tys = Vec::new();
        let mut fields = HashMap::new();
        for &decl in chain.iter().rev() {
            let class_fields: Vec<DeclId> = self.ast.class(decl).fields.clone();
            for field in class_fields {
                if self.ast.field(field).modifiers.is_static() {
                    continue;
                }
                let ty = self.ast.field(field).ty;
                fields.insert(field, field_tys.len() as u32);
                let ir_ty = self.emit_type(ty);
                field_tys.push(ir_ty);
            }
        }
        let ty = self.module.ctx.struct_ty(field_tys);
        let layout = ClassLayout { ty, fields };
        self.layouts.insert(class, layout.clone());
        layout
    }

    /// The class a field belongs to (its parent context).
    fn field_owner(&self, field: DeclId) -> DeclId {
        match self.ast.decl(field).parent() {
            Some(ContextRef::Decl(owner)) => owner,
            other => panic!("field parent is not a class: {other:?}"),
        }
    }
}

/// Convenience wrapper: lower an analyzed linking unit to IR.
pub fn emit_module(ast: &Ast, resolver: &NameResolver) -> Module {
    CodeGen::new(ast, resolver).emit()
}
