//! The value arena: constants, globals, functions, blocks, instructions.

use std::collections::HashMap;

use espresso_core::{Arena, Idx};
use once_cell::sync::Lazy;
use smol_str::SmolStr;

use crate::ty::{Context, Ty, TyId};

pub type ValueId = Idx<ValueData>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
}

impl BinOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::Rem => "rem",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Predicate {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Predicate::Eq => "eq",
            Predicate::Ne => "ne",
            Predicate::Lt => "lt",
            Predicate::Le => "le",
            Predicate::Gt => "gt",
            Predicate::Ge => "ge",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CastOp {
    Trunc,
    SExt,
    ZExt,
}

impl CastOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            CastOp::Trunc => "trunc",
            CastOp::SExt => "sext",
            CastOp::ZExt => "zext",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Opcode {
    Alloca { alloc_ty: TyId },
    Load { ty: TyId },
    Store,
    GetElementPtr { struct_ty: TyId },
    BinOp(BinOp),
    Cmp(Predicate),
    ICast { op: CastOp, to: TyId },
    Call,
    Br,
    Ret,
}

impl Opcode {
    /// Terminators end a basic block. A call to a noreturn callee also
    /// terminates, but that is a property of the callee, not the opcode.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        matches!(self, Opcode::Br | Opcode::Ret)
    }
}

#[derive(Debug)]
pub struct Instr {
    pub opcode: Opcode,
    pub operands: Vec<ValueId>,
}

#[derive(Debug)]
pub struct Block {
    pub instrs: Vec<ValueId>,
    pub parent: ValueId,
}

#[derive(Debug)]
pub struct Function {
    pub ty: TyId,
    pub args: Vec<ValueId>,
    pub blocks: Vec<ValueId>,
    pub is_intrinsic: bool,
    pub noreturn: bool,
}

#[derive(Debug)]
pub enum ValueKind {
    ConstantInt { value: i64 },
    ConstantNull,
    GlobalVariable,
    Function(Function),
    Argument { index: u32 },
    Block(Block),
    Instr(Instr),
}

/// A value: id (its printed number), type, optional name, and users.
#[derive(Debug)]
pub struct ValueData {
    pub ty: TyId,
    pub name: Option<SmolStr>,
    pub users: Vec<ValueId>,
    pub kind: ValueKind,
}

impl ValueData {
    #[must_use]
    pub fn is_constant(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::ConstantInt { .. } | ValueKind::ConstantNull
        )
    }
}

/// Runtime intrinsics the IR reserves names for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntrinsicKind {
    /// `malloc(i32) -> ptr`
    Malloc,
    /// `__exception() -> void`, noreturn
    Exception,
}

static INTRINSIC_NAMES: Lazy<Vec<(IntrinsicKind, &'static str)>> =
    Lazy::new(|| vec![(IntrinsicKind::Malloc, "malloc"), (IntrinsicKind::Exception, "__exception")]);

impl IntrinsicKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        INTRINSIC_NAMES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, name)| *name)
            .expect("intrinsic name registered")
    }
}

/// One translation unit of IR: the global namespace plus the value arena.
#[derive(Debug)]
pub struct Module {
    pub ctx: Context,
    values: Arena<ValueData>,
    globals: HashMap<SmolStr, ValueId>,
    global_order: Vec<SmolStr>,
    intrinsics: HashMap<IntrinsicKind, ValueId>,
}

impl Module {
    pub fn new(ctx: Context) -> Self {
        let mut module = Self {
            ctx,
            values: Arena::new(),
            globals: HashMap::new(),
            global_order: Vec::new(),
            intrinsics: HashMap::new(),
        };
        module.register_intrinsics();
        module
    }

    fn register_intrinsics(&mut self) {
        let i32_ty = self.ctx.i32_ty();
        let ptr = self.ctx.ptr_ty();
        let void = self.ctx.void_ty();

        let malloc = self
            .create_function(IntrinsicKind::Malloc.name(), ptr, &[i32_ty])
            .expect("fresh module");
        self.function_mut(malloc).is_intrinsic = true;
        self.intrinsics.insert(IntrinsicKind::Malloc, malloc);

        let exception = self
            .create_function(IntrinsicKind::Exception.name(), void, &[])
            .expect("fresh module");
        {
            let f = self.function_mut(exception);
            f.is_intrinsic = true;
            f.noreturn = true;
        }
        self.intrinsics.insert(IntrinsicKind::Exception, exception);
    }

    // --- accessors -------------------------------------------------------

    #[must_use]
    pub fn value(&self, id: ValueId) -> &ValueData {
        &self.values[id]
    }

    #[must_use]
    pub fn ty_of(&self, id: ValueId) -> TyId {
        self.values[id].ty
    }

    pub fn set_name(&mut self, id: ValueId, name: impl Into<SmolStr>) {
        self.values[id].name = Some(name.into());
    }

    #[must_use]
    pub fn function(&self, id: ValueId) -> &Function {
        match &self.values[id].kind {
            ValueKind::Function(f) => f,
            other => panic!("expected function, found {other:?}"),
        }
    }

    pub(crate) fn function_mut(&mut self, id: ValueId) -> &mut Function {
        match &mut self.values[id].kind {
            ValueKind::Function(f) => f,
            other => panic!("expected function, found {other:?}"),
        }
    }

    #[must_use]
    pub fn block(&self, id: ValueId) -> &Block {
        match &self.values[id].kind {
            ValueKind::Block(b) => b,
            other => panic!("expected block, found {other:?}"),
        }
    }

    #[must_use]
    pub fn instr(&self, id: ValueId) -> &Instr {
        match &self.values[id].kind {
            ValueKind::Instr(i) => i,
            other => panic!("expected instruction, found {other:?}"),
        }
    }

    /// Globals (functions and variables) in creation order.
    pub fn global_values(&self) -> impl Iterator<Item = (&SmolStr, ValueId)> {
        self.global_order
            .iter()
            .map(move |name| (name, self.globals[name]))
    }

    pub fn functions(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.global_order.iter().filter_map(move |name| {
            let id = self.globals[name];
            matches!(self.values[id].kind, ValueKind::Function(_)).then_some(id)
        })
    }

    pub fn find_function(&self, name: &str) -> Option<ValueId> {
        let id = *self.globals.get(name)?;
        matches!(self.values[id].kind, ValueKind::Function(_)).then_some(id)
    }

    /// Any global object (function or variable) by name.
    pub fn find_global(&self, name: &str) -> Option<ValueId> {
        self.globals.get(name).copied()
    }

    pub fn find_global_variable(&self, name: &str) -> Option<ValueId> {
        let id = *self.globals.get(name)?;
        matches!(self.values[id].kind, ValueKind::GlobalVariable).then_some(id)
    }

    #[must_use]
    pub fn intrinsic(&self, kind: IntrinsicKind) -> ValueId {
        self.intrinsics[&kind]
    }

    // --- creation --------------------------------------------------------

    pub(crate) fn alloc_value(&mut self, ty: TyId, kind: ValueKind) -> ValueId {
        self.values.alloc(ValueData {
            ty,
            name: None,
            users: Vec::new(),
            kind,
        })
    }

    /// Registers `operand` on `user`, appending `user` to the operand's
    /// user list.
    pub fn add_operand(&mut self, user: ValueId, operand: ValueId) {
        match &mut self.values[user].kind {
            ValueKind::Instr(instr) => instr.operands.push(operand),
            other => panic!("operands belong to instructions, found {other:?}"),
        }
        self.values[operand].users.push(user);
    }

    /// Creates a function; `None` when the name is taken.
    pub fn create_function(&mut self, name: &str, ret: TyId, params: &[TyId]) -> Option<ValueId> {
        if self.globals.contains_key(name) {
            return None;
        }
        let fn_ty = self.ctx.function_ty(ret, params.to_vec());
        let id = self.alloc_value(
            fn_ty,
            ValueKind::Function(Function {
                ty: fn_ty,
                args: Vec::new(),
                blocks: Vec::new(),
                is_intrinsic: false,
                noreturn: false,
            }),
        );
        self.values[id].name = Some(SmolStr::new(name));
        let args: Vec<ValueId> = params
            .iter()
            .enumerate()
            .map(|(index, &ty)| {
                let arg = self.alloc_value(ty, ValueKind::Argument { index: index as u32 });
                self.values[arg].name = Some(SmolStr::new("arg"));
                arg
            })
            .collect();
        self.function_mut(id).args = args;
        self.globals.insert(SmolStr::new(name), id);
        self.global_order.push(SmolStr::new(name));
        Some(id)
    }

    pub fn set_noreturn(&mut self, function: ValueId) {
        self.function_mut(function).noreturn = true;
    }

    /// Creates a global variable; `None` when the name is taken.
    pub fn create_global_variable(&mut self, ty: TyId, name: &str) -> Option<ValueId> {
        if self.globals.contains_key(name) {
            return None;
        }
        let id = self.alloc_value(ty, ValueKind::GlobalVariable);
        self.values[id].name = Some(SmolStr::new(name));
        self.globals.insert(SmolStr::new(name), id);
        self.global_order.push(SmolStr::new(name));
        Some(id)
    }

    pub fn create_block(&mut self, function: ValueId) -> ValueId {
        let label = self.ctx.label_ty();
        let block = self.alloc_value(
            label,
            ValueKind::Block(Block {
                instrs: Vec::new(),
                parent: function,
            }),
        );
        self.values[block].name = Some(SmolStr::new("bb"));
        self.function_mut(function).blocks.push(block);
        block
    }

    pub(crate) fn append_instr(&mut self, block: ValueId, instr: ValueId) {
        match &mut self.values[block].kind {
            ValueKind::Block(b) => b.instrs.push(instr),
            other => panic!("expected block, found {other:?}"),
        }
    }

    /// Inserts an alloca at the top of the function's entry block, so
    /// stack slots dominate every use.
    pub fn create_entry_alloca(&mut self, function: ValueId, alloc_ty: TyId) -> ValueId {
        let ptr = self.ctx.ptr_ty();
        let instr = self.alloc_value(
            ptr,
            ValueKind::Instr(Instr {
                opcode: Opcode::Alloca { alloc_ty },
                operands: Vec::new(),
            }),
        );
        let entry = *self
            .function(function)
            .blocks
            .first()
            .expect("function has an entry block");
        match &mut self.values[entry].kind {
            ValueKind::Block(b) => b.instrs.insert(0, instr),
            other => panic!("expected block, found {other:?}"),
        }
        instr
    }

    // --- constants -------------------------------------------------------

    pub fn const_int(&mut self, ty: TyId, value: i64) -> ValueId {
        self.alloc_value(ty, ValueKind::ConstantInt { value })
    }

    pub fn const_i32(&mut self, value: i32) -> ValueId {
        let ty = self.ctx.i32_ty();
        self.const_int(ty, value as i64)
    }

    pub fn const_bool(&mut self, value: bool) -> ValueId {
        let ty = self.ctx.i1();
        self.const_int(ty, value as i64)
    }

    /// All-ones of an integer type, for xor-based negation.
    pub fn const_all_ones(&mut self, ty: TyId) -> ValueId {
        let bits = match self.ctx.ty(ty) {
            Ty::Integer(bits) => *bits,
            other => panic!("all-ones of non-integer type {other:?}"),
        };
        let value = if bits == 64 { -1i64 } else { (1i64 << bits) - 1 };
        self.const_int(ty, value)
    }

    pub fn const_null(&mut self) -> ValueId {
        let ptr = self.ctx.ptr_ty();
        self.alloc_value(ptr, ValueKind::ConstantNull)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operand_registration_builds_use_lists() {
        let mut m = Module::new(Context::new());
        let i32_ty = m.ctx.i32_ty();
        let f = m.create_function("f", i32_ty, &[i32_ty, i32_ty]).unwrap();
        let entry = m.create_block(f);
        let mut b = crate::builder::Builder::new();
        b.set_insert_point(entry);
        let args = m.function(f).args.clone();
        let sum = b.create_binary(&mut m, BinOp::Add, args[0], args[1]);
        assert_eq!(m.instr(sum).operands, args);
        assert!(m.value(args[0]).users.contains(&sum));
        assert!(m.value(args[1]).users.contains(&sum));
    }

    #[test]
    fn duplicate_global_names_are_rejected() {
        let mut m = Module::new(Context::new());
        let i32_ty = m.ctx.i32_ty();
        assert!(m.create_global_variable(i32_ty, "g").is_some());
        assert!(m.create_global_variable(i32_ty, "g").is_none());
        assert!(m.create_function("g", i32_ty, &[]).is_none());
    }

    #[test]
    fn intrinsics_are_registered() {
        let m = Module::new(Context::new());
        let malloc = m.intrinsic(IntrinsicKind::Malloc);
        assert_eq!(m.value(malloc).name.as_deref(), Some("malloc"));
        let exception = m.intrinsic(IntrinsicKind::Exception);
        assert!(m.function(exception).noreturn);
    }
}
