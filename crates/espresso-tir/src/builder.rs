//! Instruction construction at an insertion point.

use crate::module::{
    BinOp, CastOp, Instr, Module, Opcode, Predicate, ValueId, ValueKind,
};
use crate::ty::{Ty, TyId};

/// Appends instructions to the current basic block. The builder holds no
/// module reference; every `create_*` takes the module so several
/// builders can interleave.
#[derive(Debug, Default)]
pub struct Builder {
    insert_point: Option<ValueId>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_insert_point(&mut self, block: ValueId) {
        self.insert_point = Some(block);
    }

    #[must_use]
    pub fn insert_point(&self) -> Option<ValueId> {
        self.insert_point
    }

    fn emit(&self, m: &mut Module, ty: TyId, opcode: Opcode, operands: &[ValueId]) -> ValueId {
        let block = self.insert_point.expect("builder has an insertion point");
        let instr = m.alloc_value(
            ty,
            ValueKind::Instr(Instr {
                opcode,
                operands: Vec::new(),
            }),
        );
        for &operand in operands {
            m.add_operand(instr, operand);
        }
        m.append_instr(block, instr);
        instr
    }

    pub fn create_alloca(&self, m: &mut Module, alloc_ty: TyId) -> ValueId {
        let ptr = m.ctx.ptr_ty();
        self.emit(m, ptr, Opcode::Alloca { alloc_ty }, &[])
    }

    pub fn create_load(&self, m: &mut Module, ty: TyId, ptr: ValueId) -> ValueId {
        self.emit(m, ty, Opcode::Load { ty }, &[ptr])
    }

    pub fn create_store(&self, m: &mut Module, value: ValueId, ptr: ValueId) -> ValueId {
        let void = m.ctx.void_ty();
        self.emit(m, void, Opcode::Store, &[value, ptr])
    }

    pub fn create_gep(
        &self,
        m: &mut Module,
        base: ValueId,
        struct_ty: TyId,
        indices: &[ValueId],
    ) -> ValueId {
        let ptr = m.ctx.ptr_ty();
        let mut operands = vec![base];
        operands.extend_from_slice(indices);
        self.emit(m, ptr, Opcode::GetElementPtr { struct_ty }, &operands)
    }

    pub fn create_binary(
        &self,
        m: &mut Module,
        op: BinOp,
        lhs: ValueId,
        rhs: ValueId,
    ) -> ValueId {
        let ty = m.ty_of(lhs);
        self.emit(m, ty, Opcode::BinOp(op), &[lhs, rhs])
    }

    pub fn create_cmp(
        &self,
        m: &mut Module,
        pred: Predicate,
        lhs: ValueId,
        rhs: ValueId,
    ) -> ValueId {
        let i1 = m.ctx.i1();
        self.emit(m, i1, Opcode::Cmp(pred), &[lhs, rhs])
    }

    pub fn create_icast(
        &self,
        m: &mut Module,
        op: CastOp,
        value: ValueId,
        to: TyId,
    ) -> ValueId {
        self.emit(m, to, Opcode::ICast { op, to }, &[value])
    }

    pub fn create_call(&self, m: &mut Module, callee: ValueId, args: &[ValueId]) -> ValueId {
        let ret = match m.ctx.ty(m.ty_of(callee)) {
            Ty::Function { ret, .. } => *ret,
            other => panic!("call of non-function type {other:?}"),
        };
        let mut operands = vec![callee];
        operands.extend_from_slice(args);
        self.emit(m, ret, Opcode::Call, &operands)
    }

    pub fn create_branch(&self, m: &mut Module, target: ValueId) -> ValueId {
        let void = m.ctx.void_ty();
        self.emit(m, void, Opcode::Br, &[target])
    }

    pub fn create_cond_branch(
        &self,
        m: &mut Module,
        cond: ValueId,
        then_block: ValueId,
        else_block: ValueId,
    ) -> ValueId {
        let void = m.ctx.void_ty();
        self.emit(m, void, Opcode::Br, &[cond, then_block, else_block])
    }

    pub fn create_ret(&self, m: &mut Module, value: Option<ValueId>) -> ValueId {
        let void = m.ctx.void_ty();
        match value {
            Some(value) => self.emit(m, void, Opcode::Ret, &[value]),
            None => self.emit(m, void, Opcode::Ret, &[]),
        }
    }
}
