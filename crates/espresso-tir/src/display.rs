//! Textual IR output.
//!
//! Values print as `%<name.>id`, functions as `@name`; a function without
//! a body prints as `function external …`. The output of
//! [`Module::display`] is accepted by [`crate::parse_module`].

use std::fmt;

use crate::module::{Module, Opcode, ValueId, ValueKind};

impl Module {
    pub fn display(&self) -> ModuleDisplay<'_> {
        ModuleDisplay { m: self }
    }

    /// `%name.id` (or `%id` for unnamed values).
    pub fn value_ref(&self, id: ValueId) -> String {
        match &self.value(id).name {
            Some(name) => format!("%{}.{}", name, id.to_raw()),
            None => format!("%{}", id.to_raw()),
        }
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>, id: ValueId) -> fmt::Result {
        let value = self.value(id);
        match &value.kind {
            ValueKind::ConstantInt { value: v } => {
                write!(f, "{} {v}", self.ctx.display(value.ty))
            }
            ValueKind::ConstantNull => f.write_str("ptr* null"),
            ValueKind::Block(_) => f.write_str(&self.value_ref(id)),
            // Globals are their name; their declaration line carries the type.
            ValueKind::Function(_) | ValueKind::GlobalVariable => {
                write!(f, "@{}", value.name.as_deref().unwrap_or(""))
            }
            _ => write!(f, "{} {}", self.ctx.display(value.ty), self.value_ref(id)),
        }
    }

    fn write_instr(&self, f: &mut fmt::Formatter<'_>, id: ValueId) -> fmt::Result {
        let instr = self.instr(id);
        let ops = &instr.operands;
        match &instr.opcode {
            Opcode::Alloca { alloc_ty } => {
                write!(
                    f,
                    "{} = alloca {}",
                    self.value_ref(id),
                    self.ctx.display(*alloc_ty)
                )
            }
            Opcode::Load { ty } => {
                write!(f, "{} = load {}, ", self.value_ref(id), self.ctx.display(*ty))?;
                self.write_operand(f, ops[0])
            }
            Opcode::Store => {
                f.write_str("store ")?;
                self.write_operand(f, ops[0])?;
                f.write_str(", ")?;
                self.write_operand(f, ops[1])
            }
            Opcode::GetElementPtr { struct_ty } => {
                write!(
                    f,
                    "{} = getelementptr {}, ",
                    self.value_ref(id),
                    self.ctx.display(*struct_ty)
                )?;
                self.write_operand(f, ops[0])?;
                for &index in &ops[1..] {
                    f.write_str(", ")?;
                    self.write_operand(f, index)?;
                }
                Ok(())
            }
            Opcode::BinOp(op) => {
                write!(
                    f,
                    "{} = {} {}, ",
                    self.value_ref(id),
                    op.mnemonic(),
                    self.ctx.display(self.ty_of(id))
                )?;
                self.write_operand(f, ops[0])?;
                f.write_str(", ")?;
                self.write_operand(f, ops[1])
            }
            Opcode::Cmp(pred) => {
                write!(
                    f,
                    "{} = cmp {} {} ",
                    self.value_ref(id),
                    pred.mnemonic(),
                    self.ctx.display(self.ty_of(id))
                )?;
                self.write_operand(f, ops[0])?;
                f.write_str(", ")?;
                self.write_operand(f, ops[1])
            }
            Opcode::ICast { op, to } => {
                write!(f, "{} = icast {} ", self.value_ref(id), op.mnemonic())?;
                self.write_operand(f, ops[0])?;
                write!(f, " to {}", self.ctx.display(*to))
            }
            Opcode::Call => {
                let is_void = matches!(self.ctx.ty(self.ty_of(id)), crate::ty::Ty::Void);
                if !is_void {
                    write!(f, "{} = ", self.value_ref(id))?;
                }
                f.write_str("call ")?;
                self.write_operand(f, ops[0])?;
                f.write_str("(")?;
                for (i, &arg) in ops[1..].iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    self.write_operand(f, arg)?;
                }
                f.write_str(")")?;
                let callee = ops[0];
                if matches!(self.value(callee).kind, ValueKind::Function(_))
                    && self.function(callee).noreturn
                {
                    f.write_str(" noreturn")?;
                }
                Ok(())
            }
            Opcode::Br => {
                f.write_str("br ")?;
                self.write_operand(f, ops[0])?;
                for &target in &ops[1..] {
                    f.write_str(", ")?;
                    self.write_operand(f, target)?;
                }
                Ok(())
            }
            Opcode::Ret => {
                f.write_str("ret")?;
                if let Some(&value) = ops.first() {
                    f.write_str(" ")?;
                    self.write_operand(f, value)?;
                }
                Ok(())
            }
        }
    }

    fn write_function(&self, f: &mut fmt::Formatter<'_>, id: ValueId) -> fmt::Result {
        let function = self.function(id);
        let ret = match self.ctx.ty(function.ty) {
            crate::ty::Ty::Function { ret, .. } => *ret,
            other => panic!("function value of non-function type {other:?}"),
        };
        f.write_str("function ")?;
        if function.blocks.is_empty() {
            f.write_str("external ")?;
        }
        write!(
            f,
            "{} @{}(",
            self.ctx.display(ret),
            self.value(id).name.as_deref().unwrap_or("")
        )?;
        for (i, &arg) in function.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(
                f,
                "{} {}",
                self.ctx.display(self.ty_of(arg)),
                self.value_ref(arg)
            )?;
        }
        f.write_str(")")?;
        if function.blocks.is_empty() {
            return f.write_str("\n");
        }
        f.write_str(" {\n")?;
        for &block in &function.blocks {
            writeln!(f, "{}:", self.value_ref(block))?;
            for &instr in &self.block(block).instrs {
                f.write_str("  ")?;
                self.write_instr(f, instr)?;
                f.write_str("\n")?;
            }
        }
        f.write_str("}\n")
    }
}

pub struct ModuleDisplay<'a> {
    m: &'a Module,
}

impl fmt::Display for ModuleDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, id) in self.m.global_values() {
            match &self.m.value(id).kind {
                ValueKind::GlobalVariable => {
                    writeln!(
                        f,
                        "global {} @{name}",
                        self.m.ctx.display(self.m.ty_of(id))
                    )?;
                }
                ValueKind::Function(_) => self.m.write_function(f, id)?,
                other => panic!("global {name} is not a global object: {other:?}"),
            }
        }
        Ok(())
    }
}
