//! IR types, uniqued in a [`Context`].

use std::collections::HashMap;
use std::fmt;

use espresso_core::{Arena, Idx};

pub type TyId = Idx<Ty>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Void,
    Label,
    Pointer,
    /// Bit width ∈ {1, 8, 16, 32, 64}.
    Integer(u32),
    Array { elem: TyId, len: u32 },
    Struct(Vec<TyId>),
    Function { ret: TyId, params: Vec<TyId> },
}

/// Owns and uniques all IR types of a compilation. Two structurally equal
/// types always share one `TyId`, so type equality is id equality.
#[derive(Debug, Default)]
pub struct Context {
    types: Arena<Ty>,
    interned: HashMap<Ty, TyId>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, ty: Ty) -> TyId {
        if let Some(&id) = self.interned.get(&ty) {
            return id;
        }
        let id = self.types.alloc(ty.clone());
        self.interned.insert(ty, id);
        id
    }

    #[must_use]
    pub fn ty(&self, id: TyId) -> &Ty {
        &self.types[id]
    }

    pub fn void_ty(&mut self) -> TyId {
        self.intern(Ty::Void)
    }

    pub fn label_ty(&mut self) -> TyId {
        self.intern(Ty::Label)
    }

    pub fn ptr_ty(&mut self) -> TyId {
        self.intern(Ty::Pointer)
    }

    pub fn int_ty(&mut self, bits: u32) -> TyId {
        debug_assert!(matches!(bits, 1 | 8 | 16 | 32 | 64));
        self.intern(Ty::Integer(bits))
    }

    pub fn i1(&mut self) -> TyId {
        self.int_ty(1)
    }

    pub fn i32_ty(&mut self) -> TyId {
        self.int_ty(32)
    }

    pub fn struct_ty(&mut self, fields: Vec<TyId>) -> TyId {
        self.intern(Ty::Struct(fields))
    }

    pub fn array_ty(&mut self, elem: TyId, len: u32) -> TyId {
        self.intern(Ty::Array { elem, len })
    }

    pub fn function_ty(&mut self, ret: TyId, params: Vec<TyId>) -> TyId {
        self.intern(Ty::Function { ret, params })
    }

    /// Value size in bits; pointers are 32-bit on the target this IR
    /// feeds (`malloc` takes an i32).
    pub fn size_in_bits(&self, id: TyId) -> u32 {
        match self.ty(id) {
            Ty::Void | Ty::Label => 0,
            Ty::Pointer => 32,
            Ty::Integer(bits) => *bits,
            Ty::Array { elem, len } => self.size_in_bits(*elem) * len,
            Ty::Struct(fields) => fields.iter().map(|&f| self.size_in_bits(f)).sum(),
            Ty::Function { .. } => 32,
        }
    }

    /// Renders `id` in the textual IR syntax (`i32`, `ptr`, `{i32, ptr}`).
    pub fn display(&self, id: TyId) -> TyDisplay<'_> {
        TyDisplay { ctx: self, id }
    }
}

pub struct TyDisplay<'a> {
    ctx: &'a Context,
    id: TyId,
}

impl fmt::Display for TyDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ctx.ty(self.id) {
            Ty::Void => f.write_str("void"),
            Ty::Label => f.write_str("label"),
            Ty::Pointer => f.write_str("ptr"),
            Ty::Integer(bits) => write!(f, "i{bits}"),
            Ty::Array { elem, len } => {
                write!(f, "[{len} x {}]", self.ctx.display(*elem))
            }
            Ty::Struct(fields) => {
                f.write_str("{")?;
                for (i, &field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", self.ctx.display(field))?;
                }
                f.write_str("}")
            }
            Ty::Function { ret, params } => {
                f.write_str("fn(")?;
                for (i, &param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", self.ctx.display(param))?;
                }
                write!(f, ") -> {}", self.ctx.display(*ret))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_are_uniqued() {
        let mut ctx = Context::new();
        let a = ctx.int_ty(32);
        let b = ctx.i32_ty();
        assert_eq!(a, b);

        let ptr = ctx.ptr_ty();
        let s1 = ctx.struct_ty(vec![a, ptr]);
        let s2 = ctx.struct_ty(vec![b, ptr]);
        assert_eq!(s1, s2);
    }

    #[test]
    fn display_forms() {
        let mut ctx = Context::new();
        let i32_ty = ctx.i32_ty();
        let ptr = ctx.ptr_ty();
        let arr = ctx.struct_ty(vec![i32_ty, ptr]);
        assert_eq!(ctx.display(i32_ty).to_string(), "i32");
        assert_eq!(ctx.display(arr).to_string(), "{i32, ptr}");
    }
}
