//! Parser for the textual IR, plus structural equivalence.
//!
//! Accepts exactly the output of [`Module::display`]. Used by the
//! round-trip tests and by the machine layer's test harness.

use std::collections::HashMap;

use thiserror::Error;

use crate::builder::Builder;
use crate::module::{BinOp, CastOp, Module, Opcode, Predicate, ValueId, ValueKind};
use crate::ty::{Context, Ty, TyId};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

fn err<T>(line: usize, message: impl Into<String>) -> Result<T, ParseError> {
    Err(ParseError {
        line,
        message: message.into(),
    })
}

struct Cursor<'a> {
    s: &'a str,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str, line: usize) -> Self {
        Self { s: s.trim(), line }
    }

    fn skip_ws(&mut self) {
        self.s = self.s.trim_start();
    }

    fn eat(&mut self, prefix: &str) -> bool {
        if let Some(rest) = self.s.strip_prefix(prefix) {
            self.s = rest;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, prefix: &str) -> Result<(), ParseError> {
        if self.eat(prefix) {
            Ok(())
        } else {
            err(self.line, format!("expected \"{prefix}\" at \"{}\"", self.s))
        }
    }

    fn is_empty(&self) -> bool {
        self.s.is_empty()
    }

    /// An identifier-ish token: letters, digits, `_`, `.`, `$`.
    fn ident(&mut self) -> Result<&'a str, ParseError> {
        let end = self
            .s
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '.' | '$')))
            .unwrap_or(self.s.len());
        if end == 0 {
            return err(self.line, format!("expected identifier at \"{}\"", self.s));
        }
        let (token, rest) = self.s.split_at(end);
        self.s = rest;
        Ok(token)
    }

    fn integer(&mut self) -> Result<i64, ParseError> {
        let end = self
            .s
            .char_indices()
            .find(|&(i, c)| !(c == '-' && i == 0 || c.is_ascii_digit()))
            .map(|(i, _)| i)
            .unwrap_or(self.s.len());
        let (token, rest) = self.s.split_at(end);
        let value = token
            .parse()
            .map_err(|_| ParseError {
                line: self.line,
                message: format!("expected integer at \"{}\"", self.s),
            })?;
        self.s = rest;
        Ok(value)
    }

    /// `%name.id` or `%id`; returns (old id, name).
    fn value_ref(&mut self) -> Result<(u32, Option<&'a str>), ParseError> {
        self.expect("%")?;
        let token = self.ident()?;
        match token.rsplit_once('.') {
            Some((name, id)) => {
                let id = id.parse().map_err(|_| ParseError {
                    line: self.line,
                    message: format!("bad value id in %{token}"),
                })?;
                Ok((id, Some(name)))
            }
            None => {
                let id = token.parse().map_err(|_| ParseError {
                    line: self.line,
                    message: format!("bad value id in %{token}"),
                })?;
                Ok((id, None))
            }
        }
    }

    fn ty(&mut self, ctx: &mut Context) -> Result<TyId, ParseError> {
        self.skip_ws();
        if self.eat("{") {
            let mut fields = Vec::new();
            loop {
                self.skip_ws();
                if self.eat("}") {
                    break;
                }
                if !fields.is_empty() {
                    self.expect(",")?;
                    self.skip_ws();
                }
                fields.push(self.ty(ctx)?);
            }
            return Ok(ctx.struct_ty(fields));
        }
        if self.eat("[") {
            self.skip_ws();
            let len = self.integer()? as u32;
            self.skip_ws();
            self.expect("x")?;
            let elem = self.ty(ctx)?;
            self.skip_ws();
            self.expect("]")?;
            return Ok(ctx.array_ty(elem, len));
        }
        if self.eat("void") {
            return Ok(ctx.void_ty());
        }
        if self.eat("label") {
            return Ok(ctx.label_ty());
        }
        if self.eat("ptr") {
            return Ok(ctx.ptr_ty());
        }
        if self.eat("i") {
            let bits = self.integer()? as u32;
            return Ok(ctx.int_ty(bits));
        }
        err(self.line, format!("expected type at \"{}\"", self.s))
    }
}

type ValueMap = HashMap<u32, ValueId>;

fn lookup(map: &ValueMap, id: u32, line: usize) -> Result<ValueId, ParseError> {
    map.get(&id).copied().map_or_else(
        || err(line, format!("reference to undefined value %{id}")),
        Ok,
    )
}

fn parse_operand(
    cur: &mut Cursor<'_>,
    m: &mut Module,
    map: &ValueMap,
) -> Result<ValueId, ParseError> {
    cur.skip_ws();
    if cur.eat("ptr* null") {
        return Ok(m.const_null());
    }
    if cur.s.starts_with('%') {
        let (id, _) = cur.value_ref()?;
        return lookup(map, id, cur.line);
    }
    if cur.eat("@") {
        let name = cur.ident()?;
        return m
            .find_global(name)
            .map_or_else(|| err(cur.line, format!("unknown global @{name}")), Ok);
    }
    let ty = cur.ty(&mut m.ctx)?;
    cur.skip_ws();
    if cur.s.starts_with('%') {
        let (id, _) = cur.value_ref()?;
        return lookup(map, id, cur.line);
    }
    let value = cur.integer()?;
    Ok(m.const_int(ty, value))
}

/// Parses a module from its printed form.
pub fn parse_module(text: &str) -> Result<Module, ParseError> {
    let mut m = Module::new(Context::new());
    let mut lines = text.lines().enumerate().peekable();

    while let Some((lineno, line)) = lines.next() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut cur = Cursor::new(line, lineno + 1);
        if cur.eat("global ") {
            let ty = cur.ty(&mut m.ctx)?;
            cur.skip_ws();
            cur.expect("@")?;
            let name = cur.ident()?.to_owned();
            if m.create_global_variable(ty, &name).is_none() {
                return err(lineno + 1, format!("duplicate global @{name}"));
            }
        } else if cur.eat("function ") {
            let external = cur.eat("external ");
            let ret = cur.ty(&mut m.ctx)?;
            cur.skip_ws();
            cur.expect("@")?;
            let name = cur.ident()?.to_owned();
            cur.expect("(")?;
            let mut params = Vec::new();
            let mut arg_ids = Vec::new();
            loop {
                cur.skip_ws();
                if cur.eat(")") {
                    break;
                }
                if !params.is_empty() {
                    cur.expect(",")?;
                    cur.skip_ws();
                }
                let ty = cur.ty(&mut m.ctx)?;
                cur.skip_ws();
                let (id, _) = cur.value_ref()?;
                params.push(ty);
                arg_ids.push(id);
            }

            // Intrinsics already exist; everything else is created fresh.
            let function = match m.find_function(&name) {
                Some(existing) => existing,
                None => match m.create_function(&name, ret, &params) {
                    Some(f) => f,
                    None => return err(lineno + 1, format!("duplicate function @{name}")),
                },
            };
            let mut map = ValueMap::new();
            for (&old, &new) in arg_ids.iter().zip(&m.function(function).args) {
                map.insert(old, new);
            }

            cur.skip_ws();
            if external {
                continue;
            }
            if !cur.eat("{") {
                return err(lineno + 1, "expected function body");
            }

            // Collect the body, then pre-create the blocks so branches
            // can reference them forward.
            let mut body = Vec::new();
            loop {
                let Some((lineno, line)) = lines.next() else {
                    return err(lineno + 1, "unterminated function body");
                };
                let line = line.trim();
                if line == "}" {
                    break;
                }
                if !line.is_empty() {
                    body.push((lineno + 1, line));
                }
            }
            for &(lineno, line) in &body {
                if let Some(label) = line.strip_suffix(':') {
                    let mut cur = Cursor::new(label, lineno);
                    let (id, name) = cur.value_ref()?;
                    let block = m.create_block(function);
                    if let Some(name) = name {
                        m.set_name(block, name);
                    }
                    map.insert(id, block);
                }
            }

            let mut builder = Builder::new();
            for &(lineno, line) in &body {
                if let Some(label) = line.strip_suffix(':') {
                    let mut cur = Cursor::new(label, lineno);
                    let (id, _) = cur.value_ref()?;
                    builder.set_insert_point(lookup(&map, id, lineno)?);
                    continue;
                }
                if builder.insert_point().is_none() {
                    return err(lineno, "instruction outside a basic block");
                }
                parse_instr(line, lineno, &mut m, &builder, &mut map)?;
            }
        } else {
            return err(lineno + 1, format!("unexpected line: {line}"));
        }
    }
    Ok(m)
}

fn parse_instr(
    line: &str,
    lineno: usize,
    m: &mut Module,
    builder: &Builder,
    map: &mut ValueMap,
) -> Result<(), ParseError> {
    let mut cur = Cursor::new(line, lineno);

    // Optional result: `%ref = `.
    let mut result = None;
    if cur.s.starts_with('%') {
        let (id, name) = cur.value_ref()?;
        result = Some((id, name.map(str::to_owned)));
        cur.skip_ws();
        cur.expect("=")?;
        cur.skip_ws();
    }

    let instr = if cur.eat("alloca ") {
        let ty = cur.ty(&mut m.ctx)?;
        builder.create_alloca(m, ty)
    } else if cur.eat("load ") {
        let ty = cur.ty(&mut m.ctx)?;
        cur.expect(",")?;
        let ptr = parse_operand(&mut cur, m, map)?;
        builder.create_load(m, ty, ptr)
    } else if cur.eat("store ") {
        let value = parse_operand(&mut cur, m, map)?;
        cur.expect(",")?;
        let ptr = parse_operand(&mut cur, m, map)?;
        builder.create_store(m, value, ptr)
    } else if cur.eat("getelementptr ") {
        let struct_ty = cur.ty(&mut m.ctx)?;
        cur.expect(",")?;
        let base = parse_operand(&mut cur, m, map)?;
        let mut indices = Vec::new();
        loop {
            cur.skip_ws();
            if cur.is_empty() {
                break;
            }
            cur.expect(",")?;
            indices.push(parse_operand(&mut cur, m, map)?);
        }
        builder.create_gep(m, base, struct_ty, &indices)
    } else if cur.eat("cmp ") {
        let pred = match cur.ident()? {
            "eq" => Predicate::Eq,
            "ne" => Predicate::Ne,
            "lt" => Predicate::Lt,
            "le" => Predicate::Le,
            "gt" => Predicate::Gt,
            "ge" => Predicate::Ge,
            other => return err(lineno, format!("unknown predicate {other}")),
        };
        let _result_ty = cur.ty(&mut m.ctx)?;
        let lhs = parse_operand(&mut cur, m, map)?;
        cur.expect(",")?;
        let rhs = parse_operand(&mut cur, m, map)?;
        builder.create_cmp(m, pred, lhs, rhs)
    } else if cur.eat("icast ") {
        let op = match cur.ident()? {
            "trunc" => CastOp::Trunc,
            "sext" => CastOp::SExt,
            "zext" => CastOp::ZExt,
            other => return err(lineno, format!("unknown cast op {other}")),
        };
        let value = parse_operand(&mut cur, m, map)?;
        cur.skip_ws();
        cur.expect("to ")?;
        let to = cur.ty(&mut m.ctx)?;
        builder.create_icast(m, op, value, to)
    } else if cur.eat("call ") {
        let callee = parse_operand(&mut cur, m, map)?;
        cur.expect("(")?;
        let mut args = Vec::new();
        loop {
            cur.skip_ws();
            if cur.eat(")") {
                break;
            }
            if !args.is_empty() {
                cur.expect(",")?;
            }
            args.push(parse_operand(&mut cur, m, map)?);
        }
        cur.skip_ws();
        let _ = cur.eat("noreturn");
        builder.create_call(m, callee, &args)
    } else if cur.eat("br ") {
        let first = parse_operand(&mut cur, m, map)?;
        cur.skip_ws();
        if cur.is_empty() {
            builder.create_branch(m, first)
        } else {
            cur.expect(",")?;
            let then_block = parse_operand(&mut cur, m, map)?;
            cur.expect(",")?;
            let else_block = parse_operand(&mut cur, m, map)?;
            builder.create_cond_branch(m, first, then_block, else_block)
        }
    } else if cur.eat("ret") {
        cur.skip_ws();
        if cur.is_empty() {
            builder.create_ret(m, None)
        } else {
            let value = parse_operand(&mut cur, m, map)?;
            builder.create_ret(m, Some(value))
        }
    } else {
        // Binary op mnemonics.
        let mnemonic = cur.ident()?;
        let op = match mnemonic {
            "add" => BinOp::Add,
            "sub" => BinOp::Sub,
            "mul" => BinOp::Mul,
            "div" => BinOp::Div,
            "rem" => BinOp::Rem,
            "and" => BinOp::And,
            "or" => BinOp::Or,
            "xor" => BinOp::Xor,
            other => return err(lineno, format!("unknown instruction {other}")),
        };
        let _result_ty = cur.ty(&mut m.ctx)?;
        cur.expect(",")?;
        let lhs = parse_operand(&mut cur, m, map)?;
        cur.expect(",")?;
        let rhs = parse_operand(&mut cur, m, map)?;
        builder.create_binary(m, op, lhs, rhs)
    };

    if let Some((old, name)) = result {
        if let Some(name) = name {
            m.set_name(instr, name);
        }
        map.insert(old, instr);
    }
    Ok(())
}

// --- structural equivalence ---------------------------------------------

fn ty_equal(actx: &Context, a: TyId, bctx: &Context, b: TyId) -> bool {
    match (actx.ty(a), bctx.ty(b)) {
        (Ty::Void, Ty::Void)
        | (Ty::Label, Ty::Label)
        | (Ty::Pointer, Ty::Pointer) => true,
        (Ty::Integer(x), Ty::Integer(y)) => x == y,
        (Ty::Array { elem: ea, len: la }, Ty::Array { elem: eb, len: lb }) => {
            la == lb && ty_equal(actx, *ea, bctx, *eb)
        }
        (Ty::Struct(fa), Ty::Struct(fb)) => {
            fa.len() == fb.len()
                && fa
                    .iter()
                    .zip(fb)
                    .all(|(&x, &y)| ty_equal(actx, x, bctx, y))
        }
        (
            Ty::Function { ret: ra, params: pa },
            Ty::Function { ret: rb, params: pb },
        ) => {
            ty_equal(actx, *ra, bctx, *rb)
                && pa.len() == pb.len()
                && pa
                    .iter()
                    .zip(pb)
                    .all(|(&x, &y)| ty_equal(actx, x, bctx, y))
        }
        _ => false,
    }
}

fn operand_equal(
    a: &Module,
    av: ValueId,
    b: &Module,
    bv: ValueId,
    map: &HashMap<ValueId, ValueId>,
) -> bool {
    match (&a.value(av).kind, &b.value(bv).kind) {
        (ValueKind::ConstantInt { value: x }, ValueKind::ConstantInt { value: y }) => {
            x == y && ty_equal(&a.ctx, a.ty_of(av), &b.ctx, b.ty_of(bv))
        }
        (ValueKind::ConstantNull, ValueKind::ConstantNull) => true,
        (ValueKind::Function(_), ValueKind::Function(_))
        | (ValueKind::GlobalVariable, ValueKind::GlobalVariable) => {
            a.value(av).name == b.value(bv).name
        }
        _ => map.get(&av) == Some(&bv),
    }
}

/// Value-structural equivalence: same globals in order, same function
/// shapes, same instructions with equivalent operands, ignoring value
/// numbering.
pub fn structurally_equal(a: &Module, b: &Module) -> bool {
    let a_globals: Vec<_> = a.global_values().collect();
    let b_globals: Vec<_> = b.global_values().collect();
    if a_globals.len() != b_globals.len() {
        return false;
    }

    for (&(a_name, av), &(b_name, bv)) in a_globals.iter().zip(&b_globals) {
        if a_name != b_name {
            return false;
        }
        match (&a.value(av).kind, &b.value(bv).kind) {
            (ValueKind::GlobalVariable, ValueKind::GlobalVariable) => {
                if !ty_equal(&a.ctx, a.ty_of(av), &b.ctx, b.ty_of(bv)) {
                    return false;
                }
            }
            (ValueKind::Function(fa), ValueKind::Function(fb)) => {
                if !ty_equal(&a.ctx, fa.ty, &b.ctx, fb.ty) {
                    return false;
                }
                if fa.blocks.len() != fb.blocks.len() || fa.args.len() != fb.args.len() {
                    return false;
                }
                let mut map: HashMap<ValueId, ValueId> = HashMap::new();
                for (&x, &y) in fa.args.iter().zip(&fb.args) {
                    map.insert(x, y);
                }
                for (&x, &y) in fa.blocks.iter().zip(&fb.blocks) {
                    map.insert(x, y);
                }
                for (&ab, &bb) in fa.blocks.iter().zip(&fb.blocks) {
                    let ai = &a.block(ab).instrs;
                    let bi = &b.block(bb).instrs;
                    if ai.len() != bi.len() {
                        return false;
                    }
                    for (&x, &y) in ai.iter().zip(bi) {
                        map.insert(x, y);
                    }
                }
                for (&ab, &bb) in fa.blocks.iter().zip(&fb.blocks) {
                    for (&x, &y) in a.block(ab).instrs.iter().zip(&b.block(bb).instrs) {
                        if !instr_equal(a, x, b, y, &map) {
                            return false;
                        }
                    }
                }
            }
            _ => return false,
        }
    }
    true
}

fn instr_equal(
    a: &Module,
    ai: ValueId,
    b: &Module,
    bi: ValueId,
    map: &HashMap<ValueId, ValueId>,
) -> bool {
    let x = a.instr(ai);
    let y = b.instr(bi);
    let opcode_ok = match (&x.opcode, &y.opcode) {
        (Opcode::Alloca { alloc_ty: ta }, Opcode::Alloca { alloc_ty: tb }) => {
            ty_equal(&a.ctx, *ta, &b.ctx, *tb)
        }
        (Opcode::Load { ty: ta }, Opcode::Load { ty: tb }) => ty_equal(&a.ctx, *ta, &b.ctx, *tb),
        (Opcode::Store, Opcode::Store)
        | (Opcode::Call, Opcode::Call)
        | (Opcode::Br, Opcode::Br)
        | (Opcode::Ret, Opcode::Ret) => true,
        (
            Opcode::GetElementPtr { struct_ty: ta },
            Opcode::GetElementPtr { struct_ty: tb },
        ) => ty_equal(&a.ctx, *ta, &b.ctx, *tb),
        (Opcode::BinOp(oa), Opcode::BinOp(ob)) => oa == ob,
        (Opcode::Cmp(pa), Opcode::Cmp(pb)) => pa == pb,
        (Opcode::ICast { op: oa, to: ta }, Opcode::ICast { op: ob, to: tb }) => {
            oa == ob && ty_equal(&a.ctx, *ta, &b.ctx, *tb)
        }
        _ => false,
    };
    if !opcode_ok || x.operands.len() != y.operands.len() {
        return false;
    }
    x.operands
        .iter()
        .zip(&y.operands)
        .all(|(&av, &bv)| operand_equal(a, av, b, bv, map))
}
