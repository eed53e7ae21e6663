//! Print/parse round-trips and printed-form checks.

use espresso_tir::{
    parse_module, structurally_equal, BinOp, Builder, CastOp, Context, IntrinsicKind,
    Module, Predicate,
};
use pretty_assertions::assert_eq;

/// A function exercising every instruction once.
fn sample_module() -> Module {
    let mut m = Module::new(Context::new());
    let i32_ty = m.ctx.i32_ty();
    let i8_ty = m.ctx.int_ty(8);
    let ptr = m.ctx.ptr_ty();
    let arr_ty = m.ctx.struct_ty(vec![i32_ty, ptr]);
    let void = m.ctx.void_ty();

    m.create_global_variable(i32_ty, "counter").unwrap();

    let f = m.create_function("sum", i32_ty, &[i32_ty, i32_ty]).unwrap();
    let entry = m.create_block(f);
    let oob = m.create_block(f);
    m.set_name(oob, "array.oob");
    let exit = m.create_block(f);

    let args = m.function(f).args.clone();
    let mut b = Builder::new();
    b.set_insert_point(entry);

    let slot = b.create_alloca(&mut m, i32_ty);
    let sum = b.create_binary(&mut m, BinOp::Add, args[0], args[1]);
    b.create_store(&mut m, sum, slot);
    let narrow = b.create_icast(&mut m, CastOp::Trunc, sum, i8_ty);
    let wide = b.create_icast(&mut m, CastOp::SExt, narrow, i32_ty);
    let limit = m.const_i32(10);
    let in_range = b.create_cmp(&mut m, Predicate::Lt, wide, limit);
    b.create_cond_branch(&mut m, in_range, exit, oob);

    b.set_insert_point(oob);
    let exception = m.intrinsic(IntrinsicKind::Exception);
    b.create_call(&mut m, exception, &[]);
    b.create_branch(&mut m, exit);

    b.set_insert_point(exit);
    let sixteen = m.const_i32(16);
    let malloc = m.intrinsic(IntrinsicKind::Malloc);
    let raw = b.create_call(&mut m, malloc, &[sixteen]);
    let zero = m.const_i32(0);
    let len_slot = b.create_gep(&mut m, raw, arr_ty, &[zero]);
    b.create_store(&mut m, sum, len_slot);
    let loaded = b.create_load(&mut m, i32_ty, slot);
    b.create_ret(&mut m, Some(loaded));

    let g = m.create_function("noop", void, &[]).unwrap();
    let g_entry = m.create_block(g);
    b.set_insert_point(g_entry);
    b.create_ret(&mut m, None);

    m
}

#[test]
fn printed_module_parses_to_an_equivalent_module() {
    let m = sample_module();
    let text = m.display().to_string();
    let reparsed = parse_module(&text).expect("printed IR parses");
    assert!(
        structurally_equal(&m, &reparsed),
        "round-trip changed the module:\n{text}\n---\n{}",
        reparsed.display()
    );
    // And printing the reparsed module is a fixed point.
    assert_eq!(text, reparsed.display().to_string());
}

#[test]
fn printed_forms_follow_the_instruction_table() {
    let m = sample_module();
    let text = m.display().to_string();

    assert!(text.contains("global i32 @counter"), "{text}");
    assert!(text.contains("function external ptr @malloc("), "{text}");
    assert!(text.contains("function i32 @sum("), "{text}");
    assert!(text.contains("= alloca i32"), "{text}");
    assert!(text.contains("= add i32, "), "{text}");
    assert!(text.contains("= icast trunc "), "{text}");
    assert!(text.contains("= cmp lt i1 "), "{text}");
    assert!(text.contains("call @__exception() noreturn"), "{text}");
    assert!(text.contains("= call @malloc(i32 16)"), "{text}");
    assert!(text.contains("= getelementptr {i32, ptr}, "), "{text}");
    assert!(text.contains("%array.oob."), "{text}");
    assert!(text.contains("ret\n"), "{text}");
}

#[test]
fn external_functions_print_without_a_body() {
    let m = Module::new(Context::new());
    let text = m.display().to_string();
    assert!(text.contains("function external ptr @malloc(i32 %arg."));
    assert!(text.contains("function external void @__exception()"));
    assert!(!text.contains('{'));
}

#[test]
fn parse_rejects_malformed_input() {
    assert!(parse_module("function i32 @f(").is_err());
    assert!(parse_module("global i32 @g\nglobal i32 @g").is_err());
    assert!(parse_module("nonsense").is_err());
}
