use pretty_assertions::assert_eq;

use crate::ir::{InstClass, Type, Value};

use super::{parse_function, parse_module};

const SCENARIO: &str = "\
fn @scenario(%a: i32, %b: i32, %c: i32, %d: i32, %p: ptr, %q: ptr) {
entry:
  %t1 = add i32 %a, %b
  %t2 = add i32 %c, %d
  store %t1, %p
  store %t2, %q
  call void @f()
  ret
}
";

#[test]
fn parses_and_reprints_unchanged() {
    let func = parse_function(SCENARIO).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(func.to_string(), SCENARIO);
}

#[test]
fn classifies_parsed_instructions() {
    let func = parse_function(SCENARIO).unwrap_or_else(|e| panic!("{e}"));
    let classes: Vec<InstClass> = func.blocks()[0]
        .insts()
        .iter()
        .map(|&id| func.inst(id).class())
        .collect();
    assert_eq!(
        classes,
        vec![
            InstClass::BinaryAdd,
            InstClass::BinaryAdd,
            InstClass::StorageWrite,
            InstClass::StorageWrite,
            InstClass::Call,
            InstClass::Other,
        ]
    );
}

#[test]
fn parsed_operands_register_uses() {
    let func = parse_function(SCENARIO).unwrap_or_else(|e| panic!("{e}"));
    let insts = func.blocks()[0].insts();
    assert_eq!(func.uses(insts[0]).len(), 1);
    assert_eq!(func.uses(insts[0])[0].user, insts[2]);
    assert_eq!(func.uses(insts[1])[0].user, insts[3]);
}

#[test]
fn parses_vector_forms_and_comments() {
    let src = "\
; lanes built by hand
fn @vec(%a: i32) {
entry:
  %v = insertelement <2 x i32> splat <2 x i32> 0, %a, 1 ; lane 1
  %s = add <2 x i32> %v, %v
  %e = extractelement <2 x i32> %s, 1
  ret %e
}
";
    let func = parse_function(src).unwrap_or_else(|e| panic!("{e}"));
    let insts = func.blocks()[0].insts();
    assert_eq!(func.inst(insts[0]).ty(), Type::i32_vector(2));
    assert_eq!(func.inst(insts[1]).ty(), Type::i32_vector(2));
    assert_eq!(func.inst(insts[1]).class(), InstClass::Other);
    assert_eq!(func.inst(insts[2]).ty(), Type::I32);
    assert_eq!(
        func.inst(insts[0]).inst().operand(0),
        Some(Value::splat_i32(2, 0))
    );
}

#[test]
fn parses_several_functions_and_blocks() {
    let src = "\
fn @one() {
entry:
  call void @f()
next:
  ret
}
fn @two(%x: i32) {
entry:
  %y = add i32 %x, 1
  ret %y
}
";
    let funcs = parse_module(src).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(funcs.len(), 2);
    assert_eq!(funcs[0].name(), "one");
    assert_eq!(funcs[0].blocks().len(), 2);
    assert_eq!(funcs[1].name(), "two");
    assert_eq!(funcs[1].params().len(), 1);
}

#[test]
fn globals_are_pointers() {
    let src = "\
fn @g() {
entry:
  store 7, @counter
  ret
}
";
    let func = parse_function(src).unwrap_or_else(|e| panic!("{e}"));
    let store = func.blocks()[0].insts()[0];
    let dest = func
        .inst(store)
        .inst()
        .operand(1)
        .unwrap_or_else(|| panic!("store has a destination"));
    assert_eq!(func.value_type(dest), Type::Ptr);
    assert_eq!(func.display_value(dest).to_string(), "@counter");
}

// ── Errors ──────────────────────────────────────────────────

#[test]
fn undefined_value_is_reported_with_location() {
    let src = "fn @f() {\nentry:\n  store %nope, @g\n}\n";
    let err = parse_function(src).err().unwrap_or_else(|| panic!("expected an error"));
    assert_eq!(err.message, "undefined value `%nope`");
    assert_eq!(err.line_col(src), (3, 9));
}

#[test]
fn redefinition_is_rejected() {
    let src = "fn @f(%a: i32) {\nentry:\n  %a = add i32 %a, %a\n}\n";
    let err = parse_function(src).err().unwrap_or_else(|| panic!("expected an error"));
    assert_eq!(err.message, "redefinition of `%a`");
}

#[test]
fn naming_a_store_is_rejected() {
    let src = "fn @f(%p: ptr) {\nentry:\n  %s = store 1, %p\n}\n";
    let err = parse_function(src).err().unwrap_or_else(|| panic!("expected an error"));
    assert_eq!(err.message, "`store` produces no value to name");
}

#[test]
fn unknown_opcode_is_rejected() {
    let src = "fn @f() {\nentry:\n  frobnicate\n}\n";
    let err = parse_function(src).err().unwrap_or_else(|| panic!("expected an error"));
    assert_eq!(err.message, "unknown instruction `frobnicate`");
}

#[test]
fn instruction_outside_block_is_rejected() {
    let src = "fn @f() {\n  ret\n}\n";
    let err = parse_function(src).err().unwrap_or_else(|| panic!("expected an error"));
    assert_eq!(err.message, "instruction before first block label");
}

#[test]
fn stray_character_is_a_lex_error() {
    let err = parse_function("fn @f() { entry: ret # }")
        .err()
        .unwrap_or_else(|| panic!("expected an error"));
    assert_eq!(err.message, "unrecognized token `#`");
}

#[test]
fn trailing_input_after_single_function() {
    let src = "fn @f() {\nentry:\n  ret\n}\n}";
    let err = parse_function(src).err().unwrap_or_else(|| panic!("expected an error"));
    assert_eq!(err.message, "expected end of input, found `}`");
}
