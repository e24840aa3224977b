use pretty_assertions::assert_eq;

use crate::builder::Builder;
use crate::ir::{Function, Type, Value};
use crate::parse::parse_function;

#[test]
fn prints_every_instruction_kind() {
    let mut func = Function::new("all");
    let a = func.add_param("a", Type::I32);
    let p = func.add_param("p", Type::Ptr);
    let g = func.global("g");
    let entry = func.add_block("entry");

    let mut bld = Builder::at_end(&mut func, entry);
    let sum = bld.add(a, Value::i32(-3));
    let slot = bld.alloca(Type::I32);
    bld.store(sum, slot);
    let loaded = bld.load(Type::I32, g);
    let splat = bld.splat(2, 0);
    let packed = bld.insert_element(splat, loaded, 0);
    let lane = bld.extract_element(packed, 0);
    bld.call(Type::Void, "flush", &[]);
    bld.call(Type::I32, "use", &[lane, p]);
    bld.ret(Some(sum));

    let sum_id = sum.as_inst().unwrap_or_else(|| panic!("sum is an instruction"));
    func.set_name(sum_id, "t1");

    assert_eq!(
        func.to_string(),
        "\
fn @all(%a: i32, %p: ptr) {
entry:
  %t1 = add i32 %a, -3
  %_1 = alloca i32
  store %t1, %_1
  %_3 = load i32 @g
  %_4 = insertelement <2 x i32> splat <2 x i32> 0, %_3, 0
  %_5 = extractelement <2 x i32> %_4, 0
  call void @flush()
  %_7 = call i32 @use(%_5, %p)
  ret %t1
}
"
    );
}

#[test]
fn types_render_like_llvm() {
    assert_eq!(Type::I32.to_string(), "i32");
    assert_eq!(Type::i32_vector(8).to_string(), "<8 x i32>");
    assert_eq!(Type::Ptr.to_string(), "ptr");
    assert_eq!(Type::Void.to_string(), "void");
}

#[test]
fn unnamed_results_skip_taken_names() {
    let mut func = Function::new("clash");
    let a = func.add_param("a", Type::I32);
    let entry = func.add_block("entry");

    let mut bld = Builder::at_end(&mut func, entry);
    let x = bld.add(a, Value::i32(1));
    let y = bld.add(a, Value::i32(2));
    bld.call(Type::Void, "use", &[x, y]);

    let x_id = x.as_inst().unwrap_or_else(|| panic!("x is an instruction"));
    func.set_name(x_id, "_1");

    let text = func.to_string();
    assert_eq!(
        text,
        "\
fn @clash(%a: i32) {
entry:
  %_1 = add i32 %a, 1
  %_1_ = add i32 %a, 2
  call void @use(%_1, %_1_)
}
"
    );
    let reparsed = parse_function(&text).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(reparsed.to_string(), text);
}
