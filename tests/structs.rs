mod common;

use common::{expect_errors, expect_output};

#[test]
fn struct_declarations_are_types() {
    expect_output(
        "test :: struct { i:i32 = 2; f:f32 = 2.0; b:bool = true; };\nprint(test);\ntest2 :: struct { i:i32 = 3; f:f32 = 2.0; b:bool = false; };\nprint(test2);",
        &["test", "test2"],
    );
}

#[test]
fn struct_member_access() {
    expect_output(
        "TestStruct :: struct { i:i32; f:f32; b:bool; };\ninstance:TestStruct;\ninstance.i = 2;\ninstance.f = 4.0;\ninstance.b = true;\nprint(instance.i);\nprint(instance.f);\nprint(instance.b);",
        &["2", "4", "true"],
    );
}

#[test]
fn uninitialized_struct_members_are_zeroed() {
    expect_output(
        "T :: struct { x:i32; y:f32; z:bool; };\nt : T;\nprint(t.x);\nprint(t.y);\nprint(t.z);",
        &["0", "0", "false"],
    );
}

#[test]
fn member_sum() {
    expect_output(
        "T :: struct { x:i32; y:i32; };\np:T;\np.x=3;\np.y=4;\nprint(p.x+p.y);",
        &["7"],
    );
}

#[test]
fn nested_struct_members() {
    expect_output(
        "TestStruct :: struct { i:i32; f:f32; b:bool; };\nTestStruct2 :: struct { s:TestStruct; };\ninstance:TestStruct;\ninstance.i = 2;\ninstance.f = 4.0;\ninstance.b = true;\ninstance2:TestStruct2;\ninstance2.s = instance;\nprint(instance2.s.i);\nprint(instance2.s.f);\nprint(instance2.s.b);",
        &["2", "4", "true"],
    );
}

#[test]
fn positional_struct_literals() {
    expect_output(
        "Point :: struct { x:i32; y:i32; };\np := Point{3, 4};\nprint(p.x);\nprint(p.y);\nprint(p.x + p.y);",
        &["3", "4", "7"],
    );
}

#[test]
fn designated_struct_literals() {
    expect_output(
        "Point :: struct { x:i32; y:i32; };\np := Point{.y = 4, .x = 3};\nprint(p.x);\nprint(p.y);",
        &["3", "4"],
    );
}

#[test]
fn empty_struct_literal_is_zeroed() {
    expect_output(
        "Point :: struct { x:i32; y:i32; };\np := Point{};\nprint(p.x + p.y);",
        &["0"],
    );
}

#[test]
fn struct_literals_as_arguments() {
    expect_output(
        "Point :: struct { x:i32; y:i32; };\nnorm1 :: func (p: Point) -> i32 { return p.x + p.y; };\nprint(norm1(Point{5, 7}));",
        &["12"],
    );
}

#[test]
fn structs_are_passed_by_reference() {
    expect_output(
        "Point :: struct { x:i32; y:i32; };\nbump :: func (p: Point) { p.x = p.x + 1; };\nq := Point{1, 2};\nbump(q);\nprint(q.x);",
        &["2"],
    );
}

#[test]
fn imperative_code_in_struct_scope() {
    expect_errors(
        "add :: func (num: i32, float: f32, boolean: bool) -> i32 { return num; };\nconstFloat :: 6.0;\nfloatVariable := 5.0;\nStructWithImperativeCode :: struct {\n  boolMember: bool;\n  constFloat;\n  initializedMember:i32 : 5;\n  add(5, 5.0, true);\n  floatMember:f32 = floatVariable;\n  {}\n  if true {}\n  return 5;\n};",
        &[
            "Cannot execute imperative code in data scope",
            "Cannot execute non-constant initializers in data scope",
            "Cannot execute imperative code in data scope",
            "Cannot execute imperative code in data scope",
            "Cannot execute imperative code in data scope",
            "Cannot execute imperative code in data scope",
        ],
    );
}

#[test]
fn struct_type_annotations_must_be_constant() {
    expect_errors(
        "NonConstStruct := struct {\n  member: i32;\n};\ninstanceOfNonConstStruct : NonConstStruct;",
        &["Type annotation for declaration must be a constant"],
    );
}

#[test]
fn struct_literal_without_type_information() {
    expect_errors(
        "x := 5;\ny := x{1};",
        &["Struct literal requires a struct type"],
    );
}
