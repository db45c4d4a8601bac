mod common;

use common::{expect_errors, expect_output};

#[test]
fn address_of_struct_and_deref_read() {
    expect_output(
        "T :: struct { x: i32; y: i32; };\nt : T;\nt.x = 1;\nt.y = 2;\np := &t;\nprint(p^.x);\nprint(p^.y);",
        &["1", "2"],
    );
}

#[test]
fn writes_through_a_pointer_alias_the_target() {
    expect_output(
        "T :: struct { x: i32; y: i32; };\nt : T;\np := &t;\np^.x = 5;\nprint(t.x);\nt.y = 7;\nprint(p^.y);",
        &["5", "7"],
    );
}

#[test]
fn whole_struct_store_through_pointer() {
    expect_output(
        "T :: struct { x: i32; y: i32; };\nt : T;\nu : T;\nu.x = 9;\nu.y = 8;\np := &t;\np^ = u;\nprint(t.x);\nprint(t.y);",
        &["9", "8"],
    );
}

#[test]
fn pointer_typed_declarations() {
    expect_output(
        "T :: struct { x: i32; };\nt : T;\nt.x = 3;\nq : ^T;\nq = &t;\nprint(q^.x);",
        &["3"],
    );
}

#[test]
fn deref_of_non_pointer_is_an_error() {
    expect_errors(
        "x := 5;\ny := x^;",
        &["Attempting to dereference a value which is not a pointer"],
    );
}

#[test]
fn address_of_constant_is_an_error() {
    expect_errors(
        "c :: 5;\np := &c;",
        &["Cannot take address of constant"],
    );
}
