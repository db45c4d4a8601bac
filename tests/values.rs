mod common;

use common::expect_output;

#[test]
fn basic_literal_values() {
    expect_output(
        "print(7);\nprint(true);\nprint(false);\nprint(5.231);",
        &["7", "true", "false", "5.231"],
    );
}

#[test]
fn type_literals() {
    expect_output(
        "print(type);\nprint(i32);\nprint(f32);\nprint(bool);\nprint(func () -> void);\nprint(func (i32) -> void);\nprint(func () -> f32);\nprint(func (i32, f32, bool) -> i32);",
        &[
            "type",
            "i32",
            "f32",
            "bool",
            "func () -> void",
            "func (i32) -> void",
            "func () -> f32",
            "func (i32, f32, bool) -> i32",
        ],
    );
}

#[test]
fn pointer_and_array_type_literals() {
    expect_output(
        "print(^i32);\nprint([4]f32);\nprint(^[2]bool);",
        &["^i32", "[4]f32", "^[2]bool"],
    );
}
