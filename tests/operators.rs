mod common;

use common::{expect_errors, expect_output};

#[test]
fn addition() {
    expect_output("print(5+2);\nprint(5.0+2.0);", &["7", "7"]);
}

#[test]
fn subtraction() {
    expect_output("print(5-2);\nprint(5.0-2.0);", &["3", "3"]);
}

#[test]
fn multiplication() {
    expect_output("print(5*2);\nprint(5.0*2.0);", &["10", "10"]);
}

#[test]
fn division() {
    expect_output("print(5/2);\nprint(5.0/2.0);", &["2", "2.5"]);
}

#[test]
fn unary_minus() {
    expect_output(
        "print(-5);\nprint(--5);\nprint(1--5);\nprint(---5);",
        &["-5", "5", "6", "-5"],
    );
}

#[test]
fn invalid_arithmetic_types() {
    expect_errors(
        "print(5 + bool);\nprint(true * 2.0);\nprint(-true);",
        &[
            "Invalid types (i32, type) used with op \"+\"",
            "Invalid types (bool, f32) used with op \"*\"",
            "Invalid type (bool) used with op \"-\"",
        ],
    );
}

#[test]
fn comparisons() {
    expect_output(
        "print(2 < 5);\nprint(5 < 2);\nprint(5 < 5);\nprint(5.0 < 2.0);",
        &["true", "false", "false", "false"],
    );
    expect_output(
        "print(2 > 5);\nprint(5 > 2);\nprint(5.0 > 2.0);",
        &["false", "true", "true"],
    );
    expect_output(
        "print(2 <= 5);\nprint(5 <= 5);\nprint(5 <= 2);\nprint(2.0 <= 2.0);",
        &["true", "true", "false", "true"],
    );
    expect_output(
        "print(5 >= 2);\nprint(5 >= 5);\nprint(2 >= 5);",
        &["true", "true", "false"],
    );
}

#[test]
fn mixed_numeric_comparisons_widen() {
    expect_output(
        "print(1 < 2.0);\nprint(2.0 < 1);\nprint(3 >= 2.5);",
        &["true", "false", "true"],
    );
}

#[test]
fn equality() {
    expect_output(
        "print(2 == 5);\nprint(5 == 5);\nprint(2.0 == 2.0);",
        &["false", "true", "true"],
    );
    expect_output(
        "print(2 != 5);\nprint(5 != 5);\nprint(2.0 != 2.0);",
        &["true", "false", "false"],
    );
    expect_output("print(true == true);\nprint(i32 == i32);\nprint(i32 == f32);", &["true", "true", "false"]);
}

#[test]
fn logical_operators() {
    expect_output(
        "print(true && false);\nprint(true && true);\nprint(false && false);",
        &["false", "true", "false"],
    );
    expect_output(
        "print(true || false);\nprint(true || true);\nprint(false || false);",
        &["true", "true", "false"],
    );
    expect_output("print(!false);\nprint(!true);", &["true", "false"]);
}

#[test]
fn short_circuit_uses_runtime_values() {
    // Conditions built from variables are not folded; the jumps run.
    expect_output(
        "t := true;\nf := false;\nprint(t && f);\nprint(f || t);\nprint(t && t || f);\nprint(t && (f || t));",
        &["false", "true", "true", "true"],
    );
}

#[test]
fn invalid_logical_types() {
    expect_errors(
        "print(true < 5);\nprint(5.0 && 5.0);\nprint(0 || 3);\nprint(true < false);\nprint(!3.2);",
        &[
            "Invalid types (bool, i32) used with op \"<\"",
            "Invalid types (f32, f32) used with op \"&&\"",
            "Invalid types (i32, i32) used with op \"||\"",
            "Invalid types (bool, bool) used with op \"<\"",
            "Invalid type (f32) used with op \"!\"",
        ],
    );
}

#[test]
fn mismatched_logical_operands() {
    expect_errors(
        "print(5 && true);\nprint(true || 5);",
        &[
            "Invalid types (i32, bool) used with op \"&&\"",
            "Invalid types (bool, i32) used with op \"||\"",
        ],
    );
}

#[test]
fn grouping() {
    expect_output(
        "print((10 - 20) / (2 - 4));\nprint(((1 + (5 - (8 / 2))) * 2) + 2);",
        &["5", "6"],
    );
}

#[test]
fn operator_precedence() {
    expect_output(
        "print(2 * 2 + 4 / 2 - 1);\nprint(5 * -5);\nprint(5 + 1 < 7 * 2 == -5 > (2 * 10));",
        &["5", "-25", "false"],
    );
}

#[test]
fn invalid_grouping_recovers() {
    expect_errors(
        "print(5 + (2 * 2);",
        &["Expected \")\" to close print expression"],
    );
    expect_errors(
        "print(5 + 2 * 2));",
        &["Expected \";\" at the end of this statement"],
    );
    // The bad operand parses to a sentinel that survives into the
    // checker, which reports it as `invalid`.
    expect_errors(
        "print(5 + 2+)1 * 2);",
        &[
            "Expected \")\" to close print expression",
            "Invalid types (i32, invalid) used with op \"+\"",
        ],
    );
}
