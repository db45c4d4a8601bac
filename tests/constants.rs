mod common;

use common::{expect_errors, expect_output};

#[test]
fn constants_resolve_out_of_order() {
    expect_output(
        "print(constant);\nprint(constantWithType);\nvariable := 3*12.3/8+1;\nprint(variable);\nconstant :: 3*12.3/8+1;\nconstantWithType:f32 : 3*12.3/8+1;",
        &["5.6125", "5.6125", "5.6125"],
    );
}

#[test]
fn constant_folding_matches_runtime_evaluation() {
    // The first print folds at compile time; the second computes the
    // same expression from variables at run time.
    expect_output(
        "print(2*2+4/2-1);\na := 2;\nb := 4;\nc := 1;\nprint(a*a+b/a-c);",
        &["5", "5"],
    );
    expect_output(
        "print(-(3 - 5) * 2);\nx := 3;\ny := 5;\nprint(-(x - y) * 2);",
        &["4", "4"],
    );
}

#[test]
fn constants_cannot_be_reassigned() {
    expect_errors(
        "c :: 2;\nc = 3;",
        &["Can't assign to constant 'c'"],
    );
}

#[test]
fn constant_initializers_must_exist() {
    expect_errors(
        "uninit ::;\ntypeNoInit : int32 :;",
        &[
            "Need an expression to initialize this constant declaration",
            "Need an expression to initialize this constant declaration",
            "Undeclared identifier 'int32', not found in any available scope",
        ],
    );
}

#[test]
fn constant_initializers_must_be_constant() {
    expect_errors(
        "nonConst:i32 = 5;\ninvalidInit :: nonConst * 2;",
        &["Constant declaration 'invalidInit' is not initialized with a constant expression"],
    );
}

#[test]
fn circular_constants_are_reported() {
    expect_errors(
        "a :: b;\nb :: a;",
        &["Circular dependency detected on identifier 'a'"],
    );
}

#[test]
fn constant_expressions_of_constants() {
    expect_output(
        "base :: 10;\nsquare :: base * base;\ntotal :: square + base;\nprint(total);",
        &["110"],
    );
}
