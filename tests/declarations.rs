mod common;

use common::{expect_errors, expect_output};

#[test]
fn declaration_forms() {
    expect_output(
        "i := 5;\nprint(i);\na : bool;\na = false;\nprint(a);\nb:f32 = 2.5;\nprint(b);\nt:type = i32;\nprint(t);",
        &["5", "false", "2.5", "i32"],
    );
}

#[test]
fn uninitialized_variables_are_zeroed() {
    expect_output(
        "i : i32;\nf : f32;\nb : bool;\nprint(i);\nprint(f);\nprint(b);",
        &["0", "0", "false"],
    );
}

#[test]
fn missing_type_in_declaration() {
    expect_errors(
        "i : 5;",
        &["Expected a type here, potentially missing an equal sign before an initializer?"],
    );
}

#[test]
fn missing_semicolon_between_declarations() {
    expect_errors(
        "j := 22.0\nk:i32 = 10;",
        &["Expected \";\" to end a previous declaration"],
    );
}

#[test]
fn declaration_type_mismatch() {
    expect_errors(
        "k:i32 = true;",
        &["Type mismatch in declaration, declared as i32 and initialized as bool"],
    );
}

#[test]
fn assignment() {
    expect_output(
        "i := 5;\ni = 10;\nprint(i);\ni = i + 5 * 10;\nprint(i);\nb := true;\nb = 5 * 5 < 10 || true;\nprint(b);",
        &["10", "60", "true"],
    );
}

#[test]
fn invalid_assignments() {
    expect_errors(
        "i := 5;\ni = true;\nj = 10;",
        &[
            "Type mismatch on assignment, 'i' has type 'i32', but is being assigned a value with type 'bool'",
            "Undeclared identifier 'j', not found in any available scope",
        ],
    );
}

#[test]
fn out_of_scope_names() {
    expect_errors(
        "i := 5;\n{\n  i := 2;\n  j = 10;\n}\nprint(j);",
        &[
            "Redefinition of variable 'i'",
            "Undeclared identifier 'j', not found in any available scope",
            "Undeclared identifier 'j', not found in any available scope",
        ],
    );
}

#[test]
fn shadowing_in_function_params_is_allowed() {
    expect_output(
        "n := 10;\ntwice :: func (n: i32) -> i32 { return n * 2; };\nprint(twice(4));\nprint(n);",
        &["8", "10"],
    );
}
