mod common;

use common::{expect_errors, expect_output};

#[test]
fn functions_are_callable_before_their_declaration() {
    expect_output(
        "test();\ntest2(5);\nprint(test3());\nprint(test4(5, 2.0, true));\nprint(test5(10));\ntest :: func() { print(1); };\ntest2 :: func(i:i32) { print(i); };\ntest3 :: func() -> f32 { return 1.0; };\ntest4 :: func(i:i32, f:f32, b:bool) -> i32 { return i; };\ntest5 :: func(i:i32) -> bool { return i > 5; };",
        &["1", "5", "1", "5", "true"],
    );
}

#[test]
fn function_type_literals() {
    expect_output(
        "funcType := func (i32, f32) -> i32;\nprint(funcType);\nfuncTypeNamedParams := func (num: i32, num2: f32) -> i32;\nprint(funcTypeNamedParams);\nfuncWithUnnamedParams :: func (i32, f32) -> i32 { return 0; };\nfuncTypeNoReturn := func (i32, f32);\nprint(funcTypeNoReturn);\nfuncTypeNoParams := func () -> i32;\nprint(funcTypeNoParams);\nfuncTypeNoParamsNoReturn := func ();\nprint(funcTypeNoParamsNoReturn);",
        &[
            "func (i32, f32) -> i32",
            "func (i32, f32) -> i32",
            "func (i32, f32)",
            "func () -> i32",
            "func ()",
        ],
    );
}

#[test]
fn functions_as_variables() {
    expect_output(
        "addSomething := func (num: i32) -> i32 { return num+1; };\nprint(addSomething(2));\naddSomething = func (num: i32) -> i32 { return num+2; };\nprint(addSomething(2));\nconstAddThree :: func (num: i32) -> i32 { return num+3; };\naddSomething = constAddThree;\nprint(addSomething(2));",
        &["3", "4", "5"],
    );
}

#[test]
fn recursive_functions() {
    expect_output(
        "fib :: func (n: i32) -> i32 {\n  if n <= 1 {\n    return n;\n  } else {\n    return fib(n-1) + fib(n-2);\n  }\n};\nprint(fib(7));",
        &["13"],
    );
}

#[test]
fn mutual_recursion() {
    expect_output(
        "even :: func (n: i32) -> bool { if n == 0 { return true; } return odd(n - 1); };\nodd :: func (n: i32) -> bool { if n == 0 { return false; } return even(n - 1); };\nprint(even(10));\nprint(odd(7));",
        &["true", "true"],
    );
}

#[test]
fn non_constant_functions_cannot_recurse() {
    expect_errors(
        "nonConstFib := func (n: i32) -> i32 {\n  if n <= 1 {\n    return n;\n  } else {\n    return nonConstFib(n-1) + nonConstFib(n-2);\n  }\n};\nprint(nonConstFib(7));",
        &[
            "Can't use variable 'nonConstFib', it's not defined yet",
            "Can't use variable 'nonConstFib', it's not defined yet",
        ],
    );
}

#[test]
fn function_signature_mismatches() {
    expect_errors(
        "addSomething := func (num: i32) -> i32 { return num+1; };\nprint(addSomething(2));\naddSomething = func (num: i32, second: f32) -> i32 {\n    return num+second;\n};",
        &[
            "Type mismatch in return, function has type i32, but return expression is type f32",
            "Type mismatch on assignment, 'addSomething' has type 'func (i32) -> i32', but is being assigned a value with type 'func (i32, f32) -> i32'",
        ],
    );
}

#[test]
fn call_arity_and_argument_types() {
    expect_errors(
        "f :: func (a: i32, b: bool) -> i32 { return a; };\nf(1);\nf(1, 2);",
        &[
            "Mismatched number of arguments in call to function 'f', expected 2, got 1",
            "Type mismatch in function argument, expected bool, got i32",
        ],
    );
}

#[test]
fn calling_a_non_function_fails() {
    expect_errors(
        "x := 5;\nx();",
        &["Attempt to call a value which is not a function"],
    );
}

#[test]
fn void_function_calls_are_statements() {
    expect_output(
        "log :: func () { print(7); };\nlog();\nlog();",
        &["7", "7"],
    );
}

#[test]
fn deep_recursion_overflows_the_frame_stack() {
    let trap = common::expect_trap(
        "loop :: func (n: i32) -> i32 { return loop(n + 1); };\nprint(loop(0));",
    );
    assert_eq!(trap, flint_lang::vm::Trap::StackOverflow);
}
