mod common;

use common::expect_trap;
use flint_lang::compiler::Compiler;
use flint_lang::vm::Trap;

#[test]
fn errors_carry_positions() {
    let source = "a := 1;\nk:i32 = true;\n";
    let compilation = Compiler::new().compile(source);
    assert_eq!(compilation.errors.count(), 1);

    let error = &compilation.errors.errors[0];
    assert_eq!(error.line, 2);

    let rendered = compilation.errors.render("test.fl", source);
    assert!(rendered.contains("test.fl:2:"));
    assert!(rendered.contains("k:i32 = true;"));
    assert!(rendered.contains("Type mismatch in declaration"));
}

#[test]
fn no_bytecode_on_errors() {
    let compilation = Compiler::new().compile("k:i32 = true;");
    assert!(compilation.program.is_none());
}

#[test]
fn all_stages_accumulate_into_one_report() {
    // Lexer, parser and checker all contribute; the driver reports them
    // together.
    let source = "a := @;\nb := ;\nc := true + 1;\n";
    let compilation = Compiler::new().compile(source);
    let messages = compilation.errors.messages();
    assert!(messages.iter().any(|m| m.contains("Invalid character")));
    assert!(messages
        .iter()
        .any(|m| m.contains("Need an expression to initialize this declaration")));
    assert!(messages
        .iter()
        .any(|m| m.contains("Invalid types (bool, i32) used with op \"+\"")));
}

#[test]
fn lex_errors_do_not_truncate_the_stream() {
    // The bad character is reported, the rest still compiles and the
    // later type error is found too.
    let source = "x := 5 $ ;\ny := true + 1;\n";
    let compilation = Compiler::new().compile(source);
    let messages = compilation.errors.messages();
    assert!(messages.iter().any(|m| m.contains("Invalid character '$'")));
    assert!(messages
        .iter()
        .any(|m| m.contains("Invalid types (bool, i32) used with op \"+\"")));
}

#[test]
fn integer_division_by_zero_traps() {
    assert_eq!(
        expect_trap("print(1 / 0);"),
        Trap::DivisionByZero { line: 1 }
    );
    assert_eq!(
        expect_trap("x := 0;\nprint(5 / x);"),
        Trap::DivisionByZero { line: 2 }
    );
}

#[test]
fn float_division_by_zero_is_ieee() {
    common::expect_output("x := 0.0;\nprint(5.0 / x);", &["inf"]);
}

#[test]
fn integer_arithmetic_wraps() {
    common::expect_output(
        "big := 2147483647;\nprint(big + 1);",
        &["-2147483648"],
    );
}

#[test]
fn unterminated_comment_and_string() {
    let compilation = Compiler::new().compile("s := \"abc;\n");
    assert!(compilation
        .errors
        .messages()
        .iter()
        .any(|m| m.contains("Unterminated string literal")));

    let compilation = Compiler::new().compile("/* still open\nx := 1;");
    assert!(compilation
        .errors
        .messages()
        .iter()
        .any(|m| m.contains("Unterminated block comment")));
}

#[test]
fn oversized_integer_literals_are_errors() {
    let compilation = Compiler::new().compile("x := 99999999999;");
    assert!(compilation
        .errors
        .messages()
        .iter()
        .any(|m| m.contains("Invalid integer literal")));
}
