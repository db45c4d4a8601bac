#![allow(dead_code)]

use flint_lang::compiler::Compiler;
use flint_lang::vm::{Trap, Vm};

/// Compile a program and run it in-process, capturing the `print`
/// output. Returns the printed lines, or the compile errors.
pub fn compile_and_run(source: &str) -> Result<Vec<String>, Vec<String>> {
    let compilation = Compiler::new().compile(source);
    if !compilation.errors.is_empty() {
        return Err(compilation.errors.messages());
    }
    let program = compilation.program.expect("error-free compilation");
    let mut out = Vec::new();
    let mut vm = Vm::new(&program, &compilation.registry);
    vm.run(&mut out)
        .unwrap_or_else(|trap| panic!("program trapped with {trap}: {source}"));
    assert_eq!(vm.stack_depth(), 1, "main must leave only its return value");
    assert_eq!(vm.frame_depth(), 0);
    let text = String::from_utf8(out).expect("print output is utf-8");
    Ok(text.lines().map(str::to_string).collect())
}

pub fn expect_output(source: &str, expected: &[&str]) {
    match compile_and_run(source) {
        Ok(lines) => assert_eq!(lines, expected, "program: {source}"),
        Err(errors) => panic!("unexpected compile errors {errors:?} for program: {source}"),
    }
}

/// Assert that compilation fails with exactly the given diagnostics, in
/// order; each expected entry must be contained in the matching message.
pub fn expect_errors(source: &str, expected: &[&str]) {
    let compilation = Compiler::new().compile(source);
    assert!(
        compilation.program.is_none(),
        "expected compilation to fail: {source}"
    );
    let messages = compilation.errors.messages();
    assert_eq!(
        messages.len(),
        expected.len(),
        "unexpected diagnostics {messages:?} for program: {source}"
    );
    for (message, fragment) in messages.iter().zip(expected) {
        assert!(
            message.contains(fragment),
            "expected '{fragment}' in '{message}'"
        );
    }
}

/// Compile successfully, then run and return the trap.
pub fn expect_trap(source: &str) -> Trap {
    let compilation = Compiler::new().compile(source);
    assert!(
        compilation.errors.is_empty(),
        "unexpected compile errors {:?}",
        compilation.errors.messages()
    );
    let program = compilation.program.expect("program");
    let mut out = Vec::new();
    Vm::new(&program, &compilation.registry)
        .run(&mut out)
        .expect_err("expected the program to trap")
}
