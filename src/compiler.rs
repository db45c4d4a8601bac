use log::debug;

use crate::codegen::{self, Program};
use crate::error::ErrorState;
use crate::lexer::Lexer;
use crate::parser::ast::{self, Statement};
use crate::parser::Parser;
use crate::typechecker;
use crate::typechecker::types::TypeRegistry;

/// Front-to-back compilation driver. Stages run strictly in order and
/// code generation is skipped as soon as any stage reported an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compiler {
    /// Dump the checked syntax tree to the debug log.
    pub print_ast: bool,
    /// Dump the compiled bytecode to the debug log.
    pub print_bytecode: bool,
}

/// Everything a compilation run produces. `program` is only present when
/// the error list is empty.
pub struct Compilation {
    pub program: Option<Program>,
    pub registry: TypeRegistry,
    pub errors: ErrorState,
    pub syntax_tree: Vec<Statement>,
}

impl Compilation {
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty() && self.program.is_some()
    }
}

impl Compiler {
    pub fn new() -> Compiler {
        Compiler::default()
    }

    pub fn compile(&self, source: &str) -> Compilation {
        let mut errors = ErrorState::new();

        let tokens = Lexer::new(source).tokenize(&mut errors);
        let end_line = tokens.last().map(|t| t.line).unwrap_or(1);

        let mut syntax_tree = Parser::new(&tokens, source, &mut errors).parse();

        let mut registry = TypeRegistry::new();
        let mut arena = typechecker::check_program(&mut syntax_tree, &mut registry, &mut errors);

        if self.print_ast {
            debug!("---- AST ----\n{}", ast::debug_tree(&syntax_tree, &registry));
        }

        let program = if errors.is_empty() {
            let program =
                codegen::generate(&syntax_tree, end_line, &mut arena, &registry, &mut errors);
            if self.print_bytecode {
                debug!("---- Disassembly ----\n{}", program.disassemble(&registry));
            }
            errors.is_empty().then_some(program)
        } else {
            None
        };

        Compilation {
            program,
            registry,
            errors,
            syntax_tree,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_compilation() {
        let compilation = Compiler::new().compile("print(1 + 2);");
        assert!(compilation.succeeded());
        assert!(compilation.errors.is_empty());
    }

    #[test]
    fn test_errors_skip_codegen() {
        let compilation = Compiler::new().compile("k:i32 = true;");
        assert!(!compilation.succeeded());
        assert!(compilation.program.is_none());
        assert_eq!(compilation.errors.count(), 1);
    }

    #[test]
    fn test_all_stage_errors_accumulate() {
        // One lex error, one parse error, one type error.
        let compilation = Compiler::new().compile("a := $;\nb := ;\nc := true + 1;");
        assert!(compilation.errors.count() >= 3, "{:?}", compilation.errors.messages());
        assert!(compilation.program.is_none());
    }
}
