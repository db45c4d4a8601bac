use anyhow::{Context, Result};
use clap::Parser;
use log::error;

use flint_lang::compiler::Compiler;
use flint_lang::vm::Vm;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Source file to compile and run.
    file: std::path::PathBuf,

    /// Dump the checked syntax tree to the debug log.
    #[arg(long)]
    print_ast: bool,

    /// Dump the compiled bytecode to the debug log.
    #[arg(long)]
    print_bytecode: bool,

    /// Write the syntax tree as JSON to stdout and exit.
    #[arg(long)]
    emit_ast: bool,

    /// Compile only, do not run the program.
    #[arg(long)]
    check: bool,

    /// Enable debug logging (required to see the dump flags).
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let level = if args.verbose {
        log::Level::Debug
    } else {
        log::Level::Warn
    };
    simple_logger::init_with_level(level)?;

    let source = std::fs::read_to_string(&args.file)
        .with_context(|| format!("could not read file '{}'", args.file.display()))?;

    let compiler = Compiler {
        print_ast: args.print_ast,
        print_bytecode: args.print_bytecode,
    };
    let compilation = compiler.compile(&source);

    if !compilation.errors.is_empty() {
        let filename = args.file.display().to_string();
        eprint!("{}", compilation.errors.render(&filename, &source));
        error!(
            "Compilation failed with {} errors",
            compilation.errors.count()
        );
        std::process::exit(1);
    }

    if args.emit_ast {
        println!("{}", serde_json::to_string_pretty(&compilation.syntax_tree)?);
        return Ok(());
    }

    if args.check {
        return Ok(());
    }

    let program = compilation
        .program
        .expect("error-free compilation produces a program");
    let mut stdout = std::io::stdout();
    if let Err(trap) = Vm::new(&program, &compilation.registry).run(&mut stdout) {
        error!("Runtime trap: {trap}");
        std::process::exit(2);
    }

    Ok(())
}
