use clap::Parser as ClapParser;

use lumen::diagnostics;
use lumen::interpreter::Interpreter;
use lumen::lexer::Lexer;
use lumen::parser::Parser;
use lumen::printer;

#[derive(ClapParser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to a .scr source file.
    file: std::path::PathBuf,

    /// Pretty-print the parsed AST to stdout before running it.
    #[arg(long)]
    print_ast: bool,

    /// Raise the log level; repeatable (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn log_level(verbosity: u8) -> log::Level {
    match verbosity {
        0 => log::Level::Warn,
        1 => log::Level::Info,
        2 => log::Level::Debug,
        _ => log::Level::Trace,
    }
}

fn main() {
    let args = Cli::parse();
    simple_logger::init_with_level(log_level(args.verbose)).unwrap();

    let source = match std::fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(_) => {
            eprintln!("Could not read file: '{}'", args.file.to_string_lossy());
            std::process::exit(1);
        }
    };

    if let Err(err) = run(&source, args.print_ast) {
        diagnostics::report(&source, &err);
        std::process::exit(1);
    }
}

fn run(source: &str, print_ast: bool) -> Result<(), lumen::error::Error> {
    let tokens = Lexer::new(source).lex()?;
    let statements = Parser::new(tokens).parse()?;

    if print_ast {
        println!("{}", printer::print_program(&statements));
    }

    let mut interpreter = Interpreter::new();
    interpreter.run(&statements)?;
    Ok(())
}
