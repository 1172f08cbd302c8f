use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use tracing::debug;

use pseudoc::interpreter::{self, Env};
use pseudoc::lexer::Lexer;
use pseudoc::parser::{parse, ParseState};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Source file to run
    file: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .init();

    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let lexer = match Lexer::lex(&source) {
        Ok(lexer) => lexer,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };
    debug!(tokens = lexer.tokens.len(), "lexed");

    let mut state = ParseState::new(lexer.into_tokens());
    let program = match parse(&mut state) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };
    debug!(statements = program.stmts.len(), "parsed");

    let mut env = Env::new(io::stdout().lock());
    if let Err(e) = interpreter::run(&program, &mut env) {
        eprintln!("{e}");
        process::exit(1);
    }
    Ok(())
}
