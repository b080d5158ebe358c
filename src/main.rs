use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rox::ast::Stmt;
use rox::ast_printer::AstPrinter;
use rox::error::LoxError;
use rox::interpreter::{Interpreter, MAX_CALL_DEPTH};
use rox::parser::Parser;
use rox::resolver::{Locals, Resolver};
use rox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about = "Tree-walking Lox interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable debug logging to a file
    #[arg(long, global = true)]
    log: bool,

    /// Log file used with --log
    #[arg(long, global = true, default_value = "app.log")]
    log_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a file, printing each token
    Tokenize { filename: PathBuf },

    /// Parses a file as a single expression and prints its AST
    Parse {
        filename: PathBuf,

        /// Print the AST as JSON instead of prefix form
        #[arg(long)]
        json: bool,
    },

    /// Evaluates a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs a file as a Lox program
    Run { filename: PathBuf },

    /// Starts an interactive session reading from stdin
    Repl,
}

/// Native stack reserved per nested Lox call. Generous enough for debug
/// builds, where one call costs tens of kilobytes of host stack.
const STACK_PER_CALL: usize = 48 * 1024;

/// Run `job` on a thread whose stack can hold [`MAX_CALL_DEPTH`] nested
/// calls, so deep recursion ends in a Lox "Stack overflow." error rather
/// than a host stack overflow.
fn on_interpreter_thread<F>(job: F) -> Result<()>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    let stack_size = MAX_CALL_DEPTH * STACK_PER_CALL;
    debug!("Spawning interpreter thread with {} byte stack", stack_size);

    thread::Builder::new()
        .name("interpreter".to_string())
        .stack_size(stack_size)
        .spawn(job)
        .context("Failed to spawn interpreter thread")?
        .join()
        .map_err(|_| anyhow!("Interpreter thread panicked"))?
}

/// Map the file read-only and copy it out as validated UTF-8.
fn read_source(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();

    // Mapping a zero-length file fails on some platforms.
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the map is read-only and dropped before returning; the source
    // is copied out before anything else could observe it.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map file {:?}", filename))?;

    let text = std::str::from_utf8(&mmap)
        .map_err(LoxError::from)
        .with_context(|| format!("File {:?} is not valid UTF-8", filename))?;

    info!("Read {} bytes from {:?}", len, filename);

    Ok(text.to_owned())
}

fn init_logger(log_file: &Path) -> Result<()> {
    let file = File::create(log_file).with_context(|| format!("Failed to create {:?}", log_file))?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to {:?}", log_file);
    Ok(())
}

fn report(errors: &[LoxError]) {
    for e in errors {
        debug!("Static error: {}", e);
        eprintln!("{}", e);
    }
}

/// Scan, parse and resolve `source`, collecting every static error.
fn compile(source: &str) -> std::result::Result<(Vec<Stmt>, Locals), Vec<LoxError>> {
    let (tokens, mut errors) = Scanner::new(source).scan_all();

    let statements = match Parser::new(tokens).parse() {
        Ok(statements) => statements,
        Err(parse_errors) => {
            errors.extend(parse_errors);
            return Err(errors);
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    let locals = Resolver::new().resolve(&statements)?;

    Ok((statements, locals))
}

fn tokenize(source: &str) {
    let mut tokenized = true;

    for result in Scanner::new(source) {
        match result {
            Ok(token) => println!("{}", token),
            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        process::exit(65);
    }
}

fn parse(source: &str, json: bool) -> Result<()> {
    let (tokens, errors) = Scanner::new(source).scan_all();
    if !errors.is_empty() {
        report(&errors);
        process::exit(65);
    }

    match Parser::new(tokens).parse_expression() {
        Ok(expr) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&expr)?);
            } else {
                println!("{}", AstPrinter::print(&expr));
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(65);
        }
    }
}

fn evaluate(source: &str) -> Result<()> {
    let (tokens, errors) = Scanner::new(source).scan_all();
    if !errors.is_empty() {
        report(&errors);
        process::exit(65);
    }

    let expr = match Parser::new(tokens).parse_expression() {
        Ok(expr) => expr,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(65);
        }
    };

    let program = [Stmt::Expression(expr.clone())];
    let locals = match Resolver::new().resolve(&program) {
        Ok(locals) => locals,
        Err(errors) => {
            report(&errors);
            process::exit(65);
        }
    };

    let mut interpreter = Interpreter::new();
    interpreter.resolve(locals);

    match interpreter.evaluate(&expr) {
        Ok(value) => {
            println!("{}", value);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(e.exit_code());
        }
    }
}

fn run(source: &str) {
    let (statements, locals) = match compile(source) {
        Ok(compiled) => compiled,
        Err(errors) => {
            report(&errors);
            process::exit(65);
        }
    };

    let mut interpreter = Interpreter::new();
    interpreter.resolve(locals);

    if let Err(e) = interpreter.interpret(&statements) {
        debug!("Runtime debug: {}", e);
        eprintln!("{}", e);
        process::exit(e.exit_code());
    }

    info!("Program executed successfully");
}

/// Line-at-a-time session over one interpreter. Errors are reported and the
/// session continues; a bare expression line echoes its value.
fn repl() -> Result<()> {
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        print!("> ");
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let mut source = line.trim_end().to_string();
        if source.is_empty() {
            continue;
        }
        if !source.ends_with(';') && !source.ends_with('}') {
            source.push(';');
        }

        let (statements, locals) = match compile(&source) {
            Ok(compiled) => compiled,
            Err(errors) => {
                report(&errors);
                continue;
            }
        };

        interpreter.resolve(locals);

        let outcome = match statements.as_slice() {
            [Stmt::Expression(expr)] => interpreter.evaluate(expr).map(|value| println!("{}", value)),
            _ => interpreter.interpret(&statements),
        };
        interpreter.forget(&statements);

        if let Err(e) = outcome {
            eprintln!("{}", e);
        }
    }

    info!("REPL session ended");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger(&args.log_file)?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename } => tokenize(&read_source(&filename)?),
        Commands::Parse { filename, json } => parse(&read_source(&filename)?, json)?,
        Commands::Evaluate { filename } => {
            let source = read_source(&filename)?;
            on_interpreter_thread(move || evaluate(&source))?
        }
        Commands::Run { filename } => {
            let source = read_source(&filename)?;
            on_interpreter_thread(move || {
                run(&source);
                Ok(())
            })?
        }
        Commands::Repl => on_interpreter_thread(repl)?,
    }

    Ok(())
}
