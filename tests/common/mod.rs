#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::thread;

use rox::ast::Stmt;
use rox::error::LoxError;
use rox::interpreter::{Interpreter, MAX_CALL_DEPTH};
use rox::parser::Parser;
use rox::resolver::{Locals, Resolver};
use rox::scanner::Scanner;

/// In-memory sink the interpreter prints into; clones share the buffer.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.borrow_mut());
        String::from_utf8(bytes).expect("interpreter output is UTF-8")
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn parse(source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
    let (tokens, errors) = Scanner::new(source).scan_all();
    assert!(errors.is_empty(), "lex errors: {:?}", errors);
    Parser::new(tokens).parse()
}

/// Scan, parse and resolve.
pub fn compile(source: &str) -> Result<(Vec<Stmt>, Locals), Vec<LoxError>> {
    let statements = parse(source)?;
    let locals = Resolver::new().resolve(&statements)?;
    Ok((statements, locals))
}

/// Messages of every static error `source` produces.
pub fn static_errors(source: &str) -> Vec<String> {
    match compile(source) {
        Ok(_) => panic!("expected static errors for:\n{}", source),
        Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
    }
}

/// One interpreter fed several programs in turn, like a REPL.
pub struct Session {
    interpreter: Interpreter,
    output: SharedBuffer,
}

impl Session {
    pub fn new() -> Self {
        let output = SharedBuffer::default();
        let interpreter = Interpreter::with_output(Box::new(output.clone()));
        Session {
            interpreter,
            output,
        }
    }

    pub fn run(&mut self, source: &str) -> Result<(), LoxError> {
        let (statements, locals) =
            compile(source).unwrap_or_else(|errors| panic!("static errors: {:?}", errors));
        self.interpreter.resolve(locals);
        let result = self.interpreter.interpret(&statements);
        self.interpreter.forget(&statements);
        result
    }

    pub fn resolved_locals(&self) -> usize {
        self.interpreter.resolved_locals()
    }

    /// Output printed since the last call.
    pub fn output(&self) -> String {
        self.output.take()
    }
}

/// Run a program that must succeed; returns what it printed.
pub fn run(source: &str) -> String {
    let mut session = Session::new();
    if let Err(e) = session.run(source) {
        panic!("unexpected runtime error: {}", e);
    }
    session.output()
}

/// Run a program that must fail at runtime; returns the output printed
/// before the failure and the error.
pub fn run_err(source: &str) -> (String, LoxError) {
    let mut session = Session::new();
    match session.run(source) {
        Ok(()) => panic!("expected a runtime error for:\n{}", source),
        Err(e) => (session.output(), e),
    }
}

/// Run `job` on a thread with room for the deepest allowed call chain. The
/// default test thread stack only fits a few hundred nested Lox calls.
pub fn on_large_stack<T, F>(job: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    thread::Builder::new()
        .stack_size(MAX_CALL_DEPTH * 48 * 1024)
        .spawn(job)
        .expect("spawn test thread")
        .join()
        .unwrap_or_else(|e| std::panic::resume_unwind(e))
}
