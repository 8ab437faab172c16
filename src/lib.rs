//! Signo - a small Lisp with an interactive evaluator
//!
//! This crate implements the core of Signo: an expression-based, dynamically
//! typed, lexically scoped language with first-class closures and immutable
//! values. Source text flows through a three-stage pipeline:
//!
//! ```text
//! source -> lexer (tokens with positions) -> parser (AST) -> evaluator
//! ```
//!
//! ```lisp
//! ; Signo syntax
//! (let x 10)              ; bind in the current scope
//! (def fact (n)           ; named lambda, may recurse through its own name
//!   (if (!= n 1) (* n (fact (- n 1))) 1))
//! (print (fact 4))        ; 24
//! (sum (push 4 '(1 2 3))) ; 10
//! ```
//!
//! Special forms (`let`, `if`, `do`, `lambda`, `def`, `eval`, `include`) are
//! not recognized by the parser; they are ordinary kernel-environment
//! bindings whose arguments arrive unevaluated. Everything else is a builtin
//! procedure receiving evaluated arguments. Only the atom `#false` and the
//! empty list `()` are falsy.
//!
//! ## Modules
//!
//! - `lexer`: source text to tokens, tracking row/column positions
//! - `parser`: tokens to expressions
//! - `ast`: the unified expression/value type and its rendering
//! - `evaluator`: scope chain, evaluation, special forms
//! - `builtinops`: registry of builtin procedures and special forms

use std::fmt;
use std::path::Path;

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod lexer;
pub mod parser;

pub use crate::ast::{Expr, Number};
pub use crate::evaluator::{Environment, create_kernel_env, eval};
pub use crate::lexer::{Token, TokenKind, lex};
pub use crate::parser::parse;

/// Maximum expression nesting accepted by the parser. Deeper input is a
/// parse error rather than a host stack overflow.
pub const MAX_PARSE_DEPTH: usize = 128;

/// Maximum evaluation depth. The evaluator recurses over the host call stack
/// (tail calls are not optimized), so runaway recursion is cut off here.
pub const MAX_EVAL_DEPTH: usize = 1024;

/// Where a piece of source text came from.
///
/// Positions embed an origin so diagnostics can say which file (or which
/// REPL input) an error belongs to. `Unknown` is the "no file" sentinel used
/// for internally synthesized expressions and [`eval_source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A filesystem path.
    File(String),
    /// The Nth input read by the REPL (1-based).
    Repl(usize),
    /// No file; internal or anonymous source.
    Unknown,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::File(path) => write!(f, "{path}"),
            Origin::Repl(index) => write!(f, "repl({index})"),
            Origin::Unknown => write!(f, "<source>"),
        }
    }
}

/// A source coordinate: origin plus 1-based row and column.
///
/// The lexer advances the column once per character consumed (including
/// discarded whitespace and string delimiters) and resets it on `\n`, so
/// every downstream error points at a real spot in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub origin: Origin,
    pub row: usize,
    pub col: usize,
}

impl Position {
    /// The first coordinate of some source: row 1, column 1.
    pub fn start(origin: Origin) -> Self {
        Position {
            origin,
            row: 1,
            col: 1,
        }
    }

    /// Sentinel position for values with no source location (synthesized
    /// lists, internal errors).
    pub fn unknown() -> Self {
        Self::start(Origin::Unknown)
    }

    pub(crate) fn advance_char(&mut self, c: char) {
        if c == '\n' {
            self.row += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
    }

    pub(crate) fn advance_str(&mut self, text: &str) {
        for c in text.chars() {
            self.advance_char(c);
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.origin, self.row, self.col)
    }
}

/// Error taxonomy for the whole pipeline. Every variant carries the
/// [`Position`] it arose at; the first error aborts the current run.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Unexpected character or malformed token.
    Lex { message: String, pos: Position },
    /// Unexpected token or unclosed list.
    Parse { message: String, pos: Position },
    /// Symbol not found in any reachable scope.
    Reference { name: String, pos: Position },
    /// Wrong operand type, wrong arity, or ill-formed special form.
    Type { message: String, pos: Position },
    /// Call-site failures (not callable, include I/O, overflow, depth).
    Runtime { message: String, pos: Position },
}

impl Error {
    pub fn lex(message: impl Into<String>, pos: Position) -> Self {
        Error::Lex {
            message: message.into(),
            pos,
        }
    }

    pub fn parse(message: impl Into<String>, pos: Position) -> Self {
        Error::Parse {
            message: message.into(),
            pos,
        }
    }

    pub fn reference(name: impl Into<String>, pos: Position) -> Self {
        Error::Reference {
            name: name.into(),
            pos,
        }
    }

    pub fn type_error(message: impl Into<String>, pos: Position) -> Self {
        Error::Type {
            message: message.into(),
            pos,
        }
    }

    pub fn runtime(message: impl Into<String>, pos: Position) -> Self {
        Error::Runtime {
            message: message.into(),
            pos,
        }
    }

    /// The diagnostic kind name used in formatted output.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Lex { .. } => "LexError",
            Error::Parse { .. } => "ParseError",
            Error::Reference { .. } => "ReferenceError",
            Error::Type { .. } => "TypeError",
            Error::Runtime { .. } => "RuntimeError",
        }
    }

    /// The source position the error points at.
    pub fn position(&self) -> &Position {
        match self {
            Error::Lex { pos, .. }
            | Error::Parse { pos, .. }
            | Error::Reference { pos, .. }
            | Error::Type { pos, .. }
            | Error::Runtime { pos, .. } => pos,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Reference { name, pos } => {
                write!(f, "[ReferenceError] unbound symbol '{name}' at {pos}")
            }
            Error::Lex { message, pos }
            | Error::Parse { message, pos }
            | Error::Type { message, pos }
            | Error::Runtime { message, pos } => {
                write!(f, "[{}] {message} at {pos}", self.kind())
            }
        }
    }
}

impl std::error::Error for Error {}

/// Evaluate a parsed program in a fresh kernel environment.
///
/// Top-level expressions are evaluated in order against one threaded
/// environment; the program's value is the last expression's value (Nil for
/// an empty program). Both the value and the final environment are returned
/// so a host can continue evaluating in the same scope.
pub fn evaluate(program: &[Expr]) -> Result<(Expr, Environment), Error> {
    let mut env = create_kernel_env();
    let value = evaluate_with(program, &mut env)?;
    Ok((value, env))
}

/// Evaluate a parsed program against an existing environment (REPL
/// continuation). Returns the last expression's value; bindings made by
/// top-level `let`/`def` stay in `env`.
pub fn evaluate_with(program: &[Expr], env: &mut Environment) -> Result<Expr, Error> {
    let mut value = Expr::Nil;
    for expr in program {
        value = eval(expr, env)?;
    }
    Ok(value)
}

/// Run the full pipeline over a source string with no file origin.
pub fn eval_source(source: &str) -> Result<(Expr, Environment), Error> {
    let tokens = lex(source, Origin::Unknown)?;
    let program = parse(&tokens)?;
    evaluate(&program)
}

/// Run the full pipeline over a file. Relative `include` paths inside the
/// file resolve against the file's directory.
pub fn eval_file(path: impl AsRef<Path>) -> Result<(Expr, Environment), Error> {
    let path = path.as_ref();
    let origin = Origin::File(path.display().to_string());
    let source = std::fs::read_to_string(path).map_err(|err| {
        Error::runtime(
            format!("cannot read '{}': {err}", path.display()),
            Position::start(origin.clone()),
        )
    })?;
    let tokens = lex(&source, origin)?;
    let program = parse(&tokens)?;
    evaluate(&program)
}
