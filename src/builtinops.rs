//! Registry of built-in operations: the standard library plus the special
//! forms, each bound under its surface name in the kernel environment.
//!
//! ## Functions vs special forms
//!
//! - **Functions** receive their arguments already evaluated, left to right
//!   (e.g. `+`, `not`, `push`). They are deliberately not short-circuiting,
//!   even the logical ones - `(and a b)` evaluates both operands.
//! - **Special forms** receive the raw, unevaluated argument list together
//!   with the current environment (e.g. `if`, `let`, `lambda`). Their
//!   handlers live in the evaluator; this registry only carries their name
//!   and arity.
//!
//! ## Error handling
//!
//! Every operation is called with the position of the application it came
//! from. Wrong arity and wrong operand types raise a `TypeError` there;
//! integer overflow and other call-site failures raise a `RuntimeError`.
//!
//! ## Adding a new operation
//!
//! 1. Implement it with the signature `fn(&[Expr], &Position) -> Result<Expr, Error>`
//! 2. Add a `BuiltinOp` entry to `OPS` with its name and arity
//! 3. Add cases to the data-driven test table below

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::ast::{Expr, Number, bool_atom, list};
use crate::evaluator::{
    Environment, eval_def, eval_do, eval_eval, eval_if, eval_include, eval_lambda, eval_let,
};
use crate::{Error, Position};

/// How many arguments an operation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Range(usize, usize),
    Any,
}

impl Arity {
    /// Check an argument count, raising a TypeError at the call position.
    pub(crate) fn validate(&self, name: &str, got: usize, pos: &Position) -> Result<(), Error> {
        let ok = match self {
            Arity::Exact(n) => got == *n,
            Arity::AtLeast(n) => got >= *n,
            Arity::Range(lo, hi) => got >= *lo && got <= *hi,
            Arity::Any => true,
        };
        if ok {
            return Ok(());
        }
        let expected = match self {
            Arity::Exact(n) => format!("exactly {n}"),
            Arity::AtLeast(n) => format!("at least {n}"),
            Arity::Range(lo, hi) => format!("between {lo} and {hi}"),
            Arity::Any => "any number of".to_owned(),
        };
        Err(Error::type_error(
            format!("{name} expects {expected} argument(s), got {got}"),
            pos.clone(),
        ))
    }
}

/// The implementation of a registered operation.
#[derive(Clone, Copy)]
pub enum OpKind {
    /// Ordinary procedure: evaluated arguments plus the call position.
    Function(fn(&[Expr], &Position) -> Result<Expr, Error>),
    /// Special form: unevaluated arguments, environment, call position, and
    /// the current evaluation depth.
    Form(fn(&[Expr], &mut Environment, &Position, usize) -> Result<Expr, Error>),
}

impl std::fmt::Debug for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Function(_) => write!(f, "Function(<fn>)"),
            OpKind::Form(_) => write!(f, "Form(<fn>)"),
        }
    }
}

/// One entry of the operation registry.
#[derive(Debug)]
pub struct BuiltinOp {
    /// The surface name this operation is bound under.
    pub name: &'static str,
    pub kind: OpKind,
    pub arity: Arity,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        // Names uniquely identify registry entries.
        self.name == other.name
    }
}

//
// Argument extraction helpers. Arity is validated before an implementation
// runs, so indexing by position is in bounds; the type checks here produce
// the TypeError taxonomy the evaluator promises.
//

fn number_arg(op: &str, args: &[Expr], index: usize, pos: &Position) -> Result<Number, Error> {
    match &args[index] {
        Expr::Number(n) => Ok(*n),
        other => Err(Error::type_error(
            format!("{op} expects a number, got {}", other.type_name()),
            pos.clone(),
        )),
    }
}

fn string_arg<'a>(
    op: &str,
    args: &'a [Expr],
    index: usize,
    pos: &Position,
) -> Result<&'a str, Error> {
    match &args[index] {
        Expr::Str(text) => Ok(text),
        other => Err(Error::type_error(
            format!("{op} expects a string, got {}", other.type_name()),
            pos.clone(),
        )),
    }
}

/// A list argument; Nil is the empty list.
fn seq_arg<'a>(
    op: &str,
    args: &'a [Expr],
    index: usize,
    pos: &Position,
) -> Result<&'a [Expr], Error> {
    match &args[index] {
        Expr::List { items, .. } => Ok(items),
        Expr::Nil => Ok(&[]),
        other => Err(Error::type_error(
            format!("{op} expects a list, got {}", other.type_name()),
            pos.clone(),
        )),
    }
}

fn element_number(op: &str, value: &Expr, pos: &Position) -> Result<Number, Error> {
    match value {
        Expr::Number(n) => Ok(*n),
        other => Err(Error::type_error(
            format!("{op} expects a list of numbers, got a {}", other.type_name()),
            pos.clone(),
        )),
    }
}

//
// Checked numeric kernels. Integer results stay integers; anything mixing a
// float becomes a float. Integer overflow surfaces as a RuntimeError.
//

fn num_add(a: Number, b: Number, pos: &Position) -> Result<Number, Error> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_add(y)
            .map(Number::Int)
            .ok_or_else(|| Error::runtime("integer overflow in addition", pos.clone())),
        _ => Ok(Number::Float(a.as_f64() + b.as_f64())),
    }
}

fn num_sub(a: Number, b: Number, pos: &Position) -> Result<Number, Error> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_sub(y)
            .map(Number::Int)
            .ok_or_else(|| Error::runtime("integer overflow in subtraction", pos.clone())),
        _ => Ok(Number::Float(a.as_f64() - b.as_f64())),
    }
}

fn num_mul(a: Number, b: Number, pos: &Position) -> Result<Number, Error> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_mul(y)
            .map(Number::Int)
            .ok_or_else(|| Error::runtime("integer overflow in multiplication", pos.clone())),
        _ => Ok(Number::Float(a.as_f64() * b.as_f64())),
    }
}

/// Integer division stays integral when it divides evenly and falls back to
/// a float quotient otherwise. Integer division by zero is a TypeError.
fn num_div(a: Number, b: Number, pos: &Position) -> Result<Number, Error> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => {
            if y == 0 {
                return Err(Error::type_error("division by zero", pos.clone()));
            }
            match x.checked_rem(y) {
                // checked_rem is None for i64::MIN % -1; that quotient does
                // not fit an integer either, so it takes the float path.
                Some(0) => x
                    .checked_div(y)
                    .map(Number::Int)
                    .ok_or_else(|| Error::runtime("integer overflow in division", pos.clone())),
                _ => Ok(Number::Float(x as f64 / y as f64)),
            }
        }
        _ => Ok(Number::Float(a.as_f64() / b.as_f64())),
    }
}

//
// Builtin implementations
//

fn builtin_print(args: &[Expr], _pos: &Position) -> Result<Expr, Error> {
    println!("{}", args[0]);
    Ok(Expr::Atom("ok".to_owned()))
}

fn builtin_not(args: &[Expr], _pos: &Position) -> Result<Expr, Error> {
    Ok(bool_atom(!args[0].is_truthy()))
}

fn builtin_and(args: &[Expr], _pos: &Position) -> Result<Expr, Error> {
    Ok(bool_atom(args.iter().all(Expr::is_truthy)))
}

fn builtin_or(args: &[Expr], _pos: &Position) -> Result<Expr, Error> {
    Ok(bool_atom(args.iter().any(Expr::is_truthy)))
}

fn builtin_nor(args: &[Expr], _pos: &Position) -> Result<Expr, Error> {
    Ok(bool_atom(!args.iter().any(Expr::is_truthy)))
}

fn builtin_xor(args: &[Expr], _pos: &Position) -> Result<Expr, Error> {
    Ok(bool_atom(args[0].is_truthy() != args[1].is_truthy()))
}

fn builtin_eq(args: &[Expr], _pos: &Position) -> Result<Expr, Error> {
    Ok(bool_atom(args[0] == args[1]))
}

fn builtin_ne(args: &[Expr], _pos: &Position) -> Result<Expr, Error> {
    Ok(bool_atom(args[0] != args[1]))
}

// Numeric comparisons share a shape; generate them.
macro_rules! numeric_comparison {
    ($name:ident, $op:tt, $op_str:expr) => {
        fn $name(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
            let a = number_arg($op_str, args, 0, pos)?;
            let b = number_arg($op_str, args, 1, pos)?;
            Ok(bool_atom(a $op b))
        }
    };
}

numeric_comparison!(builtin_gt, >, ">");
numeric_comparison!(builtin_ge, >=, ">=");
numeric_comparison!(builtin_lt, <, "<");
numeric_comparison!(builtin_le, <=, "<=");

// Binary arithmetic over the checked kernels.
macro_rules! arithmetic_op {
    ($name:ident, $kernel:ident, $op_str:expr) => {
        fn $name(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
            let a = number_arg($op_str, args, 0, pos)?;
            let b = number_arg($op_str, args, 1, pos)?;
            Ok(Expr::Number($kernel(a, b, pos)?))
        }
    };
}

arithmetic_op!(builtin_add, num_add, "+");
arithmetic_op!(builtin_sub, num_sub, "-");
arithmetic_op!(builtin_mul, num_mul, "*");
arithmetic_op!(builtin_div, num_div, "/");

fn builtin_pow(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    let a = number_arg("^", args, 0, pos)?;
    let b = number_arg("^", args, 1, pos)?;
    let result = a.as_f64().powf(b.as_f64());
    if result.is_nan() {
        return Err(Error::type_error("domain error in exponentiation", pos.clone()));
    }
    Ok(Expr::Number(Number::Float(result)))
}

fn builtin_sqrt(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    let x = number_arg("sqrt", args, 0, pos)?.as_f64();
    if x < 0.0 {
        return Err(Error::type_error("sqrt of a negative number", pos.clone()));
    }
    Ok(Expr::Number(Number::Float(x.sqrt())))
}

fn builtin_abs(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    match number_arg("abs", args, 0, pos)? {
        Number::Int(n) => n
            .checked_abs()
            .map(|n| Expr::Number(Number::Int(n)))
            .ok_or_else(|| Error::runtime("integer overflow in abs", pos.clone())),
        Number::Float(x) => Ok(Expr::Number(Number::Float(x.abs()))),
    }
}

fn builtin_pi(_args: &[Expr], _pos: &Position) -> Result<Expr, Error> {
    Ok(Expr::Number(Number::Float(std::f64::consts::PI)))
}

fn builtin_tau(_args: &[Expr], _pos: &Position) -> Result<Expr, Error> {
    Ok(Expr::Number(Number::Float(std::f64::consts::TAU)))
}

// Unary float functions with no extra domain restrictions.
macro_rules! float_fn {
    ($name:ident, $op_str:expr, $method:ident) => {
        fn $name(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
            let x = number_arg($op_str, args, 0, pos)?.as_f64();
            Ok(Expr::Number(Number::Float(x.$method())))
        }
    };
}

float_fn!(builtin_sin, "sin", sin);
float_fn!(builtin_cos, "cos", cos);
float_fn!(builtin_tan, "tan", tan);
float_fn!(builtin_atan, "atan", atan);

macro_rules! inverse_trig_fn {
    ($name:ident, $op_str:expr, $method:ident) => {
        fn $name(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
            let x = number_arg($op_str, args, 0, pos)?.as_f64();
            if !(-1.0..=1.0).contains(&x) {
                return Err(Error::type_error(
                    concat!($op_str, " argument out of domain [-1, 1]"),
                    pos.clone(),
                ));
            }
            Ok(Expr::Number(Number::Float(x.$method())))
        }
    };
}

inverse_trig_fn!(builtin_asin, "asin", asin);
inverse_trig_fn!(builtin_acos, "acos", acos);

macro_rules! log_fn {
    ($name:ident, $op_str:expr, $method:ident) => {
        fn $name(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
            let x = number_arg($op_str, args, 0, pos)?.as_f64();
            if x <= 0.0 {
                return Err(Error::type_error(
                    concat!($op_str, " expects a positive number"),
                    pos.clone(),
                ));
            }
            Ok(Expr::Number(Number::Float(x.$method())))
        }
    };
}

log_fn!(builtin_ln, "ln", ln);
log_fn!(builtin_log, "log", log10);

fn builtin_logn(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    let base = number_arg("logn", args, 0, pos)?.as_f64();
    let x = number_arg("logn", args, 1, pos)?.as_f64();
    if base <= 0.0 || base == 1.0 {
        return Err(Error::type_error("logn base must be positive and not 1", pos.clone()));
    }
    if x <= 0.0 {
        return Err(Error::type_error("logn expects a positive number", pos.clone()));
    }
    Ok(Expr::Number(Number::Float(x.log(base))))
}

/// `length` counts characters of a string or elements of a list.
fn builtin_length(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    let count = match &args[0] {
        Expr::Str(text) => text.chars().count(),
        Expr::List { items, .. } => items.len(),
        Expr::Nil => 0,
        other => {
            return Err(Error::type_error(
                format!("length expects a string or a list, got {}", other.type_name()),
                pos.clone(),
            ));
        }
    };
    Ok(Expr::Number(Number::Int(count as i64)))
}

fn builtin_upcase(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    Ok(Expr::Str(string_arg("upcase", args, 0, pos)?.to_uppercase()))
}

fn builtin_downcase(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    Ok(Expr::Str(string_arg("downcase", args, 0, pos)?.to_lowercase()))
}

fn builtin_capitalize(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    let text = string_arg("capitalize", args, 0, pos)?;
    let mut chars = text.chars();
    let capitalized = match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    };
    Ok(Expr::Str(capitalized))
}

fn builtin_trim(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    Ok(Expr::Str(string_arg("trim", args, 0, pos)?.trim().to_owned()))
}

/// `concat` joins strings or lists, dispatched on the first argument.
fn builtin_concat(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    match &args[0] {
        Expr::Str(_) => {
            let mut out = String::new();
            for index in 0..args.len() {
                out.push_str(string_arg("concat", args, index, pos)?);
            }
            Ok(Expr::Str(out))
        }
        Expr::List { .. } | Expr::Nil => {
            let mut items = Vec::new();
            for index in 0..args.len() {
                items.extend_from_slice(seq_arg("concat", args, index, pos)?);
            }
            Ok(list(items))
        }
        other => Err(Error::type_error(
            format!("concat expects strings or lists, got {}", other.type_name()),
            pos.clone(),
        )),
    }
}

fn builtin_first(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    match &args[0] {
        Expr::Str(text) => Ok(text
            .chars()
            .next()
            .map_or(Expr::Nil, |c| Expr::Str(c.to_string()))),
        Expr::List { items, .. } => Ok(items.first().cloned().unwrap_or(Expr::Nil)),
        Expr::Nil => Ok(Expr::Nil),
        other => Err(Error::type_error(
            format!("first expects a string or a list, got {}", other.type_name()),
            pos.clone(),
        )),
    }
}

fn builtin_last(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    match &args[0] {
        Expr::Str(text) => Ok(text
            .chars()
            .next_back()
            .map_or(Expr::Nil, |c| Expr::Str(c.to_string()))),
        Expr::List { items, .. } => Ok(items.last().cloned().unwrap_or(Expr::Nil)),
        Expr::Nil => Ok(Expr::Nil),
        other => Err(Error::type_error(
            format!("last expects a string or a list, got {}", other.type_name()),
            pos.clone(),
        )),
    }
}

/// `(nth i s)` - zero-based element access; out of range yields Nil.
fn builtin_nth(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    let Number::Int(index) = number_arg("nth", args, 0, pos)? else {
        return Err(Error::type_error("nth expects an integer index", pos.clone()));
    };
    if index < 0 {
        return Ok(Expr::Nil);
    }
    let index = index as usize;
    match &args[1] {
        Expr::Str(text) => Ok(text
            .chars()
            .nth(index)
            .map_or(Expr::Nil, |c| Expr::Str(c.to_string()))),
        Expr::List { items, .. } => Ok(items.get(index).cloned().unwrap_or(Expr::Nil)),
        Expr::Nil => Ok(Expr::Nil),
        other => Err(Error::type_error(
            format!("nth expects a string or a list, got {}", other.type_name()),
            pos.clone(),
        )),
    }
}

/// `tie` collects its evaluated arguments into a list - the strict-order
/// sibling of the quote prefix.
fn builtin_tie(args: &[Expr], _pos: &Position) -> Result<Expr, Error> {
    Ok(list(args.to_vec()))
}

/// `(push x xs)` - xs with x appended at the end.
fn builtin_push(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    let tail = seq_arg("push", args, 1, pos)?;
    let mut items = Vec::with_capacity(tail.len() + 1);
    items.extend_from_slice(tail);
    items.push(args[0].clone());
    Ok(list(items))
}

/// `(pop xs)` - a two-element list `(head rest)`, or `(() ())` when empty.
fn builtin_pop(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    let items = seq_arg("pop", args, 0, pos)?;
    match items.split_first() {
        Some((head, rest)) => Ok(list(vec![head.clone(), list(rest.to_vec())])),
        None => Ok(list(vec![Expr::Nil, Expr::Nil])),
    }
}

fn builtin_sum(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    let mut total = Number::Int(0);
    for item in seq_arg("sum", args, 0, pos)? {
        total = num_add(total, element_number("sum", item, pos)?, pos)?;
    }
    Ok(Expr::Number(total))
}

fn builtin_product(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    let mut total = Number::Int(1);
    for item in seq_arg("product", args, 0, pos)? {
        total = num_mul(total, element_number("product", item, pos)?, pos)?;
    }
    Ok(Expr::Number(total))
}

/// `(join xs sep)` - display forms of the elements joined by a separator.
fn builtin_join(args: &[Expr], pos: &Position) -> Result<Expr, Error> {
    let items = seq_arg("join", args, 0, pos)?;
    let sep = string_arg("join", args, 1, pos)?;
    let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
    Ok(Expr::Str(rendered.join(sep)))
}

/// The operation registry. `create_kernel_env` binds every entry; lookup by
/// name goes through a lazily built map.
static OPS: &[BuiltinOp] = &[
    // Special forms
    BuiltinOp {
        name: "let",
        kind: OpKind::Form(eval_let),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: "if",
        kind: OpKind::Form(eval_if),
        arity: Arity::Range(2, 3),
    },
    BuiltinOp {
        name: "do",
        kind: OpKind::Form(eval_do),
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        name: "lambda",
        kind: OpKind::Form(eval_lambda),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: "def",
        kind: OpKind::Form(eval_def),
        arity: Arity::Exact(3),
    },
    BuiltinOp {
        name: "eval",
        kind: OpKind::Form(eval_eval),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "include",
        kind: OpKind::Form(eval_include),
        arity: Arity::Exact(1),
    },
    // I/O
    BuiltinOp {
        name: "print",
        kind: OpKind::Function(builtin_print),
        arity: Arity::Exact(1),
    },
    // Logic
    BuiltinOp {
        name: "not",
        kind: OpKind::Function(builtin_not),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "and",
        kind: OpKind::Function(builtin_and),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        name: "or",
        kind: OpKind::Function(builtin_or),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        name: "nor",
        kind: OpKind::Function(builtin_nor),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        name: "xor",
        kind: OpKind::Function(builtin_xor),
        arity: Arity::Exact(2),
    },
    // Comparison
    BuiltinOp {
        name: "==",
        kind: OpKind::Function(builtin_eq),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: "!=",
        kind: OpKind::Function(builtin_ne),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: ">",
        kind: OpKind::Function(builtin_gt),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: ">=",
        kind: OpKind::Function(builtin_ge),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: "<",
        kind: OpKind::Function(builtin_lt),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: "<=",
        kind: OpKind::Function(builtin_le),
        arity: Arity::Exact(2),
    },
    // Arithmetic
    BuiltinOp {
        name: "+",
        kind: OpKind::Function(builtin_add),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: "-",
        kind: OpKind::Function(builtin_sub),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: "*",
        kind: OpKind::Function(builtin_mul),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: "/",
        kind: OpKind::Function(builtin_div),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: "^",
        kind: OpKind::Function(builtin_pow),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: "sqrt",
        kind: OpKind::Function(builtin_sqrt),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "abs",
        kind: OpKind::Function(builtin_abs),
        arity: Arity::Exact(1),
    },
    // Math constants and functions
    BuiltinOp {
        name: "pi",
        kind: OpKind::Function(builtin_pi),
        arity: Arity::Exact(0),
    },
    BuiltinOp {
        name: "tau",
        kind: OpKind::Function(builtin_tau),
        arity: Arity::Exact(0),
    },
    BuiltinOp {
        name: "sin",
        kind: OpKind::Function(builtin_sin),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "cos",
        kind: OpKind::Function(builtin_cos),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "tan",
        kind: OpKind::Function(builtin_tan),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "asin",
        kind: OpKind::Function(builtin_asin),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "acos",
        kind: OpKind::Function(builtin_acos),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "atan",
        kind: OpKind::Function(builtin_atan),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "ln",
        kind: OpKind::Function(builtin_ln),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "log",
        kind: OpKind::Function(builtin_log),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "logn",
        kind: OpKind::Function(builtin_logn),
        arity: Arity::Exact(2),
    },
    // Strings and sequences
    BuiltinOp {
        name: "length",
        kind: OpKind::Function(builtin_length),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "upcase",
        kind: OpKind::Function(builtin_upcase),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "downcase",
        kind: OpKind::Function(builtin_downcase),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "capitalize",
        kind: OpKind::Function(builtin_capitalize),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "trim",
        kind: OpKind::Function(builtin_trim),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "concat",
        kind: OpKind::Function(builtin_concat),
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        name: "first",
        kind: OpKind::Function(builtin_first),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "last",
        kind: OpKind::Function(builtin_last),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "nth",
        kind: OpKind::Function(builtin_nth),
        arity: Arity::Exact(2),
    },
    // Lists
    BuiltinOp {
        name: "tie",
        kind: OpKind::Function(builtin_tie),
        arity: Arity::Any,
    },
    BuiltinOp {
        name: "push",
        kind: OpKind::Function(builtin_push),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        name: "pop",
        kind: OpKind::Function(builtin_pop),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "sum",
        kind: OpKind::Function(builtin_sum),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "product",
        kind: OpKind::Function(builtin_product),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        name: "join",
        kind: OpKind::Function(builtin_join),
        arity: Arity::Exact(2),
    },
];

static OPS_BY_NAME: LazyLock<HashMap<&'static str, &'static BuiltinOp>> =
    LazyLock::new(|| OPS.iter().map(|op| (op.name, op)).collect());

/// All registered operations, in registry order.
pub(crate) fn all_ops() -> &'static [BuiltinOp] {
    OPS
}

/// Find an operation by its surface name.
pub fn find_op(name: &str) -> Option<&'static BuiltinOp> {
    OPS_BY_NAME.get(name).copied()
}
