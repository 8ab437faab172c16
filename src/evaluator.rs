use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::ast::{Expr, Lambda};
use crate::builtinops::{OpKind, all_ops};
use crate::{Error, MAX_EVAL_DEPTH, Origin, Position};

/// A lexical scope: local bindings plus an optional parent scope.
///
/// `let` writes to the current scope only; lookup walks the parent chain.
/// Lambdas capture a clone of the environment visible at their construction
/// site, so rebinding a name later never changes what a closure sees.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: HashMap<String, Expr>,
    parent: Option<Box<Environment>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            bindings: HashMap::new(),
            parent: None,
        }
    }

    /// A child scope whose lookups fall through to `parent`.
    pub fn with_parent(parent: Environment) -> Self {
        Environment {
            bindings: HashMap::new(),
            parent: Some(Box::new(parent)),
        }
    }

    /// Install or overwrite a binding in the current scope. Parent scopes
    /// are never touched.
    pub fn define(&mut self, name: String, value: Expr) {
        self.bindings.insert(name, value);
    }

    /// Look a name up in this scope, then the parent chain.
    pub fn get(&self, name: &str) -> Option<&Expr> {
        self.bindings
            .get(name)
            .or_else(|| self.parent.as_ref().and_then(|parent| parent.get(name)))
    }

    /// All reachable bindings, innermost scope winning, sorted by name.
    pub fn all_bindings(&self) -> Vec<(String, Expr)> {
        let mut merged = HashMap::new();
        if let Some(parent) = &self.parent {
            for (name, value) in parent.all_bindings() {
                merged.insert(name, value);
            }
        }
        for (name, value) in &self.bindings {
            merged.insert(name.clone(), value.clone());
        }
        let mut result: Vec<_> = merged.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

/// The root environment: every builtin procedure and special form from the
/// registry, bound under its surface name.
pub fn create_kernel_env() -> Environment {
    let mut env = Environment::new();
    for op in all_ops() {
        let value = match op.kind {
            OpKind::Function(_) => Expr::Builtin(op),
            OpKind::Form(_) => Expr::Form(op),
        };
        env.define(op.name.to_owned(), value);
    }
    env
}

/// Evaluate a single expression against an environment.
pub fn eval(expr: &Expr, env: &mut Environment) -> Result<Expr, Error> {
    eval_depth(expr, env, 0)
}

pub(crate) fn eval_depth(expr: &Expr, env: &mut Environment, depth: usize) -> Result<Expr, Error> {
    if depth >= MAX_EVAL_DEPTH {
        return Err(Error::runtime(
            format!("evaluation depth limit exceeded (max {MAX_EVAL_DEPTH})"),
            expr.position().cloned().unwrap_or_else(Position::unknown),
        ));
    }

    match expr {
        // Self-evaluating forms
        Expr::Nil
        | Expr::Number(_)
        | Expr::Atom(_)
        | Expr::Str(_)
        | Expr::Lambda(_)
        | Expr::Builtin(_)
        | Expr::Form(_) => Ok(expr.clone()),

        Expr::Symbol { name, pos } => env
            .get(name)
            .cloned()
            .ok_or_else(|| Error::reference(name.clone(), pos.clone())),

        // Quote defers: the inner expression is returned untouched.
        Expr::Quoted(inner) => Ok((**inner).clone()),

        Expr::List { items, pos } => eval_call(items, pos, env, depth),
    }
}

fn eval_args(args: &[Expr], env: &mut Environment, depth: usize) -> Result<Vec<Expr>, Error> {
    args.iter()
        .map(|arg| eval_depth(arg, env, depth + 1))
        .collect()
}

/// Procedure application. The head is evaluated first; builtins get their
/// arguments evaluated left-to-right, special forms get the raw tail.
fn eval_call(
    items: &[Expr],
    pos: &Position,
    env: &mut Environment,
    depth: usize,
) -> Result<Expr, Error> {
    let Some((head, tail)) = items.split_first() else {
        // The parser never produces an empty List (it parses to Nil).
        return Ok(Expr::Nil);
    };

    let callee = eval_depth(head, env, depth + 1)?;
    match &callee {
        Expr::Lambda(lambda) => {
            let args = eval_args(tail, env, depth)?;
            apply_lambda(lambda, args, pos, depth)
        }
        Expr::Builtin(op) | Expr::Form(op) => match op.kind {
            OpKind::Function(func) => {
                op.arity.validate(op.name, tail.len(), pos)?;
                let args = eval_args(tail, env, depth)?;
                func(&args, pos)
            }
            OpKind::Form(handler) => {
                op.arity.validate(op.name, tail.len(), pos)?;
                handler(tail, env, pos, depth)
            }
        },
        other => Err(Error::runtime(
            format!("cannot call a {}", other.type_name()),
            pos.clone(),
        )),
    }
}

/// Bind parameters (and the self-name, if any) in a child of the captured
/// environment, then evaluate the body there.
fn apply_lambda(
    lambda: &Rc<Lambda>,
    args: Vec<Expr>,
    pos: &Position,
    depth: usize,
) -> Result<Expr, Error> {
    if args.len() != lambda.params.len() {
        let name = lambda.self_name.as_deref().unwrap_or("lambda");
        return Err(Error::type_error(
            format!(
                "{name} expects {} argument(s), got {}",
                lambda.params.len(),
                args.len()
            ),
            pos.clone(),
        ));
    }

    let mut scope = Environment::with_parent(lambda.env.clone());
    if let Some(name) = &lambda.self_name {
        scope.define(name.clone(), Expr::Lambda(Rc::clone(lambda)));
    }
    for (param, arg) in lambda.params.iter().zip(args) {
        scope.define(param.clone(), arg);
    }
    eval_depth(&lambda.body, &mut scope, depth + 1)
}

//
// Special forms. Arity is validated by the registry before a handler runs;
// each handler still checks the shape of its arguments and reports a
// TypeError at the call position on violation.
//

/// `(let name expr)` - bind in the current scope, return the value.
pub(crate) fn eval_let(
    args: &[Expr],
    env: &mut Environment,
    pos: &Position,
    depth: usize,
) -> Result<Expr, Error> {
    let [name_expr, value_expr] = args else {
        return Err(Error::type_error("let expects a symbol and a value", pos.clone()));
    };
    let Expr::Symbol { name, .. } = name_expr else {
        return Err(Error::type_error(
            format!("let expects a symbol to bind, got {}", name_expr.type_name()),
            pos.clone(),
        ));
    };
    let value = eval_depth(value_expr, env, depth + 1)?;
    env.define(name.clone(), value.clone());
    Ok(value)
}

/// `(if cond then else?)` - only the chosen branch is evaluated; a missing
/// else branch yields Nil.
pub(crate) fn eval_if(
    args: &[Expr],
    env: &mut Environment,
    pos: &Position,
    depth: usize,
) -> Result<Expr, Error> {
    let (cond, then, otherwise) = match args {
        [cond, then] => (cond, then, None),
        [cond, then, otherwise] => (cond, then, Some(otherwise)),
        _ => {
            return Err(Error::type_error(
                "if expects a condition, a then branch, and an optional else branch",
                pos.clone(),
            ));
        }
    };

    if eval_depth(cond, env, depth + 1)?.is_truthy() {
        eval_depth(then, env, depth + 1)
    } else {
        match otherwise {
            Some(expr) => eval_depth(expr, env, depth + 1),
            None => Ok(Expr::Nil),
        }
    }
}

/// `(do e1 .. en)` - evaluate in a child scope, discarded on exit; bindings
/// made inside do not leak into the enclosing scope.
pub(crate) fn eval_do(
    args: &[Expr],
    env: &mut Environment,
    _pos: &Position,
    depth: usize,
) -> Result<Expr, Error> {
    let mut scope = Environment::with_parent(env.clone());
    let mut value = Expr::Nil;
    for expr in args {
        value = eval_depth(expr, &mut scope, depth + 1)?;
    }
    Ok(value)
}

/// Parameter list of `lambda`/`def`: a single symbol desugars to a
/// one-element list; otherwise a (possibly empty) list of symbols.
fn lambda_params(expr: &Expr, pos: &Position) -> Result<Vec<String>, Error> {
    let names = match expr {
        Expr::Symbol { name, .. } => vec![name.clone()],
        Expr::Nil => Vec::new(),
        Expr::List { items, .. } => {
            let mut names = Vec::with_capacity(items.len());
            for item in items {
                let Expr::Symbol { name, .. } = item else {
                    return Err(Error::type_error(
                        format!("lambda parameters must be symbols, got {}", item.type_name()),
                        pos.clone(),
                    ));
                };
                names.push(name.clone());
            }
            names
        }
        other => {
            return Err(Error::type_error(
                format!(
                    "lambda parameters must be a symbol or a list of symbols, got {}",
                    other.type_name()
                ),
                pos.clone(),
            ));
        }
    };

    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(Error::type_error(
                format!("duplicate parameter name '{name}'"),
                pos.clone(),
            ));
        }
    }
    Ok(names)
}

/// `(lambda params body)` - build a closure over the current environment.
pub(crate) fn eval_lambda(
    args: &[Expr],
    env: &mut Environment,
    pos: &Position,
    _depth: usize,
) -> Result<Expr, Error> {
    let [params_expr, body] = args else {
        return Err(Error::type_error("lambda expects parameters and a body", pos.clone()));
    };
    let params = lambda_params(params_expr, pos)?;
    Ok(Expr::Lambda(Rc::new(Lambda {
        self_name: None,
        params,
        body: body.clone(),
        env: env.clone(),
    })))
}

/// `(def name params body)` - like `let name (lambda params body)`, but the
/// lambda records `name` as its self-name so the body can recurse.
pub(crate) fn eval_def(
    args: &[Expr],
    env: &mut Environment,
    pos: &Position,
    _depth: usize,
) -> Result<Expr, Error> {
    let [name_expr, params_expr, body] = args else {
        return Err(Error::type_error(
            "def expects a name, parameters, and a body",
            pos.clone(),
        ));
    };
    let Expr::Symbol { name, .. } = name_expr else {
        return Err(Error::type_error(
            format!("def expects a symbol to bind, got {}", name_expr.type_name()),
            pos.clone(),
        ));
    };
    let params = lambda_params(params_expr, pos)?;
    let lambda = Expr::Lambda(Rc::new(Lambda {
        self_name: Some(name.clone()),
        params,
        body: body.clone(),
        env: env.clone(),
    }));
    env.define(name.clone(), lambda.clone());
    Ok(lambda)
}

/// `(eval expr)` - evaluate the argument to get an expression, then evaluate
/// that expression in a child scope. Turning a quoted program back into code
/// is the quote/eval duality; the child scope keeps bindings made by the
/// inner program from leaking.
pub(crate) fn eval_eval(
    args: &[Expr],
    env: &mut Environment,
    pos: &Position,
    depth: usize,
) -> Result<Expr, Error> {
    let [expr] = args else {
        return Err(Error::type_error("eval expects one expression", pos.clone()));
    };
    let inner = eval_depth(expr, env, depth + 1)?;
    let mut scope = Environment::with_parent(env.clone());
    eval_depth(&inner, &mut scope, depth + 1)
}

/// `(include path)` - read a source file and evaluate its program in the
/// current environment, returning the last value. Relative paths resolve
/// against the calling file's directory when known.
pub(crate) fn eval_include(
    args: &[Expr],
    env: &mut Environment,
    pos: &Position,
    depth: usize,
) -> Result<Expr, Error> {
    let [path_expr] = args else {
        return Err(Error::type_error("include expects one path string", pos.clone()));
    };
    let path_value = eval_depth(path_expr, env, depth + 1)?;
    let Expr::Str(path) = &path_value else {
        return Err(Error::type_error(
            format!("include expects a path string, got {}", path_value.type_name()),
            pos.clone(),
        ));
    };

    let resolved = resolve_include(path, pos);
    let source = std::fs::read_to_string(&resolved).map_err(|err| {
        Error::runtime(
            format!("cannot include '{}': {err}", resolved.display()),
            pos.clone(),
        )
    })?;
    let tokens = crate::lexer::lex(&source, Origin::File(resolved.display().to_string()))?;
    let program = crate::parser::parse(&tokens)?;

    let mut value = Expr::Nil;
    for expr in &program {
        value = eval_depth(expr, env, depth + 1)?;
    }
    Ok(value)
}

fn resolve_include(path: &str, pos: &Position) -> PathBuf {
    let requested = Path::new(path);
    if requested.is_absolute() {
        return requested.to_path_buf();
    }
    if let Origin::File(calling) = &pos.origin
        && let Some(dir) = Path::new(calling).parent()
    {
        return dir.join(requested);
    }
    requested.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{atom, nil, sym, val};
    use crate::{Origin, lex, parse};

    /// Expected outcome of evaluating one source string.
    #[derive(Debug)]
    enum TestResult {
        Value(Expr),                 // Evaluation should succeed with this value
        SpecificError(&'static str), // Evaluation should fail, message contains this string
        Error,                       // Evaluation should fail (any error)
    }
    use TestResult::{SpecificError, Value};

    /// A sequence of inputs evaluated against one shared environment.
    struct TestScript(Vec<(&'static str, TestResult)>);

    fn success<T: Into<Expr>>(value: T) -> TestResult {
        Value(value.into())
    }

    fn run_source(source: &str, env: &mut Environment) -> Result<Expr, Error> {
        let tokens = lex(source, Origin::Unknown)?;
        let program = parse(&tokens)?;
        let mut value = Expr::Nil;
        for expr in &program {
            value = eval(expr, env)?;
        }
        Ok(value)
    }

    fn execute_case(source: &str, expected: &TestResult, env: &mut Environment, id: &str) {
        match (run_source(source, env), expected) {
            (Ok(actual), Value(expected_value)) => {
                assert_eq!(actual, *expected_value, "{id}: value mismatch for '{source}'");
            }
            (Err(_), TestResult::Error) => {}
            (Err(err), SpecificError(fragment)) => {
                let message = format!("{err}");
                assert!(
                    message.contains(fragment),
                    "{id}: error for '{source}' should contain '{fragment}', got '{message}'"
                );
            }
            (Ok(actual), TestResult::Error | SpecificError(_)) => {
                panic!("{id}: expected an error for '{source}', got {actual:?}");
            }
            (Err(err), Value(expected_value)) => {
                panic!("{id}: expected {expected_value:?} for '{source}', got error {err}");
            }
        }
    }

    fn run_isolated_tests(cases: Vec<(&str, TestResult)>) {
        for (i, (source, expected)) in cases.iter().enumerate() {
            let mut env = create_kernel_env();
            execute_case(source, expected, &mut env, &format!("case #{}", i + 1));
        }
    }

    fn run_scripts(scripts: Vec<TestScript>) {
        for (script_idx, TestScript(cases)) in scripts.iter().enumerate() {
            let mut env = create_kernel_env();
            for (case_idx, (source, expected)) in cases.iter().enumerate() {
                let id = format!("script #{} step #{}", script_idx + 1, case_idx + 1);
                execute_case(source, expected, &mut env, &id);
            }
        }
    }

    #[test]
    fn test_environment_chain() {
        let mut root = Environment::new();
        root.define("x".to_owned(), val(1));
        root.define("y".to_owned(), val(2));

        let mut child = Environment::with_parent(root.clone());
        child.define("x".to_owned(), val(10));

        // Shadowing in the child, fall-through for the rest.
        assert_eq!(child.get("x"), Some(&val(10)));
        assert_eq!(child.get("y"), Some(&val(2)));
        assert_eq!(child.get("z"), None);

        // The parent is untouched by the child's define.
        assert_eq!(root.get("x"), Some(&val(1)));

        let names: Vec<String> = child.all_bindings().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["x".to_owned(), "y".to_owned()]);
    }

    #[test]
    fn test_kernel_env_has_builtins_and_forms() {
        let env = create_kernel_env();
        assert!(matches!(env.get("+"), Some(Expr::Builtin(_))));
        assert!(matches!(env.get("print"), Some(Expr::Builtin(_))));
        assert!(matches!(env.get("let"), Some(Expr::Form(_))));
        assert!(matches!(env.get("lambda"), Some(Expr::Form(_))));
        assert!(env.get("no-such-op").is_none());
    }

    #[test]
    fn test_eval_comprehensive() {
        let cases: Vec<(&str, TestResult)> = vec![
            // === SELF-EVALUATING FORMS ===
            ("42", success(42)),
            ("-3", success(-3)),
            ("2.5", success(2.5)),
            ("#true", success(atom("true"))),
            ("#ok", success(atom("ok"))),
            ("\"hello\"", success("hello")),
            ("()", success(nil())),
            // === QUOTE ===
            ("'x", success(sym("x"))),
            ("'42", success(42)),
            ("'()", success(nil())),
            ("'(1 2 3)", success(val([1, 2, 3]))),
            // The inner expression is preserved, not evaluated
            (
                "'(1 2 (+ 1 2))",
                success(val(vec![
                    val(1),
                    val(2),
                    val(vec![sym("+"), val(1), val(2)]),
                ])),
            ),
            // === IF AND TRUTHINESS ===
            ("(if #true 1 2)", success(1)),
            ("(if #false 1 2)", success(2)),
            ("(if #false 1)", success(nil())),
            // Only #false and () are falsy
            ("(if 0 1 2)", success(1)),
            ("(if \"\" 1 2)", success(1)),
            ("(if () 1 2)", success(2)),
            ("(if '() 1 2)", success(2)),
            ("(if (> 5 3) \"yes\" \"no\")", success("yes")),
            // Branches not chosen are not evaluated
            ("(if #true 1 (missing))", success(1)),
            ("(if #false (missing) 2)", success(2)),
            // === LET ===
            ("(let x 5)", success(5)),
            // === LAMBDA APPLICATION ===
            ("((lambda (x) (* x x)) 4)", success(16)),
            ("((lambda (a b) (+ a b)) 3 4)", success(7)),
            ("((lambda () 42))", success(42)),
            // A single-symbol parameter list desugars to one parameter
            ("((lambda x (+ x 1)) 2)", success(3)),
            // Wrong arity is a TypeError at the call site
            ("((lambda (x) x))", SpecificError("TypeError")),
            ("((lambda (x) x) 1 2)", SpecificError("TypeError")),
            // Ill-formed parameter lists
            ("(lambda (x x) x)", SpecificError("duplicate parameter")),
            ("(lambda (1 2) 3)", SpecificError("must be symbols")),
            ("(lambda \"x\" 1)", SpecificError("lambda parameters")),
            // === DO ===
            ("(do 1 2 3)", success(3)),
            ("(do (let y 5) (+ y 1))", success(6)),
            // === CALLING NON-PROCEDURES ===
            ("(1 2)", SpecificError("cannot call a number")),
            ("(\"f\" 1)", SpecificError("cannot call a string")),
            ("('x 1)", SpecificError("cannot call a symbol")),
            // === UNBOUND SYMBOLS ===
            ("nope", SpecificError("unbound symbol 'nope'")),
            ("(+ 1 nope)", SpecificError("unbound symbol 'nope'")),
            // === EVAL / QUOTE DUALITY ===
            ("(eval '(+ 1 2))", success(3)),
            ("(eval ''(+ 1 2))", success(val(vec![sym("+"), val(1), val(2)]))),
            ("(eval 42)", success(42)),
            ("(eval '#true)", success(atom("true"))),
            // === HIGHER-ORDER USE OF CALLABLES ===
            ("((if #true + *) 2 3)", success(5)),
            ("((if #false + *) 2 3)", success(6)),
            ("((lambda (op a b) (op a b)) * 3 4)", success(12)),
            // Callables compare by identity
            ("(== + +)", success(true)),
            ("(== + -)", success(false)),
            ("(== (lambda (x) x) (lambda (x) x))", success(false)),
            // === END-TO-END SCENARIOS ===
            ("(print (+ 40 2))", success(atom("ok"))),
            ("(let xs '(1 2 3)) (sum (push 4 xs))", success(10)),
            ("(tie 1 2 (+ 1 2))", success(val([1, 2, 3]))),
            // === ILL-FORMED SPECIAL FORMS ===
            ("(let 5 1)", SpecificError("let expects a symbol")),
            ("(let x)", SpecificError("TypeError")),
            ("(if)", SpecificError("TypeError")),
            ("(def f 1 2)", TestResult::Error),
            ("(sqrt -1)", TestResult::Error),
        ];

        run_isolated_tests(cases);
    }

    #[test]
    fn test_environment_threading_scripts() {
        // Top-level let extends the caller's scope, expression by expression.
        run_scripts(vec![TestScript(vec![
            ("(let x 10)", success(10)),
            ("x", success(10)),
            ("(+ x 5)", success(15)),
            ("(let x 20)", success(20)),
            ("x", success(20)),
            ("y", SpecificError("unbound symbol 'y'")),
        ])]);

        // Definitions persist across inputs and can be layered.
        let mut env = create_kernel_env();
        run_source("(let inc (lambda (n) (+ n 1)))", &mut env).expect("bind inc");
        assert_eq!(run_source("(inc 41)", &mut env).expect("call"), val(42));
        run_source("(def twice (f x) (f (f x)))", &mut env).expect("bind twice");
        assert_eq!(run_source("(twice inc 5)", &mut env).expect("call"), val(7));
    }

    #[test]
    fn test_lexical_closure_scenario() {
        // (let x 10) (def f (n) (+ n x)) (let x 20) (f 1) == 11
        let mut env = create_kernel_env();
        let value =
            run_source("(let x 10) (def f (n) (+ n x)) (let x 20) (f 1)", &mut env).expect("run");
        assert_eq!(value, val(11));

        // The same holds for plain lambdas bound with let.
        let mut env = create_kernel_env();
        let value = run_source(
            "(let y 100) (let g (lambda () y)) (let y 200) (g)",
            &mut env,
        )
        .expect("run");
        assert_eq!(value, val(100));
        // And the outer rebinding is still in effect.
        assert_eq!(run_source("y", &mut env).expect("run"), val(200));
    }

    #[test]
    fn test_recursion_through_self_name() {
        let mut env = create_kernel_env();
        let value = run_source(
            "(def fact (n) (if (!= n 1) (* n (fact (- n 1))) 1)) (fact 4)",
            &mut env,
        )
        .expect("run");
        assert_eq!(value, val(24));

        // Countdown builds a list through recursion.
        let mut env = create_kernel_env();
        let value = run_source(
            "(def countdown (n) (if (== n 0) () (push n (countdown (- n 1))))) (countdown 3)",
            &mut env,
        )
        .expect("run");
        assert_eq!(value, val([1, 2, 3]));

        // def returns the lambda itself.
        let mut env = create_kernel_env();
        let value = run_source("(def id (x) x)", &mut env).expect("run");
        assert!(matches!(value, Expr::Lambda(_)));
    }

    #[test]
    fn test_do_scope_is_discarded() {
        let mut env = create_kernel_env();
        let value = run_source("(do (let y 5) (+ y 1))", &mut env).expect("run");
        assert_eq!(value, val(6));

        // The binding made inside do is gone afterwards, and the error
        // points at the trailing reference.
        let err = run_source("y", &mut env).expect_err("y must be unbound");
        assert!(matches!(&err, Error::Reference { name, .. } if name == "y"));
    }

    #[test]
    fn test_eval_scope_is_discarded() {
        let mut env = create_kernel_env();
        let value = run_source("(eval '(let x 5))", &mut env).expect("run");
        assert_eq!(value, val(5));
        assert!(run_source("x", &mut env).is_err());
    }

    #[test]
    fn test_closures_and_higher_order_scripts() {
        let mut env = create_kernel_env();
        run_source("(let make-adder (lambda (n) (lambda (x) (+ x n))))", &mut env)
            .expect("define make-adder");
        assert_eq!(
            run_source("((make-adder 5) 3)", &mut env).expect("call"),
            val(8)
        );
        run_source("(let add5 (make-adder 5))", &mut env).expect("bind add5");
        assert_eq!(run_source("(add5 10)", &mut env).expect("call"), val(15));

        // Parameter shadowing: the inner x wins, the global is untouched.
        run_source("(let x 1)", &mut env).expect("bind");
        run_source("(let f (lambda (x) (+ x 10)))", &mut env).expect("bind");
        assert_eq!(run_source("(f 5)", &mut env).expect("call"), val(15));
        assert_eq!(run_source("x", &mut env).expect("lookup"), val(1));
        assert_eq!(run_source("(f x)", &mut env).expect("call"), val(11));
    }

    #[test]
    fn test_reference_error_positions() {
        let mut env = create_kernel_env();
        let tokens = lex("(+ 1\n  missing)", Origin::Unknown).expect("lex");
        let program = parse(&tokens).expect("parse");
        let err = eval(&program[0], &mut env).expect_err("must fail");
        let Error::Reference { name, pos } = &err else {
            panic!("expected ReferenceError, got {err:?}");
        };
        assert_eq!(name, "missing");
        assert_eq!((pos.row, pos.col), (2, 3));
    }

    #[test]
    fn test_not_callable_position_is_call_site() {
        let mut env = create_kernel_env();
        let tokens = lex("\n  (1 2)", Origin::Unknown).expect("lex");
        let program = parse(&tokens).expect("parse");
        let err = eval(&program[0], &mut env).expect_err("must fail");
        assert_eq!((err.position().row, err.position().col), (2, 3));
        assert!(matches!(err, Error::Runtime { .. }));
    }

    #[test]
    fn test_evaluation_depth_limit() {
        // Recursing to MAX_EVAL_DEPTH needs more than the default test
        // thread stack in debug builds; run it on a thread with headroom.
        std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let mut env = create_kernel_env();
                let err = run_source("(def spin (n) (spin n)) (spin 1)", &mut env)
                    .expect_err("unbounded recursion must be cut off");
                let message = format!("{err}");
                assert!(
                    message.contains("depth limit"),
                    "expected a depth-limit error, got '{message}'"
                );
            })
            .expect("spawn test thread")
            .join()
            .expect("test thread panicked");
    }

    #[test]
    fn test_include_evaluates_in_current_env() {
        use std::io::Write;

        let dir = std::env::temp_dir();
        let path = dir.join("signo_include_test.sg");
        let mut file = std::fs::File::create(&path).expect("create include file");
        writeln!(file, "; included library\n(def triple (n) (* n 3))\n(let base 7)")
            .expect("write include file");

        let mut env = create_kernel_env();
        let source = format!("(include \"{}\") (triple base)", path.display());
        let value = run_source(&source, &mut env).expect("run include");
        assert_eq!(value, val(21));

        std::fs::remove_file(&path).ok();

        // A missing file is a RuntimeError at the include call site.
        let mut env = create_kernel_env();
        let err = run_source("(include \"no/such/file.sg\")", &mut env).expect_err("must fail");
        assert!(matches!(err, Error::Runtime { .. }));
    }
}
