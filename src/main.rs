use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;

use signo::{Environment, Expr, Origin, create_kernel_env, evaluate_with, lex, parse};

fn main() {
    let mut args = std::env::args().skip(1);
    match (args.next(), args.next()) {
        (Some(path), None) => run_file(&path),
        (None, _) => {
            let result = panic::catch_unwind(run_repl);
            if let Err(panic_info) = result {
                eprintln!("The REPL encountered an unexpected error and must exit.");
                if let Some(msg) = panic_info.downcast_ref::<&str>() {
                    eprintln!("Error: {msg}");
                } else if let Some(msg) = panic_info.downcast_ref::<String>() {
                    eprintln!("Error: {msg}");
                } else {
                    eprintln!("Error: unknown panic occurred");
                }
                process::exit(1);
            }
        }
        (Some(_), Some(_)) => {
            eprintln!("usage: signo [script.sg]");
            process::exit(2);
        }
    }
}

/// One-shot mode: run a script, print nothing beyond the program's own
/// output, report the first error and exit non-zero.
fn run_file(path: &str) {
    if let Err(err) = signo::eval_file(path) {
        eprintln!("{err}");
        process::exit(1);
    }
}

fn run_repl() {
    println!("Signo interactive evaluator");
    println!("Enter expressions like: (+ 1 2)");
    println!("Type :help for commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("could not initialize line editor");
    let mut env = create_kernel_env();
    let mut input_index = 1usize;

    loop {
        match rl.readline(&format!("sig({input_index})> ")) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&env);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                let origin = Origin::Repl(input_index);
                input_index += 1;

                // The environment is threaded across inputs; a failing input
                // is discarded and the previous environment kept.
                let result = lex(line, origin)
                    .and_then(|tokens| parse(&tokens))
                    .and_then(|program| evaluate_with(&program, &mut env));
                match result {
                    Ok(value) => {
                        // The atom `ok` (what print returns) is suppressed.
                        if value != Expr::Atom("ok".to_owned()) {
                            println!("{}", value.debug_form());
                        }
                    }
                    Err(err) => eprintln!("{err}"),
                }
            }

            Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err:?}");
                break;
            }
        }
    }
}

fn print_help() {
    println!("Signo REPL commands:");
    println!("  :help  - show this help message");
    println!("  :env   - show current environment bindings");
    println!("  :quit  - exit the interpreter (also :exit, Ctrl+C)");
    println!();
    println!("Syntax:");
    println!("  Numbers: 42, -3, 2.0, -0.5");
    println!("  Strings: \"text\"");
    println!("  Atoms: #true, #false, #name");
    println!("  Nil: ()");
    println!("  Quote: '(1 2 3)");
    println!();
    println!("Examples:");
    println!("  (let x 10)");
    println!("  (def square (n) (* n n))");
    println!("  (square x)");
    println!("  (sum (push 4 '(1 2 3)))");
}

fn print_environment(env: &Environment) {
    let bindings = env.all_bindings();

    // Separate kernel callables from user-defined values.
    let mut kernel = Vec::new();
    let mut user_defined = Vec::new();
    for (name, value) in bindings {
        match value {
            Expr::Builtin(_) | Expr::Form(_) => kernel.push(name),
            other => user_defined.push((name, other)),
        }
    }

    println!("Kernel bindings ({}):", kernel.len());
    let mut col = 0;
    for name in kernel {
        print!("  {name:<12}");
        col += 1;
        if col % 5 == 0 {
            println!();
        }
    }
    if col % 5 != 0 {
        println!();
    }

    if !user_defined.is_empty() {
        println!();
        println!("User-defined values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {}", value.debug_form());
        }
    }
}
