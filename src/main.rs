use std::env;
use std::fs;
use std::io::{self, Write};

use anyhow::Context;

use lily::{Environment, Evaluator, parse};

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let paths = env::args().skip(1).collect::<Vec<_>>();
    if paths.is_empty() {
        run_prompt()?;
    } else {
        run_files(&paths)?;
    }

    Ok(())
}

// All files run in one evaluator session so they can share bindings.
fn run_files(paths: &[String]) -> Result<(), anyhow::Error> {
    let env = Environment::new();
    let mut evaluator = Evaluator::with_env(env);

    let mut last = lily::Value::Nil;
    for path in paths {
        let source =
            fs::read_to_string(path).with_context(|| format!("failed to read '{path}'"))?;
        let program = parse(&source).with_context(|| format!("failed to parse '{path}'"))?;
        last = evaluator
            .eval_program(&program)
            .with_context(|| format!("failed to evaluate '{path}'"))?;
    }

    println!("{last}");
    Ok(())
}

fn run_prompt() -> Result<(), io::Error> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    let mut evaluator = Evaluator::new();
    let mut input = String::new();

    loop {
        stdout.write_all(b">> ")?;
        stdout.flush()?;

        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            return Ok(());
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        match parse(line) {
            Ok(program) => match evaluator.eval_program(&program) {
                Ok(value) => println!("{value}"),
                Err(err) => println!("{err}"),
            },
            Err(err) => println!("{err}"),
        }
    }
}
