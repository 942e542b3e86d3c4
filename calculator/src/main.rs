use std::fs;
use std::io;
use std::io::BufRead;

use clap::Parser;
use log::info;
use miette::{IntoDiagnostic, LabeledSpan, Report, WrapErr};

use expressions::parser;

#[derive(Parser, Debug)]
#[command(version, about = "Evaluates arithmetic over + - x ÷ and parentheses", long_about = None)]
struct Args {
    /// Expressions to evaluate. Read from stdin, one per line, when none are given.
    expressions: Vec<String>,
    /// Evaluate every non-blank line of a file.
    #[arg(short, long)]
    file: Option<String>,
    /// Also print the fully parenthesized form.
    #[arg(short, long)]
    tree: bool,
    #[arg(short, long)]
    verbose: bool,
}

fn diagnostic(src: &str, err: parser::Error) -> Report {
    let message = err.to_string();
    let labels = match err.position() {
        Some(position) => {
            let len = src[position.offset..]
                .chars()
                .next()
                .map_or(0, char::len_utf8);
            vec![LabeledSpan::at(position.offset..position.offset + len, "here")]
        }
        None => vec![],
    };
    miette::miette! {
        labels = labels,
        "{}", message
    }
    .with_source_code(src.to_string())
}

fn evaluate(src: &str, show_tree: bool) -> Result<(), Report> {
    let mut parser = parser::Parser::new();
    let value = parser.parse(src).map_err(|e| diagnostic(src, e))?;
    println!("{} = {}", parser, value);

    if show_tree {
        let tree = parser.parse_tree(src).map_err(|e| diagnostic(src, e))?;
        println!("{}", tree);
    }
    Ok(())
}

// Sources in order of preference: `--file`, positional arguments, `stdin`.
// Blank lines are skipped.
fn read_expressions(args: &Args, stdin: impl BufRead) -> miette::Result<Vec<String>> {
    let lines = if let Some(path) = &args.file {
        let content = fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("could not read {}", path))?;
        content.lines().map(str::to_string).collect()
    } else if !args.expressions.is_empty() {
        args.expressions.clone()
    } else {
        stdin
            .lines()
            .collect::<Result<Vec<_>, _>>()
            .into_diagnostic()
            .wrap_err("could not read stdin")?
    };
    Ok(lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect())
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "warn" }),
    )
    .init();

    let expressions = read_expressions(&args, io::stdin().lock())?;
    info!("evaluating {} expressions", expressions.len());

    let mut failed = 0;
    for src in &expressions {
        if let Err(report) = evaluate(src, args.tree) {
            failed += 1;
            eprintln!("{:?}", report);
        }
    }

    if failed > 0 {
        return Err(miette::miette!(
            "{} of {} expressions failed",
            failed,
            expressions.len()
        ));
    }
    Ok(())
}
