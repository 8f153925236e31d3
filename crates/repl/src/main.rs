//! ruse: run Ruse source files or an interactive REPL
//!
//! With no file argument, starts a rustyline REPL with multi-line
//! continuation on unbalanced parens and history persisted to the home
//! directory. Reader and analyzer errors abort only the current form;
//! the last thrown value is available as *e.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use ruse_runtime::{Interp, Value};

#[derive(Parser)]
#[command(name = "ruse", version, about = "The Ruse language")]
struct Cli {
    /// Source file to evaluate; starts a REPL when omitted
    file: Option<PathBuf>,

    /// Arguments exposed to the program as *command-line-args*
    args: Vec<String>,

    /// Evaluate an expression and print its result
    #[arg(short = 'e', long = "eval", value_name = "EXPR")]
    eval: Option<String>,

    /// Log filter (e.g. debug, ruse_runtime=trace)
    #[arg(long = "log", value_name = "FILTER")]
    log: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = cli
        .log
        .as_deref()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::from_default_env());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut interp = match Interp::new() {
        Ok(interp) => interp,
        Err(e) => {
            eprintln!("failed to bootstrap runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = bind_command_line_args(&mut interp, &cli.args) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    if let Some(expr) = &cli.eval {
        return match interp.eval_str(expr) {
            Ok(value) => {
                match interp.pr_str_value(&value) {
                    Ok(s) => println!("{}", s),
                    Err(e) => eprintln!("{}", e),
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    if let Some(file) = &cli.file {
        let source = match std::fs::read_to_string(file) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("{}: {}", file.display(), e);
                return ExitCode::FAILURE;
            }
        };
        return match interp.eval_str(&source) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    repl(&mut interp)
}

fn bind_command_line_args(interp: &mut Interp, args: &[String]) -> ruse_runtime::Result<()> {
    let value = if args.is_empty() {
        Value::Nil
    } else {
        Value::list_from(args.iter().map(|a| Value::string(a.as_str())).collect())
    };
    let var = interp.core_var("*command-line-args*")?;
    var.bind_root(value);
    Ok(())
}

fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ruse_history"))
}

/// Unclosed delimiters or strings mean the form continues on the next
/// line.
fn input_complete(input: &str) -> bool {
    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut in_comment = false;
    for c in input.chars() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
            }
            continue;
        }
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            ';' => in_comment = true,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
    }
    !in_string && depth <= 0
}

fn repl(interp: &mut Interp) -> ExitCode {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("failed to start line editor: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let history = history_path();
    if let Some(path) = &history {
        let _ = editor.load_history(path);
    }

    let mut pending = String::new();
    loop {
        let prompt = if pending.is_empty() {
            format!("{}=> ", interp.current_ns().name)
        } else {
            "  #_=> ".to_string()
        };
        match editor.readline(&prompt) {
            Ok(line) => {
                if !pending.is_empty() {
                    pending.push('\n');
                }
                pending.push_str(&line);
                if !input_complete(&pending) {
                    continue;
                }
                let input = std::mem::take(&mut pending);
                if input.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(input.trim_end());
                match interp.eval_str(&input) {
                    Ok(value) => match interp.pr_str_value(&value) {
                        Ok(s) => println!("{}", s),
                        Err(e) => eprintln!("{}", e),
                    },
                    Err(e) => {
                        // *e holds the thrown value (or an error map) for
                        // inspection.
                        set_last_error(interp, &e);
                        eprintln!("{}", e);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                pending.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("readline error: {}", e);
                break;
            }
        }
    }
    if let Some(path) = &history {
        let _ = editor.save_history(path);
    }
    ExitCode::SUCCESS
}

fn set_last_error(interp: &mut Interp, error: &ruse_runtime::Error) {
    let value = match &error.thrown {
        Some(thrown) => thrown.clone(),
        None => Value::string(error.to_string()),
    };
    if let Ok(var) = interp.core_var("*e") {
        var.bind_root(value);
    }
}
