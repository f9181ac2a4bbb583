use std::{
    io::{IsTerminal, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::Parser;
use codesnake::{Block, CodeWidth, Label, LineIndex};
use kindling::{reader, Error, Interpreter, ReadError, Reader, Value};
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;
use yansi::Paint;

#[derive(Parser)]
#[command(name = "kindling", version, about = "A bootstrap Scheme interpreter")]
struct Cli {
    /// Files to load, in order
    files: Vec<PathBuf>,

    /// Don't echo the result of each top-level form of the loaded files
    #[arg(short, long)]
    quiet: bool,

    /// Start a REPL once the files are loaded
    #[arg(short, long)]
    interactive: bool,

    /// Don't colour diagnostics
    #[arg(long)]
    no_color: bool,
}

/// Prints a read error with the source it points into.
fn report_read_error(name: &str, src: &str, err: &ReadError) -> bool {
    let idx = LineIndex::new(src);
    let mut span = err.span.clone();
    if span.is_empty() {
        // an empty span marks a position; label the character next to it
        match src[span.start..].chars().next() {
            Some(chr) => span.end = span.start + chr.len_utf8(),
            None => match src[..span.start].char_indices().next_back() {
                Some((at, _)) => span.start = at,
                None => return false,
            },
        }
    }
    let label = Label::new(span)
        .with_text(err.kind.to_string())
        .with_style(|s| s.red().to_string());
    let Some(block) = Block::new(&idx, [label]) else {
        return false;
    };
    let block = block.map_code(|c| CodeWidth::new(c, c.len()));
    eprintln!("{}[{name}]", block.prologue());
    eprint!("{block}");
    eprintln!("{}", block.epilogue());
    true
}

fn flush(interp: &Interpreter) {
    if let Some(mut out) = interp.stdout().output() {
        _ = out.flush();
    }
    _ = std::io::stdout().flush();
}

/// Reports `err` and ends the process with its exit status.
fn fail(interp: &Interpreter, err: Error, source: Option<(&str, &str)>) -> ! {
    flush(interp);
    match (&err, source) {
        (Error::Exit(_), _) => {}
        (Error::Read(read), Some((name, src))) => {
            eprintln!("{} {err}", "error:".red().bold());
            report_read_error(name, src, read);
        }
        _ => eprintln!("{} {err}", "error:".red().bold()),
    }
    tracing::debug!(code = err.exit_code(), "exiting");
    std::process::exit(err.exit_code())
}

fn eval(interp: &mut Interpreter, datum: Value) -> Value {
    let global = interp.global().clone();
    match interp.eval(datum, global) {
        Ok(value) => value,
        Err(err) => fail(interp, err, None),
    }
}

fn load_file(interp: &mut Interpreter, path: &Path, echo: bool) -> anyhow::Result<()> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("could not load {}", path.display()))?;
    let name = path.display().to_string();
    tracing::debug!(path = %name, "loading");

    let mut reader = Reader::new(&src);
    loop {
        let datum = match reader.read(interp.symbols()) {
            Ok(Some(datum)) => datum,
            Ok(None) => return Ok(()),
            Err(err) => fail(interp, err.into(), Some((&name, &src))),
        };
        let value = eval(interp, datum);
        if echo {
            println!("{}", value.display());
        }
    }
}

// stdin is a pipe or a file: run it as a program, sharing the standard input
// port with the program's own reads
fn run_stdin(interp: &mut Interpreter, echo: bool) {
    let stdin = interp.stdin().clone();
    loop {
        let datum = {
            let Some(mut input) = stdin.input() else {
                return;
            };
            reader::read(&mut input, interp.symbols())
        };
        match datum {
            Ok(Value::Eof) => return,
            Ok(datum) => {
                let value = eval(interp, datum);
                if echo {
                    println!("{value}");
                }
            }
            Err(err) => fail(interp, err.into(), None),
        }
    }
}

fn repl(interp: &mut Interpreter) -> anyhow::Result<()> {
    let mut readline = rustyline::DefaultEditor::new()?;
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "> " } else { "  " };
        match readline.readline(prompt) {
            Ok(line) => {
                buffer.push_str(&line);
                buffer.push('\n');
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => return Ok(()),
            Err(err) => return Err(err.into()),
        }

        let data = match interp.read_str(&buffer) {
            Ok(data) => data,
            // keep reading lines until the datum is complete
            Err(err) if err.is_incomplete() => continue,
            Err(err) => fail(interp, err.into(), Some(("repl", &buffer))),
        };
        _ = readline.add_history_entry(buffer.trim_end());
        buffer.clear();

        for datum in data {
            let value = eval(interp, datum);
            println!("{value}");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.no_color {
        yansi::disable();
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut interp = Interpreter::new();
    for path in &cli.files {
        load_file(&mut interp, path, !cli.quiet)?;
    }

    if cli.files.is_empty() || cli.interactive {
        if std::io::stdin().is_terminal() {
            repl(&mut interp)?;
        } else {
            run_stdin(&mut interp, !cli.quiet);
        }
    }

    flush(&interp);
    Ok(())
}
