use std::sync::{Arc, Mutex};

use datatest_stable::Utf8Path;
use kindling::{
    value::{InputPort, OutputPort},
    Interpreter,
};

#[derive(thiserror::Error, Debug)]
#[error("error(s) occured in scheme datatest at {0}")]
pub struct DatatestError(Box<Utf8Path>);

/// A test file: the written result of each top-level form (ending at the first
/// `error: ...`), `---`, what the program printed, `---`, then the program.
/// Lines starting with `;` before the program are comments.
#[derive(Default)]
struct Datatest<'a> {
    result_comments: Vec<&'a str>,
    results: Vec<&'a str>,
    output_comments: Vec<&'a str>,
    output: Vec<&'a str>,
    source: String,
}

fn read_datatest(test_contents: &str) -> Datatest<'_> {
    #[derive(PartialEq, Eq)]
    enum Section {
        Results,
        Output,
        Source,
    }
    let mut test = Datatest::default();
    let mut section = Section::Results;

    for line in test_contents.lines() {
        if section != Section::Source && line.trim_end() == "---" {
            section = match section {
                Section::Results => Section::Output,
                _ => Section::Source,
            };
            continue;
        }
        let comment = line.trim_start().starts_with(';');
        match section {
            Section::Results if comment => test.result_comments.push(line),
            Section::Results => test.results.push(line),
            Section::Output if comment => test.output_comments.push(line),
            Section::Output => test.output.push(line),
            Section::Source => {
                if !test.source.is_empty() {
                    test.source.push('\n');
                }
                test.source.push_str(line);
            }
        }
    }
    test
}

// comments are moved to the top of their section
fn stitch_to_datatest(test: &Datatest, results: &[String], output: &str) -> String {
    let mut lines = vec![];
    lines.extend(test.result_comments.iter().copied());
    lines.extend(results.iter().map(String::as_str));
    lines.push("---");
    lines.extend(test.output_comments.iter().copied());
    lines.extend(output.lines());
    lines.push("---");
    lines.push(&test.source);
    let mut stitched = lines.join("\n");
    stitched.push('\n');
    stitched
}

/// Runs `source` against an empty standard input, returning the written result
/// of each top-level form and everything printed.
fn run(source: &str) -> (Vec<String>, String) {
    let sink = Arc::new(Mutex::new(Vec::<u8>::new()));
    let mut interp = Interpreter::with_ports(InputPort::from_source(""), OutputPort::new(sink.clone()));
    let mut results = vec![];
    match interp.read_str(source) {
        Ok(data) => {
            for datum in data {
                let global = interp.global().clone();
                match interp.eval(datum, global) {
                    Ok(value) => results.push(value.to_string()),
                    Err(err) => {
                        results.push(format!("error: {err}"));
                        break;
                    }
                }
            }
        }
        Err(err) => results.push(format!("error: {err}")),
    }
    let output = String::from_utf8_lossy(&sink.lock().unwrap()).into_owned();
    (results, output)
}

fn scheme_test(path: &Utf8Path, contents: String) -> datatest_stable::Result<()> {
    let test = read_datatest(&contents);
    let (results, output) = run(&test.source);

    if std::env::var("DATATEST_EXPECT").is_ok() {
        std::fs::write(path, stitch_to_datatest(&test, &results, &output))?;
        return Ok(());
    }

    let mut failed = false;
    let expected = test.results.iter().map(|line| line.trim());
    if !expected.clone().eq(results.iter().map(|line| line.trim())) {
        println!("error in {path}: mismatched results");
        println!("\nGot:\n{}\n\nExpected:\n{}", results.join("\n"), test.results.join("\n"));
        failed = true;
    }
    let expected_output = test.output.join("\n");
    if expected_output.trim_end() != output.trim_end() {
        println!("error in {path}: mismatched output");
        println!("\nGot:\n{}\n\nExpected:\n{}", output.trim_end(), expected_output.trim_end());
        failed = true;
    }

    if failed {
        Err(DatatestError(Box::from(path)))?
    } else {
        Ok(())
    }
}

datatest_stable::harness! {
    scheme_test, "test_data", r"^.*\.scm",
}
