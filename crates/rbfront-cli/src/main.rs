use std::{env, fs, process::ExitCode, time::Instant};

use rbfront::counters::{ConstStr, CounterState};
use rbfront::desugar::{Desugarer, ParseNode};
use rbfront::errors::CollectingSink;
use rbfront::global_state::GlobalState;

/// A self-contained desugar fixture: the original source text (kept around
/// for `Loc`-to-line/column reporting) plus the tree an external Ruby parser
/// would have produced from it. Parsing Ruby source is out of scope for this
/// crate, so the driver consumes a parser's output directly rather than
/// shelling out to one.
#[derive(serde::Deserialize)]
struct Fixture {
    source_path: String,
    source: String,
    program: ParseNode,
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let fixture_path = if args.len() > 1 { &args[1] } else { "example.rbast.json" };

    let raw = match read_file(fixture_path) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let fixture: Fixture = match serde_json::from_str(&raw) {
        Ok(f) => f,
        Err(err) => {
            eprintln!("error parsing fixture {fixture_path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut gs = GlobalState::new();
    let file = gs.load_file(fixture.source_path, fixture.source);

    let mut sink = CollectingSink::new();
    let mut counters = CounterState::new();

    let start = Instant::now();
    let ast = {
        let mut desugarer = Desugarer::new(&mut gs, file, &mut sink);
        desugarer.translate(&fixture.program)
    };
    let elapsed = start.elapsed();
    counters.counter_inc(ConstStr("rbfront.files_desugared"));

    if sink.is_empty() {
        println!("{ast:#?}");
    } else {
        eprintln!("desugaring raised {} diagnostic(s):", sink.diagnostics().len());
        for diag in sink.diagnostics() {
            eprintln!("  {}: {}", diag.loc, diag.message);
            for line in &diag.secondary_lines {
                eprintln!("    {line}");
            }
        }
    }

    eprintln!("desugar took {elapsed:?}");
    let canon = counters.canonicalize();
    for (name, value) in &canon.counters {
        eprintln!("counter {name}: {value}");
    }

    ExitCode::SUCCESS
}

fn read_file(path: &str) -> Result<String, String> {
    match fs::metadata(path) {
        Ok(metadata) if !metadata.is_file() => return Err(format!("{path} is not a file")),
        Ok(_) => {}
        Err(err) => return Err(format!("reading {path}: {err}")),
    }
    fs::read_to_string(path).map_err(|err| format!("reading {path}: {err}"))
}
