//! Reads perception lines (JSONL) from a file or stdin and prints the
//! encoded state key with its dense index.
//!
//! Line format: `{"waypoint": "forward", "inputs": {"light": "red", "oncoming": null}}`

use serde::Deserialize;
use smartcab_core::{Action, Perception, State};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};

#[derive(Deserialize)]
struct Observation {
    waypoint: Action,
    inputs: Perception,
}

fn main() -> Result<(), Box<dyn Error>> {
    let path = std::env::args().nth(1);
    let reader: Box<dyn BufRead> = match path {
        Some(p) => Box::new(BufReader::new(File::open(p)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let obs: Observation = serde_json::from_str(&line)
            .map_err(|e| format!("line {}: {e}", lineno + 1))?;
        let state = State::encode(obs.waypoint, &obs.inputs);

        println!("{}\t{state}", state.index());
    }

    Ok(())
}
