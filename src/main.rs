//! Circulation Engine CLI
//!
//! Replays a circulation event log and prints the final book inventory.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- events.csv > inventory.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use chrono::Utc;
use circulation_engine::{BatchRunner, CirculationError, Result};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(CirculationError::MissingArgument);
    }

    let input_path = &args[1];
    let file = File::open(input_path)?;
    let reader = BufReader::new(file);

    let mut runner = BatchRunner::new(Utc::now());
    runner.process_csv(reader)?;

    let stdout = io::stdout();
    let handle = stdout.lock();
    runner.write_inventory(handle)?;

    Ok(())
}
