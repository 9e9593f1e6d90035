//! `binpack-unpack`: decode binpack bytes (stdin) to JSON (stdout).
//!
//! Usage:
//!   binpack-unpack [--max-depth <n>] [--verbose | --quiet]

use binpack::cli::{unpack, CliError, CliOptions};
use std::io::{self, Read, Write};

fn run() -> Result<(), CliError> {
    let options = CliOptions::parse(std::env::args().skip(1))?;
    options.init_tracing();

    let mut buf = Vec::new();
    io::stdin().read_to_end(&mut buf)?;
    let json = unpack(&buf, &options)?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(json.as_bytes())?;
    stdout.write_all(b"\n")?;
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
