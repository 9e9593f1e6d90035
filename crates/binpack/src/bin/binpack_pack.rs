//! `binpack-pack`: encode JSON (stdin) to binpack bytes (stdout).
//!
//! Usage:
//!   binpack-pack [--max-depth <n>] [--verbose | --quiet]

use binpack::cli::{pack, CliError, CliOptions};
use std::io::{self, Read, Write};

fn run() -> Result<(), CliError> {
    let options = CliOptions::parse(std::env::args().skip(1))?;
    options.init_tracing();

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    let bytes = pack(buf.trim(), &options)?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&bytes)?;
    stdout.flush()?;
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
