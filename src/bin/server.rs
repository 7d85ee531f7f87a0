//! Attribution API server binary.
//! Run with: cargo run --bin whomadethis-server

use std::process::ExitCode;

use whomadethis::startup;

fn main() -> ExitCode {
    startup::run()
}
