use std::process::ExitCode;

use treecmp::error::is_scan_cancelled;
use treecmp::modes::{self, EXIT_CANCELLED, EXIT_ERROR};

fn main() -> ExitCode {
    match modes::run() {
        Ok(code) => code,
        Err(err) if is_scan_cancelled(&err) => {
            eprintln!("Operation cancelled: {err:#}");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
