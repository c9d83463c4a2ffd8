//! scubainit - container entrypoint that runs a command as the host user

use std::ffi::OsString;
use std::process::ExitCode;

use scuba::init::{run_from_env, EXIT_FAIL};

fn main() -> ExitCode {
    let argv: Vec<OsString> = std::env::args_os().skip(1).collect();
    match run_from_env(&argv) {
        Ok(never) => match never {},
        Err(err) => {
            eprintln!("scubainit: {:#}", err);
            ExitCode::from(EXIT_FAIL)
        }
    }
}
