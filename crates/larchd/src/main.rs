//! Entrypoint for the larch session service.

use std::process::ExitCode;

fn main() -> ExitCode {
    match larchd::run_service() {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("larchd: {error}");
            ExitCode::FAILURE
        }
    }
}
