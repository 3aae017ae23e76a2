//! Binary entrypoint that launches the lexdraft server.

use std::process::ExitCode;

use lexdraft::start_lexdraft;

/// Load configuration, open the store and serve the API.
fn main() -> ExitCode {
    start_lexdraft::run()
}
