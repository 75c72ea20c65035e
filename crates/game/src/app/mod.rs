mod bootstrap;
mod config;
mod gameplay;
mod loop_runner;

use std::process::ExitCode;

use tracing::error;

pub(crate) fn run() -> ExitCode {
    let app = match bootstrap::build_app() {
        Ok(app) => app,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };
    loop_runner::run(app)
}
