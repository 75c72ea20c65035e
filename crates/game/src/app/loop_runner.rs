use std::process::ExitCode;

use deswonder_engine::run_app;
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    if let Err(err) = run_app(app.config, app.assets, app.title_scene, app.field_scene) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    info!("shutdown_complete");
    ExitCode::SUCCESS
}
