use std::process::ExitCode;

use engine::{run_headless_with_metrics, MetricsHandle};
use tracing::{error, info};

use super::bootstrap::{AppError, AppWiring};

pub(crate) fn run(app: Result<AppWiring, AppError>) -> ExitCode {
    let mut app = match app {
        Ok(app) => app,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    let metrics = MetricsHandle::default();
    let summary =
        run_headless_with_metrics(&app.config, app.scene, app.input.as_mut(), metrics.clone());
    let last_window = metrics.snapshot();
    info!(
        ticks_run = summary.ticks_run,
        frames_run = summary.frames_run,
        stop_reason = summary.stop_reason.as_str(),
        final_entity_count = summary.final_entity_count,
        title = summary.final_title.as_deref().unwrap_or("-"),
        last_fps = last_window.fps,
        last_tps = last_window.tps,
        last_tick_time_ms = last_window.tick_time_ms,
        "run_finished"
    );
    ExitCode::SUCCESS
}
