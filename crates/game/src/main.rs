mod app;

use std::process::ExitCode;

fn main() -> ExitCode {
    app::loop_runner::run(app::bootstrap::build_app())
}
